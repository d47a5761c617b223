//! The global environment of constant declarations and the reducibility
//! policy oracles consumed by the equality engine.

use crate::exp::Expr;
use crate::ident::Name;
use crate::level::Level;
use crate::{HashMap, HashSet};

/// Hints that control the order in which definitions are unfolded when both
/// sides of an equation are delta-candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReducibilityHints {
    /// Never unfold.
    #[default]
    Opaque,
    /// An abbreviation; unfold eagerly.
    Abbrev,
    /// Unfold with the given definitional height: a definition's height is
    /// larger than that of every definition appearing in its body, so the
    /// higher side is unfolded first to make the heads converge.
    Regular(u32),
}

impl ReducibilityHints {
    /// Whether `self` should be unfolded before `other`.
    pub fn unfolds_before(&self, other: &ReducibilityHints) -> bool {
        use ReducibilityHints::*;
        match (self, other) {
            (Abbrev, Abbrev) => false,
            (Abbrev, _) => true,
            (Regular(_), Opaque) => true,
            (Regular(h1), Regular(h2)) => h1 > h2,
            _ => false,
        }
    }
}

/// The reducibility attribute of a definition, controlling which
/// transparency modes may see through it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reducibility {
    /// `@[reducible]`: visible at every transparency.
    Reducible,
    /// No attribute.
    #[default]
    Default,
    /// `@[irreducible]`: only visible at full transparency.
    Irreducible,
}

/// The transparency setting active during a reduction or equality check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TransparencyMode {
    /// Unfold only `@[reducible]` definitions.
    Reducible,
    /// Unfold `@[reducible]` definitions and instances.
    Instances,
    /// Unfold everything that is not `@[irreducible]`.
    #[default]
    Default,
    /// Unfold everything with a value.
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstantKind {
    /// A definition with a body.
    Defn { value: Expr, hints: ReducibilityHints },
    /// An axiom or opaque constant: no body visible to unification.
    Axiom,
    /// A constructor of an inductive type.
    Ctor { induct: Name, num_params: u32, num_fields: u32 },
    /// An inductive type.
    Induct { num_params: u32, ctors: Vec<Name> },
}

/// A constant declaration as seen by the equality engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantInfo {
    pub name: Name,
    /// Universe-polymorphic level parameter names.
    pub level_params: Vec<Name>,
    pub ty: Expr,
    pub kind: ConstantKind,
    pub reducibility: Reducibility,
    /// Whether the declaration is a typeclass instance.
    pub is_instance: bool,
}

impl ConstantInfo {
    pub fn value(&self) -> Option<&Expr> {
        match &self.kind {
            ConstantKind::Defn { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn hints(&self) -> ReducibilityHints {
        match &self.kind {
            ConstantKind::Defn { hints, .. } => *hints,
            _ => ReducibilityHints::Opaque,
        }
    }

    pub fn is_ctor(&self) -> bool {
        matches!(self.kind, ConstantKind::Ctor { .. })
    }

    pub fn instantiate_type_levels(&self, levels: &[Level]) -> Expr {
        self.ty.instantiate_level_params(&self.level_params, levels)
    }

    pub fn instantiate_value_levels(&self, levels: &[Level]) -> Option<Expr> {
        Some(self.value()?.instantiate_level_params(&self.level_params, levels))
    }
}

/// Whether the active transparency mode allows unfolding the definition.
/// Declarations without a body are never unfoldable.
pub fn can_unfold(mode: TransparencyMode, info: &ConstantInfo) -> bool {
    if info.value().is_none() {
        return false;
    }
    match mode {
        TransparencyMode::All => true,
        TransparencyMode::Default => info.reducibility != Reducibility::Irreducible,
        TransparencyMode::Instances => {
            info.reducibility == Reducibility::Reducible || info.is_instance
        }
        TransparencyMode::Reducible => info.reducibility == Reducibility::Reducible,
    }
}

/// The global declaration table plus the set of registered typeclasses.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    constants: HashMap<Name, ConstantInfo>,
    classes: HashSet<Name>,
}

impl Environment {
    pub fn new() -> Environment {
        Environment::default()
    }

    pub fn get_constant(&self, name: &Name) -> Option<&ConstantInfo> {
        self.constants.get(name)
    }

    pub fn is_class(&self, name: &Name) -> bool {
        self.classes.contains(name)
    }

    pub fn register_class(&mut self, name: impl Into<Name>) {
        self.classes.insert(name.into());
    }

    pub fn add(&mut self, info: ConstantInfo) {
        self.constants.insert(info.name.clone(), info);
    }

    /// Add a definition with default reducibility and regular hints.
    pub fn add_defn(&mut self, name: impl Into<Name>, ty: Expr, value: Expr) {
        self.add_defn_with(name, ty, value, Reducibility::Default, ReducibilityHints::Regular(1));
    }

    pub fn add_defn_with(
        &mut self,
        name: impl Into<Name>,
        ty: Expr,
        value: Expr,
        reducibility: Reducibility,
        hints: ReducibilityHints,
    ) {
        let name = name.into();
        self.add(ConstantInfo {
            name,
            level_params: vec![],
            ty,
            kind: ConstantKind::Defn { value, hints },
            reducibility,
            is_instance: false,
        });
    }

    pub fn add_axiom(&mut self, name: impl Into<Name>, ty: Expr) {
        self.add(ConstantInfo {
            name: name.into(),
            level_params: vec![],
            ty,
            kind: ConstantKind::Axiom,
            reducibility: Reducibility::Default,
            is_instance: false,
        });
    }

    pub fn add_ctor(
        &mut self,
        name: impl Into<Name>,
        ty: Expr,
        induct: impl Into<Name>,
        num_params: u32,
        num_fields: u32,
    ) {
        self.add(ConstantInfo {
            name: name.into(),
            level_params: vec![],
            ty,
            kind: ConstantKind::Ctor { induct: induct.into(), num_params, num_fields },
            reducibility: Reducibility::Default,
            is_instance: false,
        });
    }

    pub fn add_inductive(
        &mut self,
        name: impl Into<Name>,
        ty: Expr,
        num_params: u32,
        ctors: Vec<Name>,
    ) {
        self.add(ConstantInfo {
            name: name.into(),
            level_params: vec![],
            ty,
            kind: ConstantKind::Induct { num_params, ctors },
            reducibility: Reducibility::Default,
            is_instance: false,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparency_gating() {
        let mut env = Environment::new();
        env.add_defn_with(
            "abbrev",
            Expr::prop(),
            Expr::prop(),
            Reducibility::Reducible,
            ReducibilityHints::Abbrev,
        );
        env.add_defn("plain", Expr::prop(), Expr::prop());
        env.add_defn_with(
            "hidden",
            Expr::prop(),
            Expr::prop(),
            Reducibility::Irreducible,
            ReducibilityHints::Regular(1),
        );

        let abbrev = env.get_constant(&Name::from("abbrev")).unwrap();
        let plain = env.get_constant(&Name::from("plain")).unwrap();
        let hidden = env.get_constant(&Name::from("hidden")).unwrap();

        assert!(can_unfold(TransparencyMode::Reducible, abbrev));
        assert!(!can_unfold(TransparencyMode::Reducible, plain));
        assert!(can_unfold(TransparencyMode::Default, plain));
        assert!(!can_unfold(TransparencyMode::Default, hidden));
        assert!(can_unfold(TransparencyMode::All, hidden));
    }

    #[test]
    fn axioms_are_never_unfoldable() {
        let mut env = Environment::new();
        env.add_axiom("ax", Expr::prop());
        let ax = env.get_constant(&Name::from("ax")).unwrap();
        assert!(!can_unfold(TransparencyMode::All, ax));
    }

    #[test]
    fn hint_ordering() {
        use ReducibilityHints::*;
        assert!(Abbrev.unfolds_before(&Regular(5)));
        assert!(Regular(5).unfolds_before(&Regular(3)));
        assert!(!Regular(3).unfolds_before(&Regular(5)));
        assert!(!Opaque.unfolds_before(&Abbrev));
    }
}

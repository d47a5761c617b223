//! Structurally shared expression trees.
//!
//! Expressions use a locally nameless representation: variables bound by an
//! enclosing `Lam`/`Pi`/`Let` are de Bruijn indices (`BVar`), while variables
//! declared in a [crate::lctx::LocalContext] are opaque identifiers (`FVar`)
//! resolved by context lookup.  Nodes are reference counted and every node
//! caches whether it contains free variables or metavariables and an upper
//! bound on its loose bound-variable indices; the equality engine relies on
//! these flags to skip whole subtrees.

use std::fmt;
use std::rc::Rc;

use derivative::Derivative;

use crate::ident::Name;
use crate::level::Level;

mod find;
mod subst;

/// A free-variable identifier, resolved via a local context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FVarId(pub u64);

/// A metavariable identifier, resolved via the metavariable context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MVarId(pub u64);

impl fmt::Display for FVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

impl fmt::Display for MVarId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?m{}", self.0)
    }
}

/// A literal value embedded in an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Nat(u64),
    Str(String),
}

/// Binder annotation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BinderInfo {
    /// Explicit binder `(x : A)`.
    #[default]
    Default,
    /// Implicit binder `{x : A}`.
    Implicit,
    /// Strict implicit binder `{{x : A}}`.
    StrictImplicit,
    /// Instance implicit binder `[x : A]`.
    InstImplicit,
}

impl BinderInfo {
    pub fn is_explicit(&self) -> bool {
        matches!(self, BinderInfo::Default)
    }

    pub fn is_inst_implicit(&self) -> bool {
        matches!(self, BinderInfo::InstImplicit)
    }
}

/// The binder of a `Lam`, `Pi` or `Let` node.
///
/// The name is a printing hint only: it does not participate in equality or
/// hashing, so structural equality of expressions is alpha-equivalence.
/// Binder annotations are likewise ignored.
#[derive(Debug, Clone, Derivative)]
#[derivative(PartialEq, Eq, Hash)]
pub struct Binder {
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    pub name: Name,
    pub ty: Expr,
    #[derivative(PartialEq = "ignore", Hash = "ignore")]
    pub info: BinderInfo,
}

impl Binder {
    pub fn new(name: impl Into<Name>, ty: Expr) -> Binder {
        Binder { name: name.into(), ty, info: BinderInfo::Default }
    }

    pub fn with_info(name: impl Into<Name>, ty: Expr, info: BinderInfo) -> Binder {
        Binder { name: name.into(), ty, info }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExprKind {
    /// Bound variable (de Bruijn index).
    BVar(u32),
    /// Free variable declared in a local context.
    FVar(FVarId),
    /// Metavariable.
    MVar(MVarId),
    /// Sort (universe).
    Sort(Level),
    /// Reference to a constant with universe-level arguments.
    Const(Name, Vec<Level>),
    /// Function application (exactly binary; n-ary applications are folds).
    App(Expr, Expr),
    /// Lambda abstraction.
    Lam(Binder, Expr),
    /// Dependent function type.
    Pi(Binder, Expr),
    /// Let binding: binder (name and type), value, body.
    Let(Binder, Expr, Expr),
    /// Literal value.
    Lit(Literal),
    /// Projection from a structure: type name, field index, target.
    Proj(Name, u32, Expr),
    /// Metadata wrapper: annotation and inner expression.
    MData(Name, Expr),
}

#[derive(Debug)]
struct ExprData {
    kind: ExprKind,
    has_fvar: bool,
    has_mvar: bool,
    loose_bvar_range: u32,
}

/// A reference-counted, structurally shared expression.
#[derive(Clone)]
pub struct Expr {
    data: Rc<ExprData>,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data) || self.data.kind == other.data.kind
    }
}

impl Eq for Expr {}

impl std::hash::Hash for Expr {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.data.kind.hash(state)
    }
}

impl fmt::Debug for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.data.kind.fmt(f)
    }
}

impl Expr {
    fn mk(kind: ExprKind) -> Expr {
        let (has_fvar, has_mvar, loose_bvar_range) = match &kind {
            ExprKind::BVar(i) => (false, false, i + 1),
            ExprKind::FVar(_) => (true, false, 0),
            ExprKind::MVar(_) => (false, true, 0),
            ExprKind::Sort(_) | ExprKind::Const(..) | ExprKind::Lit(_) => (false, false, 0),
            ExprKind::App(f, a) => (
                f.has_fvar() || a.has_fvar(),
                f.has_mvar() || a.has_mvar(),
                f.loose_bvar_range().max(a.loose_bvar_range()),
            ),
            ExprKind::Lam(b, body) | ExprKind::Pi(b, body) => (
                b.ty.has_fvar() || body.has_fvar(),
                b.ty.has_mvar() || body.has_mvar(),
                b.ty.loose_bvar_range().max(body.loose_bvar_range().saturating_sub(1)),
            ),
            ExprKind::Let(b, v, body) => (
                b.ty.has_fvar() || v.has_fvar() || body.has_fvar(),
                b.ty.has_mvar() || v.has_mvar() || body.has_mvar(),
                b.ty.loose_bvar_range()
                    .max(v.loose_bvar_range())
                    .max(body.loose_bvar_range().saturating_sub(1)),
            ),
            ExprKind::Proj(_, _, e) | ExprKind::MData(_, e) => {
                (e.has_fvar(), e.has_mvar(), e.loose_bvar_range())
            }
        };
        Expr { data: Rc::new(ExprData { kind, has_fvar, has_mvar, loose_bvar_range }) }
    }

    // Constructors

    pub fn bvar(i: u32) -> Expr {
        Expr::mk(ExprKind::BVar(i))
    }

    pub fn fvar(id: FVarId) -> Expr {
        Expr::mk(ExprKind::FVar(id))
    }

    pub fn mvar(id: MVarId) -> Expr {
        Expr::mk(ExprKind::MVar(id))
    }

    pub fn sort(l: Level) -> Expr {
        Expr::mk(ExprKind::Sort(l))
    }

    /// The sort of propositions, `Sort 0`.
    pub fn prop() -> Expr {
        Expr::sort(Level::Zero)
    }

    pub fn const_(name: impl Into<Name>, levels: Vec<Level>) -> Expr {
        Expr::mk(ExprKind::Const(name.into(), levels))
    }

    pub fn app(f: Expr, a: Expr) -> Expr {
        Expr::mk(ExprKind::App(f, a))
    }

    /// Left-fold a spine of arguments onto a function.
    pub fn apps(f: Expr, args: &[Expr]) -> Expr {
        args.iter().cloned().fold(f, Expr::app)
    }

    pub fn lam(binder: Binder, body: Expr) -> Expr {
        Expr::mk(ExprKind::Lam(binder, body))
    }

    pub fn pi(binder: Binder, body: Expr) -> Expr {
        Expr::mk(ExprKind::Pi(binder, body))
    }

    pub fn let_(binder: Binder, value: Expr, body: Expr) -> Expr {
        Expr::mk(ExprKind::Let(binder, value, body))
    }

    pub fn nat(n: u64) -> Expr {
        Expr::mk(ExprKind::Lit(Literal::Nat(n)))
    }

    pub fn string(s: impl Into<String>) -> Expr {
        Expr::mk(ExprKind::Lit(Literal::Str(s.into())))
    }

    pub fn proj(struct_name: impl Into<Name>, idx: u32, target: Expr) -> Expr {
        Expr::mk(ExprKind::Proj(struct_name.into(), idx, target))
    }

    pub fn mdata(annotation: impl Into<Name>, inner: Expr) -> Expr {
        Expr::mk(ExprKind::MData(annotation.into(), inner))
    }

    // Accessors

    pub fn kind(&self) -> &ExprKind {
        &self.data.kind
    }

    /// Physical identity of the underlying node, usable as a memoization key.
    pub fn data_ptr(&self) -> usize {
        Rc::as_ptr(&self.data) as usize
    }

    pub fn has_fvar(&self) -> bool {
        self.data.has_fvar
    }

    pub fn has_mvar(&self) -> bool {
        self.data.has_mvar
    }

    /// One more than the largest loose bound-variable index, `0` if closed.
    pub fn loose_bvar_range(&self) -> u32 {
        self.data.loose_bvar_range
    }

    pub fn has_loose_bvars(&self) -> bool {
        self.data.loose_bvar_range > 0
    }

    pub fn is_bvar(&self) -> bool {
        matches!(self.kind(), ExprKind::BVar(_))
    }

    pub fn is_fvar(&self) -> bool {
        matches!(self.kind(), ExprKind::FVar(_))
    }

    pub fn is_mvar(&self) -> bool {
        matches!(self.kind(), ExprKind::MVar(_))
    }

    pub fn is_app(&self) -> bool {
        matches!(self.kind(), ExprKind::App(..))
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self.kind(), ExprKind::Lam(..))
    }

    pub fn is_pi(&self) -> bool {
        matches!(self.kind(), ExprKind::Pi(..))
    }

    pub fn is_sort(&self) -> bool {
        matches!(self.kind(), ExprKind::Sort(_))
    }

    pub fn fvar_id(&self) -> Option<FVarId> {
        match self.kind() {
            ExprKind::FVar(id) => Some(*id),
            _ => None,
        }
    }

    pub fn mvar_id(&self) -> Option<MVarId> {
        match self.kind() {
            ExprKind::MVar(id) => Some(*id),
            _ => None,
        }
    }

    pub fn const_name(&self) -> Option<&Name> {
        match self.kind() {
            ExprKind::Const(n, _) => Some(n),
            _ => None,
        }
    }

    /// The head of an application spine (`f` in `f a₁ .. aₙ`).
    pub fn get_app_fn(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::App(f, _) = e.kind() {
            e = f;
        }
        e
    }

    pub fn get_app_args(&self) -> Vec<Expr> {
        self.get_app_fn_args().1
    }

    /// Decompose an application spine into head and arguments.
    pub fn get_app_fn_args(&self) -> (&Expr, Vec<Expr>) {
        let mut e = self;
        let mut args = Vec::new();
        while let ExprKind::App(f, a) = e.kind() {
            args.push(a.clone());
            e = f;
        }
        args.reverse();
        (e, args)
    }

    pub fn get_app_num_args(&self) -> usize {
        let mut e = self;
        let mut n = 0;
        while let ExprKind::App(f, _) = e.kind() {
            n += 1;
            e = f;
        }
        n
    }

    /// Strip metadata wrappers.
    pub fn strip_mdata(&self) -> &Expr {
        let mut e = self;
        while let ExprKind::MData(_, inner) = e.kind() {
            e = inner;
        }
        e
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cached_flags() {
        let e = Expr::app(Expr::fvar(FVarId(0)), Expr::bvar(2));
        assert!(e.has_fvar());
        assert!(!e.has_mvar());
        assert_eq!(e.loose_bvar_range(), 3);

        let lam = Expr::lam(Binder::new("x", Expr::prop()), Expr::bvar(0));
        assert!(!lam.has_loose_bvars());

        let open_lam = Expr::lam(Binder::new("x", Expr::prop()), Expr::bvar(1));
        assert_eq!(open_lam.loose_bvar_range(), 1);
    }

    #[test]
    fn alpha_equality_ignores_binder_names() {
        let a = Expr::lam(Binder::new("x", Expr::prop()), Expr::bvar(0));
        let b = Expr::lam(Binder::new("y", Expr::prop()), Expr::bvar(0));
        assert_eq!(a, b);
    }

    #[test]
    fn spine_decomposition() {
        let f = Expr::const_("f", vec![]);
        let e = Expr::apps(f.clone(), &[Expr::nat(1), Expr::nat(2)]);
        let (head, args) = e.get_app_fn_args();
        assert_eq!(head, &f);
        assert_eq!(args, vec![Expr::nat(1), Expr::nat(2)]);
        assert_eq!(e.get_app_num_args(), 2);
    }

    #[test]
    fn strip_mdata_reaches_inner() {
        let e = Expr::mdata("note", Expr::mdata("note2", Expr::nat(3)));
        assert_eq!(e.strip_mdata(), &Expr::nat(3));
    }
}

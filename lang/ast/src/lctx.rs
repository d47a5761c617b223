//! Local contexts of free-variable declarations.

use crate::exp::{Binder, BinderInfo, Expr, FVarId};
use crate::ident::Name;
use crate::HashMap;

/// A declaration in a local context: either a plain typed binder or a
/// let-binder carrying a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalDecl {
    CDecl { name: Name, ty: Expr, info: BinderInfo },
    LDecl { name: Name, ty: Expr, value: Expr },
}

impl LocalDecl {
    pub fn name(&self) -> &Name {
        match self {
            LocalDecl::CDecl { name, .. } | LocalDecl::LDecl { name, .. } => name,
        }
    }

    pub fn ty(&self) -> &Expr {
        match self {
            LocalDecl::CDecl { ty, .. } | LocalDecl::LDecl { ty, .. } => ty,
        }
    }

    /// The bound value of a let-declaration.
    pub fn value(&self) -> Option<&Expr> {
        match self {
            LocalDecl::CDecl { .. } => None,
            LocalDecl::LDecl { value, .. } => Some(value),
        }
    }

    pub fn is_let(&self) -> bool {
        matches!(self, LocalDecl::LDecl { .. })
    }

    pub fn binder_info(&self) -> BinderInfo {
        match self {
            LocalDecl::CDecl { info, .. } => *info,
            LocalDecl::LDecl { .. } => BinderInfo::Default,
        }
    }
}

/// An ordered mapping from free-variable identifiers to local declarations.
///
/// Declarations are added in dependency order: a declaration may reference
/// only identifiers added earlier in the same context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalContext {
    decls: Vec<(FVarId, LocalDecl)>,
    index: HashMap<FVarId, usize>,
}

impl LocalContext {
    pub fn new() -> LocalContext {
        LocalContext::default()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn contains(&self, id: FVarId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn get(&self, id: FVarId) -> Option<&LocalDecl> {
        self.index.get(&id).map(|i| &self.decls[*i].1)
    }

    pub fn decls(&self) -> impl Iterator<Item = (FVarId, &LocalDecl)> {
        self.decls.iter().map(|(id, d)| (*id, d))
    }

    pub fn push_cdecl(&mut self, id: FVarId, name: impl Into<Name>, ty: Expr, info: BinderInfo) {
        self.push(id, LocalDecl::CDecl { name: name.into(), ty, info });
    }

    pub fn push_ldecl(&mut self, id: FVarId, name: impl Into<Name>, ty: Expr, value: Expr) {
        self.push(id, LocalDecl::LDecl { name: name.into(), ty, value });
    }

    fn push(&mut self, id: FVarId, decl: LocalDecl) {
        debug_assert!(!self.contains(id), "duplicate free variable {id}");
        self.index.insert(id, self.decls.len());
        self.decls.push((id, decl));
    }

    /// Drop all declarations after the first `len`, undoing a scoped
    /// extension (e.g. a binder walk).
    pub fn truncate(&mut self, len: usize) {
        while self.decls.len() > len {
            let (id, _) = self.decls.pop().expect("truncate below zero");
            self.index.remove(&id);
        }
    }

    /// Whether this context's declaration sequence is a prefix of `other`'s.
    ///
    /// This is the scope-safety relation for metavariable assignment: a term
    /// well-formed in a sub-prefix context is well-formed in any extension.
    pub fn is_sub_prefix_of(&self, other: &LocalContext) -> bool {
        self.decls.len() <= other.decls.len()
            && self.decls.iter().zip(other.decls.iter()).all(|((a, _), (b, _))| a == b)
    }

    /// Abstract `e` over the given free variables and wrap it in lambda
    /// binders rebuilt from their declarations (let-declarations become let
    /// binders).  Returns `None` if some `fvars` entry is not an fvar
    /// declared here.
    pub fn mk_lambda_fvars(&self, fvars: &[Expr], e: &Expr) -> Option<Expr> {
        self.mk_binding_fvars(true, fvars, e)
    }

    /// Like [LocalContext::mk_lambda_fvars] with pi binders.
    pub fn mk_pi_fvars(&self, fvars: &[Expr], e: &Expr) -> Option<Expr> {
        self.mk_binding_fvars(false, fvars, e)
    }

    fn mk_binding_fvars(&self, is_lambda: bool, fvars: &[Expr], e: &Expr) -> Option<Expr> {
        let mut body = e.abstract_fvars(fvars);
        for (i, x) in fvars.iter().enumerate().rev() {
            let decl = self.get(x.fvar_id()?)?;
            // The domain may refer to earlier fvars of the telescope; those
            // become bound variables of the enclosing binders.
            let ty = decl.ty().abstract_fvars(&fvars[..i]);
            body = match decl.value() {
                Some(v) => {
                    let value = v.abstract_fvars(&fvars[..i]);
                    Expr::let_(Binder::new(decl.name().clone(), ty), value, body)
                }
                None => {
                    let binder = Binder::with_info(decl.name().clone(), ty, decl.binder_info());
                    if is_lambda { Expr::lam(binder, body) } else { Expr::pi(binder, body) }
                }
            };
        }
        Some(body)
    }
}

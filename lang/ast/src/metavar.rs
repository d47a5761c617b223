//! The metavariable context: the global mutable store of metavariable
//! declarations and assignments.
//!
//! A checking episode mutates the store in place; the only undo mechanism is
//! an explicit [MetavarContext::snapshot] taken by the caller before a
//! speculative attempt and a [MetavarContext::restore] if the attempt fails.
//! Within one episode an assignment is never reverted by the engine itself.

use crate::exp::{Expr, ExprKind, FVarId, MVarId};
use crate::lctx::LocalContext;
use crate::HashMap;

/// How a metavariable was created, and whether unification may assign it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetavarKind {
    /// Created directly for a placeholder that unification should solve.
    Natural,
    /// Created for deferred elaboration; unification may still solve it.
    Synthetic,
    /// Must be solved by an external component (e.g. the tactic engine);
    /// read-only for unification.
    SyntheticOpaque,
}

impl MetavarKind {
    pub fn is_read_only(&self) -> bool {
        matches!(self, MetavarKind::SyntheticOpaque)
    }
}

/// The declaration of a metavariable.
#[derive(Debug, Clone)]
pub struct MetavarDecl {
    /// The local context the metavariable was created under.  A solution may
    /// only mention free variables of this context (or of the abstraction
    /// arguments supplied at assignment time).
    pub lctx: LocalContext,
    /// The expected type of the metavariable.
    pub ty: Expr,
    /// Which elaboration pass created the metavariable.  Only metavariables
    /// of the current depth are assignable.
    pub depth: u32,
    pub kind: MetavarKind,
}

/// Mutable store of metavariable declarations and assignments, with a depth
/// counter and the fresh-identifier generator shared by metavariables and
/// free variables.
#[derive(Debug, Clone, Default)]
pub struct MetavarContext {
    decls: HashMap<MVarId, MetavarDecl>,
    assignments: HashMap<MVarId, Expr>,
    depth: u32,
    next_id: u64,
}

impl MetavarContext {
    pub fn new() -> MetavarContext {
        MetavarContext::default()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Enter a new elaboration pass; metavariables of earlier depths become
    /// read-only.
    pub fn incr_depth(&mut self) {
        self.depth += 1;
    }

    pub fn fresh_fvar_id(&mut self) -> FVarId {
        let id = self.next_id;
        self.next_id += 1;
        FVarId(id)
    }

    /// Create a fresh metavariable declared under `lctx` with the given type.
    pub fn mk_mvar(&mut self, lctx: LocalContext, ty: Expr, kind: MetavarKind) -> MVarId {
        let id = MVarId(self.next_id);
        self.next_id += 1;
        self.decls.insert(id, MetavarDecl { lctx, ty, depth: self.depth, kind });
        id
    }

    pub fn get_decl(&self, mvar: MVarId) -> Option<&MetavarDecl> {
        self.decls.get(&mvar)
    }

    pub fn is_assigned(&self, mvar: MVarId) -> bool {
        self.assignments.contains_key(&mvar)
    }

    pub fn get_assignment(&self, mvar: MVarId) -> Option<&Expr> {
        self.assignments.get(&mvar)
    }

    /// Whether unification may assign this metavariable: declared here,
    /// unassigned, created at the current depth, and not read-only.
    pub fn is_assignable(&self, mvar: MVarId) -> bool {
        match self.decls.get(&mvar) {
            Some(decl) => {
                !self.is_assigned(mvar) && decl.depth == self.depth && !decl.kind.is_read_only()
            }
            None => false,
        }
    }

    pub fn assign(&mut self, mvar: MVarId, value: Expr) {
        debug_assert!(!self.is_assigned(mvar), "{mvar} assigned twice");
        self.assignments.insert(mvar, value);
    }

    /// Snapshot the whole store (assignments, declarations and the
    /// identifier counter).  Restoring the snapshot is the caller's sole
    /// mechanism to discard speculative mutations.
    pub fn snapshot(&self) -> MetavarContext {
        self.clone()
    }

    pub fn restore(&mut self, snapshot: MetavarContext) {
        *self = snapshot;
    }

    /// Deeply substitute assigned metavariables in `e`, beta-reducing where
    /// an assignment is applied to arguments.
    pub fn instantiate_mvars(&self, e: &Expr) -> Expr {
        if !e.has_mvar() {
            return e.clone();
        }
        match e.kind() {
            ExprKind::MVar(m) => match self.assignments.get(m) {
                Some(v) => self.instantiate_mvars(v),
                None => e.clone(),
            },
            ExprKind::App(f, a) => {
                let f = self.instantiate_mvars(f);
                let a = self.instantiate_mvars(a);
                Expr::app(f, a).head_beta()
            }
            ExprKind::Lam(b, body) => Expr::lam(
                b.map_ty(|ty| self.instantiate_mvars(ty)),
                self.instantiate_mvars(body),
            ),
            ExprKind::Pi(b, body) => Expr::pi(
                b.map_ty(|ty| self.instantiate_mvars(ty)),
                self.instantiate_mvars(body),
            ),
            ExprKind::Let(b, v, body) => Expr::let_(
                b.map_ty(|ty| self.instantiate_mvars(ty)),
                self.instantiate_mvars(v),
                self.instantiate_mvars(body),
            ),
            ExprKind::Proj(s, i, inner) => Expr::proj(s.clone(), *i, self.instantiate_mvars(inner)),
            ExprKind::MData(m, inner) => Expr::mdata(m.clone(), self.instantiate_mvars(inner)),
            _ => e.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exp::Binder;

    #[test]
    fn assignable_respects_depth_and_kind() {
        let mut mctx = MetavarContext::new();
        let m1 = mctx.mk_mvar(LocalContext::new(), Expr::prop(), MetavarKind::Natural);
        let m2 = mctx.mk_mvar(LocalContext::new(), Expr::prop(), MetavarKind::SyntheticOpaque);
        assert!(mctx.is_assignable(m1));
        assert!(!mctx.is_assignable(m2));

        mctx.incr_depth();
        assert!(!mctx.is_assignable(m1));
        let m3 = mctx.mk_mvar(LocalContext::new(), Expr::prop(), MetavarKind::Natural);
        assert!(mctx.is_assignable(m3));

        mctx.assign(m3, Expr::nat(0));
        assert!(!mctx.is_assignable(m3));
    }

    #[test]
    fn instantiate_mvars_beta_reduces_applied_assignments() {
        let mut mctx = MetavarContext::new();
        let m = mctx.mk_mvar(LocalContext::new(), Expr::prop(), MetavarKind::Natural);
        // ?m := λ x. x, then ?m a  ⇒  a
        mctx.assign(m, Expr::lam(Binder::new("x", Expr::prop()), Expr::bvar(0)));
        let a = Expr::const_("a", vec![]);
        let e = Expr::app(Expr::mvar(m), a.clone());
        assert_eq!(mctx.instantiate_mvars(&e), a);
    }

    #[test]
    fn instantiate_mvars_follows_chains() {
        let mut mctx = MetavarContext::new();
        let m1 = mctx.mk_mvar(LocalContext::new(), Expr::prop(), MetavarKind::Natural);
        let m2 = mctx.mk_mvar(LocalContext::new(), Expr::prop(), MetavarKind::Natural);
        mctx.assign(m1, Expr::mvar(m2));
        mctx.assign(m2, Expr::nat(7));
        assert_eq!(mctx.instantiate_mvars(&Expr::mvar(m1)), Expr::nat(7));
    }

    #[test]
    fn snapshot_restore_discards_assignments() {
        let mut mctx = MetavarContext::new();
        let m = mctx.mk_mvar(LocalContext::new(), Expr::prop(), MetavarKind::Natural);
        let saved = mctx.snapshot();
        mctx.assign(m, Expr::nat(1));
        assert!(mctx.is_assigned(m));
        mctx.restore(saved);
        assert!(!mctx.is_assigned(m));
        assert!(mctx.is_assignable(m));
    }
}

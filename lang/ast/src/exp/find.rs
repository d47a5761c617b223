//! Subterm search and occurs checks.

use super::{Expr, ExprKind, FVarId, MVarId};

impl Expr {
    /// Whether a subterm satisfying the predicate occurs (including the
    /// expression itself).  Binder domains are visited before bodies.
    pub fn find(&self, p: &mut impl FnMut(&Expr) -> bool) -> bool {
        if p(self) {
            return true;
        }
        match self.kind() {
            ExprKind::App(f, a) => f.find(p) || a.find(p),
            ExprKind::Lam(b, body) | ExprKind::Pi(b, body) => b.ty.find(p) || body.find(p),
            ExprKind::Let(b, v, body) => b.ty.find(p) || v.find(p) || body.find(p),
            ExprKind::Proj(_, _, e) | ExprKind::MData(_, e) => e.find(p),
            _ => false,
        }
    }

    /// Occurs check for a free variable, short-circuiting on flag-clean
    /// subtrees.
    pub fn has_fvar_id(&self, id: FVarId) -> bool {
        if !self.has_fvar() {
            return false;
        }
        match self.kind() {
            ExprKind::FVar(x) => *x == id,
            ExprKind::App(f, a) => f.has_fvar_id(id) || a.has_fvar_id(id),
            ExprKind::Lam(b, body) | ExprKind::Pi(b, body) => {
                b.ty.has_fvar_id(id) || body.has_fvar_id(id)
            }
            ExprKind::Let(b, v, body) => {
                b.ty.has_fvar_id(id) || v.has_fvar_id(id) || body.has_fvar_id(id)
            }
            ExprKind::Proj(_, _, e) | ExprKind::MData(_, e) => e.has_fvar_id(id),
            _ => false,
        }
    }

    /// Occurs check for a metavariable, short-circuiting on flag-clean
    /// subtrees.
    pub fn has_mvar_id(&self, id: MVarId) -> bool {
        if !self.has_mvar() {
            return false;
        }
        match self.kind() {
            ExprKind::MVar(x) => *x == id,
            ExprKind::App(f, a) => f.has_mvar_id(id) || a.has_mvar_id(id),
            ExprKind::Lam(b, body) | ExprKind::Pi(b, body) => {
                b.ty.has_mvar_id(id) || body.has_mvar_id(id)
            }
            ExprKind::Let(b, v, body) => {
                b.ty.has_mvar_id(id) || v.has_mvar_id(id) || body.has_mvar_id(id)
            }
            ExprKind::Proj(_, _, e) | ExprKind::MData(_, e) => e.has_mvar_id(id),
            _ => false,
        }
    }
}

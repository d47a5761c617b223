//! Substitution, lifting and abstraction for expressions.
//!
//! All operations preserve structural sharing where possible: subtrees that
//! the cached flags prove unaffected are returned as-is.

use super::{Binder, Expr, ExprKind};
use crate::ident::Name;
use crate::level::Level;

impl Expr {
    /// Replace the loose bound variables `#0 .. #(n-1)` by `subst[0] ..
    /// subst[n-1]`; loose indices beyond the substitution are shifted down
    /// by `n`.
    pub fn instantiate(&self, subst: &[Expr]) -> Expr {
        if subst.is_empty() || !self.has_loose_bvars() {
            return self.clone();
        }
        self.instantiate_core(0, subst)
    }

    /// Like [Expr::instantiate] with the substitution reversed: `#0` is
    /// replaced by the *last* element.  This is the convention for a
    /// telescope of binders consumed outside-in.
    pub fn instantiate_rev(&self, subst: &[Expr]) -> Expr {
        if subst.is_empty() || !self.has_loose_bvars() {
            return self.clone();
        }
        let rev: Vec<Expr> = subst.iter().rev().cloned().collect();
        self.instantiate_core(0, &rev)
    }

    pub fn instantiate1(&self, a: &Expr) -> Expr {
        self.instantiate(std::slice::from_ref(a))
    }

    fn instantiate_core(&self, depth: u32, subst: &[Expr]) -> Expr {
        if self.loose_bvar_range() <= depth {
            return self.clone();
        }
        let n = subst.len() as u32;
        match self.kind() {
            ExprKind::BVar(i) => {
                if *i < depth {
                    self.clone()
                } else if i - depth < n {
                    subst[(i - depth) as usize].lift_loose_bvars(0, depth)
                } else {
                    Expr::bvar(i - n)
                }
            }
            ExprKind::App(f, a) => {
                Expr::app(f.instantiate_core(depth, subst), a.instantiate_core(depth, subst))
            }
            ExprKind::Lam(b, body) => Expr::lam(
                b.map_ty(|ty| ty.instantiate_core(depth, subst)),
                body.instantiate_core(depth + 1, subst),
            ),
            ExprKind::Pi(b, body) => Expr::pi(
                b.map_ty(|ty| ty.instantiate_core(depth, subst)),
                body.instantiate_core(depth + 1, subst),
            ),
            ExprKind::Let(b, v, body) => Expr::let_(
                b.map_ty(|ty| ty.instantiate_core(depth, subst)),
                v.instantiate_core(depth, subst),
                body.instantiate_core(depth + 1, subst),
            ),
            ExprKind::Proj(s, i, e) => Expr::proj(s.clone(), *i, e.instantiate_core(depth, subst)),
            ExprKind::MData(m, e) => Expr::mdata(m.clone(), e.instantiate_core(depth, subst)),
            // Leaves with loose_bvar_range == 0 were returned above.
            _ => self.clone(),
        }
    }

    /// Shift loose bound-variable indices `>= start` up by `amount`.
    pub fn lift_loose_bvars(&self, start: u32, amount: u32) -> Expr {
        if amount == 0 || self.loose_bvar_range() <= start {
            return self.clone();
        }
        match self.kind() {
            ExprKind::BVar(i) => {
                if *i >= start {
                    Expr::bvar(i + amount)
                } else {
                    self.clone()
                }
            }
            ExprKind::App(f, a) => {
                Expr::app(f.lift_loose_bvars(start, amount), a.lift_loose_bvars(start, amount))
            }
            ExprKind::Lam(b, body) => Expr::lam(
                b.map_ty(|ty| ty.lift_loose_bvars(start, amount)),
                body.lift_loose_bvars(start + 1, amount),
            ),
            ExprKind::Pi(b, body) => Expr::pi(
                b.map_ty(|ty| ty.lift_loose_bvars(start, amount)),
                body.lift_loose_bvars(start + 1, amount),
            ),
            ExprKind::Let(b, v, body) => Expr::let_(
                b.map_ty(|ty| ty.lift_loose_bvars(start, amount)),
                v.lift_loose_bvars(start, amount),
                body.lift_loose_bvars(start + 1, amount),
            ),
            ExprKind::Proj(s, i, e) => Expr::proj(s.clone(), *i, e.lift_loose_bvars(start, amount)),
            ExprKind::MData(m, e) => Expr::mdata(m.clone(), e.lift_loose_bvars(start, amount)),
            _ => self.clone(),
        }
    }

    /// Replace the given free variables by loose bound variables: at depth
    /// `0`, `fvars[j]` becomes `#(n-1-j)`, so the *last* free variable binds
    /// closest.  Used to close a solution over the arguments of a
    /// metavariable before wrapping it in binders.
    pub fn abstract_fvars(&self, fvars: &[Expr]) -> Expr {
        if fvars.is_empty() || !self.has_fvar() {
            return self.clone();
        }
        self.abstract_core(0, fvars)
    }

    fn abstract_core(&self, depth: u32, fvars: &[Expr]) -> Expr {
        if !self.has_fvar() {
            return self.clone();
        }
        let n = fvars.len() as u32;
        match self.kind() {
            ExprKind::FVar(_) => match fvars.iter().position(|x| x == self) {
                Some(j) => Expr::bvar(depth + (n - 1 - j as u32)),
                None => self.clone(),
            },
            ExprKind::App(f, a) => {
                Expr::app(f.abstract_core(depth, fvars), a.abstract_core(depth, fvars))
            }
            ExprKind::Lam(b, body) => Expr::lam(
                b.map_ty(|ty| ty.abstract_core(depth, fvars)),
                body.abstract_core(depth + 1, fvars),
            ),
            ExprKind::Pi(b, body) => Expr::pi(
                b.map_ty(|ty| ty.abstract_core(depth, fvars)),
                body.abstract_core(depth + 1, fvars),
            ),
            ExprKind::Let(b, v, body) => Expr::let_(
                b.map_ty(|ty| ty.abstract_core(depth, fvars)),
                v.abstract_core(depth, fvars),
                body.abstract_core(depth + 1, fvars),
            ),
            ExprKind::Proj(s, i, e) => Expr::proj(s.clone(), *i, e.abstract_core(depth, fvars)),
            ExprKind::MData(m, e) => Expr::mdata(m.clone(), e.abstract_core(depth, fvars)),
            _ => self.clone(),
        }
    }

    /// Reduce the outermost chain of beta redexes, `(λ x₁ .. xₖ. b) a₁ .. aₙ`
    /// with `k <= n`, to `b[x := a] aₖ₊₁ .. aₙ`.  Repeats until the head is
    /// no longer a lambda applied to arguments.
    pub fn head_beta(&self) -> Expr {
        let (f, args) = self.get_app_fn_args();
        if args.is_empty() || !f.is_lambda() {
            return self.clone();
        }
        let mut consumed = 0;
        let mut body = f;
        while consumed < args.len() {
            match body.kind() {
                ExprKind::Lam(_, b) => {
                    body = b;
                    consumed += 1;
                }
                _ => break,
            }
        }
        let reduced = body.instantiate_rev(&args[..consumed]);
        Expr::apps(reduced, &args[consumed..]).head_beta_rest()
    }

    fn head_beta_rest(&self) -> Expr {
        let f = self.get_app_fn();
        if self.is_app() && f.is_lambda() { self.head_beta() } else { self.clone() }
    }

    /// Substitute universe-level parameters, used when instantiating the
    /// type or value of a level-polymorphic constant.
    pub fn instantiate_level_params(&self, params: &[Name], levels: &[Level]) -> Expr {
        if params.is_empty() {
            return self.clone();
        }
        match self.kind() {
            ExprKind::Sort(l) => Expr::sort(l.instantiate_params(params, levels)),
            ExprKind::Const(n, ls) => Expr::const_(
                n.clone(),
                ls.iter().map(|l| l.instantiate_params(params, levels)).collect(),
            ),
            ExprKind::App(f, a) => Expr::app(
                f.instantiate_level_params(params, levels),
                a.instantiate_level_params(params, levels),
            ),
            ExprKind::Lam(b, body) => Expr::lam(
                b.map_ty(|ty| ty.instantiate_level_params(params, levels)),
                body.instantiate_level_params(params, levels),
            ),
            ExprKind::Pi(b, body) => Expr::pi(
                b.map_ty(|ty| ty.instantiate_level_params(params, levels)),
                body.instantiate_level_params(params, levels),
            ),
            ExprKind::Let(b, v, body) => Expr::let_(
                b.map_ty(|ty| ty.instantiate_level_params(params, levels)),
                v.instantiate_level_params(params, levels),
                body.instantiate_level_params(params, levels),
            ),
            ExprKind::Proj(s, i, e) => {
                Expr::proj(s.clone(), *i, e.instantiate_level_params(params, levels))
            }
            ExprKind::MData(m, e) => {
                Expr::mdata(m.clone(), e.instantiate_level_params(params, levels))
            }
            _ => self.clone(),
        }
    }
}

impl Binder {
    pub(crate) fn map_ty(&self, f: impl FnOnce(&Expr) -> Expr) -> Binder {
        Binder { name: self.name.clone(), ty: f(&self.ty), info: self.info }
    }
}

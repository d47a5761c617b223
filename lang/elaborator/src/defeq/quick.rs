//! The quick dispatcher: cheap syntactic rules and metavariable assignment,
//! tried before any reduction machinery.

use ast::print::PrintToString;
use ast::{Expr, ExprKind, MVarId};

use super::{Dec, Decided, Undetermined};
use crate::result::{TcResult, TypeError};
use crate::TypeChecker;

impl TypeChecker<'_> {
    /// Decide the problem by shape alone where possible.  Assigned
    /// metavariables must already be instantiated in `t` and `s`.
    pub(crate) fn is_def_eq_quick(&mut self, t: &Expr, s: &Expr) -> TcResult<Dec> {
        match (t.kind(), s.kind()) {
            (ExprKind::Lit(a), ExprKind::Lit(b)) => Ok(Decided(a == b)),
            (ExprKind::Sort(u), ExprKind::Sort(v)) => Ok(Decided(u.is_equiv(v))),
            (ExprKind::Lam(..), ExprKind::Lam(..)) | (ExprKind::Pi(..), ExprKind::Pi(..)) => {
                Ok(Decided(self.is_def_eq_binding(t, s)?))
            }
            (ExprKind::MData(_, inner), _) => {
                let inner = inner.clone();
                self.is_def_eq_quick(&inner, s)
            }
            (_, ExprKind::MData(_, inner)) => {
                let inner = inner.clone();
                self.is_def_eq_quick(t, &inner)
            }
            (ExprKind::FVar(a), ExprKind::FVar(b)) => {
                // A let-bound variable may still become equal after zeta
                // unfolding; leave that to the reduction stage.
                let is_let =
                    |tc: &Self, id| tc.lctx.get(id).is_some_and(|decl| decl.is_let());
                if is_let(self, *a) || is_let(self, *b) {
                    Ok(Undetermined)
                } else {
                    Ok(Decided(a == b))
                }
            }
            _ => self.is_def_eq_quick_other(t, s),
        }
    }

    fn is_def_eq_quick_other(&mut self, t: &Expr, s: &Expr) -> TcResult<Dec> {
        if t == s {
            return Ok(Decided(true));
        }

        // λ x₁..xₙ. ?m x₁..xₙ  ≡  ?m without reducing anything.
        if let Some(m) = self.eta_unassigned_mvar(t) {
            if s.mvar_id() == Some(m) {
                return Ok(Decided(true));
            }
        }
        if let Some(m) = self.eta_unassigned_mvar(s) {
            if t.mvar_id() == Some(m) {
                return Ok(Decided(true));
            }
        }

        let t_mvar = t.get_app_fn().mvar_id();
        let s_mvar = s.get_app_fn().mvar_id();
        let t_assignable = t_mvar.is_some_and(|m| self.mctx.is_assignable(m));
        let s_assignable = s_mvar.is_some_and(|m| self.mctx.is_assignable(m));

        match (t_mvar, s_mvar) {
            (None, None) => Ok(Undetermined),
            (Some(tm), Some(sm)) if t_assignable && s_assignable => {
                if self.prefer_assign_right(tm, t, sm, s) {
                    if self.process_assignment(s, t)? {
                        return Ok(Decided(true));
                    }
                    Ok(Decided(self.process_assignment(t, s)?))
                } else {
                    if self.process_assignment(t, s)? {
                        return Ok(Decided(true));
                    }
                    Ok(Decided(self.process_assignment(s, t)?))
                }
            }
            _ if t_assignable => Ok(Decided(self.process_assignment(t, s)?)),
            _ if s_assignable => Ok(Decided(self.process_assignment(s, t)?)),
            _ => {
                // Flexible head that may not be assigned here (read-only,
                // foreign depth, or already assigned under a binder).
                if self.cfg.defeq_stuck_ex {
                    return Err(Box::new(TypeError::Stuck {
                        lhs: t.print_to_string(),
                        rhs: s.print_to_string(),
                    }));
                }
                Ok(Undetermined)
            }
        }
    }

    /// For a double-flex problem `?m₁ .. =?= ?m₂ ..`, whether `?m₂` should be
    /// assigned rather than `?m₁`.  Assigning the metavariable with the
    /// bigger local context keeps the solution in the more general one; with
    /// comparable contexts, prefer assigning the side without arguments.
    fn prefer_assign_right(&self, tm: MVarId, t: &Expr, sm: MVarId, s: &Expr) -> bool {
        let (Some(td), Some(sd)) = (self.mctx.get_decl(tm), self.mctx.get_decl(sm)) else {
            return false;
        };
        let t_le_s = td.lctx.is_sub_prefix_of(&sd.lctx);
        let s_le_t = sd.lctx.is_sub_prefix_of(&td.lctx);
        if t_le_s && !s_le_t {
            return true;
        }
        if s_le_t && !t_le_s {
            return false;
        }
        t.is_app() && !s.is_app()
    }

    /// Recognize `λ x₁..xₙ. ?m x₁..xₙ` (or a bare `?m`) for an unassigned,
    /// declared metavariable `?m`, returning the metavariable.
    pub(crate) fn eta_unassigned_mvar(&self, e: &Expr) -> Option<MVarId> {
        let mut n = 0usize;
        let mut cur = e;
        while let ExprKind::Lam(_, body) = cur.kind() {
            cur = body;
            n += 1;
        }
        let (f, args) = cur.get_app_fn_args();
        let m = f.mvar_id()?;
        if args.len() != n {
            return None;
        }
        for (i, a) in args.iter().enumerate() {
            match a.kind() {
                ExprKind::BVar(j) if *j as usize == n - 1 - i => {}
                _ => return None,
            }
        }
        if self.mctx.get_decl(m).is_some() && !self.mctx.is_assigned(m) {
            Some(m)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{Binder, Environment, Level, LocalContext, MetavarContext, MetavarKind};

    fn nat() -> Expr {
        Expr::const_("Nat", vec![])
    }

    fn env_with_nat() -> Environment {
        let mut env = Environment::new();
        env.add_axiom("Nat", Expr::sort(Level::of_nat(1)));
        env
    }

    #[test]
    fn literals_and_sorts() {
        let env = env_with_nat();
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        assert!(matches!(
            tc.is_def_eq_quick(&Expr::nat(1), &Expr::nat(1)).unwrap(),
            Decided(true)
        ));
        assert!(matches!(
            tc.is_def_eq_quick(&Expr::nat(1), &Expr::nat(2)).unwrap(),
            Decided(false)
        ));
        assert!(matches!(
            tc.is_def_eq_quick(&Expr::prop(), &Expr::sort(Level::Zero)).unwrap(),
            Decided(true)
        ));
    }

    #[test]
    fn let_bound_fvars_are_deferred() {
        let env = env_with_nat();
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let x = tc.push_local_let("x", nat(), Expr::nat(1));
        let y = tc.push_local("y", nat(), ast::BinderInfo::Default);
        assert!(matches!(tc.is_def_eq_quick(&x, &y).unwrap(), Undetermined));
        assert!(matches!(tc.is_def_eq_quick(&y, &y).unwrap(), Decided(true)));
    }

    #[test]
    fn eta_mvar_shortcut() {
        let env = env_with_nat();
        let mut mctx = MetavarContext::new();
        let m = mctx.mk_mvar(
            LocalContext::new(),
            Expr::pi(Binder::new("x", nat()), nat()),
            MetavarKind::SyntheticOpaque,
        );
        let mut tc = TypeChecker::new(&env, &mut mctx);

        // λ x. ?m x =?= ?m decides true even though ?m is read-only
        let expanded = Expr::lam(
            Binder::new("x", nat()),
            Expr::app(Expr::mvar(m), Expr::bvar(0)),
        );
        assert!(matches!(
            tc.is_def_eq_quick(&expanded, &Expr::mvar(m)).unwrap(),
            Decided(true)
        ));
        assert_eq!(tc.eta_unassigned_mvar(&expanded), Some(m));

        // wrong argument order is not the eta shape
        let scrambled = Expr::lam(
            Binder::new("x", nat()),
            Expr::lam(
                Binder::new("y", nat()),
                Expr::apps(Expr::mvar(m), &[Expr::bvar(0), Expr::bvar(1)]),
            ),
        );
        assert_eq!(tc.eta_unassigned_mvar(&scrambled), None);
    }

    #[test]
    fn double_flex_assigns_the_bigger_context() {
        let env = env_with_nat();
        let mut mctx = MetavarContext::new();
        let m1 = mctx.mk_mvar(LocalContext::new(), nat(), MetavarKind::Natural);
        let mut big = LocalContext::new();
        let x = mctx.fresh_fvar_id();
        big.push_cdecl(x, "x", nat(), ast::BinderInfo::Default);
        let m2 = mctx.mk_mvar(big.clone(), nat(), MetavarKind::Natural);

        let mut tc = TypeChecker::new(&env, &mut mctx);
        tc.lctx = big;
        assert!(tc.is_def_eq(&Expr::mvar(m1), &Expr::mvar(m2)).unwrap());
        // ?m2 (bigger context) is assigned to ?m1
        assert_eq!(mctx.get_assignment(m2), Some(&Expr::mvar(m1)));
        assert!(!mctx.is_assigned(m1));
    }

    #[test]
    fn stuck_mode_raises() {
        let env = env_with_nat();
        let mut mctx = MetavarContext::new();
        let m = mctx.mk_mvar(LocalContext::new(), nat(), MetavarKind::SyntheticOpaque);
        let mut tc = TypeChecker::new(&env, &mut mctx);
        tc.cfg.defeq_stuck_ex = true;

        let err = tc.is_def_eq(&Expr::mvar(m), &Expr::nat(1)).unwrap_err();
        assert!(matches!(*err, TypeError::Stuck { .. }));
    }
}

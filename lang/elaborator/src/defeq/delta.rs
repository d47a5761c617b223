//! Lazy delta unfolding.
//!
//! When both sides of an equation are stuck on defined constants, the order
//! in which they are unfolded decides how fast the heads converge: the
//! definitional height recorded in [ReducibilityHints] orders the candidates
//! so the "younger" definition is opened first.  Before unfolding a constant
//! applied on both sides, a cheaper heuristic tries to equate the spines
//! without opening the definition at all.

use log::trace;

use ast::print::PrintToString;
use ast::{ConstantInfo, Expr, ExprKind, Reducibility, TransparencyMode};

use super::Decided;
use crate::result::TcResult;
use crate::TypeChecker;

/// Outcome of the delta loop: either the problem was decided along the way,
/// or no candidate remains and the final forms are handed back.
pub(crate) enum DeltaResult {
    Decided(bool),
    Exhausted(Expr, Expr),
}

enum UnfoldSide {
    Left,
    Right,
    Both,
}

impl<'e> TypeChecker<'e> {
    /// Unfold defined constants on either side until the problem is decided
    /// by the quick dispatcher or no unfoldable head remains.
    pub(crate) fn is_def_eq_delta(&mut self, t: &Expr, s: &Expr) -> TcResult<DeltaResult> {
        let mut t = t.clone();
        let mut s = s.clone();
        loop {
            let t_info = self.delta_candidate(&t);
            let s_info = self.delta_candidate(&s);
            let side = match (t_info, s_info) {
                (None, None) => return Ok(DeltaResult::Exhausted(t, s)),
                (Some(_), None) => UnfoldSide::Left,
                (None, Some(_)) => UnfoldSide::Right,
                (Some(ti), Some(si)) if ti.name == si.name => {
                    if t.is_app() && s.is_app() {
                        let heuristic =
                            self.commit_when(|tc| tc.same_const_heuristic(&t, &s))?;
                        if heuristic {
                            return Ok(DeltaResult::Decided(true));
                        }
                    }
                    UnfoldSide::Both
                }
                (Some(ti), Some(si)) => self.unfold_priority(ti, si),
            };
            match side {
                UnfoldSide::Left => {
                    trace!("delta left: {}", t.print_to_string());
                    t = self.delta_step(&t)?;
                }
                UnfoldSide::Right => {
                    trace!("delta right: {}", s.print_to_string());
                    s = self.delta_step(&s)?;
                }
                UnfoldSide::Both => {
                    trace!("delta both: {} =?= {}", t.print_to_string(), s.print_to_string());
                    t = self.delta_step(&t)?;
                    s = self.delta_step(&s)?;
                }
            }
            if let Decided(b) = self.is_def_eq_quick(&t, &s)? {
                return Ok(DeltaResult::Decided(b));
            }
        }
    }

    /// The constant declaration at the head of `e`, if the active
    /// transparency mode would let us unfold it.
    fn delta_candidate(&self, e: &Expr) -> Option<&'e ConstantInfo> {
        let ExprKind::Const(name, levels) = e.get_app_fn().strip_mdata().kind() else {
            return None;
        };
        let info = self.env.get_constant(name)?;
        if !ast::can_unfold(self.cfg.transparency, info)
            || levels.len() != info.level_params.len()
        {
            return None;
        }
        Some(info)
    }

    /// `c as =?= c bs` with the same defined constant on both heads: when
    /// the universe levels agree and the spines unify pairwise, the equation
    /// holds without opening `c`.  Failure here is not final, so the caller
    /// falls back to unfolding both sides.
    fn same_const_heuristic(&mut self, t: &Expr, s: &Expr) -> TcResult<bool> {
        let (f1, args1) = t.get_app_fn_args();
        let (f2, args2) = s.get_app_fn_args();
        if args1.len() != args2.len() {
            return Ok(false);
        }
        let (ExprKind::Const(_, ls1), ExprKind::Const(_, ls2)) =
            (f1.strip_mdata().kind(), f2.strip_mdata().kind())
        else {
            return Ok(false);
        };
        if !super::is_level_list_equiv(ls1, ls2) {
            return Ok(false);
        }
        let f1 = f1.clone();
        self.is_def_eq_args(&f1, &args1, &args2)
    }

    /// Which side to unfold when the heads are distinct defined constants.
    ///
    /// At `Default` and `All` transparency a `@[reducible]` definition is
    /// opened first regardless of heights: abbreviation-like definitions
    /// are meant to disappear.  Otherwise the definitional height decides,
    /// with a tie unfolding both sides.
    fn unfold_priority(&self, ti: &ConstantInfo, si: &ConstantInfo) -> UnfoldSide {
        if self.cfg.transparency >= TransparencyMode::Default {
            let t_red = ti.reducibility == Reducibility::Reducible;
            let s_red = si.reducibility == Reducibility::Reducible;
            if t_red && !s_red {
                return UnfoldSide::Left;
            }
            if s_red && !t_red {
                return UnfoldSide::Right;
            }
        }
        if ti.hints().unfolds_before(&si.hints()) {
            UnfoldSide::Left
        } else if si.hints().unfolds_before(&ti.hints()) {
            UnfoldSide::Right
        } else {
            UnfoldSide::Both
        }
    }

    fn delta_step(&mut self, e: &Expr) -> TcResult<Expr> {
        match self.unfold_definition(e) {
            Some(next) => self.whnf_core(&next),
            None => Ok(e.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{
        Binder, Environment, Level, LocalContext, MetavarContext, MetavarKind,
        ReducibilityHints,
    };

    fn nat() -> Expr {
        Expr::const_("Nat", vec![])
    }

    fn base_env() -> Environment {
        let mut env = Environment::new();
        env.add_axiom("Nat", Expr::sort(Level::of_nat(1)));
        env
    }

    #[test]
    fn higher_definition_unfolds_first() {
        let mut env = base_env();
        env.add_defn_with(
            "one",
            nat(),
            Expr::nat(1),
            Reducibility::Default,
            ReducibilityHints::Regular(1),
        );
        env.add_defn_with(
            "alsoOne",
            nat(),
            Expr::const_("one", vec![]),
            Reducibility::Default,
            ReducibilityHints::Regular(2),
        );
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        // alsoOne (height 2) unfolds to one, closing the gap without
        // touching one itself.
        let a = Expr::const_("alsoOne", vec![]);
        let b = Expr::const_("one", vec![]);
        assert!(tc.is_def_eq(&a, &b).unwrap());
        assert!(tc.is_def_eq(&b, &a).unwrap());
    }

    #[test]
    fn same_constant_spines_unify_without_unfolding() {
        let mut env = base_env();
        env.add_defn(
            "double",
            Expr::pi(Binder::new("x", nat()), nat()),
            Expr::lam(Binder::new("x", nat()), Expr::bvar(0)),
        );
        let mut mctx = MetavarContext::new();
        let m = mctx.mk_mvar(LocalContext::new(), nat(), MetavarKind::Natural);
        let mut tc = TypeChecker::new(&env, &mut mctx);

        // double ?m =?= double 2 solves the argument directly.
        let lhs = Expr::app(Expr::const_("double", vec![]), Expr::mvar(m));
        let rhs = Expr::app(Expr::const_("double", vec![]), Expr::nat(2));
        assert!(tc.is_def_eq(&lhs, &rhs).unwrap());
        assert_eq!(mctx.get_assignment(m), Some(&Expr::nat(2)));
    }

    #[test]
    fn heuristic_failure_falls_back_to_unfolding() {
        let mut env = base_env();
        // constFn ignores its argument, so constFn 1 = constFn 2 even
        // though the spines disagree.
        env.add_defn(
            "constFn",
            Expr::pi(Binder::new("x", nat()), nat()),
            Expr::lam(Binder::new("x", nat()), Expr::nat(0)),
        );
        env.add_defn(
            "idFn",
            Expr::pi(Binder::new("x", nat()), nat()),
            Expr::lam(Binder::new("x", nat()), Expr::bvar(0)),
        );
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let app = |f: &str, n: u64| Expr::app(Expr::const_(f, vec![]), Expr::nat(n));
        assert!(tc.is_def_eq(&app("constFn", 1), &app("constFn", 2)).unwrap());
        assert!(!tc.is_def_eq(&app("idFn", 1), &app("idFn", 2)).unwrap());
    }

    #[test]
    fn reducible_definitions_open_at_every_transparency() {
        let mut env = base_env();
        env.add_axiom("c", nat());
        env.add_defn_with(
            "cAlias",
            nat(),
            Expr::const_("c", vec![]),
            Reducibility::Reducible,
            ReducibilityHints::Abbrev,
        );
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);
        tc.cfg.transparency = TransparencyMode::Reducible;

        let alias = Expr::const_("cAlias", vec![]);
        let c = Expr::const_("c", vec![]);
        assert!(tc.is_def_eq(&alias, &c).unwrap());
    }
}

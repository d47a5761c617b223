//! The definitional-equality decision procedure.
//!
//! Based on the following references:
//!
//! * Andreas Abel, and Brigitte Pientka. "Higher-order dynamic pattern unification for dependent types and records." (2011)
//! * Adam Gundry and Conor McBride. "A tutorial implementation of dynamic pattern unification." (2013).
//! * András Kovács's elaboration-zoo (https://github.com/AndrasKovacs/elaboration-zoo)
//!
//! A call runs through a fixed sequence of stages: the quick dispatcher,
//! proof irrelevance, weak-head reduction, the literal offset check, the
//! delta-unfolding loop, eta, and finally structural recursion into
//! application spines.  Each stage either decides the problem or falls
//! through to the next; `false` from the whole procedure means "no proof of
//! equality found", which covers both genuine inequality and problems the
//! approximations cannot solve.

use std::fmt;

use log::trace;

use ast::print::PrintToString;
use ast::{BinderInfo, Expr, ExprKind, Level, TransparencyMode};

use crate::result::TcResult;
use crate::TypeChecker;

mod assign;
mod binder;
mod delta;
mod fo;
mod quick;

use delta::DeltaResult;

/// Outcome of a single dispatch stage.
pub enum Dec {
    Decided(bool),
    Undetermined,
}

pub use Dec::*;

impl fmt::Debug for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decided(b) => f.debug_tuple("Decided").field(b).finish(),
            Self::Undetermined => f.debug_tuple("Undetermined").finish(),
        }
    }
}

impl TypeChecker<'_> {
    /// Decide whether `t` and `s` are definitionally equal, assigning
    /// metavariables where a unique solution is syntactically evident.
    ///
    /// A `true` answer may leave new assignments in the metavariable
    /// context; a `false` answer leaves it exactly as found, assignments
    /// from failed speculative branches included.
    pub fn is_def_eq(&mut self, t: &Expr, s: &Expr) -> TcResult<bool> {
        trace!("{} =?= {}", t.print_to_string(), s.print_to_string());
        let saved = self.mctx.snapshot();
        match self.is_def_eq_core(t, s) {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.mctx.restore(saved);
                Ok(false)
            }
            Err(err) => {
                self.mctx.restore(saved);
                Err(err)
            }
        }
    }

    fn is_def_eq_core(&mut self, t: &Expr, s: &Expr) -> TcResult<bool> {
        let t = if t.has_mvar() { self.mctx.instantiate_mvars(t) } else { t.clone() };
        let s = if s.has_mvar() { self.mctx.instantiate_mvars(s) } else { s.clone() };

        if let Decided(b) = self.is_def_eq_quick(&t, &s)? {
            return Ok(b);
        }
        if self.is_def_eq_proof_irrel(&t, &s)? {
            return Ok(true);
        }

        let tw = self.whnf_core(&t)?;
        let sw = self.whnf_core(&s)?;
        if tw != t || sw != s {
            if let Decided(b) = self.is_def_eq_quick(&tw, &sw)? {
                return Ok(b);
            }
        }

        if let Some(b) = self.is_def_eq_offset(&tw, &sw)? {
            return Ok(b);
        }

        let (t, s) = match self.is_def_eq_delta(&tw, &sw)? {
            DeltaResult::Decided(b) => return Ok(b),
            DeltaResult::Exhausted(t, s) => (t, s),
        };

        if let Decided(b) = self.is_def_eq_eta(&t, &s)? {
            return Ok(b);
        }

        if let Decided(b) = self.is_def_eq_structural(&t, &s)? {
            return Ok(b);
        }

        // Last resort: argument-wise decomposition of a flexible application
        // against another application.
        if self.cfg.fo_approx {
            let t_flex = t.is_app() && t.get_app_fn().is_mvar();
            let s_flex = s.is_app() && s.get_app_fn().is_mvar();
            if t_flex && s.is_app() {
                return self.commit_when(|tc| tc.is_def_eq_fo(&t, &s));
            }
            if s_flex && t.is_app() {
                return self.commit_when(|tc| tc.is_def_eq_fo(&s, &t));
            }
        }

        Ok(false)
    }

    /// Compare terms that are both in weak-head normal form with
    /// non-unfoldable heads, by recursing into their components.
    fn is_def_eq_structural(&mut self, t: &Expr, s: &Expr) -> TcResult<Dec> {
        match (t.kind(), s.kind()) {
            (ExprKind::Const(n1, ls1), ExprKind::Const(n2, ls2)) => {
                Ok(Decided(n1 == n2 && is_level_list_equiv(ls1, ls2)))
            }
            (ExprKind::Proj(_, i1, a), ExprKind::Proj(_, i2, b)) => {
                if i1 != i2 {
                    return Ok(Decided(false));
                }
                let (a, b) = (a.clone(), b.clone());
                Ok(Decided(self.is_def_eq(&a, &b)?))
            }
            (ExprKind::App(..), ExprKind::App(..)) => {
                let (f1, args1) = t.get_app_fn_args();
                let (f2, args2) = s.get_app_fn_args();
                if args1.len() != args2.len() {
                    return Ok(Undetermined);
                }
                let (f1, f2) = (f1.clone(), f2.clone());
                if !self.is_def_eq(&f1, &f2)? {
                    return Ok(Undetermined);
                }
                Ok(Decided(self.is_def_eq_args(&f1, &args1, &args2)?))
            }
            _ => Ok(Undetermined),
        }
    }

    /// Pairwise argument comparison for application spines with equal heads.
    ///
    /// Explicit arguments are compared in a first pass, together with any
    /// implicit argument that is already an unassigned metavariable in eta
    /// form (those decide cheaply and cannot produce spurious higher-order
    /// patterns).  The remaining implicit and instance-implicit arguments
    /// are compared in a second pass at `Default` transparency or wider.
    fn is_def_eq_args(&mut self, f: &Expr, args1: &[Expr], args2: &[Expr]) -> TcResult<bool> {
        debug_assert_eq!(args1.len(), args2.len());
        let infos = self.binder_infos(f, args1.len());

        let mut postponed = Vec::new();
        for i in 0..args1.len() {
            let explicit = infos.get(i).is_none_or(|info| info.is_explicit());
            let eta_safe = self.eta_unassigned_mvar(&args1[i]).is_some()
                || self.eta_unassigned_mvar(&args2[i]).is_some();
            if explicit || eta_safe {
                if !self.is_def_eq(&args1[i], &args2[i])? {
                    return Ok(false);
                }
            } else {
                postponed.push(i);
            }
        }

        let mode = self.cfg.transparency.max(TransparencyMode::Default);
        for i in postponed {
            let eq = self.with_transparency(mode, |tc| tc.is_def_eq(&args1[i], &args2[i]))?;
            if !eq {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Binder annotations of the first `n` arguments of `f`, read off its
    /// inferred type.  Falls back to fewer entries when the type cannot be
    /// inferred or runs out of visible binders; missing entries are treated
    /// as explicit.
    fn binder_infos(&mut self, f: &Expr, n: usize) -> Vec<BinderInfo> {
        let mut infos = Vec::with_capacity(n);
        let Ok(mut ty) = self.infer_type(f) else {
            return infos;
        };
        for _ in 0..n {
            let Ok((binder, body)) = self.ensure_pi(&ty) else {
                break;
            };
            infos.push(binder.info);
            // Argument values do not influence the remaining annotations we
            // care about, so keep the body open.
            ty = body;
        }
        infos
    }

    /// Compare terms built from natural-number successor spines and
    /// literals, e.g. `Nat.succ n =?= 5`.  Returns `None` unless stripping
    /// successors produces a strictly smaller subproblem: a side without a
    /// successor spine stands aside so the problem goes to the delta and
    /// structural stages instead of being re-issued unchanged.
    fn is_def_eq_offset(&mut self, t: &Expr, s: &Expr) -> TcResult<Option<bool>> {
        let (t_base, t_off) = offset_view(t);
        let (s_base, s_off) = offset_view(s);
        match (t_base, s_base) {
            (Some(a), Some(b)) if t_off > 0 && s_off > 0 => {
                let k = t_off.min(s_off);
                let a = add_offset(a, t_off - k);
                let b = add_offset(b, s_off - k);
                Ok(Some(self.is_def_eq(&a, &b)?))
            }
            (Some(a), None) if t_off > 0 => {
                if s_off < t_off {
                    return Ok(Some(false));
                }
                Ok(Some(self.is_def_eq(&a, &Expr::nat(s_off - t_off))?))
            }
            (None, Some(b)) if s_off > 0 => {
                if t_off < s_off {
                    return Ok(Some(false));
                }
                Ok(Some(self.is_def_eq(&Expr::nat(t_off - s_off), &b)?))
            }
            (None, None) => Ok(Some(t_off == s_off)),
            _ => Ok(None),
        }
    }
}

fn is_level_list_equiv(ls1: &[Level], ls2: &[Level]) -> bool {
    ls1.len() == ls2.len() && ls1.iter().zip(ls2).all(|(a, b)| a.is_equiv(b))
}

/// Decompose `Nat.succ (Nat.succ ... e)` into `(Some(e), k)` and a natural
/// literal `n` into `(None, n)`.  Other shapes yield `(Some(e), 0)`.
fn offset_view(e: &Expr) -> (Option<Expr>, u64) {
    if let ExprKind::Lit(ast::Literal::Nat(n)) = e.kind() {
        return (None, *n);
    }
    let succ = ast::Name::from("Nat.succ");
    let mut cur = e;
    let mut k = 0;
    loop {
        let ExprKind::App(f, a) = cur.kind() else { break };
        if f.strip_mdata().const_name() != Some(&succ) {
            break;
        }
        k += 1;
        cur = a;
        if let ExprKind::Lit(ast::Literal::Nat(n)) = cur.kind() {
            return (None, n + k);
        }
    }
    (Some(cur.clone()), k)
}

fn add_offset(e: Expr, k: u64) -> Expr {
    let mut e = e;
    for _ in 0..k {
        e = Expr::app(Expr::const_("Nat.succ", vec![]), e);
    }
    e
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{
        Binder, Environment, LocalContext, MetavarContext, MetavarKind, Reducibility,
        ReducibilityHints,
    };

    fn ty0() -> Expr {
        Expr::sort(Level::of_nat(1))
    }

    /// Run with `RUST_LOG=trace` to see the stages a problem goes through.
    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn nat_env() -> Environment {
        let mut env = Environment::new();
        env.add_axiom("Nat", ty0());
        env.add_axiom(
            "Nat.succ",
            Expr::pi(Binder::new("n", Expr::const_("Nat", vec![])), Expr::const_("Nat", vec![])),
        );
        env
    }

    #[test]
    fn reflexivity() {
        init_logger();
        let env = nat_env();
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let nat = Expr::const_("Nat", vec![]);
        let terms = [
            Expr::nat(7),
            Expr::lam(Binder::new("x", nat.clone()), Expr::bvar(0)),
            Expr::pi(Binder::new("x", nat.clone()), nat.clone()),
            Expr::apps(Expr::const_("Nat.succ", vec![]), &[Expr::nat(0)]),
        ];
        for e in &terms {
            assert!(tc.is_def_eq(e, e).unwrap(), "not reflexive: {e:?}");
        }
    }

    #[test]
    fn beta_and_zeta_equalities() {
        let env = nat_env();
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);
        let nat = Expr::const_("Nat", vec![]);

        // (λ x. x) 5 =?= 5
        let id = Expr::lam(Binder::new("x", nat.clone()), Expr::bvar(0));
        assert!(tc.is_def_eq(&Expr::app(id, Expr::nat(5)), &Expr::nat(5)).unwrap());

        // let x := 5; x =?= 5
        let l = Expr::let_(Binder::new("x", nat), Expr::nat(5), Expr::bvar(0));
        assert!(tc.is_def_eq(&l, &Expr::nat(5)).unwrap());
    }

    #[test]
    fn delta_plus_beta_scenario() {
        init_logger();
        // f := fun x => x;  f 5 =?= 5
        let mut env = nat_env();
        let nat = Expr::const_("Nat", vec![]);
        env.add_defn(
            "f",
            Expr::pi(Binder::new("x", nat.clone()), nat.clone()),
            Expr::lam(Binder::new("x", nat), Expr::bvar(0)),
        );
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let e = Expr::app(Expr::const_("f", vec![]), Expr::nat(5));
        assert!(tc.is_def_eq(&e, &Expr::nat(5)).unwrap());
        assert!(tc.is_def_eq(&Expr::nat(5), &e).unwrap());
    }

    #[test]
    fn mvar_is_assigned_to_literal() {
        let env = nat_env();
        let mut mctx = MetavarContext::new();
        let m = mctx.mk_mvar(
            LocalContext::new(),
            Expr::const_("Nat", vec![]),
            MetavarKind::Natural,
        );
        let mut tc = TypeChecker::new(&env, &mut mctx);

        assert!(tc.is_def_eq(&Expr::mvar(m), &Expr::nat(5)).unwrap());
        assert_eq!(mctx.get_assignment(m), Some(&Expr::nat(5)));
    }

    #[test]
    fn binder_equality_with_shared_variables() {
        // fun x y => g y x  =?=  fun a b => g b a, no assignments
        let mut env = nat_env();
        let nat = Expr::const_("Nat", vec![]);
        env.add_axiom(
            "g",
            Expr::pi(
                Binder::new("x", nat.clone()),
                Expr::pi(Binder::new("y", nat.clone()), nat.clone()),
            ),
        );
        let mut mctx = MetavarContext::new();
        let mk = |x: &str, y: &str| {
            Expr::lam(
                Binder::new(x, nat.clone()),
                Expr::lam(
                    Binder::new(y, nat.clone()),
                    Expr::apps(Expr::const_("g", vec![]), &[Expr::bvar(0), Expr::bvar(1)]),
                ),
            )
        };
        let lhs = mk("x", "y");
        let rhs = mk("a", "b");
        let mut tc = TypeChecker::new(&env, &mut mctx);
        assert!(tc.is_def_eq(&lhs, &rhs).unwrap());

        // and a mismatch in argument order is rejected
        let swapped = Expr::lam(
            Binder::new("x", nat.clone()),
            Expr::lam(
                Binder::new("y", nat.clone()),
                Expr::apps(Expr::const_("g", vec![]), &[Expr::bvar(1), Expr::bvar(0)]),
            ),
        );
        assert!(!tc.is_def_eq(&lhs, &swapped).unwrap());
    }

    #[test]
    fn opaque_constants_stay_distinct_under_reducible_transparency() {
        let mut env = nat_env();
        let nat = Expr::const_("Nat", vec![]);
        let fn_ty = Expr::pi(Binder::new("x", nat.clone()), nat.clone());
        env.add_defn_with(
            "f",
            fn_ty.clone(),
            Expr::lam(Binder::new("x", nat.clone()), Expr::bvar(0)),
            Reducibility::Default,
            ReducibilityHints::Regular(1),
        );
        env.add_defn_with(
            "g",
            fn_ty,
            Expr::lam(Binder::new("x", nat.clone()), Expr::bvar(0)),
            Reducibility::Default,
            ReducibilityHints::Regular(1),
        );
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);
        tc.cfg.transparency = TransparencyMode::Reducible;

        let fa = Expr::app(Expr::const_("f", vec![]), Expr::nat(1));
        let ga = Expr::app(Expr::const_("g", vec![]), Expr::nat(1));
        assert!(!tc.is_def_eq(&fa, &ga).unwrap());

        // at default transparency both unfold to the identity
        tc.cfg.transparency = TransparencyMode::Default;
        assert!(tc.is_def_eq(&fa, &ga).unwrap());
    }

    #[test]
    fn offset_equalities() {
        let mut env = nat_env();
        let nat = Expr::const_("Nat", vec![]);
        env.add_axiom("n", nat.clone());
        env.add_defn("n2", nat.clone(), Expr::const_("n", vec![]));
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let succ = |e| Expr::app(Expr::const_("Nat.succ", vec![]), e);
        // succ (succ 3) =?= 5
        assert!(tc.is_def_eq(&succ(succ(Expr::nat(3))), &Expr::nat(5)).unwrap());
        // a successor is never the literal beneath it
        assert!(!tc.is_def_eq(&succ(Expr::nat(1)), &Expr::nat(1)).unwrap());
        // stripping the shared successor leaves n2 =?= n for delta
        let n = Expr::const_("n", vec![]);
        let n2 = Expr::const_("n2", vec![]);
        assert!(tc.is_def_eq(&succ(n2), &succ(n)).unwrap());
    }

    #[test]
    fn rigid_head_versus_literal_terminates() {
        let mut env = nat_env();
        env.add_axiom("c", Expr::const_("Nat", vec![]));
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        // No successor spine on either side: the offset stage stands aside
        // and the later stages answer false.
        let c = Expr::const_("c", vec![]);
        assert!(!tc.is_def_eq(&c, &Expr::nat(5)).unwrap());
        assert!(!tc.is_def_eq(&Expr::nat(5), &c).unwrap());
    }

    #[test]
    fn successor_spine_versus_rigid_term() {
        let mut env = nat_env();
        let nat = Expr::const_("Nat", vec![]);
        env.add_axiom("n", nat.clone());
        env.add_axiom("m", nat.clone());
        let succ = |e| Expr::app(Expr::const_("Nat.succ", vec![]), e);
        env.add_defn("sn", nat.clone(), succ(Expr::const_("n", vec![])));
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        // succ n against a rigid constant is not an offset problem; delta
        // decides it either way.
        let n = Expr::const_("n", vec![]);
        assert!(!tc.is_def_eq(&succ(n.clone()), &Expr::const_("m", vec![])).unwrap());
        assert!(tc.is_def_eq(&succ(n), &Expr::const_("sn", vec![])).unwrap());
    }

    #[test]
    fn failed_check_leaves_no_assignments() {
        init_logger();
        let mut env = nat_env();
        let nat = Expr::const_("Nat", vec![]);
        env.add_axiom(
            "h",
            Expr::pi(
                Binder::new("x", nat.clone()),
                Expr::pi(Binder::new("y", nat.clone()), nat.clone()),
            ),
        );
        env.add_axiom("c", nat.clone());
        env.add_axiom("d", nat.clone());
        env.add_axiom("e", nat.clone());
        let mut mctx = MetavarContext::new();
        let m = mctx.mk_mvar(LocalContext::new(), nat.clone(), MetavarKind::Natural);
        let mut tc = TypeChecker::new(&env, &mut mctx);

        // h ?m c =?= h d e: the first argument assigns ?m := d, then the
        // second argument fails, so the speculative assignment is rolled
        // back by the top-level checkpoint.
        let h = Expr::const_("h", vec![]);
        let lhs = Expr::apps(h.clone(), &[Expr::mvar(m), Expr::const_("c", vec![])]);
        let rhs = Expr::apps(h, &[Expr::const_("d", vec![]), Expr::const_("e", vec![])]);
        assert!(!tc.is_def_eq(&lhs, &rhs).unwrap());
        assert!(!mctx.is_assigned(m));
    }
}

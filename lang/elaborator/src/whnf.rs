//! Weak-head normalization.
//!
//! [TypeChecker::whnf_core] performs the cheap reductions that need no
//! environment lookups: beta, zeta, instantiation of assigned metavariables
//! at the head, metadata stripping, and projection of constructor
//! applications.  [TypeChecker::whnf] additionally unfolds definitions as
//! permitted by the active transparency mode.

use ast::{can_unfold, ConstantKind, Expr, ExprKind};

use crate::result::TcResult;
use crate::TypeChecker;

impl TypeChecker<'_> {
    /// Reduce to weak-head normal form without unfolding definitions.
    pub fn whnf_core(&mut self, e: &Expr) -> TcResult<Expr> {
        match e.kind() {
            ExprKind::MData(_, inner) => self.whnf_core(inner),
            ExprKind::MVar(m) => match self.mctx.get_assignment(*m) {
                Some(v) => {
                    let v = v.clone();
                    self.whnf_core(&v)
                }
                None => Ok(e.clone()),
            },
            ExprKind::FVar(id) => {
                match self.lctx.get(*id).and_then(|decl| decl.value()) {
                    Some(v) => {
                        let v = v.clone();
                        self.whnf_core(&v)
                    }
                    None => Ok(e.clone()),
                }
            }
            ExprKind::Let(_, value, body) => {
                let unfolded = body.instantiate1(value);
                self.whnf_core(&unfolded)
            }
            ExprKind::App(..) => {
                let (f, args) = e.get_app_fn_args();
                let f = f.clone();
                let fw = self.whnf_core(&f)?;
                if fw.is_lambda() {
                    let reduced = Expr::apps(fw, &args).head_beta();
                    self.whnf_core(&reduced)
                } else if fw == f {
                    Ok(e.clone())
                } else {
                    Ok(Expr::apps(fw, &args))
                }
            }
            ExprKind::Proj(_, idx, target) => {
                let idx = *idx;
                let target = target.clone();
                match self.reduce_proj(idx, &target)? {
                    Some(reduced) => self.whnf_core(&reduced),
                    None => Ok(e.clone()),
                }
            }
            _ => Ok(e.clone()),
        }
    }

    /// Reduce to weak-head normal form, unfolding definitions according to
    /// the active transparency mode.
    pub fn whnf(&mut self, e: &Expr) -> TcResult<Expr> {
        let mut cur = e.clone();
        loop {
            let w = self.whnf_core(&cur)?;
            match self.unfold_definition(&w) {
                Some(next) => cur = next,
                None => return Ok(w),
            }
        }
    }

    /// Replace a defined constant at the head by its value, if the active
    /// transparency mode permits.  Returns `None` when the head is not an
    /// unfoldable constant or the universe levels do not match its arity.
    pub(crate) fn unfold_definition(&self, e: &Expr) -> Option<Expr> {
        let (f, args) = e.get_app_fn_args();
        let ExprKind::Const(name, levels) = f.strip_mdata().kind() else {
            return None;
        };
        let info = self.env.get_constant(name)?;
        if !can_unfold(self.cfg.transparency, info) || levels.len() != info.level_params.len() {
            return None;
        }
        let value = info.instantiate_value_levels(levels)?;
        Some(Expr::apps(value, &args).head_beta())
    }

    /// Project a field out of a constructor application: `(c p₁ .. pₘ f₁ ..
    /// fₖ).i  ⇒  fᵢ₊₁`.  The target is normalized with the active
    /// transparency so projections see through definitions.
    fn reduce_proj(&mut self, idx: u32, target: &Expr) -> TcResult<Option<Expr>> {
        let t = self.whnf(target)?;
        let (f, args) = t.get_app_fn_args();
        let Some(name) = f.strip_mdata().const_name() else {
            return Ok(None);
        };
        let Some(info) = self.env.get_constant(name) else {
            return Ok(None);
        };
        let ConstantKind::Ctor { num_params, num_fields, .. } = &info.kind else {
            return Ok(None);
        };
        if args.len() != (*num_params + *num_fields) as usize || idx >= *num_fields {
            return Ok(None);
        }
        Ok(Some(args[(*num_params + idx) as usize].clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{
        Binder, Environment, LocalContext, MetavarContext, MetavarKind, Reducibility,
        ReducibilityHints, TransparencyMode,
    };

    fn checker<'e>(
        env: &'e Environment,
        mctx: &'e mut MetavarContext,
    ) -> TypeChecker<'e> {
        TypeChecker::new(env, mctx)
    }

    #[test]
    fn beta_and_zeta() {
        let env = Environment::new();
        let mut mctx = MetavarContext::new();
        let mut tc = checker(&env, &mut mctx);

        let id = Expr::lam(Binder::new("x", Expr::prop()), Expr::bvar(0));
        let e = Expr::app(id, Expr::nat(3));
        assert_eq!(tc.whnf_core(&e).unwrap(), Expr::nat(3));

        let l = Expr::let_(Binder::new("x", Expr::prop()), Expr::nat(5), Expr::bvar(0));
        assert_eq!(tc.whnf_core(&l).unwrap(), Expr::nat(5));
    }

    #[test]
    fn let_bound_fvar_unfolds() {
        let env = Environment::new();
        let mut mctx = MetavarContext::new();
        let mut tc = checker(&env, &mut mctx);

        let x = tc.push_local_let("x", Expr::const_("Nat", vec![]), Expr::nat(4));
        assert_eq!(tc.whnf_core(&x).unwrap(), Expr::nat(4));

        let y = tc.push_local("y", Expr::const_("Nat", vec![]), ast::BinderInfo::Default);
        assert_eq!(tc.whnf_core(&y).unwrap(), y);
    }

    #[test]
    fn assigned_mvar_at_head_is_instantiated() {
        let env = Environment::new();
        let mut mctx = MetavarContext::new();
        let m = mctx.mk_mvar(LocalContext::new(), Expr::prop(), MetavarKind::Natural);
        mctx.assign(m, Expr::lam(Binder::new("x", Expr::prop()), Expr::bvar(0)));
        let mut tc = checker(&env, &mut mctx);

        let e = Expr::app(Expr::mvar(m), Expr::nat(2));
        assert_eq!(tc.whnf_core(&e).unwrap(), Expr::nat(2));
    }

    #[test]
    fn delta_respects_transparency() {
        let mut env = Environment::new();
        env.add_defn_with(
            "two",
            Expr::const_("Nat", vec![]),
            Expr::nat(2),
            Reducibility::Default,
            ReducibilityHints::Regular(1),
        );
        let mut mctx = MetavarContext::new();
        let mut tc = checker(&env, &mut mctx);

        let e = Expr::const_("two", vec![]);
        assert_eq!(tc.whnf(&e).unwrap(), Expr::nat(2));

        tc.cfg.transparency = TransparencyMode::Reducible;
        assert_eq!(tc.whnf(&e).unwrap(), e);
    }

    #[test]
    fn projection_of_ctor_application() {
        let mut env = Environment::new();
        env.add_ctor("Prod.mk", Expr::prop(), "Prod", 2, 2);
        let mut mctx = MetavarContext::new();
        let mut tc = checker(&env, &mut mctx);

        // (Prod.mk A B a b).1  ⇒  b
        let mk = Expr::apps(
            Expr::const_("Prod.mk", vec![]),
            &[
                Expr::const_("A", vec![]),
                Expr::const_("B", vec![]),
                Expr::nat(1),
                Expr::nat(2),
            ],
        );
        let e = Expr::proj("Prod", 1, mk);
        assert_eq!(tc.whnf_core(&e).unwrap(), Expr::nat(2));
    }

    #[test]
    fn whnf_is_idempotent() {
        let mut env = Environment::new();
        env.add_axiom("Nat", Expr::sort(ast::Level::of_nat(1)));
        env.add_defn("two", Expr::const_("Nat", vec![]), Expr::nat(2));
        let mut mctx = MetavarContext::new();
        let mut tc = checker(&env, &mut mctx);

        let terms = [
            Expr::const_("two", vec![]),
            Expr::app(
                Expr::lam(Binder::new("x", Expr::const_("Nat", vec![])), Expr::bvar(0)),
                Expr::const_("two", vec![]),
            ),
            Expr::lam(Binder::new("x", Expr::prop()), Expr::bvar(0)),
        ];
        for e in &terms {
            let w = tc.whnf(e).unwrap();
            assert_eq!(tc.whnf(&w).unwrap(), w);
        }
    }

    #[test]
    fn whnf_unfolds_through_applications() {
        let mut env = Environment::new();
        // idFn := λ x. x
        env.add_defn(
            "idFn",
            Expr::prop(),
            Expr::lam(Binder::new("x", Expr::prop()), Expr::bvar(0)),
        );
        let mut mctx = MetavarContext::new();
        let mut tc = checker(&env, &mut mctx);

        let e = Expr::app(Expr::const_("idFn", vec![]), Expr::nat(9));
        assert_eq!(tc.whnf(&e).unwrap(), Expr::nat(9));
    }
}

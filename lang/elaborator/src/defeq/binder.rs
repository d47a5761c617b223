//! Binder equality, eta, and proof irrelevance.

use ast::{Binder, Expr, ExprKind};

use super::{Dec, Decided, Undetermined};
use crate::result::TcResult;
use crate::TypeChecker;

impl TypeChecker<'_> {
    /// Compare two lambda (or two pi) telescopes by walking them with a
    /// single shared sequence of fresh free variables, so both bodies are
    /// opened over the same names.  Domain types are compared at each
    /// position; class-typed domains register a local instance for the rest
    /// of the walk.
    pub(crate) fn is_def_eq_binding(&mut self, t: &Expr, s: &Expr) -> TcResult<bool> {
        let lctx_len = self.lctx.len();
        let insts_len = self.local_instances.len();
        let result = self.is_def_eq_binding_core(t.clone(), s.clone());
        self.lctx.truncate(lctx_len);
        self.local_instances.truncate(insts_len);
        result
    }

    fn is_def_eq_binding_core(&mut self, t: Expr, s: Expr) -> TcResult<bool> {
        let mut fvars: Vec<Expr> = Vec::new();
        let (mut t, mut s) = (t, s);
        loop {
            let next = match (t.kind(), s.kind()) {
                (ExprKind::Lam(b1, body1), ExprKind::Lam(b2, body2))
                | (ExprKind::Pi(b1, body1), ExprKind::Pi(b2, body2)) => {
                    Some((b1.clone(), body1.clone(), b2.clone(), body2.clone()))
                }
                _ => None,
            };
            let Some((b1, body1, b2, body2)) = next else { break };

            let d1 = b1.ty.instantiate_rev(&fvars);
            let d2 = b2.ty.instantiate_rev(&fvars);
            if !self.is_def_eq(&d1, &d2)? {
                return Ok(false);
            }
            // push_local registers the variable as a local instance when the
            // domain is a class type.
            let x = self.push_local(b1.name.clone(), d1, b1.info);
            fvars.push(x);
            t = body1;
            s = body2;
        }
        let t = t.instantiate_rev(&fvars);
        let s = s.instantiate_rev(&fvars);
        self.is_def_eq(&t, &s)
    }

    /// Eta: `t =?= s` where exactly one side is a lambda; expand the other
    /// side to `λ x. s x` using its inferred pi type and compare.
    pub(crate) fn is_def_eq_eta(&mut self, t: &Expr, s: &Expr) -> TcResult<Dec> {
        if t.is_lambda() && !s.is_lambda() {
            return self.is_def_eq_eta_expand(t, s);
        }
        if s.is_lambda() && !t.is_lambda() {
            return self.is_def_eq_eta_expand(s, t);
        }
        Ok(Undetermined)
    }

    fn is_def_eq_eta_expand(&mut self, lam: &Expr, other: &Expr) -> TcResult<Dec> {
        let ty = match self.infer_type(other) {
            Ok(ty) => ty,
            Err(err) if err.is_recoverable() => return Ok(Undetermined),
            Err(err) => return Err(err),
        };
        let w = self.whnf(&ty)?;
        let ExprKind::Pi(binder, _) = w.kind() else {
            return Ok(Undetermined);
        };
        let expanded = Expr::lam(
            Binder::with_info(binder.name.clone(), binder.ty.clone(), binder.info),
            Expr::app(other.lift_loose_bvars(0, 1), Expr::bvar(0)),
        );
        Ok(Decided(self.is_def_eq_binding(lam, &expanded)?))
    }

    /// Proof irrelevance: two proofs of definitionally equal propositions
    /// are equal without looking at the proof terms.
    pub(crate) fn is_def_eq_proof_irrel(&mut self, t: &Expr, s: &Expr) -> TcResult<bool> {
        let t_ty = match self.infer_type(t) {
            Ok(ty) => ty,
            Err(err) if err.is_recoverable() => return Ok(false),
            Err(err) => return Err(err),
        };
        let t_sort = match self.infer_type(&t_ty) {
            Ok(sort) => sort,
            Err(err) if err.is_recoverable() => return Ok(false),
            Err(err) => return Err(err),
        };
        let t_sort = self.whnf(&t_sort)?;
        match t_sort.kind() {
            ExprKind::Sort(l) if l.is_zero() => {}
            _ => return Ok(false),
        }
        let s_ty = match self.infer_type(s) {
            Ok(ty) => ty,
            Err(err) if err.is_recoverable() => return Ok(false),
            Err(err) => return Err(err),
        };
        self.is_def_eq(&t_ty, &s_ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ast::{Environment, Level, MetavarContext};

    fn ty0() -> Expr {
        Expr::sort(Level::of_nat(1))
    }

    fn nat() -> Expr {
        Expr::const_("Nat", vec![])
    }

    fn base_env() -> Environment {
        let mut env = Environment::new();
        env.add_axiom("Nat", ty0());
        env.add_axiom("f", Expr::pi(Binder::new("x", nat()), nat()));
        env
    }

    #[test]
    fn eta_expansion_matches_lambda() {
        let env = base_env();
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        // f =?= λ x. f x
        let f = Expr::const_("f", vec![]);
        let expanded =
            Expr::lam(Binder::new("x", nat()), Expr::app(f.clone(), Expr::bvar(0)));
        assert!(tc.is_def_eq(&expanded, &f).unwrap());
        assert!(tc.is_def_eq(&f, &expanded).unwrap());
    }

    #[test]
    fn dependent_pi_domains_must_match() {
        let env = base_env();
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let p1 = Expr::pi(Binder::new("x", nat()), nat());
        let p2 = Expr::pi(Binder::new("x", ty0()), nat());
        assert!(!tc.is_def_eq(&p1, &p2).unwrap());
        assert!(tc.is_def_eq(&p1, &p1).unwrap());
    }

    #[test]
    fn proof_irrelevance_equates_proofs() {
        let mut env = base_env();
        env.add_axiom("P", Expr::prop());
        env.add_axiom("h1", Expr::const_("P", vec![]));
        env.add_axiom("h2", Expr::const_("P", vec![]));
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let h1 = Expr::const_("h1", vec![]);
        let h2 = Expr::const_("h2", vec![]);
        assert!(tc.is_def_eq(&h1, &h2).unwrap());
    }

    #[test]
    fn non_proofs_do_not_get_the_shortcut() {
        let mut env = base_env();
        env.add_axiom("n1", nat());
        env.add_axiom("n2", nat());
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let n1 = Expr::const_("n1", vec![]);
        let n2 = Expr::const_("n2", vec![]);
        assert!(!tc.is_def_eq(&n1, &n2).unwrap());
    }

    #[test]
    fn class_domains_register_local_instances() {
        let mut env = base_env();
        env.add_axiom("Monoid", Expr::pi(Binder::new("a", ty0()), ty0()));
        env.register_class("Monoid");
        let mut mctx = MetavarContext::new();
        let mut tc = TypeChecker::new(&env, &mut mctx);

        let dom = Expr::app(Expr::const_("Monoid", vec![]), nat());
        let lam1 = Expr::lam(Binder::new("i", dom.clone()), Expr::nat(0));
        let lam2 = Expr::lam(Binder::new("j", dom), Expr::nat(0));
        assert!(tc.is_def_eq(&lam1, &lam2).unwrap());
        // the walk is scoped: the registered instance is gone afterwards
        assert!(tc.local_instances.is_empty());
        assert!(tc.lctx.is_empty());
    }
}

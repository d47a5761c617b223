//! Type inference.
//!
//! The equality engine needs types in a few places: to abstract a
//! metavariable solution over its arguments, to compare binders, and to
//! detect proofs for proof irrelevance.  This is a plain synthesis pass; it
//! assumes the expressions are well-typed and does not re-check them.

use ast::{Binder, ConstantKind, Expr, ExprKind, FVarId, Level, Literal, Name};

use crate::result::{TcResult, TypeError};
use crate::TypeChecker;

impl TypeChecker<'_> {
    pub fn infer_type(&mut self, e: &Expr) -> TcResult<Expr> {
        match e.kind() {
            ExprKind::BVar(i) => Err(Box::new(TypeError::LooseBVar { index: *i })),
            ExprKind::FVar(id) => match self.lctx.get(*id) {
                Some(decl) => Ok(decl.ty().clone()),
                None => Err(Box::new(TypeError::UnknownFreeVariable { id: *id })),
            },
            ExprKind::MVar(m) => match self.mctx.get_decl(*m) {
                Some(decl) => Ok(decl.ty.clone()),
                None => Err(Box::new(TypeError::UnknownMetavariable { id: *m })),
            },
            ExprKind::Sort(l) => Ok(Expr::sort(l.clone().succ())),
            ExprKind::Const(name, levels) => {
                let Some(info) = self.env.get_constant(name) else {
                    return Err(Box::new(TypeError::UnknownConstant { name: name.clone() }));
                };
                if levels.len() != info.level_params.len() {
                    return Err(Box::new(TypeError::LevelArityMismatch {
                        name: name.clone(),
                        expected: info.level_params.len(),
                        actual: levels.len(),
                    }));
                }
                Ok(info.instantiate_type_levels(levels))
            }
            ExprKind::App(..) => {
                let (f, args) = e.get_app_fn_args();
                let f = f.clone();
                let mut ty = self.infer_type(&f)?;
                for arg in &args {
                    ty = self.ensure_pi(&ty)?.1.instantiate1(arg);
                }
                Ok(ty)
            }
            ExprKind::Lam(b, body) => {
                let b = b.clone();
                let body = body.clone();
                let lctx_len = self.lctx.len();
                let insts_len = self.local_instances.len();
                let x = self.push_local(b.name.clone(), b.ty.clone(), b.info);
                let result = self
                    .infer_type(&body.instantiate1(&x))
                    .map(|body_ty| self.lctx.mk_pi_fvars(std::slice::from_ref(&x), &body_ty));
                self.lctx.truncate(lctx_len);
                self.local_instances.truncate(insts_len);
                match result? {
                    Some(pi) => Ok(pi),
                    // The fvar was just declared, so abstraction cannot fail.
                    None => Err(Box::new(TypeError::UnknownFreeVariable {
                        id: x.fvar_id().unwrap_or(FVarId(0)),
                    })),
                }
            }
            ExprKind::Pi(b, body) => {
                let b = b.clone();
                let body = body.clone();
                let domain_ty = self.infer_type(&b.ty)?;
                let u1 = self.ensure_sort(&domain_ty)?;
                let lctx_len = self.lctx.len();
                let insts_len = self.local_instances.len();
                let x = self.push_local(b.name.clone(), b.ty.clone(), b.info);
                let result = self
                    .infer_type(&body.instantiate1(&x))
                    .and_then(|body_ty| self.ensure_sort(&body_ty));
                self.lctx.truncate(lctx_len);
                self.local_instances.truncate(insts_len);
                Ok(Expr::sort(Level::imax(u1, result?)))
            }
            ExprKind::Let(_, value, body) => {
                let unfolded = body.instantiate1(value);
                self.infer_type(&unfolded)
            }
            ExprKind::Lit(Literal::Nat(_)) => Ok(Expr::const_("Nat", vec![])),
            ExprKind::Lit(Literal::Str(_)) => Ok(Expr::const_("String", vec![])),
            ExprKind::Proj(struct_name, idx, target) => {
                let (struct_name, idx, target) = (struct_name.clone(), *idx, target.clone());
                self.infer_proj(&struct_name, idx, &target)
            }
            ExprKind::MData(_, inner) => {
                let inner = inner.clone();
                self.infer_type(&inner)
            }
        }
    }

    /// Whether `e` is a proof, i.e. its type is a proposition.
    pub fn is_prop(&mut self, e: &Expr) -> TcResult<bool> {
        let ty = self.infer_type(e)?;
        let ty_of_ty = self.infer_type(&ty)?;
        let sort = self.whnf(&ty_of_ty)?;
        match sort.kind() {
            ExprKind::Sort(l) => Ok(l.is_zero()),
            _ => Ok(false),
        }
    }

    /// Normalize `ty` and require a function type, returning binder and body.
    pub(crate) fn ensure_pi(&mut self, ty: &Expr) -> TcResult<(Binder, Expr)> {
        let w = self.whnf(ty)?;
        match w.kind() {
            ExprKind::Pi(b, body) => Ok((b.clone(), body.clone())),
            _ => {
                use ast::print::PrintToString;
                Err(Box::new(TypeError::FunctionExpected { ty: w.print_to_string() }))
            }
        }
    }

    /// Normalize `ty` and require a sort, returning its level.
    pub(crate) fn ensure_sort(&mut self, ty: &Expr) -> TcResult<Level> {
        let w = self.whnf(ty)?;
        match w.kind() {
            ExprKind::Sort(l) => Ok(l.clone()),
            _ => {
                use ast::print::PrintToString;
                Err(Box::new(TypeError::TypeExpected { ty: w.print_to_string() }))
            }
        }
    }

    /// The type of `target.idx` where `target` is a value of a structure: the
    /// field's declared type with parameters and earlier fields substituted.
    fn infer_proj(&mut self, struct_name: &Name, idx: u32, target: &Expr) -> TcResult<Expr> {
        use ast::print::PrintToString;
        let invalid = |target: &Expr| {
            Box::new(TypeError::InvalidProjection { idx, target: target.print_to_string() })
        };

        let target_ty = self.infer_type(target)?;
        let target_ty = self.whnf(&target_ty)?;
        let (head, ty_args) = target_ty.get_app_fn_args();
        let ExprKind::Const(induct_name, levels) = head.strip_mdata().kind() else {
            return Err(invalid(target));
        };
        let Some(induct) = self.env.get_constant(induct_name) else {
            return Err(invalid(target));
        };
        let ConstantKind::Induct { num_params, ctors } = &induct.kind else {
            return Err(invalid(target));
        };
        let [ctor_name] = ctors.as_slice() else {
            return Err(invalid(target));
        };
        let Some(ctor) = self.env.get_constant(ctor_name) else {
            return Err(invalid(target));
        };
        if ty_args.len() < *num_params as usize {
            return Err(invalid(target));
        }

        let mut field_ty = ctor.instantiate_type_levels(levels);
        for param in &ty_args[..*num_params as usize] {
            field_ty = self.ensure_pi(&field_ty)?.1.instantiate1(param);
        }
        // Earlier fields may appear in the type of field `idx`; substitute
        // projections of the same target for them.
        for j in 0..idx {
            let proj = Expr::proj(struct_name.clone(), j, target.clone());
            field_ty = self.ensure_pi(&field_ty)?.1.instantiate1(&proj);
        }
        Ok(self.ensure_pi(&field_ty)?.0.ty)
    }
}

//! Metavariable assignment: pattern classification, the occurs/scope
//! checker, and the final commitment of a solution.
//!
//! Solving `?m a₁..aₙ := v` goes through three gates.  The arguments must
//! form a pattern (distinct free variables outside `?m`'s own context, or a
//! quasi-pattern when that approximation is enabled); the solution must pass
//! the occurs and scope checks of [TypeChecker::check_assignment]; and the
//! abstracted solution's inferred type must be definitionally equal to the
//! metavariable's declared type.  Any failed gate falls back to the
//! first-order approximation or answers `false`.

use log::trace;

use ast::print::PrintToString;
use ast::{
    Binder, Expr, ExprKind, HashMap, LocalContext, LocalDecl, MVarId,
};

use crate::result::{CheckAssignmentError, TcResult, TypeError};
use crate::TypeChecker;

impl TypeChecker<'_> {
    /// Try to solve `?m a₁..aₙ := v` where `mvar_app` is `?m a₁..aₙ`.
    /// `true` commits an assignment; `false` leaves the metavariable
    /// context untouched.
    pub(crate) fn process_assignment(&mut self, mvar_app: &Expr, v: &Expr) -> TcResult<bool> {
        self.commit_when(|tc| tc.process_assignment_core(mvar_app, v))
    }

    fn process_assignment_core(&mut self, mvar_app: &Expr, v: &Expr) -> TcResult<bool> {
        let (f, args) = mvar_app.get_app_fn_args();
        let Some(m) = f.mvar_id() else {
            return Ok(false);
        };
        trace!("{} := {}", mvar_app.print_to_string(), v.print_to_string());

        let Some(decl) = self.mctx.get_decl(m) else {
            return Err(Box::new(TypeError::UnknownMetavariable { id: m }));
        };
        let decl_lctx = decl.lctx.clone();
        let decl_ty = decl.ty.clone();

        let pattern = args
            .iter()
            .enumerate()
            .all(|(i, a)| a.is_fvar() && !args[..i].contains(a));
        // A quasi-pattern has an argument from the metavariable's own
        // context; abstraction over it loses the dependency.
        let quasi = pattern
            && args
                .iter()
                .any(|a| a.fvar_id().is_some_and(|id| decl_lctx.contains(id)));

        if !pattern || (quasi && !self.cfg.quasi_pattern_approx) {
            return self.fo_fallback(mvar_app, v);
        }

        let Some(checked) = self.check_assignment(m, &args, v)? else {
            return self.fo_fallback(mvar_app, v);
        };
        let Some(sol) = self.lctx.mk_lambda_fvars(&args, &checked) else {
            return self.fo_fallback(mvar_app, v);
        };

        // Abstraction over a quasi-pattern can produce an ill-typed term;
        // inferring the solution's type rejects those, and the final
        // equality check guards the declared type in all cases.
        let sol_ty = match self.infer_type(&sol) {
            Ok(ty) => ty,
            Err(err) if err.is_recoverable() => {
                trace!("solution for {m} is ill-typed: {err}");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };
        if !self.is_def_eq(&sol_ty, &decl_ty)? {
            trace!("solution type mismatch for {m}");
            return Ok(false);
        }
        // The type comparison above may itself have assigned ?m.
        if !self.mctx.is_assignable(m) {
            return Ok(false);
        }
        self.mctx.assign(m, sol);
        Ok(true)
    }

    fn fo_fallback(&mut self, mvar_app: &Expr, v: &Expr) -> TcResult<bool> {
        if self.cfg.fo_approx && mvar_app.is_app() {
            self.is_def_eq_fo(mvar_app, v)
        } else {
            Ok(false)
        }
    }

    /// Validate that `?mvar a₁..aₙ := v` is well-scoped and non-circular.
    ///
    /// Returns the solution with out-of-scope let-variables unfolded and
    /// nested metavariables substituted or context-restricted, `None` when
    /// the assignment is rejected.  Only an undeclared metavariable is an
    /// error.
    pub fn check_assignment(
        &mut self,
        mvar: MVarId,
        fvars: &[Expr],
        v: &Expr,
    ) -> TcResult<Option<Expr>> {
        let Some(decl) = self.mctx.get_decl(mvar) else {
            return Err(Box::new(TypeError::UnknownMetavariable { id: mvar }));
        };
        let mvar_lctx = decl.lctx.clone();

        if self.check_assignment_fast(&mvar_lctx, mvar, fvars, v) {
            return Ok(Some(v.clone()));
        }

        let saved = self.mctx.snapshot();
        let result = AssignmentChecker {
            tc: &mut *self,
            mvar,
            mvar_lctx,
            fvars,
            cache: HashMap::default(),
        }
        .check(v);
        match result {
            Ok(checked) => Ok(Some(checked)),
            Err(CheckAssignmentError::UnknownMVar(id)) => {
                self.mctx.restore(saved);
                Err(Box::new(TypeError::UnknownMetavariable { id }))
            }
            Err(err) => {
                self.mctx.restore(saved);
                trace!("assignment to {mvar} rejected: {err}");
                Ok(None)
            }
        }
    }

    /// Pure structural pre-pass: `true` means the assignment is legal as-is.
    /// `false` means "consult the slow path", not "illegal".
    fn check_assignment_fast(
        &self,
        mvar_lctx: &LocalContext,
        mvar: MVarId,
        fvars: &[Expr],
        v: &Expr,
    ) -> bool {
        if !v.has_fvar() && !v.has_mvar() {
            return true;
        }
        match v.kind() {
            ExprKind::FVar(id) => mvar_lctx.contains(*id) || fvars.contains(v),
            ExprKind::MVar(id) => {
                if *id == mvar || self.mctx.is_assigned(*id) {
                    return false;
                }
                match self.mctx.get_decl(*id) {
                    Some(decl) => decl.lctx.is_sub_prefix_of(mvar_lctx),
                    None => false,
                }
            }
            ExprKind::App(f, a) => {
                self.check_assignment_fast(mvar_lctx, mvar, fvars, f)
                    && self.check_assignment_fast(mvar_lctx, mvar, fvars, a)
            }
            ExprKind::Lam(b, body) | ExprKind::Pi(b, body) => {
                self.check_assignment_fast(mvar_lctx, mvar, fvars, &b.ty)
                    && self.check_assignment_fast(mvar_lctx, mvar, fvars, body)
            }
            ExprKind::Let(b, value, body) => {
                self.check_assignment_fast(mvar_lctx, mvar, fvars, &b.ty)
                    && self.check_assignment_fast(mvar_lctx, mvar, fvars, value)
                    && self.check_assignment_fast(mvar_lctx, mvar, fvars, body)
            }
            ExprKind::Proj(_, _, inner) | ExprKind::MData(_, inner) => {
                self.check_assignment_fast(mvar_lctx, mvar, fvars, inner)
            }
            _ => true,
        }
    }
}

type CheckResult = Result<Expr, CheckAssignmentError>;

/// The slow assignment pass.  Rewrites the candidate solution while
/// checking it: let-bound variables outside the target scope are unfolded,
/// assigned metavariables substituted, and metavariables with bigger
/// contexts restricted through fresh auxiliary metavariables.
///
/// The cache is keyed by physical node identity and lives for one
/// `check_assignment` call.
struct AssignmentChecker<'a, 'e> {
    tc: &'a mut TypeChecker<'e>,
    mvar: MVarId,
    mvar_lctx: LocalContext,
    fvars: &'a [Expr],
    cache: HashMap<usize, Expr>,
}

impl AssignmentChecker<'_, '_> {
    fn check(&mut self, e: &Expr) -> CheckResult {
        if !e.has_fvar() && !e.has_mvar() {
            return Ok(e.clone());
        }
        if let Some(cached) = self.cache.get(&e.data_ptr()) {
            return Ok(cached.clone());
        }
        let checked = self.check_core(e)?;
        self.cache.insert(e.data_ptr(), checked.clone());
        Ok(checked)
    }

    fn check_core(&mut self, e: &Expr) -> CheckResult {
        match e.kind() {
            ExprKind::FVar(id) => {
                if self.mvar_lctx.contains(*id) || self.fvars.contains(e) {
                    return Ok(e.clone());
                }
                // A let-bound variable that is out of scope may still have a
                // perfectly scoped value; unfold it and retry.
                let value = self.tc.lctx.get(*id).and_then(|decl| decl.value().cloned());
                match value {
                    Some(value) => self.check(&value),
                    None => Err(CheckAssignmentError::OutOfScopeFVar(*id)),
                }
            }
            ExprKind::MVar(id) => {
                let id = *id;
                self.check_nested_mvar(id, e)
            }
            ExprKind::App(f, a) => {
                let (f, a) = (f.clone(), a.clone());
                let f = self.check(&f)?;
                let a = self.check(&a)?;
                Ok(Expr::app(f, a).head_beta())
            }
            ExprKind::Lam(b, body) => {
                let (b, body) = (b.clone(), body.clone());
                let ty = self.check(&b.ty)?;
                let body = self.check(&body)?;
                Ok(Expr::lam(Binder::with_info(b.name, ty, b.info), body))
            }
            ExprKind::Pi(b, body) => {
                let (b, body) = (b.clone(), body.clone());
                let ty = self.check(&b.ty)?;
                let body = self.check(&body)?;
                Ok(Expr::pi(Binder::with_info(b.name, ty, b.info), body))
            }
            ExprKind::Let(b, value, body) => {
                let (b, value, body) = (b.clone(), value.clone(), body.clone());
                let ty = self.check(&b.ty)?;
                let value = self.check(&value)?;
                let body = self.check(&body)?;
                Ok(Expr::let_(Binder::with_info(b.name, ty, b.info), value, body))
            }
            ExprKind::Proj(s, i, inner) => {
                let (s, i, inner) = (s.clone(), *i, inner.clone());
                Ok(Expr::proj(s, i, self.check(&inner)?))
            }
            ExprKind::MData(m, inner) => {
                let (m, inner) = (m.clone(), inner.clone());
                Ok(Expr::mdata(m, self.check(&inner)?))
            }
            _ => Ok(e.clone()),
        }
    }

    fn check_nested_mvar(&mut self, id: MVarId, e: &Expr) -> CheckResult {
        if id == self.mvar {
            return Err(CheckAssignmentError::OccursCheck);
        }
        if let Some(assignment) = self.tc.mctx.get_assignment(id) {
            let assignment = assignment.clone();
            return self.check(&assignment);
        }
        let Some(decl) = self.tc.mctx.get_decl(id) else {
            return Err(CheckAssignmentError::UnknownMVar(id));
        };
        if decl.lctx.is_sub_prefix_of(&self.mvar_lctx) {
            return Ok(e.clone());
        }
        if !self.tc.cfg.ctx_approx {
            return Err(CheckAssignmentError::UseFirstOrderApprox);
        }
        if decl.kind.is_read_only() {
            return Err(CheckAssignmentError::ReadOnlyMVarWithBiggerContext(id));
        }
        let nested_lctx = decl.lctx.clone();
        let nested_ty = decl.ty.clone();
        let nested_kind = decl.kind;

        // Restrict the nested metavariable's context to what the target may
        // see, keeping declaration order.
        let mut restricted = LocalContext::new();
        for (fid, d) in nested_lctx.decls() {
            let visible = self.mvar_lctx.contains(fid)
                || self.fvars.iter().any(|x| x.fvar_id() == Some(fid));
            if !visible {
                continue;
            }
            // A declaration kept for a pattern argument may still depend on
            // a dropped variable through its type or let-value; the
            // restricted context must be closed under its own declarations.
            let escapes = d.ty().find(&mut |sub| match sub.kind() {
                ExprKind::FVar(f) => !restricted.contains(*f),
                _ => false,
            }) || d.value().is_some_and(|v| {
                v.find(&mut |sub| match sub.kind() {
                    ExprKind::FVar(f) => !restricted.contains(*f),
                    _ => false,
                })
            });
            if escapes {
                return Err(CheckAssignmentError::IllFormedTypeInSmallerContext(id));
            }
            match d {
                LocalDecl::CDecl { name, ty, info } => {
                    restricted.push_cdecl(fid, name.clone(), ty.clone(), *info)
                }
                LocalDecl::LDecl { name, ty, value } => {
                    restricted.push_ldecl(fid, name.clone(), ty.clone(), value.clone())
                }
            }
        }

        let ty_escapes = nested_ty.find(&mut |sub| match sub.kind() {
            ExprKind::FVar(fid) => !restricted.contains(*fid),
            _ => false,
        });
        if ty_escapes {
            return Err(CheckAssignmentError::IllFormedTypeInSmallerContext(id));
        }

        let aux = self.tc.mctx.mk_mvar(restricted, nested_ty, nested_kind);
        self.tc.mctx.assign(id, Expr::mvar(aux));
        Ok(Expr::mvar(aux))
    }
}

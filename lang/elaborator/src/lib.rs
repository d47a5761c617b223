//! Definitional equality checking with metavariable assignment.
//!
//! The entry point is [TypeChecker::is_def_eq]: given two expressions it
//! decides whether they are equal up to computation, solving unification
//! metavariables along the way.  The checker layers a fast syntactic
//! dispatcher, higher-order pattern unification, first-order approximation
//! and controlled delta-unfolding on top of weak-head normalization; the
//! individual strategies live in the [defeq] submodules.
//!
//! All mutable state during a check lives in the [ast::MetavarContext] and
//! the checker's own local context.  Speculative strategies snapshot the
//! metavariable context and restore it when they fail, so a `false` answer
//! never leaks partial assignments.

pub mod defeq;
pub mod infer;
pub mod result;
pub mod whnf;

use ast::{
    BinderInfo, Environment, Expr, FVarId, LocalContext, MetavarContext, Name, TransparencyMode,
};

use crate::result::TcResult;

/// Options controlling how aggressively the equality checker approximates.
#[derive(Debug, Clone)]
pub struct Config {
    /// Which definitions may be unfolded.
    pub transparency: TransparencyMode,
    /// Solve `?m a₁ .. aₙ =?= f b₁ .. bₙ` argument-wise when the pattern
    /// fragment does not apply.
    pub fo_approx: bool,
    /// Restrict a metavariable's context through an auxiliary metavariable
    /// when the solution lives in an unrelated context.
    pub ctx_approx: bool,
    /// Treat quasi-patterns (distinct free variables that are not all in
    /// scope of the metavariable) as patterns.
    pub quasi_pattern_approx: bool,
    /// Raise [result::TypeError::Stuck] instead of answering `false` when
    /// the problem is blocked on an unassignable metavariable.
    pub defeq_stuck_ex: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            transparency: TransparencyMode::Default,
            fo_approx: true,
            ctx_approx: true,
            quasi_pattern_approx: false,
            defeq_stuck_ex: false,
        }
    }
}

/// A free variable registered as a typeclass instance, tracked so that
/// instance-implicit arguments can be compared leniently.
#[derive(Debug, Clone)]
pub struct LocalInstance {
    pub fvar: FVarId,
    pub class_name: Name,
}

/// The equality-checking session: the immutable environment, the mutable
/// metavariable store, and the local context of the expressions under
/// comparison.
pub struct TypeChecker<'e> {
    pub env: &'e Environment,
    pub mctx: &'e mut MetavarContext,
    pub lctx: LocalContext,
    pub local_instances: Vec<LocalInstance>,
    pub cfg: Config,
}

impl<'e> TypeChecker<'e> {
    pub fn new(env: &'e Environment, mctx: &'e mut MetavarContext) -> TypeChecker<'e> {
        TypeChecker::with_config(env, mctx, Config::default())
    }

    pub fn with_config(
        env: &'e Environment,
        mctx: &'e mut MetavarContext,
        cfg: Config,
    ) -> TypeChecker<'e> {
        TypeChecker { env, mctx, lctx: LocalContext::new(), local_instances: Vec::new(), cfg }
    }

    /// Declare a fresh free variable in the local context and return it.
    /// Registers the variable as a local instance when its type's head is a
    /// declared class.
    pub(crate) fn push_local(&mut self, name: impl Into<Name>, ty: Expr, info: BinderInfo) -> Expr {
        let id = self.mctx.fresh_fvar_id();
        self.lctx.push_cdecl(id, name, ty.clone(), info);
        if let Some(class_name) = ty.get_app_fn().const_name() {
            if self.env.is_class(class_name) {
                self.local_instances
                    .push(LocalInstance { fvar: id, class_name: class_name.clone() });
            }
        }
        Expr::fvar(id)
    }

    /// Declare a fresh let-bound free variable in the local context.
    pub(crate) fn push_local_let(&mut self, name: impl Into<Name>, ty: Expr, value: Expr) -> Expr {
        let id = self.mctx.fresh_fvar_id();
        self.lctx.push_ldecl(id, name, ty, value);
        Expr::fvar(id)
    }

    /// Run `f` under a different transparency mode, restoring the previous
    /// mode afterwards.
    pub(crate) fn with_transparency<T>(
        &mut self,
        mode: TransparencyMode,
        f: impl FnOnce(&mut Self) -> T,
    ) -> T {
        let saved = self.cfg.transparency;
        self.cfg.transparency = mode;
        let result = f(self);
        self.cfg.transparency = saved;
        result
    }

    /// Run a speculative sub-check: metavariable assignments made by `f` are
    /// kept only if it answers `true`.
    pub(crate) fn commit_when(
        &mut self,
        f: impl FnOnce(&mut Self) -> TcResult<bool>,
    ) -> TcResult<bool> {
        let saved = self.mctx.snapshot();
        match f(self) {
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
}

//! Error types for the equality engine.

use miette::Diagnostic;
use thiserror::Error;

use ast::{FVarId, MVarId, Name};

/// The result type specialized to type errors.
pub type TcResult<T = ()> = Result<T, Box<TypeError>>;

/// Errors emitted by type inference, reduction and definitional-equality
/// checking.
///
/// A `false` answer of the equality checker is *not* an error: the checker
/// returns `Ok(false)` and the caller decides how to report it.  Errors are
/// raised for ill-formed inputs (a constant missing from the environment, a
/// loose bound variable reaching inference) and, with the stuck-detection
/// option enabled, for problems the checker cannot decide yet.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("Unknown constant {name}")]
    #[diagnostic(code("T-001"))]
    UnknownConstant { name: Name },

    #[error("Unknown free variable {id}")]
    #[diagnostic(code("T-002"))]
    UnknownFreeVariable { id: FVarId },

    /// A metavariable occurred that is not declared in the metavariable
    /// context.  This indicates internal state corruption and is never
    /// recovered from.
    #[error("Unknown metavariable {id}")]
    #[diagnostic(code("T-003"))]
    UnknownMetavariable { id: MVarId },

    /// A loose bound variable reached type inference; inference only
    /// operates on closed expressions (binders are opened with free
    /// variables first).
    #[error("Unexpected loose bound variable #{index}")]
    #[diagnostic(code("T-004"))]
    LooseBVar { index: u32 },

    #[error("Function expected, but the term has type {ty}")]
    #[diagnostic(code("T-005"))]
    FunctionExpected { ty: String },

    #[error("Type expected, but the term has type {ty}")]
    #[diagnostic(code("T-006"))]
    TypeExpected { ty: String },

    #[error("Invalid projection .{idx} of {target}")]
    #[diagnostic(code("T-007"))]
    InvalidProjection { idx: u32, target: String },

    #[error("Wrong number of universe levels for {name}: got {actual}, expected {expected}")]
    #[diagnostic(code("T-008"))]
    LevelArityMismatch { name: Name, expected: usize, actual: usize },

    /// The equality problem is blocked on an unassigned metavariable that the
    /// checker may not assign.  Only raised when stuck detection is enabled;
    /// the caller is expected to postpone the problem and retry later.
    #[error("The equality check {lhs} =?= {rhs} is stuck")]
    #[diagnostic(code("T-009"))]
    Stuck { lhs: String, rhs: String },
}

impl TypeError {
    /// Whether a speculative caller (e.g. proof-irrelevance inside the
    /// equality checker) may swallow this error and fall through to the next
    /// strategy.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, TypeError::UnknownMetavariable { .. })
    }
}

/// Why a candidate solution was rejected by the assignment checker.
///
/// These are internal control flow, not user-facing diagnostics: most
/// variants make the caller give up on the assignment (returning "not yet
/// solvable" rather than failing the whole equality check), and
/// `UseFirstOrderApprox` redirects to the first-order heuristic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub(crate) enum CheckAssignmentError {
    #[error("occurs check failed")]
    OccursCheck,
    #[error("switching to first-order approximation")]
    UseFirstOrderApprox,
    #[error("free variable {0} is out of scope")]
    OutOfScopeFVar(FVarId),
    #[error("read-only metavariable {0} has a bigger context")]
    ReadOnlyMVarWithBiggerContext(MVarId),
    #[error("type of {0} is ill-formed in the restricted context")]
    IllFormedTypeInSmallerContext(MVarId),
    #[error("unknown metavariable {0}")]
    UnknownMVar(MVarId),
}

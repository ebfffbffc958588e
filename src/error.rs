use thiserror::Error;

use crate::utils::convergence::SolveStats;

// Unified error type for krylos.
//
// A failed solve never returns a plausible-looking success: iteration-cap
// exhaustion and numerical breakdown are typed errors. The best-effort
// iterate is still written into the caller's `x`, and the error carries the
// same stats payload a successful solve would return.

/// Why a solver's recurrence broke down.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakdownReason {
    /// CG curvature check failed: the operator is not positive-definite
    /// with respect to the active inner product.
    #[error("indefinite operator detected (p^T A p <= 0)")]
    IndefiniteOperator,
    /// The preconditioner is not positive-definite with respect to the
    /// active inner product (r^T M r < 0).
    #[error("indefinite preconditioner detected (r^T M r < 0)")]
    IndefinitePreconditioner,
    /// A degenerate Arnoldi/Lanczos step that is not a benign convergence
    /// indicator: the Krylov space became invariant while the residual is
    /// still above tolerance (singular or inconsistent system).
    #[error("invariant subspace reached with residual above tolerance")]
    SingularProjection,
}

#[derive(Error, Debug)]
pub enum Error<T: std::fmt::Debug> {
    /// Malformed input (shape mismatch, non-square operator). Raised before
    /// any iteration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Iteration cap reached (or early stop requested by the callback)
    /// without satisfying the stopping rule. The last iterate has been
    /// written into `x` and is usable as a warm start.
    #[error("no convergence in {maxiter} iterations (residual norms: {residual:?})")]
    Convergence {
        maxiter: usize,
        /// Per-column residual norms at the point of failure.
        residual: Vec<T>,
        stats: SolveStats<T>,
    },

    /// Solver-specific numerical breakdown: an assumption about A or M was
    /// violated (wrong solver for this system), as opposed to merely slow
    /// convergence.
    #[error("breakdown at iteration {iteration}: {reason}")]
    Breakdown {
        iteration: usize,
        reason: BreakdownReason,
        stats: SolveStats<T>,
    },
}

impl<T: std::fmt::Debug> Error<T> {
    /// Stats payload carried by `Convergence` and `Breakdown` failures.
    pub fn stats(&self) -> Option<&SolveStats<T>> {
        match self {
            Error::Validation(_) => None,
            Error::Convergence { stats, .. } => Some(stats),
            Error::Breakdown { stats, .. } => Some(stats),
        }
    }
}

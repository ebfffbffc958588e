//! Krylov solver interfaces.
//!
//! Each solver exposes `solve(a, m, b, x)`: `a` is the system operator, `m`
//! an optional preconditioner (both apply-only), `b` an n×k block of
//! right-hand sides, and `x` the initial guess on input and the solution on
//! output. On failure the best-effort iterate is still written into `x` and
//! the typed error carries the full stats payload.

use std::fmt::Debug;

use faer::Mat;
use num_traits::Float;

use crate::core::traits::Operator;
use crate::error::Error;
use crate::utils::convergence::SolveStats;

/// Per-iteration observation hook: receives the iteration index and the
/// current per-column residual norms; returning `true` requests an early
/// stop, which surfaces as `Error::Convergence`.
pub type IterationCallback<T> = Box<dyn FnMut(usize, &[T]) -> bool>;

/// Common interface for the iterative solvers.
pub trait LinearSolver<T: Float + Debug> {
    /// Solve A·x = b, writing the result into `x`.
    fn solve(
        &mut self,
        a: &dyn Operator<T>,
        m: Option<&dyn Operator<T>>,
        b: &Mat<T>,
        x: &mut Mat<T>,
    ) -> Result<SolveStats<T>, Error<T>>;
}

/// Shape checks shared by every solver, performed before any iteration.
/// Returns (n, k).
pub(crate) fn validate<T: Float + Debug>(
    a: &dyn Operator<T>,
    m: Option<&dyn Operator<T>>,
    b: &Mat<T>,
    x: &Mat<T>,
) -> Result<(usize, usize), Error<T>> {
    if a.nrows() != a.ncols() {
        return Err(Error::Validation(format!(
            "operator is not square: {}x{}",
            a.nrows(),
            a.ncols()
        )));
    }
    if b.nrows() != a.nrows() {
        return Err(Error::Validation(format!(
            "right-hand side has {} rows, operator has {}",
            b.nrows(),
            a.nrows()
        )));
    }
    if b.ncols() == 0 {
        return Err(Error::Validation("right-hand side block is empty".into()));
    }
    if x.nrows() != b.nrows() || x.ncols() != b.ncols() {
        return Err(Error::Validation(format!(
            "initial guess is {}x{}, expected {}x{}",
            x.nrows(),
            x.ncols(),
            b.nrows(),
            b.ncols()
        )));
    }
    if let Some(m) = m {
        if m.nrows() != m.ncols() || m.nrows() != a.nrows() {
            return Err(Error::Validation(format!(
                "preconditioner is {}x{}, operator is {}x{}",
                m.nrows(),
                m.ncols(),
                a.nrows(),
                a.ncols()
            )));
        }
    }
    Ok((b.nrows(), b.ncols()))
}

pub mod cg;
pub use cg::CgSolver;

pub mod minres;
pub use minres::MinresSolver;

pub mod gmres;
pub use gmres::GmresSolver;

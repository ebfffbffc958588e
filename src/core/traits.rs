//! Core linear-algebra contracts for krylos.
//!
//! Solvers depend only on these two traits, never on a concrete matrix
//! representation. Both operate on *blocks*: an n×k `faer::Mat` holding k
//! simultaneous right-hand-side columns (k = 1 for an ordinary solve).

use faer::Mat;
use num_traits::Float;

/// Apply-only operator contract: y ← A x on n×k blocks.
///
/// `apply` must be linear (apply(αX + βZ) = α apply(X) + β apply(Z)) and
/// must not depend on previous calls. This is an unchecked precondition:
/// violating it yields undefined numerical behavior, not a reported error.
pub trait Operator<T> {
    /// Number of rows of the operator.
    fn nrows(&self) -> usize;
    /// Number of columns of the operator.
    fn ncols(&self) -> usize;
    /// Compute y = A · x, one column at a time or batched. `x` and `y` have
    /// the same column count; `y` is overwritten.
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>);
}

/// Bilinear form over blocks of vectors.
///
/// The k columns of a block are k independent systems advanced in lockstep,
/// so the recurrences consume the per-column contraction `dots` (the
/// diagonal of the Gram block). The full k×k Gram block is available for
/// orthogonality diagnostics. The form must be symmetric and
/// positive-definite for CG/MINRES correctness (unchecked precondition).
pub trait InnerProduct<T: Float> {
    /// Per-column bilinear form: `dots(x, y)[c] = <x[:,c], y[:,c]>`.
    fn dots(&self, x: &Mat<T>, y: &Mat<T>) -> Vec<T>;

    /// Full k×k Gram block: `gram(x, y)[(i, j)] = <x[:,i], y[:,j]>`.
    fn gram(&self, x: &Mat<T>, y: &Mat<T>) -> Mat<T>;

    /// Per-column norms induced by the form: `sqrt(dots(x, x))`.
    fn norms(&self, x: &Mat<T>) -> Vec<T> {
        self.dots(x, x).into_iter().map(|d| d.sqrt()).collect()
    }
}

//! Convergence tracking & tolerance checks for iterative solvers.

use num_traits::Float;

/// Stopping criteria: a column has converged when its residual norm is at
/// most `max(atol, rtol * reference_norm)`; a solve has converged when every
/// column has. The reference is the right-hand-side norm (equal to the
/// initial residual norm for the default zero guess), so a converged
/// solution fed back as the initial guess converges immediately instead of
/// chasing the machine-precision floor.
#[derive(Clone, Copy, Debug)]
pub struct Convergence<T> {
    pub rtol: T,
    pub atol: T,
    pub max_iters: usize,
}

impl<T: Float> Convergence<T> {
    pub fn new(rtol: T, atol: T, max_iters: usize) -> Self {
        Self { rtol, atol, max_iters }
    }

    /// Per-column stopping threshold for a given reference norm.
    pub fn threshold(&self, reference_norm: T) -> T {
        (self.rtol * reference_norm).max(self.atol)
    }
}

/// Final solve diagnostics, returned on success and carried by failures.
#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    pub converged: bool,
    /// Per-column residual norms at termination.
    pub final_residual: Vec<T>,
    /// One entry per iteration (including the initial residual), each a
    /// vector of per-column norms. Kept even when the solve fails.
    pub residual_history: Vec<Vec<T>>,
    /// Number of operator (A) applications performed.
    pub operator_calls: usize,
    /// Number of preconditioner (M) applications performed.
    pub precond_calls: usize,
}

/// Per-solve residual bookkeeping: owns the history, the per-column
/// thresholds and the call counters, and decides once per iteration whether
/// to stop. Created at the start of a solve call, immutable once it ends.
pub struct Monitor<T> {
    pub conv: Convergence<T>,
    thresholds: Vec<T>,
    history: Vec<Vec<T>>,
    iterations: usize,
    pub operator_calls: usize,
    pub precond_calls: usize,
}

impl<T: Float> Monitor<T> {
    /// Seed with the per-column reference norms (usually ‖b‖, measured the
    /// same way the monitored residuals are) and the initial residual norms,
    /// recorded as history entry zero.
    pub fn new(conv: Convergence<T>, reference: Vec<T>, initial: Vec<T>) -> Self {
        let thresholds = reference.iter().map(|&r| conv.threshold(r)).collect();
        Self {
            conv,
            thresholds,
            history: vec![initial],
            iterations: 0,
            operator_calls: 0,
            precond_calls: 0,
        }
    }

    /// True when the initial guess already satisfies the stopping rule
    /// (zero-iteration convergence).
    pub fn converged_at_start(&self) -> bool {
        self.all_below(&self.history[0])
    }

    /// Record the norms of iteration `iter`; returns true when every column
    /// satisfies the stopping rule.
    pub fn update(&mut self, iter: usize, norms: Vec<T>) -> bool {
        self.iterations = iter;
        let done = self.all_below(&norms);
        self.history.push(norms);
        done
    }

    /// Overwrite the most recent history entry, used when a solver replaces
    /// a recurrence estimate with an explicitly recomputed residual norm.
    pub fn replace_last(&mut self, norms: Vec<T>) -> bool {
        let done = self.all_below(&norms);
        *self.history.last_mut().expect("history is never empty") = norms;
        done
    }

    /// Per-column convergence against the thresholds of the latest entry.
    pub fn column_converged(&self, c: usize) -> bool {
        self.last()[c] <= self.thresholds[c]
    }

    /// Latest per-column norms.
    pub fn last(&self) -> &[T] {
        self.history.last().expect("history is never empty")
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Render the final stats snapshot.
    pub fn stats(&self, converged: bool) -> SolveStats<T> {
        SolveStats {
            iterations: self.iterations,
            converged,
            final_residual: self.last().to_vec(),
            residual_history: self.history.clone(),
            operator_calls: self.operator_calls,
            precond_calls: self.precond_calls,
        }
    }

    fn all_below(&self, norms: &[T]) -> bool {
        norms
            .iter()
            .zip(&self.thresholds)
            .all(|(&r, &thr)| r <= thr)
    }
}

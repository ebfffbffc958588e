//! Per-call solver configuration.
//!
//! There is no process-wide mutable configuration: every solve call carries
//! its own options, with the documented defaults below.

use num_traits::Float;

/// Options shared by all solvers.
#[derive(Debug, Clone, Copy)]
pub struct SolverOptions<T> {
    /// Relative tolerance against the initial residual norm. Default 1e-5.
    pub rtol: T,
    /// Absolute residual-norm tolerance. Default 0.
    pub atol: T,
    /// Iteration cap; `None` defaults to the operator dimension n.
    pub maxiter: Option<usize>,
    /// GMRES restart length; `None` means unrestarted. Ignored by CG and
    /// MINRES.
    pub restart: Option<usize>,
}

impl<T: Float> Default for SolverOptions<T> {
    fn default() -> Self {
        Self {
            rtol: num_traits::cast::<f64, T>(1e-5).unwrap(),
            atol: T::zero(),
            maxiter: None,
            restart: None,
        }
    }
}

impl<T: Float> SolverOptions<T> {
    pub fn with_tolerances(mut self, rtol: T, atol: T) -> Self {
        self.rtol = rtol;
        self.atol = atol;
        self
    }

    pub fn with_maxiter(mut self, maxiter: usize) -> Self {
        self.maxiter = Some(maxiter);
        self
    }

    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = Some(restart);
        self
    }
}

//! Factory for the Krylov solvers.
//!
//! `KrylovContext` pairs a [`SolverKind`] with [`SolverOptions`] and
//! dispatches to the concrete solver, resolving the default iteration cap
//! (the operator dimension) at solve time. Use the solver types directly
//! when you need a custom inner product or a per-iteration callback.

use std::fmt::Debug;

use faer::Mat;
use num_traits::Float;

use crate::config::SolverOptions;
use crate::core::traits::Operator;
use crate::error::Error;
use crate::solver::{CgSolver, GmresSolver, LinearSolver, MinresSolver};
use crate::utils::convergence::SolveStats;

/// The available solver types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverKind {
    /// Conjugate Gradient, for symmetric positive-definite operators.
    Cg,
    /// MINRES, for symmetric (possibly indefinite) operators.
    Minres,
    /// Restarted GMRES, for general operators.
    Gmres,
}

/// Solver selection plus per-call configuration.
pub struct KrylovContext<T> {
    pub kind: SolverKind,
    pub options: SolverOptions<T>,
}

impl<T: Float + Debug + Send + Sync> KrylovContext<T> {
    pub fn new(kind: SolverKind) -> Self {
        Self { kind, options: SolverOptions::default() }
    }

    pub fn with_options(mut self, options: SolverOptions<T>) -> Self {
        self.options = options;
        self
    }

    /// Solve A·x = b with the configured solver. `x` carries the initial
    /// guess in and the solution (or best-effort iterate) out.
    pub fn solve(
        &self,
        a: &dyn Operator<T>,
        m: Option<&dyn Operator<T>>,
        b: &Mat<T>,
        x: &mut Mat<T>,
    ) -> Result<SolveStats<T>, Error<T>> {
        let opts = &self.options;
        let maxiter = opts.maxiter.unwrap_or(a.nrows());
        match self.kind {
            SolverKind::Cg => CgSolver::new(opts.rtol, opts.atol, maxiter).solve(a, m, b, x),
            SolverKind::Minres => {
                MinresSolver::new(opts.rtol, opts.atol, maxiter).solve(a, m, b, x)
            }
            SolverKind::Gmres => {
                let mut solver = GmresSolver::new(opts.rtol, opts.atol, maxiter);
                if let Some(restart) = opts.restart {
                    solver = solver.with_restart(restart);
                }
                solver.solve(a, m, b, x)
            }
        }
    }
}

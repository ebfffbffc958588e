//! Conjugate Gradient for symmetric positive-definite systems, with optional
//! preconditioning (Saad §6.1, §9.2).
//!
//! The k right-hand-side columns run the scalar recurrence in lockstep:
//! operator applications are batched, the coefficients α and β are computed
//! per column, and columns that reach their tolerance are frozen while the
//! rest keep iterating.
//!
//! A non-positive curvature ⟨p, Ap⟩ means A is not positive-definite for the
//! active inner product; the solve fails with a breakdown error instead of
//! silently returning a wrong iterate.

use std::fmt::Debug;

use faer::Mat;
use num_traits::Float;

use crate::core::block;
use crate::core::traits::{InnerProduct, Operator};
use crate::core::wrappers::EuclideanInner;
use crate::error::{BreakdownReason, Error};
use crate::solver::{IterationCallback, LinearSolver, validate};
use crate::utils::convergence::{Convergence, Monitor, SolveStats};

pub struct CgSolver<T> {
    pub conv: Convergence<T>,
    /// Threshold below which a recurrence coefficient counts as zero.
    pub breakdown_tol: T,
    ip: Option<Box<dyn InnerProduct<T>>>,
    callback: Option<IterationCallback<T>>,
}

impl<T: Float> CgSolver<T> {
    pub fn new(rtol: T, atol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence::new(rtol, atol, max_iters),
            breakdown_tol: num_traits::cast::<f64, T>(1e-14).unwrap(),
            ip: None,
            callback: None,
        }
    }

    /// Replace the Euclidean inner product.
    pub fn with_inner_product(mut self, ip: Box<dyn InnerProduct<T>>) -> Self {
        self.ip = Some(ip);
        self
    }

    /// Observe per-column residual norms once per iteration; return `true`
    /// to request an early stop (reported as `Error::Convergence`).
    pub fn with_callback<F>(mut self, f: F) -> Self
    where
        F: FnMut(usize, &[T]) -> bool + 'static,
    {
        self.callback = Some(Box::new(f));
        self
    }

    pub fn with_breakdown_tol(mut self, tol: T) -> Self {
        self.breakdown_tol = tol;
        self
    }
}

fn apply_precond<T: Float>(
    m: Option<&dyn Operator<T>>,
    r: &Mat<T>,
    monitor: &mut Monitor<T>,
) -> Mat<T> {
    match m {
        Some(m) => {
            let mut z = block::zeros(r.nrows(), r.ncols());
            m.apply(r, &mut z);
            monitor.precond_calls += 1;
            z
        }
        None => r.clone(),
    }
}

impl<T: Float + Debug + Send + Sync> LinearSolver<T> for CgSolver<T> {
    fn solve(
        &mut self,
        a: &dyn Operator<T>,
        m: Option<&dyn Operator<T>>,
        b: &Mat<T>,
        x: &mut Mat<T>,
    ) -> Result<SolveStats<T>, Error<T>> {
        let (n, k) = validate(a, m, b, x)?;
        let euclid = EuclideanInner;
        let ip: &dyn InnerProduct<T> = match &self.ip {
            Some(ip) => ip.as_ref(),
            None => &euclid,
        };

        let mut xk = x.clone();
        let mut r = block::residual(a, b, &xk);
        let mut monitor = Monitor::new(self.conv, ip.norms(b), ip.norms(&r));
        monitor.operator_calls += 1;

        let mut z = apply_precond(m, &r, &mut monitor);
        let mut rz = ip.dots(&r, &z);
        for c in 0..k {
            if rz[c] < T::zero() {
                *x = xk;
                return Err(Error::Breakdown {
                    iteration: 0,
                    reason: BreakdownReason::IndefinitePreconditioner,
                    stats: monitor.stats(false),
                });
            }
        }

        if let Some(cb) = self.callback.as_mut() {
            if cb(0, monitor.last()) {
                *x = xk;
                let residual = monitor.last().to_vec();
                return Err(Error::Convergence { maxiter: 0, residual, stats: monitor.stats(false) });
            }
        }
        if monitor.converged_at_start() {
            *x = xk;
            return Ok(monitor.stats(true));
        }

        let mut p = z.clone();
        for i in 1..=self.conv.max_iters {
            let mut q = block::zeros(n, k);
            a.apply(&p, &mut q);
            monitor.operator_calls += 1;

            let pq = ip.dots(&p, &q);
            let mut alpha = vec![T::zero(); k];
            for c in 0..k {
                if monitor.column_converged(c) {
                    continue;
                }
                if pq[c] <= T::zero() {
                    *x = xk;
                    return Err(Error::Breakdown {
                        iteration: i,
                        reason: BreakdownReason::IndefiniteOperator,
                        stats: monitor.stats(false),
                    });
                }
                alpha[c] = rz[c] / pq[c];
            }

            block::axpy(&mut xk, &alpha, &p);
            let neg_alpha: Vec<T> = alpha.iter().map(|&v| -v).collect();
            block::axpy(&mut r, &neg_alpha, &q);

            z = apply_precond(m, &r, &mut monitor);
            let rz_new = ip.dots(&r, &z);

            let done = monitor.update(i, ip.norms(&r));
            if let Some(cb) = self.callback.as_mut() {
                if cb(i, monitor.last()) && !done {
                    *x = xk;
                    let residual = monitor.last().to_vec();
                    return Err(Error::Convergence { maxiter: i, residual, stats: monitor.stats(false) });
                }
            }
            if done {
                *x = xk;
                return Ok(monitor.stats(true));
            }

            let mut beta = vec![T::zero(); k];
            for c in 0..k {
                if monitor.column_converged(c) {
                    continue;
                }
                if rz_new[c] < T::zero() {
                    *x = xk;
                    return Err(Error::Breakdown {
                        iteration: i,
                        reason: BreakdownReason::IndefinitePreconditioner,
                        stats: monitor.stats(false),
                    });
                }
                beta[c] = rz_new[c] / rz[c];
            }
            for c in 0..k {
                if monitor.column_converged(c) {
                    continue;
                }
                for row in 0..n {
                    p[(row, c)] = z[(row, c)] + beta[c] * p[(row, c)];
                }
            }
            rz = rz_new;
        }

        *x = xk;
        let residual = monitor.last().to_vec();
        Err(Error::Convergence {
            maxiter: self.conv.max_iters,
            residual,
            stats: monitor.stats(false),
        })
    }
}

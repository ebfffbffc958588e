//! MINRES solver for symmetric, possibly indefinite systems (Saad §7.4),
//! with optional preconditioning.
//!
//! The Lanczos engine produces the tridiagonal coefficients; a running
//! product of Givens rotations reduces each new tridiagonal column to upper
//! bidiagonal form, so the least-squares solution over the growing Krylov
//! subspace — and its residual norm — costs O(1) extra work per step. The
//! iterate is advanced by a rank-one correction along a short direction
//! recurrence; no restart is needed, memory is three blocks regardless of
//! iteration count.
//!
//! A Lanczos β below the breakdown tolerance means the Krylov subspace is
//! invariant. That is usually exact convergence; the solver recomputes the
//! explicit residual to confirm, and only reports a breakdown when the
//! residual is still above tolerance (singular or inconsistent system).

use std::fmt::Debug;

use faer::Mat;
use num_traits::Float;

use crate::core::block;
use crate::core::traits::{InnerProduct, Operator};
use crate::core::wrappers::EuclideanInner;
use crate::error::{BreakdownReason, Error};
use crate::ortho::Lanczos;
use crate::solver::{IterationCallback, LinearSolver, validate};
use crate::utils::convergence::{Convergence, Monitor, SolveStats};
use crate::utils::givens::GivensRotation;

pub struct MinresSolver<T> {
    pub conv: Convergence<T>,
    /// Threshold below which a recurrence coefficient counts as zero.
    pub breakdown_tol: T,
    ip: Option<Box<dyn InnerProduct<T>>>,
    callback: Option<IterationCallback<T>>,
}

impl<T: Float> MinresSolver<T> {
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

/// Norm the recurrence estimates: sqrt(⟨r, M r⟩), or the plain ip-norm when
/// M is absent.
fn preconditioned_norms<T: Float>(
    m: Option<&dyn Operator<T>>,
    ip: &dyn InnerProduct<T>,
    r: &Mat<T>,
) -> Vec<T> {
    match m {
        Some(m) => {
            let mut z = block::zeros(r.nrows(), r.ncols());
            m.apply(r, &mut z);
            ip.dots(r, &z)
                .into_iter()
                .map(|d| d.max(T::zero()).sqrt())
                .collect()
        }
        None => ip.norms(r),
    }
}

impl<T: Float + Debug + Send + Sync> LinearSolver<T> for MinresSolver<T> {
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
        let r0 = block::residual(a, b, &xk);
        // convergence is relative to ||b|| in the monitored norm
        let b_ref = preconditioned_norms(m, ip, b);
        let precond_calls = if m.is_some() { 2 } else { 0 };

        let (mut lanczos, beta1) = match Lanczos::new(a, m, ip, &r0, self.breakdown_tol) {
            Ok(seeded) => seeded,
            Err(reason) => {
                // fall back to the unpreconditioned norm for diagnostics
                let mut monitor = Monitor::new(self.conv, b_ref, ip.norms(&r0));
                monitor.operator_calls = 1;
                monitor.precond_calls = precond_calls;
                *x = xk;
                return Err(Error::Breakdown { iteration: 0, reason, stats: monitor.stats(false) });
            }
        };
        let mut monitor = Monitor::new(self.conv, b_ref, beta1.clone());
        monitor.operator_calls = 1;
        monitor.precond_calls = precond_calls;
        let mut phibar = beta1;

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

        // Givens bookkeeping, one lane per right-hand-side column
        let mut cs = vec![-T::one(); k];
        let mut sn = vec![T::zero(); k];
        let mut dbar = vec![T::zero(); k];
        let mut epsln = vec![T::zero(); k];
        // direction recurrence: w1 two steps back, w2 one step back
        let mut w1 = block::zeros(n, k);
        let mut w2 = block::zeros(n, k);

        for j in 1..=self.conv.max_iters {
            let step = match lanczos.advance() {
                Ok(step) => step,
                Err(reason) => {
                    *x = xk;
                    return Err(Error::Breakdown { iteration: j, reason, stats: monitor.stats(false) });
                }
            };
            monitor.operator_calls += 1;
            if m.is_some() {
                monitor.precond_calls += 1;
            }

            let mut w_new = block::zeros(n, k);
            let mut phi = vec![T::zero(); k];
            let mut norms = vec![T::zero(); k];
            for c in 0..k {
                let oldeps = epsln[c];
                let delta = cs[c] * dbar[c] + sn[c] * step.alpha[c];
                let gbar = sn[c] * dbar[c] - cs[c] * step.alpha[c];
                epsln[c] = sn[c] * step.beta[c];
                dbar[c] = -cs[c] * step.beta[c];

                let (rot, gamma) = GivensRotation::new(gbar, step.beta[c], self.breakdown_tol);
                if gamma.abs() < self.breakdown_tol {
                    // nothing left to reduce for this column; leave it as is
                    norms[c] = phibar[c].abs();
                    continue;
                }
                cs[c] = rot.c;
                sn[c] = rot.s;
                phi[c] = cs[c] * phibar[c];
                phibar[c] = sn[c] * phibar[c];
                norms[c] = phibar[c].abs();

                let inv = T::one() / gamma;
                for row in 0..n {
                    w_new[(row, c)] =
                        (step.z[(row, c)] - oldeps * w1[(row, c)] - delta * w2[(row, c)]) * inv;
                }
            }
            block::axpy(&mut xk, &phi, &w_new);
            w1 = w2;
            w2 = w_new;

            let mut done = monitor.update(j, norms);
            if let Some(cb) = self.callback.as_mut() {
                if cb(j, monitor.last()) && !done {
                    *x = xk;
                    let residual = monitor.last().to_vec();
                    return Err(Error::Convergence { maxiter: j, residual, stats: monitor.stats(false) });
                }
            }

            if !step.newly_invariant.is_empty() {
                // invariant subspace: confirm with the explicit residual
                let r = block::residual(a, b, &xk);
                monitor.operator_calls += 1;
                if m.is_some() {
                    monitor.precond_calls += 1;
                }
                let true_norms = preconditioned_norms(m, ip, &r);
                done = monitor.replace_last(true_norms);
                if !done {
                    for &c in &step.newly_invariant {
                        if !monitor.column_converged(c) {
                            *x = xk;
                            return Err(Error::Breakdown {
                                iteration: j,
                                reason: BreakdownReason::SingularProjection,
                                stats: monitor.stats(false),
                            });
                        }
                    }
                }
            }
            if done {
                *x = xk;
                return Ok(monitor.stats(true));
            }
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

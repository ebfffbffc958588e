//! Restarted GMRES for general nonsymmetric systems (Saad §6.4).
//!
//! Each cycle builds an Arnoldi basis orthonormal in the active inner
//! product; the growing Hessenberg columns are reduced to upper-triangular
//! form by an accumulating sequence of Givens rotations (one lane per
//! right-hand-side column), so the minimal-residual norm over the current
//! Krylov subspace is available every step without re-factoring.
//!
//! The restart length bounds the basis size: when it is reached without
//! convergence the basis and reduction state are discarded, the true
//! (preconditioned) residual is recomputed from the current iterate, and
//! Arnoldi is reseeded. Restarting bounds memory but gives up the monotone
//! convergence of the unrestarted method; restarted GMRES is not guaranteed
//! to converge within a fixed number of restarts for arbitrary A.
//!
//! Preconditioning is left-sided: the solve runs on M(b − Ax), and the
//! monitored residual norm is the preconditioned one. Convergence is only
//! reported after the explicitly recomputed residual confirms the
//! recurrence estimate.

use std::fmt::Debug;

use faer::Mat;
use num_traits::Float;

use crate::core::block;
use crate::core::traits::{InnerProduct, Operator};
use crate::core::wrappers::EuclideanInner;
use crate::error::{BreakdownReason, Error};
use crate::ortho::Arnoldi;
use crate::solver::{IterationCallback, LinearSolver, validate};
use crate::utils::convergence::{Convergence, Monitor, SolveStats};
use crate::utils::givens::GivensRotation;

pub struct GmresSolver<T> {
    pub conv: Convergence<T>,
    /// Arnoldi vectors per cycle; `None` means unrestarted (the basis grows
    /// up to `max_iters` blocks).
    pub restart: Option<usize>,
    /// Threshold below which a recurrence coefficient counts as zero.
    pub breakdown_tol: T,
    ip: Option<Box<dyn InnerProduct<T>>>,
    callback: Option<IterationCallback<T>>,
}

impl<T: Float> GmresSolver<T> {
    pub fn new(rtol: T, atol: T, max_iters: usize) -> Self {
        Self {
            conv: Convergence::new(rtol, atol, max_iters),
            restart: None,
            breakdown_tol: num_traits::cast::<f64, T>(1e-14).unwrap(),
            ip: None,
            callback: None,
        }
    }

    /// Bound the Arnoldi basis to `m` blocks per cycle.
    pub fn with_restart(mut self, m: usize) -> Self {
        self.restart = Some(m);
        self
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

/// Left-preconditioned residual M(b − Ax), counted on the monitor.
fn preconditioned_residual<T: Float>(
    a: &dyn Operator<T>,
    m: Option<&dyn Operator<T>>,
    b: &Mat<T>,
    x: &Mat<T>,
    monitor: &mut Monitor<T>,
) -> Mat<T> {
    let r = block::residual(a, b, x);
    monitor.operator_calls += 1;
    match m {
        Some(m) => {
            let mut mr = block::zeros(r.nrows(), r.ncols());
            m.apply(&r, &mut mr);
            monitor.precond_calls += 1;
            mr
        }
        None => r,
    }
}

impl<T: Float + Debug + Send + Sync> LinearSolver<T> for GmresSolver<T> {
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
        let max_iters = self.conv.max_iters;
        let restart_len = self.restart.unwrap_or(max_iters);

        let mut xk = x.clone();
        let mut r = {
            let r0 = block::residual(a, b, &xk);
            match m {
                Some(m) => {
                    let mut mr = block::zeros(n, k);
                    m.apply(&r0, &mut mr);
                    mr
                }
                None => r0,
            }
        };
        // convergence is relative to ||M b|| in the monitored norm
        let b_ref = match m {
            Some(m) => {
                let mut mb = block::zeros(n, k);
                m.apply(b, &mut mb);
                ip.norms(&mb)
            }
            None => ip.norms(b),
        };
        let mut monitor = Monitor::new(self.conv, b_ref, ip.norms(&r));
        monitor.operator_calls = 1;
        monitor.precond_calls = if m.is_some() { 2 } else { 0 };

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

        let mut iteration = 0;
        loop {
            let (mut arnoldi, beta) = Arnoldi::new(a, m, ip, &r, self.breakdown_tol);
            let cycle_len = restart_len.min(max_iters - iteration);

            // projected right-hand side and triangularized Hessenberg columns
            let mut g = block::zeros(cycle_len + 1, k);
            for c in 0..k {
                g[(0, c)] = beta[c];
            }
            let mut rotations: Vec<Vec<GivensRotation<T>>> = Vec::with_capacity(cycle_len);
            let mut rcols: Vec<Mat<T>> = Vec::with_capacity(cycle_len);
            let mut steps = 0;
            let mut saw_invariant = false;
            let mut early_stop = false;

            for j in 0..cycle_len {
                iteration += 1;
                let newly = arnoldi.advance();
                monitor.operator_calls += 1;
                if m.is_some() {
                    monitor.precond_calls += 1;
                }
                saw_invariant = saw_invariant || !newly.is_empty();

                let mut h = arnoldi.hess_column(j).clone();
                let mut rots_j = Vec::with_capacity(k);
                let mut norms = vec![T::zero(); k];
                for c in 0..k {
                    for (i, rots_i) in rotations.iter().enumerate() {
                        let (hi, hi1) = rots_i[c].apply(h[(i, c)], h[(i + 1, c)]);
                        h[(i, c)] = hi;
                        h[(i + 1, c)] = hi1;
                    }
                    let (rot, rdiag) = GivensRotation::new(h[(j, c)], h[(j + 1, c)], self.breakdown_tol);
                    h[(j, c)] = rdiag;
                    h[(j + 1, c)] = T::zero();
                    let (gj, gj1) = rot.apply(g[(j, c)], g[(j + 1, c)]);
                    g[(j, c)] = gj;
                    g[(j + 1, c)] = gj1;
                    norms[c] = gj1.abs();
                    rots_j.push(rot);
                }
                rotations.push(rots_j);
                rcols.push(h);
                steps = j + 1;

                let done = monitor.update(iteration, norms);
                if let Some(cb) = self.callback.as_mut() {
                    if cb(iteration, monitor.last()) && !done {
                        early_stop = true;
                        break;
                    }
                }
                if done || saw_invariant || iteration >= max_iters {
                    break;
                }
            }

            // least-squares solve R y = g (back-substitution with zero-pivot
            // protection), then update the iterate from the basis
            let mut y = block::zeros(steps, k);
            for c in 0..k {
                for i in (0..steps).rev() {
                    let mut v = g[(i, c)];
                    for l in (i + 1)..steps {
                        v = v - rcols[l][(i, c)] * y[(l, c)];
                    }
                    let d = rcols[i][(i, c)];
                    y[(i, c)] = if d.abs() > self.breakdown_tol { v / d } else { T::zero() };
                }
            }
            for l in 0..steps {
                let yl: Vec<T> = (0..k).map(|c| y[(l, c)]).collect();
                block::axpy(&mut xk, &yl, &arnoldi.basis()[l]);
            }

            // the recurrence estimate is only trusted after an explicit check
            r = preconditioned_residual(a, m, b, &xk, &mut monitor);
            let done = monitor.replace_last(ip.norms(&r));
            if done {
                *x = xk;
                return Ok(monitor.stats(true));
            }
            if early_stop {
                *x = xk;
                let residual = monitor.last().to_vec();
                return Err(Error::Convergence { maxiter: iteration, residual, stats: monitor.stats(false) });
            }
            if saw_invariant {
                // an invariant column that is still above tolerance cannot
                // improve by restarting
                for (c, &inv) in arnoldi.invariant().iter().enumerate() {
                    if inv && !monitor.column_converged(c) {
                        *x = xk;
                        return Err(Error::Breakdown {
                            iteration,
                            reason: BreakdownReason::SingularProjection,
                            stats: monitor.stats(false),
                        });
                    }
                }
            }
            if iteration >= max_iters {
                *x = xk;
                let residual = monitor.last().to_vec();
                return Err(Error::Convergence {
                    maxiter: max_iters,
                    residual,
                    stats: monitor.stats(false),
                });
            }
        }
    }
}

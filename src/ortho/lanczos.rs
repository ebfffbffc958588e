//! Lanczos process for symmetric operators (Saad §6.6), with optional
//! preconditioning.
//!
//! For a symmetric operator the Arnoldi recurrence collapses to three terms:
//! A vⱼ = βⱼ vⱼ₋₁ + αⱼ vⱼ + βⱼ₊₁ vⱼ₊₁. With a preconditioner M the engine
//! runs the recurrence in the M-inner product, tracking the unpreconditioned
//! vector v and its preconditioned image z = M v; βⱼ₊₁² = ⟨w, M w⟩ then must
//! be nonnegative, and a negative value exposes an indefinite M.
//!
//! A β below the breakdown tolerance means the column's Krylov subspace is
//! invariant — normally exact convergence, decided by the solver.

use faer::Mat;
use num_traits::Float;

use crate::core::block;
use crate::core::traits::{InnerProduct, Operator};
use crate::error::BreakdownReason;

pub struct Lanczos<'a, T> {
    a: &'a dyn Operator<T>,
    m: Option<&'a dyn Operator<T>>,
    ip: &'a dyn InnerProduct<T>,
    v_prev: Mat<T>,
    v: Mat<T>,
    z: Mat<T>,
    beta: Vec<T>,
    invariant: Vec<bool>,
    breakdown_tol: T,
    n: usize,
    k: usize,
}

/// Coefficients produced by one Lanczos step.
pub struct LanczosStep<T> {
    /// Diagonal coefficients αⱼ, one per column.
    pub alpha: Vec<T>,
    /// Subdiagonal coefficients βⱼ₊₁, one per column.
    pub beta: Vec<T>,
    /// The preconditioned basis block zⱼ consumed by this step (the search
    /// direction space of MINRES).
    pub z: Mat<T>,
    /// Columns whose subspace became invariant during this step.
    pub newly_invariant: Vec<usize>,
}

impl<'a, T: Float> Lanczos<'a, T> {
    /// Seed with a residual block. Returns the engine and the per-column
    /// seed norms β₁ = sqrt(⟨r₀, M r₀⟩) (the plain ip-norm when M is
    /// absent). Fails when M is indefinite on r₀.
    pub fn new(
        a: &'a dyn Operator<T>,
        m: Option<&'a dyn Operator<T>>,
        ip: &'a dyn InnerProduct<T>,
        r0: &Mat<T>,
        breakdown_tol: T,
    ) -> Result<(Self, Vec<T>), BreakdownReason> {
        let (n, k) = (r0.nrows(), r0.ncols());
        let z0 = match m {
            Some(m) => {
                let mut z = block::zeros(n, k);
                m.apply(r0, &mut z);
                z
            }
            None => r0.clone(),
        };
        let beta_sq = ip.dots(r0, &z0);
        let mut beta = vec![T::zero(); k];
        let mut invariant = vec![false; k];
        for c in 0..k {
            if beta_sq[c] < T::zero() {
                if beta_sq[c].abs() >= breakdown_tol {
                    return Err(BreakdownReason::IndefinitePreconditioner);
                }
                invariant[c] = true;
            } else {
                beta[c] = beta_sq[c].sqrt();
                if beta[c] < breakdown_tol {
                    invariant[c] = true;
                }
            }
        }
        let scale: Vec<T> = beta
            .iter()
            .zip(&invariant)
            .map(|(&b, &inv)| if inv { T::zero() } else { T::one() / b })
            .collect();
        let mut v = r0.clone();
        let mut z = z0;
        block::scale_columns(&mut v, &scale);
        block::scale_columns(&mut z, &scale);
        Ok((
            Self {
                a,
                m,
                ip,
                v_prev: block::zeros(n, k),
                v,
                z,
                beta: beta.clone(),
                invariant,
                breakdown_tol,
                n,
                k,
            },
            beta,
        ))
    }

    pub fn all_invariant(&self) -> bool {
        self.invariant.iter().all(|&f| f)
    }

    /// One Lanczos step: w = A zⱼ − βⱼ vⱼ₋₁ − αⱼ vⱼ, then βⱼ₊₁ from the
    /// preconditioned norm of w.
    pub fn advance(&mut self) -> Result<LanczosStep<T>, BreakdownReason> {
        let mut w = block::zeros(self.n, self.k);
        self.a.apply(&self.z, &mut w);

        let neg_beta: Vec<T> = self.beta.iter().map(|&b| -b).collect();
        block::axpy(&mut w, &neg_beta, &self.v_prev);
        let alpha = self.ip.dots(&self.z, &w);
        let neg_alpha: Vec<T> = alpha.iter().map(|&a| -a).collect();
        block::axpy(&mut w, &neg_alpha, &self.v);

        let z_next = match self.m {
            Some(m) => {
                let mut z = block::zeros(self.n, self.k);
                m.apply(&w, &mut z);
                z
            }
            None => w.clone(),
        };
        let beta_sq = self.ip.dots(&w, &z_next);

        let mut beta_next = vec![T::zero(); self.k];
        let mut newly_invariant = Vec::new();
        for c in 0..self.k {
            if self.invariant[c] {
                continue;
            }
            if beta_sq[c] < T::zero() {
                if beta_sq[c].abs() >= self.breakdown_tol {
                    return Err(BreakdownReason::IndefinitePreconditioner);
                }
                self.invariant[c] = true;
                newly_invariant.push(c);
                continue;
            }
            beta_next[c] = beta_sq[c].sqrt();
            if beta_next[c] < self.breakdown_tol {
                beta_next[c] = T::zero();
                self.invariant[c] = true;
                newly_invariant.push(c);
            }
        }

        let scale: Vec<T> = beta_next
            .iter()
            .map(|&b| if b > T::zero() { T::one() / b } else { T::zero() })
            .collect();
        let mut v_next = w;
        let mut z_scaled = z_next;
        block::scale_columns(&mut v_next, &scale);
        block::scale_columns(&mut z_scaled, &scale);

        let step_z = std::mem::replace(&mut self.z, z_scaled);
        self.v_prev = std::mem::replace(&mut self.v, v_next);
        self.beta = beta_next.clone();

        Ok(LanczosStep {
            alpha,
            beta: beta_next,
            z: step_z,
            newly_invariant,
        })
    }
}

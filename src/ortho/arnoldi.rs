//! Arnoldi process with double orthogonalization (Saad §6.3).
//!
//! Each `advance` applies the (optionally left-preconditioned) operator to
//! the latest basis block, orthogonalizes against every previous block with
//! modified Gram-Schmidt w.r.t. the active inner product, runs a second
//! orthogonalization pass for numerical stability, and normalizes. The
//! Hessenberg coefficients are stored per column: `hess[j]` is a (j+2)×k
//! matrix holding column j of each right-hand side's Hessenberg matrix.

use faer::Mat;
use num_traits::Float;

use crate::core::block;
use crate::core::traits::{InnerProduct, Operator};

pub struct Arnoldi<'a, T> {
    a: &'a dyn Operator<T>,
    m: Option<&'a dyn Operator<T>>,
    ip: &'a dyn InnerProduct<T>,
    basis: Vec<Mat<T>>,
    hess: Vec<Mat<T>>,
    invariant: Vec<bool>,
    breakdown_tol: T,
    n: usize,
    k: usize,
}

impl<'a, T: Float> Arnoldi<'a, T> {
    /// Seed the process with a residual block. Returns the engine and the
    /// per-column seed norms ‖r₀‖ in the active inner product. Columns whose
    /// seed norm is below the breakdown tolerance start out invariant.
    pub fn new(
        a: &'a dyn Operator<T>,
        m: Option<&'a dyn Operator<T>>,
        ip: &'a dyn InnerProduct<T>,
        r0: &Mat<T>,
        breakdown_tol: T,
    ) -> (Self, Vec<T>) {
        let (n, k) = (r0.nrows(), r0.ncols());
        let norms = ip.norms(r0);
        let mut invariant = vec![false; k];
        let mut v0 = r0.clone();
        let scale: Vec<T> = norms
            .iter()
            .enumerate()
            .map(|(c, &b)| {
                if b < breakdown_tol {
                    invariant[c] = true;
                    T::zero()
                } else {
                    T::one() / b
                }
            })
            .collect();
        block::scale_columns(&mut v0, &scale);
        (
            Self {
                a,
                m,
                ip,
                basis: vec![v0],
                hess: Vec::new(),
                invariant,
                breakdown_tol,
                n,
                k,
            },
            norms,
        )
    }

    /// The orthonormal basis blocks V₀…Vⱼ built so far.
    pub fn basis(&self) -> &[Mat<T>] {
        &self.basis
    }

    /// Hessenberg column j, shape (j+2)×k.
    pub fn hess_column(&self, j: usize) -> &Mat<T> {
        &self.hess[j]
    }

    /// Per-column invariant-subspace flags.
    pub fn invariant(&self) -> &[bool] {
        &self.invariant
    }

    pub fn all_invariant(&self) -> bool {
        self.invariant.iter().all(|&f| f)
    }

    /// One Arnoldi step. Returns the indices of columns that hit an
    /// invariant subspace during this step (happy breakdown).
    pub fn advance(&mut self) -> Vec<usize> {
        let j = self.basis.len() - 1;

        let mut w = block::zeros(self.n, self.k);
        self.a.apply(&self.basis[j], &mut w);
        if let Some(m) = self.m {
            let aw = w;
            let mut mw = block::zeros(self.n, self.k);
            m.apply(&aw, &mut mw);
            w = mw;
        }

        let mut h = block::zeros(j + 2, self.k);
        // Modified Gram-Schmidt, then a second pass (iterative refinement).
        for _pass in 0..2 {
            for i in 0..=j {
                let d = self.ip.dots(&self.basis[i], &w);
                let neg: Vec<T> = d.iter().map(|&t| -t).collect();
                block::axpy(&mut w, &neg, &self.basis[i]);
                for c in 0..self.k {
                    h[(i, c)] = h[(i, c)] + d[c];
                }
            }
        }

        let norms = self.ip.norms(&w);
        let mut newly_invariant = Vec::new();
        let mut scale = vec![T::zero(); self.k];
        for c in 0..self.k {
            h[(j + 1, c)] = norms[c];
            if self.invariant[c] {
                // column is exhausted; its basis stays zero
            } else if norms[c] < self.breakdown_tol {
                self.invariant[c] = true;
                newly_invariant.push(c);
            } else {
                scale[c] = T::one() / norms[c];
            }
        }
        block::scale_columns(&mut w, &scale);
        self.basis.push(w);
        self.hess.push(h);
        newly_invariant
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wrappers::EuclideanInner;

    fn spd4() -> Mat<f64> {
        let rows = [
            [4.0, 1.0, 0.0, 0.0],
            [1.0, 3.0, 1.0, 0.0],
            [0.0, 1.0, 2.0, 1.0],
            [0.0, 0.0, 1.0, 3.0],
        ];
        Mat::from_fn(4, 4, |i, j| rows[i][j])
    }

    #[test]
    fn basis_is_orthonormal() {
        let a = spd4();
        let ip = EuclideanInner;
        let r0 = Mat::from_fn(4, 1, |i, _| (i + 1) as f64);
        let (mut arnoldi, _) = Arnoldi::new(&a, None, &ip, &r0, 1e-14);
        for _ in 0..3 {
            arnoldi.advance();
        }
        // <v_i, v_j> = delta_ij for every pair of basis blocks
        for i in 0..arnoldi.basis().len() {
            for j in 0..arnoldi.basis().len() {
                let g = ip.gram(&arnoldi.basis()[i], &arnoldi.basis()[j]);
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (g[(0, 0)] - expected).abs() < 1e-10,
                    "gram({i},{j}) = {}",
                    g[(0, 0)]
                );
            }
        }
    }

    #[test]
    fn hessenberg_projection_identity_holds() {
        // A v_j = sum_i h[i][j] v_i  (up to the (j+1)-st basis vector)
        let a = spd4();
        let ip = EuclideanInner;
        let r0 = Mat::from_fn(4, 1, |i, _| if i == 0 { 1.0 } else { 0.5 });
        let (mut arnoldi, _) = Arnoldi::new(&a, None, &ip, &r0, 1e-14);
        for _ in 0..3 {
            arnoldi.advance();
        }
        for j in 0..3 {
            let mut av = block::zeros(4, 1);
            Operator::apply(&a, &arnoldi.basis()[j], &mut av);
            let h = arnoldi.hess_column(j);
            for i in 0..=j + 1 {
                for row in 0..4 {
                    av[(row, 0)] -= h[(i, 0)] * arnoldi.basis()[i][(row, 0)];
                }
            }
            let leftover = ip.norms(&av)[0];
            assert!(leftover < 1e-10, "residual of column {j}: {leftover}");
        }
    }

    #[test]
    fn eigenvector_seed_is_invariant_after_one_step() {
        // diag(2, 5) with seed e0: K_1 is already invariant
        let a = Mat::from_fn(2, 2, |i, j| if i == j { (3 * i + 2) as f64 } else { 0.0 });
        let ip = EuclideanInner;
        let r0 = Mat::from_fn(2, 1, |i, _| if i == 0 { 1.0 } else { 0.0 });
        let (mut arnoldi, _) = Arnoldi::new(&a, None, &ip, &r0, 1e-14);
        let newly = arnoldi.advance();
        assert_eq!(newly, vec![0]);
        assert!(arnoldi.all_invariant());
        // the subdiagonal coefficient is (numerically) zero
        assert!(arnoldi.hess_column(0)[(1, 0)] < 1e-14);
    }

    #[test]
    fn columns_go_invariant_independently() {
        // column 0 seeds with an eigenvector, column 1 with a mixed vector
        let a = Mat::from_fn(3, 3, |i, j| if i == j { (i + 1) as f64 } else { 0.0 });
        let ip = EuclideanInner;
        let r0 = Mat::from_fn(3, 2, |i, c| {
            if c == 0 {
                if i == 1 { 1.0 } else { 0.0 }
            } else {
                1.0
            }
        });
        let (mut arnoldi, _) = Arnoldi::new(&a, None, &ip, &r0, 1e-14);
        let newly = arnoldi.advance();
        assert_eq!(newly, vec![0]);
        assert_eq!(arnoldi.invariant(), &[true, false]);
    }
}

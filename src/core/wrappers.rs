//! Adapters implementing the operator and inner-product contracts.
//!
//! This module provides `Operator` implementations for `faer::Mat` (dense),
//! `FnOperator` (closure-wrapped, the matrix-free entry point for sparse or
//! user-defined formats) and `DiagonalOperator`, plus the Euclidean and
//! weighted inner products. Per-column inner-product reductions are
//! parallelized across the k right-hand-side columns when the `rayon`
//! feature is enabled; this is the only concurrency in the crate, and it
//! stays inside one iteration.

use faer::{Mat, MatRef};
use num_traits::Float;

use crate::core::block;
use crate::core::traits::{InnerProduct, Operator};

/// Dense operator: a faer matrix applied column by column.
impl<T: Float> Operator<T> for Mat<T> {
    fn nrows(&self) -> usize {
        Mat::nrows(self)
    }
    fn ncols(&self) -> usize {
        Mat::ncols(self)
    }
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>) {
        assert_eq!(Mat::ncols(self), x.nrows(), "input block has incorrect row count");
        assert_eq!(Mat::nrows(self), y.nrows(), "output block has incorrect row count");
        assert_eq!(x.ncols(), y.ncols(), "input and output blocks have mismatched column counts");
        for c in 0..x.ncols() {
            for i in 0..Mat::nrows(self) {
                let mut acc = T::zero();
                for j in 0..Mat::ncols(self) {
                    acc = acc + self[(i, j)] * x[(j, c)];
                }
                y[(i, c)] = acc;
            }
        }
    }
}

impl<'a, T: Float> Operator<T> for MatRef<'a, T> {
    fn nrows(&self) -> usize {
        (*self).nrows()
    }
    fn ncols(&self) -> usize {
        (*self).ncols()
    }
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>) {
        let (nr, nc) = ((*self).nrows(), (*self).ncols());
        assert_eq!(nc, x.nrows(), "input block has incorrect row count");
        assert_eq!(nr, y.nrows(), "output block has incorrect row count");
        for c in 0..x.ncols() {
            for i in 0..nr {
                let mut acc = T::zero();
                for j in 0..nc {
                    acc = acc + self[(i, j)] * x[(j, c)];
                }
                y[(i, c)] = acc;
            }
        }
    }
}

/// Matrix-free operator wrapping a closure `f(x, y)` that writes y = A x.
///
/// The shape must be declared up front; the closure is trusted to be linear.
pub struct FnOperator<F> {
    nrows: usize,
    ncols: usize,
    f: F,
}

impl<F> FnOperator<F> {
    pub fn new(nrows: usize, ncols: usize, f: F) -> Self {
        Self { nrows, ncols, f }
    }
}

impl<T, F> Operator<T> for FnOperator<F>
where
    F: Fn(&Mat<T>, &mut Mat<T>),
{
    fn nrows(&self) -> usize {
        self.nrows
    }
    fn ncols(&self) -> usize {
        self.ncols
    }
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>) {
        (self.f)(x, y)
    }
}

/// Diagonal operator y = diag(d) x; the cheapest useful preconditioner.
pub struct DiagonalOperator<T> {
    diag: Vec<T>,
}

impl<T: Float> DiagonalOperator<T> {
    pub fn new(diag: Vec<T>) -> Self {
        Self { diag }
    }

    /// Jacobi-style preconditioner 1/diag(A) from an explicit matrix.
    pub fn inverse_diagonal_of(a: &Mat<T>) -> Self {
        Self {
            diag: (0..Mat::nrows(a)).map(|i| T::one() / a[(i, i)]).collect(),
        }
    }
}

impl<T: Float> Operator<T> for DiagonalOperator<T> {
    fn nrows(&self) -> usize {
        self.diag.len()
    }
    fn ncols(&self) -> usize {
        self.diag.len()
    }
    fn apply(&self, x: &Mat<T>, y: &mut Mat<T>) {
        for c in 0..x.ncols() {
            for i in 0..x.nrows() {
                y[(i, c)] = self.diag[i] * x[(i, c)];
            }
        }
    }
}

fn column_dot<T: Float>(x: &Mat<T>, y: &Mat<T>, c: usize) -> T {
    let mut acc = T::zero();
    for i in 0..x.nrows() {
        acc = acc + x[(i, c)] * y[(i, c)];
    }
    acc
}

/// The standard Euclidean inner product, <x, y> = xᵀy per column.
#[derive(Clone, Copy, Debug, Default)]
pub struct EuclideanInner;

impl<T: Float + Send + Sync> InnerProduct<T> for EuclideanInner {
    fn dots(&self, x: &Mat<T>, y: &Mat<T>) -> Vec<T> {
        assert_eq!(x.nrows(), y.nrows(), "blocks must have the same row count");
        assert_eq!(x.ncols(), y.ncols(), "blocks must have the same column count");
        #[cfg(feature = "rayon")]
        {
            use rayon::prelude::*;
            (0..x.ncols())
                .into_par_iter()
                .map(|c| column_dot(x, y, c))
                .collect()
        }
        #[cfg(not(feature = "rayon"))]
        {
            (0..x.ncols()).map(|c| column_dot(x, y, c)).collect()
        }
    }

    fn gram(&self, x: &Mat<T>, y: &Mat<T>) -> Mat<T> {
        assert_eq!(x.nrows(), y.nrows(), "blocks must have the same row count");
        Mat::from_fn(x.ncols(), y.ncols(), |i, j| {
            let mut acc = T::zero();
            for r in 0..x.nrows() {
                acc = acc + x[(r, i)] * y[(r, j)];
            }
            acc
        })
    }
}

/// Weighted inner product <x, y>_B = xᵀ B y for a symmetric positive-definite
/// operator B. Each evaluation costs one application of B.
pub struct WeightedInner<B> {
    weight: B,
}

impl<B> WeightedInner<B> {
    pub fn new(weight: B) -> Self {
        Self { weight }
    }
}

impl<T, B> InnerProduct<T> for WeightedInner<B>
where
    T: Float + Send + Sync,
    B: Operator<T>,
{
    fn dots(&self, x: &Mat<T>, y: &Mat<T>) -> Vec<T> {
        let mut by = block::zeros(y.nrows(), y.ncols());
        self.weight.apply(y, &mut by);
        EuclideanInner.dots(x, &by)
    }

    fn gram(&self, x: &Mat<T>, y: &Mat<T>) -> Mat<T> {
        let mut by = block::zeros(y.nrows(), y.ncols());
        self.weight.apply(y, &mut by);
        EuclideanInner.gram(x, &by)
    }
}

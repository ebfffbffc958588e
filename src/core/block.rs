//! Column-wise kernels over n×k blocks.
//!
//! The solvers run k independent recurrences in lockstep, so every scalar
//! update of the textbook algorithms becomes a per-column update here.

use faer::Mat;
use num_traits::Float;

use crate::core::traits::Operator;

/// An n×k block of zeros.
pub fn zeros<T: Float>(nrows: usize, ncols: usize) -> Mat<T> {
    Mat::from_fn(nrows, ncols, |_, _| T::zero())
}

/// Residual block r = b − A x (one operator application).
pub fn residual<T: Float>(a: &dyn Operator<T>, b: &Mat<T>, x: &Mat<T>) -> Mat<T> {
    let mut ax = zeros(b.nrows(), b.ncols());
    a.apply(x, &mut ax);
    Mat::from_fn(b.nrows(), b.ncols(), |i, c| b[(i, c)] - ax[(i, c)])
}

/// y[:,c] += alpha[c] · x[:,c] for every column.
pub fn axpy<T: Float>(y: &mut Mat<T>, alpha: &[T], x: &Mat<T>) {
    for c in 0..y.ncols() {
        for i in 0..y.nrows() {
            y[(i, c)] = y[(i, c)] + alpha[c] * x[(i, c)];
        }
    }
}

/// x[:,c] *= s[c] for every column.
pub fn scale_columns<T: Float>(x: &mut Mat<T>, s: &[T]) {
    for c in 0..x.ncols() {
        for i in 0..x.nrows() {
            x[(i, c)] = x[(i, c)] * s[c];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axpy_updates_each_column_independently() {
        let mut y = zeros::<f64>(3, 2);
        let x = Mat::from_fn(3, 2, |i, c| (i + c) as f64);
        axpy(&mut y, &[2.0, -1.0], &x);
        for i in 0..3 {
            assert_eq!(y[(i, 0)], 2.0 * i as f64);
            assert_eq!(y[(i, 1)], -((i + 1) as f64));
        }
    }

    #[test]
    fn residual_is_b_minus_ax() {
        // A = diag(2, 3), x = [1, 1], b = [5, 5] => r = [3, 2]
        let a = Mat::from_fn(2, 2, |i, j| if i == j { (i + 2) as f64 } else { 0.0 });
        let x = Mat::from_fn(2, 1, |_, _| 1.0);
        let b = Mat::from_fn(2, 1, |_, _| 5.0);
        let r = residual(&a as &dyn Operator<f64>, &b, &x);
        assert_eq!(r[(0, 0)], 3.0);
        assert_eq!(r[(1, 0)], 2.0);
    }
}

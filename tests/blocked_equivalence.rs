//! Blocked solves vs independent single-column solves.
//!
//! The k columns of a block are k independent systems advanced in lockstep,
//! so a blocked solve must reproduce the per-column results of separate
//! calls (within floating tolerance), for every solver and also under a
//! non-Euclidean inner product.

use approx::assert_abs_diff_eq;
use faer::Mat;
use krylos::core::block;
use krylos::{
    CgSolver, EuclideanInner, GmresSolver, InnerProduct, LinearSolver, MinresSolver, Operator,
    WeightedInner,
};

fn spd6() -> Mat<f64> {
    // diagonally dominant, symmetric positive-definite
    Mat::from_fn(6, 6, |i, j| {
        if i == j {
            6.0 + i as f64
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        }
    })
}

fn nonsym6() -> Mat<f64> {
    Mat::from_fn(6, 6, |i, j| {
        if i == j {
            5.0
        } else if j == i + 1 {
            -2.0
        } else if i == j + 1 {
            1.0
        } else {
            0.0
        }
    })
}

fn rhs_block() -> Mat<f64> {
    Mat::from_fn(6, 3, |i, c| ((i + 1) as f64) * ((c + 1) as f64) - 3.0 * (c as f64))
}

fn column(b: &Mat<f64>, c: usize) -> Mat<f64> {
    Mat::from_fn(b.nrows(), 1, |i, _| b[(i, c)])
}

fn assert_blocked_matches_single<S, F>(a: &Mat<f64>, make: F)
where
    S: LinearSolver<f64>,
    F: Fn() -> S,
{
    let b = rhs_block();
    let mut x_blocked = block::zeros(6, 3);
    let stats = make()
        .solve(a as &dyn Operator<f64>, None, &b, &mut x_blocked)
        .unwrap();
    assert!(stats.converged);
    assert_eq!(stats.final_residual.len(), 3);

    for c in 0..3 {
        let bc = column(&b, c);
        let mut xc = block::zeros(6, 1);
        let single = make()
            .solve(a as &dyn Operator<f64>, None, &bc, &mut xc)
            .unwrap();
        assert!(single.converged);
        for i in 0..6 {
            assert_abs_diff_eq!(x_blocked[(i, c)], xc[(i, 0)], epsilon = 1e-6);
        }
    }
}

#[test]
fn blocked_cg_matches_three_single_solves() {
    assert_blocked_matches_single(&spd6(), || CgSolver::new(1e-10, 0.0, 200));
}

#[test]
fn blocked_minres_matches_three_single_solves() {
    assert_blocked_matches_single(&spd6(), || MinresSolver::new(1e-10, 0.0, 200));
}

#[test]
fn blocked_gmres_matches_three_single_solves() {
    assert_blocked_matches_single(&nonsym6(), || GmresSolver::new(1e-10, 0.0, 200));
}

#[test]
fn blocked_restarted_gmres_matches_three_single_solves() {
    assert_blocked_matches_single(&nonsym6(), || {
        GmresSolver::new(1e-10, 0.0, 200).with_restart(3)
    });
}

#[test]
fn columns_converge_at_different_rates_without_interference() {
    // column 0 starts at the exact solution; column 1 starts far away
    let a = spd6();
    let x_true = Mat::from_fn(6, 2, |i, c| (i + c + 1) as f64);
    let mut b = block::zeros(6, 2);
    Operator::apply(&a, &x_true, &mut b);
    let mut x = Mat::from_fn(6, 2, |i, c| if c == 0 { x_true[(i, 0)] } else { 0.0 });
    let stats = CgSolver::new(1e-10, 0.0, 200)
        .solve(&a, None, &b, &mut x)
        .unwrap();
    assert!(stats.converged);
    for c in 0..2 {
        for i in 0..6 {
            assert_abs_diff_eq!(x[(i, c)], x_true[(i, c)], epsilon = 1e-6);
        }
    }
    // the history records per-column norms every iteration
    for entry in &stats.residual_history {
        assert_eq!(entry.len(), 2);
    }
}

#[test]
fn gram_diagonal_matches_per_column_dots() {
    let x = Mat::from_fn(5, 3, |i, c| ((2 * i + 3 * c) as f64).sin());
    let y = Mat::from_fn(5, 3, |i, c| ((i * c) as f64).cos());
    let ip = EuclideanInner;
    let dots = ip.dots(&x, &y);
    let gram = ip.gram(&x, &y);
    for c in 0..3 {
        assert_abs_diff_eq!(dots[c], gram[(c, c)], epsilon = 1e-12);
    }
}

#[test]
fn weighted_gram_is_consistent_with_weighted_dots() {
    let w = krylos::DiagonalOperator::new(vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    let ip = WeightedInner::new(w);
    let x = Mat::from_fn(5, 2, |i, c| (i as f64) - (c as f64) * 0.5);
    let dots = ip.dots(&x, &x);
    let gram = ip.gram(&x, &x);
    for c in 0..2 {
        assert_abs_diff_eq!(dots[c], gram[(c, c)], epsilon = 1e-12);
        assert!(dots[c] >= 0.0);
    }
    // symmetry of the Gram block
    assert_abs_diff_eq!(gram[(0, 1)], gram[(1, 0)], epsilon = 1e-12);
}

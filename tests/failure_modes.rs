//! The failure contract: typed validation, convergence and breakdown
//! errors, best-effort iterates, and resumability from a partial solution.

use approx::assert_abs_diff_eq;
use faer::Mat;
use krylos::core::block;
use krylos::{BreakdownReason, CgSolver, Error, GmresSolver, LinearSolver, MinresSolver};

fn laplacian(n: usize) -> Mat<f64> {
    Mat::from_fn(n, n, |i, j| {
        if i == j {
            2.0
        } else if i.abs_diff(j) == 1 {
            -1.0
        } else {
            0.0
        }
    })
}

#[test]
fn non_square_operator_is_rejected() {
    let a = Mat::from_fn(3, 2, |_, _| 1.0);
    let b = block::zeros(3, 1);
    let mut x = block::zeros(3, 1);
    match CgSolver::new(1e-5, 0.0, 10).solve(&a, None, &b, &mut x) {
        Err(Error::Validation(msg)) => assert!(msg.contains("not square")),
        other => panic!("expected ValidationError, got {other:?}"),
    }
}

#[test]
fn mismatched_rhs_rows_are_rejected() {
    let a = Mat::from_fn(3, 3, |i, j| if i == j { 1.0 } else { 0.0 });
    let b = block::zeros(4, 1);
    let mut x = block::zeros(4, 1);
    assert!(matches!(
        GmresSolver::new(1e-5, 0.0, 10).solve(&a, None, &b, &mut x),
        Err(Error::Validation(_))
    ));
}

#[test]
fn mismatched_guess_shape_is_rejected() {
    let a = Mat::from_fn(3, 3, |i, j| if i == j { 1.0 } else { 0.0 });
    let b = block::zeros(3, 2);
    let mut x = block::zeros(3, 1);
    assert!(matches!(
        MinresSolver::new(1e-5, 0.0, 10).solve(&a, None, &b, &mut x),
        Err(Error::Validation(_))
    ));
}

#[test]
fn mismatched_preconditioner_is_rejected() {
    let a = Mat::from_fn(3, 3, |i, j| if i == j { 1.0 } else { 0.0 });
    let m = Mat::from_fn(2, 2, |i, j| if i == j { 1.0 } else { 0.0 });
    let b = block::zeros(3, 1);
    let mut x = block::zeros(3, 1);
    assert!(matches!(
        CgSolver::new(1e-5, 0.0, 10).solve(&a, Some(&m), &b, &mut x),
        Err(Error::Validation(_))
    ));
}

#[test]
fn cg_breaks_down_where_minres_converges() {
    // symmetric indefinite: eigenvalues 2 and -3
    let a = Mat::from_fn(2, 2, |i, j| match (i, j) {
        (0, 0) => 2.0,
        (1, 1) => -3.0,
        _ => 0.0,
    });
    let b = Mat::from_fn(2, 1, |_, _| 1.0);

    let mut x_cg = block::zeros(2, 1);
    match CgSolver::new(1e-10, 0.0, 50).solve(&a, None, &b, &mut x_cg) {
        Err(Error::Breakdown { reason, .. }) => {
            assert_eq!(reason, BreakdownReason::IndefiniteOperator);
        }
        other => panic!("expected BreakdownError from CG, got {other:?}"),
    }

    let mut x_minres = block::zeros(2, 1);
    let stats = MinresSolver::new(1e-10, 0.0, 50)
        .solve(&a, None, &b, &mut x_minres)
        .unwrap();
    assert!(stats.converged);
    assert_abs_diff_eq!(x_minres[(0, 0)], 0.5, epsilon = 1e-8);
    assert_abs_diff_eq!(x_minres[(1, 0)], -1.0 / 3.0, epsilon = 1e-8);
}

#[test]
fn convergence_error_carries_the_full_diagnostics_payload() {
    let n = 50;
    let a = laplacian(n);
    let b = Mat::from_fn(n, 1, |_, _| 1.0);
    let mut x = block::zeros(n, 1);
    let err = CgSolver::new(1e-12, 0.0, 3)
        .solve(&a, None, &b, &mut x)
        .unwrap_err();
    match &err {
        Error::Convergence { maxiter, residual, stats } => {
            assert_eq!(*maxiter, 3);
            assert!(residual[0] > 0.0);
            assert_eq!(stats.iterations, 3);
            // the monitor appended every iteration even though the solve failed
            assert_eq!(stats.residual_history.len(), 4);
            assert!(!stats.converged);
        }
        other => panic!("expected ConvergenceError, got {other:?}"),
    }
    assert!(err.stats().is_some());
}

#[test]
fn partial_solution_can_be_resumed_with_a_larger_cap() {
    let n = 50;
    let a = laplacian(n);
    let b = Mat::from_fn(n, 1, |i, _| ((i % 5) as f64) - 2.0);
    let mut x = block::zeros(n, 1);

    // the failed solve leaves its best iterate in x...
    let err = CgSolver::new(1e-10, 0.0, 5).solve(&a, None, &b, &mut x);
    assert!(matches!(err, Err(Error::Convergence { .. })));
    let written = (0..n).any(|i| x[(i, 0)] != 0.0);
    assert!(written, "partial iterate should be written back");

    // ...which warm-starts a second attempt
    let stats = CgSolver::new(1e-10, 0.0, 1000)
        .solve(&a, None, &b, &mut x)
        .unwrap();
    assert!(stats.converged);
}

#[test]
fn converged_solutions_are_idempotent_starting_points() {
    let a = Mat::from_fn(4, 4, |i, j| {
        [
            [4.0, 1.0, 0.0, 0.0],
            [1.0, 3.0, 1.0, 0.0],
            [0.0, 1.0, 2.0, 1.0],
            [0.0, 0.0, 1.0, 3.0],
        ][i][j]
    });
    let b = Mat::from_fn(4, 1, |i, _| (i + 1) as f64);

    let mut x_cg = block::zeros(4, 1);
    CgSolver::new(1e-10, 0.0, 100)
        .solve(&a, None, &b, &mut x_cg)
        .unwrap();
    let again = CgSolver::new(1e-10, 0.0, 100)
        .solve(&a, None, &b, &mut x_cg.clone())
        .unwrap();
    assert!(again.iterations <= 1);

    let mut x_minres = block::zeros(4, 1);
    MinresSolver::new(1e-10, 0.0, 100)
        .solve(&a, None, &b, &mut x_minres)
        .unwrap();
    let again = MinresSolver::new(1e-10, 0.0, 100)
        .solve(&a, None, &b, &mut x_minres.clone())
        .unwrap();
    assert!(again.iterations <= 1);

    let mut x_gmres = block::zeros(4, 1);
    GmresSolver::new(1e-10, 0.0, 100)
        .solve(&a, None, &b, &mut x_gmres)
        .unwrap();
    let again = GmresSolver::new(1e-10, 0.0, 100)
        .solve(&a, None, &b, &mut x_gmres.clone())
        .unwrap();
    assert!(again.iterations <= 1);
}

#[test]
fn breakdown_threshold_is_tunable() {
    // with an absurdly large threshold the very first Lanczos coefficient is
    // declared invariant; the explicit residual check exposes the stall
    let a = laplacian(8);
    let b = Mat::from_fn(8, 1, |_, _| 1.0);
    let mut x = block::zeros(8, 1);
    let result = MinresSolver::new(1e-10, 0.0, 50)
        .with_breakdown_tol(1e3)
        .solve(&a, None, &b, &mut x);
    assert!(result.is_err());

    // with the default threshold the same system converges
    let mut x = block::zeros(8, 1);
    let stats = MinresSolver::new(1e-10, 0.0, 50)
        .solve(&a, None, &b, &mut x)
        .unwrap();
    assert!(stats.converged);
}

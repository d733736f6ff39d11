//! Integration tests for the bounded L-BFGS solver.
//!
//! Purpose
//! -------
//! - Check the public `minimize_bounded` entry point end to end: box
//!   reparameterization, argmin-backed L-BFGS with a More-Thuente line
//!   search, and the bounded result.
//! - Check the reparameterization laws the solver relies on.
//!
//! Coverage
//! --------
//! - `optimization::bounded_optimizer`:
//!   - Convergence on a strictly convex quadratic with an interior minimum.
//!   - Box invariant of `x_hat` for arbitrary boxes and start points.
//!   - Fatal handling of malformed bounds.
//!   - Termination of the line search on a badly scaled objective.
//! - `optimization::numerical_stability`:
//!   - `inv_transform(transform(x)) ≈ x` inside open boxes.
//!   - Finite transforms at and next to the bounds.
//!
//! Exclusions
//! ----------
//! - Recovery from mid-run non-finite gradients, option validation and the
//!   argmin adapter wiring are covered by unit tests.
use ndarray::{Array1, array};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use rust_tractography::optimization::{
    bounded_optimizer::{FnObjective, SolverOptions, Tolerances, minimize_bounded},
    errors::OptError,
    numerical_stability::transformations::{inv_transform, transform},
};

/// `Σ a_i (x_i - c_i)²` and its gradient.
fn quadratic(
    a: Array1<f64>, c: Array1<f64>,
) -> FnObjective<impl Fn(&Array1<f64>) -> (f64, Array1<f64>)> {
    FnObjective::new(move |x: &Array1<f64>| {
        let d = x - &c;
        let value = (&a * &d * &d).sum();
        let grad = 2.0 * &a * &d;
        (value, grad)
    })
}

#[test]
// Purpose
// -------
// The solver reaches the analytic minimum of a strictly convex quadratic
// lying inside the box.
//
// Given
// -----
// - f(x) = Σ a_i (x_i - c_i)² with a = (1, 10, 0.1, 3), c inside
//   [0, 5]⁴ but away from the start.
// - Default options (tol_grad 1e-12, at most 2000 iterations).
//
// Expect
// ------
// - ‖x_hat - c‖∞ < 1e-6 within the iteration cap.
fn converges_to_interior_minimum() {
    // Arrange
    let c = array![2.0, 0.5, 4.0, 1.25];
    let f = quadratic(array![1.0, 10.0, 0.1, 3.0], c.clone());
    let lb = Array1::zeros(4);
    let ub = Array1::from_elem(4, 5.0);
    let x0 = array![4.0, 4.0, 1.0, 3.0];

    // Act
    let out = minimize_bounded(&f, &x0, &lb, &ub, &SolverOptions::default()).expect("solve");

    // Assert
    let err = (&out.x_hat - &c).iter().fold(0.0f64, |m, v| m.max(v.abs()));
    assert!(err < 1e-6, "max error {err:e}, status {}", out.status);
    assert!(out.iterations <= 2000);
}

#[test]
// Purpose
// -------
// A minimum outside the box is approached from inside and never crossed.
//
// Given
// -----
// - f(x) = (x - 10)² on [0, 1].
//
// Expect
// ------
// - x_hat within 1e-3 of the upper bound and not above it.
fn minimum_outside_box_stays_inside() {
    let f = quadratic(array![1.0], array![10.0]);

    let out = minimize_bounded(&f, &array![0.5], &array![0.0], &array![1.0], &SolverOptions::default())
        .expect("solve");

    assert!(out.x_hat[0] <= 1.0);
    assert!(out.x_hat[0] > 1.0 - 1e-3, "x_hat = {}", out.x_hat[0]);
}

#[test]
// Purpose
// -------
// Malformed boxes are precondition violations, reported before any
// iteration.
//
// Given
// -----
// - Bounds of mismatched length; an inverted interval.
//
// Expect
// ------
// - Errors whose `is_precondition()` holds.
fn malformed_bounds_are_fatal() {
    let f = quadratic(array![1.0, 1.0], array![0.0, 0.0]);
    let opts = SolverOptions::default();

    let mismatched = minimize_bounded(&f, &array![0.5, 0.5], &array![0.0], &array![1.0, 1.0], &opts);
    let inverted = minimize_bounded(&f, &array![0.5, 0.5], &array![0.0, 2.0], &array![1.0, 1.0], &opts);

    let mismatched: OptError = mismatched.expect_err("length mismatch must fail");
    let inverted: OptError = inverted.expect_err("lb >= ub must fail");
    assert!(mismatched.is_precondition());
    assert!(inverted.is_precondition());
}

#[test]
// Purpose
// -------
// Line searches terminate on a badly scaled objective: the solve returns
// within the iteration cap instead of stalling inside a step search.
//
// Given
// -----
// - f(x) = 1e8 (x0 - 1)² + 1e-4 (x1 - 2)² on [-10, 10]², start (9, -9).
// - 50 outer iterations.
//
// Expect
// ------
// - `Ok` with at most 50 iterations, x_hat inside the box, and the
//   stiff coordinate within 1e-2 of its minimizer.
fn line_search_terminates_on_badly_scaled_objective() {
    // Arrange
    let f = quadratic(array![1.0e8, 1.0e-4], array![1.0, 2.0]);
    let tols = Tolerances::new(Some(1e-12), None, Some(50)).expect("tolerances");
    let opts = SolverOptions { tols, ..SolverOptions::default() };
    let (lb, ub) = (Array1::from_elem(2, -10.0), Array1::from_elem(2, 10.0));

    // Act
    let out = minimize_bounded(&f, &array![9.0, -9.0], &lb, &ub, &opts).expect("solve");

    // Assert
    assert!(out.iterations <= 50, "iterations {}", out.iterations);
    assert!(out.x_hat.iter().all(|v| (-10.0..=10.0).contains(v)));
    assert!((out.x_hat[0] - 1.0).abs() < 1e-2, "x_hat = {}", out.x_hat);
}

/// Box with `lb < ub` and a start point inside it, per coordinate.
fn box_and_start() -> impl Strategy<Value = (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>)> {
    (1usize..5).prop_flat_map(|n| {
        (
            prop::collection::vec((-100.0f64..100.0, 0.01f64..50.0, 0.0f64..=1.0), n),
            prop::collection::vec(-200.0f64..200.0, n),
        )
            .prop_map(|(boxes, centers)| {
                let lb: Vec<f64> = boxes.iter().map(|b| b.0).collect();
                let ub: Vec<f64> = boxes.iter().map(|b| b.0 + b.1).collect();
                let x0: Vec<f64> = boxes.iter().map(|b| b.0 + b.2 * b.1).collect();
                (lb, ub, x0, centers)
            })
    })
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

    #[test]
    fn solution_always_lies_inside_the_box((lb, ub, x0, centers) in box_and_start()) {
        let n = lb.len();
        let f = quadratic(Array1::ones(n), Array1::from(centers));
        let (lb, ub, x0) = (Array1::from(lb), Array1::from(ub), Array1::from(x0));

        let out = minimize_bounded(&f, &x0, &lb, &ub, &SolverOptions::default());

        let out = out.map_err(|e| TestCaseError::fail(format!("solve failed: {e}")))?;
        for i in 0..n {
            prop_assert!(out.x_hat[i] >= lb[i] && out.x_hat[i] <= ub[i],
                "x_hat[{i}] = {} outside [{}, {}]", out.x_hat[i], lb[i], ub[i]);
        }
    }

    #[test]
    fn transform_round_trips_inside_open_box(
        lb in -1.0e3f64..1.0e3,
        width in 1.0e-2f64..1.0e3,
        t in 0.001f64..0.999,
    ) {
        let ub = lb + width;
        let x = lb + t * width;

        let back = inv_transform(transform(x, lb, ub), lb, ub);

        prop_assert!((back - x).abs() <= 1e-9 * width.max(1.0), "x = {x}, back = {back}");
    }

    #[test]
    fn transform_is_finite_at_and_near_bounds(
        lb in -1.0e3f64..1.0e3,
        width in 1.0e-2f64..1.0e3,
    ) {
        let ub = lb + width;
        for x in [lb, ub, lb + f64::EPSILON * width, ub - f64::EPSILON * width] {
            let z = transform(x, lb, ub);
            prop_assert!(z.is_finite(), "transform({x}) = {z}");
            let back = inv_transform(z, lb, ub);
            prop_assert!(back.is_finite() && back >= lb && back <= ub);
        }
    }
}

//! High-level entry point for minimizing an [`Objective`] over a box.
//!
//! The box is removed by the logit reparameterization of
//! `numerical_stability`, L-BFGS with a More–Thuente line search runs in the
//! unconstrained space, and the result is mapped back. Numerical failures
//! after the first finite evaluation do not fail the call: the best finite
//! iterate is returned with `recovered = true`.
use crate::optimization::{
    bounded_optimizer::{
        SolveOutcome, Theta,
        adapter::{BoxAdapter, IterateTracker},
        builders::build_optimizer_more_thuente,
        run::run_lbfgs,
        traits::{Objective, SolverOptions},
        validation::validate_bounds,
    },
    errors::OptResult,
    numerical_stability::to_unconstrained,
};

/// Minimize `f` over `[lb, ub]` starting from `x0`.
///
/// # Behavior
/// - Validates the box (`validate_bounds`) and the start point (`f.check`).
/// - Maps `x0` into unconstrained space (`x0` is clamped into the box first).
/// - Builds L-BFGS + More–Thuente from `opts` and runs it.
/// - On a numerical failure mid-run, logs a warning and returns the best
///   finite iterate seen so far.
///
/// # Parameters
/// - `f`: objective implementing [`Objective`].
/// - `x0`: start point, same length as the bounds.
/// - `lb`, `ub`: finite box with `lb < ub` elementwise.
/// - `opts`: solver options.
///
/// # Errors
/// - Precondition violations (`BoundsDimMismatch`, `InvertedBounds`,
///   non-finite bounds or start, invalid options) are always returned.
/// - Numerical failures are returned only if no finite point was ever
///   evaluated (e.g. the objective is non-finite at `x0`).
///
/// # Returns
/// A [`SolveOutcome`] with `x_hat ∈ [lb, ub]`.
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use rust_tractography::optimization::bounded_optimizer::{
///     FnObjective, SolverOptions, minimize_bounded,
/// };
///
/// let f = FnObjective::new(|x: &ndarray::Array1<f64>| {
///     ((x[0] - 2.0).powi(2), array![2.0 * (x[0] - 2.0)])
/// });
/// let out = minimize_bounded(&f, &array![0.5], &array![0.0], &array![5.0], &SolverOptions::default())
///     .unwrap();
/// assert!((out.x_hat[0] - 2.0).abs() < 1e-6);
/// ```
pub fn minimize_bounded<F: Objective>(
    f: &F, x0: &Theta, lb: &Theta, ub: &Theta, opts: &SolverOptions,
) -> OptResult<SolveOutcome> {
    validate_bounds(x0, lb, ub)?;
    f.check(x0)?;
    let z0 = to_unconstrained(x0, lb, ub);
    let solver = build_optimizer_more_thuente(opts)?;
    let tracker = IterateTracker::new();
    let problem = BoxAdapter::new(f, lb, ub, &tracker);
    match run_lbfgs(z0, opts, problem, solver) {
        Ok(outcome) => Ok(outcome),
        Err(err) if err.is_precondition() => Err(err),
        Err(err) => match tracker.take() {
            Some((value, x_best)) => {
                log::warn!("bounded solve stopped on a numerical failure ({err}); using last finite iterate");
                Ok(SolveOutcome::recovered(x_best, value, &err))
            }
            None => Err(err),
        },
    }
}

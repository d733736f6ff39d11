//! Executor wiring for a configured L-BFGS solver.
//!
//! `run_lbfgs` seeds the argmin executor with the unconstrained start point,
//! applies the iteration cap, optionally attaches the slog observer, runs,
//! and maps the final state back into the box.
use crate::optimization::{
    bounded_optimizer::{
        Grad, Objective, SolveOutcome, SolverOptions, Theta, adapter::BoxAdapter,
    },
    errors::OptResult,
    numerical_stability::to_bounded,
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run `solver` on `problem` from the unconstrained start `z0`.
///
/// # Returns
/// A [`SolveOutcome`] whose `x_hat` is the best parameter mapped back into
/// `[lb, ub]`.
///
/// # Errors
/// Propagates executor errors (including adapter errors raised during
/// cost/gradient evaluation) as `OptError`.
pub fn run_lbfgs<'a, F, S>(
    z0: Theta, opts: &SolverOptions, problem: BoxAdapter<'a, F>, solver: S,
) -> OptResult<SolveOutcome>
where
    F: Objective,
    S: argmin::core::Solver<
            BoxAdapter<'a, F>,
            argmin::core::IterState<Theta, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&z0, &problem)?;
    }
    let (lb, ub) = (problem.lb, problem.ub);
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(z0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    let x_hat = result.take_best_param().map(|z| to_bounded(&z, lb, ub));
    SolveOutcome::new(x_hat, result.get_best_cost(), termination, iterations, function_counts, grad)
}

// ---- Helper Methods ----

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(z0: &Theta, problem: &BoxAdapter<'_, F>) -> OptResult<()>
where
    F: Objective,
{
    let f0 = problem.cost(z0)?;
    let g0n = problem.gradient(z0).ok().map(|g| g.l2_norm());

    log::info!(
        "init: f(x0) = {:.6}{}",
        f0,
        g0n.map(|n| format!(", ||grad_z|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}

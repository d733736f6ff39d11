//! Traits and configuration types for the bounded optimizer.
//!
//! - [`Objective`]: what callers implement (value, optional gradient).
//! - [`FnObjective`]: closure-backed objective for ad-hoc problems.
//! - [`Tolerances`], [`WolfeConstants`], [`SolverOptions`]: validated
//!   configuration with the documented defaults.
//! - [`SolveOutcome`]: the normalized result of one solve.
use crate::optimization::{
    bounded_optimizer::{
        Cost, FnEvalMap, Grad, Theta,
        types::DEFAULT_LBFGS_MEM,
        validation::{validate_theta_hat, validate_value, verify_tol_cost, verify_tol_grad},
    },
    errors::{OptError, OptResult},
};
use argmin::core::TerminationStatus;
use argmin_math::ArgminL2Norm;

/// A differentiable objective to be minimized over a box.
///
/// `value` and `grad` are always called with a point inside the caller's
/// bounds. Implementors that cannot provide an analytic gradient leave
/// `grad` at its default; the adapter then differentiates numerically.
pub trait Objective {
    // Required methods
    fn value(&self, x: &Theta) -> OptResult<Cost>;

    // Optional methods
    fn grad(&self, _x: &Theta) -> OptResult<Grad> {
        Err(OptError::GradientNotImplemented)
    }

    /// Pre-flight check on the start point.
    fn check(&self, _x0: &Theta) -> OptResult<()> {
        Ok(())
    }
}

/// Closure-backed objective returning `(value, gradient)` in one call.
pub struct FnObjective<F>
where
    F: Fn(&Theta) -> (Cost, Grad),
{
    f: F,
}

impl<F> FnObjective<F>
where
    F: Fn(&Theta) -> (Cost, Grad),
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> Objective for FnObjective<F>
where
    F: Fn(&Theta) -> (Cost, Grad),
{
    fn value(&self, x: &Theta) -> OptResult<Cost> {
        Ok((self.f)(x).0)
    }

    fn grad(&self, x: &Theta) -> OptResult<Grad> {
        Ok((self.f)(x).1)
    }
}

/// Stopping rules. At least one must be set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    pub tol_grad: Option<f64>,
    pub tol_cost: Option<f64>,
    pub max_iter: Option<usize>,
}

impl Tolerances {
    pub fn new(
        tol_grad: Option<f64>, tol_cost: Option<f64>, max_iter: Option<usize>,
    ) -> OptResult<Self> {
        if tol_grad.is_none() && tol_cost.is_none() && max_iter.is_none() {
            return Err(OptError::NoTolerancesProvided);
        }
        verify_tol_cost(tol_cost)?;
        verify_tol_grad(tol_grad)?;
        if let Some(max_iter) = max_iter {
            if max_iter == 0 {
                return Err(OptError::InvalidMaxIter {
                    max_iter,
                    reason: "Maximum iterations must be greater than zero.",
                });
            }
        }
        Ok(Self { tol_grad, tol_cost, max_iter })
    }
}

impl Default for Tolerances {
    /// Gradient norm 1e-12 and at most 2000 iterations.
    fn default() -> Self {
        Self { tol_grad: Some(1e-12), tol_cost: None, max_iter: Some(2000) }
    }
}

/// Strong Wolfe constants: sufficient decrease `c1`, curvature `c2`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WolfeConstants {
    pub c1: f64,
    pub c2: f64,
}

impl WolfeConstants {
    pub fn new(c1: f64, c2: f64) -> OptResult<Self> {
        let valid = c1.is_finite() && c2.is_finite() && 0.0 < c1 && c1 < c2 && c2 < 1.0;
        if !valid {
            return Err(OptError::InvalidWolfeConstants { c1, c2 });
        }
        Ok(Self { c1, c2 })
    }
}

impl Default for WolfeConstants {
    fn default() -> Self {
        Self { c1: 1e-4, c2: 0.9 }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    pub tols: Tolerances,
    pub wolfe: WolfeConstants,
    /// `(min, max)` step length accepted by the line search.
    pub step_bounds: (f64, f64),
    pub verbose: bool,
    pub lbfgs_mem: Option<usize>,
}

impl SolverOptions {
    pub fn new(
        tols: Tolerances, wolfe: WolfeConstants, step_bounds: (f64, f64), verbose: bool,
        lbfgs_mem: Option<usize>,
    ) -> OptResult<Self> {
        if let Some(m) = lbfgs_mem {
            if m == 0 {
                return Err(OptError::InvalidLBFGSMem {
                    mem: m,
                    reason: "L-BFGS memory must be greater than zero.",
                });
            }
        }
        let (min, max) = step_bounds;
        if !(min.is_finite() && max.is_finite() && min >= 0.0 && min < max) {
            return Err(OptError::InvalidStepBounds { min, max });
        }
        Ok(Self { tols, wolfe, step_bounds, verbose, lbfgs_mem })
    }

    pub fn memory(&self) -> usize {
        self.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM)
    }
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            tols: Tolerances::default(),
            wolfe: WolfeConstants::default(),
            step_bounds: (0.0, 10.0),
            verbose: false,
            lbfgs_mem: Some(DEFAULT_LBFGS_MEM),
        }
    }
}

/// Result of one bounded solve.
///
/// `x_hat` always lies inside the caller's box. `recovered` is set when the
/// run ended on a numerical failure and `x_hat` is the best finite iterate
/// seen before it.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome {
    pub x_hat: Theta,
    pub value: f64,
    pub converged: bool,
    pub recovered: bool,
    pub status: String,
    pub iterations: usize,
    pub fn_evals: FnEvalMap,
    pub grad_norm: Option<f64>,
}

impl SolveOutcome {
    pub fn new(
        x_hat_opt: Option<Theta>, value: f64, converged: TerminationStatus, iterations: u64,
        fn_evals: FnEvalMap, grad: Option<Grad>,
    ) -> OptResult<Self> {
        let x_hat = validate_theta_hat(x_hat_opt)?;
        validate_value(value)?;
        let status: String;
        let converged = match converged {
            TerminationStatus::NotTerminated => {
                status = "Not terminated".to_string();
                false
            }
            _ => {
                status = format!("{converged:?}");
                true
            }
        };
        let iterations = iterations as usize;
        let grad_norm = grad.map(|g| g.l2_norm());
        Ok(Self { x_hat, value, converged, recovered: false, status, iterations, fn_evals, grad_norm })
    }

    /// Outcome for a run that failed numerically after visiting `x_best`.
    pub fn recovered(x_best: Theta, value: f64, cause: &OptError) -> Self {
        Self {
            x_hat: x_best,
            value,
            converged: false,
            recovered: true,
            status: format!("Recovered last finite iterate after: {cause}"),
            iterations: 0,
            fn_evals: FnEvalMap::new(),
            grad_norm: None,
        }
    }
}

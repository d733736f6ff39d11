//! Adapter that exposes a box-constrained [`Objective`] as an unconstrained
//! `argmin` problem.
//!
//! argmin only ever sees the unconstrained coordinates `z`. Each evaluation
//! maps `z` into the box with `x = inv_transform(z)`, evaluates the user
//! objective at `x`, and (for gradients) applies the chain rule
//! `∂f/∂z = J(z) ⊙ ∇f(x)` with the diagonal Jacobian of the reparameterization.
//!
//! The adapter also remembers the best finite point it has evaluated, so that
//! a run aborted by a numerical failure can still hand back a usable iterate.
use std::cell::RefCell;

use crate::optimization::{
    bounded_optimizer::{
        finite_diff::run_fd_diff,
        traits::Objective,
        types::{Cost, Grad, Theta},
        validation::validate_grad,
    },
    errors::OptError,
    numerical_stability::{jacobian_diag, to_bounded},
};
use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

/// Best finite `(value, x)` pair seen during a run, in bounded coordinates.
///
/// Every cost evaluation is observed, line-search trial points included.
/// Each accepted iterate is itself evaluated, so the kept point is never
/// worse than the last accepted iterate before a failure.
#[derive(Debug, Default)]
pub struct IterateTracker {
    best: RefCell<Option<(Cost, Theta)>>,
}

impl IterateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `(value, x)` if it improves on the current best.
    pub fn observe(&self, value: Cost, x: &Theta) {
        if !value.is_finite() || x.iter().any(|v| !v.is_finite()) {
            return;
        }
        let mut slot = self.best.borrow_mut();
        let improves = match slot.as_ref() {
            Some((best, _)) => value < *best,
            None => true,
        };
        if improves {
            *slot = Some((value, x.clone()));
        }
    }

    pub fn take(&self) -> Option<(Cost, Theta)> {
        self.best.borrow_mut().take()
    }
}

/// Bridges an [`Objective`] on `[lb, ub]` to `argmin`'s `CostFunction` and
/// `Gradient` over unconstrained `z`.
#[derive(Debug, Clone)]
pub struct BoxAdapter<'a, F: Objective> {
    pub f: &'a F,
    pub lb: &'a Theta,
    pub ub: &'a Theta,
    pub tracker: &'a IterateTracker,
}

impl<'a, F: Objective> BoxAdapter<'a, F> {
    pub fn new(f: &'a F, lb: &'a Theta, ub: &'a Theta, tracker: &'a IterateTracker) -> Self {
        Self { f, lb, ub, tracker }
    }

    /// Map unconstrained coordinates into the box.
    pub fn to_bounded(&self, z: &Theta) -> Theta {
        to_bounded(z, self.lb, self.ub)
    }
}

impl<'a, F: Objective> CostFunction for BoxAdapter<'a, F> {
    type Param = Theta;
    type Output = Cost;

    /// Evaluate `f(inv_transform(z))`.
    ///
    /// # Errors
    /// - Propagates any `OptError` from the user's `value`.
    /// - `NonFiniteCost` if the value is NaN/±inf.
    fn cost(&self, z: &Self::Param) -> Result<Self::Output, Error> {
        let x = self.to_bounded(z);
        let output = self.f.value(&x)?;
        if !output.is_finite() {
            return Err((OptError::NonFiniteCost { value: output }).into());
        }
        self.tracker.observe(output, &x);
        Ok(output)
    }
}

impl<'a, F: Objective> Gradient for BoxAdapter<'a, F> {
    type Param = Theta;
    type Gradient = Grad;

    /// Evaluate `∂f/∂z` at `z`.
    ///
    /// Behavior:
    /// - With an analytic (or objective-provided numerical) gradient, validate
    ///   it in `x` space and scale by the Jacobian diagonal.
    /// - Otherwise, finite-difference the **cost** in `z` space directly
    ///   (central first, forward on failure), which already includes the
    ///   reparameterization.
    ///
    /// # Errors
    /// - Propagates user errors from `grad` (non-`GradientNotImplemented`).
    /// - Returns validation errors if the gradient has wrong dimension or
    ///   non-finite entries.
    fn gradient(&self, z: &Self::Param) -> Result<Self::Gradient, Error> {
        let dim = z.len();
        let x = self.to_bounded(z);
        match self.f.grad(&x) {
            Ok(g) => {
                validate_grad(&g, dim)?;
                let scaled = g * jacobian_diag(z, self.lb, self.ub);
                validate_grad(&scaled, dim)?;
                Ok(scaled)
            }
            Err(OptError::GradientNotImplemented) => {
                let closure_err: RefCell<Option<Error>> = RefCell::new(None);
                let cost_func = |z: &Theta| -> f64 {
                    match self.cost(z) {
                        Ok(val) => val,
                        Err(e) => {
                            let mut slot = closure_err.borrow_mut();
                            if slot.is_none() {
                                *slot = Some(e);
                            }
                            f64::NAN
                        }
                    }
                };
                let fd_grad = z.central_diff(&cost_func);
                if closure_err.borrow().is_none() && validate_grad(&fd_grad, dim).is_ok() {
                    return Ok(fd_grad);
                }
                Ok(run_fd_diff(z, &cost_func, &closure_err)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

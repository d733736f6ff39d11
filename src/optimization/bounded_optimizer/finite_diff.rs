//! Finite-difference gradients.
//!
//! - [`relative_forward_diff`]: one-sided differences with a step scaled to
//!   the magnitude of each coordinate (`h_i = sqrt(ε)·x_i`). Used by
//!   objectives whose parameters span several orders of magnitude, such as
//!   diffusivities next to mixing weights.
//! - [`run_fd_diff`]: the `finitediff` forward-difference fallback used by
//!   the adapter when an objective has no gradient at all.
use crate::optimization::{
    bounded_optimizer::{
        Grad, Theta,
        types::SQRT_EPS,
        validation::validate_grad,
    },
    errors::OptResult,
};
use argmin::core::Error;
use finitediff::FiniteDiff;
use ndarray::Array1;
use std::cell::RefCell;

/// One-sided relative-step gradient of `f` at `x`.
///
/// # Parameters
/// - `x`: evaluation point.
/// - `fx`: `f(x)`, already computed by the caller.
/// - `f`: fallible scalar function.
///
/// # Notes
/// - The step actually taken is `dx = (x_i + h) - x_i`, which absorbs the
///   rounding of `x_i + h`.
/// - A zero coordinate falls back to the absolute step `sqrt(ε)`.
///
/// # Errors
/// - Propagates any error from `f`.
/// - [`OptError::InvalidGradient`](crate::optimization::errors::OptError)
///   if a difference quotient is non-finite.
pub fn relative_forward_diff<G>(x: &Theta, fx: f64, f: &G) -> OptResult<Grad>
where
    G: Fn(&Theta) -> OptResult<f64>,
{
    let dim = x.len();
    let mut grad = Array1::zeros(dim);
    let mut probe = x.clone();
    for i in 0..dim {
        let xi = x[i];
        let mut h = SQRT_EPS * xi;
        if h == 0.0 {
            h = SQRT_EPS;
        }
        probe[i] = xi + h;
        let dx = probe[i] - xi;
        let f_plus = f(&probe)?;
        grad[i] = (f_plus - fx) / dx;
        probe[i] = xi;
    }
    validate_grad(&grad, dim)?;
    Ok(grad)
}

/// Forward-difference gradient through `finitediff`, surfacing the first
/// error captured inside `func`.
pub fn run_fd_diff<G: Fn(&Theta) -> f64>(
    theta: &Theta, func: &G, closure_err: &RefCell<Option<Error>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = theta.forward_diff(func);
    let dim = theta.len();
    if let Some(err) = closure_err.take() {
        return Err(err.into());
    }
    validate_grad(&fd_grad, dim)?;
    Ok(fd_grad)
}

//! Validation helpers for bounded optimization.
//!
//! This module centralizes common consistency checks used across the
//! optimizer interface:
//!
//! - **Tolerance checks**: [`verify_tol_grad`], [`verify_tol_cost`] ensure
//!   numeric tolerances are finite and strictly positive when provided.
//! - **Box checks**: [`validate_bounds`] enforces equal dimensions, finite
//!   entries and `lb < ub`.
//! - **Gradient validation**: [`validate_grad`] enforces correct dimension
//!   and finite entries.
//! - **Solutions**: [`validate_theta_hat`] ensures the best point exists
//!   and is finite.
//!
//! These helpers standardize error reporting by returning domain-specific
//! [`OptError`] variants.
use crate::optimization::{
    bounded_optimizer::{Grad, Theta},
    errors::{OptError, OptResult},
};

/// Validate the optional gradient-norm tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    match tol.map(|t| (t, tolerance_defect(t))) {
        Some((tol, Some(reason))) => Err(OptError::InvalidTolGrad { tol, reason }),
        _ => Ok(()),
    }
}

/// Validate the optional cost-change tolerance.
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    match tol.map(|t| (t, tolerance_defect(t))) {
        Some((tol, Some(reason))) => Err(OptError::InvalidTolCost { tol, reason }),
        _ => Ok(()),
    }
}

/// Validate a start point against its box.
///
/// # Errors
/// - [`OptError::EmptyProblem`] for zero-length inputs.
/// - [`OptError::BoundsDimMismatch`] if the three lengths differ.
/// - [`OptError::NonFiniteBound`] / [`OptError::NonFiniteStart`] for NaN/±inf.
/// - [`OptError::InvertedBounds`] if any `lb[i] >= ub[i]`.
pub fn validate_bounds(x0: &Theta, lb: &Theta, ub: &Theta) -> OptResult<()> {
    if x0.len() != lb.len() || x0.len() != ub.len() {
        return Err(OptError::BoundsDimMismatch {
            lower: lb.len(),
            upper: ub.len(),
            start: x0.len(),
        });
    }
    if x0.is_empty() {
        return Err(OptError::EmptyProblem);
    }
    for (index, ((&x, &l), &u)) in x0.iter().zip(lb.iter()).zip(ub.iter()).enumerate() {
        if !l.is_finite() {
            return Err(OptError::NonFiniteBound { index, value: l });
        }
        if !u.is_finite() {
            return Err(OptError::NonFiniteBound { index, value: u });
        }
        if l >= u {
            return Err(OptError::InvertedBounds { index, lower: l, upper: u });
        }
        if !x.is_finite() {
            return Err(OptError::NonFiniteStart { index, value: x });
        }
    }
    Ok(())
}

pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

pub fn validate_theta_hat(theta_hat: Option<Theta>) -> OptResult<Theta> {
    let theta = theta_hat.ok_or(OptError::MissingSolution)?;
    if let Some((index, &value)) = theta.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(OptError::InvalidSolution { index, value });
    }
    Ok(theta)
}

pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

// ---- Helper Methods ----

fn tolerance_defect(tol: f64) -> Option<&'static str> {
    if !tol.is_finite() {
        Some("Tolerance must be finite.")
    } else if tol <= 0.0 {
        Some("Tolerance must be positive.")
    } else {
        None
    }
}

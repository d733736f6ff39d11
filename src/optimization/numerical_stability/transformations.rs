//! Numerical stability utilities for box-constrained optimization.
//!
//! Provides safe implementations of the logistic map and of the
//! logit-style reparameterization that turns a box `[lb, ub]` into the
//! whole real line. Naïve forms of these maps overflow for large `|z|`
//! (`exp(z)` → ∞, then `∞/∞` → NaN); the versions here stay finite on all
//! of ℝ.
//!
//! # Provided items
//! - [`BOUND_EPS`]: the ε offset that keeps `transform` finite when `x`
//!   sits exactly on a bound.
//! - [`safe_logistic(z)`]: stable `1 / (1 + exp(-z))`.
//! - [`transform`], [`inv_transform`], [`jacobian`]: the scalar box
//!   reparameterization and its derivative.
//! - [`to_unconstrained`], [`to_bounded`], [`jacobian_diag`]: elementwise
//!   versions over `Array1<f64>`.
//!
//! # Conventions
//! With `a = x - lb + ε` and `b = ub - x + ε`:
//!
//! - `transform(x) = ln(a) - ln(b)`
//! - `inv_transform(z) = (lb + ε + (ub - ε)·e^z) / (1 + e^z)
//!   = lb + ε + (ub - lb - 2ε)·σ(z)`
//! - `jacobian(z) = dx/dz = (ub - lb)·e^z / (1 + e^z)² = (ub - lb)·σ(z)·(1 - σ(z))`
//!
//! The logistic form of `inv_transform` is what makes the inverse overflow
//! free; it is algebraically identical to the ratio form.
use ndarray::{Array1, Zip};

/// Offset applied on both sides of the box (machine ε for `f64`).
///
/// Keeps `ln(x - lb + ε)` finite at `x = lb` and `ln(ub - x + ε)` finite at
/// `x = ub`.
pub const BOUND_EPS: f64 = 2.2204e-16;

/// Numerically stable logistic: `σ(z) = 1 / (1 + exp(-z))`.
///
/// Uses the two-branch formulation so that `exp` is only ever evaluated on
/// a non-positive argument.
///
/// # Parameters
/// - `z`: real input
///
/// # Returns
/// - `σ(z)` in `[0, 1]`; `NaN` input yields `NaN`.
pub fn safe_logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Map a bounded value `x ∈ [lb, ub]` into unconstrained space.
///
/// Values on or slightly outside the box still produce a finite result as
/// long as `x - lb + ε > 0` and `ub - x + ε > 0`; callers clamp first when
/// that is not guaranteed.
pub fn transform(x: f64, lb: f64, ub: f64) -> f64 {
    let x = x.clamp(lb, ub);
    (x - lb + BOUND_EPS).ln() - (ub - x + BOUND_EPS).ln()
}

/// Map an unconstrained value back into `[lb, ub]`.
///
/// Non-finite inputs are resolved explicitly:
/// - `NaN` → box midpoint `(lb + ub) / 2`,
/// - `-∞` → `lb + ε`,
/// - `+∞` → `ub - ε`.
pub fn inv_transform(z: f64, lb: f64, ub: f64) -> f64 {
    if z.is_nan() {
        return 0.5 * (lb + ub);
    }
    if z == f64::NEG_INFINITY {
        return lb + BOUND_EPS;
    }
    if z == f64::INFINITY {
        return ub - BOUND_EPS;
    }
    let x = lb + BOUND_EPS + (ub - lb - 2.0 * BOUND_EPS) * safe_logistic(z);
    if x.is_finite() { x.clamp(lb, ub) } else { ub - BOUND_EPS }
}

/// Derivative `dx/dz` of [`inv_transform`] at `z`.
///
/// Always finite and non-negative; vanishes as `|z| → ∞`.
pub fn jacobian(z: f64, lb: f64, ub: f64) -> f64 {
    let s = safe_logistic(z);
    let j = (ub - lb) * s * (1.0 - s);
    if j.is_finite() { j } else { 0.0 }
}

/// Elementwise [`transform`].
pub fn to_unconstrained(x: &Array1<f64>, lb: &Array1<f64>, ub: &Array1<f64>) -> Array1<f64> {
    Zip::from(x).and(lb).and(ub).map_collect(|&x, &l, &u| transform(x, l, u))
}

/// Elementwise [`inv_transform`].
pub fn to_bounded(z: &Array1<f64>, lb: &Array1<f64>, ub: &Array1<f64>) -> Array1<f64> {
    Zip::from(z).and(lb).and(ub).map_collect(|&z, &l, &u| inv_transform(z, l, u))
}

/// Elementwise [`jacobian`], i.e. the diagonal of `∂x/∂z`.
pub fn jacobian_diag(z: &Array1<f64>, lb: &Array1<f64>, ub: &Array1<f64>) -> Array1<f64> {
    Zip::from(z).and(lb).and(ub).map_collect(|&z, &l, &u| jacobian(z, l, u))
}

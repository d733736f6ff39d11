//! Forward model of the diffusion signal for a given state.
//!
//! Purpose
//! -------
//! Predict the normalized diffusion-weighted signal of the three-compartment
//! bi-exponential model with an isotropic free-water term, and score a
//! prediction against a measured sample.
//!
//! Key behaviors
//! -------------
//! - For each gradient `u` with b-value `b`:
//!   `ŝ = (1 - w_iso) Σ_k w_k [0.7 e^{-b uᵀD_k^f u} + 0.3 e^{-b uᵀD_k^s u}]
//!        + w_iso e^{-b D_iso}`,
//!   with cylindrically symmetric tensors
//!   `uᵀDu = λ⊥|u|² + (λ∥ - λ⊥)(u·m̂)²`.
//! - [`normalized_error`] compares only the first half of the samples; the
//!   acquisition stores every direction twice (antipodal copies).
//!
//! Conventions
//! -----------
//! - Gradients are an `n × 3` array of physical directions, b-values are in
//!   s/mm², diffusivities in the state are in 1e-6 mm²/s.
//! - Orientations are normalized internally; a zero orientation contributes
//!   an isotropic `λ⊥` term.
use crate::tractography::{
    core::state::{
        FAST_FRACTION, N_COMPARTMENTS, StateVector, Vec3, fast_index, free_water,
        slow_index, unit_orientation, validate_state, weight_index,
    },
    errors::{TrackError, TrackResult},
};
use ndarray::{Array1, Array2, ArrayView1};

/// Isotropic free-water diffusivity in mm²/s.
pub const D_ISO: f64 = 3.0e-3;

/// Conversion from state diffusivity units to mm²/s.
pub const DIFFUSIVITY_SCALE: f64 = 1.0e-6;

/// Gradient directions and b-values of one acquisition.
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    gradients: Array2<f64>,
    b_values: Array1<f64>,
}

impl Acquisition {
    /// Validate and build an acquisition scheme.
    ///
    /// # Errors
    /// - `GradientTableMismatch` when the table is empty, not `n × 3`, or
    ///   disagrees with the number of b-values.
    /// - `InvalidOption` for negative or non-finite b-values.
    pub fn new(gradients: Array2<f64>, b_values: Array1<f64>) -> TrackResult<Self> {
        if gradients.ncols() != 3
            || gradients.nrows() != b_values.len()
            || b_values.is_empty()
        {
            return Err(TrackError::GradientTableMismatch {
                gradients: gradients.nrows(),
                b_values: b_values.len(),
            });
        }
        if let Some(&b) = b_values.iter().find(|b| !b.is_finite() || **b < 0.0) {
            return Err(TrackError::InvalidOption {
                name: "b_value",
                value: b,
                reason: "b-values must be finite and non-negative",
            });
        }
        Ok(Self { gradients, b_values })
    }

    pub fn len(&self) -> usize {
        self.b_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.b_values.is_empty()
    }

    pub fn gradients(&self) -> &Array2<f64> {
        &self.gradients
    }

    pub fn b_values(&self) -> &Array1<f64> {
        &self.b_values
    }

    pub fn gradient(&self, i: usize) -> Vec3 {
        Vec3::new(self.gradients[[i, 0]], self.gradients[[i, 1]], self.gradients[[i, 2]])
    }
}

/// `uᵀDu` of a cylindrically symmetric tensor, inputs in state units.
fn directional_diffusivity(u: &Vec3, m: &Vec3, par: f64, perp: f64) -> f64 {
    let proj = u.dot(m);
    (perp * u.norm_squared() + (par - perp) * proj * proj) * DIFFUSIVITY_SCALE
}

/// Predicted signal of `state` for every gradient of `acq`.
///
/// # Errors
/// `StateDimMismatch` if `state` is not a model state.
pub fn predict_signal(state: &StateVector, acq: &Acquisition) -> TrackResult<Array1<f64>> {
    validate_state(state)?;
    let orientations: Vec<Vec3> = (0..N_COMPARTMENTS).map(|k| unit_orientation(state, k)).collect();
    let w_iso = free_water(state);
    let predicted = (0..acq.len())
        .map(|i| {
            let u = acq.gradient(i);
            let b = acq.b_values[i];
            let tissue: f64 = orientations
                .iter()
                .enumerate()
                .map(|(k, m)| {
                    let (f, s) = (fast_index(k), slow_index(k));
                    let fast = (-b * directional_diffusivity(&u, m, state[f], state[f + 1])).exp();
                    let slow = (-b * directional_diffusivity(&u, m, state[s], state[s + 1])).exp();
                    state[weight_index(k)] * (FAST_FRACTION * fast + (1.0 - FAST_FRACTION) * slow)
                })
                .sum();
            (1.0 - w_iso) * tissue + w_iso * (-b * D_ISO).exp()
        })
        .collect();
    Ok(predicted)
}

/// `Σ_{i<N/2}(s_i - ŝ_i)² / Σ_{i<N/2} s_i²`.
///
/// An all-zero measured half leaves the residual unnormalized.
///
/// # Errors
/// `SignalDimMismatch` if the two vectors differ in length.
pub fn normalized_error(measured: ArrayView1<f64>, predicted: ArrayView1<f64>) -> TrackResult<f64> {
    if measured.len() != predicted.len() {
        return Err(TrackError::SignalDimMismatch {
            expected: measured.len(),
            found: predicted.len(),
        });
    }
    let half = measured.len() / 2;
    let (mut residual, mut energy) = (0.0, 0.0);
    for i in 0..half {
        residual += (measured[i] - predicted[i]).powi(2);
        energy += measured[i] * measured[i];
    }
    Ok(if energy > 0.0 { residual / energy } else { residual })
}

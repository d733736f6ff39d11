//! Per-step diagnostics derived from state, covariance and signal.
//!
//! Purpose
//! -------
//! Pure summary statistics recorded alongside fibers and used by the stop
//! rules: return-to-origin probabilities (RTOP) from the fitted model and
//! from the raw signal, covariance-block uncertainty norms, and inter-
//! compartment angles.
//!
//! Key behaviors
//! -------------
//! - [`rtop_from_state`] re-clamps diffusivities and weights on a copy, then
//!   evaluates `rtop_k = π^1.5 w_k (0.7/√det_fast + 0.3/√det_slow)` and
//!   `rtop_model = Σ rtop_k + π^1.5 w_iso / √(D_iso³)`.
//! - [`rtop_from_signal`] sums the first half of the signal and warns about
//!   negative entries.
//! - [`uncertainties`] takes Frobenius norms of the orientation and
//!   diffusivity diagonal blocks and the weight variances.
//!
//! Invariants & assumptions
//! ------------------------
//! - Inputs are never mutated.
//! - Determinants are products of the `(λ∥, λ⊥)` pair in mm²/s.
use crate::tractography::core::{
    signal_model::{D_ISO, DIFFUSIVITY_SCALE},
    state::{
        Covariance, FREE_WATER_INDEX, N_COMPARTMENTS, StateVector, Vec3, clamped_copy, fast_index,
        free_water, orientation_index, slow_index, unit_orientation, weight_index,
    },
};
use ndarray::{ArrayView1, s};
use std::f64::consts::PI;

/// RTOP values of one state (and optionally its signal).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RtopDiagnostics {
    pub rtop1: f64,
    pub rtop2: f64,
    pub rtop3: f64,
    pub rtop_model: f64,
    pub rtop_signal: f64,
}

/// Closed-form RTOP of the clamped model state.
///
/// Returns `(per_compartment, model)`.
pub fn rtop_from_state(state: &StateVector) -> ([f64; 3], f64) {
    let clamped = clamped_copy(state);
    let pi_coeff = PI.powf(1.5);
    let mut per_compartment = [0.0; N_COMPARTMENTS];
    for (k, rtop) in per_compartment.iter_mut().enumerate() {
        let (f, s) = (fast_index(k), slow_index(k));
        let det_fast = clamped[f] * DIFFUSIVITY_SCALE * clamped[f + 1] * DIFFUSIVITY_SCALE;
        let det_slow = clamped[s] * DIFFUSIVITY_SCALE * clamped[s + 1] * DIFFUSIVITY_SCALE;
        *rtop = pi_coeff
            * clamped[weight_index(k)]
            * (0.7 / det_fast.sqrt() + 0.3 / det_slow.sqrt());
    }
    let free = pi_coeff * free_water(&clamped) / (D_ISO * D_ISO * D_ISO).sqrt();
    (per_compartment, per_compartment.iter().sum::<f64>() + free)
}

/// Sum of the first half of `signal`.
pub fn rtop_from_signal(signal: ArrayView1<f64>) -> f64 {
    let half = signal.len() / 2;
    let mut sum = 0.0;
    for &v in signal.iter().take(half) {
        if v < 0.0 {
            log::warn!("negative signal value {v} while summing signal RTOP");
        }
        sum += v;
    }
    sum
}

impl RtopDiagnostics {
    /// Model and signal RTOP for one sample.
    pub fn compute(state: &StateVector, signal: ArrayView1<f64>) -> Self {
        let ([rtop1, rtop2, rtop3], rtop_model) = rtop_from_state(state);
        Self { rtop1, rtop2, rtop3, rtop_model, rtop_signal: rtop_from_signal(signal) }
    }
}

/// Covariance-block characteristics of one sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Uncertainties {
    /// Frobenius norm of each 3×3 orientation block.
    pub orientation: [f64; 3],
    /// Frobenius norm of each 4×4 diffusivity block.
    pub diffusivity: [f64; 3],
    /// Variances of w1, w2, w3.
    pub weight_variance: [f64; 3],
    pub free_water_variance: f64,
}

/// Frobenius norm of the square block `[offset..offset+len]²`.
fn block_norm(cov: &Covariance, offset: usize, len: usize) -> f64 {
    cov.slice(s![offset..offset + len, offset..offset + len])
        .iter()
        .map(|v| v * v)
        .sum::<f64>()
        .sqrt()
}

pub fn uncertainties(cov: &Covariance) -> Uncertainties {
    let mut out = Uncertainties::default();
    for k in 0..N_COMPARTMENTS {
        out.orientation[k] = block_norm(cov, orientation_index(k), 3);
        out.diffusivity[k] = block_norm(cov, fast_index(k), 4);
        out.weight_variance[k] = cov[[weight_index(k), weight_index(k)]];
    }
    out.free_water_variance = cov[[FREE_WATER_INDEX, FREE_WATER_INDEX]];
    out
}

/// Frobenius norm of the full covariance.
pub fn covariance_norm(cov: &Covariance) -> f64 {
    cov.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Unsigned angle in degrees between two axes, in `[0, 90]`.
pub fn axis_angle_degrees(a: &Vec3, b: &Vec3) -> f64 {
    let dot = a.dot(b).clamp(-1.0, 1.0);
    dot.acos().min((-dot).acos()).to_degrees()
}

/// Angles between the primary axis and the second and third axes.
pub fn compartment_angles(state: &StateVector) -> (f64, f64) {
    let d1 = unit_orientation(state, 0);
    (
        axis_angle_degrees(&d1, &unit_orientation(state, 1)),
        axis_angle_degrees(&d1, &unit_orientation(state, 2)),
    )
}

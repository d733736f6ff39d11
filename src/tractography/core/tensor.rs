//! Single-tensor fit used to seed the multi-compartment state.
//!
//! Purpose
//! -------
//! Fit a diffusion tensor `D` to one signal sample by log-linear least
//! squares, `ln s_i = -b_i g_iᵀ D g_i`, and expose its eigenvalues (in state
//! units), principal direction and fractional anisotropy.
//!
//! Key behaviors
//! -------------
//! - Non-positive samples are replaced by `1e-7` before taking logs.
//! - The 6-column design `-b [gx², 2gxgy, 2gxgz, gy², 2gygz, gz²]` is solved
//!   with an SVD least-squares solve.
//! - Eigenvalues are sorted in descending order and scaled by 1e6 into the
//!   state's diffusivity units.
//!
//! Conventions
//! -----------
//! - The signal is assumed normalized by the unweighted image (`S0 = 1`).
use crate::tractography::{
    core::{
        signal_model::{Acquisition, DIFFUSIVITY_SCALE},
        state::Vec3,
    },
    errors::{TrackError, TrackResult},
};
use nalgebra::{DMatrix, DVector, Matrix3, SymmetricEigen};
use ndarray::ArrayView1;

/// Floor substituted for non-positive samples before the log transform.
const SIGNAL_FLOOR: f64 = 1e-7;

/// Result of a single-tensor fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TensorFit {
    /// Eigenvalues in 1e-6 mm²/s, descending.
    pub eigenvalues: [f64; 3],
    /// Unit eigenvector of the largest eigenvalue.
    pub principal: Vec3,
}

impl TensorFit {
    /// Fit a tensor to `signal` under `acq`.
    ///
    /// # Errors
    /// - `SignalDimMismatch` if the signal length differs from the table.
    /// - `TensorFitFailed` if the least-squares solve or the result is
    ///   degenerate.
    pub fn fit(signal: ArrayView1<f64>, acq: &Acquisition) -> TrackResult<Self> {
        if signal.len() != acq.len() {
            return Err(TrackError::SignalDimMismatch { expected: acq.len(), found: signal.len() });
        }
        let n = acq.len();
        let design = DMatrix::from_fn(n, 6, |i, j| {
            let g = acq.gradient(i);
            let b = acq.b_values()[i];
            -b * match j {
                0 => g.x * g.x,
                1 => 2.0 * g.x * g.y,
                2 => 2.0 * g.x * g.z,
                3 => g.y * g.y,
                4 => 2.0 * g.y * g.z,
                _ => g.z * g.z,
            }
        });
        let log_signal = DVector::from_iterator(
            n,
            signal.iter().map(|&s| (if s > 0.0 { s } else { SIGNAL_FLOOR }).ln()),
        );

        let d = design
            .svd(true, true)
            .solve(&log_signal, f64::EPSILON)
            .map_err(|reason| TrackError::TensorFitFailed { reason })?;
        if d.iter().any(|v| !v.is_finite()) {
            return Err(TrackError::TensorFitFailed { reason: "non-finite tensor coefficients" });
        }

        #[rustfmt::skip]
        let tensor = Matrix3::new(
            d[0], d[1], d[2],
            d[1], d[3], d[4],
            d[2], d[4], d[5],
        );
        let eigen = SymmetricEigen::new(tensor);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let eigenvalues = order.map(|i| eigen.eigenvalues[i] / DIFFUSIVITY_SCALE);
        let principal = eigen.eigenvectors.column(order[0]).into_owned();
        let norm = principal.norm();
        if norm == 0.0 || !norm.is_finite() {
            return Err(TrackError::TensorFitFailed { reason: "degenerate principal direction" });
        }
        Ok(Self { eigenvalues, principal: principal / norm })
    }

    /// `(λ1, (λ2 + λ3)/2)`, the cylindrically symmetric pair.
    pub fn axial_radial(&self) -> (f64, f64) {
        let [l1, l2, l3] = self.eigenvalues;
        (l1, 0.5 * (l2 + l3))
    }

    pub fn fa(&self) -> f64 {
        fractional_anisotropy(self.eigenvalues)
    }
}

/// Fractional anisotropy of three eigenvalues; zero for a null tensor.
pub fn fractional_anisotropy([l1, l2, l3]: [f64; 3]) -> f64 {
    let denom = l1 * l1 + l2 * l2 + l3 * l3;
    if denom <= 0.0 {
        return 0.0;
    }
    let num = (l1 - l2).powi(2) + (l2 - l3).powi(2) + (l3 - l1).powi(2);
    (0.5 * num / denom).sqrt()
}

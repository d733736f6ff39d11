//! Errors for tractography (options, state layout, signal contracts, seeding,
//! propagation invariants and run-level failures).
//!
//! This module defines [`TrackError`], the single error type returned by the
//! domain layer. It implements `Display`/`Error` and wraps solver errors from
//! the optimization layer.
//!
//! ## Conventions
//! - **Indices are 0-based.**
//! - Policy stops during propagation (mask exit, curvature, ...) are *not*
//!   errors; they are reported through `StopReason`.
//! - Everything here is fatal for the run that produced it.
use crate::optimization::errors::OptError;

/// Result alias for tractography operations that may produce [`TrackError`].
pub type TrackResult<T> = Result<T, TrackError>;

/// Unified error type for tractography.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackError {
    // ---- Options ----
    /// A numeric option is outside its admissible range.
    InvalidOption { name: &'static str, value: f64, reason: &'static str },

    /// No seed labels configured while a seed-label image is present.
    EmptyLabels,

    // ---- State layout ----
    /// State vector does not have the fixed model length.
    StateDimMismatch { expected: usize, found: usize },

    /// Covariance is not square with the model dimension.
    CovarianceDimMismatch { expected: usize, found: (usize, usize) },

    /// Compartment index outside `0..3`.
    CompartmentOutOfRange { index: usize },

    // ---- Signal ----
    /// A signal sample vector has the wrong length.
    SignalDimMismatch { expected: usize, found: usize },

    /// Gradient table and b-values disagree in length, or are empty.
    GradientTableMismatch { gradients: usize, b_values: usize },

    /// A volume component has the wrong spatial shape.
    VolumeShapeMismatch { what: &'static str, expected: [usize; 3], found: [usize; 3] },

    /// Voxel spacing must be finite and strictly positive.
    InvalidVoxelSpacing { axis: usize, value: f64 },

    /// Single-tensor fit could not be solved.
    TensorFitFailed { reason: &'static str },

    // ---- Seeding ----
    /// No usable seed point was produced.
    NoSeeds,

    // ---- Propagation ----
    /// Free-water complement below the tolerated negative range.
    NegativeFreeWater { value: f64 },

    /// The external estimator failed.
    EstimatorFailed { text: String },

    // ---- Run ----
    /// The worker pool could not be built.
    WorkerPool { text: String },

    /// Every fiber was discarded or too short.
    NoFibers,

    /// The fiber writer reported a failure.
    WriterFailed { text: String },

    // ---- Optimization ----
    Optimization(OptError),
}

impl std::error::Error for TrackError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackError::Optimization(err) => Some(err),
            _ => None,
        }
    }
}

impl std::fmt::Display for TrackError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Options ----
            TrackError::InvalidOption { name, value, reason } => {
                write!(f, "Invalid option {name} = {value}: {reason}")
            }
            TrackError::EmptyLabels => {
                write!(f, "Seed-label image present but no seed labels configured")
            }

            // ---- State layout ----
            TrackError::StateDimMismatch { expected, found } => {
                write!(f, "State dimension mismatch: expected {expected}, found {found}")
            }
            TrackError::CovarianceDimMismatch { expected, found } => {
                write!(
                    f,
                    "Covariance dimension mismatch: expected ({expected}, {expected}), found {found:?}"
                )
            }
            TrackError::CompartmentOutOfRange { index } => {
                write!(f, "Compartment index {index} out of range 0..3")
            }

            // ---- Signal ----
            TrackError::SignalDimMismatch { expected, found } => {
                write!(f, "Signal dimension mismatch: expected {expected}, found {found}")
            }
            TrackError::GradientTableMismatch { gradients, b_values } => {
                write!(
                    f,
                    "Gradient table mismatch: {gradients} gradients, {b_values} b-values (both must be equal and non-zero)"
                )
            }
            TrackError::VolumeShapeMismatch { what, expected, found } => {
                write!(f, "{what} shape mismatch: expected {expected:?}, found {found:?}")
            }
            TrackError::InvalidVoxelSpacing { axis, value } => {
                write!(f, "Invalid voxel spacing {value} on axis {axis}: must be finite and > 0")
            }
            TrackError::TensorFitFailed { reason } => {
                write!(f, "Single-tensor fit failed: {reason}")
            }

            // ---- Seeding ----
            TrackError::NoSeeds => {
                write!(f, "No seeds found")
            }

            // ---- Propagation ----
            TrackError::NegativeFreeWater { value } => {
                write!(f, "Negative free water {value} below tolerance -1e-4")
            }
            TrackError::EstimatorFailed { text } => {
                write!(f, "Recursive estimator failed: {text}")
            }

            // ---- Run ----
            TrackError::WorkerPool { text } => {
                write!(f, "Could not build worker pool: {text}")
            }
            TrackError::NoFibers => {
                write!(f, "No fibers survived post-processing")
            }
            TrackError::WriterFailed { text } => {
                write!(f, "Fiber writer failed: {text}")
            }

            // ---- Optimization ----
            TrackError::Optimization(err) => {
                write!(f, "Optimization failed: {err}")
            }
        }
    }
}

impl From<OptError> for TrackError {
    fn from(err: OptError) -> Self {
        TrackError::Optimization(err)
    }
}

//! Collaborator contracts — the narrow interfaces the tracker consumes.
//!
//! Purpose
//! -------
//! Decouple the estimation-and-propagation engine from image I/O, the
//! recursive state estimator, orientation-distribution branch detection
//! and fiber serialization. Each concern is a trait; the engine is generic
//! over implementations.
//!
//! Key behaviors
//! -------------
//! - [`SignalSource`]: continuous signal interpolation, mask/CSF lookups,
//!   voxel geometry, acquisition scheme and optional seed labels.
//! - [`RecursiveEstimator`]: one filter update `(state, cov, signal) →
//!   (state', cov', error)`.
//! - [`BranchDetector`]: 1–3 dominant directions with relative magnitudes.
//! - [`FiberWriter`]: persistence of the final fiber collection.
//!
//! Invariants & assumptions
//! ------------------------
//! - Signal sources and branch detectors are shared read-only across worker
//!   threads and therefore `Sync`.
//! - Estimators are not shared: every worker builds its own instance, so the
//!   trait has no thread-safety bound and `filter` takes `&mut self`.
//! - Estimators return states of the model dimension and symmetric PSD
//!   covariances; the propagator validates dimensions on every call.
use crate::tractography::{
    core::{
        fiber::Fiber,
        signal_model::Acquisition,
        state::{Covariance, StateVector, Vec3},
    },
    errors::TrackResult,
};
use ndarray::{Array1, ArrayView1};

/// Access to the diffusion-weighted volume and its companion images.
///
/// Positions are continuous voxel indices in storage order.
pub trait SignalSource: Sync {
    /// Signal interpolated at `position`, one value per acquisition entry.
    fn interp_signal(&self, position: &Vec3) -> Array1<f64>;

    /// Brain-mask value at `position`; `> 0` means inside.
    fn mask_value(&self, position: &Vec3) -> f64;

    /// CSF probability at `position`, `None` when no CSF map is loaded.
    fn csf_value(&self, _position: &Vec3) -> Option<f64> {
        None
    }

    /// Voxel spacing in mm along the three storage axes.
    fn voxel_spacing(&self) -> [f64; 3];

    fn acquisition(&self) -> &Acquisition;

    /// Samples per voxel.
    fn signal_dimension(&self) -> usize {
        self.acquisition().len()
    }

    /// Spatial extent in voxels.
    fn dimensions(&self) -> [usize; 3];

    /// Whether a seed-label image is available.
    fn has_seed_labels(&self) -> bool {
        false
    }

    /// Seed label of `voxel`, `None` without a label image.
    fn seed_label(&self, _voxel: [usize; 3]) -> Option<i32> {
        None
    }
}

/// Output of one recursive-estimator update.
#[derive(Debug, Clone, PartialEq)]
pub struct EstimatorOutput {
    pub state: StateVector,
    pub covariance: Covariance,
    /// Normalized reconstruction error of the updated state.
    pub error: f64,
}

/// The recursive (Kalman-style) state estimator.
pub trait RecursiveEstimator {
    fn filter(
        &mut self, state: &StateVector, covariance: &Covariance, signal: ArrayView1<f64>,
    ) -> TrackResult<EstimatorOutput>;
}

/// Candidate fiber directions at one position.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BranchDirections {
    /// Up to three unit directions, strongest first.
    pub directions: Vec<Vec3>,
    /// Relative magnitudes, one per direction.
    pub magnitudes: Vec<f64>,
    /// Generalized fractional anisotropy of the local profile.
    pub gfa: f64,
}

/// Detector of dominant directions in a signal sample.
pub trait BranchDetector: Sync {
    fn detect(&self, signal: ArrayView1<f64>, acquisition: &Acquisition) -> TrackResult<BranchDirections>;
}

/// Sink for the fibers of a completed run.
pub trait FiberWriter {
    fn write(&mut self, fibers: &[Fiber]) -> TrackResult<()>;
}

/// Writer keeping the fibers in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryWriter {
    pub fibers: Vec<Fiber>,
}

impl FiberWriter for MemoryWriter {
    fn write(&mut self, fibers: &[Fiber]) -> TrackResult<()> {
        self.fibers = fibers.to_vec();
        Ok(())
    }
}

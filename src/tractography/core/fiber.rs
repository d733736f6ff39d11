//! Fibers and their recorded samples.
//!
//! A [`Fiber`] is the ordered list of samples recorded while following one
//! seed. The first sample is always the seed itself; every further sample is
//! a decimated propagation step. Optional diagnostics are `None` unless the
//! corresponding `RecordFlags` entry was enabled.
use crate::tractography::core::{
    diagnostics::{RtopDiagnostics, Uncertainties},
    state::{Covariance, StateVector, Vec3},
};

/// Mixing weights and inter-compartment angles of one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    pub weights: [f64; 3],
    pub free_water_weight: f64,
    /// Angle between compartments 1 and 2, degrees in `[0, 90]`.
    pub angle_12: f64,
    /// Angle between compartments 1 and 3, degrees in `[0, 90]`.
    pub angle_13: f64,
}

/// One recorded point of a fiber.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberSample {
    /// Continuous voxel-index position.
    pub position: Vec3,
    /// State copy with unit orientations.
    pub state: StateVector,
    /// Frobenius norm of the full covariance.
    pub covariance_norm: f64,
    pub nmse: Option<f64>,
    pub rtop: Option<RtopDiagnostics>,
    pub weights: Option<WeightSample>,
    /// Tissue fraction `1 - w_iso`.
    pub free_water: Option<f64>,
    pub uncertainties: Option<Uncertainties>,
    pub covariance: Option<Covariance>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fiber {
    pub samples: Vec<FiberSample>,
}

impl Fiber {
    pub fn with_capacity(capacity: usize) -> Self {
        Self { samples: Vec::with_capacity(capacity) }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples recorded after the seed sample.
    pub fn recorded_steps(&self) -> usize {
        self.samples.len().saturating_sub(1)
    }

    pub fn positions(&self) -> Vec<Vec3> {
        self.samples.iter().map(|s| s.position).collect()
    }

    /// Positions of the last `n` samples, oldest first.
    pub fn tail_positions(&self, n: usize) -> Vec<Vec3> {
        let start = self.samples.len().saturating_sub(n);
        self.samples[start..].iter().map(|s| s.position).collect()
    }

    pub fn push(&mut self, sample: FiberSample) {
        self.samples.push(sample);
    }
}

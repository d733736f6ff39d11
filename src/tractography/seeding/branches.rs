//! Tensor-based branch detector.
//!
//! Reports the single-tensor principal direction as the only branch, with
//! magnitude 1 and the tensor FA standing in for the GFA. Orientation-
//! distribution solvers that resolve crossings implement the same
//! [`BranchDetector`] trait outside this crate.
use crate::tractography::{
    collaborators::{BranchDetector, BranchDirections},
    core::{signal_model::Acquisition, tensor::TensorFit},
    errors::TrackResult,
};
use ndarray::ArrayView1;

#[derive(Debug, Clone, Copy, Default)]
pub struct TensorBranchDetector;

impl BranchDetector for TensorBranchDetector {
    fn detect(&self, signal: ArrayView1<f64>, acquisition: &Acquisition) -> TrackResult<BranchDirections> {
        let fit = TensorFit::fit(signal, acquisition)?;
        Ok(BranchDirections { directions: vec![fit.principal], magnitudes: vec![1.0], gfa: fit.fa() })
    }
}

//! Synthetic acquisitions, signals and volumes shared by the integration
//! tests.
#![allow(dead_code)]

use ndarray::{Array1, Array2, Array3, Array4, ArrayView1, Axis};
use rust_tractography::tractography::{
    InMemoryVolume, RecursiveEstimator,
    collaborators::EstimatorOutput,
    core::{Acquisition, Covariance, StateVector, Vec3},
    errors::TrackResult,
};

/// b-value of every diffusion-weighted sample, in s/mm².
pub const B_VALUE: f64 = 1000.0;

/// 13 unique directions followed by their antipodes (26 samples), so the
/// second half of every signal duplicates the first.
pub fn acquisition() -> Acquisition {
    let s2 = 1.0 / 2f64.sqrt();
    let s3 = 1.0 / 3f64.sqrt();
    let unique = [
        [1.0, 0.0, 0.0],
        [0.0, 1.0, 0.0],
        [0.0, 0.0, 1.0],
        [s2, s2, 0.0],
        [s2, -s2, 0.0],
        [s2, 0.0, s2],
        [s2, 0.0, -s2],
        [0.0, s2, s2],
        [0.0, s2, -s2],
        [s3, s3, s3],
        [s3, -s3, s3],
        [s3, s3, -s3],
        [s3, -s3, -s3],
    ];
    let mut rows = Vec::with_capacity(2 * unique.len() * 3);
    for sign in [1.0, -1.0] {
        for g in &unique {
            rows.extend(g.iter().map(|v| sign * v));
        }
    }
    let n = 2 * unique.len();
    let gradients = Array2::from_shape_vec((n, 3), rows).expect("gradient table shape");
    Acquisition::new(gradients, Array1::from_elem(n, B_VALUE)).expect("valid acquisition")
}

/// Noise-free signal of one cylindrically symmetric tensor.
///
/// Eigenvalues are in 1e-6 mm²/s; `dir` must be a unit vector.
pub fn tensor_signal(acq: &Acquisition, axial: f64, radial: f64, dir: &Vec3) -> Array1<f64> {
    (0..acq.len())
        .map(|i| {
            let g = acq.gradient(i);
            let proj = g.dot(dir);
            let adc = (radial + (axial - radial) * proj * proj) * 1e-6;
            (-acq.b_values()[i] * adc).exp()
        })
        .collect()
}

/// Volume holding the same single-tensor signal along physical x in every
/// voxel, with the given brain mask.
pub fn tensor_volume(mask: Array3<f64>) -> InMemoryVolume {
    let acq = acquisition();
    let signal = tensor_signal(&acq, 1700.0, 300.0, &Vec3::new(1.0, 0.0, 0.0));
    let (nx, ny, nz) = mask.dim();
    let mut data = Array4::zeros((nx, ny, nz, acq.len()));
    for mut lane in data.lanes_mut(Axis(3)) {
        lane.assign(&signal);
    }
    InMemoryVolume::new(data, mask, acq, [1.0; 3]).expect("volume")
}

/// [`tensor_volume`] with an all-ones mask.
pub fn uniform_tensor_volume(dims: [usize; 3]) -> InMemoryVolume {
    tensor_volume(Array3::ones((dims[0], dims[1], dims[2])))
}

/// Estimator that returns its input unchanged with a constant error.
pub struct IdentityEstimator {
    pub error: f64,
}

impl RecursiveEstimator for IdentityEstimator {
    fn filter(
        &mut self, state: &StateVector, covariance: &Covariance, _signal: ArrayView1<f64>,
    ) -> TrackResult<EstimatorOutput> {
        Ok(EstimatorOutput { state: state.clone(), covariance: covariance.clone(), error: self.error })
    }
}

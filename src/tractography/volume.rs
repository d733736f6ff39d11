//! In-memory diffusion volume implementing [`SignalSource`].
//!
//! Purpose
//! -------
//! Hold an already-decoded diffusion-weighted image, its brain mask and the
//! optional CSF and seed-label maps as `ndarray` arrays, and answer the
//! queries the tracker makes along a path.
//!
//! Key behaviors
//! -------------
//! - Signal queries use trilinear interpolation over the 8 neighbouring
//!   voxels; coordinates are clamped into the volume first.
//! - Mask, CSF and label queries use the nearest voxel; positions outside
//!   the volume read as mask 0 and CSF 0.
//!
//! Invariants & assumptions
//! ------------------------
//! - The last signal axis has one entry per acquisition gradient.
//! - Companion maps share the three spatial dimensions of the signal.
//! - Voxel spacing is finite and strictly positive on every axis.
use crate::tractography::{
    collaborators::SignalSource,
    core::{signal_model::Acquisition, state::Vec3},
    errors::{TrackError, TrackResult},
};
use ndarray::{Array1, Array3, Array4, s};

#[derive(Debug, Clone, PartialEq)]
pub struct InMemoryVolume {
    signal: Array4<f64>,
    mask: Array3<f64>,
    csf: Option<Array3<f64>>,
    seed_labels: Option<Array3<i32>>,
    acquisition: Acquisition,
    spacing: [f64; 3],
}

impl InMemoryVolume {
    /// Build a volume from a 4-D signal, a mask and the acquisition scheme.
    ///
    /// # Errors
    /// - `SignalDimMismatch` if the gradient axis disagrees with `acquisition`.
    /// - `VolumeShapeMismatch` if the mask does not match the signal grid.
    /// - `InvalidVoxelSpacing` for a non-finite or non-positive spacing.
    pub fn new(
        signal: Array4<f64>, mask: Array3<f64>, acquisition: Acquisition, spacing: [f64; 3],
    ) -> TrackResult<Self> {
        let (nx, ny, nz, n) = signal.dim();
        if n != acquisition.len() {
            return Err(TrackError::SignalDimMismatch { expected: acquisition.len(), found: n });
        }
        check_grid("mask", [nx, ny, nz], mask.dim())?;
        for (axis, &value) in spacing.iter().enumerate() {
            if !value.is_finite() || value <= 0.0 {
                return Err(TrackError::InvalidVoxelSpacing { axis, value });
            }
        }
        Ok(Self { signal, mask, csf: None, seed_labels: None, acquisition, spacing })
    }

    /// Attach a CSF probability map.
    pub fn with_csf(mut self, csf: Array3<f64>) -> TrackResult<Self> {
        check_grid("csf", self.dimensions(), csf.dim())?;
        self.csf = Some(csf);
        Ok(self)
    }

    /// Attach a seed-label image.
    pub fn with_seed_labels(mut self, labels: Array3<i32>) -> TrackResult<Self> {
        check_grid("seed labels", self.dimensions(), labels.dim())?;
        self.seed_labels = Some(labels);
        Ok(self)
    }

    /// Nearest voxel of `position`, `None` outside the grid.
    fn nearest_voxel(&self, position: &Vec3) -> Option<[usize; 3]> {
        let dims = self.dimensions();
        let mut voxel = [0usize; 3];
        for axis in 0..3 {
            let c = position[axis].round();
            if !c.is_finite() || c < 0.0 || c > (dims[axis] - 1) as f64 {
                return None;
            }
            voxel[axis] = c as usize;
        }
        Some(voxel)
    }
}

impl SignalSource for InMemoryVolume {
    fn interp_signal(&self, position: &Vec3) -> Array1<f64> {
        let dims = self.dimensions();
        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        let mut frac = [0.0f64; 3];
        for axis in 0..3 {
            let max = (dims[axis] - 1) as f64;
            let c = if position[axis].is_finite() { position[axis].clamp(0.0, max) } else { 0.0 };
            let base = c.floor();
            lo[axis] = base as usize;
            hi[axis] = (lo[axis] + 1).min(dims[axis] - 1);
            frac[axis] = c - base;
        }

        let mut out = Array1::zeros(self.acquisition.len());
        for corner in 0..8 {
            let pick = |axis: usize| (corner >> axis) & 1 == 1;
            let mut weight = 1.0;
            let mut idx = [0usize; 3];
            for axis in 0..3 {
                if pick(axis) {
                    weight *= frac[axis];
                    idx[axis] = hi[axis];
                } else {
                    weight *= 1.0 - frac[axis];
                    idx[axis] = lo[axis];
                }
            }
            if weight == 0.0 {
                continue;
            }
            out.scaled_add(weight, &self.signal.slice(s![idx[0], idx[1], idx[2], ..]));
        }
        out
    }

    fn mask_value(&self, position: &Vec3) -> f64 {
        self.nearest_voxel(position).map_or(0.0, |v| self.mask[v])
    }

    fn csf_value(&self, position: &Vec3) -> Option<f64> {
        let csf = self.csf.as_ref()?;
        Some(self.nearest_voxel(position).map_or(0.0, |v| csf[v]))
    }

    fn voxel_spacing(&self) -> [f64; 3] {
        self.spacing
    }

    fn acquisition(&self) -> &Acquisition {
        &self.acquisition
    }

    fn dimensions(&self) -> [usize; 3] {
        let (nx, ny, nz, _) = self.signal.dim();
        [nx, ny, nz]
    }

    fn has_seed_labels(&self) -> bool {
        self.seed_labels.is_some()
    }

    fn seed_label(&self, voxel: [usize; 3]) -> Option<i32> {
        self.seed_labels.as_ref().and_then(|labels| labels.get(voxel).copied())
    }
}

// ---- Helper Methods ----

fn check_grid(what: &'static str, expected: [usize; 3], found: (usize, usize, usize)) -> TrackResult<()> {
    let found = [found.0, found.1, found.2];
    if found != expected || expected.contains(&0) {
        return Err(TrackError::VolumeShapeMismatch { what, expected, found });
    }
    Ok(())
}

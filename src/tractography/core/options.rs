//! Tractography options — configuration for seeding, propagation and output.
//!
//! Purpose
//! -------
//! Collect every tunable of a tractography run in one validated value so the
//! orchestrator, initializer and propagator receive explicit configuration
//! instead of ad-hoc arguments.
//!
//! Key behaviors
//! -------------
//! - [`TractographyOptions`] carries step geometry, stop thresholds, seeding
//!   controls, worker count, RNG seed, post-processing floor, the
//!   [`RecordFlags`] selecting optional per-sample diagnostics, and the
//!   [`SolverOptions`] used by the per-seed initializer.
//! - Derived step counts (`steps_per_record`, `max_steps`) are computed here
//!   so the propagator never repeats the rounding rules.
//!
//! Invariants & assumptions
//! ------------------------
//! - [`TractographyOptions::validate`] rejects non-positive lengths,
//!   non-finite thresholds, `seeds_per_voxel <= 0`, `p0 <= 0`, a zero
//!   worker count and `record_length < step_length`.
//! - Lengths are in millimetres.
//!
//! Conventions
//! -----------
//! - `Default` reproduces the documented defaults of the system.
//! - Options are plain data; call sites construct with struct-update syntax
//!   from `Default` and then call `validate`.
//!
//! Downstream usage
//! ----------------
//! - `Tractography::new` validates the options once; seeding and
//!   propagation read them by reference.
//!
//! Testing notes
//! -------------
//! - Unit tests cover defaults, derived step counts and each validation
//!   branch that a caller can realistically hit.
use crate::{
    optimization::bounded_optimizer::SolverOptions,
    tractography::errors::{TrackError, TrackResult},
};

/// Optional per-sample diagnostics.
///
/// Positions, normalized states and covariance norms are always recorded;
/// each flag adds one optional group to every [`FiberSample`].
///
/// [`FiberSample`]: crate::tractography::core::fiber::FiberSample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecordFlags {
    /// Normalized reconstruction error of the step.
    pub nmse: bool,
    /// Model and signal RTOP.
    pub rtop: bool,
    /// Mixing weights and inter-compartment angles.
    pub weights: bool,
    /// Tissue fraction `1 - w_iso`.
    pub free_water: bool,
    /// Covariance-block norms and weight variances.
    pub uncertainties: bool,
    /// Full covariance snapshot.
    pub covariance: bool,
}

impl RecordFlags {
    /// Every optional diagnostic enabled.
    pub fn all() -> Self {
        Self {
            nmse: true,
            rtop: true,
            weights: true,
            free_water: true,
            uncertainties: true,
            covariance: true,
        }
    }
}

/// TractographyOptions — configuration of one tractography run.
///
/// Fields
/// ------
/// - `step_length`: propagation step in mm.
/// - `record_length`: distance between recorded samples in mm.
/// - `max_half_fiber_length`: longest path followed from one seed, in mm.
/// - `min_radius`: curvature radius floor; tighter turns stop the fiber.
/// - `max_nmse`: ceiling on the estimator's normalized error.
/// - `rtop1_min_stop`: floor on the primary-compartment RTOP (0 disables).
/// - `fw_thresh`: ceiling on the free-water weight.
/// - `max_ukf_iterations`: refinement passes of the estimator per step.
/// - `p0`: diagonal prior of the seeding covariance.
/// - `seeding_threshold`: GFA floor in full-brain seeding mode.
/// - `seeds_per_voxel`: seeds per candidate voxel (fractional values thin
///   out the candidates).
/// - `labels`: seed-label values selecting candidate voxels.
/// - `num_threads`: worker count; `None` uses rayon's default.
/// - `random_seed`: seed of the jitter RNG.
/// - `min_fiber_samples`: shortest fiber kept by post-processing.
/// - `record`: optional diagnostics per sample.
/// - `solver`: options of the per-seed bounded solves.
#[derive(Debug, Clone, PartialEq)]
pub struct TractographyOptions {
    pub step_length: f64,
    pub record_length: f64,
    pub max_half_fiber_length: f64,
    pub min_radius: f64,
    pub max_nmse: f64,
    pub rtop1_min_stop: f64,
    pub fw_thresh: f64,
    pub max_ukf_iterations: usize,
    pub p0: f64,
    pub seeding_threshold: f64,
    pub seeds_per_voxel: f64,
    pub labels: Vec<i32>,
    pub num_threads: Option<usize>,
    pub random_seed: u64,
    pub min_fiber_samples: usize,
    pub record: RecordFlags,
    pub solver: SolverOptions,
}

impl Default for TractographyOptions {
    fn default() -> Self {
        Self {
            step_length: 0.3,
            record_length: 0.9,
            max_half_fiber_length: 250.0,
            min_radius: 0.87,
            max_nmse: 0.15,
            rtop1_min_stop: 0.0,
            fw_thresh: 0.65,
            max_ukf_iterations: 5,
            p0: 0.01,
            seeding_threshold: 0.18,
            seeds_per_voxel: 1.0,
            labels: vec![1],
            num_threads: None,
            random_seed: 0,
            min_fiber_samples: 2,
            record: RecordFlags::default(),
            solver: SolverOptions::default(),
        }
    }
}

impl TractographyOptions {
    /// Check every field for a usable value.
    ///
    /// # Errors
    /// `InvalidOption` naming the first offending field.
    pub fn validate(&self) -> TrackResult<()> {
        positive("step_length", self.step_length)?;
        positive("record_length", self.record_length)?;
        positive("max_half_fiber_length", self.max_half_fiber_length)?;
        positive("p0", self.p0)?;
        positive("seeds_per_voxel", self.seeds_per_voxel)?;
        finite("min_radius", self.min_radius)?;
        finite("max_nmse", self.max_nmse)?;
        finite("rtop1_min_stop", self.rtop1_min_stop)?;
        finite("fw_thresh", self.fw_thresh)?;
        finite("seeding_threshold", self.seeding_threshold)?;
        if self.record_length < self.step_length {
            return Err(TrackError::InvalidOption {
                name: "record_length",
                value: self.record_length,
                reason: "record length must not be shorter than the step length",
            });
        }
        if self.num_threads == Some(0) {
            return Err(TrackError::InvalidOption {
                name: "num_threads",
                value: 0.0,
                reason: "at least one worker thread is required",
            });
        }
        Ok(())
    }

    /// Propagation steps between two recorded samples, at least 1.
    pub fn steps_per_record(&self) -> usize {
        ((self.record_length / self.step_length).round() as usize).max(1)
    }

    /// Step count after which a fiber is stopped.
    pub fn max_steps(&self) -> usize {
        (self.max_half_fiber_length / self.step_length).ceil() as usize
    }
}

// ---- Helper Methods ----

fn positive(name: &'static str, value: f64) -> TrackResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(TrackError::InvalidOption { name, value, reason: "must be finite and > 0" });
    }
    Ok(())
}

fn finite(name: &'static str, value: f64) -> TrackResult<()> {
    if !value.is_finite() {
        return Err(TrackError::InvalidOption { name, value, reason: "must be finite" });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Documented defaults and the derived step counts.
    // - Validation of lengths, ratios and worker count.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Defaults validate and derive the expected step counts.
    //
    // Given
    // -----
    // - `TractographyOptions::default()`.
    //
    // Expect
    // ------
    // - `validate` passes, 3 steps per record, 834 max steps.
    fn defaults_validate_and_derive_step_counts() {
        // Arrange
        let opts = TractographyOptions::default();

        // Act
        let checked = opts.validate();

        // Assert
        assert!(checked.is_ok());
        assert_eq!(opts.steps_per_record(), 3);
        assert_eq!(opts.max_steps(), 834);
        assert_eq!(opts.labels, vec![1]);
    }

    #[test]
    // Purpose
    // -------
    // Records shorter than a step are rejected.
    //
    // Given
    // -----
    // - step 0.5, record 0.2.
    //
    // Expect
    // ------
    // - `InvalidOption` naming `record_length`.
    fn validate_rejects_record_shorter_than_step() {
        let opts = TractographyOptions { step_length: 0.5, record_length: 0.2, ..Default::default() };

        let err = opts.validate().expect_err("record < step must fail");

        assert!(matches!(err, TrackError::InvalidOption { name: "record_length", .. }));
    }

    #[test]
    // Purpose
    // -------
    // Non-positive lengths and zero workers are rejected.
    //
    // Given
    // -----
    // - step 0; seeds_per_voxel -1; num_threads Some(0).
    //
    // Expect
    // ------
    // - `InvalidOption` for each, with the matching name.
    fn validate_rejects_non_positive_values() {
        let cases = [
            (TractographyOptions { step_length: 0.0, ..Default::default() }, "step_length"),
            (TractographyOptions { seeds_per_voxel: -1.0, ..Default::default() }, "seeds_per_voxel"),
            (TractographyOptions { num_threads: Some(0), ..Default::default() }, "num_threads"),
        ];
        for (opts, expected) in cases {
            match opts.validate() {
                Err(TrackError::InvalidOption { name, .. }) => assert_eq!(name, expected),
                other => panic!("expected InvalidOption for {expected}, got {other:?}"),
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Decimation never drops to zero.
    //
    // Given
    // -----
    // - record 0.3, step 0.29.
    //
    // Expect
    // ------
    // - 1 step per record.
    fn steps_per_record_is_at_least_one() {
        let opts = TractographyOptions { step_length: 0.29, record_length: 0.3, ..Default::default() };
        assert_eq!(opts.steps_per_record(), 1);
    }
}

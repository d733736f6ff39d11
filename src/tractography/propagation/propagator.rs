//! Path propagator: follows one fiber from its seed until a stop rule fires.
//!
//! Purpose
//! -------
//! Drive the external recursive estimator along a streamline. Each step
//! samples the signal at the current position, refines the model state,
//! keeps the compartment ordering continuous, derives diagnostics and moves
//! one step along the primary orientation.
//!
//! Key behaviors
//! -------------
//! - **Refinement.** The estimator runs once on `(state, cov)`, then up to
//!   `max_ukf_iterations` more times on the refined state with the
//!   first-pass covariance. A pass that improves the error by less than
//!   [`REFINEMENT_TOLERANCE`] is rejected and ends the loop.
//! - **Reordering.** With `d_k = |m̂_k · previous direction|`, compartments
//!   1 and 2 are exchanged when `d1 < d2` and `d3 < d2`; otherwise 1 and 3
//!   are exchanged when `d1 < d3`. State and covariance move together.
//! - **Direction.** The unit primary orientation, sign-flipped to agree with
//!   the previous direction.
//! - **Recording.** The seed sample is always recorded. After step `n`, a
//!   sample is recorded when `(n + 1) % steps_per_record == 0` and no stop
//!   rule fired.
//!
//! Invariants & assumptions
//! ------------------------
//! - The working state is never normalized in place; recorded states are
//!   normalized copies.
//! - Estimator outputs are validated against the model dimension on every
//!   call.
//! - A recorded free-water complement in `[-1e-4, 0)` is stored as 0; below
//!   that the run fails with `NegativeFreeWater`.
//!
//! Downstream usage
//! ----------------
//! - The orchestrator builds one [`Propagator`] per worker and calls
//!   [`Propagator::follow`] for every seed in the worker's partition.
use crate::tractography::{
    collaborators::{RecursiveEstimator, SignalSource},
    core::{
        blocks::swap_compartments,
        diagnostics::{RtopDiagnostics, compartment_angles, covariance_norm, uncertainties},
        fiber::{Fiber, FiberSample, WeightSample},
        geometry::{curve_radius, step_displacement},
        options::TractographyOptions,
        state::{
            Covariance, N_COMPARTMENTS, StateVector, Vec3, free_water, normalized_copy,
            unit_orientation, validate_covariance, validate_state, weights,
        },
    },
    errors::{TrackError, TrackResult},
    propagation::stopping::{StepProbe, StopReason, StopRules},
    seeding::initializer::SeedPointInfo,
};
use ndarray::ArrayView1;

/// Minimum error improvement for a refinement pass to be accepted.
pub const REFINEMENT_TOLERANCE: f64 = 1.0e-3;

/// Largest negative free-water complement rounded to zero.
pub const FREE_WATER_TOLERANCE: f64 = 1.0e-4;

/// Number of recorded positions the curvature rule looks at.
const CURVATURE_WINDOW: usize = 3;

/// Working state of a fiber between steps.
#[derive(Debug, Clone, PartialEq)]
pub struct PathState {
    pub position: Vec3,
    /// Direction of the last step (unit length).
    pub direction: Vec3,
    pub state: StateVector,
    pub covariance: Covariance,
    pub nmse: f64,
    pub rtop: RtopDiagnostics,
}

impl PathState {
    pub fn from_seed(seed: &SeedPointInfo) -> Self {
        Self {
            position: seed.position,
            direction: seed.start_dir,
            state: seed.state.clone(),
            covariance: seed.covariance.clone(),
            nmse: 0.0,
            rtop: seed.rtop,
        }
    }
}

/// A finished fiber and why it stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct FiberOutcome {
    pub fiber: Fiber,
    pub stop: StopReason,
    /// Steps taken, including the one that triggered the stop.
    pub steps: usize,
    pub discarded: bool,
}

/// Follows fibers through one signal source.
#[derive(Debug, Clone)]
pub struct Propagator<'a, S: SignalSource> {
    source: &'a S,
    opts: &'a TractographyOptions,
    rules: StopRules,
    steps_per_record: usize,
}

impl<'a, S: SignalSource> Propagator<'a, S> {
    pub fn new(source: &'a S, opts: &'a TractographyOptions) -> Self {
        Self {
            source,
            opts,
            rules: StopRules::from_options(opts),
            steps_per_record: opts.steps_per_record(),
        }
    }

    /// Follow one fiber from `seed` to its first stop.
    ///
    /// # Errors
    /// - Layout errors for a malformed seed or estimator output.
    /// - `SignalDimMismatch` if the source returns a short signal.
    /// - Estimator failures, passed through.
    /// - `NegativeFreeWater` when recording an out-of-tolerance state.
    pub fn follow<E: RecursiveEstimator + ?Sized>(
        &self, seed: &SeedPointInfo, estimator: &mut E,
    ) -> TrackResult<FiberOutcome> {
        validate_state(&seed.state)?;
        validate_covariance(&seed.covariance)?;

        let mut path = PathState::from_seed(seed);
        let mut fiber = Fiber::with_capacity(self.rules.max_steps / self.steps_per_record + 2);
        fiber.push(self.sample(&path)?);

        let mut step = 0usize;
        loop {
            step += 1;
            self.step(&mut path, estimator)?;

            let probe = StepProbe {
                step,
                mask: self.source.mask_value(&path.position),
                csf: self.source.csf_value(&path.position),
                rtop1: path.rtop.rtop1,
                free_water_weight: free_water(&path.state),
                curve_radius: curve_radius(
                    &fiber.tail_positions(CURVATURE_WINDOW),
                    &self.source.voxel_spacing(),
                ),
                nmse: path.nmse,
            };
            if let Some(stop) = self.rules.check(&probe) {
                log::debug!(
                    "fiber from {:?} stopped after {step} steps: {stop}",
                    seed.position
                );
                return Ok(FiberOutcome { fiber, stop, steps: step, discarded: stop.discards() });
            }

            if (step + 1) % self.steps_per_record == 0 {
                fiber.push(self.sample(&path)?);
            }
        }
    }

    /// Advance `path` by one step.
    ///
    /// # Errors
    /// See [`Propagator::follow`].
    pub fn step<E: RecursiveEstimator + ?Sized>(
        &self, path: &mut PathState, estimator: &mut E,
    ) -> TrackResult<()> {
        let signal = self.source.interp_signal(&path.position);
        let expected = self.source.signal_dimension();
        if signal.len() != expected {
            return Err(TrackError::SignalDimMismatch { expected, found: signal.len() });
        }

        let (state, covariance, nmse) =
            self.refine(estimator, &path.state, &path.covariance, signal.view())?;
        let (state, covariance) = reorder_compartments(state, covariance, &path.direction)?;

        let direction = aligned_primary(&state, &path.direction);
        path.rtop = RtopDiagnostics::compute(&state, signal.view());
        path.position +=
            step_displacement(&direction, &self.source.voxel_spacing(), self.opts.step_length);
        path.direction = direction;
        path.state = state;
        path.covariance = covariance;
        path.nmse = nmse;
        Ok(())
    }

    /// Estimator pass followed by accepted refinement passes.
    ///
    /// Returns `(state, first-pass covariance, error of the returned state)`.
    pub fn refine<E: RecursiveEstimator + ?Sized>(
        &self, estimator: &mut E, state: &StateVector, covariance: &Covariance,
        signal: ArrayView1<f64>,
    ) -> TrackResult<(StateVector, Covariance, f64)> {
        let first = estimator.filter(state, covariance, signal)?;
        validate_state(&first.state)?;
        validate_covariance(&first.covariance)?;

        let covariance = first.covariance;
        let mut state = first.state;
        let mut error = first.error;
        for _ in 0..self.opts.max_ukf_iterations {
            let next = estimator.filter(&state, &covariance, signal)?;
            validate_state(&next.state)?;
            if error - next.error < REFINEMENT_TOLERANCE {
                break;
            }
            state = next.state;
            error = next.error;
        }
        Ok((state, covariance, error))
    }

    /// Recorded sample of `path`, honoring the record flags.
    ///
    /// # Errors
    /// `NegativeFreeWater` if free water is recorded and out of tolerance.
    pub fn sample(&self, path: &PathState) -> TrackResult<FiberSample> {
        let flags = self.opts.record;
        let recorded_free_water =
            if flags.free_water { Some(free_water_fraction(&path.state)?) } else { None };
        let weight_sample = flags.weights.then(|| {
            let (angle_12, angle_13) = compartment_angles(&path.state);
            WeightSample {
                weights: weights(&path.state),
                free_water_weight: free_water(&path.state),
                angle_12,
                angle_13,
            }
        });
        Ok(FiberSample {
            position: path.position,
            state: normalized_copy(&path.state),
            covariance_norm: covariance_norm(&path.covariance),
            nmse: flags.nmse.then_some(path.nmse),
            rtop: flags.rtop.then_some(path.rtop),
            weights: weight_sample,
            free_water: recorded_free_water,
            uncertainties: flags.uncertainties.then(|| uncertainties(&path.covariance)),
            covariance: flags.covariance.then(|| path.covariance.clone()),
        })
    }
}

// ---- Helper Methods ----

/// Recorded free-water value `1 - w_iso`.
///
/// # Errors
/// `NegativeFreeWater` below `-FREE_WATER_TOLERANCE`.
pub fn free_water_fraction(state: &StateVector) -> TrackResult<f64> {
    let fw = 1.0 - free_water(state);
    if fw >= 0.0 {
        return Ok(fw);
    }
    if fw >= -FREE_WATER_TOLERANCE {
        log::warn!("free water {fw:.2e} within tolerance, recorded as 0");
        return Ok(0.0);
    }
    Err(TrackError::NegativeFreeWater { value: fw })
}

/// Exchange compartments so the primary stays closest to `previous`.
pub fn reorder_compartments(
    state: StateVector, covariance: Covariance, previous: &Vec3,
) -> TrackResult<(StateVector, Covariance)> {
    let mut alignment = [0.0; N_COMPARTMENTS];
    for (k, d) in alignment.iter_mut().enumerate() {
        *d = unit_orientation(&state, k).dot(previous).abs();
    }
    let [d1, d2, d3] = alignment;
    if d1 < d2 && d3 < d2 {
        swap_compartments(&state, &covariance, 0, 1)
    } else if d1 < d3 {
        swap_compartments(&state, &covariance, 0, 2)
    } else {
        Ok((state, covariance))
    }
}

/// Unit primary orientation, flipped to agree with `previous`.
///
/// A degenerate (zero) primary keeps the previous direction.
fn aligned_primary(state: &StateVector, previous: &Vec3) -> Vec3 {
    let primary = unit_orientation(state, 0);
    if primary == Vec3::zeros() {
        return *previous;
    }
    if primary.dot(previous) < 0.0 { -primary } else { primary }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tractography::{
        collaborators::EstimatorOutput,
        core::{
            options::RecordFlags,
            signal_model::Acquisition,
            state::{
                FREE_WATER_INDEX, STATE_DIM, fast_index, initial_covariance, set_orientation,
                slow_index, weight_index,
            },
        },
        volume::InMemoryVolume,
    };
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2, Array3, Array4, array};

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The refinement loop's accept/reject rule.
    // - Compartment reordering and direction sign alignment.
    // - Stop reasons and recording cadence along a synthetic line volume.
    // - Free-water tolerance handling.
    // -------------------------------------------------------------------------

    /// Returns its input unchanged with a constant error.
    struct Identity {
        error: f64,
    }

    impl RecursiveEstimator for Identity {
        fn filter(
            &mut self, state: &StateVector, covariance: &Covariance, _signal: ArrayView1<f64>,
        ) -> TrackResult<EstimatorOutput> {
            Ok(EstimatorOutput { state: state.clone(), covariance: covariance.clone(), error: self.error })
        }
    }

    /// Replays a list of errors and tags each output state with its call index.
    struct Scripted {
        errors: Vec<f64>,
        calls: usize,
    }

    impl RecursiveEstimator for Scripted {
        fn filter(
            &mut self, state: &StateVector, covariance: &Covariance, _signal: ArrayView1<f64>,
        ) -> TrackResult<EstimatorOutput> {
            let mut out = state.clone();
            out[fast_index(2)] = self.calls as f64;
            let mut cov = covariance.clone();
            cov[[0, 0]] += 1.0;
            let error = self.errors[self.calls.min(self.errors.len() - 1)];
            self.calls += 1;
            Ok(EstimatorOutput { state: out, covariance: cov, error })
        }
    }

    /// Identity until `turn_at` calls, then points every compartment across
    /// the initial heading (x) so no reordering can undo the turn.
    struct Turning {
        turn_at: usize,
        calls: usize,
    }

    impl RecursiveEstimator for Turning {
        fn filter(
            &mut self, state: &StateVector, covariance: &Covariance, _signal: ArrayView1<f64>,
        ) -> TrackResult<EstimatorOutput> {
            let mut out = state.clone();
            if self.calls >= self.turn_at {
                set_orientation(&mut out, 0, &Vec3::new(0.0, 1.0, 0.0));
                set_orientation(&mut out, 1, &Vec3::new(0.0, 0.0, 1.0));
                set_orientation(&mut out, 2, &Vec3::new(0.0, 0.0, 1.0));
            }
            self.calls += 1;
            Ok(EstimatorOutput { state: out, covariance: covariance.clone(), error: 0.01 })
        }
    }

    fn acquisition() -> Acquisition {
        let grads = Array2::from_shape_vec((2, 3), vec![1.0, 0.0, 0.0, -1.0, 0.0, 0.0]).expect("shape");
        Acquisition::new(grads, array![1000.0, 1000.0]).expect("valid acquisition")
    }

    /// A 1×1×`len` line of voxels along the third storage axis.
    fn line_volume(len: usize, mask: f64) -> InMemoryVolume {
        InMemoryVolume::new(
            Array4::from_elem((1, 1, len, 2), 0.5),
            Array3::from_elem((1, 1, len), mask),
            acquisition(),
            [1.0; 3],
        )
        .expect("volume")
    }

    fn model_state(primary: Vec3, second: Vec3) -> StateVector {
        let mut state = Array1::zeros(STATE_DIM);
        set_orientation(&mut state, 0, &primary);
        set_orientation(&mut state, 1, &second);
        set_orientation(&mut state, 2, &Vec3::new(0.0, 0.0, 1.0));
        for k in 0..N_COMPARTMENTS {
            state[fast_index(k)] = 1700.0;
            state[fast_index(k) + 1] = 300.0;
            state[slow_index(k)] = 1190.0;
            state[slow_index(k) + 1] = 210.0;
        }
        state[weight_index(0)] = 0.7;
        state[weight_index(1)] = 0.3;
        state[FREE_WATER_INDEX] = 0.05;
        state
    }

    /// Seed at the first voxel heading along +x, which moves along storage z.
    fn seed() -> SeedPointInfo {
        let state = model_state(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        SeedPointInfo {
            position: Vec3::zeros(),
            start_dir: Vec3::new(1.0, 0.0, 0.0),
            rtop: RtopDiagnostics::default(),
            state,
            covariance: initial_covariance(0.01),
        }
    }

    #[test]
    // Purpose
    // -------
    // Refinement keeps passes that improve the error by at least 1e-3 and
    // drops the first one that does not.
    //
    // Given
    // -----
    // - Errors 0.5 (first pass), 0.3 (accepted), 0.2995 (rejected).
    //
    // Expect
    // ------
    // - The state of call 1, error 0.3, first-pass covariance, 3 calls.
    fn refine_rejects_small_improvements() {
        // Arrange
        let vol = line_volume(3, 1.0);
        let opts = TractographyOptions::default();
        let propagator = Propagator::new(&vol, &opts);
        let mut estimator = Scripted { errors: vec![0.5, 0.3, 0.2995], calls: 0 };
        let seed = seed();
        let signal = vol.interp_signal(&seed.position);

        // Act
        let (state, cov, error) = propagator
            .refine(&mut estimator, &seed.state, &seed.covariance, signal.view())
            .expect("refine");

        // Assert
        assert_eq!(estimator.calls, 3);
        assert_eq!(state[fast_index(2)], 1.0);
        assert_relative_eq!(error, 0.3);
        assert_relative_eq!(cov[[0, 0]], 1.01);
    }

    #[test]
    // Purpose
    // -------
    // A secondary compartment better aligned with the previous direction is
    // promoted to primary, and the step follows it with a consistent sign.
    //
    // Given
    // -----
    // - Primary along y, second compartment along -x, previous direction +x.
    //
    // Expect
    // ------
    // - Compartments 1 and 2 exchanged (weights follow), direction +x.
    fn reorder_promotes_aligned_compartment() {
        // Arrange
        let state = model_state(Vec3::new(0.0, 1.0, 0.0), Vec3::new(-1.0, 0.0, 0.0));
        let previous = Vec3::new(1.0, 0.0, 0.0);

        // Act
        let (swapped, _) =
            reorder_compartments(state.clone(), initial_covariance(0.01), &previous).expect("swap");
        let direction = aligned_primary(&swapped, &previous);

        // Assert
        assert_relative_eq!(unit_orientation(&swapped, 0), Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(swapped[weight_index(0)], state[weight_index(1)]);
        assert_relative_eq!(direction, previous);
    }

    #[test]
    // Purpose
    // -------
    // A seed outside the mask stops after its first step with nothing but
    // the seed sample recorded.
    //
    // Given
    // -----
    // - A volume whose mask is 0 everywhere.
    //
    // Expect
    // ------
    // - `OutsideMask`, 1 step, 0 recorded steps, not discarded.
    fn seed_outside_mask_records_no_steps() {
        let vol = line_volume(3, 0.0);
        let opts = TractographyOptions::default();

        let outcome = Propagator::new(&vol, &opts).follow(&seed(), &mut Identity { error: 0.01 }).expect("follow");

        assert_eq!(outcome.stop, StopReason::OutsideMask);
        assert_eq!(outcome.steps, 1);
        assert_eq!(outcome.fiber.recorded_steps(), 0);
        assert!(!outcome.discarded);
    }

    #[test]
    // Purpose
    // -------
    // Along a straight line the fiber walks until it leaves the volume and
    // records every third step.
    //
    // Given
    // -----
    // - A 3-voxel line, unit spacing, step 0.3, record every 0.9.
    //
    // Expect
    // ------
    // - Stop at step 9 (z = 2.7 rounds outside), samples after steps 2, 5
    //   and 8 plus the seed, unit orientations in every recorded state.
    fn straight_line_walks_to_volume_edge() {
        // Arrange
        let vol = line_volume(3, 1.0);
        let opts = TractographyOptions { record: RecordFlags::all(), ..Default::default() };

        // Act
        let outcome = Propagator::new(&vol, &opts).follow(&seed(), &mut Identity { error: 0.01 }).expect("follow");

        // Assert
        assert_eq!(outcome.stop, StopReason::OutsideMask);
        assert_eq!(outcome.steps, 9);
        assert_eq!(outcome.fiber.len(), 4);
        let last = outcome.fiber.samples.last().expect("samples");
        assert_relative_eq!(last.position.z, 2.4, epsilon = 1e-9);
        assert_relative_eq!(last.free_water.expect("free water"), 0.95);
        assert_relative_eq!(unit_orientation(&last.state, 1).norm(), 1.0);
        assert!(last.uncertainties.is_some() && last.covariance.is_some());
    }

    #[test]
    // Purpose
    // -------
    // CSF discards the fiber; a high error and the step cap stop it.
    //
    // Given
    // -----
    // - A CSF map of 0.9; an estimator error of 0.5; 0.5 mm steps with a
    //   1.5 mm half-length (3 steps allowed).
    //
    // Expect
    // ------
    // - `InCsf` (discarded), `HighError` at step 1, `MaxSteps` at step 4.
    fn csf_error_and_length_stops() {
        // Arrange
        let csf_vol = line_volume(10, 1.0).with_csf(Array3::from_elem((1, 1, 10), 0.9)).expect("csf");
        let vol = line_volume(10, 1.0);
        let opts = TractographyOptions::default();
        let short = TractographyOptions {
            step_length: 0.5,
            record_length: 1.0,
            max_half_fiber_length: 1.5,
            ..Default::default()
        };

        // Act
        let in_csf = Propagator::new(&csf_vol, &opts).follow(&seed(), &mut Identity { error: 0.01 });
        let noisy = Propagator::new(&vol, &opts).follow(&seed(), &mut Identity { error: 0.5 });
        let capped = Propagator::new(&vol, &short).follow(&seed(), &mut Identity { error: 0.01 });

        // Assert
        let in_csf = in_csf.expect("csf run");
        assert_eq!((in_csf.stop, in_csf.discarded), (StopReason::InCsf, true));
        let noisy = noisy.expect("noisy run");
        assert_eq!((noisy.stop, noisy.steps), (StopReason::HighError, 1));
        let capped = capped.expect("capped run");
        assert_eq!((capped.stop, capped.steps), (StopReason::MaxSteps, 4));
    }

    #[test]
    // Purpose
    // -------
    // Slightly negative free water is rounded; larger deficits are fatal.
    //
    // Given
    // -----
    // - w_iso = 1.00005 and w_iso = 1.01.
    //
    // Expect
    // ------
    // - 0 and `NegativeFreeWater` respectively.
    fn free_water_tolerance() {
        let mut state = model_state(Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0));
        state[FREE_WATER_INDEX] = 1.00005;
        assert_eq!(free_water_fraction(&state), Ok(0.0));

        state[FREE_WATER_INDEX] = 1.01;
        assert!(matches!(free_water_fraction(&state), Err(TrackError::NegativeFreeWater { .. })));
    }

    #[test]
    // Purpose
    // -------
    // A sharp turn between recorded samples stops the fiber on curvature.
    //
    // Given
    // -----
    // - A 1×5×5 volume at unit spacing, step 0.3, record every 0.9, one
    //   estimator call per step.
    // - Heading +x (storage z) for 5 steps, then +y (storage y).
    //
    // Expect
    // ------
    // - Samples at z = 0.6, z = 1.5 and (y, z) = (0.9, 1.5): a right angle
    //   over 0.9 mm segments, radius 0.9/√2 ≈ 0.64 < 0.87.
    // - `Curvature` at step 9, not discarded.
    fn sharp_turn_stops_on_curvature() {
        // Arrange
        let vol = InMemoryVolume::new(
            Array4::from_elem((1, 5, 5, 2), 0.5),
            Array3::ones((1, 5, 5)),
            acquisition(),
            [1.0; 3],
        )
        .expect("volume");
        let opts = TractographyOptions { max_ukf_iterations: 0, ..Default::default() };
        let mut estimator = Turning { turn_at: 5, calls: 0 };

        // Act
        let outcome = Propagator::new(&vol, &opts).follow(&seed(), &mut estimator).expect("follow");

        // Assert
        assert_eq!(outcome.stop, StopReason::Curvature);
        assert_eq!(outcome.steps, 9);
        assert!(!outcome.discarded);
        let last = outcome.fiber.samples.last().expect("samples").position;
        assert_relative_eq!(last, Vec3::new(0.0, 0.9, 1.5), epsilon = 1e-9);
    }
}

//! Per-seed state initializer.
//!
//! Purpose
//! -------
//! Turn the raw signal at one starting point and the branch directions found
//! there into fully populated [`SeedPointInfo`] records, each paired with its
//! orientation-reversed twin.
//!
//! Key behaviors
//! -------------
//! - **Coarse state.** Detected directions fill the orientation slots; with
//!   fewer than three, the free slots get an orthogonal frame. Fast pairs come
//!   from the single-tensor fit `(λ1, (λ2+λ3)/2)`, slow pairs are 0.7× the
//!   fast pair, weights are the normalized branch magnitudes and the
//!   free-water weight starts at 0.05.
//! - **Phase 1** refines the 13 shape parameters with orientations and
//!   weights fixed; **phase 2** refines the three weights on the phase-1
//!   result. Each phase is its own objective and its own bounded solve.
//! - **Emission.** The fitted state and its twin are always emitted. With two
//!   or more directions the state with compartments 1 and 2 exchanged follows,
//!   and with three the state with the (already exchanged) first and third
//!   compartments exchanged.
//!
//! Invariants & assumptions
//! ------------------------
//! - A failed refinement phase that is not a precondition violation keeps the
//!   state it started from and is logged at `warn`.
//! - Every emitted record carries a `p0`-diagonal covariance.
//!
//! Downstream usage
//! ----------------
//! - `seeding::seeds::generate_seeds` calls [`SeedInitializer::initialize`]
//!   once per accepted starting point.
use crate::{
    optimization::bounded_optimizer::{SolverOptions, minimize_bounded},
    tractography::{
        collaborators::BranchDirections,
        core::{
            blocks::swap_compartments,
            diagnostics::{RtopDiagnostics, rtop_from_signal, rtop_from_state},
            signal_model::Acquisition,
            state::{
                Covariance, FREE_WATER_INDEX, INITIAL_FREE_WATER, N_COMPARTMENTS, SLOW_SEED_RATIO,
                STATE_DIM, StateVector, Vec3, fast_index, initial_covariance, inverse_twin,
                orientation, set_orientation, slow_index, weight_index,
            },
            tensor::TensorFit,
        },
        errors::TrackResult,
        seeding::objective::{FitPhase, SignalFitObjective},
    },
};
use ndarray::{Array1, ArrayView1};

/// Initial conditions of one fiber.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedPointInfo {
    /// Continuous voxel-index position.
    pub position: Vec3,
    /// Direction of the first step.
    pub start_dir: Vec3,
    pub rtop: RtopDiagnostics,
    pub state: StateVector,
    pub covariance: Covariance,
}

/// Builds seed records from a signal sample and its branch directions.
#[derive(Debug, Clone)]
pub struct SeedInitializer<'a> {
    acquisition: &'a Acquisition,
    solver: &'a SolverOptions,
    p0: f64,
}

impl<'a> SeedInitializer<'a> {
    pub fn new(acquisition: &'a Acquisition, solver: &'a SolverOptions, p0: f64) -> Self {
        Self { acquisition, solver, p0 }
    }

    /// Seed records for `signal` at `position`.
    ///
    /// Returns 2, 4 or 6 records: one `(info, twin)` pair per emitted
    /// ordering of the compartments.
    ///
    /// # Errors
    /// - Tensor-fit failures (`TensorFitFailed`, `SignalDimMismatch`).
    /// - Solver precondition violations, wrapped as `Optimization`.
    pub fn initialize(
        &self, position: Vec3, signal: ArrayView1<f64>, branches: &BranchDirections,
    ) -> TrackResult<Vec<SeedPointInfo>> {
        let tensor = TensorFit::fit(signal, self.acquisition)?;
        let (coarse, n_dirs) = coarse_state(&tensor, branches);
        let fitted = self.refine(coarse, signal)?;

        let signal_rtop = rtop_from_signal(signal);
        let cov = initial_covariance(self.p0);
        let mut seeds = Vec::with_capacity(6);
        self.push_pair(&mut seeds, position, &fitted, &cov, signal_rtop);

        if n_dirs > 1 {
            let (swapped, swapped_cov) = swap_compartments(&fitted, &cov, 0, 1)?;
            self.push_pair(&mut seeds, position, &swapped, &swapped_cov, signal_rtop);
            if n_dirs > 2 {
                let (swapped, swapped_cov) = swap_compartments(&swapped, &swapped_cov, 0, 2)?;
                self.push_pair(&mut seeds, position, &swapped, &swapped_cov, signal_rtop);
            }
        }
        Ok(seeds)
    }

    /// Phase 1 (shape) then phase 2 (weights) on the result of phase 1.
    ///
    /// # Errors
    /// Only solver precondition violations; numerical failures keep the
    /// phase's start state.
    pub fn refine(&self, coarse: StateVector, signal: ArrayView1<f64>) -> TrackResult<StateVector> {
        let shaped = self.run_phase(coarse, FitPhase::Shape, signal)?;
        self.run_phase(shaped, FitPhase::Weights, signal)
    }

    fn run_phase(
        &self, base: StateVector, phase: FitPhase, signal: ArrayView1<f64>,
    ) -> TrackResult<StateVector> {
        let objective = SignalFitObjective::new(base, phase, signal, self.acquisition);
        let (lb, ub) = phase.bounds();
        let x0 = objective.start();
        match minimize_bounded(&objective, &x0, &lb, &ub, self.solver) {
            Ok(outcome) => {
                log::debug!(
                    "{phase:?} refinement: error {:.3e} after {} iterations ({})",
                    outcome.value,
                    outcome.iterations,
                    outcome.status
                );
                Ok(objective.assemble(&outcome.x_hat))
            }
            Err(err) if err.is_precondition() => Err(err.into()),
            Err(err) => {
                log::warn!("{phase:?} refinement failed ({err}); keeping the unrefined parameters");
                let kept: Array1<f64> = x0
                    .iter()
                    .zip(lb.iter().zip(ub.iter()))
                    .map(|(&x, (&l, &u))| x.clamp(l, u))
                    .collect();
                Ok(objective.assemble(&kept))
            }
        }
    }

    fn push_pair(
        &self, seeds: &mut Vec<SeedPointInfo>, position: Vec3, state: &StateVector, cov: &Covariance,
        signal_rtop: f64,
    ) {
        let ([rtop1, rtop2, rtop3], rtop_model) = rtop_from_state(state);
        let rtop = RtopDiagnostics { rtop1, rtop2, rtop3, rtop_model, rtop_signal: signal_rtop };
        let twin = inverse_twin(state);
        seeds.push(SeedPointInfo {
            position,
            start_dir: orientation(state, 0),
            rtop,
            state: state.clone(),
            covariance: cov.clone(),
        });
        seeds.push(SeedPointInfo {
            position,
            start_dir: orientation(&twin, 0),
            rtop,
            state: twin,
            covariance: cov.clone(),
        });
    }
}

/// Coarse state from a tensor fit and branch directions.
///
/// Returns the state and the number of usable directions (0–3). With no
/// usable direction the tensor's principal axis is used as the single one.
pub fn coarse_state(tensor: &TensorFit, branches: &BranchDirections) -> (StateVector, usize) {
    let mut dirs: Vec<(Vec3, f64)> = branches
        .directions
        .iter()
        .zip(branches.magnitudes.iter().chain(std::iter::repeat(&0.0)))
        .filter_map(|(d, &w)| {
            let n = d.norm();
            (n > 0.0 && n.is_finite()).then(|| (d / n, if w.is_finite() { w.max(0.0) } else { 0.0 }))
        })
        .take(N_COMPARTMENTS)
        .collect();
    let n_dirs = dirs.len();
    if dirs.is_empty() {
        dirs.push((tensor.principal, 1.0));
    }

    let primary = dirs[0].0;
    let frame: [Vec3; 3] = match dirs.len() {
        1 => {
            let o1 = orthogonal_to(&primary);
            [primary, o1, unit_or(&primary.cross(&o1), &o1)]
        }
        2 => {
            let second = dirs[1].0;
            let third = primary.cross(&second);
            let third = if third.norm() > 0.0 { third.normalize() } else { orthogonal_to(&primary) };
            [primary, second, third]
        }
        _ => [primary, dirs[1].0, dirs[2].0],
    };

    let mut weights = [0.0; 3];
    if dirs.len() == 1 {
        weights[0] = 1.0;
    } else {
        let total: f64 = dirs.iter().map(|(_, w)| w).sum();
        if total > 0.0 {
            for (k, (_, w)) in dirs.iter().enumerate() {
                weights[k] = w / total;
            }
        } else {
            weights[0] = 1.0;
        }
    }

    let (axial, radial) = tensor.axial_radial();
    let mut state = Array1::zeros(STATE_DIM);
    for k in 0..N_COMPARTMENTS {
        set_orientation(&mut state, k, &frame[k]);
        state[fast_index(k)] = axial;
        state[fast_index(k) + 1] = radial;
        state[slow_index(k)] = SLOW_SEED_RATIO * axial;
        state[slow_index(k) + 1] = SLOW_SEED_RATIO * radial;
        state[weight_index(k)] = weights[k];
    }
    state[FREE_WATER_INDEX] = INITIAL_FREE_WATER;
    (state, n_dirs)
}

// ---- Helper Methods ----

/// Unit vector orthogonal to the unit vector `d`, `(-d_y, d_x, 0)` when it
/// exists.
fn orthogonal_to(d: &Vec3) -> Vec3 {
    let candidate = Vec3::new(-d.y, d.x, 0.0);
    if candidate.norm() > 1e-12 {
        candidate.normalize()
    } else {
        Vec3::new(0.0, -d.z, d.y).normalize()
    }
}

fn unit_or(v: &Vec3, fallback: &Vec3) -> Vec3 {
    let n = v.norm();
    if n > 0.0 && n.is_finite() { v / n } else { *fallback }
}

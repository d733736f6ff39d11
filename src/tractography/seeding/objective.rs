//! Signal-reconstruction objective for the per-seed refinement phases.
//!
//! Purpose
//! -------
//! Expose the normalized signal-reconstruction error of a partially free
//! model state as an [`Objective`] for the bounded solver. Each
//! [`FitPhase`] names the state slots it frees and their box; every other
//! slot is held at the value of the base state.
//!
//! Key behaviors
//! -------------
//! - [`FitPhase::Shape`] frees the 12 diffusivities and the free-water
//!   weight (13 parameters).
//! - [`FitPhase::Weights`] frees the three compartment weights.
//! - The gradient is a one-sided relative-step finite difference of the
//!   error, so diffusivities in the thousands and weights below one get
//!   comparable probes.
//!
//! Invariants & assumptions
//! ------------------------
//! - Each objective owns its base state; two phases never share mutable
//!   buffers. Phase 2 is built from the state phase 1 returned.
use crate::{
    optimization::{
        bounded_optimizer::{Cost, Grad, Objective, Theta, relative_forward_diff},
        errors::{OptError, OptResult},
    },
    tractography::core::{
        signal_model::{Acquisition, normalized_error, predict_signal},
        state::{
            FAST_RANGE, FREE_WATER_INDEX, N_COMPARTMENTS, SLOW_RANGE, StateVector, WEIGHT_RANGE,
            fast_index, slow_index, weight_index,
        },
    },
};
use ndarray::{Array1, ArrayView1};

/// Which slots of the state a refinement phase optimizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitPhase {
    /// Diffusivities of all compartments and the free-water weight.
    Shape,
    /// Compartment mixing weights.
    Weights,
}

impl FitPhase {
    /// Free state indices, in parameter order.
    pub fn indices(self) -> Vec<usize> {
        match self {
            FitPhase::Shape => {
                let mut idx = Vec::with_capacity(4 * N_COMPARTMENTS + 1);
                for k in 0..N_COMPARTMENTS {
                    idx.extend([fast_index(k), fast_index(k) + 1, slow_index(k), slow_index(k) + 1]);
                }
                idx.push(FREE_WATER_INDEX);
                idx
            }
            FitPhase::Weights => (0..N_COMPARTMENTS).map(weight_index).collect(),
        }
    }

    /// `(lower, upper)` box over [`FitPhase::indices`].
    pub fn bounds(self) -> (Theta, Theta) {
        match self {
            FitPhase::Shape => {
                let mut lb = Vec::with_capacity(13);
                let mut ub = Vec::with_capacity(13);
                for _ in 0..N_COMPARTMENTS {
                    lb.extend([FAST_RANGE.0, FAST_RANGE.0, SLOW_RANGE.0, SLOW_RANGE.0]);
                    ub.extend([FAST_RANGE.1, FAST_RANGE.1, SLOW_RANGE.1, SLOW_RANGE.1]);
                }
                lb.push(WEIGHT_RANGE.0);
                ub.push(WEIGHT_RANGE.1);
                (Array1::from(lb), Array1::from(ub))
            }
            FitPhase::Weights => (
                Array1::from_elem(N_COMPARTMENTS, WEIGHT_RANGE.0),
                Array1::from_elem(N_COMPARTMENTS, WEIGHT_RANGE.1),
            ),
        }
    }
}

/// Normalized reconstruction error of `base` with the phase slots free.
///
/// `'s` borrows the signal sample, `'a` the acquisition.
#[derive(Debug, Clone)]
pub struct SignalFitObjective<'s, 'a> {
    base: StateVector,
    phase: FitPhase,
    indices: Vec<usize>,
    signal: ArrayView1<'s, f64>,
    acquisition: &'a Acquisition,
}

impl<'s, 'a> SignalFitObjective<'s, 'a> {
    pub fn new(
        base: StateVector, phase: FitPhase, signal: ArrayView1<'s, f64>, acquisition: &'a Acquisition,
    ) -> Self {
        let indices = phase.indices();
        Self { base, phase, indices, signal, acquisition }
    }

    pub fn phase(&self) -> FitPhase {
        self.phase
    }

    /// Current values of the free slots in `base`.
    pub fn start(&self) -> Theta {
        self.indices.iter().map(|&i| self.base[i]).collect()
    }

    /// `base` with the free slots replaced by `x`.
    pub fn assemble(&self, x: &Theta) -> StateVector {
        let mut state = self.base.clone();
        for (&i, &v) in self.indices.iter().zip(x.iter()) {
            state[i] = v;
        }
        state
    }
}

impl Objective for SignalFitObjective<'_, '_> {
    fn value(&self, x: &Theta) -> OptResult<Cost> {
        let predicted = predict_signal(&self.assemble(x), self.acquisition)
            .map_err(|_| OptError::ObjectiveDimMismatch { expected: self.base.len(), found: x.len() })?;
        normalized_error(self.signal, predicted.view())
            .map_err(|_| OptError::ObjectiveDimMismatch { expected: self.signal.len(), found: predicted.len() })
    }

    fn grad(&self, x: &Theta) -> OptResult<Grad> {
        let fx = self.value(x)?;
        relative_forward_diff(x, fx, &|p: &Theta| self.value(p))
    }

    fn check(&self, x0: &Theta) -> OptResult<()> {
        if x0.len() != self.indices.len() {
            return Err(OptError::ObjectiveDimMismatch { expected: self.indices.len(), found: x0.len() });
        }
        Ok(())
    }
}

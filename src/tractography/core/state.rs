//! Model state — fixed 25-entry layout of the three-compartment,
//! free-water diffusion model.
//!
//! Purpose
//! -------
//! Name every slot of the state vector once, and provide the small, pure
//! operations the rest of the tracker performs on it: validation,
//! orientation access, clamping into the admissible ranges, normalized
//! snapshots for recording, the orientation-reversed twin, and the seeding
//! covariance.
//!
//! Layout
//! ------
//! For compartment `k ∈ {0, 1, 2}` (stride 7):
//! - `7k .. 7k+3`   orientation `m_k` (unit length when used),
//! - `7k+3, 7k+4`   fast pair `(λ∥, λ⊥)` in `[1, 3000]`,
//! - `7k+5, 7k+6`   slow pair `(λ∥, λ⊥)` in `[0.1, 3000]`,
//! - `21 + k`       mixing weight `w_k` in `[0, 1]`.
//!
//! Index 24 holds the free-water weight `w_iso` in `[0, 1]`.
//!
//! Conventions
//! -----------
//! - Diffusivities are stored in units of 1e-6 mm²/s (`1700` ≙ 1.7e-3 mm²/s).
//! - Orientations are physical `(x, y, z)` directions.
//! - Nothing here mutates orientation length in place except
//!   [`normalize_orientations`]; recording always works on copies.
use crate::tractography::errors::{TrackError, TrackResult};
use nalgebra::Vector3;
use ndarray::{Array1, Array2};

/// State vector of the model.
pub type StateVector = Array1<f64>;

/// Estimator covariance, `STATE_DIM × STATE_DIM`.
pub type Covariance = Array2<f64>;

/// 3-vector used for positions and orientations.
pub type Vec3 = Vector3<f64>;

pub const STATE_DIM: usize = 25;
pub const N_COMPARTMENTS: usize = 3;
pub const COMPARTMENT_STRIDE: usize = 7;
pub const WEIGHT_OFFSET: usize = 21;
pub const FREE_WATER_INDEX: usize = 24;

/// Admissible range of fast-compartment diffusivities.
pub const FAST_RANGE: (f64, f64) = (1.0, 3000.0);
/// Admissible range of slow-compartment diffusivities.
pub const SLOW_RANGE: (f64, f64) = (0.1, 3000.0);
/// Admissible range of every weight.
pub const WEIGHT_RANGE: (f64, f64) = (0.0, 1.0);

/// Fraction of each compartment's signal carried by the fast pair.
pub const FAST_FRACTION: f64 = 0.7;
/// Slow pair diffusivities are seeded as this multiple of the fast pair.
pub const SLOW_SEED_RATIO: f64 = 0.7;
/// Initial free-water weight of a freshly seeded state.
pub const INITIAL_FREE_WATER: f64 = 0.05;

pub fn orientation_index(k: usize) -> usize {
    COMPARTMENT_STRIDE * k
}

pub fn fast_index(k: usize) -> usize {
    COMPARTMENT_STRIDE * k + 3
}

pub fn slow_index(k: usize) -> usize {
    COMPARTMENT_STRIDE * k + 5
}

pub fn weight_index(k: usize) -> usize {
    WEIGHT_OFFSET + k
}

pub fn validate_state(state: &StateVector) -> TrackResult<()> {
    if state.len() != STATE_DIM {
        return Err(TrackError::StateDimMismatch { expected: STATE_DIM, found: state.len() });
    }
    Ok(())
}

pub fn validate_covariance(cov: &Covariance) -> TrackResult<()> {
    if cov.nrows() != STATE_DIM || cov.ncols() != STATE_DIM {
        return Err(TrackError::CovarianceDimMismatch {
            expected: STATE_DIM,
            found: (cov.nrows(), cov.ncols()),
        });
    }
    Ok(())
}

/// Raw orientation triple of compartment `k`.
pub fn orientation(state: &StateVector, k: usize) -> Vec3 {
    let i = orientation_index(k);
    Vec3::new(state[i], state[i + 1], state[i + 2])
}

/// Unit orientation of compartment `k`; a zero triple stays zero.
pub fn unit_orientation(state: &StateVector, k: usize) -> Vec3 {
    let m = orientation(state, k);
    let n = m.norm();
    if n > 0.0 && n.is_finite() { m / n } else { Vec3::zeros() }
}

pub fn set_orientation(state: &mut StateVector, k: usize, m: &Vec3) {
    let i = orientation_index(k);
    state[i] = m.x;
    state[i + 1] = m.y;
    state[i + 2] = m.z;
}

/// Normalize all three orientation triples in place.
pub fn normalize_orientations(state: &mut StateVector) {
    for k in 0..N_COMPARTMENTS {
        let m = unit_orientation(state, k);
        set_orientation(state, k, &m);
    }
}

/// Copy of `state` with unit orientations, used for every recorded sample.
pub fn normalized_copy(state: &StateVector) -> StateVector {
    let mut copy = state.clone();
    normalize_orientations(&mut copy);
    copy
}

/// Copy of `state` with diffusivities and weights clamped into range.
pub fn clamped_copy(state: &StateVector) -> StateVector {
    let mut copy = state.clone();
    for k in 0..N_COMPARTMENTS {
        for i in fast_index(k)..fast_index(k) + 2 {
            copy[i] = copy[i].clamp(FAST_RANGE.0, FAST_RANGE.1);
        }
        for i in slow_index(k)..slow_index(k) + 2 {
            copy[i] = copy[i].clamp(SLOW_RANGE.0, SLOW_RANGE.1);
        }
    }
    for i in WEIGHT_OFFSET..STATE_DIM {
        copy[i] = copy[i].clamp(WEIGHT_RANGE.0, WEIGHT_RANGE.1);
    }
    copy
}

/// Orientation-reversed twin: only the first compartment is negated.
pub fn inverse_twin(state: &StateVector) -> StateVector {
    let mut twin = state.clone();
    for i in 0..3 {
        twin[i] = -twin[i];
    }
    twin
}

/// Diagonal seeding covariance `p0 · I`.
pub fn initial_covariance(p0: f64) -> Covariance {
    Array2::from_diag(&Array1::from_elem(STATE_DIM, p0))
}

pub fn weights(state: &StateVector) -> [f64; 3] {
    [state[weight_index(0)], state[weight_index(1)], state[weight_index(2)]]
}

pub fn free_water(state: &StateVector) -> f64 {
    state[FREE_WATER_INDEX]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_state() -> StateVector {
        Array1::from_iter((0..STATE_DIM).map(|i| i as f64 + 1.0))
    }

    #[test]
    // Purpose
    // -------
    // The index helpers reproduce the documented layout.
    //
    // Given
    // -----
    // - Compartments 0, 1, 2.
    //
    // Expect
    // ------
    // - Orientations at 0/7/14, fast at 3/10/17, slow at 5/12/19, weights at 21..24.
    fn index_helpers_follow_layout() {
        assert_eq!([orientation_index(0), orientation_index(1), orientation_index(2)], [0, 7, 14]);
        assert_eq!([fast_index(0), fast_index(1), fast_index(2)], [3, 10, 17]);
        assert_eq!([slow_index(0), slow_index(1), slow_index(2)], [5, 12, 19]);
        assert_eq!([weight_index(0), weight_index(1), weight_index(2)], [21, 22, 23]);
    }

    #[test]
    // Purpose
    // -------
    // Clamping brings every diffusivity and weight into range and leaves
    // orientations alone.
    //
    // Given
    // -----
    // - A state with out-of-range values in each block type.
    //
    // Expect
    // ------
    // - Fast ≥ 1, slow ≥ 0.1, weights ≤ 1, orientation untouched.
    fn clamped_copy_respects_ranges() {
        // Arrange
        let mut state = sample_state();
        state[0] = -5.0;
        state[3] = 0.2;
        state[5] = 0.01;
        state[13] = 5000.0;
        state[21] = 1.7;
        state[24] = -0.3;

        // Act
        let clamped = clamped_copy(&state);

        // Assert
        assert_eq!(clamped[0], -5.0);
        assert_eq!(clamped[3], 1.0);
        assert_eq!(clamped[5], 0.1);
        assert_eq!(clamped[13], 3000.0);
        assert_eq!(clamped[21], 1.0);
        assert_eq!(clamped[24], 0.0);
    }

    #[test]
    // Purpose
    // -------
    // Normalized snapshots never alter the working state.
    //
    // Given
    // -----
    // - A state whose orientations are not unit length.
    //
    // Expect
    // ------
    // - The copy has unit orientations, the original is unchanged.
    fn normalized_copy_leaves_original_untouched() {
        let state = sample_state();

        let copy = normalized_copy(&state);

        for k in 0..N_COMPARTMENTS {
            assert_relative_eq!(orientation(&copy, k).norm(), 1.0, epsilon = 1e-12);
        }
        assert_eq!(state[0], 1.0);
        assert_eq!(copy[3], state[3]);
    }

    #[test]
    // Purpose
    // -------
    // The twin only negates the first orientation.
    //
    // Given
    // -----
    // - The sample state.
    //
    // Expect
    // ------
    // - Entries 0..3 negated, all others identical.
    fn inverse_twin_negates_first_orientation_only() {
        let state = sample_state();

        let twin = inverse_twin(&state);

        for i in 0..STATE_DIM {
            let expected = if i < 3 { -state[i] } else { state[i] };
            assert_eq!(twin[i], expected, "index {i}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Dimension checks reject foreign shapes.
    //
    // Given
    // -----
    // - A 24-vector and a 25×24 matrix.
    //
    // Expect
    // ------
    // - `StateDimMismatch` and `CovarianceDimMismatch`.
    fn validation_rejects_wrong_dimensions() {
        assert!(matches!(
            validate_state(&Array1::zeros(24)),
            Err(TrackError::StateDimMismatch { expected: 25, found: 24 })
        ));
        assert!(matches!(
            validate_covariance(&Array2::zeros((25, 24))),
            Err(TrackError::CovarianceDimMismatch { .. })
        ));
        assert!(validate_covariance(&initial_covariance(0.01)).is_ok());
    }
}

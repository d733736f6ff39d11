//! Labeled block schema of the state vector and compartment permutation.
//!
//! Purpose
//! -------
//! Describe the state as a list of labeled blocks `(kind, compartment,
//! offset, len)` so that exchanging two compartments is a single generic
//! index permutation applied to the state and, symmetrically, to the rows
//! and columns of the covariance.
//!
//! Key behaviors
//! -------------
//! - [`swap_permutation`] builds `perm` with `perm[i]` = source index of
//!   slot `i` after exchanging every block of compartment `a` with the block
//!   of the same kind in compartment `b`. The free-water block is never
//!   touched.
//! - [`swap_compartments`] applies `state'[i] = state[perm[i]]` and
//!   `cov'[i][j] = cov[perm[i]][perm[j]]`.
//!
//! Invariants & assumptions
//! ------------------------
//! - Swap permutations are involutions: applying the same swap twice is the
//!   identity, and `swap(a, a)` is the identity.
//! - Covariance symmetry is preserved by construction.
use crate::tractography::{
    core::state::{
        Covariance, N_COMPARTMENTS, STATE_DIM, StateVector, fast_index, orientation_index,
        slow_index, validate_covariance, validate_state, weight_index,
    },
    errors::{TrackError, TrackResult},
};
use ndarray::Array2;

/// Kind of a labeled block in the state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Orientation,
    FastDiffusivity,
    SlowDiffusivity,
    Weight,
    FreeWater,
}

/// A contiguous labeled block of the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    /// Owning compartment; `None` for shared blocks.
    pub compartment: Option<usize>,
    pub offset: usize,
    pub len: usize,
}

/// Full block schema, covering every state index exactly once.
pub fn block_schema() -> Vec<Block> {
    let mut blocks = Vec::with_capacity(4 * N_COMPARTMENTS + 1);
    for k in 0..N_COMPARTMENTS {
        blocks.push(Block {
            kind: BlockKind::Orientation,
            compartment: Some(k),
            offset: orientation_index(k),
            len: 3,
        });
        blocks.push(Block {
            kind: BlockKind::FastDiffusivity,
            compartment: Some(k),
            offset: fast_index(k),
            len: 2,
        });
        blocks.push(Block {
            kind: BlockKind::SlowDiffusivity,
            compartment: Some(k),
            offset: slow_index(k),
            len: 2,
        });
        blocks.push(Block {
            kind: BlockKind::Weight,
            compartment: Some(k),
            offset: weight_index(k),
            len: 1,
        });
    }
    blocks.push(Block {
        kind: BlockKind::FreeWater,
        compartment: None,
        offset: STATE_DIM - 1,
        len: 1,
    });
    blocks
}

/// Index permutation exchanging compartments `a` and `b`.
///
/// # Errors
/// `CompartmentOutOfRange` if either index is not in `0..3`.
pub fn swap_permutation(a: usize, b: usize) -> TrackResult<Vec<usize>> {
    for index in [a, b] {
        if index >= N_COMPARTMENTS {
            return Err(TrackError::CompartmentOutOfRange { index });
        }
    }
    let mut perm: Vec<usize> = (0..STATE_DIM).collect();
    if a == b {
        return Ok(perm);
    }
    let schema = block_schema();
    let find = |kind: BlockKind, k: usize| {
        schema.iter().find(|blk| blk.kind == kind && blk.compartment == Some(k)).copied()
    };
    for block_a in schema.iter().filter(|blk| blk.compartment == Some(a)) {
        if let Some(block_b) = find(block_a.kind, b) {
            for j in 0..block_a.len {
                perm[block_a.offset + j] = block_b.offset + j;
                perm[block_b.offset + j] = block_a.offset + j;
            }
        }
    }
    Ok(perm)
}

/// Apply `perm` to a state vector.
pub fn permute_state(state: &StateVector, perm: &[usize]) -> StateVector {
    perm.iter().map(|&src| state[src]).collect()
}

/// Apply `perm` to the rows and columns of a covariance.
pub fn permute_covariance(cov: &Covariance, perm: &[usize]) -> Covariance {
    let n = perm.len();
    Array2::from_shape_fn((n, n), |(i, j)| cov[[perm[i], perm[j]]])
}

/// Exchange compartments `a` and `b` in both the state and its covariance.
///
/// # Errors
/// - Layout errors for a foreign state or covariance shape.
/// - `CompartmentOutOfRange` for invalid compartment indices.
pub fn swap_compartments(
    state: &StateVector, cov: &Covariance, a: usize, b: usize,
) -> TrackResult<(StateVector, Covariance)> {
    validate_state(state)?;
    validate_covariance(cov)?;
    let perm = swap_permutation(a, b)?;
    Ok((permute_state(state, &perm), permute_covariance(cov, &perm)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array1;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Schema coverage of every state index.
    // - Exact slot movement of a 0↔1 swap, including the covariance.
    // - Involution property and range errors.
    // -------------------------------------------------------------------------

    fn indexed_state() -> StateVector {
        Array1::from_iter((0..STATE_DIM).map(|i| i as f64))
    }

    fn indexed_covariance() -> Covariance {
        Array2::from_shape_fn((STATE_DIM, STATE_DIM), |(i, j)| (100 * i + j) as f64)
    }

    #[test]
    // Purpose
    // -------
    // The schema partitions the state indices.
    //
    // Given
    // -----
    // - The full block schema.
    //
    // Expect
    // ------
    // - Every index in 0..25 is covered exactly once.
    fn schema_covers_every_index_once() {
        let mut hits = [0usize; STATE_DIM];
        for block in block_schema() {
            for i in block.offset..block.offset + block.len {
                hits[i] += 1;
            }
        }
        assert!(hits.iter().all(|&h| h == 1), "hits = {hits:?}");
    }

    #[test]
    // Purpose
    // -------
    // A 0↔1 swap moves every block of the two compartments and nothing else.
    //
    // Given
    // -----
    // - A state whose entries equal their indices.
    //
    // Expect
    // ------
    // - Orientation, diffusivities and weights of 0 and 1 exchanged; the third
    //   compartment and free water in place; covariance rows/cols permuted.
    fn swap_zero_one_moves_expected_slots() {
        // Arrange
        let (state, cov) = (indexed_state(), indexed_covariance());

        // Act
        let (swapped, swapped_cov) = swap_compartments(&state, &cov, 0, 1).expect("valid swap");

        // Assert
        for j in 0..7 {
            assert_eq!(swapped[j], (7 + j) as f64);
            assert_eq!(swapped[7 + j], j as f64);
            assert_eq!(swapped[14 + j], (14 + j) as f64);
        }
        assert_eq!(swapped[21], 22.0);
        assert_eq!(swapped[22], 21.0);
        assert_eq!(swapped[23], 23.0);
        assert_eq!(swapped[24], 24.0);
        assert_eq!(swapped_cov[[0, 21]], cov[[7, 22]]);
        assert_eq!(swapped_cov[[24, 3]], cov[[24, 10]]);
    }

    #[test]
    // Purpose
    // -------
    // Applying a swap twice restores the input exactly.
    //
    // Given
    // -----
    // - Each pair (a, b) with a, b in 0..3.
    //
    // Expect
    // ------
    // - Identity on state and covariance.
    fn swap_is_an_involution() {
        let (state, cov) = (indexed_state(), indexed_covariance());
        for a in 0..N_COMPARTMENTS {
            for b in 0..N_COMPARTMENTS {
                let (s1, c1) = swap_compartments(&state, &cov, a, b).expect("valid swap");
                let (s2, c2) = swap_compartments(&s1, &c1, a, b).expect("valid swap");
                assert_eq!(s2, state, "pair ({a}, {b})");
                assert_eq!(c2, cov, "pair ({a}, {b})");
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Compartment indices outside 0..3 are rejected.
    //
    // Given
    // -----
    // - swap(0, 3).
    //
    // Expect
    // ------
    // - `CompartmentOutOfRange { index: 3 }`.
    fn swap_rejects_out_of_range_compartment() {
        let err = swap_permutation(0, 3).expect_err("index 3 must fail");
        assert_eq!(err, TrackError::CompartmentOutOfRange { index: 3 });
    }
}

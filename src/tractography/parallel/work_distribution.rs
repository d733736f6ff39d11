//! Strided work partitioner.
//!
//! Worker `i` of `n` receives items `i, i + n, i + 2n, ...`. Neighbouring
//! seeds come from neighbouring voxels and tend to produce fibers of
//! similar length, so striding spreads long fibers across workers.
//!
//! Invariants
//! ----------
//! - Every index in `0..num_items` appears in exactly one list, in
//!   ascending order.
//! - List lengths differ by at most one.

/// Strided assignment of `num_items` indices to `num_workers` lists.
///
/// `num_workers == 0` yields no lists.
pub fn partition(num_workers: usize, num_items: usize) -> Vec<Vec<usize>> {
    (0..num_workers)
        .map(|worker| (worker..num_items).step_by(num_workers).collect())
        .collect()
}

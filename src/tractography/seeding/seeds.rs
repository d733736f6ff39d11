//! Seed-point generation.
//!
//! Purpose
//! -------
//! Select candidate voxels, place one or more starting points in each,
//! reject points with unusable signal, and run the per-seed initializer on
//! the survivors.
//!
//! Key behaviors
//! -------------
//! - Candidates are voxels whose seed label is in `labels` when the source
//!   has a label image, and otherwise every voxel inside the brain mask
//!   (full-brain mode).
//! - `seeds_per_voxel > 1` places `ceil(seeds_per_voxel)` points per voxel at
//!   random half-voxel offsets drawn once from the caller's RNG;
//!   `seeds_per_voxel < 1` keeps every `floor(1 / seeds_per_voxel)`-th point.
//! - Points whose first signal half holds a negative or non-finite sample are
//!   dropped. In full-brain mode, points whose branch GFA does not exceed
//!   `seeding_threshold` are skipped.
//! - Initialization runs as a rayon parallel iterator; results keep the
//!   order of the starting points.
//!
//! Invariants & assumptions
//! ------------------------
//! - Determinism: the only randomness is the caller-supplied RNG, consumed
//!   on the calling thread before any parallel work starts.
//! - An empty result is `TrackError::NoSeeds`.
use crate::tractography::{
    collaborators::{BranchDetector, SignalSource},
    core::{options::TractographyOptions, state::Vec3},
    errors::{TrackError, TrackResult},
    seeding::initializer::{SeedInitializer, SeedPointInfo},
};
use ndarray::Array1;
use rand::Rng;
use rayon::prelude::*;

/// Half-extent of the integer box random offset directions are drawn from.
const JITTER_RANGE: i32 = 5000;
/// Length of a jitter offset, in voxels.
const JITTER_LENGTH: f64 = 0.5;

/// A starting point and the signal sampled there.
#[derive(Debug, Clone, PartialEq)]
pub struct StartingPoint {
    pub position: Vec3,
    pub signal: Array1<f64>,
}

/// Voxels eligible for seeding, in storage order.
///
/// # Errors
/// `EmptyLabels` if the source carries a label image but `labels` is empty.
pub fn candidate_voxels<S: SignalSource>(source: &S, labels: &[i32]) -> TrackResult<Vec<[usize; 3]>> {
    let [nx, ny, nz] = source.dimensions();
    let by_label = source.has_seed_labels();
    if by_label && labels.is_empty() {
        return Err(TrackError::EmptyLabels);
    }
    let mut voxels = Vec::new();
    for x in 0..nx {
        for y in 0..ny {
            for z in 0..nz {
                let voxel = [x, y, z];
                let keep = if by_label {
                    source.seed_label(voxel).is_some_and(|l| labels.contains(&l))
                } else {
                    source.mask_value(&voxel_position(voxel)) > 0.0
                };
                if keep {
                    voxels.push(voxel);
                }
            }
        }
    }
    Ok(voxels)
}

/// Offsets applied to every candidate voxel.
///
/// A single zero offset unless `seeds_per_voxel > 1`.
pub fn jitter_offsets<R: Rng + ?Sized>(seeds_per_voxel: f64, rng: &mut R) -> Vec<Vec3> {
    if seeds_per_voxel <= 1.0 {
        return vec![Vec3::zeros()];
    }
    let count = seeds_per_voxel.ceil() as usize;
    (0..count)
        .map(|_| {
            let dir = Vec3::new(
                rng.gen_range(-JITTER_RANGE..=JITTER_RANGE) as f64,
                rng.gen_range(-JITTER_RANGE..=JITTER_RANGE) as f64,
                rng.gen_range(-JITTER_RANGE..=JITTER_RANGE) as f64,
            );
            let n = dir.norm();
            if n > 0.0 { dir * (JITTER_LENGTH / n) } else { Vec3::zeros() }
        })
        .collect()
}

/// Starting points with usable signal.
pub fn starting_points<S: SignalSource>(
    source: &S, voxels: &[[usize; 3]], offsets: &[Vec3], seeds_per_voxel: f64,
) -> Vec<StartingPoint> {
    let every_n = if seeds_per_voxel < 1.0 { ((1.0 / seeds_per_voxel) as usize).max(1) } else { 1 };
    let half = source.signal_dimension() / 2;
    let (mut negative, mut invalid) = (0usize, 0usize);
    let mut points = Vec::new();
    let mut counter = 1usize;
    for &voxel in voxels {
        for offset in offsets {
            if counter % every_n == 0 {
                let position = voxel_position(voxel) + offset;
                let signal = source.interp_signal(&position);
                match signal.iter().take(half).find(|v| !v.is_finite() || **v < 0.0) {
                    Some(v) if v.is_finite() => negative += 1,
                    Some(_) => invalid += 1,
                    None => points.push(StartingPoint { position, signal }),
                }
            }
            counter += 1;
        }
    }
    if negative + invalid > 0 {
        log::warn!("dropped {negative} starting points with negative and {invalid} with non-finite signal");
    }
    points
}

/// Seed records for a whole volume.
///
/// The RNG drives the jitter offsets only. Initialization runs in the
/// current rayon pool.
///
/// # Errors
/// - `EmptyLabels` (see [`candidate_voxels`]).
/// - Fatal initializer errors (solver preconditions).
/// - `NoSeeds` if nothing survives.
pub fn generate_seeds<S, B, R>(
    source: &S, detector: &B, opts: &TractographyOptions, rng: &mut R,
) -> TrackResult<Vec<SeedPointInfo>>
where
    S: SignalSource,
    B: BranchDetector,
    R: Rng + ?Sized,
{
    let voxels = candidate_voxels(source, &opts.labels)?;
    let offsets = jitter_offsets(opts.seeds_per_voxel, rng);
    let points = starting_points(source, &voxels, &offsets, opts.seeds_per_voxel);
    let full_brain = !source.has_seed_labels();
    log::info!(
        "{} candidate voxels, {} starting points ({} mode)",
        voxels.len(),
        points.len(),
        if full_brain { "full-brain" } else { "label" }
    );

    let initializer = SeedInitializer::new(source.acquisition(), &opts.solver, opts.p0);
    let per_point: Vec<Vec<SeedPointInfo>> = points
        .par_iter()
        .map(|point| -> TrackResult<Vec<SeedPointInfo>> {
            let branches = detector.detect(point.signal.view(), source.acquisition())?;
            if full_brain && branches.gfa <= opts.seeding_threshold {
                return Ok(Vec::new());
            }
            match initializer.initialize(point.position, point.signal.view(), &branches) {
                Err(TrackError::TensorFitFailed { reason }) => {
                    log::warn!("skipping seed at {:?}: tensor fit failed ({reason})", point.position);
                    Ok(Vec::new())
                }
                other => other,
            }
        })
        .collect::<TrackResult<_>>()?;

    let seeds: Vec<SeedPointInfo> = per_point.into_iter().flatten().collect();
    if seeds.is_empty() {
        return Err(TrackError::NoSeeds);
    }
    log::info!("{} seed records generated", seeds.len());
    Ok(seeds)
}

fn voxel_position([x, y, z]: [usize; 3]) -> Vec3 {
    Vec3::new(x as f64, y as f64, z as f64)
}

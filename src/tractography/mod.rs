//! tractography — multi-compartment diffusion fiber tracking.
//!
//! Purpose
//! -------
//! Reconstruct white-matter streamlines from a diffusion-weighted volume.
//! Each seed gets a 25-entry three-compartment model state fitted to its
//! signal; a recursive estimator then refines that state step by step while
//! the fiber advances along the primary compartment's orientation.
//!
//! Key behaviors
//! -------------
//! - `core`: state layout, compartment swap, signal model, tensor fit,
//!   diagnostics, geometry, fibers and options.
//! - `seeding`: candidate voxels, jitter, two-phase bounded refinement and
//!   branch-driven extra seeds.
//! - `propagation`: the per-fiber step loop and its stop rules.
//! - `parallel` and `tracker`: strided work partitioning and the run
//!   orchestrator on a rayon pool.
//! - `collaborators`: the traits for signal access, estimation, branch
//!   detection and output; `volume` is an in-memory signal source.
//!
//! Invariants & assumptions
//! ------------------------
//! - Positions are continuous voxel indices in storage order; orientations
//!   are physical `(x, y, z)` unit vectors.
//! - Diffusivities are stored in units of 1e-6 mm²/s.
//! - Policy stops are values, not errors; every `TrackError` is fatal for
//!   the run that produced it.
//!
//! Conventions
//! -----------
//! - Only the `log` facade is used; the crate never installs a logger.
//! - Randomness enters only through the seeded RNG of a run.
//!
//! Downstream usage
//! ----------------
//! - Implement [`SignalSource`], [`RecursiveEstimator`], [`BranchDetector`]
//!   and [`FiberWriter`] (or use [`InMemoryVolume`],
//!   [`TensorBranchDetector`] and [`MemoryWriter`]), then call
//!   [`Tractography::run`].
//!
//! Testing notes
//! -------------
//! - Unit tests live next to each module. End-to-end scenarios (seed
//!   fitting, mask exits, RTOP closed form, full runs) live in `tests/`.

pub mod collaborators;
pub mod core;
pub mod errors;
pub mod parallel;
pub mod propagation;
pub mod seeding;
pub mod tracker;
pub mod volume;

pub use self::collaborators::{
    BranchDetector, BranchDirections, EstimatorOutput, FiberWriter, MemoryWriter,
    RecursiveEstimator, SignalSource,
};
pub use self::errors::{TrackError, TrackResult};
pub use self::seeding::TensorBranchDetector;
pub use self::tracker::{RunReport, Tractography};
pub use self::volume::InMemoryVolume;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_tractography::tractography::prelude::*;
//
// to import the main tracking surface in a single line.

pub mod prelude {
    pub use super::collaborators::{
        BranchDetector, BranchDirections, EstimatorOutput, FiberWriter, MemoryWriter,
        RecursiveEstimator, SignalSource,
    };
    pub use super::core::{
        Acquisition, Covariance, Fiber, FiberSample, RecordFlags, StateVector, TractographyOptions,
        Vec3,
    };
    pub use super::errors::{TrackError, TrackResult};
    pub use super::propagation::{FiberOutcome, StopReason};
    pub use super::seeding::{SeedPointInfo, TensorBranchDetector};
    pub use super::tracker::{RunReport, Tractography};
    pub use super::volume::InMemoryVolume;
}

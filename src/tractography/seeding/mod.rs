//! seeding — from candidate voxels to initialized seed records.
//!
//! Purpose
//! -------
//! Produce the immutable [`SeedPointInfo`] list a run propagates from:
//! candidate selection and jitter (`seeds`), branch detection (`branches`
//! or an external [`BranchDetector`]), and the two-phase bounded refinement
//! of each seed's model state (`initializer`, `objective`).
//!
//! Downstream usage
//! ----------------
//! - The orchestrator calls [`generate_seeds`] once per run inside its
//!   worker pool.
//!
//! [`BranchDetector`]: crate::tractography::collaborators::BranchDetector

pub mod branches;
pub mod initializer;
pub mod objective;
pub mod seeds;

pub use self::branches::TensorBranchDetector;
pub use self::initializer::{SeedInitializer, SeedPointInfo, coarse_state};
pub use self::objective::{FitPhase, SignalFitObjective};
pub use self::seeds::{StartingPoint, generate_seeds};

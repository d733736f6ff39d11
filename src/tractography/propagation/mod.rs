//! propagation — following fibers from their seeds.
//!
//! Purpose
//! -------
//! Turn one [`SeedPointInfo`] into one fiber by repeated estimator steps
//! (`propagator`) until one of the stop rules (`stopping`) fires.
//!
//! Conventions
//! -----------
//! - Policy stops are [`StopReason`] values, never errors. Errors returned
//!   from here are fatal for the run.
//!
//! [`SeedPointInfo`]: crate::tractography::seeding::SeedPointInfo

pub mod propagator;
pub mod stopping;

pub use self::propagator::{FiberOutcome, PathState, Propagator};
pub use self::stopping::{StopReason, StopRules};

//! rust_tractography — multi-compartment diffusion tractography.
//!
//! Purpose
//! -------
//! Serve as the crate root. The crate fits a three-compartment diffusion
//! model at seed points with a bound-constrained quasi-Newton solver, then
//! follows fibers through the volume with an external recursive estimator
//! on a fixed worker pool.
//!
//! Key behaviors
//! -------------
//! - `optimization`: the box-constrained L-BFGS minimizer, its logistic
//!   reparameterization and the `OptError` surface.
//! - `tractography`: seeding, propagation, partitioning, orchestration and
//!   the collaborator traits.
//!
//! Conventions
//! -----------
//! - Fallible public functions return `OptResult<T>` or `TrackResult<T>`;
//!   solver errors convert into `TrackError::Optimization`.
//!
//! Downstream usage
//! ----------------
//! - Most callers need only `tractography::prelude::*`.

pub mod optimization;
pub mod tractography;

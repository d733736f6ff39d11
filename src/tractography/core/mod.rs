//! core — state layout, model functions and data carriers of the tracker.
//!
//! Purpose
//! -------
//! Hold the pure building blocks shared by seeding and propagation: the
//! fixed 25-entry model state and its block schema, the forward signal
//! model, the single-tensor fit, RTOP and uncertainty diagnostics, path
//! geometry, fiber containers and run options.
//!
//! Conventions
//! -----------
//! - Nothing in `core` performs I/O or calls an external collaborator.
//! - Functions take states and covariances by reference and return new
//!   values; only `state::normalize_orientations` and `state::set_orientation`
//!   mutate their argument.

pub mod blocks;
pub mod diagnostics;
pub mod fiber;
pub mod geometry;
pub mod options;
pub mod signal_model;
pub mod state;
pub mod tensor;

pub use self::blocks::swap_compartments;
pub use self::diagnostics::{RtopDiagnostics, Uncertainties};
pub use self::fiber::{Fiber, FiberSample, WeightSample};
pub use self::options::{RecordFlags, TractographyOptions};
pub use self::signal_model::Acquisition;
pub use self::state::{Covariance, STATE_DIM, StateVector, Vec3};
pub use self::tensor::TensorFit;

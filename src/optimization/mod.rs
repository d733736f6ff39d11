//! optimization — bounded minimization, numerical helpers, and unified error surface.
//!
//! Purpose
//! -------
//! Provide a cohesive optimization layer for model fitting, combining an
//! Argmin-backed bound-constrained minimizer, numerically stable parameter
//! transforms, and a single error/result surface. Callers implement an
//! objective, choose tolerances and bounds, and obtain fitted parameters and
//! diagnostics without touching backend solver details.
//!
//! Key behaviors
//! -------------
//! - Expose a high-level API for **minimizing objectives over a box**
//!   (`bounded_optimizer`), including configuration of the L-BFGS solver,
//!   its line search and stopping criteria.
//! - Supply shared numerical primitives (`numerical_stability`) for mapping
//!   bounded parameters into unconstrained space and back.
//! - Normalize configuration issues, numerical failures, and backend solver
//!   errors into a single enum (`errors::OptError`) with a common result
//!   alias (`OptResult<T>`).
//!
//! Invariants & assumptions
//! ------------------------
//! - Optimizers search an unconstrained space `z`; objectives only ever see
//!   bounded points `x`.
//! - Precondition violations (malformed bounds, invalid options) are errors
//!   returned to the caller; numerical degeneracies during a run are
//!   recovered inside the solver.
//!
//! Conventions
//! -----------
//! - Parameters and gradients are `ndarray` vectors (`Theta`, `Grad`).
//! - Public optimization entrypoints that can fail return `OptResult<T>`;
//!   callers never see raw Argmin errors.
//! - Only the `log` facade is used for diagnostics; no logger is installed.
//!
//! Downstream usage
//! ----------------
//! - The tractography seed initializer implements `Objective` for its
//!   signal-reconstruction error and calls `minimize_bounded` once per
//!   refinement phase.
//! - Front-ends typically import the curated surface via
//!   `optimization::prelude::*`.
//!
//! Testing notes
//! -------------
//! - Unit tests in the submodules focus on local concerns (wiring, transforms,
//!   validation, recovery).
//! - `tests/bounded_solver.rs` checks convergence and the box invariant end
//!   to end.

pub mod bounded_optimizer;
pub mod errors;
pub mod numerical_stability;

pub use self::numerical_stability::{to_bounded, to_unconstrained};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_tractography::optimization::prelude::*;
//
// to import the main optimization surface in a single line.

pub mod prelude {
    pub use super::bounded_optimizer::prelude::*;
    pub use super::errors::{OptError, OptResult};
    pub use super::numerical_stability::prelude::*;
}

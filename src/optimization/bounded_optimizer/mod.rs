//! bounded_optimizer — argmin-powered minimization over a box.
//!
//! Purpose
//! -------
//! Provide a reusable, bound-constrained limited-memory quasi-Newton
//! minimizer for any (differentiable) objective. Callers implement
//! [`Objective`] and invoke [`minimize_bounded`] with a start point and box
//! bounds of equal dimension.
//!
//! Key behaviors
//! -------------
//! - Remove the box with the ε-guarded logit reparameterization so the
//!   search runs in unconstrained space; gradients are scaled by the
//!   reparameterization Jacobian ([`adapter::BoxAdapter`]).
//! - Search directions come from L-BFGS (history `m`, default 10); steps
//!   come from a More–Thuente line search enforcing the strong Wolfe
//!   conditions with the step kept in `[0, 10]` ([`builders`]).
//! - Stop on gradient norm ≤ 1e-12 or 2000 iterations by default
//!   ([`Tolerances`]).
//! - Recover from numerical failures by returning the best finite iterate
//!   evaluated so far ([`api`]).
//!
//! Invariants & assumptions
//! ------------------------
//! - Every point handed to [`Objective::value`] / [`Objective::grad`] lies
//!   inside `[lb, ub]`; so does every returned `x_hat`.
//! - Malformed bounds are preconditions and always fail the call.
//!
//! Conventions
//! -----------
//! - `z` denotes unconstrained coordinates, `x` bounded ones. Only the
//!   adapter and the runner ever see `z`.
//! - Objectives are minimized directly; there is no sign flip.
//!
//! Testing notes
//! -------------
//! - Unit tests in each submodule cover wiring, validation and recovery.
//! - `tests/bounded_solver.rs` holds the convex-quadratic convergence check
//!   and property tests for the box invariant.

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::minimize_bounded;
pub use self::finite_diff::relative_forward_diff;
pub use self::traits::{
    FnObjective, Objective, SolveOutcome, SolverOptions, Tolerances, WolfeConstants,
};
pub use self::types::{Cost, DEFAULT_LBFGS_MEM, FnEvalMap, Grad, Theta};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_tractography::optimization::bounded_optimizer::prelude::*;
//
// to import the main optimizer surface in a single line.

pub mod prelude {
    pub use super::api::minimize_bounded;
    pub use super::traits::{FnObjective, Objective, SolveOutcome, SolverOptions, Tolerances};
    pub use super::types::{Cost, Grad, Theta};
}

//! numerical_stability — overflow-free maps between bounded and free space.
//!
//! Purpose
//! -------
//! Host the scalar and elementwise transforms used by the bounded optimizer
//! to remove box constraints: a stable logistic and the ε-guarded logit
//! reparameterization with its Jacobian.
//!
//! Downstream usage
//! ----------------
//! - `bounded_optimizer::adapter` maps every trial point through
//!   `to_bounded` and scales gradients by `jacobian_diag`.
//! - `bounded_optimizer::api` maps the start point through
//!   `to_unconstrained` and the optimum back through `to_bounded`.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    BOUND_EPS, inv_transform, jacobian, jacobian_diag, safe_logistic, to_bounded,
    to_unconstrained, transform,
};

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_tractography::optimization::numerical_stability::prelude::*;
//
// to import the main numerical-stability surface in a single line.

pub mod prelude {
    pub use super::transformations::{
        BOUND_EPS, inv_transform, jacobian, safe_logistic, to_bounded, to_unconstrained,
        transform,
    };
}

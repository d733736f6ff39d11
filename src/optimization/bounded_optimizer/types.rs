//! bounded_optimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the core numeric types and solver aliases used by the
//! bounded optimizer, so the rest of the code stays agnostic to `ndarray`
//! and Argmin generics.
//!
//! Conventions
//! -----------
//! - `Theta` is used for both the bounded point `x` and its unconstrained
//!   image `z`; the adapter documents which one it holds at each step.
//! - `DEFAULT_LBFGS_MEM` is the history size `m` of the two-loop recursion.
use argmin::solver::{linesearch::MoreThuenteLineSearch, quasinewton::LBFGS};
use ndarray::Array1;
use std::collections::HashMap;

/// Parameter vector (bounded or unconstrained, depending on context).
pub type Theta = Array1<f64>;

/// Gradient vector, same length as [`Theta`].
pub type Grad = Array1<f64>;

/// Scalar objective value.
pub type Cost = f64;

/// Argmin function-evaluation counters keyed by counter name.
pub type FnEvalMap = HashMap<String, u64>;

/// Number of (step, gradient-difference) pairs kept by L-BFGS.
pub const DEFAULT_LBFGS_MEM: usize = 10;

/// `sqrt(ε)` for the relative forward-difference step.
pub const SQRT_EPS: f64 = 1.490_116_119_384_765_6e-8;

pub type MoreThuenteLS = MoreThuenteLineSearch<Theta, Grad, Cost>;

pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Theta, Grad, Cost>;

//! Construction of the L-BFGS + More–Thuente solver from [`SolverOptions`].
//!
//! The line search is configured with the strong Wolfe constants and the
//! admissible step interval; L-BFGS gets its history size and stopping
//! tolerances. Every argmin builder error is surfaced as an `OptError`.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    bounded_optimizer::{
        traits::SolverOptions,
        types::{Cost, Grad, LbfgsMoreThuente, MoreThuenteLS, Theta},
    },
    errors::OptResult,
};

pub fn build_optimizer_more_thuente(opts: &SolverOptions) -> OptResult<LbfgsMoreThuente> {
    let (step_min, step_max) = opts.step_bounds;
    let more_thuente = MoreThuenteLS::new()
        .with_c(opts.wolfe.c1, opts.wolfe.c2)?
        .with_bounds(step_min, step_max)?;
    let lbfgs = LbfgsMoreThuente::new(more_thuente, opts.memory());
    configure_lbfgs(lbfgs, opts)
}

pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Theta, Grad, Cost>, opts: &SolverOptions,
) -> OptResult<LBFGS<L, Theta, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimization::bounded_optimizer::{
        traits::{SolverOptions, Tolerances, WolfeConstants},
        types::DEFAULT_LBFGS_MEM,
    };

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Construction with default options.
    // - Propagation of an explicit L-BFGS memory and tolerances.
    //
    // They intentionally DO NOT cover:
    // - End-to-end executor behavior, which is tested in `api`.
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // Ensure the default options produce a solver.
    //
    // Given
    // -----
    // - `SolverOptions::default()` (c1 = 1e-4, c2 = 0.9, steps in [0, 10]).
    //
    // Expect
    // ------
    // - `build_optimizer_more_thuente` returns `Ok(_)`.
    fn build_optimizer_more_thuente_accepts_defaults() {
        // Arrange
        let opts = SolverOptions::default();

        // Act
        let solver = build_optimizer_more_thuente(&opts);

        // Assert
        assert!(solver.is_ok(), "Builder should succeed for default options");
    }

    #[test]
    // Purpose
    // -------
    // Verify that explicit memory and both tolerances are accepted.
    //
    // Given
    // -----
    // - `lbfgs_mem = Some(5)`, tol_grad 1e-8, tol_cost 1e-10, 50 iterations.
    //
    // Expect
    // ------
    // - `Ok(_)`.
    fn build_optimizer_more_thuente_respects_explicit_settings() {
        // Arrange
        let tols = Tolerances::new(Some(1e-8), Some(1e-10), Some(50))
            .expect("Tolerances should be valid");
        let opts = SolverOptions::new(tols, WolfeConstants::default(), (0.0, 10.0), false, Some(5))
            .expect("SolverOptions should be valid");

        // Act
        let solver = build_optimizer_more_thuente(&opts);

        // Assert
        assert!(solver.is_ok(), "Builder should succeed with explicit settings");
    }

    #[test]
    // Purpose
    // -------
    // Confirm that `configure_lbfgs` leaves the solver constructible when
    // both tolerances are `None`, relying on Argmin defaults.
    //
    // Given
    // -----
    // - Tolerances with only `max_iter`.
    //
    // Expect
    // ------
    // - `configure_lbfgs` returns `Ok(_)`.
    fn configure_lbfgs_respects_absent_tolerances() {
        // Arrange
        let raw = LBFGS::new(MoreThuenteLS::new(), DEFAULT_LBFGS_MEM);
        let tols = Tolerances::new(None, None, Some(50)).expect("Tolerances should be valid");
        let opts = SolverOptions { tols, ..SolverOptions::default() };

        // Act
        let configured = configure_lbfgs(raw, &opts);

        // Assert
        assert!(configured.is_ok(), "configure_lbfgs should succeed when both tolerances are None");
    }
}

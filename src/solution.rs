//! # End-to-end solve
//!
//! Chains the three stages of a solve:
//!
//! 1. [`NormalizedInput::from_raw`]: eccentricity clamp, mean anomaly reduced to `[0, 2π)`.
//! 2. [`KeplerSolver`]: bounded Newton–Raphson, initial guess `E_0 = M`.
//! 3. [`display_angle_deg`]: eccentric anomaly in degrees within `(−180°, 180°]`.
//!
//! Every call is independent; nothing is cached between solves.
//!
//! ```rust
//! use kepler_anomaly::solution::solve;
//!
//! let solution = solve(0.5, 60.0);
//! assert!(solution.converged());
//! assert!((solution.angle_deg - 88.6398).abs() < 1e-3);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    anomaly::{display_angle_deg, EccentricityAdjustment, NormalizedInput},
    cancel::CancellationToken,
    constants::{Degree, Radian},
    kepler::{KeplerOutcome, KeplerSolver},
    solver_params::SolverParams,
};

/// Outcome of a solve, in user units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeplerSolution {
    /// Solved (or last) eccentric anomaly in degrees, within `(−180°, 180°]`
    pub angle_deg: Degree,
    /// Final residual `E − e·sin(E) − M`
    pub residual: f64,
    /// Inputs actually fed to the solver
    pub input: NormalizedInput,
    pub outcome: KeplerOutcome,
}

impl KeplerSolution {
    pub fn converged(&self) -> bool {
        self.outcome.is_converged()
    }

    pub fn iterations(&self) -> usize {
        self.outcome.iterations()
    }

    /// Eccentric anomaly in radians as returned by the solver (not reduced).
    pub fn eccentric_anomaly(&self) -> Radian {
        self.outcome.eccentric_anomaly()
    }

    pub fn adjustment(&self) -> EccentricityAdjustment {
        self.input.adjustment
    }

    /// The `(angle in degrees, residual, converged)` triple.
    pub fn as_tuple(&self) -> (Degree, f64, bool) {
        (self.angle_deg, self.residual, self.converged())
    }
}

impl fmt::Display for KeplerSolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "E = {:.6}° (residual {:.10e}, {})",
            self.angle_deg,
            self.residual,
            self.outcome.status()
        )
    }
}

/// Solve Kepler's equation with the default [`SolverParams`].
///
/// Arguments
/// ---------
/// * `eccentricity`: orbit eccentricity; values `≥ 1` are clamped below one
/// * `mean_anomaly`: mean anomaly in degrees, any finite value
///
/// Return
/// ------
/// * A [`KeplerSolution`]; check [`KeplerSolution::converged`] before trusting `angle_deg`
pub fn solve(eccentricity: f64, mean_anomaly: Degree) -> KeplerSolution {
    solve_with(eccentricity, mean_anomaly, &SolverParams::default(), None)
}

/// Solve Kepler's equation with explicit parameters and an optional cancellation token.
pub fn solve_with(
    eccentricity: f64,
    mean_anomaly: Degree,
    params: &SolverParams,
    cancel: Option<&CancellationToken>,
) -> KeplerSolution {
    let input = NormalizedInput::from_raw(eccentricity, mean_anomaly);
    solve_normalized(input, input.mean_anomaly, params, cancel)
}

/// Solve from an already normalized input with a caller-chosen initial guess (radians).
pub fn solve_normalized(
    input: NormalizedInput,
    initial_guess: Radian,
    params: &SolverParams,
    cancel: Option<&CancellationToken>,
) -> KeplerSolution {
    let mut solver = KeplerSolver::new(params.clone());
    if let Some(token) = cancel {
        solver = solver.with_cancellation(token.clone());
    }

    let outcome = solver.solve(input.eccentricity, input.mean_anomaly, initial_guess);
    KeplerSolution {
        angle_deg: display_angle_deg(outcome.eccentric_anomaly()),
        residual: outcome.residual(),
        input,
        outcome,
    }
}

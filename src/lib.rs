//! # kepler-anomaly
//!
//! Solves Kepler's equation `M = E − e·sin(E)` for the eccentric anomaly `E` of an elliptic orbit.
//!
//! A solve runs three stages:
//!
//! 1. [`anomaly`] normalizes the inputs: eccentricity clamped below one, mean anomaly reduced to
//!    `[0°, 360°)` and converted to radians.
//! 2. [`kepler`] runs a bounded, bracket-safeguarded Newton–Raphson iteration.
//! 3. [`anomaly`] maps the solved angle back to degrees within `(−180°, 180°]`.
//!
//! [`solution::solve`] chains the three stages. Solver settings live in [`solver_params`],
//! cooperative cancellation in [`cancel`], CSV batch solving in [`batch`].

pub mod anomaly;
pub mod batch;
pub mod cancel;
pub mod constants;
pub mod kepler;
pub mod kepler_errors;
pub mod solution;
pub mod solver_params;

pub use solution::{solve, solve_with, KeplerSolution};

//! # Constants and type definitions
//!
//! This module centralizes the **numerical constants**, **conversion factors**, and **angle type
//! aliases** shared by the normalizers and the Kepler solver.
//!
//! ## Overview
//!
//! - Unit conversions (degrees ↔ radians)
//! - Domain limits for the eccentricity
//! - Default solver settings (tolerance, iteration cap, derivative floor)

// -------------------------------------------------------------------------------------------------
// Angular constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Full turn in degrees
pub const FULL_TURN_DEG: f64 = 360.0;

/// Half turn in degrees
pub const HALF_TURN_DEG: f64 = 180.0;

// -------------------------------------------------------------------------------------------------
// Solver domain and defaults
// -------------------------------------------------------------------------------------------------

/// Eccentricity substituted for any input `e ≥ 1` (elliptic orbits only).
///
/// Keeps `f'(E) = 1 − e·cos(E)` bounded away from zero.
pub const ECCENTRICITY_CLAMP: f64 = 0.9999999;

/// Default residual tolerance, scaled by `max(1, |E|, |M|)`: machine epsilon for `f64`.
pub const DEFAULT_TOLERANCE: f64 = f64::EPSILON;

/// Default cap on Newton–Raphson iterations.
pub const DEFAULT_MAX_ITERATIONS: usize = 100;

/// Below this magnitude `f'(E)` is considered degenerate and the solver bisects instead.
pub const DEFAULT_MIN_DERIVATIVE: f64 = 1e-12;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;

//! # Angle and eccentricity normalization
//!
//! The solver only sees well-formed inputs: an eccentricity inside the elliptic domain `[0, 1)`
//! and a mean anomaly in radians within `[0, 2π)`. This module produces those inputs from raw
//! user values and maps the solved eccentric anomaly back to a display angle.
//!
//! ## Pipeline position
//!
//! ```text
//! (e_in, M_deg_in) ──► NormalizedInput ──► Kepler solver ──► E (rad) ──► display_angle_deg
//! ```
//!
//! ## Notes
//!
//! - Angle reductions are loop-free (`rem_euclid`), so arbitrarily large inputs cost the same.
//! - Values already inside the target range are returned unchanged, bit for bit.
//! - Clamping an eccentricity `≥ 1` never fails; it is reported through
//!   [`EccentricityAdjustment`] and logged at `warn` level.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::constants::{
    Degree, Radian, DPI, ECCENTRICITY_CLAMP, FULL_TURN_DEG, HALF_TURN_DEG, RADEG,
};

/// What the input normalizer did to the eccentricity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EccentricityAdjustment {
    /// The value was already inside the elliptic domain.
    Unchanged,
    /// The value was `≥ 1` and has been replaced by [`ECCENTRICITY_CLAMP`].
    ClampedBelowOne { original: f64 },
}

impl EccentricityAdjustment {
    pub fn is_clamped(&self) -> bool {
        matches!(self, EccentricityAdjustment::ClampedBelowOne { .. })
    }
}

/// Clamp an eccentricity into the solver domain.
///
/// Arguments
/// ---------
/// * `eccentricity`: raw eccentricity, unitless
///
/// Return
/// ------
/// * `(f64, EccentricityAdjustment)`: the eccentricity to solve with, and whether it was clamped
pub fn clamp_eccentricity(eccentricity: f64) -> (f64, EccentricityAdjustment) {
    if eccentricity >= 1.0 {
        warn!(
            original = eccentricity,
            clamped = ECCENTRICITY_CLAMP,
            "eccentricity outside the elliptic domain, clamping below 1"
        );
        (
            ECCENTRICITY_CLAMP,
            EccentricityAdjustment::ClampedBelowOne {
                original: eccentricity,
            },
        )
    } else {
        (eccentricity, EccentricityAdjustment::Unchanged)
    }
}

/// Reduce an angle in degrees into `[0°, 360°)`.
pub fn principal_angle_deg(angle: Degree) -> Degree {
    if (0.0..FULL_TURN_DEG).contains(&angle) {
        return angle;
    }
    let reduced = angle.rem_euclid(FULL_TURN_DEG);
    // rem_euclid rounds tiny negative inputs up to exactly 360
    if reduced >= FULL_TURN_DEG {
        0.0
    } else {
        reduced
    }
}

/// Reduce an angle in degrees into `(−180°, 180°]`.
pub fn signed_angle_deg(angle: Degree) -> Degree {
    if angle > -HALF_TURN_DEG && angle <= HALF_TURN_DEG {
        return angle;
    }
    let reduced = principal_angle_deg(angle);
    if reduced > HALF_TURN_DEG {
        reduced - FULL_TURN_DEG
    } else {
        reduced
    }
}

/// Convert a mean anomaly in degrees into radians within `[0, 2π)`.
pub fn mean_anomaly_to_radians(mean_anomaly: Degree) -> Radian {
    let rad = principal_angle_deg(mean_anomaly) * RADEG;
    // 359.999… · π/180 may round onto 2π
    if rad >= DPI {
        0.0
    } else {
        rad
    }
}

/// Convert a solved eccentric anomaly into a display angle in degrees within `(−180°, 180°]`.
pub fn display_angle_deg(eccentric_anomaly: Radian) -> Degree {
    signed_angle_deg(eccentric_anomaly / RADEG)
}

/// Solver-ready inputs produced from raw user values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedInput {
    /// Eccentricity in `[0, 1)` (unitless)
    pub eccentricity: f64,
    /// Mean anomaly in `[0, 2π)` (radians)
    pub mean_anomaly: Radian,
    pub adjustment: EccentricityAdjustment,
}

impl NormalizedInput {
    /// Normalize a raw `(eccentricity, mean anomaly in degrees)` pair.
    ///
    /// Arguments
    /// ---------
    /// * `eccentricity`: raw eccentricity; values `≥ 1` are clamped
    /// * `mean_anomaly`: mean anomaly in degrees, any finite value
    ///
    /// Return
    /// ------
    /// * A [`NormalizedInput`]; this never fails
    pub fn from_raw(eccentricity: f64, mean_anomaly: Degree) -> Self {
        let (eccentricity, adjustment) = clamp_eccentricity(eccentricity);
        NormalizedInput {
            eccentricity,
            mean_anomaly: mean_anomaly_to_radians(mean_anomaly),
            adjustment,
        }
    }
}

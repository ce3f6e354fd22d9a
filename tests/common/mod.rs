#![allow(dead_code)]

use approx::assert_relative_eq;
use kepler_anomaly::solution::KeplerSolution;

/// Eccentric anomaly by plain bisection on `[M − e, M + e]`, run until the bracket stops shrinking.
///
/// Shares no code with the crate's solver, so it can serve as an independent reference.
pub fn reference_eccentric_anomaly(eccentricity: f64, mean_anomaly: f64) -> f64 {
    let residual = |x: f64| x - eccentricity * x.sin() - mean_anomaly;
    let (mut lo, mut hi) = (mean_anomaly - eccentricity, mean_anomaly + eccentricity);
    loop {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            return mid;
        }
        if residual(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
}

/// Signed difference `a − b` of two angles in degrees, wrapped to `[−180, 180)`.
pub fn angle_diff_deg(a: f64, b: f64) -> f64 {
    (a - b + 180.0).rem_euclid(360.0) - 180.0
}

pub fn assert_solution_close(actual: &KeplerSolution, expected: &KeplerSolution, epsilon: f64) {
    assert_eq!(actual.converged(), expected.converged());
    assert_relative_eq!(actual.angle_deg, expected.angle_deg, epsilon = epsilon);
    assert_relative_eq!(
        actual.eccentric_anomaly(),
        expected.eccentric_anomaly(),
        epsilon = epsilon
    );
    assert_relative_eq!(
        actual.input.mean_anomaly,
        expected.input.mean_anomaly,
        epsilon = epsilon
    );
}

//! # Kepler equation solver
//!
//! Solves Kepler's equation for the eccentric anomaly `E`:
//!
//! ```text
//! f(E)  = E − e·sin(E) − M = 0
//! f'(E) = 1 − e·cos(E)
//! ```
//!
//! with a bounded Newton–Raphson iteration `E ← E − f(E)/f'(E)`.
//!
//! ## Stopping rule
//!
//! An iterate is accepted once `|f(E)| ≤ tol · max(1, |E|, |M|)`. Near the root the computed
//! residual moves in steps of the floating-point spacing around `E`, so an absolute bound of
//! `f64::EPSILON` is unreachable for large angles; the scale factor keeps the bound absolute for
//! angles up to one radian.
//!
//! ## Safeguard
//!
//! The root always lies in `[M − |e|, M + |e|]`. The solver keeps that bracket, shrinks it with
//! the sign of each residual, and replaces a Newton step by a bisection step when `|f'(E)|` is
//! below the configured floor or the Newton update lands outside the bracket
//! (see [`DerivativeFallback`]).
//!
//! ## Outcomes
//!
//! The loop never runs unbounded. It returns a [`KeplerOutcome`]:
//! `Converged`, `DidNotConverge` (iteration cap reached or non-finite iterate) or
//! `Interrupted` (cancellation token set).

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::{
    cancel::CancellationToken,
    constants::Radian,
    solver_params::{DerivativeFallback, SolverParams},
};

/// Kepler residual `f(E) = E − e·sin(E) − M`.
#[inline]
pub fn kepler_residual(ecc_anomaly: Radian, eccentricity: f64, mean_anomaly: Radian) -> f64 {
    ecc_anomaly - eccentricity * ecc_anomaly.sin() - mean_anomaly
}

/// Derivative of the Kepler residual, `f'(E) = 1 − e·cos(E)`.
#[inline]
pub fn kepler_derivative(ecc_anomaly: Radian, eccentricity: f64) -> f64 {
    1.0 - eccentricity * ecc_anomaly.cos()
}

/// Residual bound for an iterate: `tol · max(1, |E|, |M|)`.
#[inline]
pub fn convergence_threshold(tolerance: f64, ecc_anomaly: Radian, mean_anomaly: Radian) -> f64 {
    tolerance * 1.0_f64.max(ecc_anomaly.abs()).max(mean_anomaly.abs())
}

/// How an iterate was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    /// The initial guess.
    Start,
    Newton,
    Bisection,
}

/// One evaluated iterate of the solver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Iterate {
    /// Index `n` of `E_n`; `0` is the initial guess.
    pub iteration: usize,
    pub eccentric_anomaly: Radian,
    pub residual: f64,
    pub step: StepKind,
}

/// Result of a solve.
///
/// Variants
/// --------
/// * `Converged` – the residual of `eccentric_anomaly` is within tolerance.
/// * `DidNotConverge` – the iteration cap was reached, or an iterate became non-finite.
/// * `Interrupted` – the cancellation token was set before convergence.
///
/// `iterations` always counts the updates applied to the initial guess, so a guess that is
/// already a root converges with `iterations == 0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KeplerOutcome {
    Converged {
        eccentric_anomaly: Radian,
        residual: f64,
        iterations: usize,
    },
    DidNotConverge {
        last_anomaly: Radian,
        last_residual: f64,
        iterations: usize,
    },
    Interrupted {
        last_anomaly: Radian,
        last_residual: f64,
        iterations: usize,
    },
}

impl KeplerOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, KeplerOutcome::Converged { .. })
    }

    /// Solved anomaly, or the last iterate when the solve did not converge.
    pub fn eccentric_anomaly(&self) -> Radian {
        match *self {
            KeplerOutcome::Converged {
                eccentric_anomaly, ..
            } => eccentric_anomaly,
            KeplerOutcome::DidNotConverge { last_anomaly, .. }
            | KeplerOutcome::Interrupted { last_anomaly, .. } => last_anomaly,
        }
    }

    pub fn residual(&self) -> f64 {
        match *self {
            KeplerOutcome::Converged { residual, .. } => residual,
            KeplerOutcome::DidNotConverge { last_residual, .. }
            | KeplerOutcome::Interrupted { last_residual, .. } => last_residual,
        }
    }

    pub fn iterations(&self) -> usize {
        match *self {
            KeplerOutcome::Converged { iterations, .. }
            | KeplerOutcome::DidNotConverge { iterations, .. }
            | KeplerOutcome::Interrupted { iterations, .. } => iterations,
        }
    }

    /// Short machine-readable status, as written in batch output.
    pub fn status(&self) -> &'static str {
        match self {
            KeplerOutcome::Converged { .. } => "converged",
            KeplerOutcome::DidNotConverge { .. } => "did_not_converge",
            KeplerOutcome::Interrupted { .. } => "interrupted",
        }
    }
}

impl fmt::Display for KeplerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeplerOutcome::Converged {
                eccentric_anomaly,
                residual,
                iterations,
            } => write!(
                f,
                "converged to E = {eccentric_anomaly} rad (residual {residual:.10e}) after {iterations} iterations"
            ),
            KeplerOutcome::DidNotConverge {
                last_anomaly,
                last_residual,
                iterations,
            } => write!(
                f,
                "did not converge after {iterations} iterations (last E = {last_anomaly} rad, residual {last_residual:.10e})"
            ),
            KeplerOutcome::Interrupted {
                last_anomaly,
                last_residual,
                iterations,
            } => write!(
                f,
                "interrupted after {iterations} iterations (last E = {last_anomaly} rad, residual {last_residual:.10e})"
            ),
        }
    }
}

/// Interval `[lo, hi]` with `f(lo) ≤ 0 ≤ f(hi)`.
#[derive(Debug, Clone, Copy)]
struct Bracket {
    lo: f64,
    hi: f64,
}

impl Bracket {
    fn around(mean_anomaly: Radian, eccentricity: f64) -> Self {
        let half_width = eccentricity.abs();
        Bracket {
            lo: mean_anomaly - half_width,
            hi: mean_anomaly + half_width,
        }
    }

    /// Shrink with an evaluated point; `f` is increasing across the root.
    fn shrink(&mut self, ecc_anomaly: Radian, residual: f64) {
        if residual < 0.0 {
            self.lo = self.lo.max(ecc_anomaly);
        } else {
            self.hi = self.hi.min(ecc_anomaly);
        }
    }

    fn contains_open(&self, x: f64) -> bool {
        x > self.lo && x < self.hi
    }

    fn midpoint(&self) -> f64 {
        0.5 * (self.lo + self.hi)
    }
}

/// Bounded Newton–Raphson solver for Kepler's equation.
///
/// The solver is stateless between calls; it only carries its configuration and an optional
/// cancellation token.
#[derive(Debug, Clone, Default)]
pub struct KeplerSolver {
    params: SolverParams,
    cancel: Option<CancellationToken>,
}

impl KeplerSolver {
    pub fn new(params: SolverParams) -> Self {
        KeplerSolver {
            params,
            cancel: None,
        }
    }

    /// Attach a cancellation token, polled once per iteration.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Solve `E − e·sin(E) = M` starting from `initial_guess`.
    ///
    /// Arguments
    /// ---------
    /// * `eccentricity`: eccentricity, expected in `[0, 1)`
    /// * `mean_anomaly`: mean anomaly in radians
    /// * `initial_guess`: starting iterate `E_0` in radians (`M` is a good choice for moderate `e`)
    ///
    /// Return
    /// ------
    /// * The [`KeplerOutcome`] of the bounded iteration
    pub fn solve(
        &self,
        eccentricity: f64,
        mean_anomaly: Radian,
        initial_guess: Radian,
    ) -> KeplerOutcome {
        self.solve_with_observer(eccentricity, mean_anomaly, initial_guess, |_| {})
    }

    /// Same as [`KeplerSolver::solve`], also returning every evaluated iterate in order.
    pub fn solve_traced(
        &self,
        eccentricity: f64,
        mean_anomaly: Radian,
        initial_guess: Radian,
    ) -> (KeplerOutcome, Vec<Iterate>) {
        let mut history = Vec::new();
        let outcome = self.solve_with_observer(eccentricity, mean_anomaly, initial_guess, |it| {
            history.push(*it)
        });
        (outcome, history)
    }

    /// Same as [`KeplerSolver::solve`], calling `observer` on each evaluated iterate.
    pub fn solve_with_observer<F>(
        &self,
        eccentricity: f64,
        mean_anomaly: Radian,
        initial_guess: Radian,
        mut observer: F,
    ) -> KeplerOutcome
    where
        F: FnMut(&Iterate),
    {
        let params = &self.params;
        debug!(
            eccentricity,
            mean_anomaly,
            initial_guess,
            tolerance = params.tolerance,
            max_iterations = params.max_iterations,
            "solving Kepler equation"
        );

        let mut bracket = Bracket::around(mean_anomaly, eccentricity);
        let mut ecc_anomaly = initial_guess;
        let mut step = StepKind::Start;
        let mut iteration = 0;

        let outcome = loop {
            let residual = kepler_residual(ecc_anomaly, eccentricity, mean_anomaly);
            let iterate = Iterate {
                iteration,
                eccentric_anomaly: ecc_anomaly,
                residual,
                step,
            };
            trace!(iteration, ecc_anomaly, residual, ?step, "kepler iterate");
            observer(&iterate);

            if residual.abs() <= convergence_threshold(params.tolerance, ecc_anomaly, mean_anomaly)
            {
                break KeplerOutcome::Converged {
                    eccentric_anomaly: ecc_anomaly,
                    residual,
                    iterations: iteration,
                };
            }

            if !ecc_anomaly.is_finite() || !residual.is_finite() || iteration >= params.max_iterations
            {
                warn!(
                    iteration,
                    ecc_anomaly, residual, "Kepler iteration did not converge"
                );
                break KeplerOutcome::DidNotConverge {
                    last_anomaly: ecc_anomaly,
                    last_residual: residual,
                    iterations: iteration,
                };
            }

            if self.cancel.as_ref().is_some_and(|c| c.is_cancelled()) {
                warn!(iteration, "Kepler iteration interrupted");
                break KeplerOutcome::Interrupted {
                    last_anomaly: ecc_anomaly,
                    last_residual: residual,
                    iterations: iteration,
                };
            }

            bracket.shrink(ecc_anomaly, residual);
            (ecc_anomaly, step) = self.next_iterate(&bracket, ecc_anomaly, eccentricity, residual);
            iteration += 1;
        };

        debug!(%outcome, "Kepler solve finished");
        outcome
    }

    fn next_iterate(
        &self,
        bracket: &Bracket,
        ecc_anomaly: Radian,
        eccentricity: f64,
        residual: f64,
    ) -> (Radian, StepKind) {
        let derivative = kepler_derivative(ecc_anomaly, eccentricity);
        match self.params.fallback {
            DerivativeFallback::None => (ecc_anomaly - residual / derivative, StepKind::Newton),
            DerivativeFallback::Bisection => {
                if derivative.abs() > self.params.min_derivative {
                    let newton = ecc_anomaly - residual / derivative;
                    if bracket.contains_open(newton) {
                        return (newton, StepKind::Newton);
                    }
                }
                trace!(derivative, "Newton step rejected, bisecting");
                (bracket.midpoint(), StepKind::Bisection)
            }
        }
    }
}

#[cfg(test)]
mod kepler_test {
    use super::*;
    use crate::constants::ECCENTRICITY_CLAMP;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;

    fn plain_newton() -> KeplerSolver {
        KeplerSolver::new(
            SolverParams::builder()
                .fallback(DerivativeFallback::None)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_residual_and_derivative() {
        assert_eq!(kepler_residual(0.0, 0.5, 0.0), 0.0);
        assert_eq!(kepler_residual(1.0, 0.0, 0.25), 0.75);
        assert_abs_diff_eq!(
            kepler_residual(PI / 2.0, 0.5, 1.0),
            PI / 2.0 - 0.5 - 1.0,
            epsilon = 1e-15
        );

        assert_eq!(kepler_derivative(0.0, 0.5), 0.5);
        assert_abs_diff_eq!(kepler_derivative(PI, 0.5), 1.5, epsilon = 1e-15);
        assert_abs_diff_eq!(kepler_derivative(PI / 2.0, 0.9), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_convergence_threshold() {
        let tol = f64::EPSILON;
        assert_eq!(convergence_threshold(tol, 0.3, 0.2), tol);
        assert_eq!(convergence_threshold(tol, -4.0, 2.0), 4.0 * tol);
        assert_eq!(convergence_threshold(tol, 1.5, 6.0), 6.0 * tol);
    }

    #[test]
    fn test_circular_orbit_is_identity() {
        let solver = KeplerSolver::default();
        for m in [0.0, 0.5, 2.0, 4.0, 6.2] {
            let outcome = solver.solve(0.0, m, m);
            assert_eq!(
                outcome,
                KeplerOutcome::Converged {
                    eccentric_anomaly: m,
                    residual: 0.0,
                    iterations: 0
                }
            );
        }
    }

    #[test]
    fn test_known_solution() {
        let solver = KeplerSolver::default();
        let m = PI / 3.0;
        let outcome = solver.solve(0.5, m, m);

        assert!(outcome.is_converged());
        assert_abs_diff_eq!(outcome.eccentric_anomaly(), 1.547056664927008, epsilon = 1e-12);
        assert!(outcome.residual().abs() <= 2.0 * f64::EPSILON);
        assert!(outcome.iterations() <= 10);
    }

    #[test]
    fn test_trace_is_reproducible() {
        let solver = KeplerSolver::default();
        let (outcome, history) = solver.solve_traced(0.7, 2.5, 2.5);
        let (outcome_again, history_again) = solver.solve_traced(0.7, 2.5, 2.5);

        assert_eq!(outcome, outcome_again);
        assert_eq!(history, history_again);

        assert_eq!(history.len(), outcome.iterations() + 1);
        assert_eq!(history[0].step, StepKind::Start);
        assert_eq!(history[0].eccentric_anomaly, 2.5);
        for (n, it) in history.iter().enumerate() {
            assert_eq!(it.iteration, n);
            assert_eq!(
                it.residual,
                kepler_residual(it.eccentric_anomaly, 0.7, 2.5)
            );
        }
        let last = history.last().unwrap();
        assert_eq!(last.eccentric_anomaly, outcome.eccentric_anomaly());
        assert_eq!(last.residual, outcome.residual());
    }

    #[test]
    fn test_observer_matches_trace() {
        let solver = KeplerSolver::default();
        let mut seen = Vec::new();
        let outcome = solver.solve_with_observer(0.3, 1.0, 1.0, |it| seen.push(it.residual));
        let (_, history) = solver.solve_traced(0.3, 1.0, 1.0);

        assert!(outcome.is_converged());
        assert_eq!(
            seen,
            history.iter().map(|it| it.residual).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_plain_newton_hits_iteration_cap() {
        // f'(0) = 1 − e is tiny: the first Newton step throws the iterate far from the root
        let outcome = plain_newton().solve(ECCENTRICITY_CLAMP, PI, 0.0);
        match outcome {
            KeplerOutcome::DidNotConverge {
                last_anomaly,
                iterations,
                ..
            } => {
                assert_eq!(iterations, 100);
                assert!(last_anomaly.is_finite());
            }
            other => panic!("expected DidNotConverge, got {other:?}"),
        }

        let guarded = KeplerSolver::default().solve(ECCENTRICITY_CLAMP, PI, 0.0);
        assert!(guarded.is_converged());
        assert!(guarded.iterations() < 100);
    }

    #[test]
    fn test_iteration_cap_is_configurable() {
        let solver = KeplerSolver::new(
            SolverParams::builder()
                .fallback(DerivativeFallback::None)
                .max_iterations(3)
                .build()
                .unwrap(),
        );
        let (outcome, history) = solver.solve_traced(ECCENTRICITY_CLAMP, PI, 0.0);
        assert!(matches!(
            outcome,
            KeplerOutcome::DidNotConverge { iterations: 3, .. }
        ));
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn test_zero_derivative() {
        // e = 1 and E = 0 give f'(E) = 0
        let (outcome, history) = plain_newton().solve_traced(1.0, 0.5, 0.0);
        assert!(matches!(
            outcome,
            KeplerOutcome::DidNotConverge { iterations: 1, .. }
        ));
        assert!(!history[1].eccentric_anomaly.is_finite());

        let (outcome, history) = KeplerSolver::default().solve_traced(1.0, 0.5, 0.0);
        assert!(outcome.is_converged());
        // The negative residual at E = 0 moves the lower bracket end from −0.5 to 0
        assert_eq!(history[1].step, StepKind::Bisection);
        assert_eq!(history[1].eccentric_anomaly, 0.75);
    }

    #[test]
    fn test_non_finite_guess() {
        let outcome = KeplerSolver::default().solve(0.5, 1.0, f64::NAN);
        assert!(matches!(
            outcome,
            KeplerOutcome::DidNotConverge { iterations: 0, .. }
        ));
    }

    #[test]
    fn test_guess_outside_bracket() {
        let (outcome, history) = KeplerSolver::default().solve_traced(0.5, 1.0, 1.0e17);
        assert!(outcome.is_converged());
        assert_eq!(history[1].step, StepKind::Bisection);
        assert_abs_diff_eq!(
            kepler_residual(outcome.eccentric_anomaly(), 0.5, 1.0),
            0.0,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_interrupted() {
        let token = CancellationToken::new();
        token.cancel();
        let solver = KeplerSolver::default().with_cancellation(token);

        assert_eq!(
            solver.solve(0.5, 1.0, 1.0),
            KeplerOutcome::Interrupted {
                last_anomaly: 1.0,
                last_residual: kepler_residual(1.0, 0.5, 1.0),
                iterations: 0
            }
        );

        // An already converged guess is still reported as converged
        assert!(solver.solve(0.0, 1.0, 1.0).is_converged());
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = KeplerOutcome::DidNotConverge {
            last_anomaly: 2.0,
            last_residual: -0.5,
            iterations: 100,
        };
        assert!(!outcome.is_converged());
        assert_eq!(outcome.eccentric_anomaly(), 2.0);
        assert_eq!(outcome.residual(), -0.5);
        assert_eq!(outcome.iterations(), 100);
        assert_eq!(outcome.status(), "did_not_converge");
        assert_eq!(
            outcome.to_string(),
            "did not converge after 100 iterations (last E = 2 rad, residual -5.0000000000e-1)"
        );
    }
}

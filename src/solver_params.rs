//! # Kepler solver parameters
//!
//! This module defines the [`SolverParams`] configuration struct and its builder, which control
//! the stopping rule and the safeguards of the Newton–Raphson iteration used by
//! [`KeplerSolver`](crate::kepler::KeplerSolver).
//!
//! ## Purpose
//!
//! Each solver carries its own tolerance, together with:
//!
//! - the **iteration cap** that turns a runaway iteration into a
//!   [`DidNotConverge`](crate::kepler::KeplerOutcome::DidNotConverge) outcome,
//! - the **derivative floor** below which a Newton step is not attempted,
//! - the **fallback policy** applied when a Newton step is unusable.
//!
//! ## Example
//!
//! ```rust
//! use kepler_anomaly::solver_params::{DerivativeFallback, SolverParams};
//!
//! let params = SolverParams::builder()
//!     .tolerance(1e-12)
//!     .max_iterations(50)
//!     .fallback(DerivativeFallback::Bisection)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(params.max_iterations, 50);
//! ```
//!
//! ## Defaults
//!
//! | Parameter        | Default            |
//! |------------------|--------------------|
//! | `tolerance`      | `f64::EPSILON`     |
//! | `max_iterations` | `100`              |
//! | `min_derivative` | `1e-12`            |
//! | `fallback`       | `Bisection`        |

use std::cmp::Ordering::{Equal, Greater};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_MIN_DERIVATIVE, DEFAULT_TOLERANCE},
    kepler_errors::KeplerError,
};

/// What the solver does when a Newton step cannot be trusted.
///
/// A step is untrusted when `|f'(E)|` is below [`SolverParams::min_derivative`] or when the
/// Newton update leaves the current root bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DerivativeFallback {
    /// Take a bisection step on the bracket `[M − |e|, M + |e|]` shrunk by previous iterates.
    Bisection,
    /// Plain Newton–Raphson: always divide, only the iteration cap stops a divergent run.
    None,
}

impl fmt::Display for DerivativeFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivativeFallback::Bisection => write!(f, "bisection"),
            DerivativeFallback::None => write!(f, "none"),
        }
    }
}

/// Configuration of the Kepler equation solver.
///
/// Fields
/// -----------------
/// * `tolerance` – residual tolerance; an iterate is accepted once
///   `|f(E)| ≤ tolerance · max(1, |E|, |M|)`.
/// * `max_iterations` – maximum number of iterate updates before giving up.
/// * `min_derivative` – smallest `|f'(E)|` a Newton step may divide by.
/// * `fallback` – policy applied to untrusted Newton steps.
///
/// Validation rules (enforced by [`SolverParamsBuilder::build`])
/// -----------------
/// * `tolerance > 0` and finite.
/// * `max_iterations ≥ 1`.
/// * `min_derivative ≥ 0` and finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverParams {
    pub tolerance: f64,
    pub max_iterations: usize,
    pub min_derivative: f64,
    pub fallback: DerivativeFallback,
}

impl SolverParams {
    /// Construct a new [`SolverParams`] with the default values.
    ///
    /// This is equivalent to calling [`SolverParams::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new [`SolverParamsBuilder`] initialized with the defaults.
    pub fn builder() -> SolverParamsBuilder {
        SolverParamsBuilder::new()
    }
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            min_derivative: DEFAULT_MIN_DERIVATIVE,
            fallback: DerivativeFallback::Bisection,
        }
    }
}

/// Builder for [`SolverParams`], with validation.
#[derive(Debug, Clone)]
pub struct SolverParamsBuilder {
    params: SolverParams,
}

impl Default for SolverParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SolverParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: SolverParams::default(),
        }
    }

    pub fn tolerance(mut self, v: f64) -> Self {
        self.params.tolerance = v;
        self
    }
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.params.max_iterations = v;
        self
    }
    pub fn min_derivative(mut self, v: f64) -> Self {
        self.params.min_derivative = v;
        self
    }
    pub fn fallback(mut self, v: DerivativeFallback) -> Self {
        self.params.fallback = v;
        self
    }

    /// Return true iff x > 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn gt0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater))
    }

    /// Return true iff x >= 0.0 and comparable (i.e., not NaN).
    #[inline]
    fn ge0(x: f64) -> bool {
        matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
    }

    /// Finalize the builder and produce a [`SolverParams`] instance.
    ///
    /// Returns
    /// -----------------
    /// * `Ok(SolverParams)` if all values are valid.
    /// * `Err(KeplerError::InvalidSolverParameter)` naming the first rule that failed.
    pub fn build(self) -> Result<SolverParams, KeplerError> {
        let p = &self.params;

        if !Self::gt0(p.tolerance) || !p.tolerance.is_finite() {
            return Err(KeplerError::InvalidSolverParameter(
                "tolerance must be finite and > 0".into(),
            ));
        }
        if p.max_iterations == 0 {
            return Err(KeplerError::InvalidSolverParameter(
                "max_iterations must be >= 1".into(),
            ));
        }
        if !Self::ge0(p.min_derivative) || !p.min_derivative.is_finite() {
            return Err(KeplerError::InvalidSolverParameter(
                "min_derivative must be finite and >= 0".into(),
            ));
        }

        Ok(self.params)
    }
}

impl fmt::Display for SolverParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            writeln!(f, "Kepler Solver Parameters")?;
            writeln!(f, "------------------------")?;
            writeln!(
                f,
                "  tolerance      = {:<12.3e} # residual tolerance (scaled by max(1,|E|,|M|))",
                self.tolerance
            )?;
            writeln!(
                f,
                "  max_iterations = {:<12} # iteration cap",
                self.max_iterations
            )?;
            writeln!(
                f,
                "  min_derivative = {:<12.1e} # smallest |f'(E)| used in a Newton step",
                self.min_derivative
            )?;
            writeln!(
                f,
                "  fallback       = {:<12} # policy for untrusted Newton steps",
                self.fallback.to_string()
            )
        } else {
            write!(
                f,
                "SolverParams(tolerance={:.3e}, max_iterations={}, min_derivative={:.1e}, fallback={})",
                self.tolerance, self.max_iterations, self.min_derivative, self.fallback
            )
        }
    }
}

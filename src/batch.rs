//! # Batch solving from CSV
//!
//! Reads `(eccentricity, mean anomaly)` cases from a CSV source, solves each one independently
//! and writes one result row per case.
//!
//! ## Input format
//!
//! ```text
//! eccentricity,mean_anomaly_deg
//! 0.5,60
//! 1.2,-30
//! ```
//!
//! ## Output format
//!
//! ```text
//! eccentricity,mean_anomaly_deg,eccentric_anomaly_deg,residual,iterations,status,eccentricity_clamped
//! ```
//!
//! `eccentricity` and `mean_anomaly_deg` echo the raw input; `status` is one of
//! `converged`, `did_not_converge`, `interrupted`.
//!
//! Cancellation stops the batch: the case being solved is written as `interrupted` and no later
//! case is started.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    cancel::CancellationToken,
    constants::Degree,
    kepler_errors::{ensure_finite, KeplerError},
    solution::{solve_with, KeplerSolution},
    solver_params::SolverParams,
};

/// One input row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchCase {
    pub eccentricity: f64,
    pub mean_anomaly_deg: Degree,
}

/// One output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub eccentricity: f64,
    pub mean_anomaly_deg: Degree,
    pub eccentric_anomaly_deg: Degree,
    pub residual: f64,
    pub iterations: usize,
    pub status: String,
    pub eccentricity_clamped: bool,
}

impl BatchRecord {
    pub fn new(case: &BatchCase, solution: &KeplerSolution) -> Self {
        BatchRecord {
            eccentricity: case.eccentricity,
            mean_anomaly_deg: case.mean_anomaly_deg,
            eccentric_anomaly_deg: solution.angle_deg,
            residual: solution.residual,
            iterations: solution.iterations(),
            status: solution.outcome.status().to_string(),
            eccentricity_clamped: solution.adjustment().is_clamped(),
        }
    }
}

/// Counters over a finished batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub converged: usize,
    pub did_not_converge: usize,
    pub interrupted: usize,
}

impl BatchSummary {
    pub fn total(&self) -> usize {
        self.converged + self.did_not_converge + self.interrupted
    }

    fn record(&mut self, solution: &KeplerSolution) {
        match solution.outcome.status() {
            "converged" => self.converged += 1,
            "interrupted" => self.interrupted += 1,
            _ => self.did_not_converge += 1,
        }
    }
}

/// Read every case from a CSV source with header `eccentricity,mean_anomaly_deg`.
///
/// Return
/// ------
/// * The cases in file order, or the first CSV / non-finite value error
pub fn read_cases<R: Read>(reader: R) -> Result<Vec<BatchCase>, KeplerError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    csv_reader
        .deserialize::<BatchCase>()
        .map(|row| -> Result<BatchCase, KeplerError> {
            let case = row?;
            ensure_finite("eccentricity", case.eccentricity)?;
            ensure_finite("mean_anomaly_deg", case.mean_anomaly_deg)?;
            Ok(case)
        })
        .collect()
}

/// Solve each case and stream the result rows to `writer`.
///
/// Arguments
/// ---------
/// * `cases`: inputs, solved in order
/// * `writer`: destination of the CSV output (header included)
/// * `params`: solver configuration shared by every case
/// * `cancel`: optional token; once set, the batch stops after the current case
pub fn solve_batch<W: Write>(
    cases: &[BatchCase],
    writer: W,
    params: &SolverParams,
    cancel: Option<&CancellationToken>,
) -> Result<BatchSummary, KeplerError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut summary = BatchSummary::default();

    for case in cases {
        let solution = solve_with(case.eccentricity, case.mean_anomaly_deg, params, cancel);
        csv_writer.serialize(BatchRecord::new(case, &solution))?;
        summary.record(&solution);

        // A token cancelled between cases interrupts the next case
        if summary.interrupted > 0 {
            warn!(
                solved = summary.total(),
                remaining = cases.len() - summary.total(),
                "batch cancelled"
            );
            break;
        }
    }
    csv_writer.flush()?;

    info!(
        converged = summary.converged,
        did_not_converge = summary.did_not_converge,
        interrupted = summary.interrupted,
        "batch finished"
    );
    Ok(summary)
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeplerError {
    #[error("Invalid solver parameter: {0}")]
    InvalidSolverParameter(String),

    #[error("Input {name} must be a finite number, got {value}")]
    NonFiniteInput { name: &'static str, value: f64 },

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Unable to install handler for signal {0}")]
    SignalInstallError(String),

    #[error("Solver task failed: {0}")]
    SolverTaskError(String),
}

impl PartialEq for KeplerError {
    fn eq(&self, other: &Self) -> bool {
        use KeplerError::*;
        match (self, other) {
            (InvalidSolverParameter(a), InvalidSolverParameter(b)) => a == b,
            (
                NonFiniteInput {
                    name: na,
                    value: va,
                },
                NonFiniteInput {
                    name: nb,
                    value: vb,
                },
            ) => na == nb && (va == vb || (va.is_nan() && vb.is_nan())),
            (SignalInstallError(a), SignalInstallError(b)) => a == b,
            (SolverTaskError(a), SolverTaskError(b)) => a == b,

            // Not comparable: equal when the variant matches
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            _ => false,
        }
    }
}

/// Reject NaN and infinities coming from the command line or a batch file.
pub fn ensure_finite(name: &'static str, value: f64) -> Result<f64, KeplerError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(KeplerError::NonFiniteInput { name, value })
    }
}

use std::{
    fs::File,
    io::{self, IsTerminal},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::{error::ErrorKind, Parser};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use kepler_anomaly::{
    anomaly::NormalizedInput,
    batch::{read_cases, solve_batch},
    cancel::CancellationToken,
    constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, RADEG},
    kepler::KeplerOutcome,
    kepler_errors::{ensure_finite, KeplerError},
    solution::solve_normalized,
    solver_params::{DerivativeFallback, SolverParams},
};

const EXIT_FAILURE: u8 = 1;
const EXIT_DID_NOT_CONVERGE: u8 = 2;
const EXIT_INTERRUPTED: u8 = 130;

/// Solve Kepler's equation M = E − e·sin(E) for the eccentric anomaly E.
///
/// Prints the solved angle in degrees, within (−180°, 180°], as the last line of stdout.
#[derive(Parser, Debug)]
#[command(name = "kepler", version, allow_negative_numbers = true)]
struct Cli {
    /// Orbit eccentricity; values >= 1 are clamped to 0.9999999
    #[arg(required_unless_present = "batch")]
    eccentricity: Option<f64>,

    /// Mean anomaly in degrees
    #[arg(required_unless_present = "batch")]
    mean_anomaly: Option<f64>,

    /// Residual tolerance, scaled by max(1, |E|, |M|)
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Maximum number of iterations before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Plain Newton–Raphson, without the bisection safeguard
    #[arg(long)]
    no_fallback: bool,

    /// Initial guess in degrees (default: the normalized mean anomaly)
    #[arg(long)]
    initial_guess: Option<f64>,

    /// Cancel the solve after this many milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Solve every row of a CSV file with header `eccentricity,mean_anomaly_deg`
    #[arg(long, conflicts_with_all = ["eccentricity", "mean_anomaly", "initial_guess"])]
    batch: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn solver_params(&self) -> Result<SolverParams, KeplerError> {
        let fallback = if self.no_fallback {
            DerivativeFallback::None
        } else {
            DerivativeFallback::Bisection
        };
        SolverParams::builder()
            .tolerance(self.tolerance)
            .max_iterations(self.max_iterations)
            .fallback(fallback)
            .build()
    }
}

fn usage(program: &str) {
    eprintln!("Usage {program} <eccentricity> <mean_anomaly>\nPrints calculated mean_anomaly");
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .with_target(false)
        .init();
}

/// Cancel on SIGINT and SIGTERM instead of terminating the process.
fn spawn_signal_watchers(cancel: &CancellationToken) -> Result<(), KeplerError> {
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("SIGINT received, cancelling");
                on_interrupt.cancel();
            }
            Err(e) => warn!(error = %e, "unable to listen for SIGINT"),
        }
    });

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| KeplerError::SignalInstallError(format!("SIGTERM: {e}")))?;
        let on_terminate = cancel.clone();
        tokio::spawn(async move {
            if sigterm.recv().await.is_some() {
                warn!("SIGTERM received, cancelling");
                on_terminate.cancel();
            }
        });
    }

    Ok(())
}

fn spawn_timeout(cancel: &CancellationToken, timeout: Duration) {
    let on_timeout = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        warn!(?timeout, "timeout elapsed, cancelling");
        on_timeout.cancel();
    });
}

fn run_single(
    cli: &Cli,
    params: &SolverParams,
    cancel: &CancellationToken,
) -> Result<ExitCode, KeplerError> {
    let eccentricity = ensure_finite("eccentricity", cli.eccentricity.unwrap_or_default())?;
    let mean_anomaly = ensure_finite("mean_anomaly", cli.mean_anomaly.unwrap_or_default())?;
    info!(eccentricity, mean_anomaly, "read inputs");
    info!(tolerance = params.tolerance, "tolerance");

    let input = NormalizedInput::from_raw(eccentricity, mean_anomaly);
    let initial_guess = match cli.initial_guess {
        Some(deg) => ensure_finite("initial_guess", deg)? * RADEG,
        None => input.mean_anomaly,
    };

    let solution = solve_normalized(input, initial_guess, params, Some(cancel));
    let code = match solution.outcome {
        KeplerOutcome::Converged { .. } => {
            println!(
                "Solution converges to {:.6} radians with an error of {:.10e}, which in degrees is:",
                solution.eccentric_anomaly(),
                solution.residual
            );
            ExitCode::SUCCESS
        }
        KeplerOutcome::DidNotConverge { iterations, .. } => {
            println!(
                "No convergence after {} iterations; last iterate {:.6} radians with an error of {:.10e}, which in degrees is:",
                iterations,
                solution.eccentric_anomaly(),
                solution.residual
            );
            ExitCode::from(EXIT_DID_NOT_CONVERGE)
        }
        KeplerOutcome::Interrupted { iterations, .. } => {
            println!(
                "Interrupted after {} iterations; last iterate {:.6} radians with an error of {:.10e}, which in degrees is:",
                iterations,
                solution.eccentric_anomaly(),
                solution.residual
            );
            ExitCode::from(EXIT_INTERRUPTED)
        }
    };
    println!("{:.6}", solution.angle_deg);
    Ok(code)
}

fn run_batch(
    path: &Path,
    params: &SolverParams,
    cancel: &CancellationToken,
) -> Result<ExitCode, KeplerError> {
    let cases = read_cases(File::open(path)?)?;
    info!(cases = cases.len(), path = %path.display(), "loaded batch");

    let summary = solve_batch(&cases, io::stdout().lock(), params, Some(cancel))?;
    let code = if summary.interrupted > 0 {
        ExitCode::from(EXIT_INTERRUPTED)
    } else if summary.did_not_converge > 0 {
        ExitCode::from(EXIT_DID_NOT_CONVERGE)
    } else {
        ExitCode::SUCCESS
    };
    Ok(code)
}

async fn run(cli: Cli) -> Result<ExitCode, KeplerError> {
    let params = cli.solver_params()?;
    info!(%params, "solver configuration");

    let cancel = CancellationToken::new();
    spawn_signal_watchers(&cancel)?;
    if let Some(ms) = cli.timeout_ms {
        spawn_timeout(&cancel, Duration::from_millis(ms));
    }

    tokio::task::spawn_blocking(move || match &cli.batch {
        Some(path) => run_batch(path, &params, &cancel),
        None => run_single(&cli, &params, &cancel),
    })
    .await
    .map_err(|e| KeplerError::SolverTaskError(e.to_string()))?
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            // Exit code 2 belongs to non-convergence, every other parse error is a usage error
            if err.kind() == ErrorKind::MissingRequiredArgument {
                let program = std::env::args().next().unwrap_or_else(|| "kepler".into());
                usage(&program);
            } else {
                let _ = err.print();
            }
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            error!("{err}");
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

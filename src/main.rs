//! Command-line driver for circuit breakers.
//!
//! `simulate` replays a list of call outcomes against a breaker on a manual
//! clock, which makes it easy to see how a configuration trips and recovers.
//! `check` loads and validates a configuration file.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use circuit_guard::config::{load_config, GuardConfig};
use circuit_guard::observability::logging::init_logging;
use circuit_guard::resilience::{Clock, FnClassifier, ManualClock};
use circuit_guard::{Breaker, BreakerError, BreakerRegistry, BreakerSnapshot};

#[derive(Parser)]
#[command(name = "circuit-guard")]
#[command(about = "Simulate and validate circuit breaker configurations", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file (defaults are used otherwise).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay call outcomes against a breaker
    Simulate {
        /// Comma separated outcomes: ok, fail (counts toward tripping), skip (ignored error)
        #[arg(short, long, value_delimiter = ',', required = true)]
        outcomes: Vec<Outcome>,

        /// Seconds the clock advances after each call
        #[arg(short, long, default_value_t = 1.0)]
        step_secs: f64,

        /// Route calls through a registry under this key
        #[arg(short, long)]
        key: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Validate the configuration and print it
    Check,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Outcome {
    Ok,
    Fail,
    Skip,
}

#[derive(Debug, Clone)]
struct SimulatedError {
    trips: bool,
}

impl fmt::Display for SimulatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trips {
            write!(f, "simulated dependency failure")
        } else {
            write!(f, "simulated ignored error")
        }
    }
}

impl Error for SimulatedError {}

#[derive(Serialize)]
struct CallReport {
    call: usize,
    at: f64,
    outcome: String,
}

#[derive(Serialize)]
struct Report {
    calls: Vec<CallReport>,
    breakers: Vec<BreakerSnapshot>,
}

enum Target {
    Single(Breaker<SimulatedError>),
    Keyed(BreakerRegistry<String, SimulatedError>, String),
}

impl Target {
    async fn call(&self, outcome: Outcome) -> Result<(), BreakerError<SimulatedError>> {
        let operation = || async move {
            match outcome {
                Outcome::Ok => Ok(()),
                Outcome::Fail => Err(SimulatedError { trips: true }),
                Outcome::Skip => Err(SimulatedError { trips: false }),
            }
        };
        match self {
            Target::Single(breaker) => breaker.run(operation).await,
            Target::Keyed(registry, key) => registry.run(key.clone(), operation).await,
        }
    }

    fn snapshots(&self) -> Vec<BreakerSnapshot> {
        match self {
            Target::Single(breaker) => vec![breaker.snapshot()],
            Target::Keyed(registry, _) => registry.snapshots(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GuardConfig::default(),
    };
    init_logging(&config.observability)?;

    match cli.command {
        Commands::Check => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Simulate {
            outcomes,
            step_secs,
            key,
            json,
        } => {
            let report = simulate(&config, &outcomes, step_secs, key).await;
            print_report(&report, json)?;
        }
    }

    Ok(())
}

async fn simulate(
    config: &GuardConfig,
    outcomes: &[Outcome],
    step_secs: f64,
    key: Option<String>,
) -> Report {
    let clock = Arc::new(ManualClock::new(0.0));
    let classifier = Arc::new(FnClassifier::new(|e: &SimulatedError| e.trips));

    let target = match key {
        Some(key) => {
            let registry = BreakerRegistry::<String, SimulatedError>::new(
                config.breaker.name.clone(),
                config.breaker.clone(),
            )
            .with_classifier(classifier)
            .with_clock(clock.clone());
            Target::Keyed(registry, key)
        }
        None => Target::Single(
            Breaker::<SimulatedError>::new(config.breaker.clone())
                .with_classifier(classifier)
                .with_clock(clock.clone()),
        ),
    };

    let mut calls = Vec::with_capacity(outcomes.len());
    for (i, outcome) in outcomes.iter().enumerate() {
        let at = clock.now();
        let outcome = match target.call(*outcome).await {
            Ok(()) => "ok".to_string(),
            Err(BreakerError::Open(e)) => format!("rejected: {}", e),
            Err(BreakerError::Operation(e)) => format!("error: {}", e),
        };
        calls.push(CallReport {
            call: i + 1,
            at,
            outcome,
        });
        clock.advance(step_secs);
    }

    Report {
        calls,
        breakers: target.snapshots(),
    }
}

fn print_report(report: &Report, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for call in &report.calls {
        println!("call {:>3} t={:>8.2}s  {}", call.call, call.at, call.outcome);
    }
    for breaker in &report.breakers {
        println!(
            "breaker '{}' state={} failures={}",
            breaker.name, breaker.state, breaker.failure_count
        );
    }
    Ok(())
}

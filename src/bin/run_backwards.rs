//! Backward integration of a grid of test particles, from a run configuration file.
//!
//! ```text
//! run_backwards run.toml
//! RUST_LOG=bibimb=debug run_backwards inputs.txt --output-directory results/
//! ```
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bibimb::prelude::*;

/// Backward integration in a rotating galactic potential
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Run configuration: TOML, or a `key value` input file
    #[arg(value_name = "FILE")]
    config: Utf8PathBuf,

    /// Folder to store the results (overrides the configuration)
    #[arg(short, long, value_name = "DIR")]
    output_directory: Option<Utf8PathBuf>,

    /// Pattern speed in km/s/kpc, negative for a prograde rotation (overrides the configuration)
    #[arg(short, long, value_name = "OMEGA", allow_hyphen_values = true)]
    pattern_speed: Option<f64>,
}

fn run(args: Args) -> Result<(), BibimbError> {
    let mut config = RunConfig::read_file(&args.config)?;
    if let Some(dir) = args.output_directory {
        config.output_directory = dir;
    }
    if let Some(omega) = args.pattern_speed {
        config.integration.pattern_speed = omega;
    }

    let output = Bibimb::run_config(&config)?;
    for file in &output.files {
        println!("{file}");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Args::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

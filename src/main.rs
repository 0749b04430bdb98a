//! voiceprep CLI
//!
//! Command-line interface for the voice-sample preprocessing pipeline.

use std::process::ExitCode;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use voiceprep::cli::{commands, Cli, Commands};
use voiceprep::pipeline::ValidationPolicy;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("voiceprep v{}", env!("CARGO_PKG_VERSION"));

    let valid = handle_command(cli.command)?;
    Ok(if valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

/// Run a command; `false` means the sample was rejected
fn handle_command(cmd: Commands) -> anyhow::Result<bool> {
    match cmd {
        Commands::Process {
            input,
            output,
            config,
            sample_rate,
            policy,
        } => {
            let config = commands::load_config(config.as_deref(), sample_rate)?;
            let verdict = commands::process(&input, &output, config, policy.policy())?;
            Ok(verdict.map_or(true, |v| v.valid))
        }
        Commands::Validate {
            input,
            min_secs,
            max_secs,
            min_bytes,
            json,
        } => {
            let policy = ValidationPolicy {
                min_bytes,
                ..ValidationPolicy::with_duration(min_secs, max_secs)
            };
            Ok(commands::validate(&input, &policy, json)?.valid)
        }
        Commands::Inspect { input } => {
            commands::inspect(&input)?;
            Ok(true)
        }
        Commands::Batch {
            input_dir,
            output_dir,
            config,
        } => {
            let config = commands::load_config(config.as_deref(), None)?;
            let summary = commands::batch(&input_dir, &output_dir, config)?;
            Ok(summary.failed.is_empty())
        }
    }
}

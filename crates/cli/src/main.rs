//! StepGuard CLI - Main Entry Point
//!
//! Runs the page checks once, outside a test run: inspect a live URL
//! through the static session, or validate a local markup file.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

use commands::{check, config, validate};

/// StepGuard CLI - out-of-band page checks
#[derive(Parser)]
#[command(name = "stepguard")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file
    #[arg(long, default_value = "stepguard.toml", env = "STEPGUARD_CONFIG", global = true)]
    config: PathBuf,

    /// Output format
    #[arg(long, default_value = "table", global = true)]
    format: output::OutputFormat,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL and run the signature scan and markup validation on it
    Check(check::CheckArgs),

    /// Validate a local markup file
    Validate(validate::ValidateArgs),

    /// Print the effective configuration
    Config,

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let settings = config::load(&cli.config)?;

    match cli.command {
        Commands::Check(args) => check::execute(args, settings, cli.format).await?,
        Commands::Validate(args) => validate::execute(args, settings, cli.format).await?,
        Commands::Config => config::execute(&settings, cli.format)?,
        Commands::Version => {
            println!("StepGuard CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("Library v{}", stepguard::VERSION);
        }
    }

    Ok(())
}

//! Cinder compiler CLI
//!
//! Works on JSON-serialized syntax trees produced by the parser.

use anyhow::Result;
use clap::{Parser, Subcommand};
use cn_driver::CompileConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod check;
mod ir;
mod render;

#[derive(Parser)]
#[command(name = "cinder")]
#[command(about = "Cinder semantic checker", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to `cinder.toml` next to the input)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a program and report diagnostics
    Check {
        /// JSON file holding a list of source files
        path: PathBuf,
    },

    /// Print the IR of every struct and function
    Ir {
        /// JSON file holding a list of source files
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Check { path } => {
            let config = load_config(cli.config.as_deref(), path)?;
            check::check(path, config)?;
        }
        Commands::Ir { path } => {
            let config = load_config(cli.config.as_deref(), path)?;
            ir::print_ir(path, config)?;
        }
    }

    Ok(())
}

fn load_config(explicit: Option<&Path>, input: &Path) -> Result<CompileConfig> {
    let config = match explicit {
        Some(path) => CompileConfig::from_file(path)?,
        None => CompileConfig::discover(input)?,
    };
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Logs go to stderr, filtered by `CINDER_LOG`
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("CINDER_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

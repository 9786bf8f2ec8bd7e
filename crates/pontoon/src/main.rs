//! Pontoon CLI - scheduled database replication through an
//! object-storage bridge
//!
//! This is the main entry point for the pontoon command-line interface.

mod cli;
mod commands;
mod runners;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Run(args) => commands::run::run(args, cli.config.as_deref()).await,
        Commands::Dump(args) => commands::dump::run(args, cli.config.as_deref()).await,
        Commands::Restore(args) => commands::restore::run(args, cli.config.as_deref()).await,
        Commands::Manifests(args) => commands::manifests::run(args, cli.config.as_deref()).await,
        Commands::Version(args) => commands::version::run(args),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

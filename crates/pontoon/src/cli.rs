//! CLI argument definitions

use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, Subcommand};

use crate::commands;

/// Pontoon - scheduled database replication through an object-storage
/// bridge
#[derive(Parser, Debug)]
#[command(name = "pontoon", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./pontoon.yaml)
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the scheduler daemon for every configured job
    Run(commands::run::RunArgs),

    /// Dump one configured source now, outside its schedule
    Dump(commands::dump::DumpArgs),

    /// Restore one configured destination now, outside its schedule
    Restore(commands::restore::RestoreArgs),

    /// List stored manifests for a source job
    Manifests(commands::manifests::ManifestsArgs),

    /// Show version information
    Version(commands::version::VersionArgs),
}

//! Root CLI structure with global options.

use clap::Parser;
use std::path::PathBuf;

use crate::commands::Commands;

/// Command-line interface for the svcbind runtime.
#[derive(Parser)]
#[command(name = "svcbind")]
#[command(about = "Bind component dependencies to dynamically registered services")]
#[command(version)]
pub struct Cli {
    /// JSON settings file with dependency defaults
    #[arg(long = "settings", global = true, env = "SVCBIND_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

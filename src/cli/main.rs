use std::path::PathBuf;

use clap::Parser;

use crate::Commands;

/// Main CLI application arguments and command structure
#[derive(Parser, Debug)]
#[clap(
    name = "gdnotes",
    version,
    about = "Git-backed note workspace"
)]
pub struct Cli {
    /// Path to the configuration file
    #[clap(short = 'c', long, value_parser)]
    pub config: Option<PathBuf>,

    /// Directory holding the workspace (overrides the configuration)
    #[clap(long, value_parser)]
    pub root_dir: Option<PathBuf>,

    /// Verbose output mode
    #[clap(short, long)]
    pub verbose: bool,

    /// Subcommands for the gdnotes application
    #[clap(subcommand)]
    pub command: Commands,
}

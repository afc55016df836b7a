//! Command-line interface for CombatSim
//!
//! The binary only runs headless scenarios; graphical hosts embed the
//! library directly.

use clap::Parser;
use std::path::PathBuf;

/// Real-time combat simulation core
#[derive(Parser, Debug)]
#[command(name = "combatsim")]
#[command(about = "Headless combat scenario runner")]
#[command(version)]
pub struct Args {
    /// Run the scenario described by the given JSON config file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub scenario: PathBuf,

    /// Output path for the combat log (overrides the config file)
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Random seed (overrides the config file)
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn parse_args() -> Args {
    Args::parse()
}

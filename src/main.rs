//! CombatSim - Real-Time Combat Simulation Core
//!
//! Binary entry point: runs headless combat scenarios from JSON configs.

use combatsim::cli;
use combatsim::headless::{run_scenario, ScenarioConfig};

fn main() {
    let args = cli::parse_args();

    let mut config = match ScenarioConfig::load_from_file(&args.scenario) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading scenario config: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(output) = args.output {
        config.output_path = Some(output.to_string_lossy().into_owned());
    }
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }

    if let Err(e) = run_scenario(config) {
        eprintln!("Scenario failed: {}", e);
        std::process::exit(1);
    }
}

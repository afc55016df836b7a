//! Headless mode for agentic testing
//!
//! Runs combat scenarios without any graphical output, suitable for
//! automated testing, balance analysis, and AI agent integration.
//!
//! ## Usage
//!
//! ```bash
//! # Run a headless scenario
//! cargo run --release -- --scenario scenario.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "player": { "character": "ranger" },
//!   "enemies": [{ "character": "raider", "count": 3 }],
//!   "duration_secs": 30,
//!   "random_seed": 42,
//!   "script": [{ "at": 1.0, "action": { "Cast": { "skill": "piercing_bolt" } } }]
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::ScenarioConfig;
pub use runner::run_scenario;

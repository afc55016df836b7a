//! CombatSim - Real-Time Combat Simulation Core
//!
//! The authoritative combat layer of an action game: stat blocks, timed
//! reversible modifiers, a single damage pipeline, skill casts with
//! multi-shot fans and dashes, recurring perks, and experience progression.
//! Rendering, input, and persistence live in host crates; this one only
//! simulates and notifies.
//!
//! This library exposes the core modules for testing and reuse.

pub mod cli;
pub mod combat;
pub mod config;
pub mod headless;

// Re-export commonly used types
pub use combat::log::{CombatLog, CombatLogEventType};
pub use combat::systems::{CombatSystemPhase, SimulationSpeed, StatBlock};
pub use combat::CombatPlugin;
pub use config::{CharacterDefinitions, SkillDefinitions};
pub use headless::ScenarioConfig;

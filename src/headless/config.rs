//! JSON configuration parsing for headless mode
//!
//! Parses JSON scenario configurations: who fights, for how long, and the
//! scripted actions driving the player.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::config::{CharacterId, SavedLoadout, SkillId};

/// Headless scenario configuration loaded from JSON
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    /// Display name used in the saved log
    #[serde(default = "default_name")]
    pub scenario_name: String,
    /// The scripted combatant
    pub player: CombatantSpec,
    /// Opposition. May be empty for pure utility-skill scenarios.
    #[serde(default)]
    pub enemies: Vec<EnemySpec>,
    /// Maximum scenario duration in seconds (default: 30)
    #[serde(default = "default_duration")]
    pub duration_secs: f32,
    /// Random seed for deterministic scenario reproduction
    #[serde(default)]
    pub random_seed: Option<u64>,
    /// Custom output path for the combat log (optional)
    #[serde(default)]
    pub output_path: Option<String>,
    /// Timed actions applied to the player, sorted by `at` on load
    #[serde(default)]
    pub script: Vec<ScriptedAction>,
}

fn default_name() -> String {
    "scenario".to_string()
}

fn default_duration() -> f32 {
    30.0
}

/// One combatant entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombatantSpec {
    /// Character id from characters.ron
    pub character: CharacterId,
    /// Persisted save state (level, xp, upgrades, items)
    #[serde(default)]
    pub loadout: SavedLoadout,
    /// Skill levels (unlisted skills default to level 1)
    #[serde(default)]
    pub skill_levels: HashMap<SkillId, u32>,
    /// Perks equipped at setup
    #[serde(default)]
    pub perks: Vec<PerkSpec>,
    /// Spawn position
    #[serde(default)]
    pub position: [f32; 3],
    /// Auto-attack range (default: 12)
    #[serde(default = "default_attack_range")]
    pub attack_range: f32,
}

fn default_attack_range() -> f32 {
    12.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerkSpec {
    pub skill: SkillId,
    #[serde(default = "default_level")]
    pub level: u32,
}

fn default_level() -> u32 {
    1
}

/// A group of identical enemies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySpec {
    pub character: CharacterId,
    #[serde(default = "default_count")]
    pub count: u32,
    /// Position of the first enemy; the rest spread along X by `spacing`
    #[serde(default = "default_enemy_position")]
    pub position: [f32; 3],
    #[serde(default = "default_spacing")]
    pub spacing: f32,
}

fn default_count() -> u32 {
    1
}

fn default_enemy_position() -> [f32; 3] {
    [8.0, 0.0, 0.0]
}

fn default_spacing() -> f32 {
    2.0
}

/// A timed action the runner applies to the player
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedAction {
    /// Simulation time at which to fire, in seconds
    pub at: f32,
    pub action: ActionKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ActionKind {
    /// Request a skill cast with an optional input direction
    Cast {
        skill: SkillId,
        #[serde(default)]
        direction: [f32; 3],
    },
    /// Equip (or re-equip at a new level) a recurring perk
    EquipPerk { skill: SkillId, level: u32 },
    /// Grant experience points
    GrantXp { amount: f32 },
    /// Pause the simulation clock
    Pause,
    /// Resume the simulation clock at normal speed
    Resume,
    /// Revive the player if dead
    Revive,
}

impl ScenarioConfig {
    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let mut config: ScenarioConfig =
            serde_json::from_str(&contents).map_err(|e| format!("Failed to parse JSON: {}", e))?;

        config.validate()?;
        config
            .script
            .sort_by(|a, b| a.at.partial_cmp(&b.at).unwrap_or(std::cmp::Ordering::Equal));
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.duration_secs <= 0.0 {
            return Err("duration_secs must be positive".to_string());
        }
        if self.player.character.is_empty() {
            return Err("player.character must not be empty".to_string());
        }
        for enemy in &self.enemies {
            if enemy.count == 0 {
                return Err(format!(
                    "enemy group '{}' must have count >= 1",
                    enemy.character
                ));
            }
        }
        for action in &self.script {
            if action.at < 0.0 {
                return Err("script action times must be non-negative".to_string());
            }
            if action.at > self.duration_secs {
                return Err(format!(
                    "script action at {:.1}s is past the scenario duration",
                    action.at
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ScenarioConfig {
        serde_json::from_str(r#"{ "player": { "character": "ranger" } }"#).unwrap()
    }

    #[test]
    fn test_defaults_apply() {
        let config = minimal();
        assert_eq!(config.duration_secs, 30.0);
        assert!(config.enemies.is_empty());
        assert!(config.script.is_empty());
        assert_eq!(config.player.attack_range, 12.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_duration() {
        let mut config = minimal();
        config.duration_secs = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_script_past_duration() {
        let mut config = minimal();
        config.script.push(ScriptedAction {
            at: 99.0,
            action: ActionKind::Pause,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parses_scripted_cast() {
        let config: ScenarioConfig = serde_json::from_str(
            r#"{
                "player": { "character": "ranger" },
                "enemies": [{ "character": "raider", "count": 2 }],
                "script": [
                    { "at": 1.0, "action": { "Cast": { "skill": "piercing_bolt" } } },
                    { "at": 2.0, "action": { "GrantXp": { "amount": 50.0 } } }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.enemies[0].count, 2);
        assert!(matches!(
            config.script[0].action,
            ActionKind::Cast { ref skill, .. } if skill == "piercing_bolt"
        ));
    }
}

//! Data-Driven Content Configuration
//!
//! Static character and skill definitions are loaded from RON config files
//! instead of being hardcoded in Rust. Balance changes don't require
//! recompilation, and every definition is validated at startup.
//!
//! - `assets/config/characters.ron` — character archetypes, upgrade tuning,
//!   and the XP level table
//! - `assets/config/skills.ron` — skill and perk definitions
//!
//! ## Usage
//! ```ignore
//! fn my_system(skills: Res<SkillDefinitions>) {
//!     let def = skills.get_unchecked("piercing_bolt");
//!     println!("cooldown: {}", def.cooldown);
//! }
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::combat::stats::StatKind;

/// Content-defined skill identifier (key into `skills.ron`)
pub type SkillId = String;

/// Content-defined character identifier (key into `characters.ron`)
pub type CharacterId = String;

// ============================================================================
// Character Content
// ============================================================================

/// Base stat table for one character archetype.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BaseStats {
    pub max_hp: f32,
    #[serde(default)]
    pub hp_regen: f32,
    #[serde(default)]
    pub hp_leech_rate: f32,
    #[serde(default)]
    pub max_mp: f32,
    #[serde(default)]
    pub mp_regen: f32,
    pub damage: f32,
    /// Auto-attack interval in seconds
    #[serde(default = "default_attack_speed")]
    pub attack_speed: f32,
    #[serde(default)]
    pub cooldown_reduction_pct: f32,
    #[serde(default)]
    pub crit_rate: f32,
    #[serde(default = "default_crit_multiplier")]
    pub crit_multiplier: f32,
    #[serde(default)]
    pub defense: f32,
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    #[serde(default)]
    pub collect_range: f32,
}

fn default_attack_speed() -> f32 {
    1.0
}

fn default_crit_multiplier() -> f32 {
    2.0
}

fn default_move_speed() -> f32 {
    5.0
}

/// A purchasable upgrade track: each owned level grants `per_level` to `stat`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpgradeDef {
    pub stat: StatKind,
    pub per_level: f32,
}

/// One character archetype definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CharacterConfig {
    /// Display name
    pub name: String,
    pub base: BaseStats,
    /// Upgrade tracks this character can own (keyed by upgrade id)
    #[serde(default)]
    pub upgrades: HashMap<String, UpgradeDef>,
    /// Skills castable on demand
    #[serde(default)]
    pub skills: Vec<SkillId>,
    /// Recurring perks this character may equip
    #[serde(default)]
    pub perks: Vec<SkillId>,
}

/// Root structure for the characters.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct CharactersConfig {
    /// XP required to advance from level N to N+1 (index = level - 1)
    pub xp_table: Vec<f32>,
    pub characters: HashMap<CharacterId, CharacterConfig>,
}

/// Resource containing all character definitions and the XP table.
#[derive(Resource)]
pub struct CharacterDefinitions {
    definitions: HashMap<CharacterId, CharacterConfig>,
    xp_table: Vec<f32>,
}

impl CharacterDefinitions {
    pub fn new(config: CharactersConfig) -> Self {
        Self {
            definitions: config.characters,
            xp_table: config.xp_table,
        }
    }

    pub fn get(&self, id: &str) -> Option<&CharacterConfig> {
        self.definitions.get(id)
    }

    /// Get a definition, panicking if missing. Use when the id was
    /// validated at startup.
    pub fn get_unchecked(&self, id: &str) -> &CharacterConfig {
        self.definitions
            .get(id)
            .unwrap_or_else(|| panic!("Character '{}' not found in definitions", id))
    }

    /// XP thresholds per level (index = level - 1)
    pub fn xp_table(&self) -> &[f32] {
        &self.xp_table
    }

    /// Highest reachable level (exhausting the XP table)
    pub fn max_level(&self) -> u32 {
        self.xp_table.len() as u32 + 1
    }

    pub fn character_ids(&self) -> impl Iterator<Item = &CharacterId> {
        self.definitions.keys()
    }

    /// Check every skill/perk reference against the skill definitions and
    /// the XP table for sanity.
    pub fn validate(&self, skills: &SkillDefinitions) -> Result<(), String> {
        if self.xp_table.is_empty() {
            return Err("xp_table must not be empty".to_string());
        }
        if self.xp_table.iter().any(|t| *t <= 0.0) {
            return Err("xp_table thresholds must be positive".to_string());
        }
        for (id, character) in &self.definitions {
            for skill_id in character.skills.iter().chain(character.perks.iter()) {
                if skills.get(skill_id).is_none() {
                    return Err(format!(
                        "Character '{}' references unknown skill '{}'",
                        id, skill_id
                    ));
                }
            }
            for perk_id in &character.perks {
                if !skills.get_unchecked(perk_id).is_perk {
                    return Err(format!(
                        "Character '{}' lists '{}' as a perk, but it is not flagged is_perk",
                        id, perk_id
                    ));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Skill Content
// ============================================================================

/// How a cast resolves its firing direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AimMode {
    /// Use the direction supplied with the cast request
    InputDirection,
    /// Aim at the nearest living enemy
    NearestEnemy,
    /// Current facing
    Forward,
    /// Opposite of current facing
    Reverse,
    /// Uniformly random direction
    Random,
}

/// Multi-shot fan-out: `count` shots spread evenly across `angle` degrees,
/// fired `delay` seconds apart.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MultiShot {
    pub count: u32,
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub delay: f32,
}

impl MultiShot {
    pub fn single() -> Self {
        Self {
            count: 1,
            angle: 0.0,
            delay: 0.0,
        }
    }
}

/// Dash motion parameters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DashParams {
    pub speed: f32,
    pub duration: f32,
    /// Dash away from the aim direction instead of toward it
    #[serde(default)]
    pub reverse: bool,
    #[serde(default = "default_waves")]
    pub waves: u32,
    /// Delay between waves of a multi-wave dash
    #[serde(default)]
    pub wave_delay: f32,
    /// Re-resolve the direction to the nearest enemy at each wave start
    #[serde(default)]
    pub retarget_per_wave: bool,
}

fn default_waves() -> u32 {
    1
}

/// Self-effect granted as part of a cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectKind {
    /// Instant heal (magnitude = HP)
    Heal,
    /// Timed absorbing shield (magnitude = shield amount)
    Shield,
    /// Timed movement speed buff (magnitude = speed delta)
    MoveSpeed,
    /// Timed attack speed buff (magnitude = interval reduction in seconds)
    AttackSpeed,
    /// Timed defense buff
    Defense,
    /// Timed damage buff
    Damage,
    /// Timed damage immunity
    Invincible,
    /// Timed movement slow applied to self (e.g. heavy stance)
    Slow,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SelfEffect {
    pub kind: EffectKind,
    pub magnitude: f32,
    #[serde(default)]
    pub duration: f32,
}

/// Damage-over-time rider attached to a skill's hits.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct DotParams {
    pub total_damage: f32,
    pub duration: f32,
}

/// Immutable per-skill configuration loaded from RON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkillConfig {
    /// Display name
    pub name: String,

    // === Cast gating ===
    #[serde(default)]
    pub mana_cost: f32,
    #[serde(default)]
    pub cooldown: f32,
    #[serde(default = "default_aim")]
    pub aim: AimMode,

    // === Damage ===
    /// Base damage at level 1 (0 = utility skill)
    #[serde(default)]
    pub damage_base: f32,
    /// Additional damage per skill level above 1
    #[serde(default)]
    pub damage_per_level: f32,
    /// Extra damage multiplier applied at the evolved (max) level
    #[serde(default = "default_one")]
    pub evolved_damage_mult: f32,

    // === Shots & motion ===
    #[serde(default)]
    pub multishot: Option<MultiShot>,
    /// Overrides `multishot` once the skill reaches max level
    #[serde(default)]
    pub evolved_multishot: Option<MultiShot>,
    #[serde(default)]
    pub dash: Option<DashParams>,

    // === Riders ===
    #[serde(default)]
    pub effects: Vec<SelfEffect>,
    #[serde(default)]
    pub dot: Option<DotParams>,

    // === Sequence timing ===
    /// Delay between the cast sequence finishing and shots launching
    #[serde(default)]
    pub pre_launch_delay: f32,
    /// Movement-stop window requested at cast start
    #[serde(default)]
    pub stop_window: f32,
    /// Model-facing rotation window at cast start
    #[serde(default)]
    pub facing_time: f32,

    // === Leveling ===
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    /// Recurring perk: runs its own autonomous cast loop when equipped
    #[serde(default)]
    pub is_perk: bool,
}

fn default_aim() -> AimMode {
    AimMode::NearestEnemy
}

fn default_max_level() -> u32 {
    5
}

fn default_one() -> f32 {
    1.0
}

impl SkillConfig {
    /// Returns true if this skill produces damage hits
    pub fn deals_damage(&self) -> bool {
        self.damage_base > 0.0 || self.damage_per_level > 0.0
    }

    /// Whether `level` unlocks the evolved variant
    pub fn is_evolved(&self, level: u32) -> bool {
        level >= self.max_level
    }

    /// Damage of one hit at the given skill level
    pub fn damage_at(&self, level: u32) -> f32 {
        let level = level.max(1);
        let base = self.damage_base + self.damage_per_level * (level - 1) as f32;
        if self.is_evolved(level) {
            base * self.evolved_damage_mult
        } else {
            base
        }
    }

    /// Multi-shot parameters at the given skill level (evolved override at max)
    pub fn shots_at(&self, level: u32) -> MultiShot {
        if self.is_evolved(level) {
            if let Some(evolved) = self.evolved_multishot {
                return evolved;
            }
        }
        self.multishot.unwrap_or_else(MultiShot::single)
    }
}

/// Root structure for the skills.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct SkillsConfig {
    pub skills: HashMap<SkillId, SkillConfig>,
}

/// Resource containing all skill definitions.
#[derive(Resource)]
pub struct SkillDefinitions {
    definitions: HashMap<SkillId, SkillConfig>,
}

impl SkillDefinitions {
    pub fn new(config: SkillsConfig) -> Self {
        Self {
            definitions: config.skills,
        }
    }

    pub fn get(&self, id: &str) -> Option<&SkillConfig> {
        self.definitions.get(id)
    }

    /// Get a definition, panicking if missing. Use when the id was
    /// validated at startup.
    pub fn get_unchecked(&self, id: &str) -> &SkillConfig {
        self.definitions
            .get(id)
            .unwrap_or_else(|| panic!("Skill '{}' not found in definitions", id))
    }

    pub fn skill_ids(&self) -> impl Iterator<Item = &SkillId> {
        self.definitions.keys()
    }

    /// Numeric sanity checks over every definition.
    pub fn validate(&self) -> Result<(), String> {
        for (id, skill) in &self.definitions {
            if skill.name.is_empty() {
                return Err(format!("Skill '{}' has an empty name", id));
            }
            if skill.mana_cost < 0.0 || skill.cooldown < 0.0 {
                return Err(format!("Skill '{}' has negative cost or cooldown", id));
            }
            if skill.max_level == 0 {
                return Err(format!("Skill '{}' must have max_level >= 1", id));
            }
            if let Some(shots) = skill.multishot {
                if shots.count == 0 {
                    return Err(format!("Skill '{}' multishot count must be >= 1", id));
                }
            }
            if let Some(dash) = skill.dash {
                if dash.speed <= 0.0 || dash.duration <= 0.0 || dash.waves == 0 {
                    return Err(format!("Skill '{}' has invalid dash parameters", id));
                }
            }
            if let Some(dot) = skill.dot {
                if dot.total_damage <= 0.0 || dot.duration <= 0.0 {
                    return Err(format!("Skill '{}' has invalid dot parameters", id));
                }
            }
        }
        Ok(())
    }
}

// ============================================================================
// Persisted Save Input
// ============================================================================

/// The per-save state an external save system hands the core once at entity
/// setup. The core only reads it; it never writes saves.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SavedLoadout {
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub xp: f32,
    /// Owned upgrade levels keyed by upgrade id
    #[serde(default)]
    pub upgrade_levels: HashMap<String, u32>,
    /// Flat stat bonuses from equipped items
    #[serde(default)]
    pub item_bonuses: Vec<ItemBonus>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemBonus {
    pub stat: StatKind,
    pub amount: f32,
}

// ============================================================================
// Loading
// ============================================================================

const CHARACTERS_PATH: &str = "assets/config/characters.ron";
const SKILLS_PATH: &str = "assets/config/skills.ron";

/// Load character definitions from assets/config/characters.ron
pub fn load_character_definitions() -> Result<CharacterDefinitions, String> {
    let contents = std::fs::read_to_string(CHARACTERS_PATH)
        .map_err(|e| format!("Failed to read {}: {}", CHARACTERS_PATH, e))?;
    let config: CharactersConfig = ron::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", CHARACTERS_PATH, e))?;
    Ok(CharacterDefinitions::new(config))
}

/// Load skill definitions from assets/config/skills.ron
pub fn load_skill_definitions() -> Result<SkillDefinitions, String> {
    let contents = std::fs::read_to_string(SKILLS_PATH)
        .map_err(|e| format!("Failed to read {}: {}", SKILLS_PATH, e))?;
    let config: SkillsConfig = ron::from_str(&contents)
        .map_err(|e| format!("Failed to parse {}: {}", SKILLS_PATH, e))?;
    let definitions = SkillDefinitions::new(config);
    definitions.validate()?;
    Ok(definitions)
}

/// Bevy plugin that loads and cross-validates all content at startup.
pub struct ContentPlugin;

impl Plugin for ContentPlugin {
    fn build(&self, app: &mut App) {
        let skills = match load_skill_definitions() {
            Ok(defs) => defs,
            Err(e) => panic!("Failed to load skill definitions: {}", e),
        };
        let characters = match load_character_definitions() {
            Ok(defs) => defs,
            Err(e) => panic!("Failed to load character definitions: {}", e),
        };
        if let Err(e) = characters.validate(&skills) {
            panic!("Content validation failed: {}", e);
        }
        info!(
            "Loaded {} characters and {} skills",
            characters.definitions.len(),
            skills.definitions.len()
        );
        app.insert_resource(skills).insert_resource(characters);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_skill() -> SkillConfig {
        SkillConfig {
            name: "Test".to_string(),
            mana_cost: 0.0,
            cooldown: 1.0,
            aim: AimMode::NearestEnemy,
            damage_base: 10.0,
            damage_per_level: 5.0,
            evolved_damage_mult: 1.0,
            multishot: None,
            evolved_multishot: None,
            dash: None,
            effects: vec![],
            dot: None,
            pre_launch_delay: 0.0,
            stop_window: 0.0,
            facing_time: 0.0,
            max_level: 5,
            is_perk: false,
        }
    }

    #[test]
    fn test_damage_scales_per_level() {
        let skill = bare_skill();
        assert_eq!(skill.damage_at(1), 10.0);
        assert_eq!(skill.damage_at(3), 20.0);
        // Levels below 1 are clamped, not an error
        assert_eq!(skill.damage_at(0), 10.0);
    }

    #[test]
    fn test_evolved_overrides_kick_in_at_max_level() {
        let mut skill = bare_skill();
        skill.multishot = Some(MultiShot {
            count: 3,
            angle: 30.0,
            delay: 0.1,
        });
        skill.evolved_multishot = Some(MultiShot {
            count: 6,
            angle: 60.0,
            delay: 0.05,
        });
        skill.evolved_damage_mult = 1.5;

        assert_eq!(skill.shots_at(4).count, 3);
        assert_eq!(skill.shots_at(5).count, 6);
        assert_eq!(skill.damage_at(5), (10.0 + 5.0 * 4.0) * 1.5);
    }

    #[test]
    fn test_shots_default_to_single() {
        let skill = bare_skill();
        let shots = skill.shots_at(1);
        assert_eq!(shots.count, 1);
        assert_eq!(shots.delay, 0.0);
    }
}

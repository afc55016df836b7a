//! Combat logging
//!
//! Records combat events for display and post-run analysis. Entries carry a
//! human-readable message plus, for damage, a structured record so tooling
//! can aggregate without re-parsing strings. The headless runner serializes
//! the whole log to JSON at the end of a scenario.

use bevy::prelude::*;
use bevy::utils::HashMap;
use serde::Serialize;

use super::components::SimulationSpeed;

/// A single entry in the combat log
#[derive(Debug, Clone, Serialize)]
pub struct CombatLogEntry {
    /// Timestamp in simulation time (seconds since scenario start)
    pub timestamp: f32,
    pub event_type: CombatLogEventType,
    /// Human-readable description of the event
    pub message: String,
    /// Structured payload for damage entries
    pub damage: Option<DamageRecord>,
}

/// Types of combat log events for filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CombatLogEventType {
    Damage,
    Death,
    Revive,
    SkillCast,
    LevelUp,
    Scenario,
}

/// Structured damage payload, named rather than entity-keyed so exports
/// stay meaningful across runs.
#[derive(Debug, Clone, Serialize)]
pub struct DamageRecord {
    pub attacker: String,
    pub target: String,
    /// Skill name, or None for an auto-attack
    pub skill: Option<String>,
    /// Total damage dealt including the absorbed portion
    pub total: f32,
    pub absorbed: f32,
    pub critical: bool,
}

/// Per-combatant summary attached to a saved log.
#[derive(Debug, Clone, Serialize)]
pub struct CombatantSummary {
    pub name: String,
    pub max_hp: f32,
    pub final_hp: f32,
    pub level: u32,
}

/// Scenario-level metadata attached to a saved log.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioMetadata {
    pub scenario_name: String,
    pub duration_secs: f32,
    pub random_seed: Option<u64>,
    pub combatants: Vec<CombatantSummary>,
}

#[derive(Serialize)]
struct SavedLog<'a> {
    metadata: &'a ScenarioMetadata,
    entries: &'a [CombatLogEntry],
}

/// The combat log resource storing all events
#[derive(Resource, Default)]
pub struct CombatLog {
    /// All log entries in chronological order
    pub entries: Vec<CombatLogEntry>,
    /// Current simulation time
    pub sim_time: f32,
    names: HashMap<Entity, String>,
}

impl CombatLog {
    /// Clear the log for a new scenario
    pub fn clear(&mut self) {
        self.entries.clear();
        self.names.clear();
        self.sim_time = 0.0;
    }

    /// Register a display name for an entity. Unregistered entities log as
    /// a generic id.
    pub fn register_combatant(&mut self, entity: Entity, name: impl Into<String>) {
        self.names.insert(entity, name.into());
    }

    pub fn name_of(&self, entity: Entity) -> String {
        self.names
            .get(&entity)
            .cloned()
            .unwrap_or_else(|| format!("entity {}", entity.index()))
    }

    /// Add a new entry to the log
    pub fn log(&mut self, event_type: CombatLogEventType, message: String) {
        self.entries.push(CombatLogEntry {
            timestamp: self.sim_time,
            event_type,
            message,
            damage: None,
        });
    }

    pub fn log_damage(
        &mut self,
        attacker: Entity,
        target: Entity,
        total: f32,
        absorbed: f32,
        critical: bool,
        skill: Option<&str>,
    ) {
        let attacker_name = self.name_of(attacker);
        let target_name = self.name_of(target);
        let verb = if critical { "crits" } else { "hits" };
        let source = skill.unwrap_or("attack");
        let message = if absorbed > 0.0 {
            format!(
                "{}'s {} {} {} for {:.0} damage ({:.0} absorbed)",
                attacker_name, source, verb, target_name, total, absorbed
            )
        } else {
            format!(
                "{}'s {} {} {} for {:.0} damage",
                attacker_name, source, verb, target_name, total
            )
        };
        self.entries.push(CombatLogEntry {
            timestamp: self.sim_time,
            event_type: CombatLogEventType::Damage,
            message,
            damage: Some(DamageRecord {
                attacker: attacker_name,
                target: target_name,
                skill: skill.map(str::to_string),
                total,
                absorbed,
                critical,
            }),
        });
    }

    pub fn log_death(&mut self, entity: Entity, killer: Option<Entity>) {
        let message = match killer {
            Some(killer) => format!("{} was slain by {}", self.name_of(entity), self.name_of(killer)),
            None => format!("{} died", self.name_of(entity)),
        };
        self.log(CombatLogEventType::Death, message);
    }

    pub fn log_revive(&mut self, entity: Entity) {
        let message = format!("{} was revived", self.name_of(entity));
        self.log(CombatLogEventType::Revive, message);
    }

    pub fn log_cast(&mut self, entity: Entity, skill: &str) {
        let message = format!("{} casts {}", self.name_of(entity), skill);
        self.log(CombatLogEventType::SkillCast, message);
    }

    pub fn log_level_up(&mut self, entity: Entity, level: u32) {
        let message = format!("{} reached level {}", self.name_of(entity), level);
        self.log(CombatLogEventType::LevelUp, message);
    }

    /// Get entries filtered by event type
    pub fn filter_by_type(&self, event_type: CombatLogEventType) -> Vec<&CombatLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.event_type == event_type)
            .collect()
    }

    /// Get the last N entries
    pub fn recent(&self, count: usize) -> Vec<&CombatLogEntry> {
        self.entries.iter().rev().take(count).rev().collect()
    }

    /// Total damage dealt per source (skill name, or "attack").
    pub fn damage_by_source(&self) -> HashMap<String, f32> {
        let mut totals = HashMap::default();
        for entry in &self.entries {
            if let Some(record) = &entry.damage {
                let key = record.skill.clone().unwrap_or_else(|| "attack".to_string());
                *totals.entry(key).or_insert(0.0) += record.total;
            }
        }
        totals
    }

    /// Serialize the log plus scenario metadata to a JSON file. Returns the
    /// path written to.
    pub fn save_to_file(
        &self,
        metadata: &ScenarioMetadata,
        output_path: Option<&str>,
    ) -> Result<String, String> {
        let path = output_path.unwrap_or("combat_log.json").to_string();
        let saved = SavedLog {
            metadata,
            entries: &self.entries,
        };
        let json = serde_json::to_string_pretty(&saved)
            .map_err(|e| format!("Failed to serialize combat log: {}", e))?;
        std::fs::write(&path, json).map_err(|e| format!("Failed to write {}: {}", path, e))?;
        Ok(path)
    }
}

/// Advance the log clock by pause-scaled time so timestamps line up with
/// every other countdown in the core.
pub fn advance_log_clock(time: Res<Time>, speed: Res<SimulationSpeed>, mut log: ResMut<CombatLog>) {
    log.sim_time += speed.scale(time.delta_secs());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_are_stamped_with_sim_time() {
        let mut log = CombatLog::default();
        log.sim_time = 12.5;
        log.log(CombatLogEventType::Scenario, "start".to_string());
        assert_eq!(log.entries[0].timestamp, 12.5);
    }

    #[test]
    fn test_damage_aggregates_by_source() {
        let mut log = CombatLog::default();
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        log.register_combatant(a, "Aria");
        log.register_combatant(b, "Dummy");
        log.log_damage(a, b, 10.0, 0.0, false, None);
        log.log_damage(a, b, 25.0, 5.0, true, Some("Piercing Bolt"));
        log.log_damage(a, b, 15.0, 0.0, false, Some("Piercing Bolt"));

        let totals = log.damage_by_source();
        assert_eq!(totals["attack"], 10.0);
        assert_eq!(totals["Piercing Bolt"], 40.0);
    }

    #[test]
    fn test_filter_and_recent() {
        let mut log = CombatLog::default();
        let a = Entity::from_raw(1);
        log.log_death(a, None);
        log.log(CombatLogEventType::Scenario, "end".to_string());
        assert_eq!(log.filter_by_type(CombatLogEventType::Death).len(), 1);
        assert_eq!(log.recent(1)[0].event_type, CombatLogEventType::Scenario);
    }

    #[test]
    fn test_unregistered_entities_get_generic_names() {
        let log = CombatLog::default();
        assert!(log.name_of(Entity::from_raw(9)).starts_with("entity"));
    }
}

//! Integration tests for progression, revival, and scenario configs
//!
//! These tests verify that:
//! - XP grants emit one notification per level increment
//! - Revival restores resources and grants a grace window
//! - Scenario JSON configs load and validate from disk
//! - Unknown character ids are rejected before the scenario starts

use bevy::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

use combatsim::combat::components::{Dead, Faction, LocalAuthority, StatEcho};
use combatsim::combat::events::{DamageIntent, GrantXp, LevelProgress, ReviveRequest};
use combatsim::combat::modifiers::ModifierLedger;
use combatsim::combat::stats::StatBlock;
use combatsim::combat::CombatPlugin;
use combatsim::config::{
    CharacterDefinitions, CharactersConfig, SkillDefinitions, SkillsConfig,
};
use combatsim::headless::{run_scenario, ScenarioConfig};

fn harness() -> App {
    let mut app = App::new();
    app.init_resource::<Time>();
    app.insert_resource(SkillDefinitions::new(SkillsConfig {
        skills: HashMap::new(),
    }));
    app.insert_resource(CharacterDefinitions::new(CharactersConfig {
        xp_table: vec![100.0, 200.0],
        characters: HashMap::new(),
    }));
    app.add_plugins(CombatPlugin);
    app
}

fn step(app: &mut App, secs: f32) {
    app.world_mut()
        .resource_mut::<Time>()
        .advance_by(Duration::from_secs_f32(secs));
    app.update();
}

fn block() -> StatBlock {
    StatBlock {
        max_hp: 100.0,
        hp: 100.0,
        hp_regen: 0.0,
        hp_leech_rate: 0.0,
        max_mp: 40.0,
        mp: 40.0,
        mp_regen: 0.0,
        damage: 10.0,
        attack_speed: 1.0,
        cooldown_reduction_pct: 0.0,
        crit_rate: 0.0,
        crit_multiplier: 2.0,
        defense: 0.0,
        shield: 0.0,
        move_speed: 5.0,
        collect_range: 0.0,
        level: 1,
        xp: 0.0,
    }
}

#[test]
fn test_xp_grant_emits_one_event_per_level() {
    let mut app = harness();
    let entity = app
        .world_mut()
        .spawn((
            block(),
            StatEcho::default(),
            ModifierLedger::default(),
            Faction(0),
            LocalAuthority,
            Transform::default(),
        ))
        .id();

    // 350 XP crosses both thresholds (100, then 200)
    app.world_mut().send_event(GrantXp {
        entity,
        amount: 350.0,
    });
    step(&mut app, 0.016);

    let stats = app.world().get::<StatBlock>(entity).unwrap();
    assert_eq!(stats.level, 3);
    assert_eq!(stats.xp, 50.0);

    let events = app.world().resource::<Events<LevelProgress>>();
    let mut cursor = events.get_cursor();
    let levels: Vec<u32> = cursor.read(events).map(|e| e.new_level).collect();
    assert_eq!(levels, vec![2, 3]);
}

#[test]
fn test_revive_restores_and_protects() {
    let mut app = harness();
    let mut dead_stats = block();
    dead_stats.hp = 0.0;
    dead_stats.mp = 0.0;
    let entity = app
        .world_mut()
        .spawn((
            dead_stats,
            StatEcho::default(),
            ModifierLedger::default(),
            Faction(0),
            LocalAuthority,
            Dead,
            Transform::default(),
        ))
        .id();
    let attacker = app
        .world_mut()
        .spawn((
            block(),
            StatEcho::default(),
            ModifierLedger::default(),
            Faction(1),
            LocalAuthority,
            Transform::default(),
        ))
        .id();

    app.world_mut().send_event(ReviveRequest { entity });
    step(&mut app, 0.016);

    let stats = app.world().get::<StatBlock>(entity).unwrap();
    assert!(app.world().get::<Dead>(entity).is_none());
    assert_eq!(stats.hp, 100.0);
    assert_eq!(stats.mp, 40.0);

    // The grace window swallows a lethal hit
    app.world_mut().send_event(DamageIntent {
        attacker,
        target: entity,
        amount: 500.0,
        critical: false,
        hit_id: 1,
        skill_name: None,
    });
    step(&mut app, 0.016);
    assert_eq!(app.world().get::<StatBlock>(entity).unwrap().hp, 100.0);

    // Once the window expires, hits land again
    step(&mut app, 2.5);
    app.world_mut().send_event(DamageIntent {
        attacker,
        target: entity,
        amount: 30.0,
        critical: false,
        hit_id: 2,
        skill_name: None,
    });
    step(&mut app, 0.016);
    assert_eq!(app.world().get::<StatBlock>(entity).unwrap().hp, 70.0);
}

#[test]
fn test_scenario_config_loads_from_disk() {
    let json = r#"{
        "scenario_name": "smoke",
        "player": { "character": "ranger", "perks": [{ "skill": "frenzy", "level": 2 }] },
        "enemies": [{ "character": "raider", "count": 3, "spacing": 1.5 }],
        "duration_secs": 10.0,
        "random_seed": 42,
        "script": [
            { "at": 5.0, "action": "Pause" },
            { "at": 1.0, "action": { "Cast": { "skill": "piercing_bolt" } } }
        ]
    }"#;
    let path = std::env::temp_dir().join("combatsim_scenario_test.json");
    std::fs::write(&path, json).unwrap();

    let config = ScenarioConfig::load_from_file(&path).unwrap();
    assert_eq!(config.scenario_name, "smoke");
    assert_eq!(config.enemies[0].count, 3);
    assert_eq!(config.random_seed, Some(42));
    // Script entries are sorted by time on load
    assert_eq!(config.script[0].at, 1.0);
    assert_eq!(config.script[1].at, 5.0);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_scenario_rejects_unknown_characters() {
    let mut config: ScenarioConfig = serde_json::from_str(
        r#"{
            "player": { "character": "archmage" },
            "enemies": [{ "character": "raider", "count": 1 }],
            "duration_secs": 1.0
        }"#,
    )
    .unwrap();

    // An id missing from characters.ron is a config error, not a panic
    let err = run_scenario(config.clone()).unwrap_err();
    assert!(err.contains("archmage"), "unexpected error: {}", err);

    config.player.character = "ranger".to_string();
    config.enemies[0].character = "ghoul".to_string();
    let err = run_scenario(config).unwrap_err();
    assert!(err.contains("ghoul"), "unexpected error: {}", err);
}

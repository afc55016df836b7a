//! Unit tests for stat block construction
//!
//! These tests verify that:
//! - Stat blocks are built correctly from character definitions
//! - Saved upgrade levels and item bonuses apply as additive deltas
//! - Resources start full after all max-value adjustments

use std::collections::HashMap;

use combatsim::combat::stats::{StatBlock, StatKind};
use combatsim::config::{BaseStats, CharacterConfig, ItemBonus, SavedLoadout, UpgradeDef};

fn test_character() -> CharacterConfig {
    CharacterConfig {
        name: "Ranger".to_string(),
        base: BaseStats {
            max_hp: 120.0,
            hp_regen: 1.5,
            hp_leech_rate: 0.0,
            max_mp: 60.0,
            mp_regen: 4.0,
            damage: 12.0,
            attack_speed: 0.9,
            cooldown_reduction_pct: 0.0,
            crit_rate: 0.15,
            crit_multiplier: 2.0,
            defense: 3.0,
            move_speed: 6.0,
            collect_range: 2.5,
        },
        upgrades: HashMap::from([
            (
                "vitality".to_string(),
                UpgradeDef {
                    stat: StatKind::MaxHp,
                    per_level: 10.0,
                },
            ),
            (
                "swiftness".to_string(),
                UpgradeDef {
                    stat: StatKind::AttackSpeed,
                    per_level: -0.05,
                },
            ),
        ]),
        skills: vec![],
        perks: vec![],
    }
}

#[test]
fn test_base_stats_carry_over() {
    let stats = StatBlock::from_loadout(&test_character(), &SavedLoadout::default());
    assert_eq!(stats.max_hp, 120.0);
    assert_eq!(stats.hp, 120.0);
    assert_eq!(stats.mp, 60.0);
    assert_eq!(stats.damage, 12.0);
    assert_eq!(stats.level, 1);
    assert!(stats.is_alive());
}

#[test]
fn test_upgrade_levels_apply_per_level() {
    let loadout = SavedLoadout {
        upgrade_levels: HashMap::from([
            ("vitality".to_string(), 3),
            ("swiftness".to_string(), 2),
        ]),
        ..Default::default()
    };
    let stats = StatBlock::from_loadout(&test_character(), &loadout);
    assert_eq!(stats.max_hp, 150.0);
    assert!((stats.attack_speed - 0.8).abs() < 1e-6);
    // Resources refill after the caps moved
    assert_eq!(stats.hp, 150.0);
}

#[test]
fn test_unknown_upgrades_are_ignored() {
    let loadout = SavedLoadout {
        upgrade_levels: HashMap::from([("mystery".to_string(), 5)]),
        ..Default::default()
    };
    let stats = StatBlock::from_loadout(&test_character(), &loadout);
    assert_eq!(stats.max_hp, 120.0);
}

#[test]
fn test_item_bonuses_stack_with_upgrades() {
    let loadout = SavedLoadout {
        upgrade_levels: HashMap::from([("vitality".to_string(), 1)]),
        item_bonuses: vec![
            ItemBonus {
                stat: StatKind::MaxHp,
                amount: 20.0,
            },
            ItemBonus {
                stat: StatKind::Damage,
                amount: 5.0,
            },
        ],
        ..Default::default()
    };
    let stats = StatBlock::from_loadout(&test_character(), &loadout);
    assert_eq!(stats.max_hp, 150.0);
    assert_eq!(stats.damage, 17.0);
}

#[test]
fn test_saved_level_and_xp_restore() {
    let loadout = SavedLoadout {
        level: 4,
        xp: 75.0,
        ..Default::default()
    };
    let stats = StatBlock::from_loadout(&test_character(), &loadout);
    assert_eq!(stats.level, 4);
    assert_eq!(stats.xp, 75.0);

    // A zero saved level clamps to 1
    let stats = StatBlock::from_loadout(&test_character(), &SavedLoadout::default());
    assert_eq!(stats.level, 1);
}

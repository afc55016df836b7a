//! Stat Block
//!
//! Per-entity resource values (health, mana, shield) and derived combat
//! stats, plus their mutation rules. Pure data + clamping logic; the
//! systems that call these mutators are responsible for broadcasting the
//! resulting change notifications (see `broadcast_stat_changes`).
//!
//! Invariants upheld here:
//! - `0 <= hp <= max_hp`, `0 <= mp <= max_mp`, `0 <= shield <= max_hp`
//! - stat deltas are additive and exactly reversible within float epsilon
//! - no mutator panics for out-of-range gameplay input; everything clamps

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::components::{Dead, SimulationSpeed, StatEcho};
use super::constants::{ATTACK_SPEED_FLOOR, MAX_HP_FLOOR};
use super::events::{HealthChanged, ManaChanged, ShieldChanged, XpChanged};
use crate::config::{CharacterConfig, SavedLoadout};

// ============================================================================
// Stat Kinds
// ============================================================================

/// Identifies one alterable stat on a [`StatBlock`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    MaxHp,
    HpRegen,
    HpLeechRate,
    MaxMp,
    MpRegen,
    Damage,
    /// Auto-attack interval in seconds (lower = faster)
    AttackSpeed,
    CooldownReduction,
    CritRate,
    CritMultiplier,
    Defense,
    MoveSpeed,
    CollectRange,
}

impl StatKind {
    /// The floor a stat clamps to when altered. Maximum health can never
    /// drop below 1; everything else floors at 0.
    pub fn floor(self) -> f32 {
        match self {
            StatKind::MaxHp => MAX_HP_FLOOR,
            _ => 0.0,
        }
    }

    /// Whether a larger value is better for the holder. Attack speed is the
    /// one inverted stat: it is an interval, so buffs shrink it.
    pub fn inverted(self) -> bool {
        matches!(self, StatKind::AttackSpeed)
    }
}

// ============================================================================
// Stat Block
// ============================================================================

/// Core per-entity combat state. One per entity; owned exclusively by that
/// entity — all cross-entity effects go through the damage/modifier systems.
#[derive(Component, Clone, Debug)]
pub struct StatBlock {
    pub max_hp: f32,
    pub hp: f32,
    pub hp_regen: f32,
    /// Fraction of dealt damage returned as healing
    pub hp_leech_rate: f32,
    pub max_mp: f32,
    pub mp: f32,
    pub mp_regen: f32,
    /// Base damage per auto-attack / skill-shot before skill scaling
    pub damage: f32,
    /// Auto-attack interval in seconds (floored at read time, see
    /// [`StatBlock::attack_interval`])
    pub attack_speed: f32,
    /// Cooldown reduction as a fraction (0.2 = 20% shorter cooldowns)
    pub cooldown_reduction_pct: f32,
    pub crit_rate: f32,
    pub crit_multiplier: f32,
    pub defense: f32,
    /// Absorbing shield pool, consumed before health
    pub shield: f32,
    pub move_speed: f32,
    /// Pickup radius for collectibles
    pub collect_range: f32,
    pub level: u32,
    pub xp: f32,
}

impl StatBlock {
    /// Build a stat block from a static character definition plus the
    /// per-save state the external save system hands us once at setup:
    /// upgrade levels, equipped item bonuses, and stored level/xp.
    pub fn from_loadout(def: &CharacterConfig, loadout: &SavedLoadout) -> Self {
        let base = &def.base;
        let mut stats = Self {
            max_hp: base.max_hp,
            hp: base.max_hp,
            hp_regen: base.hp_regen,
            hp_leech_rate: base.hp_leech_rate,
            max_mp: base.max_mp,
            mp: base.max_mp,
            mp_regen: base.mp_regen,
            damage: base.damage,
            attack_speed: base.attack_speed,
            cooldown_reduction_pct: base.cooldown_reduction_pct,
            crit_rate: base.crit_rate,
            crit_multiplier: base.crit_multiplier,
            defense: base.defense,
            shield: 0.0,
            move_speed: base.move_speed,
            collect_range: base.collect_range,
            level: loadout.level.max(1),
            xp: loadout.xp.max(0.0),
        };

        // Per-save upgrade levels grant additive stat deltas
        for (upgrade_id, owned_level) in &loadout.upgrade_levels {
            if let Some(upgrade) = def.upgrades.get(upgrade_id) {
                stats.alter(upgrade.stat, upgrade.per_level * *owned_level as f32);
            }
        }

        // Equipped item bonuses are plain additive deltas
        for bonus in &loadout.item_bonuses {
            stats.alter(bonus.stat, bonus.amount);
        }

        // Start at full resources after all max-value adjustments
        stats.hp = stats.max_hp;
        stats.mp = stats.max_mp;
        stats
    }

    /// Check if this entity is alive (health > 0).
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }

    /// The effective auto-attack interval, never below the hard floor.
    pub fn attack_interval(&self) -> f32 {
        self.attack_speed.max(ATTACK_SPEED_FLOOR)
    }

    /// Apply an additive delta to a stat, clamping at the stat's floor.
    /// Returns the new value. Altering `MaxHp`/`MaxMp` re-clamps the
    /// corresponding current resource.
    pub fn alter(&mut self, kind: StatKind, delta: f32) -> f32 {
        let slot = match kind {
            StatKind::MaxHp => &mut self.max_hp,
            StatKind::HpRegen => &mut self.hp_regen,
            StatKind::HpLeechRate => &mut self.hp_leech_rate,
            StatKind::MaxMp => &mut self.max_mp,
            StatKind::MpRegen => &mut self.mp_regen,
            StatKind::Damage => &mut self.damage,
            StatKind::AttackSpeed => &mut self.attack_speed,
            StatKind::CooldownReduction => &mut self.cooldown_reduction_pct,
            StatKind::CritRate => &mut self.crit_rate,
            StatKind::CritMultiplier => &mut self.crit_multiplier,
            StatKind::Defense => &mut self.defense,
            StatKind::MoveSpeed => &mut self.move_speed,
            StatKind::CollectRange => &mut self.collect_range,
        };
        *slot = (*slot + delta).max(kind.floor());
        let new_value = *slot;

        // Keep resource invariants intact when the caps move
        match kind {
            StatKind::MaxHp => {
                self.hp = self.hp.min(self.max_hp);
                self.shield = self.shield.min(self.max_hp);
            }
            StatKind::MaxMp => self.mp = self.mp.min(self.max_mp),
            _ => {}
        }

        new_value
    }

    /// Atomically deduct mana. Returns false (and deducts nothing) if the
    /// current mana is insufficient.
    pub fn consume_mana(&mut self, amount: f32) -> bool {
        let amount = amount.abs();
        if self.mp < amount {
            return false;
        }
        self.mp -= amount;
        true
    }

    /// Heal health, clamped to max. Negative amounts are forced positive.
    pub fn heal_hp(&mut self, amount: f32) {
        self.hp = (self.hp + amount.abs()).min(self.max_hp);
    }

    /// Restore mana, clamped to max. Negative amounts are forced positive.
    pub fn heal_mp(&mut self, amount: f32) {
        self.mp = (self.mp + amount.abs()).min(self.max_mp);
    }

    /// Grant shield, capped at `max_hp`. Returns the amount actually
    /// granted so the granting modifier can reverse exactly that much.
    pub fn add_shield(&mut self, amount: f32) -> f32 {
        let before = self.shield;
        self.shield = (self.shield + amount.abs()).min(self.max_hp);
        self.shield - before
    }

    /// Remove shield, flooring at 0. Removing more than remains (because
    /// the shield was partly consumed by damage) is fine.
    pub fn remove_shield(&mut self, amount: f32) {
        self.shield = (self.shield - amount.abs()).max(0.0);
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Regenerate health and mana over time for living entities.
pub fn regenerate_resources(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut query: Query<&mut StatBlock, Without<Dead>>,
) {
    let dt = speed.scale(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    for mut stats in query.iter_mut() {
        if stats.hp_regen > 0.0 && stats.hp < stats.max_hp {
            let regen = stats.hp_regen * dt;
            stats.heal_hp(regen);
        }
        if stats.mp_regen > 0.0 && stats.mp < stats.max_mp {
            let regen = stats.mp_regen * dt;
            stats.heal_mp(regen);
        }
    }
}

/// Publish change notifications for any stat block that was mutated this
/// frame. Compares against the per-entity [`StatEcho`] cache so observers
/// get one precise event per actual change, not one per frame.
pub fn broadcast_stat_changes(
    mut query: Query<(Entity, &StatBlock, &mut StatEcho), Changed<StatBlock>>,
    mut health_events: EventWriter<HealthChanged>,
    mut mana_events: EventWriter<ManaChanged>,
    mut shield_events: EventWriter<ShieldChanged>,
    mut xp_events: EventWriter<XpChanged>,
) {
    for (entity, stats, mut echo) in query.iter_mut() {
        if stats.hp != echo.hp || stats.max_hp != echo.max_hp {
            health_events.send(HealthChanged {
                entity,
                current: stats.hp,
                max: stats.max_hp,
            });
            echo.hp = stats.hp;
            echo.max_hp = stats.max_hp;
        }
        if stats.mp != echo.mp || stats.max_mp != echo.max_mp {
            mana_events.send(ManaChanged {
                entity,
                current: stats.mp,
                max: stats.max_mp,
            });
            echo.mp = stats.mp;
            echo.max_mp = stats.max_mp;
        }
        if stats.shield != echo.shield {
            shield_events.send(ShieldChanged {
                entity,
                current: stats.shield,
            });
            echo.shield = stats.shield;
        }
        if stats.xp != echo.xp || stats.level != echo.level {
            xp_events.send(XpChanged {
                entity,
                xp: stats.xp,
                level: stats.level,
            });
            echo.xp = stats.xp;
            echo.level = stats.level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block() -> StatBlock {
        StatBlock {
            max_hp: 100.0,
            hp: 100.0,
            hp_regen: 0.0,
            hp_leech_rate: 0.0,
            max_mp: 50.0,
            mp: 50.0,
            mp_regen: 0.0,
            damage: 10.0,
            attack_speed: 1.0,
            cooldown_reduction_pct: 0.0,
            crit_rate: 0.0,
            crit_multiplier: 2.0,
            defense: 0.0,
            shield: 0.0,
            move_speed: 5.0,
            collect_range: 2.0,
            level: 1,
            xp: 0.0,
        }
    }

    #[test]
    fn test_alter_is_reversible_within_epsilon() {
        let mut stats = block();
        let before = stats.move_speed;
        stats.alter(StatKind::MoveSpeed, 3.7);
        stats.alter(StatKind::MoveSpeed, -3.7);
        assert!((stats.move_speed - before).abs() < f32::EPSILON * 8.0);
    }

    #[test]
    fn test_alter_clamps_at_floor() {
        let mut stats = block();
        let value = stats.alter(StatKind::Defense, -999.0);
        assert_eq!(value, 0.0);

        // Max HP floors at 1, and current hp follows the cap down
        let value = stats.alter(StatKind::MaxHp, -999.0);
        assert_eq!(value, 1.0);
        assert_eq!(stats.hp, 1.0);
    }

    #[test]
    fn test_consume_mana_is_atomic() {
        let mut stats = block();
        assert!(stats.consume_mana(30.0));
        assert_eq!(stats.mp, 20.0);

        // Insufficient: nothing is deducted
        assert!(!stats.consume_mana(25.0));
        assert_eq!(stats.mp, 20.0);
    }

    #[test]
    fn test_heal_forces_positive_and_clamps() {
        let mut stats = block();
        stats.hp = 40.0;
        stats.heal_hp(-30.0);
        assert_eq!(stats.hp, 70.0);
        stats.heal_hp(1000.0);
        assert_eq!(stats.hp, 100.0);
    }

    #[test]
    fn test_shield_caps_at_max_hp() {
        let mut stats = block();
        let granted = stats.add_shield(250.0);
        assert_eq!(granted, 100.0);
        assert_eq!(stats.shield, 100.0);

        // Removing more than remains floors at zero
        stats.shield = 15.0;
        stats.remove_shield(40.0);
        assert_eq!(stats.shield, 0.0);
    }

    #[test]
    fn test_attack_interval_has_hard_floor() {
        let mut stats = block();
        stats.alter(StatKind::AttackSpeed, -5.0);
        assert_eq!(stats.attack_speed, 0.0);
        assert_eq!(stats.attack_interval(), ATTACK_SPEED_FLOOR);
    }
}

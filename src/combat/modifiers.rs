//! Modifier Ledger
//!
//! Timed, reversible stat modifiers and damage-over-time effects. Every
//! modifier records the delta it actually applied, so removal restores the
//! stat block exactly (within float epsilon) no matter what else changed in
//! between.
//!
//! Rules enforced here:
//! - Buffs always help, debuffs always hurt: the sign of the applied delta
//!   is derived from the category, not from the caller's input.
//! - Perk-owned modifiers are singletons per (perk, kind): re-applying
//!   replaces the old instance. Ad-hoc modifiers stack freely.
//! - Countdowns tick by pause-scaled delta time, so a paused simulation
//!   leaks no elapsed time into any suspended modifier.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::components::SimulationSpeed;
use super::constants::{DOT_MIN_HP, DOT_TICK_INTERVAL};
use super::events::{ModifierRemovalReason, ModifierRemoved};
use super::stats::{StatBlock, StatKind};
use crate::config::SkillId;

// ============================================================================
// Types
// ============================================================================

/// Ledger-local modifier handle. Unique per entity, not globally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ModifierId(pub u64);

/// Whether a modifier helps or hurts its holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModifierCategory {
    Buff,
    Debuff,
}

/// What a modifier does while active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModifierKind {
    /// Additive delta to one stat, reversed on removal
    Stat(StatKind),
    /// Absorbing shield granted on apply, remainder revoked on removal
    Shield,
    /// Damage immunity while active
    Invincible,
    /// Suppresses actions while active
    Stun,
}

/// Who applied a modifier. Determines stacking policy.
#[derive(Clone, Debug, PartialEq)]
pub enum ModifierOwner {
    /// One-off application; stacks with everything
    AdHoc,
    /// Owned by a recurring perk; singleton per (perk, kind)
    Perk(SkillId),
}

/// One active timed modifier.
#[derive(Clone, Debug)]
pub struct Modifier {
    pub id: ModifierId,
    pub kind: ModifierKind,
    pub category: ModifierCategory,
    /// The delta actually applied to the stat block (signed, post-clamp).
    /// For shields this is the amount actually granted.
    pub applied: f32,
    pub remaining: f32,
    pub owner: ModifierOwner,
}

/// One active damage-over-time effect. Total damage is spread over fixed
/// ticks; the final tick delivers whatever float drift left behind.
#[derive(Clone, Debug)]
pub struct DotEffect {
    /// Restart key: re-applying with the same key replaces this effect
    pub source_key: String,
    pub attacker: Entity,
    pub per_tick: f32,
    pub total: f32,
    pub delivered: f32,
    pub ticks_left: u32,
    tick_timer: f32,
}

/// A modifier removed during a tick or cancel, for event emission.
#[derive(Clone, Debug)]
pub struct RemovedModifier {
    pub id: ModifierId,
    pub category: ModifierCategory,
    pub reason: ModifierRemovalReason,
}

// ============================================================================
// Ledger
// ============================================================================

/// Per-entity ledger of active timed modifiers and DoTs.
#[derive(Component, Debug, Default)]
pub struct ModifierLedger {
    modifiers: SmallVec<[Modifier; 8]>,
    dots: SmallVec<[DotEffect; 4]>,
    next_id: u64,
}

impl ModifierLedger {
    fn allocate_id(&mut self) -> ModifierId {
        let id = ModifierId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Apply a timed modifier, mutating the stat block immediately.
    ///
    /// `magnitude` is taken as an absolute value; the applied sign comes
    /// from `category` (flipped for inverted stats like attack speed, where
    /// a buff shrinks the interval). Perk-owned applications first replace
    /// any existing modifier with the same owner and kind; the replaced
    /// entries are returned so the caller can emit removal notifications.
    pub fn apply_timed(
        &mut self,
        stats: &mut StatBlock,
        kind: ModifierKind,
        category: ModifierCategory,
        magnitude: f32,
        duration: f32,
        owner: ModifierOwner,
    ) -> (ModifierId, SmallVec<[RemovedModifier; 1]>) {
        let mut replaced = SmallVec::new();
        if let ModifierOwner::Perk(_) = &owner {
            let stale: SmallVec<[ModifierId; 1]> = self
                .modifiers
                .iter()
                .filter(|m| m.owner == owner && m.kind == kind)
                .map(|m| m.id)
                .collect();
            for id in stale {
                if let Some(removed) = self.remove_and_revert(id, stats) {
                    replaced.push(RemovedModifier {
                        id: removed.id,
                        category: removed.category,
                        reason: ModifierRemovalReason::Replaced,
                    });
                }
            }
        }

        let magnitude = magnitude.abs();
        let applied = match kind {
            ModifierKind::Stat(stat) => {
                let helps = matches!(category, ModifierCategory::Buff);
                let positive = helps != stat.inverted();
                let delta = if positive { magnitude } else { -magnitude };
                let before = stats.alter(stat, 0.0);
                let after = stats.alter(stat, delta);
                // Record the post-clamp delta so reversal is exact
                after - before
            }
            ModifierKind::Shield => stats.add_shield(magnitude),
            ModifierKind::Invincible | ModifierKind::Stun => 0.0,
        };

        let id = self.allocate_id();
        self.modifiers.push(Modifier {
            id,
            kind,
            category,
            applied,
            remaining: duration,
            owner,
        });
        (id, replaced)
    }

    /// Cancel one modifier by id, reverting its effect. Idempotent: a
    /// second cancel of the same id is a no-op.
    pub fn cancel(&mut self, id: ModifierId, stats: &mut StatBlock) -> Option<RemovedModifier> {
        self.remove_and_revert(id, stats).map(|m| RemovedModifier {
            id: m.id,
            category: m.category,
            reason: ModifierRemovalReason::Canceled,
        })
    }

    /// Cancel every modifier owned by the given perk (used on unequip and
    /// replace). Returns the removals for event emission.
    pub fn cancel_owned_by(
        &mut self,
        perk: &str,
        stats: &mut StatBlock,
    ) -> SmallVec<[RemovedModifier; 2]> {
        let stale: SmallVec<[ModifierId; 2]> = self
            .modifiers
            .iter()
            .filter(|m| matches!(&m.owner, ModifierOwner::Perk(p) if p == perk))
            .map(|m| m.id)
            .collect();
        stale
            .into_iter()
            .filter_map(|id| self.remove_and_revert(id, stats))
            .map(|m| RemovedModifier {
                id: m.id,
                category: m.category,
                reason: ModifierRemovalReason::Canceled,
            })
            .collect()
    }

    /// Advance every modifier countdown by `dt` seconds. Expired modifiers
    /// are reverted and returned for event emission.
    pub fn tick(&mut self, stats: &mut StatBlock, dt: f32) -> SmallVec<[RemovedModifier; 2]> {
        if dt <= 0.0 {
            return SmallVec::new();
        }
        for modifier in self.modifiers.iter_mut() {
            modifier.remaining -= dt;
        }
        let expired: SmallVec<[ModifierId; 2]> = self
            .modifiers
            .iter()
            .filter(|m| m.remaining <= 0.0)
            .map(|m| m.id)
            .collect();
        expired
            .into_iter()
            .filter_map(|id| self.remove_and_revert(id, stats))
            .map(|m| RemovedModifier {
                id: m.id,
                category: m.category,
                reason: ModifierRemovalReason::Expired,
            })
            .collect()
    }

    fn remove_and_revert(&mut self, id: ModifierId, stats: &mut StatBlock) -> Option<Modifier> {
        let index = self.modifiers.iter().position(|m| m.id == id)?;
        let modifier = self.modifiers.remove(index);
        match modifier.kind {
            ModifierKind::Stat(stat) => {
                stats.alter(stat, -modifier.applied);
            }
            ModifierKind::Shield => {
                // Remove at most what was granted; damage may have consumed
                // part of it already, and the floor at zero handles that.
                stats.remove_shield(modifier.applied);
            }
            ModifierKind::Invincible | ModifierKind::Stun => {}
        }
        Some(modifier)
    }

    pub fn is_invincible(&self) -> bool {
        self.modifiers
            .iter()
            .any(|m| m.kind == ModifierKind::Invincible)
    }

    pub fn is_stunned(&self) -> bool {
        self.modifiers.iter().any(|m| m.kind == ModifierKind::Stun)
    }

    /// How many modifiers of the given category are active.
    pub fn active_count(&self, category: ModifierCategory) -> usize {
        self.modifiers
            .iter()
            .filter(|m| m.category == category)
            .count()
    }

    pub fn active_ids(&self) -> impl Iterator<Item = ModifierId> + '_ {
        self.modifiers.iter().map(|m| m.id)
    }

    pub fn get(&self, id: ModifierId) -> Option<&Modifier> {
        self.modifiers.iter().find(|m| m.id == id)
    }

    // ========================================================================
    // Damage over time
    // ========================================================================

    /// Attach a DoT. Re-applying with the same `source_key` restarts the
    /// effect instead of stacking a second instance.
    pub fn apply_dot(&mut self, source_key: &str, attacker: Entity, total: f32, duration: f32) {
        debug_assert!(total > 0.0 && duration > 0.0);
        self.dots.retain(|d| d.source_key != source_key);

        let ticks = ((duration / DOT_TICK_INTERVAL).floor() as u32).max(1);
        self.dots.push(DotEffect {
            source_key: source_key.to_string(),
            attacker,
            per_tick: total / ticks as f32,
            total,
            delivered: 0.0,
            ticks_left: ticks,
            tick_timer: 0.0,
        });
    }

    pub fn active_dots(&self) -> usize {
        self.dots.len()
    }

    /// Advance DoT timers by `dt` seconds and apply due ticks directly to
    /// health. A DoT alone never drops the victim below the minimum HP
    /// floor, and damage is suppressed (ticks still consumed) while
    /// invincible. Returns the total damage dealt this call.
    pub fn tick_dots(&mut self, stats: &mut StatBlock, dt: f32) -> f32 {
        if dt <= 0.0 || self.dots.is_empty() {
            return 0.0;
        }
        let invincible = self.is_invincible();
        let mut dealt = 0.0;
        for dot in self.dots.iter_mut() {
            dot.tick_timer += dt;
            while dot.tick_timer >= DOT_TICK_INTERVAL && dot.ticks_left > 0 {
                dot.tick_timer -= DOT_TICK_INTERVAL;
                dot.ticks_left -= 1;
                // Final tick delivers the remainder so the total is exact
                let damage = if dot.ticks_left == 0 {
                    dot.total - dot.delivered
                } else {
                    dot.per_tick
                };
                dot.delivered += damage;
                if !invincible {
                    let floor = stats.hp.min(DOT_MIN_HP);
                    let applied = (stats.hp - (stats.hp - damage).max(floor)).max(0.0);
                    stats.hp -= applied;
                    dealt += applied;
                }
            }
        }
        self.dots.retain(|d| d.ticks_left > 0);
        dealt
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Tick modifier countdowns. Dead entities are included: a corpse's buffs
/// keep expiring so a later revive starts from a clean ledger state.
pub fn tick_modifiers(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut query: Query<(Entity, &mut ModifierLedger, &mut StatBlock)>,
    mut removed_events: EventWriter<ModifierRemoved>,
) {
    let dt = speed.scale(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    for (entity, mut ledger, mut stats) in query.iter_mut() {
        for removed in ledger.tick(&mut stats, dt) {
            removed_events.send(ModifierRemoved {
                entity,
                id: removed.id,
                category: removed.category,
                remaining_in_category: ledger.active_count(removed.category),
                reason: removed.reason,
            });
        }
    }
}

/// Tick damage-over-time effects on living entities.
pub fn tick_dots(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut query: Query<(&mut ModifierLedger, &mut StatBlock), Without<super::components::Dead>>,
) {
    let dt = speed.scale(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    for (mut ledger, mut stats) in query.iter_mut() {
        ledger.tick_dots(&mut stats, dt);
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
    fn test_buff_sign_is_derived_from_category() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();

        // A negative magnitude still buffs: the caller's sign is ignored
        ledger.apply_timed(
            &mut stats,
            ModifierKind::Stat(StatKind::MoveSpeed),
            ModifierCategory::Buff,
            -3.0,
            5.0,
            ModifierOwner::AdHoc,
        );
        assert_eq!(stats.move_speed, 8.0);

        ledger.apply_timed(
            &mut stats,
            ModifierKind::Stat(StatKind::MoveSpeed),
            ModifierCategory::Debuff,
            2.0,
            5.0,
            ModifierOwner::AdHoc,
        );
        assert_eq!(stats.move_speed, 6.0);
    }

    #[test]
    fn test_attack_speed_buff_shrinks_interval() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        ledger.apply_timed(
            &mut stats,
            ModifierKind::Stat(StatKind::AttackSpeed),
            ModifierCategory::Buff,
            0.4,
            5.0,
            ModifierOwner::AdHoc,
        );
        assert!((stats.attack_speed - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_expiry_reverts_exactly_even_after_clamp() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        stats.defense = 3.0;

        // Debuff of 10 clamps defense at 0: only -3 is actually applied
        ledger.apply_timed(
            &mut stats,
            ModifierKind::Stat(StatKind::Defense),
            ModifierCategory::Debuff,
            10.0,
            1.0,
            ModifierOwner::AdHoc,
        );
        assert_eq!(stats.defense, 0.0);

        let removed = ledger.tick(&mut stats, 1.5);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].reason, ModifierRemovalReason::Expired);
        assert_eq!(stats.defense, 3.0);
    }

    #[test]
    fn test_zero_dt_leaks_no_time() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        ledger.apply_timed(
            &mut stats,
            ModifierKind::Invincible,
            ModifierCategory::Buff,
            0.0,
            0.5,
            ModifierOwner::AdHoc,
        );
        for _ in 0..100 {
            assert!(ledger.tick(&mut stats, 0.0).is_empty());
        }
        assert!(ledger.is_invincible());
        ledger.tick(&mut stats, 0.6);
        assert!(!ledger.is_invincible());
    }

    #[test]
    fn test_perk_modifiers_are_singletons() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        let owner = ModifierOwner::Perk("frenzy".to_string());

        ledger.apply_timed(
            &mut stats,
            ModifierKind::Stat(StatKind::Damage),
            ModifierCategory::Buff,
            5.0,
            10.0,
            owner.clone(),
        );
        let (_, replaced) = ledger.apply_timed(
            &mut stats,
            ModifierKind::Stat(StatKind::Damage),
            ModifierCategory::Buff,
            8.0,
            10.0,
            owner,
        );

        // The old instance was reverted before the new one applied
        assert_eq!(replaced.len(), 1);
        assert_eq!(replaced[0].reason, ModifierRemovalReason::Replaced);
        assert_eq!(stats.damage, 18.0);
        assert_eq!(ledger.active_count(ModifierCategory::Buff), 1);
    }

    #[test]
    fn test_adhoc_modifiers_stack() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        for _ in 0..3 {
            ledger.apply_timed(
                &mut stats,
                ModifierKind::Stat(StatKind::Damage),
                ModifierCategory::Buff,
                5.0,
                10.0,
                ModifierOwner::AdHoc,
            );
        }
        assert_eq!(stats.damage, 25.0);
        assert_eq!(ledger.active_count(ModifierCategory::Buff), 3);
    }

    #[test]
    fn test_shield_reverses_only_granted_amount() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        stats.shield = 80.0;

        // Only 20 fits under the max_hp cap
        ledger.apply_timed(
            &mut stats,
            ModifierKind::Shield,
            ModifierCategory::Buff,
            50.0,
            1.0,
            ModifierOwner::AdHoc,
        );
        assert_eq!(stats.shield, 100.0);

        ledger.tick(&mut stats, 2.0);
        assert_eq!(stats.shield, 80.0);
    }

    #[test]
    fn test_shield_removal_floors_at_zero_after_consumption() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        ledger.apply_timed(
            &mut stats,
            ModifierKind::Shield,
            ModifierCategory::Buff,
            40.0,
            1.0,
            ModifierOwner::AdHoc,
        );
        // Damage ate most of the shield before expiry
        stats.shield = 5.0;
        ledger.tick(&mut stats, 2.0);
        assert_eq!(stats.shield, 0.0);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        let (id, _) = ledger.apply_timed(
            &mut stats,
            ModifierKind::Stat(StatKind::MoveSpeed),
            ModifierCategory::Buff,
            3.0,
            10.0,
            ModifierOwner::AdHoc,
        );
        assert!(ledger.cancel(id, &mut stats).is_some());
        assert_eq!(stats.move_speed, 5.0);
        assert!(ledger.cancel(id, &mut stats).is_none());
        assert_eq!(stats.move_speed, 5.0);
    }

    #[test]
    fn test_dot_spreads_total_over_fixed_ticks() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        ledger.apply_dot("burn", Entity::from_raw(1), 10.0, 1.0);

        // 1.0s / 0.2s = 5 ticks of 2.0 each
        let dealt = ledger.tick_dots(&mut stats, 0.2);
        assert!((dealt - 2.0).abs() < 1e-5);
        let dealt = ledger.tick_dots(&mut stats, 0.8);
        assert!((dealt - 8.0).abs() < 1e-5);
        assert_eq!(ledger.active_dots(), 0);
        assert!((stats.hp - 90.0).abs() < 1e-4);
    }

    #[test]
    fn test_dot_never_kills() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        stats.hp = 4.0;
        ledger.apply_dot("burn", Entity::from_raw(1), 100.0, 1.0);
        ledger.tick_dots(&mut stats, 2.0);
        assert_eq!(stats.hp, DOT_MIN_HP);
        assert!(stats.is_alive());
    }

    #[test]
    fn test_dot_restarts_per_source_key() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        ledger.apply_dot("burn", Entity::from_raw(1), 10.0, 1.0);
        ledger.tick_dots(&mut stats, 0.4);

        // Same key restarts instead of stacking
        ledger.apply_dot("burn", Entity::from_raw(1), 10.0, 1.0);
        assert_eq!(ledger.active_dots(), 1);
        ledger.tick_dots(&mut stats, 1.0);
        // 4 damage from the first run plus the full 10 from the restart
        assert!((stats.hp - 86.0).abs() < 1e-4);
    }

    #[test]
    fn test_invincibility_consumes_ticks_without_damage() {
        let mut ledger = ModifierLedger::default();
        let mut stats = block();
        ledger.apply_dot("burn", Entity::from_raw(1), 10.0, 1.0);
        ledger.apply_timed(
            &mut stats,
            ModifierKind::Invincible,
            ModifierCategory::Buff,
            0.0,
            5.0,
            ModifierOwner::AdHoc,
        );
        ledger.tick_dots(&mut stats, 2.0);
        assert_eq!(stats.hp, 100.0);
        assert_eq!(ledger.active_dots(), 0);
    }
}

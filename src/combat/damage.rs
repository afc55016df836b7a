//! Damage Resolution
//!
//! The single pipeline every hit goes through:
//! defense mitigation, minimum-damage floor, shield absorption, health loss,
//! death transition. Nothing else in the crate writes `hp` downward, which
//! keeps the death transition in exactly one place.
//!
//! Hits are deduplicated by `(attacker, hit_id)` within a recency window so
//! at-least-once delivery from a replicated source applies each hit once.

use bevy::prelude::*;
use bevy::utils::HashMap;

use super::components::{Dead, HitIdAllocator, LocalAuthority, SimulationSpeed};
use super::constants::{GLOBAL_MIN_DAMAGE, HIT_DEDUP_WINDOW};
use super::events::{AnimationKind, AnimationRequest, DamageIntent, EntityDied};
use super::log::CombatLog;
use super::modifiers::ModifierLedger;
use super::motion::DashState;
use super::skills::CastState;
use super::stats::StatBlock;

// ============================================================================
// Pure damage application
// ============================================================================

/// What one resolved hit did to its target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageOutcome {
    /// Damage eaten by the shield pool
    pub absorbed: f32,
    /// Damage taken from health
    pub hp_damage: f32,
    /// True if this hit reduced health to zero
    pub lethal: bool,
}

impl DamageOutcome {
    pub const NONE: Self = Self {
        absorbed: 0.0,
        hp_damage: 0.0,
        lethal: false,
    };
}

/// Apply one hit to a stat block. The order is fixed:
/// 1. defense subtracts from the raw amount
/// 2. the result floors at the global minimum, so stacked defense can chip
///    a hit down but never void it
/// 3. the shield pool absorbs first
/// 4. the remainder comes out of health
///
/// A non-positive raw amount is a no-op: there is no hit to floor.
pub fn receive_damage(stats: &mut StatBlock, raw: f32) -> DamageOutcome {
    debug_assert!(stats.hp >= 0.0 && stats.shield >= 0.0);
    if raw <= 0.0 {
        return DamageOutcome::NONE;
    }

    let after_defense = (raw - stats.defense).max(GLOBAL_MIN_DAMAGE);

    let absorbed = after_defense.min(stats.shield);
    stats.shield -= absorbed;

    let hp_damage = (after_defense - absorbed).min(stats.hp);
    stats.hp -= hp_damage;

    debug_assert!(stats.hp >= 0.0 && stats.shield >= 0.0);
    DamageOutcome {
        absorbed,
        hp_damage,
        lethal: stats.hp <= 0.0,
    }
}

// ============================================================================
// Hit deduplication
// ============================================================================

/// Sliding-window record of recently applied hits. Keyed by
/// `(attacker, hit_id)`; entries older than the window are pruned.
#[derive(Resource, Default)]
pub struct HitGate {
    seen: HashMap<(Entity, u64), f32>,
    now: f32,
}

impl HitGate {
    /// Advance the gate clock and drop entries outside the window.
    pub fn advance(&mut self, dt: f32) {
        self.now += dt;
        let horizon = self.now - HIT_DEDUP_WINDOW;
        self.seen.retain(|_, stamp| *stamp > horizon);
    }

    /// Record a hit. Returns true if it is fresh (should apply), false if
    /// it was already seen within the window.
    pub fn admit(&mut self, attacker: Entity, hit_id: u64) -> bool {
        let key = (attacker, hit_id);
        if self.seen.contains_key(&key) {
            return false;
        }
        self.seen.insert(key, self.now);
        true
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }
}

/// Advance the dedup window by pause-scaled time.
pub fn advance_hit_gate(time: Res<Time>, speed: Res<SimulationSpeed>, mut gate: ResMut<HitGate>) {
    let dt = speed.scale(time.delta_secs());
    if dt > 0.0 {
        gate.advance(dt);
    }
}

// ============================================================================
// Resolver system
// ============================================================================

/// Drain pending damage intents and apply them.
///
/// Gates, in order: dedup window, target liveness, target authority (only
/// the owning instance applies real damage), invincibility. A hit stopped
/// by any gate produces no state change and no notifications.
///
/// The lethal branch runs once per entity: the `Dead` marker is inserted
/// here and every later intent against the entity is skipped, so death
/// notifications cannot double-fire.
pub fn resolve_damage_intents(
    mut commands: Commands,
    mut intents: EventReader<DamageIntent>,
    mut gate: ResMut<HitGate>,
    mut log: ResMut<CombatLog>,
    mut targets: Query<
        (&mut StatBlock, &ModifierLedger, Has<LocalAuthority>),
        Without<Dead>,
    >,
    mut died_events: EventWriter<EntityDied>,
    mut animation_events: EventWriter<AnimationRequest>,
) {
    // Leech is applied after the drain so attacker and target borrows
    // never overlap.
    let mut leech: Vec<(Entity, f32)> = Vec::new();

    for intent in intents.read() {
        if !gate.admit(intent.attacker, intent.hit_id) {
            continue;
        }
        let Ok((mut stats, ledger, authoritative)) = targets.get_mut(intent.target) else {
            continue;
        };
        if !authoritative || ledger.is_invincible() {
            continue;
        }

        let outcome = receive_damage(&mut stats, intent.amount);
        if outcome.absorbed == 0.0 && outcome.hp_damage == 0.0 {
            continue;
        }

        log.log_damage(
            intent.attacker,
            intent.target,
            outcome.hp_damage + outcome.absorbed,
            outcome.absorbed,
            intent.critical,
            intent.skill_name.as_deref(),
        );

        if outcome.hp_damage > 0.0 {
            leech.push((intent.attacker, outcome.hp_damage));
        }

        if outcome.lethal {
            commands
                .entity(intent.target)
                .insert(Dead)
                .remove::<CastState>()
                .remove::<DashState>();
            died_events.send(EntityDied {
                entity: intent.target,
                killer: Some(intent.attacker),
            });
            animation_events.send(AnimationRequest {
                entity: intent.target,
                kind: AnimationKind::Death,
            });
            log.log_death(intent.target, Some(intent.attacker));
        } else {
            animation_events.send(AnimationRequest {
                entity: intent.target,
                kind: AnimationKind::Hit,
            });
        }
    }

    for (attacker, hp_damage) in leech {
        if let Ok((mut stats, _, _)) = targets.get_mut(attacker) {
            if stats.hp_leech_rate > 0.0 {
                let heal = hp_damage * stats.hp_leech_rate;
                stats.heal_hp(heal);
            }
        }
    }
}

/// Convenience for systems that emit hits: allocate an id and build the
/// intent in one call.
pub fn make_hit(
    allocator: &mut HitIdAllocator,
    attacker: Entity,
    target: Entity,
    amount: f32,
    critical: bool,
    skill_name: Option<String>,
) -> DamageIntent {
    DamageIntent {
        attacker,
        target,
        amount,
        critical,
        hit_id: allocator.next_id(),
        skill_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(hp: f32, shield: f32, defense: f32) -> StatBlock {
        StatBlock {
            max_hp: 100.0,
            hp,
            hp_regen: 0.0,
            hp_leech_rate: 0.0,
            max_mp: 0.0,
            mp: 0.0,
            mp_regen: 0.0,
            damage: 10.0,
            attack_speed: 1.0,
            cooldown_reduction_pct: 0.0,
            crit_rate: 0.0,
            crit_multiplier: 2.0,
            defense,
            shield,
            move_speed: 5.0,
            collect_range: 0.0,
            level: 1,
            xp: 0.0,
        }
    }

    #[test]
    fn test_defense_mitigates_before_shield() {
        let mut stats = block(100.0, 20.0, 5.0);
        let outcome = receive_damage(&mut stats, 30.0);
        // 30 - 5 defense = 25; shield eats 20, hp eats 5
        assert_eq!(outcome.absorbed, 20.0);
        assert_eq!(outcome.hp_damage, 5.0);
        assert_eq!(stats.shield, 0.0);
        assert_eq!(stats.hp, 95.0);
        assert!(!outcome.lethal);
    }

    #[test]
    fn test_minimum_damage_floor() {
        let mut stats = block(100.0, 0.0, 500.0);
        let outcome = receive_damage(&mut stats, 10.0);
        assert_eq!(outcome.hp_damage, GLOBAL_MIN_DAMAGE);
        assert_eq!(stats.hp, 100.0 - GLOBAL_MIN_DAMAGE);
    }

    #[test]
    fn test_non_positive_raw_is_a_no_op() {
        let mut stats = block(100.0, 0.0, 500.0);
        assert_eq!(receive_damage(&mut stats, 0.0), DamageOutcome::NONE);
        assert_eq!(receive_damage(&mut stats, -5.0), DamageOutcome::NONE);
        assert_eq!(stats.hp, 100.0);
    }

    #[test]
    fn test_shield_fully_absorbs_small_hits() {
        let mut stats = block(100.0, 50.0, 0.0);
        let outcome = receive_damage(&mut stats, 30.0);
        assert_eq!(outcome.absorbed, 30.0);
        assert_eq!(outcome.hp_damage, 0.0);
        assert_eq!(stats.shield, 20.0);
        assert_eq!(stats.hp, 100.0);
    }

    #[test]
    fn test_lethal_hit_clamps_hp_at_zero() {
        let mut stats = block(10.0, 0.0, 0.0);
        let outcome = receive_damage(&mut stats, 500.0);
        assert!(outcome.lethal);
        assert_eq!(outcome.hp_damage, 10.0);
        assert_eq!(stats.hp, 0.0);
        assert!(!stats.is_alive());
    }

    #[test]
    fn test_hit_gate_rejects_repeats_within_window() {
        let mut gate = HitGate::default();
        let attacker = Entity::from_raw(7);
        assert!(gate.admit(attacker, 42));
        assert!(!gate.admit(attacker, 42));
        // A different hit id from the same attacker is fresh
        assert!(gate.admit(attacker, 43));
    }

    #[test]
    fn test_hit_gate_forgets_after_window() {
        let mut gate = HitGate::default();
        let attacker = Entity::from_raw(7);
        assert!(gate.admit(attacker, 42));
        gate.advance(HIT_DEDUP_WINDOW + 0.1);
        assert_eq!(gate.tracked(), 0);
        assert!(gate.admit(attacker, 42));
    }
}

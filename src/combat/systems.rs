//! Combat Systems API
//!
//! This module provides a stable API for the combat simulation systems.
//! Both graphical and headless hosts should import from here rather than
//! directly from internal modules, allowing internal refactoring without
//! breaking external consumers.
//!
//! ## System Phases
//!
//! Combat systems run in three ordered phases each frame:
//!
//! 1. **Upkeep** - Clocks, countdowns, regeneration, the target index
//! 2. **Actions** - Perk loops, cast validation, cast/dash/auto-attack driving
//! 3. **Resolution** - Damage resolution, XP grants, change notifications
//!
//! ## Usage
//!
//! ```ignore
//! use combatsim::combat::systems;
//!
//! systems::configure_combat_system_ordering(&mut app);
//! systems::add_core_combat_systems(&mut app, || true);
//! ```

use bevy::prelude::*;

// Re-export all combat systems from internal modules
// This provides a stable API - internal renames only require updating these re-exports

// === Phase 1: Upkeep ===
pub use super::damage::advance_hit_gate;
pub use super::log::advance_log_clock;
pub use super::modifiers::tick_dots;
pub use super::modifiers::tick_modifiers;
pub use super::motion::tick_motion_windows;
pub use super::skills::tick_skill_cooldowns;
pub use super::stats::regenerate_resources;
pub use super::targeting::refresh_target_index;

// === Phase 2: Actions ===
pub use super::motion::apply_motion_requests;
pub use super::motion::drive_dashes;
pub use super::skills::drive_auto_attacks;
pub use super::skills::drive_casts;
pub use super::skills::drive_perks;
pub use super::skills::handle_equip_perks;
pub use super::skills::handle_revive_requests;
pub use super::skills::process_cast_requests;

// === Phase 3: Resolution ===
pub use super::damage::resolve_damage_intents;
pub use super::progression::grant_xp;
pub use super::stats::broadcast_stat_changes;

// === Components and Resources ===
pub use super::components::{
    Dead, Faction, GameRng, HitIdAllocator, LocalAuthority, SimulationSpeed, StatEcho,
};
pub use super::damage::HitGate;
pub use super::log::CombatLog;
pub use super::modifiers::ModifierLedger;
pub use super::motion::{CastFacing, DashState, MovementLock};
pub use super::skills::{AutoAttack, CastState, PerkDrives, SkillCooldowns, SkillLevels};
pub use super::stats::StatBlock;
pub use super::targeting::TargetIndex;

/// System set labels for combat system ordering.
///
/// Use these to ensure proper ordering when adding custom systems that
/// interact with combat.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum CombatSystemPhase {
    /// Phase 1: Clocks, modifier/DoT/cooldown ticking, regeneration
    Upkeep,
    /// Phase 2: Perk loops, cast processing, dashes, auto-attacks
    Actions,
    /// Phase 3: Damage resolution, progression, notifications
    Resolution,
}

/// Configures the ordering between combat system phases.
///
/// Call this once during app setup before adding combat systems.
pub fn configure_combat_system_ordering(app: &mut App) {
    app.configure_sets(
        Update,
        (
            CombatSystemPhase::Upkeep,
            CombatSystemPhase::Actions,
            CombatSystemPhase::Resolution,
        )
            .chain(),
    );
}

/// Adds core combat simulation systems to the app.
///
/// These are the systems needed for the combat loop to function.
/// Both graphical and headless hosts need these.
///
/// # Arguments
/// * `app` - The Bevy App to add systems to
/// * `run_condition` - A run condition (e.g., `in_state(GameState::InCombat)`)
pub fn add_core_combat_systems<M>(app: &mut App, run_condition: impl Condition<M> + Clone)
where
    M: 'static,
{
    // Phase 1: Upkeep
    app.add_systems(
        Update,
        (
            advance_log_clock,
            advance_hit_gate,
            regenerate_resources,
            tick_modifiers,
            tick_dots,
            tick_skill_cooldowns,
            tick_motion_windows,
            refresh_target_index,
        )
            .chain()
            .in_set(CombatSystemPhase::Upkeep)
            .run_if(run_condition.clone()),
    );

    // Flush deferred commands between phases
    app.add_systems(
        Update,
        apply_deferred
            .after(CombatSystemPhase::Upkeep)
            .before(CombatSystemPhase::Actions)
            .run_if(run_condition.clone()),
    );

    // Phase 2: Actions
    app.add_systems(
        Update,
        (
            handle_equip_perks,
            handle_revive_requests,
            drive_perks,
            process_cast_requests,
            apply_deferred, // Flush CastState before the drive step sees it
            drive_casts,
            drive_dashes,
            drive_auto_attacks,
            apply_motion_requests,
        )
            .chain()
            .in_set(CombatSystemPhase::Actions)
            .run_if(run_condition.clone()),
    );

    // Phase 3: Resolution
    app.add_systems(
        Update,
        (
            resolve_damage_intents,
            grant_xp,
            apply_deferred, // Flush Dead markers before notifications
            broadcast_stat_changes,
        )
            .chain()
            .in_set(CombatSystemPhase::Resolution)
            .run_if(run_condition),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_phase_ordering() {
        // Verify system phases can be compared for ordering
        assert_ne!(CombatSystemPhase::Upkeep, CombatSystemPhase::Actions);
        assert_ne!(CombatSystemPhase::Actions, CombatSystemPhase::Resolution);
    }
}

//! Combat core
//!
//! The real-time combat simulation:
//! - Per-entity stat blocks, resources, and mutation rules
//! - Timed, reversible modifiers and damage over time
//! - The damage pipeline with shields, dedup, and the death transition
//! - Skill casts, multi-shot fans, dashes, and recurring perks
//! - Experience and level progression
//! - Combat logging and the change-notification surface

use bevy::prelude::*;

pub mod components;
pub mod constants;
pub mod damage;
pub mod events;
pub mod log;
pub mod modifiers;
pub mod motion;
pub mod progression;
pub mod skills;
pub mod stats;
pub mod systems;
pub mod targeting;

use events::*;

/// Plugin for the combat core. Registers every event, resource, and system
/// the simulation needs; hosts that want state-gated execution use
/// `systems::add_core_combat_systems` directly instead.
pub struct CombatPlugin;

impl Plugin for CombatPlugin {
    fn build(&self, app: &mut App) {
        app
            // Mutating intents
            .add_event::<DamageIntent>()
            .add_event::<CastRequest>()
            .add_event::<EquipPerkRequest>()
            .add_event::<GrantXp>()
            .add_event::<ReviveRequest>()
            // Notifications
            .add_event::<HealthChanged>()
            .add_event::<ManaChanged>()
            .add_event::<ShieldChanged>()
            .add_event::<ModifierApplied>()
            .add_event::<ModifierRemoved>()
            .add_event::<EntityDied>()
            .add_event::<EntityRevived>()
            .add_event::<XpChanged>()
            .add_event::<LevelProgress>()
            .add_event::<InsufficientResource>()
            .add_event::<SkillCastStarted>()
            .add_event::<ShotFired>()
            // Collaborator requests
            .add_event::<AnimationRequest>()
            .add_event::<MotionRequest>()
            // Resources
            .init_resource::<log::CombatLog>()
            .init_resource::<components::GameRng>()
            .init_resource::<components::SimulationSpeed>()
            .init_resource::<components::HitIdAllocator>()
            .init_resource::<damage::HitGate>()
            .init_resource::<targeting::TargetIndex>();

        systems::configure_combat_system_ordering(app);
        systems::add_core_combat_systems(app, || true);
    }
}

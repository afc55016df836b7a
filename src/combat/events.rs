//! Combat events
//!
//! The notification surface of the combat core. UI, network, and animation
//! collaborators subscribe to these; the core never depends on them.
//!
//! Events come in two flavors:
//! - **Intents** (`DamageIntent`, `CastRequest`, ...) mutate simulation state
//!   when processed by the core's systems.
//! - **Notifications** (`HealthChanged`, `EntityDied`, ...) are emitted by the
//!   core as observable side effects of state changes.

use bevy::prelude::*;

use super::modifiers::{ModifierCategory, ModifierId, ModifierKind};
use crate::config::SkillId;

// ============================================================================
// Mutating Intents
// ============================================================================

/// One hit traveling through the damage pipeline.
///
/// `hit_id` is unique per emission and exists for deduplication under
/// at-least-once delivery from a replicated source.
#[derive(Event, Debug, Clone)]
pub struct DamageIntent {
    /// Entity dealing the damage
    pub attacker: Entity,
    /// Entity receiving the damage
    pub target: Entity,
    /// Raw damage before defense mitigation
    pub amount: f32,
    /// Whether this hit was rolled as a critical (multiplier already applied)
    pub critical: bool,
    /// Unique hit id for `(attacker, hit_id)` deduplication
    pub hit_id: u64,
    /// Name of the skill that produced the hit (None for auto-attack)
    pub skill_name: Option<String>,
}

/// Request to cast an equipped skill.
#[derive(Event, Debug, Clone)]
pub struct CastRequest {
    /// Entity casting the skill
    pub caster: Entity,
    /// Which skill to cast
    pub skill: SkillId,
    /// Input direction (used by the InputDirection aim mode; ignored otherwise)
    pub input_dir: Vec3,
}

/// Request to equip (or re-equip at a new level) a recurring skill perk.
#[derive(Event, Debug, Clone)]
pub struct EquipPerkRequest {
    pub entity: Entity,
    pub perk: SkillId,
    pub level: u32,
}

/// Request to grant experience points. Negative amounts are forced positive.
#[derive(Event, Debug, Clone)]
pub struct GrantXp {
    pub entity: Entity,
    pub amount: f32,
}

/// Request to revive a dead entity at full health and mana.
#[derive(Event, Debug, Clone)]
pub struct ReviveRequest {
    pub entity: Entity,
}

// ============================================================================
// Notifications
// ============================================================================

/// Fired when an entity's current or maximum health changes.
#[derive(Event, Debug, Clone)]
pub struct HealthChanged {
    pub entity: Entity,
    pub current: f32,
    pub max: f32,
}

/// Fired when an entity's current or maximum mana changes.
#[derive(Event, Debug, Clone)]
pub struct ManaChanged {
    pub entity: Entity,
    pub current: f32,
    pub max: f32,
}

/// Fired when an entity's shield amount changes.
#[derive(Event, Debug, Clone)]
pub struct ShieldChanged {
    pub entity: Entity,
    pub current: f32,
}

/// Fired when a timed modifier is applied to an entity.
#[derive(Event, Debug, Clone)]
pub struct ModifierApplied {
    pub entity: Entity,
    pub id: ModifierId,
    pub kind: ModifierKind,
    pub category: ModifierCategory,
    pub magnitude: f32,
    pub duration: f32,
}

/// Fired when a timed modifier is removed from an entity.
#[derive(Event, Debug, Clone)]
pub struct ModifierRemoved {
    pub entity: Entity,
    pub id: ModifierId,
    pub category: ModifierCategory,
    /// How many modifiers of the same category remain active on the entity.
    /// UI uses this to keep buff/debuff counters in sync.
    pub remaining_in_category: usize,
    pub reason: ModifierRemovalReason,
}

/// Why a modifier was removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierRemovalReason {
    /// Duration expired naturally
    Expired,
    /// Explicitly canceled
    Canceled,
    /// Superseded by a re-application of the same perk identity
    Replaced,
}

/// Fired exactly once when an entity's health reaches zero.
#[derive(Event, Debug, Clone)]
pub struct EntityDied {
    pub entity: Entity,
    /// Entity that dealt the killing blow (None for environmental deaths)
    pub killer: Option<Entity>,
}

/// Fired when a dead entity is revived.
#[derive(Event, Debug, Clone)]
pub struct EntityRevived {
    pub entity: Entity,
}

/// Fired whenever accumulated XP changes.
#[derive(Event, Debug, Clone)]
pub struct XpChanged {
    pub entity: Entity,
    pub xp: f32,
    pub level: u32,
}

/// Fired once per level increment. A single XP grant that crosses two
/// thresholds fires this twice, so UI can animate intermediate steps.
#[derive(Event, Debug, Clone)]
pub struct LevelProgress {
    pub entity: Entity,
    pub new_level: u32,
}

/// Fired when a cast is aborted for lack of mana. User-facing, non-fatal.
#[derive(Event, Debug, Clone)]
pub struct InsufficientResource {
    pub entity: Entity,
    pub skill: SkillId,
}

/// Fired when a skill cast sequence actually starts (preconditions passed).
#[derive(Event, Debug, Clone)]
pub struct SkillCastStarted {
    pub caster: Entity,
    pub skill: SkillId,
    pub direction: Vec3,
}

/// Fired for each shot of a cast's fan, on every instance (replicas
/// included). Presentation uses the direction to spawn projectile visuals.
#[derive(Event, Debug, Clone)]
pub struct ShotFired {
    pub caster: Entity,
    pub skill: SkillId,
    pub direction: Vec3,
}

// ============================================================================
// Collaborator Requests (fire-and-forget)
// ============================================================================

/// Animation playback request for the presentation layer. The core never
/// waits on these; they are fire-and-forget.
#[derive(Event, Debug, Clone)]
pub struct AnimationRequest {
    pub entity: Entity,
    pub kind: AnimationKind,
}

/// Which animation to trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationKind {
    Attack,
    Skill(SkillId),
    Hit,
    Death,
}

/// Motion primitive request consumed by the movement collaborator.
#[derive(Event, Debug, Clone)]
pub struct MotionRequest {
    pub entity: Entity,
    pub motion: MotionKind,
}

/// The motion primitives the core emits
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionKind {
    /// Displace by a world-space vector this frame
    MoveBy(Vec3),
    /// Instantly relocate to a world-space position
    Teleport(Vec3),
}

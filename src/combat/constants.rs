//! Combat Constants
//!
//! Centralized location for the numeric contracts of the combat core.
//! This makes it easier to tune balance and ensures consistency.

// ============================================================================
// Timing Floors & Windows
// ============================================================================

/// Hard floor for the auto-attack interval in seconds.
/// Prevents zero-duration attack loops no matter how much attack speed stacks.
pub const ATTACK_SPEED_FLOOR: f32 = 0.05;

/// Recency window for hit deduplication in seconds.
/// A `(attacker, hit_id)` pair seen twice within this window applies once.
pub const HIT_DEDUP_WINDOW: f32 = 3.0;

/// Invincibility window granted on revive, in seconds.
pub const REVIVE_INVINCIBILITY_SECS: f32 = 2.0;

// ============================================================================
// Damage Pipeline
// ============================================================================

/// Post-defense damage floor. Any hit that reaches the resolver deals at
/// least this much, so stacking defense never makes an entity untouchable.
pub const GLOBAL_MIN_DAMAGE: f32 = 1.0;

// ============================================================================
// Damage Over Time
// ============================================================================

/// Fixed tick interval for DoT effects in seconds. A DoT spreads its total
/// damage over whole ticks of this length, with the remainder folded into
/// the final tick.
pub const DOT_TICK_INTERVAL: f32 = 0.2;

/// A DoT alone never reduces a victim below this HP. The lethal blow must
/// come from a direct hit.
pub const DOT_MIN_HP: f32 = 1.0;

// ============================================================================
// Stat Floors
// ============================================================================

/// Maximum health can never be altered below this value.
pub const MAX_HP_FLOOR: f32 = 1.0;

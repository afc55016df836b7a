//! Shared Combat Components & Resources
//!
//! Cross-cutting components and resources used by multiple combat modules.
//! Subsystem-specific state (StatBlock, ModifierLedger, skill runtime) lives
//! next to the systems that own it.

use bevy::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};

// ============================================================================
// Simulation Control
// ============================================================================

/// Seeded RNG resource for reproducible simulation (crit rolls, random aim).
#[derive(Resource)]
pub struct GameRng {
    rng: StdRng,
    /// The seed used to initialize this RNG (if deterministic)
    pub seed: Option<u64>,
}

impl GameRng {
    /// Create a new GameRng with a specific seed for deterministic behavior
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Create a new GameRng with random entropy (non-deterministic)
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Generate a random f32 in the range [0.0, 1.0)
    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    /// Generate a random f32 in the given range
    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        min + self.random_f32() * (max - min)
    }

    /// Roll a probability check. Returns true with probability `chance`.
    pub fn roll(&mut self, chance: f32) -> bool {
        self.random_f32() < chance
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}

/// Controls the speed of the combat simulation.
///
/// Every countdown in the core ticks by `scale(delta)`, so `multiplier == 0`
/// is a true global pause: elapsed accumulation halts and resumes exactly
/// where it left off.
#[derive(Resource)]
pub struct SimulationSpeed {
    /// Speed multiplier (0.0 = paused, 1.0 = normal, 2.0 = double)
    pub multiplier: f32,
}

impl Default for SimulationSpeed {
    fn default() -> Self {
        Self { multiplier: 1.0 }
    }
}

impl SimulationSpeed {
    pub fn pause(&mut self) {
        self.multiplier = 0.0;
    }

    pub fn resume(&mut self) {
        self.multiplier = 1.0;
    }

    pub fn is_paused(&self) -> bool {
        self.multiplier == 0.0
    }

    /// Scale a frame delta by the current speed. Paused simulations scale
    /// every delta to zero, so no suspended countdown leaks elapsed time.
    pub fn scale(&self, dt: f32) -> f32 {
        dt * self.multiplier
    }
}

/// Allocates unique hit ids for damage intents. Every emitted hit gets a
/// fresh id so the dedup gate can reject redundant re-deliveries.
#[derive(Resource, Default)]
pub struct HitIdAllocator {
    next: u64,
}

impl HitIdAllocator {
    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }
}

// ============================================================================
// Entity Markers
// ============================================================================

/// Team/faction identifier used by the nearest-target service.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Faction(pub u8);

/// Marker: this entity is dead. Inserted exactly once by the damage
/// resolver; its presence suspends the auto-attack loop, perk loops, and
/// cast processing. Active modifier countdowns keep running.
#[derive(Component, Debug)]
pub struct Dead;

/// Marker: this simulation instance owns the entity and is allowed to apply
/// real damage and drive its action loops. Entities without it are visual
/// replicas: they run the full cast/animation sequence but never emit or
/// resolve damage.
#[derive(Component, Debug)]
pub struct LocalAuthority;

/// Per-entity cache of the last broadcast stat values. The notification
/// system compares against this to emit precise change events.
#[derive(Component, Debug, Default, Clone)]
pub struct StatEcho {
    pub hp: f32,
    pub max_hp: f32,
    pub mp: f32,
    pub max_mp: f32,
    pub shield: f32,
    pub xp: f32,
    pub level: u32,
}

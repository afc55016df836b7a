//! Cast-Driven Motion
//!
//! Dash sequences, movement locks, and cast facing. The core never moves an
//! entity directly during normal play; it emits `MotionRequest` primitives
//! and lets the movement collaborator apply them. `apply_motion_requests` is
//! that collaborator's default implementation.
//!
//! Move speed is read live from the stat block every frame, so a dash or a
//! speed modifier expiring mid-dash needs no restoration bookkeeping.

use bevy::prelude::*;

use super::components::{Dead, Faction, SimulationSpeed};
use super::events::{MotionKind, MotionRequest};
use super::targeting::TargetIndex;
use crate::config::DashParams;

// ============================================================================
// Dash state machine
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DashPhase {
    Dashing,
    BetweenWaves,
}

/// An in-flight dash. Inserting a new `DashState` over an existing one is
/// the cancel-before-replace path: the old sequence simply stops driving
/// motion, and nothing needs unwinding because dashes never touch stats.
#[derive(Component, Debug, Clone)]
pub struct DashState {
    pub direction: Vec3,
    pub speed: f32,
    wave_duration: f32,
    remaining: f32,
    /// Waves not yet started after the current one
    waves_left: u32,
    wave_delay: f32,
    delay_remaining: f32,
    retarget_per_wave: bool,
    phase: DashPhase,
}

/// What one tick of a dash produced.
#[derive(Debug, Default, PartialEq)]
pub struct DashTick {
    /// Seconds of motion to apply along the current direction
    pub motion_secs: f32,
    /// Seconds consumed from the caller's budget (motion plus wave delay)
    pub consumed: f32,
    /// A new wave started and wants its direction re-resolved
    pub retarget: bool,
    /// The sequence is complete; the component should be removed
    pub finished: bool,
}

impl DashState {
    pub fn new(direction: Vec3, params: &DashParams) -> Self {
        let direction = direction.normalize_or_zero();
        let direction = if params.reverse { -direction } else { direction };
        Self {
            direction,
            speed: params.speed,
            wave_duration: params.duration,
            remaining: params.duration,
            waves_left: params.waves.saturating_sub(1),
            wave_delay: params.wave_delay,
            delay_remaining: 0.0,
            retarget_per_wave: params.retarget_per_wave,
            phase: DashPhase::Dashing,
        }
    }

    /// Advance by `dt` seconds in a single direction segment. Stops early
    /// when a retarget is due so the caller can re-resolve `direction`
    /// before motion continues.
    pub fn advance(&mut self, mut dt: f32) -> DashTick {
        let mut tick = DashTick::default();
        while dt > 0.0 {
            match self.phase {
                DashPhase::Dashing => {
                    let step = dt.min(self.remaining);
                    tick.motion_secs += step;
                    tick.consumed += step;
                    self.remaining -= step;
                    dt -= step;
                    if self.remaining <= 0.0 {
                        if self.waves_left == 0 {
                            tick.finished = true;
                            return tick;
                        }
                        self.phase = DashPhase::BetweenWaves;
                        self.delay_remaining = self.wave_delay;
                    }
                }
                DashPhase::BetweenWaves => {
                    let step = dt.min(self.delay_remaining);
                    tick.consumed += step;
                    self.delay_remaining -= step;
                    dt -= step;
                    if self.delay_remaining <= 0.0 {
                        self.waves_left -= 1;
                        self.remaining = self.wave_duration;
                        self.phase = DashPhase::Dashing;
                        if self.retarget_per_wave {
                            tick.retarget = true;
                            return tick;
                        }
                    }
                }
            }
        }
        tick
    }
}

/// Suppresses normal movement for its duration (cast stop windows).
/// The external movement controller checks for its presence.
#[derive(Component, Debug)]
pub struct MovementLock {
    pub remaining: f32,
}

/// Rotates the entity toward a cast direction for a short window.
#[derive(Component, Debug)]
pub struct CastFacing {
    pub direction: Vec3,
    pub remaining: f32,
}

// ============================================================================
// Systems
// ============================================================================

/// Drive active dashes, emitting motion and handling wave transitions.
/// Dead entities keep no dashes: the damage resolver strips `DashState` on
/// the death transition.
pub fn drive_dashes(
    mut commands: Commands,
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    index: Res<TargetIndex>,
    mut query: Query<(Entity, &mut DashState, &Transform, &Faction), Without<Dead>>,
    mut motion_events: EventWriter<MotionRequest>,
) {
    let dt = speed.scale(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    for (entity, mut dash, transform, faction) in query.iter_mut() {
        let mut budget = dt;
        let mut displacement = Vec3::ZERO;
        loop {
            let before = budget;
            let tick = dash.advance(budget);
            displacement += dash.direction * dash.speed * tick.motion_secs;
            budget = (before - tick.consumed).max(0.0);
            if tick.finished {
                commands.entity(entity).remove::<DashState>();
                break;
            }
            if tick.retarget {
                if let Some(target) =
                    index.nearest_enemy(transform.translation, *faction)
                {
                    let to_target = target.position - transform.translation;
                    dash.direction = to_target.normalize_or_zero();
                }
                continue;
            }
            break;
        }
        if displacement != Vec3::ZERO {
            motion_events.send(MotionRequest {
                entity,
                motion: MotionKind::MoveBy(displacement),
            });
        }
    }
}

/// Tick down movement locks and cast-facing windows, removing them on
/// expiry. Facing is applied as a hard look-at while the window is open.
pub fn tick_motion_windows(
    mut commands: Commands,
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut locks: Query<(Entity, &mut MovementLock)>,
    mut facings: Query<(Entity, &mut CastFacing, &mut Transform)>,
) {
    let dt = speed.scale(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    for (entity, mut lock) in locks.iter_mut() {
        lock.remaining -= dt;
        if lock.remaining <= 0.0 {
            commands.entity(entity).remove::<MovementLock>();
        }
    }

    for (entity, mut facing, mut transform) in facings.iter_mut() {
        if facing.direction != Vec3::ZERO {
            let target = transform.translation + facing.direction;
            transform.look_at(target, Vec3::Y);
        }
        facing.remaining -= dt;
        if facing.remaining <= 0.0 {
            commands.entity(entity).remove::<CastFacing>();
        }
    }
}

/// Default movement collaborator: applies the core's motion primitives to
/// transforms. Hosts with their own physics replace this system.
pub fn apply_motion_requests(
    mut motion_events: EventReader<MotionRequest>,
    mut query: Query<&mut Transform>,
) {
    for request in motion_events.read() {
        let Ok(mut transform) = query.get_mut(request.entity) else {
            continue;
        };
        match request.motion {
            MotionKind::MoveBy(delta) => transform.translation += delta,
            MotionKind::Teleport(position) => transform.translation = position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(waves: u32, wave_delay: f32) -> DashParams {
        DashParams {
            speed: 10.0,
            duration: 0.5,
            reverse: false,
            waves,
            wave_delay,
            retarget_per_wave: false,
        }
    }

    #[test]
    fn test_single_wave_finishes_after_duration() {
        let mut dash = DashState::new(Vec3::X, &params(1, 0.0));
        let tick = dash.advance(0.3);
        assert_eq!(tick.motion_secs, 0.3);
        assert!(!tick.finished);

        let tick = dash.advance(0.3);
        assert_eq!(tick.motion_secs, 0.2);
        assert!(tick.finished);
    }

    #[test]
    fn test_waves_are_separated_by_delay() {
        let mut dash = DashState::new(Vec3::X, &params(2, 0.2));
        // First wave plus the full delay plus part of the second wave
        let tick = dash.advance(0.8);
        assert!((tick.motion_secs - 0.6).abs() < 1e-6);
        assert!(!tick.finished);

        let tick = dash.advance(1.0);
        assert!((tick.motion_secs - 0.4).abs() < 1e-6);
        assert!(tick.finished);
    }

    #[test]
    fn test_retarget_pauses_advance_at_wave_start() {
        let mut p = params(2, 0.1);
        p.retarget_per_wave = true;
        let mut dash = DashState::new(Vec3::X, &p);

        let tick = dash.advance(0.7);
        assert!((tick.motion_secs - 0.5).abs() < 1e-6);
        assert!(tick.retarget);
        assert!(!tick.finished);

        // Caller re-resolves direction, then continues the remaining budget
        dash.direction = Vec3::Z;
        let tick = dash.advance(0.1);
        assert!((tick.motion_secs - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_reverse_flips_direction() {
        let mut p = params(1, 0.0);
        p.reverse = true;
        let dash = DashState::new(Vec3::X, &p);
        assert_eq!(dash.direction, -Vec3::X);
    }
}

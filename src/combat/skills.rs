//! Skill Runtime
//!
//! The action loops of the combat core: the auto-attack cycle, on-demand
//! skill casts, and autonomous perk loops. Each cast runs as a short
//! component-driven sequence (facing, movement lock, pre-launch delay,
//! multi-shot fan) whose countdowns all tick by pause-scaled time.
//!
//! Authority split: every instance runs the full cast sequence for its
//! entities (animation requests, motion, timers), but only entities marked
//! `LocalAuthority` emit damage intents. Visual replicas stay cosmetic.

use bevy::prelude::*;
use bevy::utils::HashMap;

use super::components::{
    Dead, Faction, GameRng, HitIdAllocator, LocalAuthority, SimulationSpeed,
};
use super::constants::REVIVE_INVINCIBILITY_SECS;
use super::damage::make_hit;
use super::events::{
    AnimationKind, AnimationRequest, CastRequest, DamageIntent, EntityRevived, EquipPerkRequest,
    InsufficientResource, ModifierApplied, ModifierRemoved, ReviveRequest, ShotFired,
    SkillCastStarted,
};
use super::log::CombatLog;
use super::modifiers::{ModifierCategory, ModifierKind, ModifierLedger, ModifierOwner};
use super::motion::{CastFacing, DashState, MovementLock};
use super::stats::{StatBlock, StatKind};
use super::targeting::TargetIndex;
use crate::config::{AimMode, EffectKind, SkillConfig, SkillDefinitions, SkillId};

// ============================================================================
// Components
// ============================================================================

/// The basic attack cycle. Fires at the nearest enemy in range every
/// `StatBlock::attack_interval` seconds. Suspended while casting, stunned,
/// or dead.
#[derive(Component, Debug)]
pub struct AutoAttack {
    pub range: f32,
    pub enabled: bool,
    cooldown: f32,
}

impl AutoAttack {
    pub fn new(range: f32) -> Self {
        Self {
            range,
            enabled: true,
            cooldown: 0.0,
        }
    }

    /// Restart the cycle from a full interval (used on revive).
    pub fn reset(&mut self, interval: f32) {
        self.cooldown = interval;
    }
}

/// Per-entity skill cooldown tracker. Absent key = ready.
#[derive(Component, Debug, Default)]
pub struct SkillCooldowns {
    remaining: HashMap<SkillId, f32>,
}

impl SkillCooldowns {
    pub fn is_ready(&self, skill: &str) -> bool {
        !self.remaining.contains_key(skill)
    }

    pub fn remaining(&self, skill: &str) -> f32 {
        self.remaining.get(skill).copied().unwrap_or(0.0)
    }

    /// Start a cooldown, shortened by the caster's cooldown reduction.
    pub fn start(&mut self, skill: &str, base: f32, reduction_pct: f32) {
        let duration = base * (1.0 - reduction_pct).max(0.0);
        if duration > 0.0 {
            self.remaining.insert(skill.to_string(), duration);
        }
    }

    pub fn tick(&mut self, dt: f32) {
        for value in self.remaining.values_mut() {
            *value -= dt;
        }
        self.remaining.retain(|_, v| *v > 0.0);
    }
}

/// Skill levels owned by an entity. Unknown skills default to level 1.
#[derive(Component, Debug, Default)]
pub struct SkillLevels {
    levels: HashMap<SkillId, u32>,
}

impl SkillLevels {
    pub fn level_of(&self, skill: &str) -> u32 {
        self.levels.get(skill).copied().unwrap_or(1)
    }

    pub fn set(&mut self, skill: &str, level: u32) {
        self.levels.insert(skill.to_string(), level.max(1));
    }
}

/// An in-flight cast sequence. Its presence suspends the auto-attack loop
/// and blocks further casts; removed when the last shot fires.
#[derive(Component, Debug)]
pub struct CastState {
    pub skill: SkillId,
    pub level: u32,
    pub direction: Vec3,
    pre_launch: f32,
    shots_total: u32,
    shots_fired: u32,
    shot_delay: f32,
    shot_timer: f32,
    fan_angle: f32,
    damage_per_shot: f32,
}

impl CastState {
    /// Angular offset of shot `i`, spread evenly across the fan.
    fn shot_offset(&self, index: u32) -> f32 {
        if self.shots_total <= 1 {
            return 0.0;
        }
        let t = index as f32 / (self.shots_total - 1) as f32;
        -self.fan_angle / 2.0 + self.fan_angle * t
    }
}

/// One equipped recurring perk. Autonomously requests its own casts
/// whenever the skill is off cooldown, mana suffices, and a target exists.
#[derive(Debug, Clone)]
pub struct PerkDrive {
    pub skill: SkillId,
    pub level: u32,
}

/// Equipped perks, keyed by skill id. Re-equipping replaces in place.
#[derive(Component, Debug, Default)]
pub struct PerkDrives {
    drives: HashMap<SkillId, PerkDrive>,
}

impl PerkDrives {
    pub fn equip(&mut self, skill: &str, level: u32) {
        self.drives.insert(
            skill.to_string(),
            PerkDrive {
                skill: skill.to_string(),
                level: level.max(1),
            },
        );
    }

    pub fn unequip(&mut self, skill: &str) -> bool {
        self.drives.remove(skill).is_some()
    }

    pub fn is_equipped(&self, skill: &str) -> bool {
        self.drives.contains_key(skill)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PerkDrive> {
        self.drives.values()
    }
}

// ============================================================================
// Aim resolution
// ============================================================================

/// Resolve a cast's firing direction. Falls back to facing when the chosen
/// mode cannot produce a direction (no enemy alive, zero input).
fn resolve_aim(
    aim: AimMode,
    input_dir: Vec3,
    position: Vec3,
    facing: Vec3,
    faction: Faction,
    index: &TargetIndex,
    rng: &mut GameRng,
) -> Vec3 {
    let dir = match aim {
        AimMode::InputDirection => input_dir,
        AimMode::NearestEnemy => index
            .nearest_enemy(position, faction)
            .map(|t| t.position - position)
            .unwrap_or(facing),
        AimMode::Forward => facing,
        AimMode::Reverse => -facing,
        AimMode::Random => {
            let angle = rng.random_range(0.0, std::f32::consts::TAU);
            Vec3::new(angle.cos(), 0.0, angle.sin())
        }
    };
    let dir = dir.normalize_or_zero();
    if dir == Vec3::ZERO {
        facing.normalize_or_zero()
    } else {
        dir
    }
}

fn apply_self_effects(
    skill: &SkillConfig,
    stats: &mut StatBlock,
    ledger: &mut ModifierLedger,
    entity: Entity,
    owner: ModifierOwner,
    applied_events: &mut EventWriter<ModifierApplied>,
    removed_events: &mut EventWriter<ModifierRemoved>,
) {
    for effect in &skill.effects {
        let (kind, category) = match effect.kind {
            EffectKind::Heal => {
                stats.heal_hp(effect.magnitude);
                continue;
            }
            EffectKind::Shield => (ModifierKind::Shield, ModifierCategory::Buff),
            EffectKind::MoveSpeed => {
                (ModifierKind::Stat(StatKind::MoveSpeed), ModifierCategory::Buff)
            }
            EffectKind::AttackSpeed => (
                ModifierKind::Stat(StatKind::AttackSpeed),
                ModifierCategory::Buff,
            ),
            EffectKind::Defense => (ModifierKind::Stat(StatKind::Defense), ModifierCategory::Buff),
            EffectKind::Damage => (ModifierKind::Stat(StatKind::Damage), ModifierCategory::Buff),
            EffectKind::Invincible => (ModifierKind::Invincible, ModifierCategory::Buff),
            EffectKind::Slow => (
                ModifierKind::Stat(StatKind::MoveSpeed),
                ModifierCategory::Debuff,
            ),
        };
        let (id, replaced) = ledger.apply_timed(
            stats,
            kind,
            category,
            effect.magnitude,
            effect.duration,
            owner.clone(),
        );
        for removal in replaced {
            removed_events.send(ModifierRemoved {
                entity,
                id: removal.id,
                category: removal.category,
                remaining_in_category: ledger.active_count(removal.category),
                reason: removal.reason,
            });
        }
        applied_events.send(ModifierApplied {
            entity,
            id,
            kind,
            category,
            magnitude: effect.magnitude,
            duration: effect.duration,
        });
    }
}

// ============================================================================
// Systems
// ============================================================================

/// Drive the auto-attack cycle for authoritative entities.
pub fn drive_auto_attacks(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    index: Res<TargetIndex>,
    mut rng: ResMut<GameRng>,
    mut hit_ids: ResMut<HitIdAllocator>,
    mut query: Query<
        (
            Entity,
            &mut AutoAttack,
            &StatBlock,
            &ModifierLedger,
            &Transform,
            &Faction,
        ),
        (Without<Dead>, Without<CastState>, With<LocalAuthority>),
    >,
    mut damage_events: EventWriter<DamageIntent>,
    mut animation_events: EventWriter<AnimationRequest>,
) {
    let dt = speed.scale(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    for (entity, mut attack, stats, ledger, transform, faction) in query.iter_mut() {
        attack.cooldown = (attack.cooldown - dt).max(0.0);
        if !attack.enabled || attack.cooldown > 0.0 || ledger.is_stunned() {
            continue;
        }
        // A tick with no valid target still counts as an attempt: the
        // cycle waits out the full interval rather than polling every frame
        let target = index
            .nearest_enemy(transform.translation, *faction)
            .filter(|t| transform.translation.distance(t.position) <= attack.range);
        let Some(target) = target else {
            attack.cooldown = stats.attack_interval();
            continue;
        };

        let critical = rng.roll(stats.crit_rate);
        let amount = if critical {
            stats.damage * stats.crit_multiplier
        } else {
            stats.damage
        };
        damage_events.send(make_hit(
            &mut hit_ids,
            entity,
            target.entity,
            amount,
            critical,
            None,
        ));
        animation_events.send(AnimationRequest {
            entity,
            kind: AnimationKind::Attack,
        });
        attack.cooldown = stats.attack_interval();
    }
}

/// Tick every skill cooldown by pause-scaled time.
pub fn tick_skill_cooldowns(
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    mut query: Query<&mut SkillCooldowns>,
) {
    let dt = speed.scale(time.delta_secs());
    if dt <= 0.0 {
        return;
    }
    for mut cooldowns in query.iter_mut() {
        cooldowns.tick(dt);
    }
}

/// Validate pending cast requests and start the cast sequences that pass.
///
/// Gate order: known skill, caster idle (no in-flight cast), not stunned,
/// cooldown ready, mana available. Mana is deducted atomically with the
/// sequence start, so a failed gate costs nothing.
#[allow(clippy::too_many_arguments)]
pub fn process_cast_requests(
    mut commands: Commands,
    skills: Res<SkillDefinitions>,
    index: Res<TargetIndex>,
    mut rng: ResMut<GameRng>,
    mut log: ResMut<CombatLog>,
    mut requests: EventReader<CastRequest>,
    mut casters: Query<
        (
            &mut StatBlock,
            &mut ModifierLedger,
            &mut SkillCooldowns,
            &SkillLevels,
            &Transform,
            &Faction,
            Has<CastState>,
            Option<&PerkDrives>,
            Option<&mut AutoAttack>,
        ),
        Without<Dead>,
    >,
    mut started_events: EventWriter<SkillCastStarted>,
    mut insufficient_events: EventWriter<InsufficientResource>,
    mut animation_events: EventWriter<AnimationRequest>,
    mut applied_events: EventWriter<ModifierApplied>,
    mut removed_events: EventWriter<ModifierRemoved>,
) {
    // CastState inserts are deferred, so track casts started this frame
    let mut started: Vec<Entity> = Vec::new();
    for request in requests.read() {
        let Some(skill) = skills.get(&request.skill) else {
            warn!("Cast request for unknown skill '{}'", request.skill);
            continue;
        };
        let Ok((
            mut stats,
            mut ledger,
            mut cooldowns,
            levels,
            transform,
            faction,
            casting,
            perks,
            auto_attack,
        )) = casters.get_mut(request.caster)
        else {
            continue;
        };
        if casting
            || started.contains(&request.caster)
            || ledger.is_stunned()
            || !cooldowns.is_ready(&request.skill)
        {
            continue;
        }
        if !stats.consume_mana(skill.mana_cost) {
            insufficient_events.send(InsufficientResource {
                entity: request.caster,
                skill: request.skill.clone(),
            });
            continue;
        }

        let facing = *transform.forward();
        let direction = resolve_aim(
            skill.aim,
            request.input_dir,
            transform.translation,
            facing,
            *faction,
            &index,
            &mut rng,
        );
        let level = levels.level_of(&request.skill);

        // Perk-owned casts tag their modifiers so a later unequip or
        // replace can revoke them; manual casts stack ad hoc.
        let owner = if perks.is_some_and(|p| p.is_equipped(&request.skill)) {
            ModifierOwner::Perk(request.skill.clone())
        } else {
            ModifierOwner::AdHoc
        };
        apply_self_effects(
            skill,
            &mut stats,
            &mut ledger,
            request.caster,
            owner,
            &mut applied_events,
            &mut removed_events,
        );

        let shots = skill.shots_at(level);
        let mut entity_commands = commands.entity(request.caster);
        entity_commands.insert(CastState {
            skill: request.skill.clone(),
            level,
            direction,
            pre_launch: skill.pre_launch_delay,
            shots_total: if skill.deals_damage() { shots.count } else { 0 },
            shots_fired: 0,
            shot_delay: shots.delay,
            shot_timer: 0.0,
            fan_angle: shots.angle,
            damage_per_shot: skill.damage_at(level) + stats.damage,
        });
        if skill.stop_window > 0.0 {
            entity_commands.insert(MovementLock {
                remaining: skill.stop_window,
            });
        }
        if skill.facing_time > 0.0 {
            entity_commands.insert(CastFacing {
                direction,
                remaining: skill.facing_time,
            });
        }
        if let Some(dash) = &skill.dash {
            // Insert-over-existing is the cancel path for a running dash
            entity_commands.insert(DashState::new(direction, dash));
        }

        cooldowns.start(&request.skill, skill.cooldown, stats.cooldown_reduction_pct);
        // Casting postpones the next auto-attack tick
        if let Some(mut attack) = auto_attack {
            attack.reset(stats.attack_interval());
        }
        started_events.send(SkillCastStarted {
            caster: request.caster,
            skill: request.skill.clone(),
            direction,
        });
        animation_events.send(AnimationRequest {
            entity: request.caster,
            kind: AnimationKind::Skill(request.skill.clone()),
        });
        log.log_cast(request.caster, &request.skill);
        started.push(request.caster);
    }
}

/// Advance in-flight cast sequences: pre-launch delay, then the multi-shot
/// fan. Shots pick targets nearest-first so a volley spreads across the
/// closest enemies. Only authoritative entities emit damage; replicas run
/// the same timers and stop silently.
#[allow(clippy::too_many_arguments)]
pub fn drive_casts(
    mut commands: Commands,
    time: Res<Time>,
    speed: Res<SimulationSpeed>,
    skills: Res<SkillDefinitions>,
    index: Res<TargetIndex>,
    mut rng: ResMut<GameRng>,
    mut hit_ids: ResMut<HitIdAllocator>,
    mut casters: Query<
        (
            Entity,
            &mut CastState,
            &StatBlock,
            &Transform,
            &Faction,
            Has<LocalAuthority>,
        ),
        Without<Dead>,
    >,
    mut dot_targets: Query<&mut ModifierLedger>,
    mut damage_events: EventWriter<DamageIntent>,
    mut shot_events: EventWriter<ShotFired>,
) {
    let dt = speed.scale(time.delta_secs());
    if dt <= 0.0 {
        return;
    }

    for (entity, mut cast, stats, transform, faction, authoritative) in casters.iter_mut() {
        if cast.pre_launch > 0.0 {
            cast.pre_launch -= dt;
            if cast.pre_launch > 0.0 {
                continue;
            }
        }

        if cast.shots_fired >= cast.shots_total {
            commands.entity(entity).remove::<CastState>();
            continue;
        }

        let skill = skills.get_unchecked(&cast.skill);
        cast.shot_timer += dt;
        let interval = cast.shot_delay.max(0.0);

        // First shot is due immediately; later shots wait out the delay
        while cast.shots_fired < cast.shots_total
            && (cast.shots_fired == 0 || interval == 0.0 || cast.shot_timer >= interval)
        {
            if cast.shots_fired > 0 && interval > 0.0 {
                cast.shot_timer -= interval;
            }
            let shot_index = cast.shots_fired;
            cast.shots_fired += 1;

            let offset = cast.shot_offset(shot_index).to_radians();
            let shot_dir = Quat::from_rotation_y(offset) * cast.direction;
            shot_events.send(ShotFired {
                caster: entity,
                skill: cast.skill.clone(),
                direction: shot_dir,
            });
            if !authoritative {
                continue;
            }

            let ranked = index.ranked_enemies(transform.translation, *faction);
            if ranked.is_empty() {
                continue;
            }
            let target = ranked[shot_index as usize % ranked.len()];

            let critical = rng.roll(stats.crit_rate);
            let amount = if critical {
                cast.damage_per_shot * stats.crit_multiplier
            } else {
                cast.damage_per_shot
            };
            damage_events.send(make_hit(
                &mut hit_ids,
                entity,
                target.entity,
                amount,
                critical,
                Some(skill.name.clone()),
            ));

            if let Some(dot) = skill.dot {
                if let Ok(mut target_ledger) = dot_targets.get_mut(target.entity) {
                    target_ledger.apply_dot(&cast.skill, entity, dot.total_damage, dot.duration);
                }
            }
        }

        if cast.shots_fired >= cast.shots_total {
            commands.entity(entity).remove::<CastState>();
        }
    }
}

/// Request casts for equipped perks that are ready to fire. The regular
/// cast gates still apply; the perk loop just pre-checks the cheap ones to
/// avoid a stream of failed requests.
pub fn drive_perks(
    skills: Res<SkillDefinitions>,
    index: Res<TargetIndex>,
    mut query: Query<
        (
            Entity,
            &PerkDrives,
            &mut SkillCooldowns,
            &StatBlock,
            &ModifierLedger,
            &Transform,
            &Faction,
        ),
        (Without<Dead>, Without<CastState>, With<LocalAuthority>),
    >,
    mut cast_events: EventWriter<CastRequest>,
) {
    for (entity, perks, mut cooldowns, stats, ledger, transform, faction) in query.iter_mut() {
        if ledger.is_stunned() {
            continue;
        }
        for perk in perks.iter() {
            let Some(skill) = skills.get(&perk.skill) else {
                continue;
            };
            if !cooldowns.is_ready(&perk.skill) || stats.mp < skill.mana_cost {
                continue;
            }
            if skill.deals_damage()
                && index.nearest_enemy(transform.translation, *faction).is_none()
            {
                // No target: wait one cooldown period rather than casting
                // into the void or re-checking every frame
                cooldowns.start(&perk.skill, skill.cooldown, stats.cooldown_reduction_pct);
                continue;
            }
            cast_events.send(CastRequest {
                caster: entity,
                skill: perk.skill.clone(),
                input_dir: Vec3::ZERO,
            });
            // One cast request per frame per entity; the CastState gate
            // would reject the rest anyway
            break;
        }
    }
}

/// Handle perk equip requests. Re-equipping an already equipped perk
/// replaces it: the old level's in-flight cast is canceled and perk-owned
/// modifiers are revoked, so the new level starts from a clean slate.
pub fn handle_equip_perks(
    mut commands: Commands,
    skills: Res<SkillDefinitions>,
    mut requests: EventReader<EquipPerkRequest>,
    mut query: Query<(
        &mut PerkDrives,
        &mut SkillLevels,
        &mut ModifierLedger,
        &mut StatBlock,
        Option<&CastState>,
    )>,
    mut removed_events: EventWriter<ModifierRemoved>,
) {
    for request in requests.read() {
        let Some(skill) = skills.get(&request.perk) else {
            warn!("Equip request for unknown perk '{}'", request.perk);
            continue;
        };
        if !skill.is_perk {
            warn!("Equip request for non-perk skill '{}'", request.perk);
            continue;
        }
        let Ok((mut perks, mut levels, mut ledger, mut stats, cast)) =
            query.get_mut(request.entity)
        else {
            continue;
        };
        if perks.is_equipped(&request.perk) {
            // No pending shots from the old level may outlive the swap
            if cast.is_some_and(|c| c.skill == request.perk) {
                commands.entity(request.entity).remove::<CastState>();
            }
            for removal in ledger.cancel_owned_by(&request.perk, &mut stats) {
                removed_events.send(ModifierRemoved {
                    entity: request.entity,
                    id: removal.id,
                    category: removal.category,
                    remaining_in_category: ledger.active_count(removal.category),
                    reason: removal.reason,
                });
            }
        }
        perks.equip(&request.perk, request.level);
        levels.set(&request.perk, request.level);
    }
}

/// Revive dead entities at full resources with a short grace window.
pub fn handle_revive_requests(
    mut commands: Commands,
    mut log: ResMut<CombatLog>,
    mut requests: EventReader<ReviveRequest>,
    mut query: Query<
        (
            &mut StatBlock,
            &mut ModifierLedger,
            Option<&mut AutoAttack>,
        ),
        With<Dead>,
    >,
    mut revived_events: EventWriter<EntityRevived>,
    mut applied_events: EventWriter<ModifierApplied>,
) {
    for request in requests.read() {
        let Ok((mut stats, mut ledger, attack)) = query.get_mut(request.entity) else {
            continue;
        };
        stats.hp = stats.max_hp;
        stats.mp = stats.max_mp;
        if let Some(mut attack) = attack {
            attack.reset(stats.attack_interval());
        }
        let (id, _) = ledger.apply_timed(
            &mut stats,
            ModifierKind::Invincible,
            ModifierCategory::Buff,
            0.0,
            REVIVE_INVINCIBILITY_SECS,
            ModifierOwner::AdHoc,
        );
        applied_events.send(ModifierApplied {
            entity: request.entity,
            id,
            kind: ModifierKind::Invincible,
            category: ModifierCategory::Buff,
            magnitude: 0.0,
            duration: REVIVE_INVINCIBILITY_SECS,
        });
        commands.entity(request.entity).remove::<Dead>();
        revived_events.send(EntityRevived {
            entity: request.entity,
        });
        log.log_revive(request.entity);
    }
}

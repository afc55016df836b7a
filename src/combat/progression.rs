//! Progression Tracker
//!
//! Experience accrual and level-ups against the content-defined XP table.
//! A single grant can cross several thresholds; each increment produces its
//! own notification so observers can animate intermediate steps.

use bevy::prelude::*;
use smallvec::SmallVec;

use super::events::{GrantXp, LevelProgress};
use super::log::CombatLog;
use super::stats::StatBlock;
use crate::config::CharacterDefinitions;

/// Apply an XP grant against the level table. XP rolls over at each
/// threshold, so `xp` always measures progress within the current level.
/// Returns every level reached, in order. Negative grants are forced
/// positive; past the table's end XP still accrues but levels stop.
pub fn apply_xp(stats: &mut StatBlock, amount: f32, table: &[f32]) -> SmallVec<[u32; 2]> {
    let amount = amount.abs();
    stats.xp += amount;

    let mut gained = SmallVec::new();
    let max_level = table.len() as u32 + 1;
    while stats.level < max_level {
        let threshold = table[(stats.level - 1) as usize];
        debug_assert!(threshold > 0.0);
        if stats.xp < threshold {
            break;
        }
        stats.xp -= threshold;
        stats.level += 1;
        gained.push(stats.level);
    }
    gained
}

/// Drain pending XP grants and emit one notification per level increment.
pub fn grant_xp(
    characters: Res<CharacterDefinitions>,
    mut log: ResMut<CombatLog>,
    mut grants: EventReader<GrantXp>,
    mut query: Query<&mut StatBlock>,
    mut level_events: EventWriter<LevelProgress>,
) {
    for grant in grants.read() {
        let Ok(mut stats) = query.get_mut(grant.entity) else {
            continue;
        };
        for new_level in apply_xp(&mut stats, grant.amount, characters.xp_table()) {
            level_events.send(LevelProgress {
                entity: grant.entity,
                new_level,
            });
            log.log_level_up(grant.entity, new_level);
        }
    }
}

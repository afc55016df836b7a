//! Target Acquisition
//!
//! A per-frame snapshot of living combatant positions, rebuilt once and then
//! queried by every aim resolution in the same frame. Keeps the auto-attack
//! loop and multi-shot fan from each walking the full entity set.

use bevy::prelude::*;

use super::components::{Dead, Faction};
use super::stats::StatBlock;

/// One candidate in the index.
#[derive(Debug, Clone, Copy)]
pub struct TargetEntry {
    pub entity: Entity,
    pub faction: Faction,
    pub position: Vec3,
}

/// Frame snapshot of living, targetable combatants.
#[derive(Resource, Default)]
pub struct TargetIndex {
    entries: Vec<TargetEntry>,
}

impl TargetIndex {
    /// Nearest living entity of a different faction, with its position.
    pub fn nearest_enemy(&self, from: Vec3, faction: Faction) -> Option<TargetEntry> {
        self.entries
            .iter()
            .filter(|e| e.faction != faction)
            .min_by(|a, b| {
                let da = a.position.distance_squared(from);
                let db = b.position.distance_squared(from);
                da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
            })
            .copied()
    }

    /// All living enemies of the given faction within `range` of `from`.
    pub fn enemies_within(
        &self,
        from: Vec3,
        faction: Faction,
        range: f32,
    ) -> impl Iterator<Item = TargetEntry> + '_ {
        let range_sq = range * range;
        self.entries
            .iter()
            .filter(move |e| {
                e.faction != faction && e.position.distance_squared(from) <= range_sq
            })
            .copied()
    }

    /// All living enemies of the given faction, nearest first. Multi-shot
    /// fans walk this list so a volley spreads across the closest targets.
    pub fn ranked_enemies(&self, from: Vec3, faction: Faction) -> Vec<TargetEntry> {
        let mut enemies: Vec<TargetEntry> = self
            .entries
            .iter()
            .filter(|e| e.faction != faction)
            .copied()
            .collect();
        enemies.sort_by(|a, b| {
            let da = a.position.distance_squared(from);
            let db = b.position.distance_squared(from);
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        });
        enemies
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn insert(&mut self, entry: TargetEntry) {
        self.entries.push(entry);
    }
}

/// Rebuild the index from the current world state. Runs at the top of each
/// combat frame, before any system resolves aim.
pub fn refresh_target_index(
    mut index: ResMut<TargetIndex>,
    query: Query<(Entity, &Faction, &Transform, &StatBlock), Without<Dead>>,
) {
    index.entries.clear();
    for (entity, faction, transform, stats) in query.iter() {
        if stats.is_alive() {
            index.entries.push(TargetEntry {
                entity,
                faction: *faction,
                position: transform.translation,
            });
        }
    }
}

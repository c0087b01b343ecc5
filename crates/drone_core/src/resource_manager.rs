//! Ore lifecycle: spawning, collection and stale-entry sweeps.
//!
//! The manager is the only owner of [`ResourceNode`]s. It keeps two views:
//!
//! - an arena of live nodes keyed by [`OreId`], which is the ground truth for
//!   "does this node still exist";
//! - an ordered list of active ids that drones pick targets from.
//!
//! The two can drift apart when a node is destroyed through a path other than
//! [`ResourceManager::collect`]. [`ResourceManager::update`] sweeps those
//! dangling entries before it spawns anything, and every removal is
//! idempotent, so drones racing for the same node never fault.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::components::OreId;
use crate::config::SpawnerConfig;
use crate::math::Vec2;
use crate::ore::ResourceNode;
use crate::random::RandomSource;
use crate::spatial::SpatialQuery;

/// What happened during one [`ResourceManager::update`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnerReport {
    /// Node spawned this update, if any.
    pub spawned: Option<OreId>,
    /// True when a spawn was due but no valid position was found.
    pub spawn_failed: bool,
    /// Stale ids removed by the sweep.
    pub purged: Vec<OreId>,
}

/// Owner of every resource node in the field.
#[derive(Debug, Clone)]
pub struct ResourceManager {
    config: SpawnerConfig,
    nodes: BTreeMap<OreId, ResourceNode>,
    active: Vec<OreId>,
    timer: f32,
    next_id: u64,
}

impl ResourceManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new(config: SpawnerConfig) -> Self {
        Self {
            config,
            nodes: BTreeMap::new(),
            active: Vec::new(),
            timer: 0.0,
            next_id: 1,
        }
    }

    /// Spawner settings currently in force.
    #[must_use]
    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Seconds between spawn attempts.
    #[must_use]
    pub fn spawn_interval(&self) -> f32 {
        self.config.spawn_interval
    }

    /// Replace the spawn interval. Validation is the caller's job.
    pub fn set_spawn_interval(&mut self, interval: f32) {
        self.config.spawn_interval = interval;
    }

    /// Maximum number of simultaneously active nodes.
    #[must_use]
    pub fn max_active(&self) -> usize {
        self.config.max_active
    }

    /// Active ids in insertion order.
    #[must_use]
    pub fn active_ids(&self) -> &[OreId] {
        &self.active
    }

    /// Owned copy of the active ids that still resolve to a live node.
    ///
    /// Target selection iterates this copy, so removals made while a drone is
    /// choosing cannot invalidate the iteration.
    #[must_use]
    pub fn active_snapshot(&self) -> Vec<OreId> {
        self.active
            .iter()
            .copied()
            .filter(|id| self.is_active(*id))
            .collect()
    }

    /// Number of active entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether there are no active entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Whether `id` is listed as active and still backed by an uncollected node.
    #[must_use]
    pub fn is_active(&self, id: OreId) -> bool {
        self.nodes.get(&id).is_some_and(|n| !n.is_collected()) && self.active.contains(&id)
    }

    /// Look up a live node.
    #[must_use]
    pub fn get(&self, id: OreId) -> Option<&ResourceNode> {
        self.nodes.get(&id)
    }

    /// Position of a live, uncollected node.
    #[must_use]
    pub fn position(&self, id: OreId) -> Option<Vec2> {
        self.nodes
            .get(&id)
            .filter(|n| !n.is_collected())
            .map(|n| n.position)
    }

    /// Iterate active nodes in insertion order.
    pub fn active_nodes(&self) -> impl Iterator<Item = &ResourceNode> {
        self.active.iter().filter_map(|id| self.nodes.get(id))
    }

    /// Fill the field at startup with up to `min(max_active, prewarm_cap)` nodes.
    pub fn prewarm(
        &mut self,
        rng: &mut dyn RandomSource,
        spatial: &dyn SpatialQuery,
    ) -> Vec<OreId> {
        let target = self.config.max_active.min(self.config.prewarm_cap);
        let mut spawned = Vec::new();
        while self.active.len() < target {
            match self.spawn(rng, spatial) {
                Some(id) => spawned.push(id),
                None => {
                    warn!(
                        active = self.active.len(),
                        target, "Prewarm stopped early: no valid spawn position"
                    );
                    break;
                }
            }
        }
        spawned
    }

    /// Try to place one new node.
    ///
    /// Returns `None` when the field is already at capacity or when every
    /// placement attempt was rejected. Neither case is an error; the spawner
    /// simply tries again on its next eligible update.
    pub fn spawn(
        &mut self,
        rng: &mut dyn RandomSource,
        spatial: &dyn SpatialQuery,
    ) -> Option<OreId> {
        if self.active.len() >= self.config.max_active {
            debug!(max = self.config.max_active, "Spawn skipped: field at capacity");
            return None;
        }

        let Some(position) = self.find_spawn_position(rng, spatial) else {
            warn!(
                attempts = self.config.max_attempts,
                "Failed to find valid spawn position"
            );
            return None;
        };

        Some(self.insert(position))
    }

    /// Place a node at an exact position, skipping the clearance checks.
    ///
    /// Still refuses when the field is at capacity. Used for scripted setups.
    pub fn spawn_at(&mut self, position: Vec2) -> Option<OreId> {
        if self.active.len() >= self.config.max_active {
            return None;
        }
        Some(self.insert(position))
    }

    fn insert(&mut self, position: Vec2) -> OreId {
        let id = OreId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, ResourceNode::new(id, position));
        self.active.push(id);
        debug!(ore = %id, x = position.x, y = position.y, "Spawned ore");
        id
    }

    /// Sample candidate positions until one clears every obstacle and drone.
    fn find_spawn_position(
        &self,
        rng: &mut dyn RandomSource,
        spatial: &dyn SpatialQuery,
    ) -> Option<Vec2> {
        let center = self.config.center;
        let half = self.config.half_extents;

        for _ in 0..self.config.max_attempts {
            let candidate = center
                + Vec2::new(
                    rng.uniform(-half.x, half.x),
                    rng.uniform(-half.y, half.y),
                );

            if spatial.overlaps_obstacle(candidate, self.config.obstacle_clearance) {
                continue;
            }

            let crowded = !spatial
                .query_neighbors(candidate, self.config.min_drone_distance, &|_| true)
                .is_empty();
            if crowded {
                continue;
            }

            return Some(candidate);
        }

        None
    }

    /// Advance the spawn timer, sweep stale entries and spawn when due.
    pub fn update(
        &mut self,
        dt: f32,
        rng: &mut dyn RandomSource,
        spatial: &dyn SpatialQuery,
    ) -> SpawnerReport {
        let mut report = SpawnerReport {
            purged: self.purge_stale(),
            ..SpawnerReport::default()
        };

        self.timer += dt;
        if self.timer >= self.config.spawn_interval && self.active.len() < self.config.max_active
        {
            report.spawned = self.spawn(rng, spatial);
            report.spawn_failed = report.spawned.is_none();
            self.timer = 0.0;
        }

        self.assert_invariants();
        report
    }

    /// Remove a node from the field.
    ///
    /// Idempotent: `None`, an id that is no longer active, or an id collected
    /// earlier are all no-ops that return `None`. On success the node is
    /// marked collected, destroyed, and returned.
    pub fn collect(&mut self, id: Option<OreId>) -> Option<ResourceNode> {
        let Some(id) = id else {
            warn!("Trying to collect a missing ore handle");
            return None;
        };

        let Some(index) = self.active.iter().position(|a| *a == id) else {
            warn!(ore = %id, "Ore not found in active ores list");
            // A node that lingers in the arena without an active entry is
            // destroyed anyway so it cannot leak.
            if let Some(mut orphan) = self.nodes.remove(&id) {
                orphan.mark_collected();
            }
            return None;
        };

        self.active.remove(index);
        let mut node = self.nodes.remove(&id)?;
        if !node.mark_collected() {
            warn!(ore = %id, "Ore was already collected");
            return None;
        }

        debug!(ore = %id, remaining = self.active.len(), "Collected ore");
        Some(node)
    }

    /// Destroy a node's backing entity without touching the active list.
    ///
    /// Models destruction through an external path; the dangling active
    /// entry is removed by the next [`update`](Self::update) sweep.
    pub fn despawn_untracked(&mut self, id: OreId) -> bool {
        self.nodes.remove(&id).is_some()
    }

    /// Drop active ids whose node is gone and nodes that were collected but
    /// never removed.
    pub fn purge_stale(&mut self) -> Vec<OreId> {
        let mut purged = Vec::new();

        let nodes = &self.nodes;
        self.active.retain(|id| {
            let live = nodes.get(id).is_some_and(|n| !n.is_collected());
            if !live {
                purged.push(*id);
            }
            live
        });

        let stuck: Vec<OreId> = self
            .nodes
            .values()
            .filter(|n| n.is_collected())
            .map(|n| n.id)
            .collect();
        for id in stuck {
            self.nodes.remove(&id);
            if !purged.contains(&id) {
                purged.push(id);
            }
        }

        for id in &purged {
            warn!(ore = %id, "Destroying stale ore");
        }
        purged
    }

    /// Capacity holds and no id appears twice in the active list.
    #[must_use]
    pub fn invariants_hold(&self) -> bool {
        if self.active.len() > self.config.max_active {
            return false;
        }
        let mut ids = self.active.clone();
        ids.sort_unstable();
        ids.windows(2).all(|w| w[0] != w[1])
    }

    fn assert_invariants(&self) {
        #[cfg(any(debug_assertions, feature = "debug-validation"))]
        assert!(
            self.invariants_hold(),
            "resource manager invariants violated: {} active of max {}",
            self.active.len(),
            self.config.max_active
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{DroneId, Obstacle};
    use crate::random::SimRng;
    use crate::spatial::{Neighbor, SpatialIndex};
    use rand::SeedableRng;

    fn empty_field() -> SpatialIndex {
        SpatialIndex::new(2.0, Vec::new())
    }

    fn manager(max_active: usize) -> ResourceManager {
        ResourceManager::new(SpawnerConfig {
            max_active,
            ..SpawnerConfig::default()
        })
    }

    #[test]
    fn test_prewarm_caps_at_five() {
        let mut rng = SimRng::seed_from_u64(1);
        let mut ores = manager(10);
        let spawned = ores.prewarm(&mut rng, &empty_field());
        assert_eq!(spawned.len(), 5);
        assert_eq!(ores.len(), 5);

        let mut small = manager(3);
        small.prewarm(&mut rng, &empty_field());
        assert_eq!(small.len(), 3);
    }

    #[test]
    fn test_spawn_respects_bounds() {
        let mut rng = SimRng::seed_from_u64(2);
        let mut ores = ResourceManager::new(SpawnerConfig {
            center: Vec2::new(100.0, -50.0),
            half_extents: Vec2::new(2.0, 1.0),
            max_active: 50,
            ..SpawnerConfig::default()
        });
        for _ in 0..50 {
            ores.spawn(&mut rng, &empty_field());
        }
        assert_eq!(ores.len(), 50);
        for node in ores.active_nodes() {
            assert!((98.0..=102.0).contains(&node.position.x));
            assert!((-51.0..=-49.0).contains(&node.position.y));
        }
    }

    #[test]
    fn test_spawn_refuses_beyond_capacity() {
        let mut rng = SimRng::seed_from_u64(3);
        let mut ores = manager(2);
        assert!(ores.spawn(&mut rng, &empty_field()).is_some());
        assert!(ores.spawn(&mut rng, &empty_field()).is_some());
        assert!(ores.spawn(&mut rng, &empty_field()).is_none());
        assert_eq!(ores.len(), 2);
    }

    #[test]
    fn test_spawn_fails_when_field_is_blocked() {
        let mut rng = SimRng::seed_from_u64(4);
        let mut ores = ResourceManager::new(SpawnerConfig {
            half_extents: Vec2::new(1.0, 1.0),
            ..SpawnerConfig::default()
        });
        let blocked = SpatialIndex::new(
            2.0,
            vec![Obstacle {
                center: Vec2::ZERO,
                radius: 5.0,
            }],
        );
        assert!(ores.spawn(&mut rng, &blocked).is_none());
        assert!(ores.is_empty());
    }

    #[test]
    fn test_spawn_keeps_clear_of_drones() {
        let mut rng = SimRng::seed_from_u64(5);
        let mut ores = ResourceManager::new(SpawnerConfig {
            half_extents: Vec2::new(6.0, 6.0),
            max_active: 200,
            min_drone_distance: 3.0,
            ..SpawnerConfig::default()
        });
        let mut field = empty_field();
        field.rebuild([Neighbor {
            owner: DroneId(1),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
        }]);

        for _ in 0..200 {
            ores.spawn(&mut rng, &field);
        }
        assert!(!ores.is_empty());
        for node in ores.active_nodes() {
            assert!(node.position.length() >= 3.0);
        }
    }

    #[test]
    fn test_collect_is_idempotent() {
        let mut rng = SimRng::seed_from_u64(6);
        let mut ores = manager(10);
        ores.prewarm(&mut rng, &empty_field());
        let target = ores.active_ids()[2];

        let first = ores.collect(Some(target));
        assert!(first.is_some_and(|n| n.is_collected() && n.id == target));
        assert_eq!(ores.len(), 4);
        assert!(!ores.is_active(target));

        assert!(ores.collect(Some(target)).is_none());
        assert_eq!(ores.len(), 4);

        assert!(ores.collect(None).is_none());
        assert!(ores.collect(Some(OreId(999))).is_none());
        assert_eq!(ores.len(), 4);
    }

    #[test]
    fn test_update_spawns_on_interval() {
        let mut rng = SimRng::seed_from_u64(7);
        let mut ores = ResourceManager::new(SpawnerConfig {
            spawn_interval: 1.0,
            ..SpawnerConfig::default()
        });

        let report = ores.update(0.6, &mut rng, &empty_field());
        assert!(report.spawned.is_none());
        let report = ores.update(0.6, &mut rng, &empty_field());
        assert!(report.spawned.is_some());
        assert_eq!(ores.len(), 1);

        // Timer was reset
        let report = ores.update(0.6, &mut rng, &empty_field());
        assert!(report.spawned.is_none());
    }

    #[test]
    fn test_update_never_exceeds_capacity() {
        let mut rng = SimRng::seed_from_u64(8);
        let mut ores = ResourceManager::new(SpawnerConfig {
            spawn_interval: 0.2,
            max_active: 3,
            ..SpawnerConfig::default()
        });
        for _ in 0..100 {
            ores.update(0.5, &mut rng, &empty_field());
            assert!(ores.len() <= 3);
            assert!(ores.invariants_hold());
        }
        assert_eq!(ores.len(), 3);
    }

    #[test]
    fn test_sweep_purges_externally_destroyed_nodes() {
        let mut rng = SimRng::seed_from_u64(9);
        let mut ores = manager(10);
        ores.prewarm(&mut rng, &empty_field());
        let victim = ores.active_ids()[0];

        assert!(ores.despawn_untracked(victim));
        assert_eq!(ores.len(), 5);
        assert!(!ores.is_active(victim));
        assert!(!ores.active_snapshot().contains(&victim));

        let report = ores.update(0.0, &mut rng, &empty_field());
        assert_eq!(report.purged, vec![victim]);
        assert_eq!(ores.len(), 4);

        // Collecting the purged node afterwards is still a no-op
        assert!(ores.collect(Some(victim)).is_none());
    }

    #[test]
    fn test_spawn_at_respects_capacity() {
        let mut ores = manager(1);
        let id = ores.spawn_at(Vec2::new(1.0, 2.0)).unwrap();
        assert_eq!(ores.position(id), Some(Vec2::new(1.0, 2.0)));
        assert!(ores.spawn_at(Vec2::ZERO).is_none());
    }

    #[test]
    fn test_set_spawn_interval() {
        let mut ores = manager(10);
        ores.set_spawn_interval(7.5);
        assert_eq!(ores.spawn_interval(), 7.5);
    }
}

//! Property tests for the ore lifecycle and operator controls.

use drone_core::prelude::*;
use drone_test_utils::fixtures::busy_config;
use drone_test_utils::proptest::prelude::*;
use drone_test_utils::strategies::{
    arb_control_op, arb_manager_op, arb_neighbors, ControlOp, ManagerOp,
};
use rand::SeedableRng;

fn index_for(manager: &ResourceManager, raw: usize) -> Option<OreId> {
    let ids = manager.active_ids();
    if ids.is_empty() {
        None
    } else {
        Some(ids[raw % ids.len()])
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn spawn_keeps_clear_of_every_drone(
        neighbors in arb_neighbors(30, 10.0),
        seed in any::<u64>(),
    ) {
        let config = SpawnerConfig {
            half_extents: Vec2::new(10.0, 10.0),
            max_active: 1_000,
            min_drone_distance: 3.0,
            ..SpawnerConfig::default()
        };
        let mut ores = ResourceManager::new(config);
        let mut index = SpatialIndex::new(2.0, Vec::new());
        index.rebuild(neighbors.iter().copied());
        let mut rng = SimRng::seed_from_u64(seed);

        for _ in 0..1_000 {
            ores.spawn(&mut rng, &index);
        }

        for node in ores.active_nodes() {
            for body in &neighbors {
                prop_assert!(node.position.distance(body.position) >= 3.0 - 1e-4);
            }
        }
    }

    #[test]
    fn spawn_avoids_obstacles(seed in any::<u64>()) {
        let obstacle = Obstacle { center: Vec2::ZERO, radius: 4.0 };
        let config = SpawnerConfig {
            half_extents: Vec2::new(6.0, 6.0),
            max_active: 200,
            ..SpawnerConfig::default()
        };
        let mut ores = ResourceManager::new(config);
        let index = SpatialIndex::new(2.0, vec![obstacle]);
        let mut rng = SimRng::seed_from_u64(seed);

        for _ in 0..200 {
            ores.spawn(&mut rng, &index);
        }
        for node in ores.active_nodes() {
            prop_assert!(!obstacle.overlaps(node.position, config.obstacle_clearance));
        }
    }

    #[test]
    fn capacity_and_idempotent_collect_hold(
        ops in prop::collection::vec(arb_manager_op(), 1..80),
        max_active in 1usize..12,
        seed in any::<u64>(),
    ) {
        let config = SpawnerConfig {
            max_active,
            spawn_interval: 0.5,
            ..SpawnerConfig::default()
        };
        let mut ores = ResourceManager::new(config);
        let index = SpatialIndex::new(2.0, Vec::new());
        let mut rng = SimRng::seed_from_u64(seed);

        for op in ops {
            match op {
                ManagerOp::Update(dt) => {
                    ores.update(dt, &mut rng, &index);
                }
                ManagerOp::Spawn => {
                    ores.spawn(&mut rng, &index);
                }
                ManagerOp::Prewarm => {
                    ores.prewarm(&mut rng, &index);
                }
                ManagerOp::Collect(raw) => {
                    if let Some(id) = index_for(&ores, raw) {
                        let live = ores.is_active(id);
                        let before = ores.len();
                        let collected = ores.collect(Some(id));
                        prop_assert_eq!(collected.is_some(), live);
                        prop_assert_eq!(ores.len(), before - 1);
                    }
                }
                ManagerOp::CollectTwice(raw) => {
                    if let Some(id) = index_for(&ores, raw) {
                        let before = ores.len();
                        ores.collect(Some(id));
                        prop_assert!(ores.collect(Some(id)).is_none());
                        prop_assert_eq!(ores.len(), before - 1);
                    }
                }
                ManagerOp::DespawnUntracked(raw) => {
                    if let Some(id) = index_for(&ores, raw) {
                        ores.despawn_untracked(id);
                        prop_assert!(!ores.is_active(id));
                    }
                }
            }
            prop_assert!(ores.len() <= max_active);
            prop_assert!(ores.invariants_hold());
        }
    }

    #[test]
    fn operator_inputs_never_break_invariants(
        ops in prop::collection::vec(arb_control_op(), 1..60),
        seed in any::<u64>(),
    ) {
        let mut sim = Simulation::new(busy_config(), seed).unwrap();

        for op in ops {
            match op {
                ControlOp::SetPopulation(faction, n) => {
                    sim.set_population(faction, n);
                    prop_assert_eq!(sim.factions().population(faction), n);
                }
                ControlOp::SetSpeed(value) => {
                    let before = sim.factions().speed_multiplier();
                    let accepted = sim.set_speed_multiplier(value).is_ok();
                    prop_assert_eq!(accepted, value > 0.0);
                    if !accepted {
                        prop_assert_eq!(sim.factions().speed_multiplier(), before);
                    }
                }
                ControlOp::SetSpawnInterval(text) => {
                    sim.set_spawn_interval(&text);
                }
                ControlOp::Step(dt) => {
                    sim.step(dt);
                }
            }

            prop_assert!(sim.ores().spawn_interval() > 0.1);
            prop_assert!(sim.ores().len() <= sim.ores().max_active());
            for drone in sim.factions().drones() {
                prop_assert!(drone.invariants_hold());
            }
        }
    }
}

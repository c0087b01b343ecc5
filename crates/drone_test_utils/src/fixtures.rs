//! Test fixtures and helpers.
//!
//! Pre-built configurations and scripted setups for consistent testing.

use drone_core::components::{DroneId, OreId};
use drone_core::config::SimConfig;
use drone_core::factions::FactionId;
use drone_core::math::Vec2;
use drone_core::simulation::Simulation;

/// A config with no drones, no prewarm and a spawner that never fires on its
/// own, so tests place everything explicitly.
#[must_use]
pub fn quiet_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.spawner.prewarm_cap = 0;
    config.spawner.spawn_interval = 1.0e6;
    for faction in FactionId::ALL {
        config.factions[faction].initial_drones = 0;
    }
    config
}

/// A crowded, fast-spawning field with both factions close together.
#[must_use]
pub fn busy_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.spawner.half_extents = Vec2::new(12.0, 12.0);
    config.spawner.spawn_interval = 0.5;
    config.spawner.min_drone_distance = 1.5;
    config.factions.blue.base = Some(Vec2::new(-8.0, 0.0));
    config.factions.red.base = Some(Vec2::new(8.0, 0.0));
    config.factions.blue.initial_drones = 8;
    config.factions.red.initial_drones = 8;
    config
}

/// An empty simulation built from [`quiet_config`].
///
/// # Panics
///
/// Panics if the default configuration stops validating.
#[must_use]
pub fn quiet_simulation(seed: u64) -> Simulation {
    Simulation::new(quiet_config(), seed).expect("quiet config is valid")
}

/// Add one drone to `faction` and move it to `position`.
///
/// # Panics
///
/// Panics if the drone could not be created.
pub fn spawn_drone_at(sim: &mut Simulation, faction: FactionId, position: Vec2) -> DroneId {
    let population = sim.factions().population(faction);
    let change = sim.set_population(faction, population + 1);
    let id = *change.spawned.first().expect("population grew by one");
    sim.place_drone(id, position);
    id
}

/// Place an ore at an exact position.
///
/// # Panics
///
/// Panics if the field is already full.
pub fn spawn_ore_at(sim: &mut Simulation, position: Vec2) -> OreId {
    sim.spawn_ore_at(position).expect("field has capacity")
}

/// Step `frames` times at a constant `dt`, returning the total deliveries.
pub fn run_frames(sim: &mut Simulation, frames: usize, dt: f32) -> usize {
    (0..frames).map(|_| sim.step(dt).deliveries()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiet_simulation_is_empty() {
        let sim = quiet_simulation(1);
        assert_eq!(sim.factions().drones().count(), 0);
        assert!(sim.ores().is_empty());
    }

    #[test]
    fn test_busy_config_is_valid() {
        busy_config().validate().unwrap();
    }

    #[test]
    fn test_spawn_helpers() {
        let mut sim = quiet_simulation(2);
        let drone = spawn_drone_at(&mut sim, FactionId::Red, Vec2::new(3.0, 4.0));
        let ore = spawn_ore_at(&mut sim, Vec2::new(-1.0, 0.0));

        assert_eq!(sim.drone(drone).unwrap().position(), Vec2::new(3.0, 4.0));
        assert!(sim.ores().is_active(ore));
    }
}

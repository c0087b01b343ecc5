//! Simulation context and frame loop.
//!
//! [`Simulation`] owns every subsystem and advances them in a fixed order.
//! There is no global state: everything a drone can touch is lent to it for
//! the duration of its logic tick.
//!
//! # Determinism
//!
//! - All randomness comes from one seeded [`SimRng`].
//! - Rosters, active ores and contact pairs are iterated in a fixed order.
//! - Steering reads a frozen snapshot, so drone order never changes the forces.
//!
//! Same seed, same config and same inputs always produce the same
//! [`state_hash`](Simulation::state_hash).
//!
//! # Example
//!
//! ```
//! use drone_core::prelude::*;
//!
//! let mut sim = Simulation::new(SimConfig::default(), 42).unwrap();
//! assert_eq!(sim.factions().population(FactionId::Blue), 5);
//!
//! let events = sim.step(1.0 / 60.0);
//! assert!(events.substeps <= 1);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use rand::SeedableRng;
use tracing::{debug, trace, warn};

use crate::components::{DroneId, OreId};
use crate::config::SimConfig;
use crate::drone::{Drone, MotionPlan};
use crate::error::Result;
use crate::events::{SimEvent, TickEvents};
use crate::faction_controller::{FactionController, PopulationChange};
use crate::factions::FactionId;
use crate::math::Vec2;
use crate::random::SimRng;
use crate::resource_manager::{ResourceManager, SpawnerReport};
use crate::snapshot::{DroneSnapshot, FactionSnapshot, OreSnapshot, SimSnapshot};
use crate::spatial::{SpatialIndex, SpatialQuery};

/// Frame clock with a fixed-step physics accumulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    elapsed: f64,
    fixed_dt: f32,
    accumulator: f32,
    max_substeps: u32,
}

impl Clock {
    /// Create a clock at time zero.
    #[must_use]
    pub const fn new(fixed_dt: f32, max_substeps: u32) -> Self {
        Self {
            elapsed: 0.0,
            fixed_dt,
            accumulator: 0.0,
            max_substeps,
        }
    }

    /// Advance by a frame and return how many physics sub-steps are due.
    ///
    /// When more than `max_substeps` are owed the extra whole steps are
    /// dropped, so one long frame cannot stall the loop.
    pub fn advance(&mut self, dt: f32) -> u32 {
        self.elapsed += f64::from(dt);
        self.accumulator += dt;

        let mut steps = 0;
        while self.accumulator >= self.fixed_dt && steps < self.max_substeps {
            self.accumulator -= self.fixed_dt;
            steps += 1;
        }

        if self.accumulator >= self.fixed_dt {
            trace!(owed = self.accumulator, "Physics backlog dropped");
            self.accumulator %= self.fixed_dt;
        }
        steps
    }

    /// Simulated seconds.
    ///
    /// Kept in `f64` so a single frame still moves it after long runs or a
    /// long pause.
    #[must_use]
    pub const fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Physics step length.
    #[must_use]
    pub const fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Time owed to physics but not yet stepped.
    #[must_use]
    pub const fn accumulator(&self) -> f32 {
        self.accumulator
    }
}

/// The harvesting simulation.
#[derive(Debug, Clone)]
pub struct Simulation {
    config: SimConfig,
    ores: ResourceManager,
    factions: FactionController,
    spatial: SpatialIndex,
    rng: SimRng,
    clock: Clock,
    frame: u64,
    /// Events raised between frames, flushed into the next [`TickEvents`].
    pending: Vec<SimEvent>,
    /// Drone pairs touching at the end of the last physics sub-step.
    contacts: BTreeSet<(DroneId, DroneId)>,
}

impl Simulation {
    /// Build a simulation: spawn each faction's starting drones, then prewarm
    /// the ore field around them.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfig`](crate::error::SimError::InvalidConfig)
    /// if the configuration fails validation.
    pub fn new(config: SimConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        let mut sim = Self {
            ores: ResourceManager::new(config.spawner),
            factions: FactionController::new(&config),
            spatial: SpatialIndex::new(config.avoidance.radius, config.obstacles.clone()),
            rng: SimRng::seed_from_u64(seed),
            clock: Clock::new(config.fixed_dt(), config.max_substeps),
            frame: 0,
            pending: Vec::new(),
            contacts: BTreeSet::new(),
            config,
        };

        for faction in FactionId::ALL {
            let initial = sim.config.factions[faction].initial_drones;
            sim.set_population(faction, initial);
        }

        sim.rebuild_spatial();
        let prewarmed = sim.ores.prewarm(&mut sim.rng, &sim.spatial);
        sim.pending
            .extend(prewarmed.into_iter().map(|ore| SimEvent::OreSpawned { ore }));

        debug!(
            seed,
            ores = sim.ores.len(),
            blue = sim.factions.population(FactionId::Blue),
            red = sim.factions.population(FactionId::Red),
            "Simulation initialized"
        );
        Ok(sim)
    }

    /// Advance by one frame of `dt` seconds.
    ///
    /// Order: clock, spatial rebuild, ore spawner, drone logic (Blue roster
    /// then Red), then the physics sub-steps owed by the clock. A zero `dt`
    /// runs the logic tick without advancing time.
    pub fn step(&mut self, dt: f32) -> TickEvents {
        let dt = if dt.is_finite() && dt >= 0.0 {
            dt
        } else {
            warn!(dt, "Ignoring invalid frame delta");
            0.0
        };

        let mut events = std::mem::take(&mut self.pending);
        let substeps = self.clock.advance(dt);
        self.frame += 1;

        self.rebuild_spatial();
        let report = self.ores.update(dt, &mut self.rng, &self.spatial);
        push_spawner_events(&report, &mut events);

        let now = self.clock.elapsed();
        self.factions
            .run_logic(&mut self.ores, &mut self.rng, &mut events, now, dt);

        let fixed_dt = self.clock.fixed_dt();
        for _ in 0..substeps {
            self.physics_substep(fixed_dt, &mut events);
        }

        trace!(frame = self.frame, hash = self.state_hash(), "Frame complete");
        TickEvents { events, substeps }
    }

    fn rebuild_spatial(&mut self) {
        self.spatial
            .rebuild(self.factions.drones().map(Drone::as_neighbor));
    }

    fn physics_substep(&mut self, dt: f32, events: &mut Vec<SimEvent>) {
        self.rebuild_spatial();

        // Read pass: every plan sees the same frozen snapshot
        let radius = self.config.avoidance.radius;
        let plans: Vec<MotionPlan> = self
            .factions
            .drones()
            .map(|drone| {
                let me = drone.id();
                let neighbors =
                    self.spatial
                        .query_neighbors(drone.position(), radius, &|n| n.owner != me);
                drone.plan_motion(&neighbors, &self.ores)
            })
            .collect();

        // Write pass
        for (drone, plan) in self.factions.drones_mut().zip(plans) {
            drone.apply_motion(plan, dt);
        }

        self.resolve_contacts(events);
    }

    /// Fire contact impulses for pairs that started touching this sub-step.
    fn resolve_contacts(&mut self, events: &mut Vec<SimEvent>) {
        self.rebuild_spatial();
        let reach = self.config.drone.body_radius * 2.0;

        let positions: HashMap<DroneId, Vec2> = self
            .factions
            .drones()
            .map(|d| (d.id(), d.position()))
            .collect();

        let mut touching = BTreeSet::new();
        for drone in self.factions.drones() {
            let me = drone.id();
            for other in self
                .spatial
                .query_neighbors(drone.position(), reach, &|n| n.owner > me)
            {
                touching.insert((me, other.owner));
            }
        }

        let started: Vec<(DroneId, DroneId)> =
            touching.difference(&self.contacts).copied().collect();
        for (a, b) in started {
            let (Some(&pos_a), Some(&pos_b)) = (positions.get(&a), positions.get(&b)) else {
                continue;
            };
            if let Some(drone) = self.factions.drone_mut(a) {
                drone.on_contact(pos_b, b);
            }
            if let Some(drone) = self.factions.drone_mut(b) {
                drone.on_contact(pos_a, a);
            }
            events.push(SimEvent::Contact { a, b });
        }

        self.contacts = touching;
    }

    /// Resize a faction's roster. Events appear in the next frame's output.
    pub fn set_population(&mut self, faction: FactionId, population: usize) -> PopulationChange {
        let change = self.factions.set_population(faction, population);
        self.pending.extend(change.events(faction));
        change
    }

    /// Change the global speed multiplier.
    ///
    /// # Errors
    ///
    /// Returns an error for non-finite or non-positive values.
    pub fn set_speed_multiplier(&mut self, multiplier: f32) -> Result<()> {
        self.factions.set_speed_multiplier(multiplier)
    }

    /// Apply operator text as the ore spawn interval. Returns whether it was
    /// accepted.
    pub fn set_spawn_interval(&mut self, text: &str) -> bool {
        self.factions.set_spawn_interval(text, &mut self.ores)
    }

    /// Place an ore at an exact position, bypassing clearance checks.
    pub fn spawn_ore_at(&mut self, position: Vec2) -> Option<OreId> {
        let ore = self.ores.spawn_at(position)?;
        self.pending.push(SimEvent::OreSpawned { ore });
        Some(ore)
    }

    /// Destroy an ore without going through collection.
    pub fn despawn_ore_untracked(&mut self, ore: OreId) -> bool {
        self.ores.despawn_untracked(ore)
    }

    /// Teleport a drone, clearing its velocity.
    pub fn place_drone(&mut self, drone: DroneId, position: Vec2) -> bool {
        match self.factions.drone_mut(drone) {
            Some(d) => {
                d.place_at(position);
                true
            }
            None => false,
        }
    }

    /// Configuration in force at construction.
    #[must_use]
    pub const fn config(&self) -> &SimConfig {
        &self.config
    }

    /// The ore field.
    #[must_use]
    pub const fn ores(&self) -> &ResourceManager {
        &self.ores
    }

    /// Rosters and tallies.
    #[must_use]
    pub const fn factions(&self) -> &FactionController {
        &self.factions
    }

    /// The clock.
    #[must_use]
    pub const fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Frames stepped so far.
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Look up a drone.
    #[must_use]
    pub fn drone(&self, id: DroneId) -> Option<&Drone> {
        self.factions.drone(id)
    }

    /// Capture the observable state.
    #[must_use]
    pub fn snapshot(&self) -> SimSnapshot {
        let factions = FactionId::ALL
            .iter()
            .map(|&faction| {
                let base = self.factions.base(faction);
                FactionSnapshot {
                    faction,
                    base: base.position,
                    temporary_base: base.temporary,
                    resources: self.factions.tally(faction),
                    drones: self
                        .factions
                        .roster(faction)
                        .iter()
                        .map(DroneSnapshot::from)
                        .collect(),
                }
            })
            .collect();

        SimSnapshot {
            frame: self.frame,
            elapsed: self.clock.elapsed(),
            speed_multiplier: self.factions.speed_multiplier(),
            spawn_interval: self.ores.spawn_interval(),
            factions,
            ores: self.ores.active_nodes().map(OreSnapshot::from).collect(),
        }
    }

    /// Hash of the full simulation state, for determinism checks.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.frame.hash(&mut hasher);
        self.clock.elapsed().to_bits().hash(&mut hasher);

        for faction in FactionId::ALL {
            faction.hash(&mut hasher);
            self.factions.tally(faction).hash(&mut hasher);
            let roster = self.factions.roster(faction);
            roster.len().hash(&mut hasher);
            for drone in roster {
                drone.id().hash(&mut hasher);
                drone.position().x.to_bits().hash(&mut hasher);
                drone.position().y.to_bits().hash(&mut hasher);
                drone.velocity().x.to_bits().hash(&mut hasher);
                drone.velocity().y.to_bits().hash(&mut hasher);
                drone.facing().to_bits().hash(&mut hasher);
                drone.state().hash(&mut hasher);
                drone.target().hash(&mut hasher);
                drone.is_carrying().hash(&mut hasher);
            }
        }

        self.ores.len().hash(&mut hasher);
        for node in self.ores.active_nodes() {
            node.id.hash(&mut hasher);
            node.position.x.to_bits().hash(&mut hasher);
            node.position.y.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }
}

fn push_spawner_events(report: &SpawnerReport, events: &mut Vec<SimEvent>) {
    events.extend(
        report
            .purged
            .iter()
            .map(|&ore| SimEvent::StaleOrePurged { ore }),
    );
    if let Some(ore) = report.spawned {
        events.push(SimEvent::OreSpawned { ore });
    }
    if report.spawn_failed {
        events.push(SimEvent::SpawnFailed);
    }
}

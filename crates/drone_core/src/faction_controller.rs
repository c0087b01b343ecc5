//! Per-faction rosters, tallies and runtime tuning.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::components::{DroneId, HomeBase};
use crate::config::{AvoidanceTuning, DroneTuning, SimConfig};
use crate::drone::{DeliverySink, Drone, DroneContext};
use crate::error::{Result, SimError};
use crate::events::SimEvent;
use crate::factions::{FactionId, PerFaction};
use crate::math::Vec2;
use crate::random::RandomSource;
use crate::resource_manager::ResourceManager;

/// Spawn intervals at or below this are rejected.
pub const MIN_SPAWN_INTERVAL: f32 = 0.1;

/// Delivered resources per faction. Only ever increases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionTallies(PerFaction<u64>);

impl FactionTallies {
    /// Tally for one faction.
    #[must_use]
    pub fn get(&self, faction: FactionId) -> u64 {
        self.0[faction]
    }

    /// Sum over both factions.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.0.blue + self.0.red
    }
}

impl DeliverySink for FactionTallies {
    fn deliver(&mut self, faction: FactionId, amount: u32) {
        self.0[faction] += u64::from(amount);
    }
}

/// Display-ready counters for one faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactionSummary {
    /// The faction.
    pub faction: FactionId,
    /// Delivered resources.
    pub resources: u64,
    /// Current roster size.
    pub drones: usize,
}

impl FactionSummary {
    /// "Blue Resources: N"
    #[must_use]
    pub fn resources_text(&self) -> String {
        format!("{} Resources: {}", self.faction, self.resources)
    }

    /// "Blue Drones: N"
    #[must_use]
    pub fn drones_text(&self) -> String {
        format!("{} Drones: {}", self.faction, self.drones)
    }
}

impl fmt::Display for FactionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.resources_text(), self.drones_text())
    }
}

/// Drones added and removed by one population change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationChange {
    /// Newly created drones.
    pub spawned: Vec<DroneId>,
    /// Destroyed drones, oldest first.
    pub despawned: Vec<DroneId>,
}

impl PopulationChange {
    /// Whether the roster was left untouched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.despawned.is_empty()
    }

    /// Events describing the change.
    pub fn events(&self, faction: FactionId) -> impl Iterator<Item = SimEvent> + '_ {
        let spawned = self
            .spawned
            .iter()
            .map(move |&drone| SimEvent::DroneSpawned { drone, faction });
        let despawned = self
            .despawned
            .iter()
            .map(move |&drone| SimEvent::DroneDespawned { drone, faction });
        despawned.chain(spawned)
    }
}

/// Owner of every drone, plus the tallies they deliver to.
#[derive(Debug, Clone)]
pub struct FactionController {
    rosters: PerFaction<Vec<Drone>>,
    tallies: FactionTallies,
    bases: PerFaction<HomeBase>,
    speed_multiplier: f32,
    drone_tuning: DroneTuning,
    avoidance: AvoidanceTuning,
    next_drone_id: u32,
}

impl FactionController {
    /// Create empty rosters and resolve each faction's base.
    ///
    /// A faction without a configured base gets a temporary one at the origin.
    #[must_use]
    pub fn new(config: &SimConfig) -> Self {
        let bases = PerFaction::from_fn(|faction| match config.factions[faction].base {
            Some(position) => HomeBase {
                faction,
                position,
                temporary: false,
            },
            None => {
                warn!(%faction, "Base not found, creating temporary base at origin");
                HomeBase {
                    faction,
                    position: Vec2::ZERO,
                    temporary: true,
                }
            }
        });

        Self {
            rosters: PerFaction::default(),
            tallies: FactionTallies::default(),
            bases,
            speed_multiplier: config.speed_multiplier,
            drone_tuning: config.drone,
            avoidance: config.avoidance,
            next_drone_id: 1,
        }
    }

    /// Resize a roster to exactly `target` drones.
    ///
    /// Growth spawns at the faction base; shrinking destroys the oldest drones
    /// first. Asking for the current size changes nothing.
    pub fn set_population(&mut self, faction: FactionId, target: usize) -> PopulationChange {
        let mut change = PopulationChange::default();
        let home = self.bases[faction].position;
        let roster = &mut self.rosters[faction];

        if target > roster.len() {
            for _ in roster.len()..target {
                let id = DroneId(self.next_drone_id);
                self.next_drone_id += 1;
                roster.push(Drone::new(
                    id,
                    faction,
                    home,
                    home,
                    self.drone_tuning,
                    self.avoidance,
                    self.speed_multiplier,
                ));
                change.spawned.push(id);
            }
        } else if target < roster.len() {
            let excess = roster.len() - target;
            change.despawned = roster.drain(..excess).map(|d| d.id()).collect();
        }

        if !change.is_empty() {
            info!(
                %faction,
                population = target,
                spawned = change.spawned.len(),
                despawned = change.despawned.len(),
                "Population changed"
            );
        }
        change
    }

    /// Rescale every drone's speed from its base value.
    ///
    /// Rejects non-finite and non-positive multipliers, leaving the current
    /// one in place.
    pub fn set_speed_multiplier(&mut self, multiplier: f32) -> Result<()> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(SimError::invalid(
                "speed_multiplier",
                format!("must be positive and finite, got {multiplier}"),
            ));
        }

        self.speed_multiplier = multiplier;
        for roster in [&mut self.rosters.blue, &mut self.rosters.red] {
            for drone in roster.iter_mut() {
                drone.set_speed_multiplier(multiplier);
            }
        }
        debug!(multiplier, "Drone speed updated");
        Ok(())
    }

    /// Current global speed multiplier.
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }

    /// Apply a spawn interval typed by the operator.
    ///
    /// Only text that parses to a finite number above [`MIN_SPAWN_INTERVAL`]
    /// is applied. Anything else is ignored and `false` is returned.
    pub fn set_spawn_interval(&self, text: &str, ores: &mut ResourceManager) -> bool {
        match text.trim().parse::<f32>() {
            Ok(interval) if interval.is_finite() && interval > MIN_SPAWN_INTERVAL => {
                ores.set_spawn_interval(interval);
                debug!(interval, "Spawn interval updated");
                true
            }
            _ => {
                debug!(input = text, "Ignoring invalid spawn interval");
                false
            }
        }
    }

    /// Credit delivered resources.
    pub fn deliver(&mut self, faction: FactionId, amount: u32) {
        self.tallies.deliver(faction, amount);
    }

    /// Delivered resources for one faction.
    #[must_use]
    pub fn tally(&self, faction: FactionId) -> u64 {
        self.tallies.get(faction)
    }

    /// Both tallies.
    #[must_use]
    pub const fn tallies(&self) -> &FactionTallies {
        &self.tallies
    }

    /// Faction base.
    #[must_use]
    pub fn base(&self, faction: FactionId) -> &HomeBase {
        &self.bases[faction]
    }

    /// Drones of one faction, oldest first.
    #[must_use]
    pub fn roster(&self, faction: FactionId) -> &[Drone] {
        &self.rosters[faction]
    }

    /// Roster size.
    #[must_use]
    pub fn population(&self, faction: FactionId) -> usize {
        self.rosters[faction].len()
    }

    /// Every drone, Blue roster first.
    pub fn drones(&self) -> impl Iterator<Item = &Drone> {
        self.rosters.blue.iter().chain(self.rosters.red.iter())
    }

    /// Every drone mutably, in the same order as [`drones`](Self::drones).
    pub fn drones_mut(&mut self) -> impl Iterator<Item = &mut Drone> {
        self.rosters.blue.iter_mut().chain(self.rosters.red.iter_mut())
    }

    /// Look up a drone by id.
    #[must_use]
    pub fn drone(&self, id: DroneId) -> Option<&Drone> {
        self.drones().find(|d| d.id() == id)
    }

    /// Look up a drone by id, mutably.
    pub fn drone_mut(&mut self, id: DroneId) -> Option<&mut Drone> {
        self.drones_mut().find(|d| d.id() == id)
    }

    /// Counters for one faction.
    #[must_use]
    pub fn summary(&self, faction: FactionId) -> FactionSummary {
        FactionSummary {
            faction,
            resources: self.tally(faction),
            drones: self.population(faction),
        }
    }

    /// Counters for both factions.
    #[must_use]
    pub fn summaries(&self) -> PerFaction<FactionSummary> {
        PerFaction::from_fn(|faction| self.summary(faction))
    }

    /// Run every drone's logic tick, Blue roster first.
    pub fn run_logic(
        &mut self,
        ores: &mut ResourceManager,
        rng: &mut dyn RandomSource,
        events: &mut Vec<SimEvent>,
        now: f64,
        dt: f32,
    ) {
        let Self {
            rosters, tallies, ..
        } = self;

        for faction in FactionId::ALL {
            for drone in &mut rosters[faction] {
                let mut ctx = DroneContext {
                    ores: &mut *ores,
                    deliveries: &mut *tallies,
                    rng: &mut *rng,
                    events: &mut *events,
                    now,
                    dt,
                };
                drone.update(&mut ctx);
            }
        }

        #[cfg(any(debug_assertions, feature = "debug-validation"))]
        for drone in self.drones() {
            assert!(
                drone.invariants_hold(),
                "{} holds a claim while carrying",
                drone.id()
            );
        }
    }
}

//! # Drone Core
//!
//! Simulation core for the ore harvesting drones.
//!
//! Two factions of autonomous drones compete for ore that spawns at random in
//! a shared field. Each drone picks a node, flies to it while steering around
//! its neighbors, mines it, and carries the cargo back to its faction's base.
//!
//! This crate contains **only** the simulation:
//! - No rendering
//! - No IO beyond loading a config file
//! - No unseeded randomness
//!
//! ## Crate Structure
//!
//! - [`simulation`] - Context object and frame loop
//! - [`drone`] - Drone state machine and steering
//! - [`resource_manager`] - Ore spawning, collection and stale sweeps
//! - [`faction_controller`] - Rosters, tallies and runtime controls
//! - [`spatial`] - Neighbor and obstacle queries
//! - [`config`] - Tunables, loadable from RON

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod config;
pub mod drone;
pub mod error;
pub mod events;
pub mod faction_controller;
pub mod factions;
pub mod math;
pub mod ore;
pub mod random;
pub mod resource_manager;
pub mod simulation;
pub mod snapshot;
pub mod spatial;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::{DroneId, HomeBase, Obstacle, OreId};
    pub use crate::config::{
        AvoidanceTuning, ControlLimits, DroneTuning, FactionSetup, SimConfig, SpawnerConfig,
    };
    pub use crate::drone::{DeliverySink, Drone, DroneContext, DroneState, MotionPlan};
    pub use crate::error::{Result, SimError};
    pub use crate::events::{SimEvent, TickEvents};
    pub use crate::faction_controller::{
        FactionController, FactionSummary, FactionTallies, PopulationChange,
    };
    pub use crate::factions::{FactionId, PerFaction};
    pub use crate::math::Vec2;
    pub use crate::random::{RandomSource, SimRng};
    pub use crate::resource_manager::{ResourceManager, SpawnerReport};
    pub use crate::simulation::{Clock, Simulation};
    pub use crate::snapshot::SimSnapshot;
    pub use crate::spatial::{Neighbor, SpatialIndex, SpatialQuery};
}

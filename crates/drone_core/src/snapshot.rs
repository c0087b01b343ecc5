//! Serializable views of the simulation for display surfaces.

use serde::{Deserialize, Serialize};

use crate::components::{DroneId, OreId};
use crate::drone::{Drone, DroneState};
use crate::factions::FactionId;
use crate::math::Vec2;
use crate::ore::ResourceNode;

/// One drone as seen from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroneSnapshot {
    /// Drone id.
    pub id: DroneId,
    /// Position.
    pub position: Vec2,
    /// Velocity.
    pub velocity: Vec2,
    /// Facing in radians.
    pub facing: f32,
    /// State machine state.
    pub state: DroneState,
    /// Claimed node, if any.
    pub target: Option<OreId>,
    /// Whether the drone holds cargo.
    pub carrying: bool,
}

impl From<&Drone> for DroneSnapshot {
    fn from(drone: &Drone) -> Self {
        Self {
            id: drone.id(),
            position: drone.position(),
            velocity: drone.velocity(),
            facing: drone.facing(),
            state: drone.state(),
            target: drone.target(),
            carrying: drone.is_carrying(),
        }
    }
}

/// One faction's base, tally and roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactionSnapshot {
    /// The faction.
    pub faction: FactionId,
    /// Base position.
    pub base: Vec2,
    /// Whether the base is a temporary stand-in.
    pub temporary_base: bool,
    /// Delivered resources.
    pub resources: u64,
    /// Drones, oldest first.
    pub drones: Vec<DroneSnapshot>,
}

/// An active node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OreSnapshot {
    /// Node id.
    pub id: OreId,
    /// Position.
    pub position: Vec2,
}

impl From<&ResourceNode> for OreSnapshot {
    fn from(node: &ResourceNode) -> Self {
        Self {
            id: node.id,
            position: node.position,
        }
    }
}

/// Complete observable state at a frame boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSnapshot {
    /// Frames stepped so far.
    pub frame: u64,
    /// Simulated seconds.
    pub elapsed: f64,
    /// Global speed multiplier.
    pub speed_multiplier: f32,
    /// Ore spawn interval in seconds.
    pub spawn_interval: f32,
    /// Per-faction state, Blue first.
    pub factions: Vec<FactionSnapshot>,
    /// Active nodes in insertion order.
    pub ores: Vec<OreSnapshot>,
}

impl SimSnapshot {
    /// Look up a faction's entry.
    #[must_use]
    pub fn faction(&self, faction: FactionId) -> Option<&FactionSnapshot> {
        self.factions.iter().find(|f| f.faction == faction)
    }

    /// Total drones across factions.
    #[must_use]
    pub fn drone_count(&self) -> usize {
        self.factions.iter().map(|f| f.drones.len()).sum()
    }
}

//! Identifiers and small plain-data components shared across modules.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::factions::FactionId;
use crate::math::Vec2;

/// Stable handle to a resource node.
///
/// Ids are allocated monotonically by the resource manager and never reused,
/// so a handle that no longer resolves always means the node is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OreId(pub u64);

impl fmt::Display for OreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ore_{:04}", self.0)
    }
}

/// Stable handle to a drone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DroneId(pub u32);

impl fmt::Display for DroneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Drone_{}", self.0)
    }
}

/// A faction's delivery point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HomeBase {
    /// Owning faction.
    pub faction: FactionId,
    /// World position.
    pub position: Vec2,
    /// True when the base was not configured and was placed at the origin.
    pub temporary: bool,
}

/// A static circular collision obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Circle center.
    pub center: Vec2,
    /// Circle radius.
    pub radius: f32,
}

impl Obstacle {
    /// Whether a circle at `position` with `radius` intersects this obstacle.
    #[must_use]
    pub fn overlaps(&self, position: Vec2, radius: f32) -> bool {
        let reach = self.radius + radius;
        self.center.distance_squared(position) < reach * reach
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obstacle_overlap() {
        let rock = Obstacle {
            center: Vec2::new(5.0, 5.0),
            radius: 1.0,
        };
        assert!(rock.overlaps(Vec2::new(5.0, 6.4), 0.5));
        assert!(!rock.overlaps(Vec2::new(5.0, 6.6), 0.5));
    }

    #[test]
    fn test_id_display() {
        assert_eq!(OreId(7).to_string(), "Ore_0007");
        assert_eq!(DroneId(3).to_string(), "Drone_3");
    }
}

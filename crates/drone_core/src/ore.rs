//! Harvestable resource nodes.

use serde::{Deserialize, Serialize};

use crate::components::OreId;
use crate::math::Vec2;

/// A resource node that drones mine and carry home.
///
/// Nodes are one-shot: a single completed mining cycle collects the whole node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceNode {
    /// Stable identifier.
    pub id: OreId,
    /// Position in world space.
    pub position: Vec2,
    collected: bool,
}

impl ResourceNode {
    /// Create a fresh, uncollected node.
    #[must_use]
    pub const fn new(id: OreId, position: Vec2) -> Self {
        Self {
            id,
            position,
            collected: false,
        }
    }

    /// Whether the node has already been collected.
    #[must_use]
    pub const fn is_collected(&self) -> bool {
        self.collected
    }

    /// Flip the node to collected.
    ///
    /// Returns `false` if it was already collected, so a second caller can
    /// tell it lost the race.
    pub fn mark_collected(&mut self) -> bool {
        if self.collected {
            return false;
        }
        self.collected = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_collected_once() {
        let mut node = ResourceNode::new(OreId(1), Vec2::new(2.0, 3.0));
        assert!(!node.is_collected());
        assert!(node.mark_collected());
        assert!(node.is_collected());
        assert!(!node.mark_collected());
        assert!(node.is_collected());
    }
}

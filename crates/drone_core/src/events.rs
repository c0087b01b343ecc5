//! Events emitted while stepping the simulation.
//!
//! Events are fire-and-forget notifications for whatever sits outside the
//! core: a renderer toggling mining particles, a log, a UI refreshing tallies.
//! Nothing in the simulation reads them back.

use serde::{Deserialize, Serialize};

use crate::components::{DroneId, OreId};
use crate::factions::FactionId;

/// One observable thing that happened during a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SimEvent {
    /// A resource node appeared.
    OreSpawned {
        /// The new node.
        ore: OreId,
    },
    /// A spawn was due but every placement attempt was rejected.
    SpawnFailed,
    /// A dangling or lingering node entry was swept.
    StaleOrePurged {
        /// The swept node.
        ore: OreId,
    },
    /// A drone finished mining and removed the node from the field.
    OreCollected {
        /// The mining drone.
        drone: DroneId,
        /// The collected node.
        ore: OreId,
    },
    /// Mining particles should start or stop for a drone.
    MiningEffect {
        /// The drone.
        drone: DroneId,
        /// Whether the effect is now visible.
        visible: bool,
    },
    /// A drone picked a new target.
    TargetAcquired {
        /// The drone.
        drone: DroneId,
        /// The chosen node.
        ore: OreId,
    },
    /// A drone found nothing to mine and is regrouping at its base.
    NoTargets {
        /// The drone.
        drone: DroneId,
    },
    /// A drone handed cargo to its faction.
    Delivered {
        /// The delivering drone.
        drone: DroneId,
        /// Receiving faction.
        faction: FactionId,
        /// True when the carry watchdog forced the delivery.
        forced: bool,
    },
    /// A drone joined a roster.
    DroneSpawned {
        /// The new drone.
        drone: DroneId,
        /// Its faction.
        faction: FactionId,
    },
    /// A drone left a roster.
    DroneDespawned {
        /// The removed drone.
        drone: DroneId,
        /// Its former faction.
        faction: FactionId,
    },
    /// Two drones started touching.
    Contact {
        /// Lower id of the pair.
        a: DroneId,
        /// Higher id of the pair.
        b: DroneId,
    },
}

/// Everything emitted by one [`Simulation::step`](crate::simulation::Simulation::step).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Events in emission order.
    pub events: Vec<SimEvent>,
    /// Physics sub-steps run this frame.
    pub substeps: u32,
}

impl TickEvents {
    /// Number of deliveries in this step.
    #[must_use]
    pub fn deliveries(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SimEvent::Delivered { .. }))
            .count()
    }

    /// Nodes collected in this step.
    pub fn collected(&self) -> impl Iterator<Item = OreId> + '_ {
        self.events.iter().filter_map(|e| match e {
            SimEvent::OreCollected { ore, .. } => Some(*ore),
            _ => None,
        })
    }

    /// Whether nothing was emitted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_event_counters() {
        let tick = TickEvents {
            events: vec![
                SimEvent::OreCollected {
                    drone: DroneId(1),
                    ore: OreId(4),
                },
                SimEvent::Delivered {
                    drone: DroneId(2),
                    faction: FactionId::Red,
                    forced: false,
                },
                SimEvent::SpawnFailed,
            ],
            substeps: 1,
        };
        assert_eq!(tick.deliveries(), 1);
        assert_eq!(tick.collected().collect::<Vec<_>>(), vec![OreId(4)]);
        assert!(!tick.is_empty());
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let text = ron::to_string(&SimEvent::MiningEffect {
            drone: DroneId(3),
            visible: true,
        })
        .unwrap();
        assert!(text.contains("mining_effect"));
    }
}

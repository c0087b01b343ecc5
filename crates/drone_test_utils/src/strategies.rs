//! Proptest strategies for simulation inputs.

use proptest::prelude::*;

use drone_core::components::DroneId;
use drone_core::factions::FactionId;
use drone_core::math::Vec2;
use drone_core::spatial::Neighbor;

/// A point inside a square of half-size `extent` around the origin.
pub fn arb_position(extent: f32) -> impl Strategy<Value = Vec2> {
    (-extent..=extent, -extent..=extent).prop_map(|(x, y)| Vec2::new(x, y))
}

/// Up to `max` stationary drone bodies with distinct ids.
pub fn arb_neighbors(max: usize, extent: f32) -> impl Strategy<Value = Vec<Neighbor>> {
    prop::collection::vec(arb_position(extent), 0..=max).prop_map(|positions| {
        positions
            .into_iter()
            .enumerate()
            .map(|(i, position)| Neighbor {
                owner: DroneId(i as u32 + 1),
                position,
                velocity: Vec2::ZERO,
            })
            .collect()
    })
}

/// Either faction.
pub fn arb_faction() -> impl Strategy<Value = FactionId> {
    prop_oneof![Just(FactionId::Blue), Just(FactionId::Red)]
}

/// One mutation applied to a resource manager.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ManagerOp {
    /// Advance the spawner by this many seconds.
    Update(f32),
    /// Spawn directly.
    Spawn,
    /// Collect the active node at this index (modulo the active count).
    Collect(usize),
    /// Collect the same node twice in a row.
    CollectTwice(usize),
    /// Destroy a node behind the manager's back.
    DespawnUntracked(usize),
    /// Run the startup prewarm again.
    Prewarm,
}

/// A random resource manager operation.
pub fn arb_manager_op() -> impl Strategy<Value = ManagerOp> {
    prop_oneof![
        4 => (0.0f32..5.0).prop_map(ManagerOp::Update),
        2 => Just(ManagerOp::Spawn),
        2 => any::<usize>().prop_map(ManagerOp::Collect),
        1 => any::<usize>().prop_map(ManagerOp::CollectTwice),
        1 => any::<usize>().prop_map(ManagerOp::DespawnUntracked),
        1 => Just(ManagerOp::Prewarm),
    ]
}

/// One operator input applied to a running simulation.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlOp {
    /// Resize a roster.
    SetPopulation(FactionId, usize),
    /// Change the speed multiplier, including invalid values.
    SetSpeed(f32),
    /// Type into the spawn interval field.
    SetSpawnInterval(String),
    /// Step one frame.
    Step(f32),
}

/// A random operator input.
pub fn arb_control_op() -> impl Strategy<Value = ControlOp> {
    prop_oneof![
        1 => (arb_faction(), 0usize..12).prop_map(|(f, n)| ControlOp::SetPopulation(f, n)),
        1 => prop_oneof![Just(-1.0f32), Just(0.0f32), 0.5f32..3.0].prop_map(ControlOp::SetSpeed),
        1 => prop_oneof![
            Just("abc".to_string()),
            Just("0.05".to_string()),
            (0.2f32..10.0).prop_map(|v| format!("{v}")),
        ]
        .prop_map(ControlOp::SetSpawnInterval),
        6 => (0.005f32..0.2).prop_map(ControlOp::Step),
    ]
}

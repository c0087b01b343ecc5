//! Harvester drones.
//!
//! A drone runs two independent updates per frame:
//!
//! - [`Drone::update`], the logic tick: target search, mining, delivery and the
//!   carry watchdog. It mutates shared state only through a [`DroneContext`].
//! - [`Drone::plan_motion`] followed by [`Drone::apply_motion`], the physics
//!   sub-step. Planning is read-only over a neighbor snapshot, integration
//!   touches only the drone itself.
//!
//! Claims on ore are not exclusive. Several drones may chase the same node;
//! the first to finish mining collects it and the rest find it gone.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::components::{DroneId, OreId};
use crate::config::{AvoidanceTuning, DroneTuning};
use crate::events::SimEvent;
use crate::factions::FactionId;
use crate::math::{
    clamp_magnitude, direction_and_distance, heading_angle, rotate_towards, tie_break_axis, Vec2,
};
use crate::random::RandomSource;
use crate::resource_manager::ResourceManager;
use crate::spatial::Neighbor;

/// Below this speed a drone keeps its current facing.
const MIN_TURNING_SPEED: f32 = 0.1;

/// What a drone is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DroneState {
    /// Heading to a claimed node, or waiting for one.
    #[default]
    MovingToTarget,
    /// Stationary, mining the claimed node.
    Mining,
    /// Carrying cargo home, or regrouping at base when the field is empty.
    ReturningToBase,
}

/// Receiver of completed deliveries.
pub trait DeliverySink {
    /// Credit `amount` units to `faction`.
    fn deliver(&mut self, faction: FactionId, amount: u32);
}

/// Shared state a drone may touch during one logic tick.
pub struct DroneContext<'a> {
    /// The ore field.
    pub ores: &'a mut ResourceManager,
    /// Where deliveries are credited.
    pub deliveries: &'a mut dyn DeliverySink,
    /// Target selection randomness.
    pub rng: &'a mut dyn RandomSource,
    /// Event output.
    pub events: &'a mut Vec<SimEvent>,
    /// Simulation time at the end of this frame, in seconds.
    pub now: f64,
    /// Frame length in seconds.
    pub dt: f32,
}

/// Result of the read-only steering pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionPlan {
    /// Velocity is forced to zero.
    Halt,
    /// No thrust; the drone coasts under damping.
    Drift,
    /// Thrust along a unit heading.
    Steer(Vec2),
}

/// A single harvester.
#[derive(Debug, Clone, PartialEq)]
pub struct Drone {
    id: DroneId,
    faction: FactionId,
    home: Vec2,
    position: Vec2,
    velocity: Vec2,
    facing: f32,
    state: DroneState,
    target: Option<OreId>,
    carrying: bool,
    mining_timer: f32,
    carry_elapsed: f32,
    last_search: Option<f64>,
    base_move_speed: f32,
    move_speed: f32,
    mining_effect: bool,
    tuning: DroneTuning,
    avoidance: AvoidanceTuning,
}

impl Drone {
    /// Create an idle drone at `position`.
    ///
    /// The drone searches for a target on its first logic tick.
    #[must_use]
    pub fn new(
        id: DroneId,
        faction: FactionId,
        home: Vec2,
        position: Vec2,
        tuning: DroneTuning,
        avoidance: AvoidanceTuning,
        speed_multiplier: f32,
    ) -> Self {
        Self {
            id,
            faction,
            home,
            position,
            velocity: Vec2::ZERO,
            facing: 0.0,
            state: DroneState::MovingToTarget,
            target: None,
            carrying: false,
            mining_timer: 0.0,
            carry_elapsed: 0.0,
            last_search: None,
            base_move_speed: tuning.move_speed,
            move_speed: tuning.move_speed * speed_multiplier,
            mining_effect: false,
            tuning,
            avoidance,
        }
    }

    /// Stable id.
    #[must_use]
    pub const fn id(&self) -> DroneId {
        self.id
    }

    /// Owning faction.
    #[must_use]
    pub const fn faction(&self) -> FactionId {
        self.faction
    }

    /// Home base position.
    #[must_use]
    pub const fn home(&self) -> Vec2 {
        self.home
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Current velocity.
    #[must_use]
    pub const fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Facing angle in radians.
    #[must_use]
    pub const fn facing(&self) -> f32 {
        self.facing
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> DroneState {
        self.state
    }

    /// Claimed node, which may no longer exist.
    #[must_use]
    pub const fn target(&self) -> Option<OreId> {
        self.target
    }

    /// Whether the drone holds cargo.
    #[must_use]
    pub const fn is_carrying(&self) -> bool {
        self.carrying
    }

    /// Seconds spent on the current mining cycle.
    #[must_use]
    pub const fn mining_timer(&self) -> f32 {
        self.mining_timer
    }

    /// Seconds the current cargo has been carried.
    #[must_use]
    pub const fn carry_elapsed(&self) -> f32 {
        self.carry_elapsed
    }

    /// Move speed before the global multiplier.
    #[must_use]
    pub const fn base_move_speed(&self) -> f32 {
        self.base_move_speed
    }

    /// Effective move speed.
    #[must_use]
    pub const fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Whether mining particles are showing.
    #[must_use]
    pub const fn mining_effect_visible(&self) -> bool {
        self.mining_effect
    }

    /// Neighbor record for spatial snapshots.
    #[must_use]
    pub const fn as_neighbor(&self) -> Neighbor {
        Neighbor {
            owner: self.id,
            position: self.position,
            velocity: self.velocity,
        }
    }

    /// Rescale speed from the stored base. Never compounds.
    pub fn set_speed_multiplier(&mut self, multiplier: f32) {
        self.move_speed = self.base_move_speed * multiplier;
    }

    /// Move the drone without changing its state. Velocity is cleared.
    pub fn place_at(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
    }

    /// A drone never holds a claim while carrying.
    #[must_use]
    pub const fn invariants_hold(&self) -> bool {
        !(self.carrying && self.target.is_some())
    }

    /// Run one logic tick.
    pub fn update(&mut self, ctx: &mut DroneContext<'_>) {
        // Periodic re-search
        let search_due = self
            .last_search
            .map_or(true, |last| ctx.now - last > f64::from(self.tuning.search_cooldown));
        if search_due {
            let idle = !self.has_valid_target(ctx.ores)
                && !self.carrying
                && self.state != DroneState::Mining;
            if idle {
                self.find_new_target(ctx);
            }
            self.last_search = Some(ctx.now);
        }

        self.advance_mining(ctx);

        if self.state == DroneState::MovingToTarget {
            self.check_ore_proximity(ctx);
        }

        if self.state == DroneState::ReturningToBase {
            self.check_base_arrival(ctx);
        }

        // Carry watchdog
        if self.carrying {
            self.carry_elapsed += ctx.dt;
            if self.carry_elapsed > self.tuning.carry_timeout {
                warn!(
                    drone = %self.id,
                    carried = self.carry_elapsed,
                    "Forced ore delivery due to timeout"
                );
                self.deliver(ctx, true);
            }
        } else {
            self.carry_elapsed = 0.0;
        }
    }

    fn has_valid_target(&self, ores: &ResourceManager) -> bool {
        self.target.is_some_and(|id| ores.is_active(id))
    }

    fn find_new_target(&mut self, ctx: &mut DroneContext<'_>) {
        if self.carrying || self.state == DroneState::Mining {
            return;
        }

        let candidates = ctx.ores.active_snapshot();
        if candidates.is_empty() {
            self.target = None;
            if self.state != DroneState::ReturningToBase {
                debug!(drone = %self.id, "No ore available, regrouping at base");
                ctx.events.push(SimEvent::NoTargets { drone: self.id });
            }
            self.state = DroneState::ReturningToBase;
            return;
        }

        let ore = candidates[ctx.rng.pick_index(candidates.len())];
        self.target = Some(ore);
        self.state = DroneState::MovingToTarget;
        debug!(drone = %self.id, ore = %ore, "New target");
        ctx.events.push(SimEvent::TargetAcquired { drone: self.id, ore });
    }

    fn check_ore_proximity(&mut self, ctx: &mut DroneContext<'_>) {
        let Some(ore) = self.target else {
            return;
        };
        let Some(ore_position) = ctx.ores.position(ore) else {
            return;
        };

        if self.position.distance(ore_position) <= self.tuning.collection_radius {
            self.state = DroneState::Mining;
            self.mining_timer = 0.0;
            self.halt();
            self.mining_effect = true;
            debug!(drone = %self.id, ore = %ore, "Started mining");
            ctx.events.push(SimEvent::MiningEffect {
                drone: self.id,
                visible: true,
            });
        }
    }

    fn advance_mining(&mut self, ctx: &mut DroneContext<'_>) {
        if self.state != DroneState::Mining {
            return;
        }

        self.mining_timer += ctx.dt;
        if self.mining_timer >= self.tuning.mining_duration {
            self.complete_mining(ctx);
        }
    }

    fn complete_mining(&mut self, ctx: &mut DroneContext<'_>) {
        // Clear the claim before collecting so the drone never holds a handle
        // to a node it already removed.
        if let Some(ore) = self.target.take() {
            if ctx.ores.is_active(ore) && ctx.ores.collect(Some(ore)).is_some() {
                self.carrying = true;
                self.carry_elapsed = 0.0;
                ctx.events.push(SimEvent::OreCollected { drone: self.id, ore });
                debug!(drone = %self.id, ore = %ore, "Mining complete, returning to base");
            } else {
                debug!(drone = %self.id, ore = %ore, "Ore vanished while mining");
            }
        }

        self.mining_effect = false;
        ctx.events.push(SimEvent::MiningEffect {
            drone: self.id,
            visible: false,
        });
        self.state = DroneState::ReturningToBase;
    }

    fn check_base_arrival(&mut self, ctx: &mut DroneContext<'_>) {
        if self.carrying && self.position.distance(self.home) <= self.tuning.delivery_radius {
            self.deliver(ctx, false);
        }
    }

    fn deliver(&mut self, ctx: &mut DroneContext<'_>, forced: bool) {
        if !self.carrying {
            return;
        }

        ctx.deliveries.deliver(self.faction, 1);
        ctx.events.push(SimEvent::Delivered {
            drone: self.id,
            faction: self.faction,
            forced,
        });
        debug!(drone = %self.id, faction = %self.faction, forced, "Delivered ore");

        self.carrying = false;
        self.carry_elapsed = 0.0;
        self.state = DroneState::MovingToTarget;
        self.find_new_target(ctx);
    }

    /// Point the drone is currently steering toward.
    fn steering_goal(&self, ores: &ResourceManager) -> Vec2 {
        if self.carrying || self.state == DroneState::ReturningToBase {
            return self.home;
        }
        self.target
            .and_then(|id| ores.position(id))
            .unwrap_or(self.home)
    }

    /// Compute this sub-step's motion from a neighbor snapshot.
    ///
    /// `neighbors` must not contain the drone itself.
    #[must_use]
    pub fn plan_motion(&self, neighbors: &[Neighbor], ores: &ResourceManager) -> MotionPlan {
        if self.state == DroneState::Mining {
            return MotionPlan::Halt;
        }

        let goal = self.steering_goal(ores);
        let to_goal = goal - self.position;
        let regrouping = !self.carrying && goal == self.home;
        let desired = if regrouping && to_goal.length() <= self.tuning.stopping_distance {
            Vec2::ZERO
        } else {
            to_goal.normalize_or_zero()
        };

        let avoidance = compute_avoidance(self.id, self.position, neighbors, &self.avoidance);
        let heading = (desired + avoidance).normalize_or_zero();
        if heading == Vec2::ZERO {
            MotionPlan::Drift
        } else {
            MotionPlan::Steer(heading)
        }
    }

    /// Integrate one physics sub-step.
    pub fn apply_motion(&mut self, plan: MotionPlan, dt: f32) {
        let heading = match plan {
            MotionPlan::Halt => {
                self.halt();
                return;
            }
            MotionPlan::Drift => None,
            MotionPlan::Steer(heading) => Some(heading),
        };

        if let Some(heading) = heading {
            self.velocity += heading * self.move_speed * self.tuning.thrust * dt;
        }
        self.velocity /= 1.0 + self.tuning.linear_damping * dt;
        self.velocity = clamp_magnitude(self.velocity, self.tuning.max_speed);
        self.position += self.velocity * dt;

        if let Some(heading) = heading {
            if self.velocity.length() > MIN_TURNING_SPEED {
                self.facing = rotate_towards(
                    self.facing,
                    heading_angle(heading),
                    self.tuning.rotation_speed.to_radians() * dt,
                );
            }
        }
    }

    /// Zero the velocity.
    pub fn halt(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    /// Contact callback: push away from a drone that just started touching.
    pub fn on_contact(&mut self, other_position: Vec2, other: DroneId) {
        if self.state == DroneState::Mining {
            return;
        }
        let (away, _) = direction_and_distance(
            self.position - other_position,
            tie_break_axis(self.id, other),
        );
        self.velocity += away * self.tuning.contact_impulse;
    }
}

/// Summed push away from nearby drones.
///
/// Inside `min_separation` the stronger separation term applies, otherwise the
/// soft avoidance term. Coincident drones separate along an id-ordered axis so
/// each member of the pair is pushed the opposite way. The result never
/// exceeds [`AvoidanceTuning::max_magnitude`].
#[must_use]
pub fn compute_avoidance(
    own: DroneId,
    position: Vec2,
    neighbors: &[Neighbor],
    tuning: &AvoidanceTuning,
) -> Vec2 {
    let mut avoidance = Vec2::ZERO;

    for neighbor in neighbors {
        if neighbor.owner == own {
            continue;
        }
        let (away, distance) = direction_and_distance(
            position - neighbor.position,
            tie_break_axis(own, neighbor.owner),
        );
        if distance >= tuning.radius {
            continue;
        }

        if distance < tuning.min_separation {
            let factor = 1.0 - distance / tuning.min_separation;
            avoidance += away * tuning.separation_force * factor;
        } else {
            let factor = 1.0 - distance / tuning.radius;
            avoidance += away * tuning.force * factor;
        }
    }

    clamp_magnitude(avoidance, tuning.max_magnitude())
}

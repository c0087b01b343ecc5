//! Simulation configuration.
//!
//! Every tunable lives here with a documented default. Configurations can be
//! built in code, or loaded from RON where any omitted field keeps its default:
//!
//! ```
//! use drone_core::config::SimConfig;
//!
//! let config = SimConfig::from_ron_str("(spawner: (max_active: 4))").unwrap();
//! assert_eq!(config.spawner.max_active, 4);
//! assert_eq!(config.drone.mining_duration, 2.0);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::components::Obstacle;
use crate::error::{Result, SimError};
use crate::faction_controller::MIN_SPAWN_INTERVAL;
use crate::factions::PerFaction;
use crate::math::Vec2;

/// Movement, mining and delivery tuning shared by every drone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneTuning {
    /// Base cruising speed before the global multiplier.
    pub move_speed: f32,
    /// Hard velocity cap applied after integration.
    pub max_speed: f32,
    /// Facing turn rate in degrees per second.
    pub rotation_speed: f32,
    /// Distance at which a drone regrouping at base stops pushing forward.
    pub stopping_distance: f32,
    /// Acceleration per unit of move speed.
    pub thrust: f32,
    /// Linear velocity damping per second.
    pub linear_damping: f32,
    /// Seconds spent mining one node.
    pub mining_duration: f32,
    /// Distance to a node at which mining starts.
    pub collection_radius: f32,
    /// Distance to the home base at which cargo is delivered.
    pub delivery_radius: f32,
    /// Minimum seconds between target searches.
    pub search_cooldown: f32,
    /// Seconds a drone may carry ore before delivery is forced.
    pub carry_timeout: f32,
    /// Collision body radius used for contact detection.
    pub body_radius: f32,
    /// Velocity change applied to each body when two drones touch.
    pub contact_impulse: f32,
}

impl Default for DroneTuning {
    fn default() -> Self {
        Self {
            move_speed: 5.0,
            max_speed: 7.0,
            rotation_speed: 300.0,
            stopping_distance: 0.5,
            thrust: 3.0,
            linear_damping: 2.0,
            mining_duration: 2.0,
            collection_radius: 0.3,
            delivery_radius: 0.5,
            search_cooldown: 0.5,
            carry_timeout: 15.0,
            body_radius: 0.25,
            contact_impulse: 4.0,
        }
    }
}

/// Local avoidance tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvoidanceTuning {
    /// Neighbors closer than this contribute to avoidance.
    pub radius: f32,
    /// Weight of the soft avoidance term.
    pub force: f32,
    /// Weight of the hard separation term.
    pub separation_force: f32,
    /// Below this distance the separation term is used instead.
    pub min_separation: f32,
    /// Summed avoidance is clamped to `force * clamp_factor`.
    pub clamp_factor: f32,
}

impl Default for AvoidanceTuning {
    fn default() -> Self {
        Self {
            radius: 2.0,
            force: 8.0,
            separation_force: 12.0,
            min_separation: 1.0,
            clamp_factor: 1.5,
        }
    }
}

impl AvoidanceTuning {
    /// Maximum magnitude of the summed avoidance vector.
    #[must_use]
    pub fn max_magnitude(&self) -> f32 {
        self.force * self.clamp_factor
    }
}

/// Ore spawner settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Center of the spawn rectangle.
    pub center: Vec2,
    /// Half width and half height of the spawn rectangle.
    pub half_extents: Vec2,
    /// Maximum number of simultaneously active nodes.
    pub max_active: usize,
    /// Seconds between spawn attempts.
    pub spawn_interval: f32,
    /// Minimum distance between a new node and any drone.
    pub min_drone_distance: f32,
    /// Clearance radius checked against static obstacles.
    pub obstacle_clearance: f32,
    /// Placement attempts per spawn before giving up.
    pub max_attempts: u32,
    /// Upper bound on nodes placed at startup.
    pub prewarm_cap: usize,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            center: Vec2::ZERO,
            half_extents: Vec2::new(25.0, 25.0),
            max_active: 10,
            spawn_interval: 3.0,
            min_drone_distance: 3.0,
            obstacle_clearance: 0.5,
            max_attempts: 20,
            prewarm_cap: 5,
        }
    }
}

/// Initial setup for one faction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactionSetup {
    /// Base position. `None` places a temporary base at the origin.
    pub base: Option<Vec2>,
    /// Drones spawned at startup.
    pub initial_drones: usize,
}

impl Default for FactionSetup {
    fn default() -> Self {
        Self {
            base: None,
            initial_drones: 5,
        }
    }
}

/// Ranges accepted by the operator controls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlLimits {
    /// Smallest selectable roster size.
    pub min_population: usize,
    /// Largest selectable roster size.
    pub max_population: usize,
    /// Smallest selectable speed multiplier.
    pub min_speed_multiplier: f32,
    /// Largest selectable speed multiplier.
    pub max_speed_multiplier: f32,
}

impl Default for ControlLimits {
    fn default() -> Self {
        Self {
            min_population: 1,
            max_population: 20,
            min_speed_multiplier: 0.5,
            max_speed_multiplier: 3.0,
        }
    }
}

/// Complete simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Per-drone movement and work tuning.
    pub drone: DroneTuning,
    /// Local avoidance tuning.
    pub avoidance: AvoidanceTuning,
    /// Ore spawner settings.
    pub spawner: SpawnerConfig,
    /// Per-faction setup.
    pub factions: PerFaction<FactionSetup>,
    /// Static collision obstacles.
    pub obstacles: Vec<Obstacle>,
    /// Physics sub-steps per simulated second.
    pub physics_hz: u32,
    /// Cap on physics sub-steps run for a single frame.
    pub max_substeps: u32,
    /// Initial global speed multiplier.
    pub speed_multiplier: f32,
    /// Operator control ranges.
    pub controls: ControlLimits,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            drone: DroneTuning::default(),
            avoidance: AvoidanceTuning::default(),
            spawner: SpawnerConfig::default(),
            factions: PerFaction::new(
                FactionSetup {
                    base: Some(Vec2::new(-18.0, 0.0)),
                    initial_drones: 5,
                },
                FactionSetup {
                    base: Some(Vec2::new(18.0, 0.0)),
                    initial_drones: 5,
                },
            ),
            obstacles: Vec::new(),
            physics_hz: 50,
            max_substeps: 8,
            speed_multiplier: 1.0,
            controls: ControlLimits::default(),
        }
    }
}

impl SimConfig {
    /// Parse a configuration from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    /// Load a configuration from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Fixed physics step length in seconds.
    #[must_use]
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.physics_hz as f32
    }

    /// Check that every field is usable.
    ///
    /// The simulation cannot run meaningfully with these values wrong, so
    /// they are rejected at construction instead of degrading at runtime.
    pub fn validate(&self) -> Result<()> {
        let d = &self.drone;
        positive("drone.move_speed", d.move_speed)?;
        positive("drone.max_speed", d.max_speed)?;
        positive("drone.rotation_speed", d.rotation_speed)?;
        non_negative("drone.stopping_distance", d.stopping_distance)?;
        positive("drone.thrust", d.thrust)?;
        non_negative("drone.linear_damping", d.linear_damping)?;
        non_negative("drone.mining_duration", d.mining_duration)?;
        positive("drone.collection_radius", d.collection_radius)?;
        positive("drone.delivery_radius", d.delivery_radius)?;
        non_negative("drone.search_cooldown", d.search_cooldown)?;
        positive("drone.carry_timeout", d.carry_timeout)?;
        positive("drone.body_radius", d.body_radius)?;
        non_negative("drone.contact_impulse", d.contact_impulse)?;

        let a = &self.avoidance;
        positive("avoidance.radius", a.radius)?;
        non_negative("avoidance.force", a.force)?;
        non_negative("avoidance.separation_force", a.separation_force)?;
        positive("avoidance.min_separation", a.min_separation)?;
        positive("avoidance.clamp_factor", a.clamp_factor)?;

        let s = &self.spawner;
        if !s.center.is_finite() {
            return Err(SimError::invalid("spawner.center", "must be finite"));
        }
        non_negative("spawner.half_extents.x", s.half_extents.x)?;
        non_negative("spawner.half_extents.y", s.half_extents.y)?;
        if s.spawn_interval <= MIN_SPAWN_INTERVAL || !s.spawn_interval.is_finite() {
            return Err(SimError::invalid(
                "spawner.spawn_interval",
                format!("must exceed {MIN_SPAWN_INTERVAL}, got {}", s.spawn_interval),
            ));
        }
        non_negative("spawner.min_drone_distance", s.min_drone_distance)?;
        non_negative("spawner.obstacle_clearance", s.obstacle_clearance)?;
        if s.max_attempts == 0 {
            return Err(SimError::invalid("spawner.max_attempts", "must be at least 1"));
        }

        for (faction, setup) in self.factions.iter() {
            if let Some(base) = setup.base {
                if !base.is_finite() {
                    return Err(SimError::invalid(
                        "factions.base",
                        format!("{faction} base must be finite"),
                    ));
                }
            }
        }

        for obstacle in &self.obstacles {
            if !obstacle.center.is_finite() {
                return Err(SimError::invalid("obstacles.center", "must be finite"));
            }
            non_negative("obstacles.radius", obstacle.radius)?;
        }

        if self.physics_hz == 0 {
            return Err(SimError::invalid("physics_hz", "must be at least 1"));
        }
        if self.max_substeps == 0 {
            return Err(SimError::invalid("max_substeps", "must be at least 1"));
        }
        positive("speed_multiplier", self.speed_multiplier)?;

        let c = &self.controls;
        if c.min_population > c.max_population {
            return Err(SimError::invalid(
                "controls.min_population",
                "must not exceed max_population",
            ));
        }
        positive("controls.min_speed_multiplier", c.min_speed_multiplier)?;
        positive("controls.max_speed_multiplier", c.max_speed_multiplier)?;
        if c.min_speed_multiplier > c.max_speed_multiplier {
            return Err(SimError::invalid(
                "controls.min_speed_multiplier",
                "must not exceed max_speed_multiplier",
            ));
        }

        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(field, format!("must be positive, got {value}")))
    }
}

fn non_negative(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(SimError::invalid(
            field,
            format!("must be non-negative, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factions::FactionId;

    #[test]
    fn test_default_config_is_valid() {
        let config = SimConfig::default();
        config.validate().unwrap();
        assert_eq!(config.spawner.max_attempts, 20);
        assert_eq!(config.drone.carry_timeout, 15.0);
        assert!((config.fixed_dt() - 0.02).abs() < 1e-6);
    }

    #[test]
    fn test_parse_partial_ron() {
        let ron = r#"
            SimConfig(
                drone: (mining_duration: 1.5),
                spawner: SpawnerConfig(max_active: 3, spawn_interval: 2.0),
                physics_hz: 30,
            )
        "#;
        let config = SimConfig::from_ron_str(ron).unwrap();
        assert_eq!(config.drone.mining_duration, 1.5);
        assert_eq!(config.drone.move_speed, 5.0);
        assert_eq!(config.spawner.max_active, 3);
        assert_eq!(config.physics_hz, 30);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_faction_setup() {
        let ron = r#"(
            factions: (
                blue: (base: Some((-10.0, 2.0)), initial_drones: 3),
                red: (base: None, initial_drones: 1),
            ),
        )"#;
        let config = SimConfig::from_ron_str(ron).unwrap();
        assert_eq!(
            config.factions[FactionId::Blue].base,
            Some(Vec2::new(-10.0, 2.0))
        );
        assert_eq!(config.factions[FactionId::Red].base, None);
        assert_eq!(config.factions[FactionId::Red].initial_drones, 1);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("drone_core_config_load.ron");
        std::fs::write(&path, "(physics_hz: 25, spawner: (max_active: 7))").unwrap();

        let config = SimConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.physics_hz, 25);
        assert_eq!(config.spawner.max_active, 7);
    }

    #[test]
    fn test_load_missing_file() {
        let err = SimConfig::load("/nonexistent/drone_config.ron").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn test_malformed_ron_is_reported() {
        let err = SimConfig::from_ron_str("(drone: (move_speed: \"fast\"))").unwrap_err();
        assert!(matches!(err, SimError::ConfigParse(_)));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = SimConfig::default();
        config.avoidance.min_separation = 0.0;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidConfig {
                field: "avoidance.min_separation",
                ..
            })
        ));

        let mut config = SimConfig::default();
        config.spawner.spawn_interval = 0.05;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.drone.max_speed = f32::NAN;
        assert!(config.validate().is_err());

        let mut config = SimConfig::default();
        config.physics_hz = 0;
        assert!(config.validate().is_err());
    }
}

//! Scenario loading and scripted runs.
//!
//! A scenario wraps a [`SimConfig`] with a seed, a run length and a timeline
//! of operator inputs applied at fixed simulated times. Scenarios are RON
//! files so the same run can be replayed from CI or a shell.

use std::path::Path;

use drone_core::config::SimConfig;
use drone_core::error::SimError;
use drone_core::factions::FactionId;
use drone_core::simulation::Simulation;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The scenario is well formed but unusable.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
    /// The embedded simulation config was rejected.
    #[error(transparent)]
    Sim(#[from] SimError),
}

/// One operator input in a scenario timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ControlAction {
    /// Move a faction's population slider.
    SetPopulation {
        /// Faction to resize.
        faction: FactionId,
        /// Requested roster size, clamped by the control panel.
        count: usize,
    },
    /// Move the speed slider.
    SetSpeed(f32),
    /// Type into the spawn interval field.
    SetSpawnInterval(String),
}

/// An input scheduled at a simulated time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimedControl {
    /// Simulated seconds after start at which the input is applied.
    pub at: f32,
    /// The input itself.
    pub action: ControlAction,
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Seed for the simulation's random source.
    pub seed: u64,
    /// Frame length in seconds.
    pub frame_dt: f32,
    /// Simulated run length in seconds.
    pub duration: f32,
    /// Simulation tuning and initial setup.
    pub config: SimConfig,
    /// Operator inputs, applied in time order.
    pub timeline: Vec<TimedControl>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: "Default Harvest".to_string(),
            description: "Two factions of five drones on an open field".to_string(),
            seed: 12_345,
            frame_dt: 1.0 / 60.0,
            duration: 60.0,
            config: SimConfig::default(),
            timeline: Vec::new(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Wrap a bare [`SimConfig`] RON file in a default scenario.
    pub fn from_config_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let scenario = Self {
            name: path.display().to_string(),
            config: SimConfig::load(path)?,
            ..Self::default()
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// Parse and validate a scenario from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check run parameters and the embedded config.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.frame_dt.is_finite() && self.frame_dt > 0.0) {
            return Err(ScenarioError::Invalid(format!(
                "frame_dt must be positive, got {}",
                self.frame_dt
            )));
        }
        if !(self.duration.is_finite() && self.duration >= 0.0) {
            return Err(ScenarioError::Invalid(format!(
                "duration must be non-negative, got {}",
                self.duration
            )));
        }
        if let Some(bad) = self.timeline.iter().find(|t| !t.at.is_finite()) {
            return Err(ScenarioError::Invalid(format!(
                "timeline entry at {} is not a finite time",
                bad.at
            )));
        }
        self.config.validate()?;
        Ok(())
    }

    /// Replace the seed when one is given, keeping the file's otherwise.
    pub fn override_seed(&mut self, seed: Option<u64>) {
        if let Some(seed) = seed {
            self.seed = seed;
        }
    }

    /// Number of frames covering `duration`.
    #[must_use]
    pub fn frames(&self) -> u64 {
        (self.duration / self.frame_dt).ceil() as u64
    }

    /// Timeline sorted by time, stable for equal times.
    #[must_use]
    pub fn sorted_timeline(&self) -> Vec<TimedControl> {
        let mut timeline = self.timeline.clone();
        timeline.sort_by(|a, b| a.at.total_cmp(&b.at));
        timeline
    }

    /// Build the simulation this scenario starts from.
    pub fn build(&self) -> Result<Simulation, ScenarioError> {
        Ok(Simulation::new(self.config.clone(), self.seed)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        (
            name: "Sample",
            seed: 7,
            frame_dt: 0.05,
            duration: 2.0,
            config: (
                spawner: (max_active: 5),
                factions: (
                    blue: (base: Some((-5.0, 0.0)), initial_drones: 2),
                    red: (base: None, initial_drones: 3),
                ),
            ),
            timeline: [
                (at: 1.5, action: SetSpeed(2.0)),
                (at: 0.5, action: SetPopulation(faction: red, count: 6)),
                (at: 1.0, action: SetSpawnInterval("abc")),
            ],
        )
    "#;

    #[test]
    fn test_parse_sample() {
        let scenario = Scenario::from_ron_str(SAMPLE).unwrap();
        assert_eq!(scenario.name, "Sample");
        assert_eq!(scenario.seed, 7);
        assert_eq!(scenario.frames(), 40);
        assert_eq!(scenario.config.spawner.max_active, 5);
        assert_eq!(scenario.config.factions.red.base, None);
        assert_eq!(scenario.timeline.len(), 3);
        // Unlisted fields keep their defaults
        assert_eq!(scenario.config.physics_hz, 50);
    }

    #[test]
    fn test_sorted_timeline() {
        let scenario = Scenario::from_ron_str(SAMPLE).unwrap();
        let times: Vec<f32> = scenario.sorted_timeline().iter().map(|t| t.at).collect();
        assert_eq!(times, vec![0.5, 1.0, 1.5]);
    }

    #[test]
    fn test_default_round_trips_through_ron() {
        let text = ron::to_string(&Scenario::default()).unwrap();
        let parsed = Scenario::from_ron_str(&text).unwrap();
        assert_eq!(parsed, Scenario::default());
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("/nonexistent/harvest.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_bad_ron() {
        let err = Scenario::from_ron_str("(name: ").unwrap_err();
        assert!(matches!(err, ScenarioError::ParseError(_)));
    }

    #[test]
    fn test_bad_frame_dt() {
        let err = Scenario::from_ron_str("(frame_dt: 0.0)").unwrap_err();
        assert!(matches!(err, ScenarioError::Invalid(_)));
    }

    #[test]
    fn test_bad_config_surfaces_sim_error() {
        let err = Scenario::from_ron_str("(config: (physics_hz: 0))").unwrap_err();
        assert!(matches!(
            err,
            ScenarioError::Sim(SimError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_seed_override_is_optional() {
        let mut scenario = Scenario::from_ron_str(SAMPLE).unwrap();
        scenario.override_seed(None);
        assert_eq!(scenario.seed, 7);
        scenario.override_seed(Some(99));
        assert_eq!(scenario.seed, 99);
    }

    #[test]
    fn test_from_config_file() {
        let path = std::env::temp_dir().join("drone_headless_bare_config.ron");
        std::fs::write(&path, "(factions: (blue: (initial_drones: 4)))").unwrap();

        let scenario = Scenario::from_config_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(scenario.config.factions.blue.initial_drones, 4);
        assert_eq!(scenario.seed, Scenario::default().seed);
    }

    #[test]
    fn test_from_config_file_bad_ron() {
        let path = std::env::temp_dir().join("drone_headless_bad_config.ron");
        std::fs::write(&path, "(physics_hz: \"fast\")").unwrap();

        let err = Scenario::from_config_file(&path).unwrap_err();
        std::fs::remove_file(&path).ok();

        assert!(matches!(err, ScenarioError::Sim(SimError::ConfigParse(_))));
    }

    #[test]
    fn test_build() {
        let scenario = Scenario::from_ron_str(SAMPLE).unwrap();
        let sim = scenario.build().unwrap();
        assert_eq!(sim.factions().population(FactionId::Blue), 2);
        assert_eq!(sim.factions().population(FactionId::Red), 3);
    }
}

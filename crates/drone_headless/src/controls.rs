//! Operator controls: sliders, the spawn interval field and text readouts.
//!
//! The panel sits between raw operator input and the simulation. Slider
//! values are clamped to the configured [`ControlLimits`] before they reach
//! the core, so the core only ever sees in-range requests from here.

use drone_core::config::ControlLimits;
use drone_core::error::Result;
use drone_core::faction_controller::PopulationChange;
use drone_core::factions::FactionId;
use drone_core::simulation::Simulation;
use tracing::debug;

/// Maps operator input onto simulation controls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPanel {
    limits: ControlLimits,
}

impl ControlPanel {
    /// Create a panel with explicit limits.
    #[must_use]
    pub const fn new(limits: ControlLimits) -> Self {
        Self { limits }
    }

    /// Create a panel using the limits from the simulation's config.
    #[must_use]
    pub fn for_simulation(sim: &Simulation) -> Self {
        Self::new(sim.config().controls)
    }

    /// Clamp a requested roster size into the slider range.
    #[must_use]
    pub fn clamp_population(&self, requested: usize) -> usize {
        requested.clamp(self.limits.min_population, self.limits.max_population)
    }

    /// Clamp a requested speed multiplier into the slider range.
    ///
    /// NaN passes through unchanged and is rejected by the simulation.
    #[must_use]
    pub fn clamp_speed(&self, requested: f32) -> f32 {
        requested.clamp(
            self.limits.min_speed_multiplier,
            self.limits.max_speed_multiplier,
        )
    }

    /// Population slider moved.
    pub fn set_population(
        &self,
        sim: &mut Simulation,
        faction: FactionId,
        requested: usize,
    ) -> PopulationChange {
        let count = self.clamp_population(requested);
        if count != requested {
            debug!(%faction, requested, count, "Population request clamped");
        }
        sim.set_population(faction, count)
    }

    /// Speed slider moved. Returns the multiplier actually applied.
    ///
    /// # Errors
    ///
    /// Returns an error when the value is not a finite number.
    pub fn set_speed(&self, sim: &mut Simulation, requested: f32) -> Result<f32> {
        let multiplier = self.clamp_speed(requested);
        sim.set_speed_multiplier(multiplier)?;
        debug!(requested, multiplier, "Speed multiplier applied");
        Ok(multiplier)
    }

    /// Spawn interval text submitted. Returns whether it was accepted.
    pub fn set_spawn_interval(&self, sim: &mut Simulation, text: &str) -> bool {
        sim.set_spawn_interval(text)
    }

    /// Tally and roster readouts, one line each, Blue first.
    #[must_use]
    pub fn readouts(&self, sim: &Simulation) -> Vec<String> {
        let summaries = sim.factions().summaries();
        let mut lines = Vec::with_capacity(4);
        for (_, summary) in summaries.iter() {
            lines.push(summary.resources_text());
            lines.push(summary.drones_text());
        }
        lines
    }
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new(ControlLimits::default())
    }
}

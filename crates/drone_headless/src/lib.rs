//! Headless drone simulation runner for scripted runs and CI verification.
//!
//! This crate drives a [`drone_core::simulation::Simulation`] without any
//! rendering, controlled via JSON commands on stdin with responses on
//! stdout. This enables:
//!
//! - **Operator scripting**: population, speed and spawn interval controls
//!   from any process that can write JSON lines
//! - **Scenario runs**: RON files with a seed and a timeline of inputs
//! - **Determinism checks**: repeated runs compared by state hash
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from the controller (tick, state, set_population, etc.)
//! - **stdout**: Responses (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See [`protocol`] module for the full command/response specification.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p drone_headless -- run
//!
//! # Run a scenario
//! cargo run -p drone_headless -- scenario --file crates/drone_headless/scenarios/skirmish.ron
//!
//! # Verify determinism
//! cargo run -p drone_headless -- verify --seed 7 --runs 5 --ticks 3600
//! ```

pub mod controls;
pub mod protocol;
pub mod runner;
pub mod scenario;

pub use controls::ControlPanel;
pub use protocol::{Command, Response};
pub use runner::{run_scenario, verify_determinism, HeadlessRunner, ScenarioReport, VerifyReport};
pub use scenario::{ControlAction, Scenario, ScenarioError, TimedControl};

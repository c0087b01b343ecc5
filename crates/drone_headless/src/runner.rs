//! Headless simulation runner.
//!
//! [`HeadlessRunner`] owns a [`Simulation`] and answers protocol commands
//! one line at a time. [`run_scenario`] plays a [`Scenario`] to completion,
//! feeding its timeline through the same [`ControlPanel`].

use std::io::{self, BufRead, Write};

use drone_core::factions::{FactionId, PerFaction};
use drone_core::simulation::Simulation;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::controls::ControlPanel;
use crate::protocol::{Command, Response};
use crate::scenario::{ControlAction, Scenario, ScenarioError};

/// Default frame length for `tick` commands without an explicit `dt`.
pub const DEFAULT_FRAME_DT: f32 = 1.0 / 60.0;

/// Upper bound on frames stepped by a single `tick` command.
pub const MAX_TICKS_PER_COMMAND: u32 = 1_000_000;

/// Interactive runner speaking the JSON-lines protocol.
pub struct HeadlessRunner {
    sim: Simulation,
    panel: ControlPanel,
    frame_dt: f32,
    should_quit: bool,
}

impl HeadlessRunner {
    /// Wrap a simulation with panel limits taken from its config.
    #[must_use]
    pub fn new(sim: Simulation) -> Self {
        let panel = ControlPanel::for_simulation(&sim);
        Self {
            sim,
            panel,
            frame_dt: DEFAULT_FRAME_DT,
            should_quit: false,
        }
    }

    /// Start from a scenario's config, seed and frame length.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let mut runner = Self::new(scenario.build()?);
        runner.frame_dt = scenario.frame_dt;
        Ok(runner)
    }

    /// The simulation being driven.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.sim
    }

    /// Whether a `quit` command has been handled.
    #[must_use]
    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Read commands from `input` until EOF or `quit`, writing one response
    /// line per command to `output`.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut output: W) -> io::Result<()> {
        output.write_all(Response::ready(self.sim.frame()).to_json_line().as_bytes())?;
        output.flush()?;

        for line in input.lines() {
            let line = line?;
            if let Some(response) = self.handle_line(&line) {
                output.write_all(response.to_json_line().as_bytes())?;
                output.flush()?;
            }
            if self.should_quit {
                break;
            }
        }

        info!(frame = self.sim.frame(), "Headless session ended");
        Ok(())
    }

    /// Handle one raw input line. Blank lines produce no response.
    pub fn handle_line(&mut self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        match Command::from_json(line) {
            Ok(cmd) => Some(self.handle_command(cmd)),
            Err(e) => {
                warn!(error = %e, "Unparseable command");
                Some(Response::error(format!("Parse error: {e}"), None))
            }
        }
    }

    /// Apply one command and produce its response.
    pub fn handle_command(&mut self, cmd: Command) -> Response {
        let name = cmd.name();
        debug!(cmd = name, "Handling command");

        match cmd {
            Command::Tick { count, dt } => {
                let dt = dt.unwrap_or(self.frame_dt);
                if !(dt.is_finite() && dt >= 0.0) {
                    return Response::error(format!("Invalid dt: {dt}"), Some(name));
                }
                if count > MAX_TICKS_PER_COMMAND {
                    return Response::error(
                        format!("count exceeds {MAX_TICKS_PER_COMMAND}"),
                        Some(name),
                    );
                }

                let mut deliveries = 0;
                let mut collected = 0;
                for _ in 0..count {
                    let events = self.sim.step(dt);
                    deliveries += events.deliveries();
                    collected += events.collected().count();
                }
                Response::Ticked {
                    frame: self.sim.frame(),
                    deliveries,
                    collected,
                }
            }
            Command::State => Response::State {
                snapshot: Box::new(self.sim.snapshot()),
                lines: self.panel.readouts(&self.sim),
            },
            Command::SetPopulation { faction, count } => {
                self.panel.set_population(&mut self.sim, faction, count);
                Response::ack(name)
            }
            Command::SetSpeed { multiplier } => {
                match self.panel.set_speed(&mut self.sim, multiplier) {
                    Ok(_) => Response::ack(name),
                    Err(e) => Response::error(e.to_string(), Some(name)),
                }
            }
            Command::SetSpawnInterval { value } => {
                if self.panel.set_spawn_interval(&mut self.sim, &value) {
                    Response::ack(name)
                } else {
                    Response::error(format!("Rejected spawn interval '{value}'"), Some(name))
                }
            }
            Command::Hash => Response::Hash {
                frame: self.sim.frame(),
                hash: self.sim.state_hash(),
            },
            Command::Quit => {
                self.should_quit = true;
                Response::ack(name)
            }
        }
    }
}

// ============================================================================
// Scripted runs
// ============================================================================

/// Outcome of a scripted scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed the run used.
    pub seed: u64,
    /// Frames stepped.
    pub frames: u64,
    /// Simulated seconds at the end.
    pub elapsed: f64,
    /// Final resource tallies.
    pub resources: PerFaction<u64>,
    /// Final roster sizes.
    pub drones: PerFaction<usize>,
    /// Timeline inputs the simulation accepted.
    pub controls_applied: usize,
    /// Timeline inputs the simulation rejected.
    pub controls_rejected: usize,
    /// State hash after the last frame.
    pub final_hash: u64,
}

/// Play `scenario` for its duration, or `frames` frames when given.
pub fn run_scenario(
    scenario: &Scenario,
    frames: Option<u64>,
) -> Result<ScenarioReport, ScenarioError> {
    let mut sim = scenario.build()?;
    let panel = ControlPanel::for_simulation(&sim);
    let frames = frames.unwrap_or_else(|| scenario.frames());
    let timeline = scenario.sorted_timeline();
    let mut next = 0;
    let mut applied = 0;
    let mut rejected = 0;

    info!(
        scenario = %scenario.name,
        seed = scenario.seed,
        frames,
        "Running scenario"
    );

    for _ in 0..frames {
        let now = sim.clock().elapsed();
        while let Some(entry) = timeline.get(next).filter(|t| f64::from(t.at) <= now) {
            if apply_control(&panel, &mut sim, &entry.action) {
                applied += 1;
            } else {
                rejected += 1;
            }
            next += 1;
        }
        sim.step(scenario.frame_dt);
    }

    let factions = sim.factions();
    let report = ScenarioReport {
        scenario: scenario.name.clone(),
        seed: scenario.seed,
        frames: sim.frame(),
        elapsed: sim.clock().elapsed(),
        resources: PerFaction::from_fn(|f| factions.tally(f)),
        drones: PerFaction::from_fn(|f| factions.population(f)),
        controls_applied: applied,
        controls_rejected: rejected,
        final_hash: sim.state_hash(),
    };

    info!(
        blue = report.resources[FactionId::Blue],
        red = report.resources[FactionId::Red],
        hash = report.final_hash,
        "Scenario finished"
    );
    Ok(report)
}

fn apply_control(panel: &ControlPanel, sim: &mut Simulation, action: &ControlAction) -> bool {
    match action {
        ControlAction::SetPopulation { faction, count } => {
            panel.set_population(sim, *faction, *count);
            true
        }
        ControlAction::SetSpeed(multiplier) => panel.set_speed(sim, *multiplier).is_ok(),
        ControlAction::SetSpawnInterval(text) => panel.set_spawn_interval(sim, text),
    }
}

/// Final hashes from repeated runs of one scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Whether every run ended on the same hash.
    pub is_deterministic: bool,
    /// Final hash of each run, in run order.
    pub hashes: Vec<u64>,
    /// Frames each run stepped.
    pub frames: u64,
}

/// Run `scenario` `runs` times and compare the final state hashes.
pub fn verify_determinism(
    scenario: &Scenario,
    runs: u32,
    frames: Option<u64>,
) -> Result<VerifyReport, ScenarioError> {
    let mut hashes = Vec::with_capacity(runs as usize);
    let mut stepped = 0;
    for run in 0..runs {
        let report = run_scenario(scenario, frames)?;
        debug!(run, hash = report.final_hash, "Run complete");
        stepped = report.frames;
        hashes.push(report.final_hash);
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    Ok(VerifyReport {
        is_deterministic,
        hashes,
        frames: stepped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::TimedControl;
    use drone_test_utils::fixtures::{busy_config, quiet_simulation};

    fn send(runner: &mut HeadlessRunner, json: &str) -> Response {
        runner.handle_line(json).unwrap()
    }

    fn short_scenario() -> Scenario {
        Scenario {
            name: "short".to_string(),
            duration: 2.0,
            frame_dt: 1.0 / 30.0,
            config: busy_config(),
            ..Scenario::default()
        }
    }

    #[test]
    fn test_tick_advances_frames() {
        let mut runner = HeadlessRunner::new(quiet_simulation(1));
        let response = send(&mut runner, r#"{"cmd":"tick","count":5}"#);
        assert!(matches!(response, Response::Ticked { frame: 5, .. }));
        assert_eq!(runner.simulation().frame(), 5);
    }

    #[test]
    fn test_tick_rejects_bad_dt() {
        let mut runner = HeadlessRunner::new(quiet_simulation(1));
        let response = send(&mut runner, r#"{"cmd":"tick","dt":-1.0}"#);
        assert!(matches!(response, Response::Error { .. }));
        assert_eq!(runner.simulation().frame(), 0);
    }

    #[test]
    fn test_tick_accepts_zero_dt() {
        let mut runner = HeadlessRunner::new(quiet_simulation(1));
        let response = send(&mut runner, r#"{"cmd":"tick","count":2,"dt":0.0}"#);
        assert!(matches!(response, Response::Ticked { frame: 2, .. }));
        assert_eq!(runner.simulation().clock().elapsed(), 0.0);
    }

    #[test]
    fn test_blank_line_is_ignored() {
        let mut runner = HeadlessRunner::new(quiet_simulation(1));
        assert!(runner.handle_line("   ").is_none());
    }

    #[test]
    fn test_parse_error_response() {
        let mut runner = HeadlessRunner::new(quiet_simulation(1));
        let response = send(&mut runner, "{oops");
        assert!(matches!(response, Response::Error { cmd: None, .. }));
    }

    #[test]
    fn test_set_population_is_clamped() {
        let mut runner = HeadlessRunner::new(quiet_simulation(1));
        let response = send(
            &mut runner,
            r#"{"cmd":"set_population","faction":"blue","count":40}"#,
        );
        assert_eq!(response, Response::ack("set_population"));
        assert_eq!(runner.simulation().factions().population(FactionId::Blue), 20);
    }

    #[test]
    fn test_spawn_interval_text() {
        let mut runner = HeadlessRunner::new(quiet_simulation(1));
        let rejected = send(&mut runner, r#"{"cmd":"set_spawn_interval","value":"0.05"}"#);
        assert!(matches!(rejected, Response::Error { .. }));

        let accepted = send(&mut runner, r#"{"cmd":"set_spawn_interval","value":"5"}"#);
        assert_eq!(accepted, Response::ack("set_spawn_interval"));
        assert_eq!(runner.simulation().ores().spawn_interval(), 5.0);
    }

    #[test]
    fn test_state_includes_readouts() {
        let mut runner = HeadlessRunner::new(Simulation::new(busy_config(), 3).unwrap());
        match send(&mut runner, r#"{"cmd":"state"}"#) {
            Response::State { snapshot, lines } => {
                assert_eq!(snapshot.drone_count(), 16);
                assert_eq!(lines[0], "Blue Resources: 0");
                assert_eq!(lines[3], "Red Drones: 8");
            }
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[test]
    fn test_hash_matches_simulation() {
        let mut runner = HeadlessRunner::new(quiet_simulation(9));
        let expected = runner.simulation().state_hash();
        assert_eq!(
            send(&mut runner, r#"{"cmd":"hash"}"#),
            Response::Hash {
                frame: 0,
                hash: expected
            }
        );
    }

    #[test]
    fn test_session_over_buffers() {
        let input = concat!(
            r#"{"cmd":"tick","count":3}"#,
            "\n\n",
            r#"{"cmd":"quit"}"#,
            "\n",
            r#"{"cmd":"tick"}"#,
            "\n"
        );
        let mut output = Vec::new();
        let mut runner = HeadlessRunner::new(quiet_simulation(1));
        runner.run(input.as_bytes(), &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains(r#""type":"ready""#));
        assert!(lines[1].contains(r#""type":"ticked""#));
        assert!(lines[2].contains(r#""cmd":"quit""#));
        assert!(runner.should_quit());
        assert_eq!(runner.simulation().frame(), 3);
    }

    #[test]
    fn test_scenario_applies_timeline() {
        let mut scenario = short_scenario();
        scenario.timeline = vec![
            TimedControl {
                at: 1.0,
                action: ControlAction::SetSpawnInterval("abc".to_string()),
            },
            TimedControl {
                at: 0.5,
                action: ControlAction::SetPopulation {
                    faction: FactionId::Red,
                    count: 3,
                },
            },
            TimedControl {
                at: 10.0,
                action: ControlAction::SetSpeed(2.0),
            },
        ];

        let report = run_scenario(&scenario, None).unwrap();
        assert_eq!(report.frames, 60);
        assert_eq!(report.drones[FactionId::Red], 3);
        assert_eq!(report.drones[FactionId::Blue], 8);
        assert_eq!(report.controls_applied, 1);
        assert_eq!(report.controls_rejected, 1);
    }

    #[test]
    fn test_frame_override() {
        let report = run_scenario(&short_scenario(), Some(10)).unwrap();
        assert_eq!(report.frames, 10);
    }

    #[test]
    fn test_verify_same_seed() {
        let report = verify_determinism(&short_scenario(), 3, Some(90)).unwrap();
        assert!(report.is_deterministic);
        assert_eq!(report.hashes.len(), 3);
        assert_eq!(report.frames, 90);
    }
}

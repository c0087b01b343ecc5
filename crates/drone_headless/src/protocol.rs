//! JSON protocol for headless simulation control.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Operator commands
//! **Output (stdout):** Responses and snapshots
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready","version":"1.0","frame":0}`
//! 2. The controller sends commands as JSON lines
//! 3. Every command gets exactly one response line
//! 4. `quit` is acknowledged and ends the session
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","frame":0}
//! -> {"cmd":"set_population","faction":"red","count":12}
//! <- {"type":"ack","cmd":"set_population"}
//! -> {"cmd":"tick","count":60}
//! <- {"type":"ticked","frame":60,"deliveries":3,"collected":4}
//! -> {"cmd":"set_spawn_interval","value":"abc"}
//! <- {"type":"error","message":"Rejected spawn interval 'abc'","cmd":"set_spawn_interval"}
//! -> {"cmd":"state"}
//! <- {"type":"state","snapshot":{...},"lines":["Blue Resources: 2", ...]}
//! ```

use drone_core::factions::FactionId;
use drone_core::snapshot::SimSnapshot;
use serde::{Deserialize, Serialize};

/// Protocol version reported in the ready line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (controller -> runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance the simulation by N frames (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
        /// Frame length in seconds; the runner's default when absent.
        #[serde(default)]
        dt: Option<f32>,
    },

    /// Report the current state without advancing time.
    State,

    /// Resize a faction's roster (the population slider).
    SetPopulation { faction: FactionId, count: usize },

    /// Change the global speed multiplier (the speed slider).
    SetSpeed { multiplier: f32 },

    /// Type a new spawn interval into the text field.
    SetSpawnInterval { value: String },

    /// Report the state hash.
    Hash,

    /// End the session.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (runner -> controller)
// ============================================================================

/// Responses sent from the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to receive commands.
    Ready { version: String, frame: u64 },

    /// Command acknowledged.
    Ack { cmd: String },

    /// Frames were stepped.
    Ticked {
        frame: u64,
        deliveries: usize,
        collected: usize,
    },

    /// Full observable state plus the text readouts.
    State {
        snapshot: Box<SimSnapshot>,
        lines: Vec<String>,
    },

    /// Deterministic state hash.
    Hash { frame: u64, hash: u64 },

    /// Error occurred.
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cmd: Option<String>,
    },
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(frame: u64) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            frame,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::State => "state",
            Self::SetPopulation { .. } => "set_population",
            Self::SetSpeed { .. } => "set_speed",
            Self::SetSpawnInterval { .. } => "set_spawn_interval",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}

//! Error types for the drone simulation.
//!
//! Nearly every fault inside a running simulation is recoverable and handled
//! in place (skip the tick, log, continue). The variants here cover the cases
//! that must be surfaced loudly: bad wiring at startup and unreadable input.

use thiserror::Error;

/// Result type alias using [`SimError`].
pub type Result<T> = std::result::Result<T, SimError>;

/// Top-level error type for simulation setup and configuration.
#[derive(Debug, Error)]
pub enum SimError {
    /// A configuration field failed validation.
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// A faction name did not match any known faction.
    #[error("Unknown faction: {0}")]
    UnknownFaction(String),

    /// Failed to parse a RON configuration document.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] ron::error::SpannedError),

    /// Failed to read a configuration file.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Shorthand for an [`SimError::InvalidConfig`] error.
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

//! Faction definitions and identifiers.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Unique identifier for the two competing factions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactionId {
    /// The blue team.
    Blue,
    /// The red team.
    Red,
}

impl FactionId {
    /// Every faction, in iteration order.
    pub const ALL: [Self; 2] = [Self::Blue, Self::Red];

    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Blue => "Blue",
            Self::Red => "Red",
        }
    }
}

impl fmt::Display for FactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for FactionId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blue" => Ok(Self::Blue),
            "red" => Ok(Self::Red),
            other => Err(SimError::UnknownFaction(other.to_string())),
        }
    }
}

/// A value stored once per faction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PerFaction<T> {
    /// Blue team slot.
    pub blue: T,
    /// Red team slot.
    pub red: T,
}

impl<T> PerFaction<T> {
    /// Build a table with an explicit value for each faction.
    #[must_use]
    pub const fn new(blue: T, red: T) -> Self {
        Self { blue, red }
    }

    /// Build a table by evaluating `f` for each faction.
    pub fn from_fn(mut f: impl FnMut(FactionId) -> T) -> Self {
        Self {
            blue: f(FactionId::Blue),
            red: f(FactionId::Red),
        }
    }

    /// Iterate `(faction, &value)` pairs in [`FactionId::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (FactionId, &T)> {
        [(FactionId::Blue, &self.blue), (FactionId::Red, &self.red)].into_iter()
    }
}

impl<T> Index<FactionId> for PerFaction<T> {
    type Output = T;

    fn index(&self, faction: FactionId) -> &T {
        match faction {
            FactionId::Blue => &self.blue,
            FactionId::Red => &self.red,
        }
    }
}

impl<T> IndexMut<FactionId> for PerFaction<T> {
    fn index_mut(&mut self, faction: FactionId) -> &mut T {
        match faction {
            FactionId::Blue => &mut self.blue,
            FactionId::Red => &mut self.red,
        }
    }
}

//! Team definitions and identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Team affinity. Units with different colors are enemies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamColor {
    /// Red team.
    Red,
    /// Blue team.
    Blue,
    /// Green team.
    Green,
    /// Yellow team.
    Yellow,
}

impl TeamColor {
    /// Get the display name for this team.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Red => "Red",
            Self::Blue => "Blue",
            Self::Green => "Green",
            Self::Yellow => "Yellow",
        }
    }
}

impl fmt::Display for TeamColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A side in the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Team {
    /// Team affinity.
    pub color: TeamColor,
    /// Whether a human player issues this team's orders.
    pub player_controlled: bool,
}

impl Team {
    /// Create a team.
    #[must_use]
    pub const fn new(color: TeamColor, player_controlled: bool) -> Self {
        Self {
            color,
            player_controlled,
        }
    }

    /// A human-controlled team.
    #[must_use]
    pub const fn player(color: TeamColor) -> Self {
        Self::new(color, true)
    }

    /// A team controlled by something other than a local player.
    #[must_use]
    pub const fn remote(color: TeamColor) -> Self {
        Self::new(color, false)
    }
}

//! Scenario layout: map, teams and starting units.

use serde::{Deserialize, Serialize};

use crate::balancing::UnitType;
use crate::error::Result;
use crate::grid::GridCoord;
use crate::map::TileMap;
use crate::team::{Team, TeamColor};

/// A team taking part in a scenario, in turn order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamData {
    /// Team affinity.
    pub color: TeamColor,
    /// Whether a human player controls this team.
    #[serde(default)]
    pub player_controlled: bool,
}

impl From<TeamData> for Team {
    fn from(data: TeamData) -> Self {
        Team::new(data.color, data.player_controlled)
    }
}

/// Starting unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Owning team.
    pub team: TeamColor,
    /// Unit type, must exist in the balancing table.
    pub unit_type: UnitType,
    /// Starting column.
    pub x: i32,
    /// Starting row.
    pub y: i32,
}

impl UnitPlacement {
    /// Starting position.
    #[must_use]
    pub const fn position(&self) -> GridCoord {
        GridCoord::new(self.x, self.y)
    }
}

/// Battle scenario loaded from a RON file.
///
/// # Example RON
///
/// ```ron
/// ScenarioData(
///     name: "Crossing",
///     map: [
///         "..#..",
///         ".....",
///     ],
///     teams: [
///         TeamData(color: Red, player_controlled: true),
///         TeamData(color: Blue),
///     ],
///     units: [
///         UnitPlacement(team: Red, unit_type: Infantry, x: 0, y: 0),
///         UnitPlacement(team: Blue, unit_type: Tank, x: 4, y: 1),
///     ],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioData {
    /// Display name.
    pub name: String,
    /// Map rows, northmost first.
    pub map: Vec<String>,
    /// Teams in turn order.
    pub teams: Vec<TeamData>,
    /// Starting units.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
}

impl ScenarioData {
    /// Parse a scenario from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`](crate::error::BattleError::DataParse)
    /// if the text is not valid scenario RON.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        super::parse_ron(source_name, text)
    }

    /// Build the tile map from the map rows.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`](crate::error::BattleError::DataParse)
    /// for malformed rows.
    pub fn tile_map(&self) -> Result<TileMap> {
        TileMap::from_rows(&self.map)
    }

    /// Teams in turn order.
    #[must_use]
    pub fn teams(&self) -> Vec<Team> {
        self.teams.iter().copied().map(Team::from).collect()
    }
}

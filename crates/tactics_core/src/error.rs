//! Error types for the battle core.
//!
//! Only contract violations and missing configuration are errors. Normal game
//! states such as "no route" or "no target in range" are empty results; the
//! matching variants here exist for callers that prefer `?`.

use thiserror::Error;

use crate::balancing::UnitType;
use crate::grid::GridCoord;
use crate::unit::UnitId;

/// Result type alias using [`BattleError`].
pub type Result<T> = std::result::Result<T, BattleError>;

/// Top-level error type for all battle core errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BattleError {
    /// No balancing entry exists for a unit type. Fatal at load time.
    #[error("No balancing entry for unit type {0:?}")]
    UnknownUnitType(UnitType),

    /// A balancing entry failed validation.
    #[error("Invalid balancing for {unit_type:?}: {reason}")]
    InvalidBalancing {
        /// Unit type whose entry is invalid.
        unit_type: UnitType,
        /// What is wrong with it.
        reason: String,
    },

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParse {
        /// Name of the data source that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Destination cannot be reached within the movement budget.
    #[error("No path from {from} to {to}")]
    NoPathFound {
        /// Route origin.
        from: GridCoord,
        /// Requested destination.
        to: GridCoord,
    },

    /// Defender is not a valid target for the attacker.
    #[error("Unit {defender} is not a valid target for unit {attacker}")]
    InvalidTarget {
        /// Attacking unit.
        attacker: UnitId,
        /// Rejected defender.
        defender: UnitId,
    },

    /// Two coordinates are not axis-aligned neighbours.
    #[error("No cardinal direction from {from} to {to}")]
    InvalidDirection {
        /// Origin coordinate.
        from: GridCoord,
        /// Target coordinate.
        to: GridCoord,
    },

    /// Unit is not in the registry.
    #[error("Unit not found: {0}")]
    UnknownUnit(UnitId),

    /// A unit with this ID is already registered.
    #[error("Unit already registered: {0}")]
    DuplicateUnit(UnitId),

    /// Tile is blocked, occupied or off the map.
    #[error("Tile {0} is not available")]
    TileUnavailable(GridCoord),

    /// Unit is not allowed to take the requested action right now.
    #[error("Unit {unit} cannot act: {reason}")]
    UnitCannotAct {
        /// Unit that tried to act.
        unit: UnitId,
        /// Why the action was refused.
        reason: &'static str,
    },

    /// A turn listener with this name is already registered.
    #[error("Turn listener already registered: {0}")]
    DuplicateListener(String),

    /// The battle has ended; no further transitions are possible.
    #[error("Battle is over")]
    BattleOver,

    /// Invalid battle state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),
}

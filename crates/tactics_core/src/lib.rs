//! # Tactics Core
//!
//! Deterministic battle core for a grid-based, turn-based tactics game.
//!
//! This crate contains **only** battle rules:
//! - No rendering
//! - No IO
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! A presentation layer drives a [`session::BattleSession`] and receives
//! notifications through [`presentation::PresentationGateway`]. The same
//! inputs always produce the same battle, which the determinism harness in
//! `tactics_test_utils` checks via [`session::BattleSession::state_hash`].
//!
//! ## Crate Structure
//!
//! - [`grid`] - Tile coordinates and cardinal directions
//! - [`map`] - Map service and the in-memory tile map
//! - [`balancing`] - Per-type unit stats
//! - [`unit`] - Live units and the unit registry
//! - [`pathfinding`] - Walkable areas and best routes
//! - [`combat`] - Targeting and damage
//! - [`turn`] - Turn order and listeners
//! - [`movement`] - Route traversal over ticks
//! - [`session`] - Owns and wires all of the above
//! - [`data`] - RON data file formats

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod balancing;
pub mod combat;
pub mod data;
pub mod error;
pub mod grid;
pub mod map;
pub mod math;
pub mod movement;
pub mod pathfinding;
pub mod presentation;
pub mod route;
pub mod session;
pub mod team;
pub mod turn;
pub mod unit;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::balancing::{UnitBalancing, UnitBalancingTable, UnitMetaType, UnitType};
    pub use crate::combat::{AttackOutcome, CombatResolver};
    pub use crate::data::{BalancingData, ScenarioData};
    pub use crate::error::{BattleError, Result};
    pub use crate::grid::{CardinalDirection, GridCoord};
    pub use crate::map::{MapService, TileKind, TileMap};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::movement::{FinishedMove, MoveCompletion, MovementScheduler, RouteTraversal, TraversalStep};
    pub use crate::pathfinding::{PathNodeDebug, PathfindingEngine, RouteSearch};
    pub use crate::presentation::{NullGateway, PresentationGateway};
    pub use crate::route::{route_markers, Route, RouteMarker};
    pub use crate::session::{ActionOptions, BattleSession};
    pub use crate::team::{Team, TeamColor};
    pub use crate::turn::{TurnController, TurnState, TurnTransition};
    pub use crate::unit::{Unit, UnitId, UnitRegistry};
}

//! Notification boundary towards the presentation layer.
//!
//! The core reports what happened; it never waits for, or reads back, any
//! response. Selection markers, attack markers, health bars and the
//! "has attacked" tint are all driven from these notifications.

use crate::combat::AttackOutcome;
use crate::grid::{CardinalDirection, GridCoord};
use crate::team::TeamColor;
use crate::unit::UnitId;

/// Fire-and-forget receiver of battle notifications.
///
/// Every method has a no-op default, so implementors only override what
/// they draw.
pub trait PresentationGateway {
    /// A unit finished one step of a route.
    fn unit_moved(&mut self, unit: UnitId, from: GridCoord, to: GridCoord, facing: CardinalDirection) {
        let _ = (unit, from, to, facing);
    }

    /// An attack was resolved.
    fn unit_attacked(&mut self, outcome: &AttackOutcome) {
        let _ = outcome;
    }

    /// A unit was removed from the battle. Sent after the registry removal.
    fn unit_died(&mut self, unit: UnitId) {
        let _ = unit;
    }

    /// A team's turn has started. Sent after its units' flags were reset.
    fn turn_started(&mut self, team: TeamColor) {
        let _ = team;
    }
}

/// Gateway that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullGateway;

impl PresentationGateway for NullGateway {}

//! A presentation gateway that records every notification.
//!
//! The session owns its gateway, so [`RecordingGateway`] keeps its log behind
//! a shared handle: clone it, hand one clone to the session and inspect the
//! other.

use std::cell::RefCell;
use std::rc::Rc;

use tactics_core::prelude::*;

/// One notification received by a [`RecordingGateway`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayEvent {
    /// `unit_moved`.
    Moved {
        /// Unit that stepped.
        unit: UnitId,
        /// Tile left.
        from: GridCoord,
        /// Tile entered.
        to: GridCoord,
        /// Step heading.
        facing: CardinalDirection,
    },
    /// `unit_attacked`.
    Attacked(AttackOutcome),
    /// `unit_died`.
    Died(UnitId),
    /// `turn_started`.
    TurnStarted(TeamColor),
}

/// Gateway appending every notification to a shared log.
#[derive(Debug, Clone, Default)]
pub struct RecordingGateway {
    events: Rc<RefCell<Vec<GatewayEvent>>>,
}

impl RecordingGateway {
    /// Create a gateway with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A boxed clone sharing this gateway's log, ready for a session.
    #[must_use]
    pub fn boxed(&self) -> Box<dyn PresentationGateway> {
        Box::new(self.clone())
    }

    /// Copy of every event so far.
    #[must_use]
    pub fn events(&self) -> Vec<GatewayEvent> {
        self.events.borrow().clone()
    }

    /// Remove and return every event so far.
    pub fn take(&self) -> Vec<GatewayEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    /// Number of events so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    /// Units reported dead, in order.
    #[must_use]
    pub fn deaths(&self) -> Vec<UnitId> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                GatewayEvent::Died(unit) => Some(*unit),
                _ => None,
            })
            .collect()
    }

    /// Tiles entered by `unit`, in order.
    #[must_use]
    pub fn steps_of(&self, unit: UnitId) -> Vec<GridCoord> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match *event {
                GatewayEvent::Moved { unit: u, to, .. } if u == unit => Some(to),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: GatewayEvent) {
        self.events.borrow_mut().push(event);
    }
}

impl PresentationGateway for RecordingGateway {
    fn unit_moved(&mut self, unit: UnitId, from: GridCoord, to: GridCoord, facing: CardinalDirection) {
        self.push(GatewayEvent::Moved { unit, from, to, facing });
    }

    fn unit_attacked(&mut self, outcome: &AttackOutcome) {
        self.push(GatewayEvent::Attacked(*outcome));
    }

    fn unit_died(&mut self, unit: UnitId) {
        self.push(GatewayEvent::Died(unit));
    }

    fn turn_started(&mut self, team: TeamColor) {
        self.push(GatewayEvent::TurnStarted(team));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_log() {
        let gateway = RecordingGateway::new();
        let mut handle = gateway.boxed();
        handle.unit_died(UnitId(3));
        handle.turn_started(TeamColor::Blue);

        assert_eq!(gateway.len(), 2);
        assert_eq!(gateway.deaths(), vec![UnitId(3)]);
        assert_eq!(gateway.take().len(), 2);
        assert!(gateway.is_empty());
    }
}

//! Turn order state machine.
//!
//! Teams take turns in a fixed rotation. A team with no units left is
//! skipped, unless no team has units at all. Entering a team's turn clears
//! the moved/attacked flags of that team's units, and only those, before any
//! turn-start listener runs. [`TurnState::BattleOver`] is terminal.
//!
//! # Listeners
//!
//! Turn-start and turn-end listeners are registered under a name and run in
//! registration order, exactly once per transition. Dispatch happens while
//! the controller is mutably borrowed, so a listener has no way to reach the
//! controller and cannot add or remove listeners from inside its own
//! callback.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::team::{Team, TeamColor};
use crate::unit::{Unit, UnitRegistry};

/// Callback invoked with the team whose turn starts or ends.
pub type TurnListener = Box<dyn FnMut(TeamColor)>;

/// Current phase of the battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnState {
    /// Teams are registered but no turn has begun.
    NotStarted,
    /// It is this team's turn.
    Active(TeamColor),
    /// The battle has ended.
    BattleOver {
        /// Last team standing, `None` for a draw.
        winner: Option<TeamColor>,
    },
}

/// Report of one `end_turn` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTransition {
    /// Team whose turn ended.
    pub ended: TeamColor,
    /// Team whose turn started.
    pub started: TeamColor,
    /// Round number after the transition.
    pub round: u32,
    /// Number of units whose flags were reset.
    pub units_reset: usize,
}

/// Ordered, named listener list.
#[derive(Default)]
struct ListenerList {
    entries: Vec<(String, TurnListener)>,
}

impl ListenerList {
    fn add(&mut self, name: &str, listener: TurnListener) -> Result<()> {
        if self.entries.iter().any(|(existing, _)| existing == name) {
            return Err(BattleError::DuplicateListener(name.to_string()));
        }
        self.entries.push((name.to_string(), listener));
        Ok(())
    }

    fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| existing != name);
        self.entries.len() != before
    }

    fn dispatch(&mut self, team: TeamColor) {
        for (_, listener) in &mut self.entries {
            listener(team);
        }
    }

    fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }
}

impl fmt::Debug for ListenerList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Drives turn order and per-turn unit resets.
#[derive(Debug)]
pub struct TurnController {
    teams: Vec<Team>,
    active_index: usize,
    state: TurnState,
    round: u32,
    turn_start_listeners: ListenerList,
    turn_end_listeners: ListenerList,
}

impl TurnController {
    /// Create a controller for `teams`, in turn order.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] if `teams` is empty or lists a
    /// color twice.
    pub fn new(teams: Vec<Team>) -> Result<Self> {
        if teams.is_empty() {
            return Err(BattleError::InvalidState("battle needs at least one team".into()));
        }
        for (i, team) in teams.iter().enumerate() {
            if teams[..i].iter().any(|t| t.color == team.color) {
                return Err(BattleError::InvalidState(format!(
                    "team {} registered twice",
                    team.color
                )));
            }
        }

        Ok(Self {
            teams,
            active_index: 0,
            state: TurnState::NotStarted,
            round: 0,
            turn_start_listeners: ListenerList::default(),
            turn_end_listeners: ListenerList::default(),
        })
    }

    /// Current phase.
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.state
    }

    /// Current round, starting at 1 once the battle has started.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.round
    }

    /// Teams in turn order.
    #[must_use]
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Team whose turn it is.
    #[must_use]
    pub const fn active_team(&self) -> Option<TeamColor> {
        match self.state {
            TurnState::Active(team) => Some(team),
            _ => None,
        }
    }

    /// Whether the active team is controlled by a local player.
    #[must_use]
    pub fn is_players_turn(&self) -> bool {
        matches!(self.state, TurnState::Active(_)) && self.teams[self.active_index].player_controlled
    }

    /// Whether the battle has ended.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        matches!(self.state, TurnState::BattleOver { .. })
    }

    /// Whether `unit` may still act: its team is active and it has not both
    /// moved and attacked this round.
    #[must_use]
    pub fn can_act(&self, unit: &Unit) -> bool {
        self.active_team() == Some(unit.team()) && unit.has_action_left()
    }

    /// Open the first team's turn, skipping leading teams with no units.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] if the battle has already
    /// started, or [`BattleError::BattleOver`] if it has ended.
    pub fn start(&mut self, registry: &mut UnitRegistry) -> Result<TeamColor> {
        match self.state {
            TurnState::NotStarted => {}
            TurnState::Active(_) => {
                return Err(BattleError::InvalidState("battle already started".into()))
            }
            TurnState::BattleOver { .. } => return Err(BattleError::BattleOver),
        }

        self.round = 1;
        self.active_index = self.next_fielded(0, &registry.teams_with_units());
        let team = self.teams[self.active_index].color;
        self.enter_turn(team, registry);
        Ok(team)
    }

    /// End the active team's turn and start the next team's.
    ///
    /// Order: turn-end listeners for the old team, flag reset for the new
    /// team, turn-start listeners for the new team.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::BattleOver`] after the battle has ended, or
    /// [`BattleError::InvalidState`] before it has started.
    pub fn end_turn(&mut self, registry: &mut UnitRegistry) -> Result<TurnTransition> {
        let ended = match self.state {
            TurnState::Active(team) => team,
            TurnState::NotStarted => {
                return Err(BattleError::InvalidState("battle not started".into()))
            }
            TurnState::BattleOver { .. } => return Err(BattleError::BattleOver),
        };

        self.turn_end_listeners.dispatch(ended);

        let previous = self.active_index;
        self.active_index = self.next_fielded(previous + 1, &registry.teams_with_units());
        if self.active_index <= previous {
            self.round += 1;
        }
        let started = self.teams[self.active_index].color;
        let units_reset = self.enter_turn(started, registry);

        Ok(TurnTransition {
            ended,
            started,
            round: self.round,
            units_reset,
        })
    }

    /// Enter the terminal state. Has no effect if the battle is already over.
    pub fn finish(&mut self, winner: Option<TeamColor>) {
        if self.is_over() {
            return;
        }
        tracing::info!(winner = ?winner, round = self.round, "Battle over");
        self.state = TurnState::BattleOver { winner };
    }

    /// Index of the first team at or after `from`, wrapping around, that
    /// has units in `fielded`. Any team qualifies when `fielded` is empty.
    fn next_fielded(&self, from: usize, fielded: &BTreeSet<TeamColor>) -> usize {
        let count = self.teams.len();
        (0..count)
            .map(|offset| (from + offset) % count)
            .find(|&index| {
                let color = self.teams[index].color;
                let qualifies = fielded.is_empty() || fielded.contains(&color);
                if !qualifies {
                    tracing::debug!(team = %color, "Skipping team with no units");
                }
                qualifies
            })
            .unwrap_or(from % count)
    }

    fn enter_turn(&mut self, team: TeamColor, registry: &mut UnitRegistry) -> usize {
        let units_reset = registry.reset_team(team);
        self.state = TurnState::Active(team);
        tracing::info!(team = %team, round = self.round, units_reset, "Turn started");

        self.turn_start_listeners.dispatch(team);
        units_reset
    }

    /// Register a turn-start listener under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DuplicateListener`] if the name is taken.
    pub fn add_turn_start_listener(
        &mut self,
        name: &str,
        listener: impl FnMut(TeamColor) + 'static,
    ) -> Result<()> {
        self.turn_start_listeners.add(name, Box::new(listener))
    }

    /// Register a turn-end listener under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DuplicateListener`] if the name is taken.
    pub fn add_turn_end_listener(
        &mut self,
        name: &str,
        listener: impl FnMut(TeamColor) + 'static,
    ) -> Result<()> {
        self.turn_end_listeners.add(name, Box::new(listener))
    }

    /// Remove a turn-start listener. Returns `false` if none had that name.
    pub fn remove_turn_start_listener(&mut self, name: &str) -> bool {
        self.turn_start_listeners.remove(name)
    }

    /// Remove a turn-end listener. Returns `false` if none had that name.
    pub fn remove_turn_end_listener(&mut self, name: &str) -> bool {
        self.turn_end_listeners.remove(name)
    }
}

//! The battle session: one object owning every component of a battle.
//!
//! [`BattleSession`] holds the balancing table, the unit registry, the
//! pathfinding engine, the turn controller, the movement scheduler and the
//! presentation gateway, and enforces the action rules across them:
//!
//! - only units of the active team act,
//! - a unit moves at most once and attacks at most once per round,
//! - attacking ends the unit's movement for the round,
//! - a completed move with nothing in range ends the unit's round,
//! - tiles a moving unit has yet to enter are treated as occupied,
//! - the battle ends once only one team has units left.
//!
//! # Example
//!
//! ```
//! use tactics_core::prelude::*;
//!
//! let table = UnitBalancingTable::from_entries([(
//!     UnitType::Infantry,
//!     UnitBalancing {
//!         health: 10,
//!         damage: 5,
//!         attack_range: 2,
//!         movement: Fixed::from_num(3),
//!         unit_meta_type: UnitMetaType::Infantry,
//!         attackable_unit_meta_types: [UnitMetaType::Infantry].into_iter().collect(),
//!     },
//! )])?;
//! let teams = vec![Team::player(TeamColor::Red), Team::remote(TeamColor::Blue)];
//! let mut session = BattleSession::new(table, TileMap::new(5, 5), teams, Box::new(NullGateway))?;
//!
//! let a = session.spawn_unit(TeamColor::Red, UnitType::Infantry, GridCoord::new(0, 0))?;
//! let b = session.spawn_unit(TeamColor::Blue, UnitType::Infantry, GridCoord::new(0, 2))?;
//! session.start()?;
//!
//! session.attack(a, b)?;
//! assert_eq!(session.units().get(b).map(Unit::current_health), Some(5));
//! # Ok::<(), BattleError>(())
//! ```

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};

use serde::Serialize;

use crate::balancing::{UnitBalancingTable, UnitType};
use crate::combat::{AttackOutcome, CombatResolver};
use crate::data::ScenarioData;
use crate::error::{BattleError, Result};
use crate::grid::GridCoord;
use crate::map::{MapService, TileMap};
use crate::math::Fixed;
use crate::movement::{MoveCompletion, MovementScheduler};
use crate::pathfinding::{PathfindingEngine, RouteSearch};
use crate::presentation::PresentationGateway;
use crate::route::Route;
use crate::team::{Team, TeamColor};
use crate::turn::{TurnController, TurnState, TurnTransition};
use crate::unit::{Unit, UnitId, UnitRegistry};

/// What a selected unit may do right now.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionOptions {
    /// Tiles the unit may move to. Empty once it has moved.
    pub walkable: BTreeSet<GridCoord>,
    /// Units the unit may attack. Empty once it has attacked.
    pub attackable: BTreeSet<UnitId>,
}

impl ActionOptions {
    /// Whether the unit has nothing to do.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.walkable.is_empty() && self.attackable.is_empty()
    }
}

#[derive(Serialize)]
struct Snapshot<'a> {
    state: TurnState,
    round: u32,
    units: Vec<&'a Unit>,
}

/// A running battle.
pub struct BattleSession<M = TileMap> {
    balancing: UnitBalancingTable,
    registry: UnitRegistry,
    pathfinding: PathfindingEngine<M>,
    turns: TurnController,
    movement: MovementScheduler,
    gateway: Box<dyn PresentationGateway>,
}

impl BattleSession<TileMap> {
    /// Build a session from scenario data, spawning its starting units.
    ///
    /// # Errors
    ///
    /// Fails if the map rows are malformed, the team list is invalid, or a
    /// placement names an unknown unit type or an unavailable tile.
    pub fn from_scenario(
        balancing: UnitBalancingTable,
        scenario: &ScenarioData,
        gateway: Box<dyn PresentationGateway>,
    ) -> Result<Self> {
        let map = scenario.tile_map()?;
        let mut session = Self::new(balancing, map, scenario.teams(), gateway)?;
        for placement in &scenario.units {
            session.spawn_unit(placement.team, placement.unit_type, placement.position())?;
        }
        tracing::info!(
            scenario = %scenario.name,
            units = session.registry.len(),
            "Scenario loaded"
        );
        Ok(session)
    }
}

impl<M: MapService> BattleSession<M> {
    /// Create an empty battle on `map` with `teams` in turn order.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] if the team list is empty or
    /// repeats a color.
    pub fn new(
        balancing: UnitBalancingTable,
        map: M,
        teams: Vec<Team>,
        gateway: Box<dyn PresentationGateway>,
    ) -> Result<Self> {
        Ok(Self {
            balancing,
            registry: UnitRegistry::new(),
            pathfinding: PathfindingEngine::new(map),
            turns: TurnController::new(teams)?,
            movement: MovementScheduler::default(),
            gateway,
        })
    }

    /// Use `speed` tiles per tick for future moves.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] if `speed` is not positive or a
    /// move is in progress.
    pub fn with_move_speed(mut self, speed: Fixed) -> Result<Self> {
        if !self.movement.is_empty() {
            return Err(BattleError::InvalidState("cannot change speed while units move".into()));
        }
        self.movement = MovementScheduler::new(speed)?;
        Ok(self)
    }

    /// Balancing table in use.
    #[must_use]
    pub const fn balancing(&self) -> &UnitBalancingTable {
        &self.balancing
    }

    /// Live units.
    #[must_use]
    pub const fn units(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Map service.
    #[must_use]
    pub const fn map(&self) -> &M {
        self.pathfinding.map()
    }

    /// Movement scheduler.
    #[must_use]
    pub const fn movement(&self) -> &MovementScheduler {
        &self.movement
    }

    /// Current turn phase.
    #[must_use]
    pub const fn state(&self) -> TurnState {
        self.turns.state()
    }

    /// Current round.
    #[must_use]
    pub const fn round(&self) -> u32 {
        self.turns.round()
    }

    /// Team whose turn it is.
    #[must_use]
    pub const fn active_team(&self) -> Option<TeamColor> {
        self.turns.active_team()
    }

    /// Whether a local player controls the active team.
    #[must_use]
    pub fn is_players_turn(&self) -> bool {
        self.turns.is_players_turn()
    }

    /// Whether `unit` may still act this turn.
    #[must_use]
    pub fn can_act(&self, unit: UnitId) -> bool {
        self.registry.get(unit).is_some_and(|u| self.turns.can_act(u))
    }

    /// Register a turn-start listener. See [`TurnController`].
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DuplicateListener`] if the name is taken.
    pub fn add_turn_start_listener(
        &mut self,
        name: &str,
        listener: impl FnMut(TeamColor) + 'static,
    ) -> Result<()> {
        self.turns.add_turn_start_listener(name, listener)
    }

    /// Register a turn-end listener. See [`TurnController`].
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DuplicateListener`] if the name is taken.
    pub fn add_turn_end_listener(
        &mut self,
        name: &str,
        listener: impl FnMut(TeamColor) + 'static,
    ) -> Result<()> {
        self.turns.add_turn_end_listener(name, listener)
    }

    /// Remove a turn-start listener by name.
    pub fn remove_turn_start_listener(&mut self, name: &str) -> bool {
        self.turns.remove_turn_start_listener(name)
    }

    /// Remove a turn-end listener by name.
    pub fn remove_turn_end_listener(&mut self, name: &str) -> bool {
        self.turns.remove_turn_end_listener(name)
    }

    /// Place a new unit with full health from its balancing entry.
    ///
    /// # Errors
    ///
    /// - [`BattleError::UnknownUnitType`] if `unit_type` has no balancing entry
    /// - [`BattleError::InvalidState`] if `team` is not in this battle
    /// - [`BattleError::TileUnavailable`] if the tile is blocked, off the map,
    ///   occupied or on the way of a moving unit
    pub fn spawn_unit(&mut self, team: TeamColor, unit_type: UnitType, position: GridCoord) -> Result<UnitId> {
        let health = self.balancing.get(unit_type)?.health;
        if !self.turns.teams().iter().any(|t| t.color == team) {
            return Err(BattleError::InvalidState(format!("team {team} is not in this battle")));
        }
        if !self.map().is_walkable(position)
            || self.registry.occupant_at(position).is_some()
            || self.movement.reserved_tiles(None).contains(&position)
        {
            return Err(BattleError::TileUnavailable(position));
        }

        let id = self.registry.spawn(team, unit_type, position, health)?;
        tracing::debug!(unit = %id, team = %team, unit_type = ?unit_type, at = %position, "Unit spawned");
        Ok(id)
    }

    /// Open the first team's turn.
    ///
    /// # Errors
    ///
    /// See [`TurnController::start`].
    pub fn start(&mut self) -> Result<TeamColor> {
        let team = self.turns.start(&mut self.registry)?;
        self.gateway.turn_started(team);
        Ok(team)
    }

    /// End the active team's turn.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] while a move is in progress,
    /// otherwise see [`TurnController::end_turn`].
    pub fn end_turn(&mut self) -> Result<TurnTransition> {
        if !self.movement.is_empty() {
            return Err(BattleError::InvalidState("units are still moving".into()));
        }
        let transition = self.turns.end_turn(&mut self.registry)?;
        self.gateway.turn_started(transition.started);
        Ok(transition)
    }

    /// Tiles `unit` could reach with its full movement budget.
    ///
    /// Does not consider whether the unit may act. Tiles other moving units
    /// have yet to enter are excluded.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnit`] or [`BattleError::UnknownUnitType`].
    pub fn walkable_tiles(&self, unit_id: UnitId) -> Result<BTreeSet<GridCoord>> {
        let unit = self.registry.require(unit_id)?;
        let budget = self.balancing.get(unit.unit_type())?.movement;
        let reserved = self.movement.reserved_tiles(Some(unit_id));
        Ok(self
            .pathfinding
            .walkable_tiles_avoiding(unit, budget, &self.registry, &reserved))
    }

    /// Best route for `unit` to `destination` with its full movement budget,
    /// avoiding tiles other moving units have yet to enter.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnit`] or [`BattleError::UnknownUnitType`].
    pub fn best_route(&self, unit_id: UnitId, destination: GridCoord) -> Result<RouteSearch> {
        let unit = self.registry.require(unit_id)?;
        let budget = self.balancing.get(unit.unit_type())?.movement;
        let reserved = self.movement.reserved_tiles(Some(unit_id));
        Ok(self
            .pathfinding
            .best_route_avoiding(unit, destination, budget, &self.registry, &reserved))
    }

    /// Units `unit` could attack from where it stands.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnit`] or [`BattleError::UnknownUnitType`].
    pub fn attackable_units(&self, unit: UnitId) -> Result<BTreeSet<UnitId>> {
        CombatResolver::new(&self.balancing).find_attackable_units(unit, &self.registry)
    }

    /// Move and attack options for a selected unit.
    ///
    /// Both sets are empty when the unit may not act or is mid-move.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnit`] or [`BattleError::UnknownUnitType`].
    pub fn action_options(&self, unit_id: UnitId) -> Result<ActionOptions> {
        let unit = self.registry.require(unit_id)?;
        if !self.turns.can_act(unit) || self.movement.is_moving(unit_id) {
            return Ok(ActionOptions::default());
        }

        let walkable = if unit.has_moved_this_round() {
            BTreeSet::new()
        } else {
            self.walkable_tiles(unit_id)?
        };
        let attackable = if unit.has_attacked_this_round() {
            BTreeSet::new()
        } else {
            self.attackable_units(unit_id)?
        };
        Ok(ActionOptions { walkable, attackable })
    }

    fn acting_unit(&self, id: UnitId) -> Result<&Unit> {
        if self.turns.is_over() {
            return Err(BattleError::BattleOver);
        }
        let unit = self.registry.require(id)?;
        let reason = if self.turns.active_team() != Some(unit.team()) {
            "not this unit's turn"
        } else if !unit.has_action_left() {
            "no actions left this round"
        } else if self.movement.is_moving(id) {
            "still moving"
        } else {
            return Ok(unit);
        };
        Err(BattleError::UnitCannotAct { unit: id, reason })
    }

    /// Start moving `unit` to `destination`. The move plays out over later
    /// [`tick`](Self::tick) calls; `on_complete` runs when it ends.
    ///
    /// # Errors
    ///
    /// - [`BattleError::BattleOver`] after the battle has ended
    /// - [`BattleError::UnitCannotAct`] if the unit is not on the active
    ///   team, has already moved, or is mid-move
    /// - [`BattleError::TileUnavailable`] if another moving unit has yet to
    ///   enter `destination`
    /// - [`BattleError::NoPathFound`] if `destination` is out of reach
    pub fn begin_move(
        &mut self,
        unit_id: UnitId,
        destination: GridCoord,
        on_complete: impl FnOnce(&MoveCompletion) + 'static,
    ) -> Result<Route> {
        let unit = self.acting_unit(unit_id)?;
        if unit.has_moved_this_round() {
            return Err(BattleError::UnitCannotAct {
                unit: unit_id,
                reason: "already moved this round",
            });
        }
        if self.movement.reserved_tiles(Some(unit_id)).contains(&destination) {
            return Err(BattleError::TileUnavailable(destination));
        }

        let from = unit.position();
        let route = self.best_route(unit_id, destination)?.into_result(from, destination)?;
        self.movement
            .start(unit_id, route.clone(), Box::new(on_complete))?;

        tracing::debug!(unit = %unit_id, from = %from, to = %destination, steps = route.step_count(), "Move started");
        Ok(route)
    }

    /// Advance every in-flight move by one tick.
    ///
    /// A unit that finishes its move with no attackable unit in range has
    /// its round ended. Completion callbacks run after that, so they see the
    /// unit's final flags.
    pub fn tick(&mut self) -> Vec<MoveCompletion> {
        let finished = self.movement.tick(&mut self.registry, self.gateway.as_mut());

        finished
            .into_iter()
            .map(|done| {
                self.end_action_without_targets(done.completion().unit);
                done.complete()
            })
            .collect()
    }

    fn end_action_without_targets(&mut self, unit_id: UnitId) {
        match self.attackable_units(unit_id) {
            Ok(targets) if targets.is_empty() => {
                if let Some(unit) = self.registry.get_mut(unit_id) {
                    unit.mark_attacked();
                    tracing::debug!(unit = %unit_id, "No targets after move, action ended");
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(unit = %unit_id, error = %e, "Could not look up targets after move");
            }
        }
    }

    /// Attack `defender` with `attacker`.
    ///
    /// If the defender dies and only one team still has units, the battle
    /// ends with that team as winner.
    ///
    /// # Errors
    ///
    /// - [`BattleError::BattleOver`] after the battle has ended
    /// - [`BattleError::UnitCannotAct`] if the attacker is not on the active
    ///   team, has already attacked, or is mid-move
    /// - [`BattleError::InvalidTarget`] if `defender` is not attackable
    pub fn attack(&mut self, attacker: UnitId, defender: UnitId) -> Result<AttackOutcome> {
        self.acting_unit(attacker)?;

        let outcome = CombatResolver::new(&self.balancing).resolve_attack(
            attacker,
            defender,
            &mut self.registry,
            self.gateway.as_mut(),
        )?;

        if outcome.defender_died {
            let remaining = self.registry.teams_with_units();
            if remaining.len() <= 1 {
                self.turns.finish(remaining.into_iter().next());
            }
        }
        Ok(outcome)
    }

    /// Bytes of the battle state: turn state, round and every unit in id
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] if encoding fails.
    pub fn snapshot_bytes(&self) -> Result<Vec<u8>> {
        let snapshot = Snapshot {
            state: self.turns.state(),
            round: self.turns.round(),
            units: self.registry.all(),
        };
        bincode::serialize(&snapshot)
            .map_err(|e| BattleError::InvalidState(format!("failed to encode battle state: {e}")))
    }

    /// Hash of [`snapshot_bytes`](Self::snapshot_bytes). Identical battles
    /// give identical hashes.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] if encoding fails.
    pub fn state_hash(&self) -> Result<u64> {
        let bytes = self.snapshot_bytes()?;
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(hasher.finish())
    }
}

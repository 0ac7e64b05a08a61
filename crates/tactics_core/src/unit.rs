//! Units and the live unit registry.
//!
//! A [`Unit`] holds the mutable per-battle state of one unit. The
//! [`UnitRegistry`] owns every live unit; a unit's lifetime runs from
//! registration until it dies or the battle ends.
//!
//! # Invariants
//!
//! - `current_health <= max_health` (health is unsigned, so never negative).
//! - `has_attacked_this_round` implies `has_moved_this_round`. The attacked
//!   flag can only be set through [`Unit::mark_attacked`], which also sets
//!   the moved flag.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::balancing::UnitType;
use crate::error::{BattleError, Result};
use crate::grid::GridCoord;
use crate::math::Fixed;
use crate::team::TeamColor;

/// Unique identifier for units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Health change produced by [`Unit::take_damage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthChange {
    /// Health before the hit.
    pub before: u32,
    /// Health after the hit.
    pub after: u32,
}

impl HealthChange {
    /// Whether this hit brought the unit to zero health.
    #[must_use]
    pub const fn is_lethal(&self) -> bool {
        self.after == 0
    }
}

/// Per-battle state of a single unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    id: UnitId,
    team: TeamColor,
    unit_type: UnitType,
    position: GridCoord,
    current_health: u32,
    max_health: u32,
    has_moved_this_round: bool,
    has_attacked_this_round: bool,
}

impl Unit {
    /// Create a unit at full health with fresh turn flags.
    #[must_use]
    pub const fn new(
        id: UnitId,
        team: TeamColor,
        unit_type: UnitType,
        position: GridCoord,
        max_health: u32,
    ) -> Self {
        Self {
            id,
            team,
            unit_type,
            position,
            current_health: max_health,
            max_health,
            has_moved_this_round: false,
            has_attacked_this_round: false,
        }
    }

    /// Unit identifier.
    #[must_use]
    pub const fn id(&self) -> UnitId {
        self.id
    }

    /// Owning team.
    #[must_use]
    pub const fn team(&self) -> TeamColor {
        self.team
    }

    /// Unit type, the key into the balancing table.
    #[must_use]
    pub const fn unit_type(&self) -> UnitType {
        self.unit_type
    }

    /// Current tile.
    #[must_use]
    pub const fn position(&self) -> GridCoord {
        self.position
    }

    /// Current health.
    #[must_use]
    pub const fn current_health(&self) -> u32 {
        self.current_health
    }

    /// Maximum health.
    #[must_use]
    pub const fn max_health(&self) -> u32 {
        self.max_health
    }

    /// Whether the unit has moved this round.
    #[must_use]
    pub const fn has_moved_this_round(&self) -> bool {
        self.has_moved_this_round
    }

    /// Whether the unit has attacked this round.
    #[must_use]
    pub const fn has_attacked_this_round(&self) -> bool {
        self.has_attacked_this_round
    }

    /// Whether the unit has anything left to do this round, ignoring whose
    /// turn it is.
    #[must_use]
    pub const fn has_action_left(&self) -> bool {
        !self.has_moved_this_round || !self.has_attacked_this_round
    }

    /// Remaining health as a fraction of maximum (0 to 1).
    ///
    /// Used for health bars and as a health-based damage modifier.
    #[must_use]
    pub fn health_fraction(&self) -> Fixed {
        if self.max_health == 0 {
            return Fixed::ZERO;
        }
        Fixed::from_num(self.current_health) / Fixed::from_num(self.max_health)
    }

    /// Subtract damage, clamping health to `[0, max_health]`.
    pub fn take_damage(&mut self, damage: u32) -> HealthChange {
        let before = self.current_health;
        self.current_health = before.saturating_sub(damage).min(self.max_health);
        HealthChange {
            before,
            after: self.current_health,
        }
    }

    /// Record that the unit moved this round.
    pub fn mark_moved(&mut self) {
        self.has_moved_this_round = true;
    }

    /// Record that the unit attacked this round.
    ///
    /// An attack always ends the unit's movement for the round as well.
    pub fn mark_attacked(&mut self) {
        self.has_attacked_this_round = true;
        self.has_moved_this_round = true;
    }

    /// Clear both turn flags at the start of the owning team's turn.
    pub fn reset_for_turn(&mut self) {
        self.has_moved_this_round = false;
        self.has_attacked_this_round = false;
    }

    /// Move the unit's simplified position.
    pub(crate) fn set_position(&mut self, position: GridCoord) {
        self.position = position;
    }
}

/// Owner of all live units.
///
/// Uses a `HashMap` for O(1) lookup by ID, with deterministic iteration
/// via sorted IDs everywhere order matters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnitRegistry {
    units: HashMap<UnitId, Unit>,
    next_id: u32,
}

impl UnitRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            units: HashMap::new(),
            next_id: 1,
        }
    }

    /// Register an already constructed unit.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DuplicateUnit`] if the ID is taken.
    pub fn add(&mut self, unit: Unit) -> Result<UnitId> {
        let id = unit.id();
        if self.units.contains_key(&id) {
            return Err(BattleError::DuplicateUnit(id));
        }
        self.next_id = self.next_id.max(id.0.saturating_add(1));
        self.units.insert(id, unit);
        Ok(id)
    }

    /// Create and register a unit with the next free ID.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] once IDs up to `u32::MAX` have
    /// been handed out.
    pub fn spawn(
        &mut self,
        team: TeamColor,
        unit_type: UnitType,
        position: GridCoord,
        max_health: u32,
    ) -> Result<UnitId> {
        let id = UnitId(self.next_id.max(1));
        if self.units.contains_key(&id) {
            return Err(BattleError::InvalidState(format!("unit ids exhausted at {id}")));
        }
        self.next_id = id.0.saturating_add(1);
        self.units
            .insert(id, Unit::new(id, team, unit_type, position, max_health));
        Ok(id)
    }

    /// Remove a unit by ID.
    pub fn remove(&mut self, id: UnitId) -> Option<Unit> {
        self.units.remove(&id)
    }

    /// Get a unit by ID.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    /// Get a mutable reference to a unit by ID.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Get a unit by ID, failing with [`BattleError::UnknownUnit`].
    pub fn require(&self, id: UnitId) -> Result<&Unit> {
        self.get(id).ok_or(BattleError::UnknownUnit(id))
    }

    /// Mutable variant of [`require`](Self::require).
    pub fn require_mut(&mut self, id: UnitId) -> Result<&mut Unit> {
        self.units.get_mut(&id).ok_or(BattleError::UnknownUnit(id))
    }

    /// Check if a unit exists.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.units.contains_key(&id)
    }

    /// Number of live units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Sorted unit IDs for deterministic iteration.
    #[must_use]
    pub fn sorted_ids(&self) -> Vec<UnitId> {
        let mut ids: Vec<_> = self.units.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// All live units in ascending ID order.
    #[must_use]
    pub fn all(&self) -> Vec<&Unit> {
        let mut units: Vec<_> = self.units.values().collect();
        units.sort_unstable_by_key(|u| u.id());
        units
    }

    /// Units of one team in ascending ID order.
    #[must_use]
    pub fn units_of_team(&self, team: TeamColor) -> Vec<&Unit> {
        self.all().into_iter().filter(|u| u.team() == team).collect()
    }

    /// Unit standing on `coord`, if any.
    #[must_use]
    pub fn occupant_at(&self, coord: GridCoord) -> Option<&Unit> {
        self.all().into_iter().find(|u| u.position() == coord)
    }

    /// Teams that still have at least one live unit.
    #[must_use]
    pub fn teams_with_units(&self) -> BTreeSet<TeamColor> {
        self.units.values().map(Unit::team).collect()
    }

    /// Clear the turn flags of every unit on `team`, returning how many
    /// units were reset.
    pub fn reset_team(&mut self, team: TeamColor) -> usize {
        let mut count = 0;
        for unit in self.units.values_mut().filter(|u| u.team() == team) {
            unit.reset_for_turn();
            count += 1;
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: u32, team: TeamColor, x: i32, y: i32) -> Unit {
        Unit::new(UnitId(id), team, UnitType::Infantry, GridCoord::new(x, y), 10)
    }

    #[test]
    fn test_take_damage_clamps_at_zero() {
        let mut u = unit(1, TeamColor::Red, 0, 0);
        let change = u.take_damage(4);
        assert_eq!(change, HealthChange { before: 10, after: 6 });
        assert!(!change.is_lethal());

        let change = u.take_damage(100);
        assert_eq!(change.after, 0);
        assert!(change.is_lethal());
        assert_eq!(u.current_health(), 0);
    }

    #[test]
    fn test_mark_attacked_also_marks_moved() {
        let mut u = unit(1, TeamColor::Red, 0, 0);
        assert!(u.has_action_left());
        u.mark_attacked();
        assert!(u.has_attacked_this_round());
        assert!(u.has_moved_this_round());
        assert!(!u.has_action_left());

        u.reset_for_turn();
        assert!(!u.has_moved_this_round());
        assert!(!u.has_attacked_this_round());
    }

    #[test]
    fn test_moved_unit_still_has_action() {
        let mut u = unit(1, TeamColor::Red, 0, 0);
        u.mark_moved();
        assert!(u.has_action_left());
        assert!(!u.has_attacked_this_round());
    }

    #[test]
    fn test_health_fraction() {
        let mut u = unit(1, TeamColor::Red, 0, 0);
        assert_eq!(u.health_fraction(), Fixed::ONE);
        u.take_damage(5);
        assert_eq!(u.health_fraction(), Fixed::from_num(0.5));
    }

    #[test]
    fn test_registry_add_rejects_duplicates() {
        let mut registry = UnitRegistry::new();
        registry.add(unit(3, TeamColor::Red, 0, 0)).unwrap();
        assert_eq!(
            registry.add(unit(3, TeamColor::Blue, 1, 0)),
            Err(BattleError::DuplicateUnit(UnitId(3)))
        );

        // Spawned IDs never collide with added ones.
        let spawned = registry.spawn(TeamColor::Blue, UnitType::Tank, GridCoord::new(2, 0), 20);
        assert_eq!(spawned, Ok(UnitId(4)));
    }

    #[test]
    fn test_spawn_fails_when_ids_run_out() {
        let mut registry = UnitRegistry::new();
        registry.add(unit(u32::MAX, TeamColor::Red, 0, 0)).unwrap();

        assert!(matches!(
            registry.spawn(TeamColor::Blue, UnitType::Tank, GridCoord::new(1, 0), 20),
            Err(BattleError::InvalidState(_))
        ));
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(UnitId(u32::MAX)).map(Unit::team), Some(TeamColor::Red));

        let mut registry = UnitRegistry::new();
        registry.add(unit(u32::MAX - 1, TeamColor::Red, 0, 0)).unwrap();
        let last = registry.spawn(TeamColor::Blue, UnitType::Tank, GridCoord::new(1, 0), 20);
        assert_eq!(last, Ok(UnitId(u32::MAX)));
        assert!(registry
            .spawn(TeamColor::Blue, UnitType::Tank, GridCoord::new(2, 0), 20)
            .is_err());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_registry_sorted_iteration() {
        let mut registry = UnitRegistry::new();
        for id in [5, 2, 9, 1] {
            registry.add(unit(id, TeamColor::Red, id as i32, 0)).unwrap();
        }
        let ids: Vec<_> = registry.all().iter().map(|u| u.id().0).collect();
        assert_eq!(ids, vec![1, 2, 5, 9]);
        assert_eq!(registry.sorted_ids().len(), 4);
    }

    #[test]
    fn test_registry_remove_and_lookup() {
        let mut registry = UnitRegistry::new();
        let id = registry.spawn(TeamColor::Red, UnitType::Infantry, GridCoord::ORIGIN, 10).unwrap();
        assert!(registry.contains(id));
        assert!(registry.remove(id).is_some());
        assert!(registry.get(id).is_none());
        assert_eq!(registry.require(id), Err(BattleError::UnknownUnit(id)));
    }

    #[test]
    fn test_occupant_and_teams() {
        let mut registry = UnitRegistry::new();
        registry.add(unit(1, TeamColor::Red, 0, 0)).unwrap();
        registry.add(unit(2, TeamColor::Blue, 3, 3)).unwrap();
        assert_eq!(registry.occupant_at(GridCoord::new(3, 3)).map(Unit::id), Some(UnitId(2)));
        assert!(registry.occupant_at(GridCoord::new(1, 1)).is_none());
        assert_eq!(
            registry.teams_with_units().into_iter().collect::<Vec<_>>(),
            vec![TeamColor::Red, TeamColor::Blue]
        );
    }

    #[test]
    fn test_reset_team_only_touches_that_team() {
        let mut registry = UnitRegistry::new();
        registry.add(unit(1, TeamColor::Red, 0, 0)).unwrap();
        registry.add(unit(2, TeamColor::Blue, 1, 0)).unwrap();
        for id in [UnitId(1), UnitId(2)] {
            registry.get_mut(id).unwrap().mark_attacked();
        }

        assert_eq!(registry.reset_team(TeamColor::Red), 1);
        assert!(!registry.get(UnitId(1)).unwrap().has_moved_this_round());
        assert!(registry.get(UnitId(2)).unwrap().has_attacked_this_round());
    }
}

//! Range-based targeting and damage resolution.
//!
//! A defender is attackable when all of these hold:
//! - it belongs to a different team than the attacker,
//! - its Manhattan distance from the attacker is within the attacker's range,
//! - its meta-type is in the attacker's attackable set.
//!
//! Friendly units are never targets; support interactions are not modelled.
//!
//! A lethal hit removes the defender from the registry before
//! [`CombatResolver::resolve_attack`] returns, so no later query can observe
//! a zero-health unit.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::balancing::UnitBalancingTable;
use crate::error::{BattleError, Result};
use crate::presentation::PresentationGateway;
use crate::unit::{Unit, UnitId, UnitRegistry};

/// Result of a resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackOutcome {
    /// Attacking unit.
    pub attacker: UnitId,
    /// Unit that was hit.
    pub defender: UnitId,
    /// Health actually removed (never more than the defender had).
    pub damage: u32,
    /// Defender health after the hit.
    pub remaining_health: u32,
    /// Whether the defender died and was removed.
    pub defender_died: bool,
}

/// Targeting and damage rules over a balancing table.
#[derive(Debug, Clone, Copy)]
pub struct CombatResolver<'a> {
    balancing: &'a UnitBalancingTable,
}

impl<'a> CombatResolver<'a> {
    /// Create a resolver reading stats from `balancing`.
    #[must_use]
    pub const fn new(balancing: &'a UnitBalancingTable) -> Self {
        Self { balancing }
    }

    /// Whether `attacker` may target `candidate` right now.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnitType`] if either unit's type has no
    /// balancing entry.
    pub fn can_target(&self, attacker: &Unit, candidate: &Unit) -> Result<bool> {
        if candidate.team() == attacker.team() {
            return Ok(false);
        }

        let attacker_stats = self.balancing.get(attacker.unit_type())?;
        let in_range =
            attacker.position().manhattan_distance(candidate.position()) <= attacker_stats.attack_range;
        if !in_range {
            return Ok(false);
        }

        let candidate_stats = self.balancing.get(candidate.unit_type())?;
        Ok(attacker_stats.can_target(candidate_stats.unit_meta_type))
    }

    /// Live units `attacker_id` may attack. Empty when none qualify.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnit`] if the attacker is not registered,
    /// or [`BattleError::UnknownUnitType`] for missing balancing entries.
    pub fn find_attackable_units(
        &self,
        attacker_id: UnitId,
        registry: &UnitRegistry,
    ) -> Result<BTreeSet<UnitId>> {
        let attacker = registry.require(attacker_id)?;
        self.balancing.get(attacker.unit_type())?;

        let mut targets = BTreeSet::new();
        for candidate in registry.all() {
            if self.can_target(attacker, candidate)? {
                targets.insert(candidate.id());
            }
        }
        Ok(targets)
    }

    /// Apply one attack from `attacker_id` to `defender_id`.
    ///
    /// Marks the attacker as having attacked and moved, removes the defender
    /// if its health reaches zero, then notifies `gateway`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidTarget`] if the defender is not in
    /// [`find_attackable_units`](Self::find_attackable_units) for the
    /// attacker, including when it no longer exists. Nothing is mutated on
    /// error.
    pub fn resolve_attack(
        &self,
        attacker_id: UnitId,
        defender_id: UnitId,
        registry: &mut UnitRegistry,
        gateway: &mut dyn PresentationGateway,
    ) -> Result<AttackOutcome> {
        let attacker = registry.require(attacker_id)?;
        let damage = self.balancing.get(attacker.unit_type())?.damage;

        let valid = match registry.get(defender_id) {
            Some(defender) => self.can_target(attacker, defender)?,
            None => false,
        };
        if !valid {
            return Err(BattleError::InvalidTarget {
                attacker: attacker_id,
                defender: defender_id,
            });
        }

        let change = registry.require_mut(defender_id)?.take_damage(damage);
        registry.require_mut(attacker_id)?.mark_attacked();

        let defender_died = change.is_lethal();
        if defender_died {
            registry.remove(defender_id);
        }

        let outcome = AttackOutcome {
            attacker: attacker_id,
            defender: defender_id,
            damage: change.before - change.after,
            remaining_health: change.after,
            defender_died,
        };

        tracing::debug!(
            attacker = %attacker_id,
            defender = %defender_id,
            damage = outcome.damage,
            remaining = outcome.remaining_health,
            "Attack resolved"
        );
        gateway.unit_attacked(&outcome);

        if defender_died {
            tracing::info!(unit = %defender_id, killer = %attacker_id, "Unit destroyed");
            gateway.unit_died(defender_id);
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancing::{UnitBalancing, UnitMetaType, UnitType};
    use crate::grid::GridCoord;
    use crate::math::Fixed;
    use crate::presentation::NullGateway;
    use crate::team::TeamColor;

    fn stats(
        health: u32,
        damage: u32,
        range: u32,
        meta: UnitMetaType,
        targets: &[UnitMetaType],
    ) -> UnitBalancing {
        UnitBalancing {
            health,
            damage,
            attack_range: range,
            movement: Fixed::from_num(3),
            unit_meta_type: meta,
            attackable_unit_meta_types: targets.iter().copied().collect(),
        }
    }

    fn table() -> UnitBalancingTable {
        use UnitMetaType::{Air, Infantry, Vehicle};
        UnitBalancingTable::from_entries([
            (UnitType::Infantry, stats(10, 5, 2, Infantry, &[Infantry, Vehicle])),
            (UnitType::Tank, stats(20, 8, 1, Vehicle, &[Infantry, Vehicle])),
            (UnitType::Fighter, stats(12, 6, 1, Air, &[Air])),
        ])
        .unwrap()
    }

    fn spawn(registry: &mut UnitRegistry, team: TeamColor, unit_type: UnitType, x: i32, y: i32) -> UnitId {
        let health = table().get(unit_type).unwrap().health;
        registry.spawn(team, unit_type, GridCoord::new(x, y), health).unwrap()
    }

    #[test]
    fn test_duel_scenario() {
        let table = table();
        let resolver = CombatResolver::new(&table);
        let mut registry = UnitRegistry::new();
        let a = spawn(&mut registry, TeamColor::Red, UnitType::Infantry, 0, 0);
        let b = spawn(&mut registry, TeamColor::Blue, UnitType::Infantry, 0, 2);

        assert!(resolver.find_attackable_units(a, &registry).unwrap().contains(&b));

        let outcome = resolver
            .resolve_attack(a, b, &mut registry, &mut NullGateway)
            .unwrap();
        assert_eq!(outcome.damage, 5);
        assert_eq!(outcome.remaining_health, 5);
        assert!(!outcome.defender_died);

        assert_eq!(registry.get(b).unwrap().current_health(), 5);
        let attacker = registry.get(a).unwrap();
        assert!(attacker.has_attacked_this_round());
        assert!(attacker.has_moved_this_round());
    }

    #[test]
    fn test_lethal_attack_removes_defender() {
        let table = table();
        let resolver = CombatResolver::new(&table);
        let mut registry = UnitRegistry::new();
        let a = spawn(&mut registry, TeamColor::Red, UnitType::Infantry, 0, 0);
        let b = spawn(&mut registry, TeamColor::Blue, UnitType::Infantry, 0, 2);

        resolver.resolve_attack(a, b, &mut registry, &mut NullGateway).unwrap();
        let outcome = resolver.resolve_attack(a, b, &mut registry, &mut NullGateway).unwrap();
        assert!(outcome.defender_died);
        assert_eq!(outcome.remaining_health, 0);
        assert!(registry.get(b).is_none());

        assert_eq!(
            resolver.resolve_attack(a, b, &mut registry, &mut NullGateway),
            Err(BattleError::InvalidTarget { attacker: a, defender: b })
        );
    }

    #[test]
    fn test_overkill_reports_actual_damage() {
        let table = table();
        let resolver = CombatResolver::new(&table);
        let mut registry = UnitRegistry::new();
        let tank = spawn(&mut registry, TeamColor::Red, UnitType::Tank, 0, 0);
        let inf = spawn(&mut registry, TeamColor::Blue, UnitType::Infantry, 1, 0);
        registry.get_mut(inf).unwrap().take_damage(7);

        let outcome = resolver.resolve_attack(tank, inf, &mut registry, &mut NullGateway).unwrap();
        assert_eq!(outcome.damage, 3);
        assert!(outcome.defender_died);
    }

    #[test]
    fn test_same_team_never_attackable() {
        let table = table();
        let resolver = CombatResolver::new(&table);
        let mut registry = UnitRegistry::new();
        let a = spawn(&mut registry, TeamColor::Red, UnitType::Infantry, 0, 0);
        let friend = spawn(&mut registry, TeamColor::Red, UnitType::Infantry, 0, 1);

        assert!(resolver.find_attackable_units(a, &registry).unwrap().is_empty());
        assert_eq!(
            resolver.resolve_attack(a, friend, &mut registry, &mut NullGateway),
            Err(BattleError::InvalidTarget { attacker: a, defender: friend })
        );
        // Rejected attacks leave flags untouched.
        assert!(!registry.get(a).unwrap().has_attacked_this_round());
    }

    #[test]
    fn test_meta_type_gating() {
        let table = table();
        let resolver = CombatResolver::new(&table);
        let mut registry = UnitRegistry::new();
        let inf = spawn(&mut registry, TeamColor::Red, UnitType::Infantry, 0, 0);
        let fighter = spawn(&mut registry, TeamColor::Blue, UnitType::Fighter, 1, 0);
        let tank = spawn(&mut registry, TeamColor::Blue, UnitType::Tank, 0, 1);

        let targets = resolver.find_attackable_units(inf, &registry).unwrap();
        assert!(targets.contains(&tank));
        assert!(!targets.contains(&fighter));

        // The fighter only hits air.
        assert!(resolver.find_attackable_units(fighter, &registry).unwrap().is_empty());
    }

    #[test]
    fn test_range_uses_manhattan_distance() {
        let table = table();
        let resolver = CombatResolver::new(&table);
        let mut registry = UnitRegistry::new();
        let a = spawn(&mut registry, TeamColor::Red, UnitType::Infantry, 0, 0);
        let near = spawn(&mut registry, TeamColor::Blue, UnitType::Infantry, 1, 1);
        let far = spawn(&mut registry, TeamColor::Blue, UnitType::Infantry, 2, 1);

        let targets = resolver.find_attackable_units(a, &registry).unwrap();
        assert_eq!(targets.into_iter().collect::<Vec<_>>(), vec![near]);
        assert!(registry.contains(far));
    }

    #[test]
    fn test_unknown_attacker() {
        let table = table();
        let resolver = CombatResolver::new(&table);
        let registry = UnitRegistry::new();
        assert_eq!(
            resolver.find_attackable_units(UnitId(42), &registry),
            Err(BattleError::UnknownUnit(UnitId(42)))
        );
    }

    #[test]
    fn test_missing_balancing_entry() {
        let table = table();
        let resolver = CombatResolver::new(&table);
        let mut registry = UnitRegistry::new();
        let a = registry.spawn(TeamColor::Red, UnitType::Artillery, GridCoord::ORIGIN, 10).unwrap();
        assert_eq!(
            resolver.find_attackable_units(a, &registry),
            Err(BattleError::UnknownUnitType(UnitType::Artillery))
        );
    }
}

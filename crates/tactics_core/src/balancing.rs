//! Per-unit-type combat stats.
//!
//! The [`UnitBalancingTable`] is built once while a battle is set up and is
//! read-only afterwards. It exposes no mutating methods; every unit of a
//! type shares the same [`UnitBalancing`] entry.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::data::BalancingData;
use crate::error::{BattleError, Result};
use crate::math::Fixed;

/// Kind of unit. Keys the balancing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitType {
    /// Foot soldiers.
    Infantry,
    /// Light, fast scout vehicle.
    Recon,
    /// Main battle tank.
    Tank,
    /// Long-range ground artillery.
    Artillery,
    /// Attack helicopter.
    Helicopter,
    /// Air-superiority fighter.
    Fighter,
}

impl UnitType {
    /// Every unit type, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Infantry,
        Self::Recon,
        Self::Tank,
        Self::Artillery,
        Self::Helicopter,
        Self::Fighter,
    ];
}

/// Coarse category gating which attackers can target which defenders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitMetaType {
    /// Soldiers on foot.
    Infantry,
    /// Ground vehicles.
    Vehicle,
    /// Aircraft.
    Air,
}

/// Combat stats shared by all units of one type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitBalancing {
    /// Maximum health points.
    pub health: u32,
    /// Damage dealt per attack.
    pub damage: u32,
    /// Attack range in tiles (Manhattan distance).
    pub attack_range: u32,
    /// Movement budget per round, spent on tile entry costs.
    pub movement: Fixed,
    /// Category of this unit.
    pub unit_meta_type: UnitMetaType,
    /// Categories this unit may attack.
    pub attackable_unit_meta_types: BTreeSet<UnitMetaType>,
}

impl UnitBalancing {
    /// Whether a unit with this balancing may target the given category.
    #[must_use]
    pub fn can_target(&self, meta_type: UnitMetaType) -> bool {
        self.attackable_unit_meta_types.contains(&meta_type)
    }

    fn validate(&self, unit_type: UnitType) -> Result<()> {
        let invalid = |reason: &str| BattleError::InvalidBalancing {
            unit_type,
            reason: reason.into(),
        };

        if self.health == 0 {
            return Err(invalid("health must be positive"));
        }
        if self.damage == 0 {
            return Err(invalid("damage must be positive"));
        }
        if self.movement <= Fixed::ZERO {
            return Err(invalid("movement must be positive"));
        }
        Ok(())
    }
}

/// Read-only lookup from [`UnitType`] to [`UnitBalancing`].
#[derive(Debug, Clone, Default)]
pub struct UnitBalancingTable {
    entries: HashMap<UnitType, UnitBalancing>,
}

impl UnitBalancingTable {
    /// Build a table from entries, validating each.
    ///
    /// Later entries for the same type replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidBalancing`] if any entry has zero health,
    /// zero damage or a non-positive movement budget.
    pub fn from_entries(entries: impl IntoIterator<Item = (UnitType, UnitBalancing)>) -> Result<Self> {
        let entries: HashMap<_, _> = entries.into_iter().collect();
        // Sorted so that the first reported error is stable.
        let mut types: Vec<_> = entries.keys().copied().collect();
        types.sort_unstable();
        for unit_type in types {
            entries[&unit_type].validate(unit_type)?;
        }

        tracing::debug!(entries = entries.len(), "Balancing table loaded");
        Ok(Self { entries })
    }

    /// Build a table from parsed balancing data.
    ///
    /// # Errors
    ///
    /// See [`from_entries`](Self::from_entries).
    pub fn from_data(data: &BalancingData) -> Result<Self> {
        Self::from_entries(data.units.iter().map(|entry| (entry.unit_type, entry.to_balancing())))
    }

    /// Parse and build a table from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`] for malformed RON, or a validation
    /// error from [`from_entries`](Self::from_entries).
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        let data = BalancingData::from_ron_str(source_name, text)?;
        Self::from_data(&data)
    }

    /// Look up the balancing of a unit type.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::UnknownUnitType`] if the table has no entry.
    pub fn get(&self, unit_type: UnitType) -> Result<&UnitBalancing> {
        self.entries
            .get(&unit_type)
            .ok_or(BattleError::UnknownUnitType(unit_type))
    }

    /// Check if a unit type has an entry.
    #[must_use]
    pub fn contains(&self, unit_type: UnitType) -> bool {
        self.entries.contains_key(&unit_type)
    }

    /// Unit types with an entry, sorted.
    #[must_use]
    pub fn unit_types(&self) -> Vec<UnitType> {
        let mut types: Vec<_> = self.entries.keys().copied().collect();
        types.sort_unstable();
        types
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Balancing data structures for data-driven unit stats.

use serde::{Deserialize, Serialize};

use crate::balancing::{UnitBalancing, UnitMetaType, UnitType};
use crate::error::Result;
use crate::math::Fixed;

/// Balancing entry for one unit type, as written in data files.
///
/// # Example RON
///
/// ```ron
/// UnitBalancingEntry(
///     unit_type: Infantry,
///     health: 10,
///     damage: 5,
///     attack_range: 2,
///     movement: 3,
///     unit_meta_type: Infantry,
///     attackable_unit_meta_types: [Infantry, Vehicle],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBalancingEntry {
    /// Unit type this entry describes.
    pub unit_type: UnitType,

    /// Maximum health points.
    pub health: u32,

    /// Damage per attack.
    pub damage: u32,

    /// Attack range in tiles.
    pub attack_range: u32,

    /// Movement budget in plain-tile steps.
    pub movement: u32,

    /// Category of this unit.
    pub unit_meta_type: UnitMetaType,

    /// Categories this unit may attack.
    #[serde(default)]
    pub attackable_unit_meta_types: Vec<UnitMetaType>,
}

impl UnitBalancingEntry {
    /// Convert to the runtime balancing representation.
    #[must_use]
    pub fn to_balancing(&self) -> UnitBalancing {
        UnitBalancing {
            health: self.health,
            damage: self.damage,
            attack_range: self.attack_range,
            movement: Fixed::from_num(self.movement),
            unit_meta_type: self.unit_meta_type,
            attackable_unit_meta_types: self.attackable_unit_meta_types.iter().copied().collect(),
        }
    }
}

/// Complete balancing file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalancingData {
    /// One entry per unit type.
    pub units: Vec<UnitBalancingEntry>,
}

impl BalancingData {
    /// Parse balancing data from RON text.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`](crate::error::BattleError::DataParse)
    /// if the text is not valid balancing RON.
    pub fn from_ron_str(source_name: &str, text: &str) -> Result<Self> {
        super::parse_ron(source_name, text)
    }

    /// Find the entry for a unit type.
    #[must_use]
    pub fn entry(&self, unit_type: UnitType) -> Option<&UnitBalancingEntry> {
        self.units.iter().find(|u| u.unit_type == unit_type)
    }

    /// Unit types listed more than once, sorted.
    #[must_use]
    pub fn duplicate_types(&self) -> Vec<UnitType> {
        let mut seen = Vec::new();
        let mut duplicates = Vec::new();
        for entry in &self.units {
            if seen.contains(&entry.unit_type) {
                if !duplicates.contains(&entry.unit_type) {
                    duplicates.push(entry.unit_type);
                }
            } else {
                seen.push(entry.unit_type);
            }
        }
        duplicates.sort_unstable();
        duplicates
    }
}

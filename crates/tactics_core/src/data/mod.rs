//! Data structures for battle configuration.
//!
//! This module contains pure data structures deserialized from RON files:
//! unit balancing and scenario layouts.
//!
//! **Note:** This module contains no IO - it only defines data types and
//! parses text handed to it. File loading is handled by `tactics_tools`.

mod balancing_data;
mod scenario_data;

pub use balancing_data::{BalancingData, UnitBalancingEntry};
pub use scenario_data::{ScenarioData, TeamData, UnitPlacement};

use serde::de::DeserializeOwned;

use crate::error::{BattleError, Result};

/// Deserialize a RON document, naming `source_name` in any error.
pub(crate) fn parse_ron<T: DeserializeOwned>(source_name: &str, text: &str) -> Result<T> {
    ron::from_str(text).map_err(|e| BattleError::DataParse {
        source_name: source_name.to_string(),
        message: e.to_string(),
    })
}

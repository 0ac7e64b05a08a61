//! Data validation utilities.
//!
//! Expected layout of a data directory:
//!
//! ```text
//! assets/data/
//! ├── balancing.ron
//! └── scenarios/
//!     └── *.ron
//! ```

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tactics_core::prelude::*;

use crate::error::{Result, ToolError};

/// Findings of a validation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that make the data unusable.
    pub errors: Vec<String>,
    /// Suspicious but usable data.
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Whether no errors were found.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, context: &str, message: impl AsRef<str>) {
        self.errors.push(format!("{context}: {}", message.as_ref()));
    }

    fn warning(&mut self, context: &str, message: impl AsRef<str>) {
        self.warnings.push(format!("{context}: {}", message.as_ref()));
    }

    fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Turn a report with errors into [`ToolError::ValidationFailed`].
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::ValidationFailed`] if any error was recorded.
    pub fn into_result(self) -> Result<Self> {
        if self.is_ok() {
            Ok(self)
        } else {
            Err(ToolError::ValidationFailed {
                count: self.errors.len(),
            })
        }
    }
}

fn read_ron<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).map_err(|source| ToolError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&text).map_err(|source| ToolError::Ron {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a balancing file.
///
/// # Errors
///
/// Returns [`ToolError::Io`] or [`ToolError::Ron`].
pub fn load_balancing_data(path: &Path) -> Result<BalancingData> {
    read_ron(path)
}

/// Read a balancing file and build the runtime table.
///
/// # Errors
///
/// Returns [`ToolError::Io`], [`ToolError::Ron`], or
/// [`ToolError::Battle`] if an entry is invalid.
pub fn load_balancing(path: &Path) -> Result<UnitBalancingTable> {
    let data = load_balancing_data(path)?;
    Ok(UnitBalancingTable::from_data(&data)?)
}

/// Read a scenario file.
///
/// # Errors
///
/// Returns [`ToolError::Io`] or [`ToolError::Ron`].
pub fn load_scenario(path: &Path) -> Result<ScenarioData> {
    read_ron(path)
}

/// Check a balancing file's contents.
#[must_use]
pub fn validate_balancing(context: &str, data: &BalancingData) -> ValidationReport {
    let mut report = ValidationReport::default();

    for duplicate in data.duplicate_types() {
        report.error(context, format!("{duplicate:?} is listed more than once"));
    }
    for entry in &data.units {
        if entry.attack_range > 0 && entry.attackable_unit_meta_types.is_empty() {
            report.warning(context, format!("{:?} has range but no attackable meta types", entry.unit_type));
        }
    }
    if let Err(e) = UnitBalancingTable::from_data(data) {
        report.error(context, e.to_string());
    }
    for unit_type in UnitType::ALL {
        if data.entry(unit_type).is_none() {
            report.warning(context, format!("no entry for {unit_type:?}"));
        }
    }

    report
}

/// Check a scenario against a balancing table.
#[must_use]
pub fn validate_scenario(context: &str, scenario: &ScenarioData, table: &UnitBalancingTable) -> ValidationReport {
    let mut report = ValidationReport::default();

    let map = match scenario.tile_map() {
        Ok(map) => Some(map),
        Err(e) => {
            report.error(context, e.to_string());
            None
        }
    };

    let mut colors = BTreeSet::new();
    if scenario.teams.is_empty() {
        report.error(context, "no teams");
    }
    for team in &scenario.teams {
        if !colors.insert(team.color) {
            report.error(context, format!("team {} listed more than once", team.color));
        }
    }
    if !scenario.teams.iter().any(|t| t.player_controlled) {
        report.warning(context, "no player-controlled team");
    }

    let mut occupied = BTreeSet::new();
    let mut fielded = BTreeSet::new();
    for (i, unit) in scenario.units.iter().enumerate() {
        let position = unit.position();
        let label = format!("unit {i} ({:?} at {position})", unit.unit_type);

        if !colors.contains(&unit.team) {
            report.error(context, format!("{label} belongs to unknown team {}", unit.team));
        }
        if !table.contains(unit.unit_type) {
            report.error(context, format!("{label} has no balancing entry"));
        }
        if let Some(map) = &map {
            if !map.is_walkable(position) {
                report.error(context, format!("{label} is placed on a blocked or off-map tile"));
            }
        }
        if !occupied.insert(position) {
            report.error(context, format!("{label} shares its tile with another unit"));
        }
        fielded.insert(unit.team);
    }

    for color in colors.difference(&fielded) {
        report.warning(context, format!("team {color} has no units"));
    }

    report
}

fn scenario_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| ToolError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ToolError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "ron") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Validate `balancing.ron` and every scenario under `scenarios/` in `path`.
///
/// Parse failures of individual scenarios are reported, not returned.
///
/// # Errors
///
/// Returns an error if `balancing.ron` cannot be read or parsed, or the
/// scenarios directory cannot be listed.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let balancing_path = path.join("balancing.ron");
    let data = load_balancing_data(&balancing_path)?;
    let mut report = validate_balancing("balancing.ron", &data);
    let table = match UnitBalancingTable::from_data(&data) {
        Ok(table) => table,
        Err(_) => return Ok(report),
    };
    tracing::info!(path = %balancing_path.display(), unit_types = table.len(), "Balancing loaded");

    for file in scenario_files(&path.join("scenarios"))? {
        let context = file
            .file_name()
            .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
        match load_scenario(&file) {
            Ok(scenario) => {
                tracing::debug!(scenario = %scenario.name, "Validating scenario");
                report.merge(validate_scenario(&context, &scenario, &table));
            }
            Err(e) => report.error(&context, e.to_string()),
        }
    }

    for warning in &report.warnings {
        tracing::warn!("{warning}");
    }
    for error in &report.errors {
        tracing::error!("{error}");
    }
    Ok(report)
}

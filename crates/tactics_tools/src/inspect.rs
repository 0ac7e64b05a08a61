//! ASCII rendering of reachable areas and routes.
//!
//! Rows are printed northmost first. Legend:
//!
//! | Symbol | Meaning |
//! |--------|---------|
//! | `.` `~` `#` | plain, rough and blocked tiles |
//! | `@` | the inspected unit |
//! | `R` `B` `G` `Y` | other units, by team |
//! | `*` | reachable tile |
//! | `^` `>` `v` `<` | route heading |
//! | `X` | route destination |

use std::collections::BTreeMap;
use std::path::Path;

use tactics_core::prelude::*;

use crate::error::Result;
use crate::validate::{load_balancing, load_scenario};

/// Load a scenario into a fresh session that draws nothing.
///
/// # Errors
///
/// Returns an error if either file fails to load or the scenario is invalid.
pub fn load_session(balancing: &Path, scenario: &Path) -> Result<BattleSession> {
    let table = load_balancing(balancing)?;
    let scenario = load_scenario(scenario)?;
    Ok(BattleSession::from_scenario(table, &scenario, Box::new(NullGateway))?)
}

/// One-line description of a unit and its movement budget.
///
/// # Errors
///
/// Returns an error if the unit or its balancing entry is missing.
pub fn describe_unit(session: &BattleSession, unit: UnitId) -> Result<String> {
    let u = session.units().require(unit)?;
    let stats = session.balancing().get(u.unit_type())?;
    Ok(format!(
        "{unit} {:?} ({}) at {}, health {}/{}, movement {}, range {}",
        u.unit_type(),
        u.team(),
        u.position(),
        u.current_health(),
        u.max_health(),
        stats.movement,
        stats.attack_range,
    ))
}

/// Map with every tile `unit` can reach marked.
///
/// # Errors
///
/// Returns an error if the unit or its balancing entry is missing.
pub fn render_reach(session: &BattleSession, unit: UnitId) -> Result<String> {
    let reach = session.walkable_tiles(unit)?;
    render(session, unit, |coord| reach.contains(&coord).then_some('*'))
}

/// Map with the best route from `unit` to `destination` drawn.
///
/// # Errors
///
/// Returns [`BattleError::NoPathFound`] (wrapped) if the destination is out
/// of reach.
pub fn render_route(session: &BattleSession, unit: UnitId, destination: GridCoord) -> Result<String> {
    let from = session.units().require(unit)?.position();
    let route = session.best_route(unit, destination)?.into_result(from, destination)?;

    let symbols: BTreeMap<GridCoord, char> = route_markers(&route)?
        .into_iter()
        .map(|(coord, marker)| (coord, marker_symbol(marker)))
        .collect();
    render(session, unit, |coord| symbols.get(&coord).copied())
}

const fn arrow(direction: CardinalDirection) -> char {
    match direction {
        CardinalDirection::North => '^',
        CardinalDirection::East => '>',
        CardinalDirection::South => 'v',
        CardinalDirection::West => '<',
    }
}

const fn marker_symbol(marker: RouteMarker) -> char {
    match marker {
        RouteMarker::Origin(heading) | RouteMarker::Straight(heading) => arrow(heading),
        RouteMarker::Turn { to, .. } => arrow(to),
        RouteMarker::Destination(_) => 'X',
    }
}

const fn team_symbol(team: TeamColor) -> char {
    match team {
        TeamColor::Red => 'R',
        TeamColor::Blue => 'B',
        TeamColor::Green => 'G',
        TeamColor::Yellow => 'Y',
    }
}

fn render(
    session: &BattleSession,
    selected: UnitId,
    overlay: impl Fn(GridCoord) -> Option<char>,
) -> Result<String> {
    session.units().require(selected)?;
    let map = session.map();
    let width = i32::try_from(map.width()).unwrap_or(i32::MAX);
    let height = i32::try_from(map.height()).unwrap_or(i32::MAX);

    let mut out = String::new();
    for y in (0..height).rev() {
        for x in 0..width {
            let coord = GridCoord::new(x, y);
            let symbol = match session.units().occupant_at(coord) {
                Some(unit) if unit.id() == selected => '@',
                Some(unit) => team_symbol(unit.team()),
                None => overlay(coord)
                    .or_else(|| map.tile(coord).map(TileKind::symbol))
                    .unwrap_or(' '),
            };
            out.push(symbol);
        }
        out.push('\n');
    }
    Ok(out)
}

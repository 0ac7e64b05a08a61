//! Test fixtures and helpers.
//!
//! Pre-built balancing tables and battle sessions
//! for consistent testing.

use fixed::types::I32F32;
use tactics_core::prelude::*;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real battle code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Shorthand for [`GridCoord::new`].
#[must_use]
pub const fn coord(x: i32, y: i32) -> GridCoord {
    GridCoord::new(x, y)
}

/// Build a balancing entry.
#[must_use]
pub fn stats(
    health: u32,
    damage: u32,
    attack_range: u32,
    movement: i32,
    unit_meta_type: UnitMetaType,
    targets: &[UnitMetaType],
) -> UnitBalancing {
    UnitBalancing {
        health,
        damage,
        attack_range,
        movement: fixed(movement),
        unit_meta_type,
        attackable_unit_meta_types: targets.iter().copied().collect(),
    }
}

/// Balancing table with an entry for every [`UnitType`].
///
/// Infantry has health 10, damage 5 and range 2, matching the duel scenario.
#[must_use]
pub fn standard_table() -> UnitBalancingTable {
    use UnitMetaType::{Air, Infantry, Vehicle};

    let entries = [
        (UnitType::Infantry, stats(10, 5, 2, 3, Infantry, &[Infantry, Vehicle])),
        (UnitType::Recon, stats(8, 3, 1, 6, Vehicle, &[Infantry, Vehicle])),
        (UnitType::Tank, stats(20, 8, 1, 4, Vehicle, &[Infantry, Vehicle])),
        (UnitType::Artillery, stats(12, 9, 4, 2, Vehicle, &[Infantry, Vehicle])),
        (UnitType::Helicopter, stats(14, 6, 1, 5, Air, &[Infantry, Vehicle, Air])),
        (UnitType::Fighter, stats(12, 7, 1, 7, Air, &[Air])),
    ];
    match UnitBalancingTable::from_entries(entries) {
        Ok(table) => table,
        Err(e) => panic!("standard balancing table is invalid: {e}"),
    }
}

/// Red (player) and Blue (remote), in that turn order.
#[must_use]
pub fn red_vs_blue() -> Vec<Team> {
    vec![Team::player(TeamColor::Red), Team::remote(TeamColor::Blue)]
}

/// Open `width` x `height` plain map.
#[must_use]
pub fn open_map(width: u32, height: u32) -> TileMap {
    TileMap::new(width, height)
}

/// Map from ASCII rows, northmost first.
///
/// # Panics
///
/// Panics if the rows are malformed.
#[must_use]
pub fn map_from_rows(rows: &[&str]) -> TileMap {
    match TileMap::from_rows(rows) {
        Ok(map) => map,
        Err(e) => panic!("bad test map: {e}"),
    }
}

/// Empty Red vs Blue session on an open map, moving one tile per tick.
///
/// # Panics
///
/// Panics if the session cannot be built.
#[must_use]
pub fn empty_session(width: u32, height: u32, gateway: Box<dyn PresentationGateway>) -> BattleSession {
    BattleSession::new(standard_table(), open_map(width, height), red_vs_blue(), gateway)
        .and_then(|session| session.with_move_speed(fixed(1)))
        .unwrap_or_else(|e| panic!("failed to build session: {e}"))
}

/// The duel: Red infantry A at (0,0), Blue infantry B at (0,2), on a 5x5
/// open map. Not yet started.
///
/// Returns the session and the ids of A and B.
#[must_use]
pub fn duel_session(gateway: Box<dyn PresentationGateway>) -> (BattleSession, UnitId, UnitId) {
    let mut session = empty_session(5, 5, gateway);
    let a = spawn(&mut session, TeamColor::Red, UnitType::Infantry, 0, 0);
    let b = spawn(&mut session, TeamColor::Blue, UnitType::Infantry, 0, 2);
    (session, a, b)
}

/// Spawn a unit, panicking on failure.
///
/// # Panics
///
/// Panics if the unit cannot be placed.
pub fn spawn(session: &mut BattleSession, team: TeamColor, unit_type: UnitType, x: i32, y: i32) -> UnitId {
    session
        .spawn_unit(team, unit_type, coord(x, y))
        .unwrap_or_else(|e| panic!("failed to spawn {unit_type:?} at ({x}, {y}): {e}"))
}

/// Tick until no unit is moving, returning every completion.
///
/// # Panics
///
/// Panics if moves are still running after `max_ticks` ticks.
pub fn finish_moves(session: &mut BattleSession, max_ticks: u32) -> Vec<MoveCompletion> {
    let mut completions = Vec::new();
    for _ in 0..max_ticks {
        if session.movement().is_empty() {
            return completions;
        }
        completions.extend(session.tick());
    }
    assert!(session.movement().is_empty(), "moves still running after {max_ticks} ticks");
    completions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_table_covers_all_types() {
        let table = standard_table();
        for unit_type in UnitType::ALL {
            assert!(table.contains(unit_type), "{unit_type:?} missing");
        }
    }

    #[test]
    fn test_duel_layout() {
        let (session, a, b) = duel_session(Box::new(NullGateway));
        assert_eq!(session.units().get(a).map(Unit::position), Some(coord(0, 0)));
        assert_eq!(session.units().get(b).map(Unit::position), Some(coord(0, 2)));
        assert_eq!(session.state(), TurnState::NotStarted);
    }
}

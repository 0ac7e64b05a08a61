//! Balance testing utilities for scripted battles.
//!
//! [`play_turn`] plays every team with the same greedy policy:
//! attack the weakest unit in range, otherwise walk to the reachable tile
//! closest to the nearest enemy and attack from there. Battles are fully
//! deterministic, so matchups are varied by starting distance rather than
//! by repetition.

use std::ops::RangeInclusive;

use tactics_core::prelude::*;

use crate::fixtures::{coord, empty_session, finish_moves};

/// Ticks allowed for a single move to finish.
const MAX_MOVE_TICKS: u32 = 10_000;

/// Result of one scripted battle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattleResult {
    /// The winning team (None if draw/timeout).
    pub winner: Option<TeamColor>,
    /// Rounds played.
    pub rounds: u32,
    /// Attacks resolved.
    pub attacks: u32,
    /// Live units at the end, per team color.
    pub survivors: Vec<(TeamColor, usize)>,
}

/// Statistics for a set of battles.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchupStats {
    /// Total battles run.
    pub total_battles: u32,
    /// Wins for side A (Red).
    pub wins_a: u32,
    /// Wins for side B (Blue).
    pub wins_b: u32,
    /// Battles that hit the round limit.
    pub draws: u32,
    /// Average rounds to resolution.
    pub avg_rounds: f64,
}

impl MatchupStats {
    /// Win rate for side A (0.0 to 1.0).
    #[must_use]
    pub fn win_rate_a(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.wins_a) / f64::from(self.total_battles)
    }

    /// Win rate for side B (0.0 to 1.0).
    #[must_use]
    pub fn win_rate_b(&self) -> f64 {
        if self.total_battles == 0 {
            return 0.5;
        }
        f64::from(self.wins_b) / f64::from(self.total_battles)
    }

    /// Whether side A's win rate lies within `[min_rate, max_rate]`.
    #[must_use]
    pub fn is_balanced(&self, min_rate: f64, max_rate: f64) -> bool {
        let rate = self.win_rate_a();
        rate >= min_rate && rate <= max_rate
    }

    fn record(&mut self, result: &BattleResult) {
        self.total_battles += 1;
        match result.winner {
            Some(TeamColor::Red) => self.wins_a += 1,
            Some(TeamColor::Blue) => self.wins_b += 1,
            _ => self.draws += 1,
        }
        let n = f64::from(self.total_battles);
        self.avg_rounds += (f64::from(result.rounds) - self.avg_rounds) / n;
    }
}

/// Play every unit of the active team with the greedy policy, then end the
/// turn.
///
/// Returns the number of attacks made.
///
/// # Errors
///
/// Propagates any session error; a correct policy never triggers one.
pub fn play_turn(session: &mut BattleSession) -> Result<u32> {
    let Some(team) = session.active_team() else {
        return Err(BattleError::InvalidState("no active team".into()));
    };

    let mut attacks = 0;
    let ids: Vec<UnitId> = session.units().units_of_team(team).iter().map(|u| u.id()).collect();
    for id in ids {
        if session.state() != TurnState::Active(team) {
            return Ok(attacks);
        }
        if !session.can_act(id) {
            continue;
        }

        if !attack_weakest(session, id)? {
            advance(session, id)?;
            if session.can_act(id) && attack_weakest(session, id)? {
                attacks += 1;
            }
        } else {
            attacks += 1;
        }
    }

    if session.state() == TurnState::Active(team) {
        session.end_turn()?;
    }
    Ok(attacks)
}

fn attack_weakest(session: &mut BattleSession, id: UnitId) -> Result<bool> {
    if session.units().require(id)?.has_attacked_this_round() {
        return Ok(false);
    }
    let target = session
        .attackable_units(id)?
        .into_iter()
        .filter_map(|target| session.units().get(target))
        .min_by_key(|unit| (unit.current_health(), unit.id()))
        .map(Unit::id);

    match target {
        Some(target) => {
            session.attack(id, target)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn advance(session: &mut BattleSession, id: UnitId) -> Result<()> {
    let unit = session.units().require(id)?;
    if unit.has_moved_this_round() {
        return Ok(());
    }
    let (team, here) = (unit.team(), unit.position());

    let enemies: Vec<GridCoord> = session
        .units()
        .all()
        .into_iter()
        .filter(|u| u.team() != team)
        .map(Unit::position)
        .collect();
    let distance_to_enemy =
        |tile: GridCoord| enemies.iter().map(|&e| tile.manhattan_distance(e)).min().unwrap_or(u32::MAX);

    let best = session
        .walkable_tiles(id)?
        .into_iter()
        .min_by_key(|&tile| distance_to_enemy(tile));
    match best {
        Some(tile) if distance_to_enemy(tile) < distance_to_enemy(here) => {
            session.begin_move(id, tile, |_| {})?;
            finish_moves(session, MAX_MOVE_TICKS);
        }
        _ => {}
    }
    Ok(())
}

/// Start `session` if needed and play until one team remains or
/// `max_rounds` rounds have been played.
///
/// # Errors
///
/// Propagates any session error.
pub fn run_battle(session: &mut BattleSession, max_rounds: u32) -> Result<BattleResult> {
    if session.state() == TurnState::NotStarted {
        session.start()?;
    }

    let mut attacks = 0;
    while let TurnState::Active(_) = session.state() {
        if session.round() > max_rounds {
            break;
        }
        attacks += play_turn(session)?;
    }

    let winner = match session.state() {
        TurnState::BattleOver { winner } => winner,
        _ => None,
    };
    let survivors = [TeamColor::Red, TeamColor::Blue, TeamColor::Green, TeamColor::Yellow]
        .into_iter()
        .map(|team| (team, session.units().units_of_team(team).len()))
        .filter(|&(_, count)| count > 0)
        .collect();

    Ok(BattleResult {
        winner,
        rounds: session.round(),
        attacks,
        survivors,
    })
}

/// Red `unit_a` against Blue `unit_b`, `distance` tiles apart on an open
/// strip.
///
/// # Errors
///
/// Propagates any session error.
pub fn run_duel(unit_a: UnitType, unit_b: UnitType, distance: i32, max_rounds: u32) -> Result<BattleResult> {
    let width = u32::try_from(distance + 1).unwrap_or(1).max(1);
    let mut session = empty_session(width, 3, Box::new(NullGateway));
    session.spawn_unit(TeamColor::Red, unit_a, coord(0, 1))?;
    session.spawn_unit(TeamColor::Blue, unit_b, coord(distance, 1))?;
    run_battle(&mut session, max_rounds)
}

/// Run duels of `unit_a` against `unit_b` at every distance in `distances`.
///
/// # Errors
///
/// Propagates any session error.
pub fn matchup_stats(
    unit_a: UnitType,
    unit_b: UnitType,
    distances: RangeInclusive<i32>,
    max_rounds: u32,
) -> Result<MatchupStats> {
    let mut stats = MatchupStats::default();
    for distance in distances {
        let result = run_duel(unit_a, unit_b, distance, max_rounds)?;
        tracing::debug!(?unit_a, ?unit_b, distance, winner = ?result.winner, rounds = result.rounds, "Duel finished");
        stats.record(&result);
    }
    Ok(stats)
}

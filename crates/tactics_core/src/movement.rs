//! Resumable route traversal.
//!
//! A move is spread over several scheduler ticks. Each tick advances the
//! traversal by `speed` tiles; the unit's grid position changes only when a
//! step lands exactly on the next tile of the route.

use std::collections::{HashMap, HashSet};

use crate::error::{BattleError, Result};
use crate::grid::{CardinalDirection, GridCoord};
use crate::math::{Fixed, Vec2Fixed};
use crate::presentation::PresentationGateway;
use crate::route::Route;
use crate::unit::{UnitId, UnitRegistry};

/// Default traversal speed, in tiles per tick.
pub const DEFAULT_MOVE_SPEED: Fixed = Fixed::from_bits(1 << 30); // 0.25

/// Callback run once when a traversal completes.
pub type MoveCallback = Box<dyn FnOnce(&MoveCompletion)>;

/// What one call to [`RouteTraversal::advance`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalStep {
    /// Between two tiles.
    Moving {
        /// Tile being left.
        from: GridCoord,
        /// Tile being approached.
        to: GridCoord,
        /// Heading of this step.
        facing: CardinalDirection,
        /// Fraction of the step covered, in `[0, 1)`.
        progress: Fixed,
    },
    /// Arrived on the next tile of the route.
    Landed {
        /// Tile that was left.
        from: GridCoord,
        /// Tile arrived on.
        at: GridCoord,
        /// Heading of this step.
        facing: CardinalDirection,
    },
    /// Nothing left to traverse.
    Finished {
        /// Final tile.
        destination: GridCoord,
    },
}

/// Position along a route, resumed each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteTraversal {
    unit: UnitId,
    route: Route,
    headings: Vec<CardinalDirection>,
    current_index: usize,
    progress: Fixed,
    speed: Fixed,
}

impl RouteTraversal {
    /// Start traversing `route` at its first tile.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] for an empty route or a
    /// non-positive speed, and [`BattleError::InvalidDirection`] if the route
    /// has a gap.
    pub fn new(unit: UnitId, route: Route, speed: Fixed) -> Result<Self> {
        if route.is_empty() {
            return Err(BattleError::InvalidState("cannot traverse an empty route".into()));
        }
        if speed <= Fixed::ZERO {
            return Err(BattleError::InvalidState(format!("move speed must be positive, got {speed}")));
        }

        let headings = route
            .steps()
            .map(|(from, to)| CardinalDirection::between(from, to))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            unit,
            route,
            headings,
            current_index: 0,
            progress: Fixed::ZERO,
            speed,
        })
    }

    /// Unit being moved.
    #[must_use]
    pub const fn unit(&self) -> UnitId {
        self.unit
    }

    /// Route being traversed.
    #[must_use]
    pub const fn route(&self) -> &Route {
        &self.route
    }

    /// Index of the last tile landed on.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Fraction of the current step covered.
    #[must_use]
    pub const fn progress(&self) -> Fixed {
        self.progress
    }

    /// Last tile landed on.
    #[must_use]
    pub fn current_tile(&self) -> GridCoord {
        self.route.tiles()[self.current_index]
    }

    /// Tiles still to be entered, in order.
    #[must_use]
    pub fn remaining_tiles(&self) -> &[GridCoord] {
        &self.route.tiles()[self.current_index + 1..]
    }

    /// Whether the final tile has been reached.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_index + 1 >= self.route.len()
    }

    /// Interpolated position between the current and next tile.
    #[must_use]
    pub fn anchor(&self) -> Vec2Fixed {
        let here = Vec2Fixed::from(self.current_tile());
        match self.route.get(self.current_index + 1) {
            Some(next) => here.lerp(Vec2Fixed::from(next), self.progress),
            None => here,
        }
    }

    /// Advance by one tick.
    pub fn advance(&mut self) -> TraversalStep {
        if self.is_finished() {
            return TraversalStep::Finished {
                destination: self.current_tile(),
            };
        }

        let from = self.current_tile();
        let to = self.route.tiles()[self.current_index + 1];
        let facing = self.headings[self.current_index];

        self.progress += self.speed;
        if self.progress >= Fixed::ONE {
            // Excess progress is dropped so every tile is landed on.
            self.progress = Fixed::ZERO;
            self.current_index += 1;
            TraversalStep::Landed { from, at: to, facing }
        } else {
            TraversalStep::Moving {
                from,
                to,
                facing,
                progress: self.progress,
            }
        }
    }
}

/// Report of a finished traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveCompletion {
    /// Unit that moved.
    pub unit: UnitId,
    /// Tile the move started from.
    pub origin: GridCoord,
    /// Tile the unit ended on.
    pub destination: GridCoord,
    /// Number of tiles entered.
    pub steps: usize,
}

/// A traversal that reached its destination and whose callback has not
/// run yet.
pub struct FinishedMove {
    completion: MoveCompletion,
    on_complete: MoveCallback,
}

impl std::fmt::Debug for FinishedMove {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FinishedMove")
            .field("completion", &self.completion)
            .finish_non_exhaustive()
    }
}

impl FinishedMove {
    /// Report of the move.
    #[must_use]
    pub const fn completion(&self) -> &MoveCompletion {
        &self.completion
    }

    /// Run the completion callback.
    pub fn complete(self) -> MoveCompletion {
        (self.on_complete)(&self.completion);
        self.completion
    }
}

struct ActiveMove {
    traversal: RouteTraversal,
    on_complete: MoveCallback,
}

/// Runs at most one traversal per unit.
pub struct MovementScheduler {
    active: HashMap<UnitId, ActiveMove>,
    speed: Fixed,
}

impl std::fmt::Debug for MovementScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut moving: Vec<_> = self.active.keys().copied().collect();
        moving.sort_unstable();
        f.debug_struct("MovementScheduler")
            .field("moving", &moving)
            .field("speed", &self.speed)
            .finish()
    }
}

impl Default for MovementScheduler {
    fn default() -> Self {
        Self {
            active: HashMap::new(),
            speed: DEFAULT_MOVE_SPEED,
        }
    }
}

impl MovementScheduler {
    /// Create a scheduler advancing every traversal by `speed` tiles per tick.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidState`] if `speed` is not positive.
    pub fn new(speed: Fixed) -> Result<Self> {
        if speed <= Fixed::ZERO {
            return Err(BattleError::InvalidState(format!("move speed must be positive, got {speed}")));
        }
        Ok(Self {
            active: HashMap::new(),
            speed,
        })
    }

    /// Tiles per tick.
    #[must_use]
    pub const fn speed(&self) -> Fixed {
        self.speed
    }

    /// Begin moving `unit` along `route`.
    ///
    /// A traversal already running for the unit is cancelled without calling
    /// its callback; the unit stays on the last tile it landed on.
    ///
    /// # Errors
    ///
    /// See [`RouteTraversal::new`].
    pub fn start(&mut self, unit: UnitId, route: Route, on_complete: MoveCallback) -> Result<()> {
        let traversal = RouteTraversal::new(unit, route, self.speed)?;
        let replaced = self.active.insert(
            unit,
            ActiveMove {
                traversal,
                on_complete,
            },
        );
        if let Some(previous) = replaced {
            tracing::warn!(
                unit = %unit,
                at = %previous.traversal.current_tile(),
                "Cancelled in-flight traversal"
            );
        }
        Ok(())
    }

    /// Drop the unit's traversal. Returns `false` if it was not moving.
    pub fn cancel(&mut self, unit: UnitId) -> bool {
        self.active.remove(&unit).is_some()
    }

    /// Whether `unit` has a traversal in progress.
    #[must_use]
    pub fn is_moving(&self, unit: UnitId) -> bool {
        self.active.contains_key(&unit)
    }

    /// The unit's traversal, if any.
    #[must_use]
    pub fn traversal(&self, unit: UnitId) -> Option<&RouteTraversal> {
        self.active.get(&unit).map(|active| &active.traversal)
    }

    /// Tiles that running traversals other than `except`'s have yet to
    /// enter, destinations included.
    #[must_use]
    pub fn reserved_tiles(&self, except: Option<UnitId>) -> HashSet<GridCoord> {
        self.active
            .iter()
            .filter(|(&unit, _)| Some(unit) != except)
            .flat_map(|(_, active)| active.traversal.remaining_tiles().iter().copied())
            .collect()
    }

    /// Number of running traversals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether nothing is moving.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Advance every traversal by one tick, in unit id order.
    ///
    /// Landing updates the unit's position and notifies `gateway`. A
    /// traversal whose unit has left the registry is dropped. Finished
    /// traversals mark their unit as moved and are returned with their
    /// callback still pending; see [`FinishedMove::complete`].
    pub fn tick(
        &mut self,
        registry: &mut UnitRegistry,
        gateway: &mut dyn PresentationGateway,
    ) -> Vec<FinishedMove> {
        let mut ids: Vec<UnitId> = self.active.keys().copied().collect();
        ids.sort_unstable();

        let mut finished_moves = Vec::new();
        for id in ids {
            let Some(unit) = registry.get_mut(id) else {
                tracing::warn!(unit = %id, "Dropping traversal of removed unit");
                self.active.remove(&id);
                continue;
            };
            let Some(active) = self.active.get_mut(&id) else {
                continue;
            };

            let finished = match active.traversal.advance() {
                TraversalStep::Moving { .. } => false,
                TraversalStep::Landed { from, at, facing } => {
                    unit.set_position(at);
                    tracing::debug!(unit = %id, from = %from, to = %at, facing = ?facing, "Unit stepped");
                    gateway.unit_moved(id, from, at, facing);
                    active.traversal.is_finished()
                }
                TraversalStep::Finished { .. } => true,
            };
            if !finished {
                continue;
            }

            unit.mark_moved();
            if let Some(done) = self.active.remove(&id) {
                let route = done.traversal.route();
                let completion = MoveCompletion {
                    unit: id,
                    origin: route.start().unwrap_or_else(|| done.traversal.current_tile()),
                    destination: done.traversal.current_tile(),
                    steps: route.step_count(),
                };
                tracing::debug!(unit = %id, destination = %completion.destination, "Move complete");
                finished_moves.push(FinishedMove {
                    completion,
                    on_complete: done.on_complete,
                });
            }
        }
        finished_moves
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::balancing::UnitType;
    use crate::team::TeamColor;

    fn c(x: i32, y: i32) -> GridCoord {
        GridCoord::new(x, y)
    }

    fn half() -> Fixed {
        Fixed::from_num(0.5)
    }

    #[derive(Default)]
    struct StepLog(Vec<(UnitId, GridCoord, GridCoord, CardinalDirection)>);

    impl PresentationGateway for StepLog {
        fn unit_moved(&mut self, unit: UnitId, from: GridCoord, to: GridCoord, facing: CardinalDirection) {
            self.0.push((unit, from, to, facing));
        }
    }

    #[test]
    fn test_default_speed_is_quarter_tile() {
        assert_eq!(DEFAULT_MOVE_SPEED, Fixed::from_num(0.25));
    }

    #[test]
    fn test_traversal_steps() {
        let route = Route::new(vec![c(0, 0), c(1, 0), c(1, 1)]).unwrap();
        let mut traversal = RouteTraversal::new(UnitId(1), route, half()).unwrap();

        assert_eq!(
            traversal.advance(),
            TraversalStep::Moving {
                from: c(0, 0),
                to: c(1, 0),
                facing: CardinalDirection::East,
                progress: half(),
            }
        );
        assert_eq!(
            traversal.anchor(),
            Vec2Fixed::new(Fixed::from_num(0.5), Fixed::ZERO)
        );
        assert_eq!(
            traversal.advance(),
            TraversalStep::Landed {
                from: c(0, 0),
                at: c(1, 0),
                facing: CardinalDirection::East,
            }
        );
        traversal.advance();
        assert!(matches!(
            traversal.advance(),
            TraversalStep::Landed {
                at,
                facing: CardinalDirection::North,
                ..
            } if at == c(1, 1)
        ));
        assert!(traversal.is_finished());
        assert_eq!(traversal.advance(), TraversalStep::Finished { destination: c(1, 1) });
    }

    #[test]
    fn test_traversal_rejects_bad_input() {
        assert!(RouteTraversal::new(UnitId(1), Route::empty(), half()).is_err());
        let route = Route::new(vec![c(0, 0)]).unwrap();
        assert!(RouteTraversal::new(UnitId(1), route, Fixed::ZERO).is_err());
        assert!(MovementScheduler::new(Fixed::from_num(-1)).is_err());
    }

    #[test]
    fn test_scheduler_moves_and_completes() {
        let mut registry = UnitRegistry::new();
        let id = registry.spawn(TeamColor::Red, UnitType::Infantry, c(0, 0), 10).unwrap();
        let mut scheduler = MovementScheduler::new(half()).unwrap();
        let mut gateway = StepLog::default();

        let done = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&done);
        let route = Route::new(vec![c(0, 0), c(0, 1), c(0, 2)]).unwrap();
        scheduler
            .start(id, route, Box::new(move |completion| *sink.borrow_mut() = Some(*completion)))
            .unwrap();

        assert!(scheduler.tick(&mut registry, &mut gateway).is_empty());
        assert_eq!(registry.get(id).unwrap().position(), c(0, 0));

        assert!(scheduler.tick(&mut registry, &mut gateway).is_empty());
        assert_eq!(registry.get(id).unwrap().position(), c(0, 1));
        assert!(!registry.get(id).unwrap().has_moved_this_round());

        scheduler.tick(&mut registry, &mut gateway);
        let finished = scheduler.tick(&mut registry, &mut gateway);
        let expected = MoveCompletion {
            unit: id,
            origin: c(0, 0),
            destination: c(0, 2),
            steps: 2,
        };
        assert_eq!(finished.len(), 1);
        assert_eq!(*finished[0].completion(), expected);
        // The callback waits until the caller completes the move.
        assert_eq!(*done.borrow(), None);
        assert!(registry.get(id).unwrap().has_moved_this_round());

        let completions: Vec<MoveCompletion> = finished.into_iter().map(FinishedMove::complete).collect();
        assert_eq!(completions, vec![expected]);
        assert_eq!(*done.borrow(), Some(expected));
        assert!(registry.get(id).unwrap().has_moved_this_round());
        assert!(scheduler.is_empty());
        assert_eq!(gateway.0.len(), 2);
        assert_eq!(gateway.0[1], (id, c(0, 1), c(0, 2), CardinalDirection::North));
    }

    #[test]
    fn test_single_tile_route_completes_on_first_tick() {
        let mut registry = UnitRegistry::new();
        let id = registry.spawn(TeamColor::Red, UnitType::Infantry, c(2, 2), 10).unwrap();
        let mut scheduler = MovementScheduler::default();

        scheduler
            .start(id, Route::new(vec![c(2, 2)]).unwrap(), Box::new(|_| {}))
            .unwrap();
        let finished = scheduler.tick(&mut registry, &mut crate::presentation::NullGateway);
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].completion().steps, 0);
    }

    #[test]
    fn test_new_traversal_replaces_old() {
        let mut registry = UnitRegistry::new();
        let id = registry.spawn(TeamColor::Red, UnitType::Infantry, c(0, 0), 10).unwrap();
        let mut scheduler = MovementScheduler::new(Fixed::ONE).unwrap();

        let cancelled = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&cancelled);
        scheduler
            .start(
                id,
                Route::new(vec![c(0, 0), c(1, 0), c(2, 0)]).unwrap(),
                Box::new(move |_| *flag.borrow_mut() = true),
            )
            .unwrap();
        scheduler.tick(&mut registry, &mut crate::presentation::NullGateway);
        assert_eq!(registry.get(id).unwrap().position(), c(1, 0));

        scheduler
            .start(id, Route::new(vec![c(1, 0), c(1, 1)]).unwrap(), Box::new(|_| {}))
            .unwrap();
        assert_eq!(scheduler.len(), 1);

        let finished = scheduler.tick(&mut registry, &mut crate::presentation::NullGateway);
        assert_eq!(finished[0].completion().destination, c(1, 1));
        for done in finished {
            done.complete();
        }
        assert!(!*cancelled.borrow());
    }

    #[test]
    fn test_removed_unit_traversal_dropped() {
        let mut registry = UnitRegistry::new();
        let id = registry.spawn(TeamColor::Red, UnitType::Infantry, c(0, 0), 10).unwrap();
        let mut scheduler = MovementScheduler::new(Fixed::ONE).unwrap();
        scheduler
            .start(id, Route::new(vec![c(0, 0), c(1, 0)]).unwrap(), Box::new(|_| {}))
            .unwrap();

        registry.remove(id);
        assert!(scheduler.tick(&mut registry, &mut crate::presentation::NullGateway).is_empty());
        assert!(!scheduler.is_moving(id));
    }

    #[test]
    fn test_reserved_tiles_shrink_as_units_land() {
        let mut registry = UnitRegistry::new();
        let a = registry.spawn(TeamColor::Red, UnitType::Infantry, c(0, 0), 10).unwrap();
        let b = registry.spawn(TeamColor::Red, UnitType::Infantry, c(0, 2), 10).unwrap();
        let mut scheduler = MovementScheduler::new(Fixed::ONE).unwrap();
        scheduler
            .start(a, Route::new(vec![c(0, 0), c(1, 0), c(2, 0)]).unwrap(), Box::new(|_| {}))
            .unwrap();
        scheduler
            .start(b, Route::new(vec![c(0, 2), c(1, 2)]).unwrap(), Box::new(|_| {}))
            .unwrap();

        let all: HashSet<GridCoord> = [c(1, 0), c(2, 0), c(1, 2)].into_iter().collect();
        assert_eq!(scheduler.reserved_tiles(None), all);
        let others: HashSet<GridCoord> = [c(1, 2)].into_iter().collect();
        assert_eq!(scheduler.reserved_tiles(Some(a)), others);

        scheduler.tick(&mut registry, &mut crate::presentation::NullGateway);
        let left: HashSet<GridCoord> = [c(2, 0)].into_iter().collect();
        assert_eq!(scheduler.reserved_tiles(None), left);
    }
}

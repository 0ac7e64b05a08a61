//! Budget-bounded grid pathfinding (Dijkstra).
//!
//! All costs use fixed-point math for deterministic results.
//!
//! # Rules
//!
//! - Expansion follows [`MapService::neighbors_of`] in the order it returns.
//! - Tiles occupied by any other unit are impassable, not just unusable as a
//!   destination. The `_avoiding` variants also treat a caller-supplied set
//!   of reserved tiles as occupied.
//! - A tile is reachable if the accumulated entry cost along some path is
//!   within the movement budget.
//! - Open-set entries with equal priority pop in first-discovered order, and
//!   a tile's predecessor only changes on a strictly cheaper path. The
//!   same inputs always give the same route.
//!
//! [`PathfindingEngine::walkable_tiles`] and [`PathfindingEngine::best_route`]
//! run the same bounded expansion, so every tile of a best route is in the
//! walkable set computed for the same budget.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::grid::GridCoord;
use crate::map::MapService;
use crate::math::{fixed_serde, Fixed};
use crate::route::Route;
use crate::unit::{Unit, UnitRegistry};

/// Search metadata for one discovered tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathNodeDebug {
    /// Lowest accumulated cost found to enter this tile.
    #[serde(with = "fixed_serde")]
    pub cost_to_reach: Fixed,
    /// Priority the tile was queued with.
    #[serde(with = "fixed_serde")]
    pub priority: Fixed,
}

/// Result of [`PathfindingEngine::best_route`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteSearch {
    /// Best route, empty when no path exists.
    pub route: Route,
    /// Every tile the search discovered.
    pub debug: BTreeMap<GridCoord, PathNodeDebug>,
}

impl RouteSearch {
    /// Whether a route was found.
    #[must_use]
    pub fn is_found(&self) -> bool {
        !self.route.is_empty()
    }

    /// Total entry cost of the route's destination, if found.
    #[must_use]
    pub fn total_cost(&self) -> Option<Fixed> {
        self.route
            .destination()
            .and_then(|d| self.debug.get(&d))
            .map(|node| node.cost_to_reach)
    }

    /// Convert to a `Result`, mapping an empty route to
    /// [`BattleError::NoPathFound`].
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::NoPathFound`] when no route was found.
    pub fn into_result(self, from: GridCoord, to: GridCoord) -> Result<Route> {
        if self.route.is_empty() {
            Err(BattleError::NoPathFound { from, to })
        } else {
            Ok(self.route)
        }
    }
}

/// A node in the open set priority queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OpenNode {
    coord: GridCoord,
    priority: Fixed,
    /// Insertion counter; lower means discovered earlier.
    sequence: u64,
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: reverse both keys for min-first.
        other
            .priority
            .cmp(&self.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Outcome of one bounded expansion.
struct Expansion {
    cost: HashMap<GridCoord, Fixed>,
    came_from: HashMap<GridCoord, GridCoord>,
    debug: BTreeMap<GridCoord, PathNodeDebug>,
}

/// Route and reachability queries over a [`MapService`].
#[derive(Debug, Clone)]
pub struct PathfindingEngine<M> {
    map: M,
}

impl<M: MapService> PathfindingEngine<M> {
    /// Create an engine over `map`.
    #[must_use]
    pub const fn new(map: M) -> Self {
        Self { map }
    }

    /// The map service.
    #[must_use]
    pub const fn map(&self) -> &M {
        &self.map
    }

    /// Tiles `unit` can reach with `budget`, including its own tile.
    #[must_use]
    pub fn walkable_tiles(
        &self,
        unit: &Unit,
        budget: Fixed,
        registry: &UnitRegistry,
    ) -> BTreeSet<GridCoord> {
        self.walkable_tiles_avoiding(unit, budget, registry, &HashSet::new())
    }

    /// [`walkable_tiles`](Self::walkable_tiles) with `reserved` tiles treated
    /// as occupied.
    #[must_use]
    pub fn walkable_tiles_avoiding(
        &self,
        unit: &Unit,
        budget: Fixed,
        registry: &UnitRegistry,
        reserved: &HashSet<GridCoord>,
    ) -> BTreeSet<GridCoord> {
        let expansion = self.expand(unit, budget, registry, reserved, None);
        expansion.cost.into_keys().collect()
    }

    /// Lowest-cost route from `unit`'s tile to `destination` within `budget`.
    ///
    /// The route is empty when the destination is off the map, blocked,
    /// occupied by another unit, or too expensive to reach.
    #[must_use]
    pub fn best_route(
        &self,
        unit: &Unit,
        destination: GridCoord,
        budget: Fixed,
        registry: &UnitRegistry,
    ) -> RouteSearch {
        self.best_route_avoiding(unit, destination, budget, registry, &HashSet::new())
    }

    /// [`best_route`](Self::best_route) with `reserved` tiles treated as
    /// occupied.
    #[must_use]
    pub fn best_route_avoiding(
        &self,
        unit: &Unit,
        destination: GridCoord,
        budget: Fixed,
        registry: &UnitRegistry,
        reserved: &HashSet<GridCoord>,
    ) -> RouteSearch {
        let start = unit.position();
        let expansion = self.expand(unit, budget, registry, reserved, Some(destination));

        if !expansion.cost.contains_key(&destination) {
            tracing::debug!(
                unit = %unit.id(),
                from = %start,
                to = %destination,
                explored = expansion.debug.len(),
                "No route found"
            );
            return RouteSearch {
                route: Route::empty(),
                debug: expansion.debug,
            };
        }

        let route = reconstruct_route(&expansion.came_from, destination);
        tracing::debug!(
            unit = %unit.id(),
            from = %start,
            to = %destination,
            steps = route.step_count(),
            "Route found"
        );

        RouteSearch {
            route,
            debug: expansion.debug,
        }
    }

    /// Dijkstra expansion from the unit's tile, bounded by `budget`.
    ///
    /// Stops early once `goal` is settled.
    fn expand(
        &self,
        unit: &Unit,
        budget: Fixed,
        registry: &UnitRegistry,
        reserved: &HashSet<GridCoord>,
        goal: Option<GridCoord>,
    ) -> Expansion {
        let start = unit.position();
        let mut occupied: HashSet<GridCoord> = registry
            .all()
            .into_iter()
            .filter(|other| other.id() != unit.id())
            .map(Unit::position)
            .collect();
        occupied.extend(reserved.iter().copied().filter(|&tile| tile != start));

        let mut open_set: BinaryHeap<OpenNode> = BinaryHeap::new();
        let mut cost: HashMap<GridCoord, Fixed> = HashMap::new();
        let mut came_from: HashMap<GridCoord, GridCoord> = HashMap::new();
        let mut debug: BTreeMap<GridCoord, PathNodeDebug> = BTreeMap::new();
        let mut settled: HashSet<GridCoord> = HashSet::new();
        let mut sequence = 0u64;

        cost.insert(start, Fixed::ZERO);
        debug.insert(
            start,
            PathNodeDebug {
                cost_to_reach: Fixed::ZERO,
                priority: Fixed::ZERO,
            },
        );
        open_set.push(OpenNode {
            coord: start,
            priority: Fixed::ZERO,
            sequence,
        });

        while let Some(current) = open_set.pop() {
            // Skip stale entries superseded by a cheaper path.
            if !settled.insert(current.coord) {
                continue;
            }
            if goal == Some(current.coord) {
                break;
            }

            let current_cost = cost[&current.coord];

            for neighbor in self.map.neighbors_of(current.coord) {
                if occupied.contains(&neighbor) || !self.map.is_walkable(neighbor) {
                    continue;
                }
                let Some(step_cost) = self.map.movement_cost(neighbor) else {
                    continue;
                };

                let tentative = current_cost + step_cost;
                if tentative > budget {
                    continue;
                }

                let known = cost.get(&neighbor).copied().unwrap_or(Fixed::MAX);
                if tentative < known {
                    cost.insert(neighbor, tentative);
                    came_from.insert(neighbor, current.coord);
                    debug.insert(
                        neighbor,
                        PathNodeDebug {
                            cost_to_reach: tentative,
                            priority: tentative,
                        },
                    );

                    sequence += 1;
                    open_set.push(OpenNode {
                        coord: neighbor,
                        priority: tentative,
                        sequence,
                    });
                }
            }
        }

        Expansion {
            cost,
            came_from,
            debug,
        }
    }
}

/// Walk predecessors back from `goal`.
fn reconstruct_route(came_from: &HashMap<GridCoord, GridCoord>, goal: GridCoord) -> Route {
    let mut tiles = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        tiles.push(prev);
        current = prev;
    }

    tiles.reverse();
    Route::from_contiguous(tiles)
}

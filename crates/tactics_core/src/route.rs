//! Routes and route markers.
//!
//! A [`Route`] is consumed once by a move action and never stored.
//! [`route_markers`] turns a route into per-tile drawing hints for a
//! presentation layer; the core itself never draws them.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::grid::{CardinalDirection, GridCoord};

/// Ordered tiles from the mover's position (index 0) to the destination.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Route {
    tiles: Vec<GridCoord>,
}

impl Route {
    /// Wrap a list of tiles.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidDirection`] if two consecutive tiles are
    /// not cardinal neighbours.
    pub fn new(tiles: Vec<GridCoord>) -> Result<Self> {
        for pair in tiles.windows(2) {
            CardinalDirection::between(pair[0], pair[1])?;
        }
        Ok(Self { tiles })
    }

    /// An empty route, meaning "no path".
    #[must_use]
    pub const fn empty() -> Self {
        Self { tiles: Vec::new() }
    }

    /// Route built by the pathfinder, already known to be contiguous.
    pub(crate) fn from_contiguous(tiles: Vec<GridCoord>) -> Self {
        debug_assert!(tiles
            .windows(2)
            .all(|pair| pair[0].manhattan_distance(pair[1]) == 1));
        Self { tiles }
    }

    /// Whether the route is empty (no path).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of tiles, including the start.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Number of single-tile steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.tiles.len().saturating_sub(1)
    }

    /// First tile (the mover's position).
    #[must_use]
    pub fn start(&self) -> Option<GridCoord> {
        self.tiles.first().copied()
    }

    /// Last tile.
    #[must_use]
    pub fn destination(&self) -> Option<GridCoord> {
        self.tiles.last().copied()
    }

    /// Tile at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<GridCoord> {
        self.tiles.get(index).copied()
    }

    /// All tiles in order.
    #[must_use]
    pub fn tiles(&self) -> &[GridCoord] {
        &self.tiles
    }

    /// Consecutive `(from, to)` pairs.
    pub fn steps(&self) -> impl Iterator<Item = (GridCoord, GridCoord)> + '_ {
        self.tiles.windows(2).map(|pair| (pair[0], pair[1]))
    }

    /// Whether `coord` lies on the route.
    #[must_use]
    pub fn contains(&self, coord: GridCoord) -> bool {
        self.tiles.contains(&coord)
    }
}

/// How a route tile should be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteMarker {
    /// The mover's tile; the route leaves in this direction.
    Origin(CardinalDirection),
    /// Route passes straight through, heading this way.
    Straight(CardinalDirection),
    /// Route enters heading `from` and leaves heading `to`.
    Turn {
        /// Heading when entering the tile.
        from: CardinalDirection,
        /// Heading when leaving the tile.
        to: CardinalDirection,
    },
    /// Final tile, entered heading this way.
    Destination(CardinalDirection),
}

/// Drawing hints for every tile of a route.
///
/// Routes with fewer than two tiles have no markers.
///
/// # Errors
///
/// Returns [`BattleError::InvalidDirection`] if the route is not contiguous.
pub fn route_markers(route: &Route) -> Result<Vec<(GridCoord, RouteMarker)>> {
    let tiles = route.tiles();
    if tiles.len() < 2 {
        return Ok(Vec::new());
    }

    let headings = route
        .steps()
        .map(|(from, to)| CardinalDirection::between(from, to))
        .collect::<Result<Vec<_>>>()?;

    let last = tiles.len() - 1;
    let markers = tiles
        .iter()
        .enumerate()
        .map(|(i, &tile)| {
            let marker = if i == 0 {
                RouteMarker::Origin(headings[0])
            } else if i == last {
                RouteMarker::Destination(headings[last - 1])
            } else if headings[i - 1] == headings[i] {
                RouteMarker::Straight(headings[i])
            } else {
                RouteMarker::Turn {
                    from: headings[i - 1],
                    to: headings[i],
                }
            };
            (tile, marker)
        })
        .collect();

    Ok(markers)
}

impl From<Route> for Vec<GridCoord> {
    fn from(route: Route) -> Self {
        route.tiles
    }
}

impl TryFrom<Vec<GridCoord>> for Route {
    type Error = BattleError;

    fn try_from(tiles: Vec<GridCoord>) -> Result<Self> {
        Self::new(tiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32) -> GridCoord {
        GridCoord::new(x, y)
    }

    #[test]
    fn test_route_rejects_gaps() {
        assert!(Route::new(vec![c(0, 0), c(2, 0)]).is_err());
        assert!(Route::new(vec![c(0, 0), c(1, 1)]).is_err());
        assert!(Route::new(vec![c(0, 0), c(1, 0), c(1, 1)]).is_ok());
        assert!(Route::new(vec![c(i32::MIN, 0), c(i32::MAX, 0)]).is_err());
    }

    #[test]
    fn test_route_accessors() {
        let route = Route::new(vec![c(0, 0), c(0, 1), c(0, 2)]).unwrap();
        assert_eq!(route.start(), Some(c(0, 0)));
        assert_eq!(route.destination(), Some(c(0, 2)));
        assert_eq!(route.step_count(), 2);
        assert_eq!(route.steps().count(), 2);
        assert!(Route::empty().is_empty());
        assert_eq!(Route::empty().step_count(), 0);
    }

    #[test]
    fn test_markers_straight_and_turn() {
        // East, East, then North.
        let route = Route::new(vec![c(0, 0), c(1, 0), c(2, 0), c(2, 1)]).unwrap();
        let markers = route_markers(&route).unwrap();
        assert_eq!(
            markers,
            vec![
                (c(0, 0), RouteMarker::Origin(CardinalDirection::East)),
                (c(1, 0), RouteMarker::Straight(CardinalDirection::East)),
                (
                    c(2, 0),
                    RouteMarker::Turn {
                        from: CardinalDirection::East,
                        to: CardinalDirection::North,
                    }
                ),
                (c(2, 1), RouteMarker::Destination(CardinalDirection::North)),
            ]
        );
    }

    #[test]
    fn test_markers_short_routes() {
        assert!(route_markers(&Route::empty()).unwrap().is_empty());
        let single = Route::new(vec![c(3, 3)]).unwrap();
        assert!(route_markers(&single).unwrap().is_empty());
    }
}

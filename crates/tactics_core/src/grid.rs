//! Simplified grid positions and cardinal directions.
//!
//! The battle map is a 4-connected grid: units step North, East, South or
//! West, one tile at a time. `+y` points North and `+x` points East. Range
//! checks use Manhattan distance so that they match movement topology.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};

/// Simplified tile position on the battle grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridCoord {
    /// Column, increasing eastwards.
    pub x: i32,
    /// Row, increasing northwards.
    pub y: i32,
}

impl GridCoord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The origin tile.
    pub const ORIGIN: Self = Self::new(0, 0);

    /// Manhattan distance (number of cardinal steps on an open grid).
    ///
    /// Saturates at `u32::MAX` for coordinates at opposite ends of the
    /// `i32` range.
    #[must_use]
    pub const fn manhattan_distance(self, other: Self) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// The neighbouring coordinate one step in `direction`.
    #[must_use]
    pub const fn offset(self, direction: CardinalDirection) -> Self {
        let (dx, dy) = direction.delta();
        Self::new(self.x + dx, self.y + dy)
    }

    /// The four cardinal neighbours in the order North, East, South, West.
    #[must_use]
    pub fn cardinal_neighbors(self) -> [Self; 4] {
        CardinalDirection::ALL.map(|direction| self.offset(direction))
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Facing of a unit after a move step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CardinalDirection {
    /// Towards `+y`.
    North,
    /// Towards `+x`.
    East,
    /// Towards `-y`.
    South,
    /// Towards `-x`.
    West,
}

impl CardinalDirection {
    /// All directions, in neighbour expansion order.
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Direction of a single step from `from` to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidDirection`] unless `to - from` is one of
    /// the four axis-aligned unit deltas.
    ///
    /// # Example
    ///
    /// ```
    /// use tactics_core::grid::{CardinalDirection, GridCoord};
    ///
    /// let dir = CardinalDirection::between(GridCoord::new(0, 0), GridCoord::new(1, 0));
    /// assert_eq!(dir, Ok(CardinalDirection::East));
    /// ```
    pub fn between(from: GridCoord, to: GridCoord) -> Result<Self> {
        let dx = i64::from(to.x) - i64::from(from.x);
        let dy = i64::from(to.y) - i64::from(from.y);
        match (dx, dy) {
            (0, 1) => Ok(Self::North),
            (1, 0) => Ok(Self::East),
            (0, -1) => Ok(Self::South),
            (-1, 0) => Ok(Self::West),
            _ => Err(BattleError::InvalidDirection { from, to }),
        }
    }

    /// Unit step for this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }

    /// The direction pointing the other way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Rotation around the vertical axis a renderer applies for this facing.
    #[must_use]
    pub const fn yaw_degrees(self) -> u16 {
        match self {
            Self::North => 0,
            Self::East => 90,
            Self::South => 180,
            Self::West => 270,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manhattan_distance() {
        let a = GridCoord::new(0, 0);
        assert_eq!(a.manhattan_distance(GridCoord::new(0, 2)), 2);
        assert_eq!(a.manhattan_distance(GridCoord::new(-3, 4)), 7);
        assert_eq!(a.manhattan_distance(a), 0);
    }

    #[test]
    fn test_cardinal_neighbors_order() {
        let n = GridCoord::new(5, 5).cardinal_neighbors();
        assert_eq!(
            n,
            [
                GridCoord::new(5, 6),
                GridCoord::new(6, 5),
                GridCoord::new(5, 4),
                GridCoord::new(4, 5),
            ]
        );
    }

    #[test]
    fn test_direction_between_unit_deltas() {
        let o = GridCoord::ORIGIN;
        for direction in CardinalDirection::ALL {
            assert_eq!(CardinalDirection::between(o, o.offset(direction)), Ok(direction));
        }
    }

    #[test]
    fn test_direction_between_is_stable() {
        let first = CardinalDirection::between(GridCoord::new(0, 0), GridCoord::new(1, 0));
        for _ in 0..100 {
            assert_eq!(
                CardinalDirection::between(GridCoord::new(0, 0), GridCoord::new(1, 0)),
                first
            );
        }
        assert_eq!(first, Ok(CardinalDirection::East));
    }

    #[test]
    fn test_direction_between_rejects_invalid_deltas() {
        let o = GridCoord::ORIGIN;
        for to in [o, GridCoord::new(1, 1), GridCoord::new(2, 0), GridCoord::new(-1, -1)] {
            assert_eq!(
                CardinalDirection::between(o, to),
                Err(BattleError::InvalidDirection { from: o, to })
            );
        }

        let west_edge = GridCoord::new(i32::MIN, 0);
        let east_edge = GridCoord::new(i32::MAX, 0);
        assert_eq!(
            CardinalDirection::between(west_edge, east_edge),
            Err(BattleError::InvalidDirection {
                from: west_edge,
                to: east_edge
            })
        );
        assert!(CardinalDirection::between(east_edge, west_edge).is_err());
    }

    #[test]
    fn test_manhattan_distance_saturates_at_extremes() {
        let corner = GridCoord::new(i32::MIN, i32::MIN);
        let opposite = GridCoord::new(i32::MAX, i32::MAX);
        assert_eq!(corner.manhattan_distance(opposite), u32::MAX);
        assert_eq!(
            GridCoord::new(i32::MIN, 0).manhattan_distance(GridCoord::new(i32::MAX, 0)),
            u32::MAX
        );
        assert_eq!(GridCoord::new(-2, 3).manhattan_distance(GridCoord::new(1, -1)), 7);
    }

    #[test]
    fn test_opposite_and_yaw() {
        for direction in CardinalDirection::ALL {
            assert_eq!(direction.opposite().opposite(), direction);
            assert_eq!(
                (direction.yaw_degrees() + 180) % 360,
                direction.opposite().yaw_degrees()
            );
        }
    }
}

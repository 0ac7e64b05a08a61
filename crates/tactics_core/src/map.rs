//! Battle map: tile kinds and the [`MapService`] boundary.
//!
//! The core never owns map assets. Everything it needs from the map is
//! behind [`MapService`]; [`TileMap`] is the in-memory implementation used by
//! scenarios, tools and tests.

use serde::{Deserialize, Serialize};

use crate::error::{BattleError, Result};
use crate::grid::GridCoord;
use crate::math::Fixed;

/// Map queries needed by pathfinding.
pub trait MapService {
    /// Whether a unit may stand on `coord`. Off-map tiles are not walkable.
    fn is_walkable(&self, coord: GridCoord) -> bool;

    /// Adjacent tiles of `coord`, in a stable order.
    ///
    /// The order is part of the contract: route tie-breaking follows it.
    fn neighbors_of(&self, coord: GridCoord) -> Vec<GridCoord>;

    /// Cost of entering `coord`. `None` for impassable or off-map tiles.
    fn movement_cost(&self, coord: GridCoord) -> Option<Fixed>;
}

/// Terrain of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// Open ground (cost: 1).
    #[default]
    Plain,
    /// Forest, hills, rubble (cost: 2).
    Rough,
    /// Water, cliffs, walls.
    Blocked,
}

impl TileKind {
    /// Movement cost for this tile kind. `None` for blocked tiles.
    #[must_use]
    pub const fn movement_cost(self) -> Option<Fixed> {
        match self {
            Self::Plain => Some(Fixed::ONE),
            Self::Rough => Some(Fixed::const_from_int(2)),
            Self::Blocked => None,
        }
    }

    /// Returns true if this tile can be stood on.
    #[must_use]
    pub const fn is_walkable(self) -> bool {
        !matches!(self, Self::Blocked)
    }

    /// Map character for this tile kind.
    #[must_use]
    pub const fn symbol(self) -> char {
        match self {
            Self::Plain => '.',
            Self::Rough => '~',
            Self::Blocked => '#',
        }
    }

    /// Parse a map character.
    #[must_use]
    pub const fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '.' => Some(Self::Plain),
            '~' | '^' => Some(Self::Rough),
            '#' => Some(Self::Blocked),
            _ => None,
        }
    }
}

/// Rectangular tile map with its south-west corner at (0, 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileMap {
    /// Map width in tiles.
    width: u32,
    /// Map height in tiles.
    height: u32,
    /// Tile data stored in row-major order, row 0 is `y == 0`.
    tiles: Vec<TileKind>,
}

impl TileMap {
    /// Create a map with every tile plain.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        assert!(width > 0, "TileMap width must be positive");
        assert!(height > 0, "TileMap height must be positive");

        Self {
            width,
            height,
            tiles: vec![TileKind::Plain; (width as usize) * (height as usize)],
        }
    }

    /// Parse a map from text rows, northmost row first.
    ///
    /// `.` is plain, `~` or `^` rough, `#` blocked.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::DataParse`] for empty input, ragged rows or
    /// unknown characters.
    ///
    /// # Example
    ///
    /// ```
    /// use tactics_core::grid::GridCoord;
    /// use tactics_core::map::{MapService, TileMap};
    ///
    /// let map = TileMap::from_rows(&["..#", "..."]).unwrap();
    /// assert!(!map.is_walkable(GridCoord::new(2, 1)));
    /// assert!(map.is_walkable(GridCoord::new(2, 0)));
    /// ```
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let parse_error = |message: String| BattleError::DataParse {
            source_name: "map rows".into(),
            message,
        };

        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
        if height == 0 || width == 0 {
            return Err(parse_error("map is empty".into()));
        }

        let mut map = Self::new(width as u32, height as u32);
        for (row_index, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(parse_error(format!(
                    "row {row_index} has {} tiles, expected {width}",
                    row.chars().count()
                )));
            }

            let y = (height - 1 - row_index) as i32;
            for (x, symbol) in row.chars().enumerate() {
                let kind = TileKind::from_symbol(symbol).ok_or_else(|| {
                    parse_error(format!("unknown tile '{symbol}' in row {row_index}"))
                })?;
                map.set_tile(GridCoord::new(x as i32, y), kind);
            }
        }

        Ok(map)
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a coordinate is on the map.
    #[must_use]
    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    #[inline]
    fn index(&self, coord: GridCoord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| (coord.y as usize) * (self.width as usize) + (coord.x as usize))
    }

    /// Tile kind at `coord`, `None` if off the map.
    #[must_use]
    pub fn tile(&self, coord: GridCoord) -> Option<TileKind> {
        self.index(coord).map(|i| self.tiles[i])
    }

    /// Set the tile kind at `coord`.
    /// Returns `false` if out of bounds.
    pub fn set_tile(&mut self, coord: GridCoord, kind: TileKind) -> bool {
        match self.index(coord) {
            Some(i) => {
                self.tiles[i] = kind;
                true
            }
            None => false,
        }
    }

    /// Render the map back to text rows, northmost row first.
    #[must_use]
    pub fn to_rows(&self) -> Vec<String> {
        (0..self.height as i32)
            .rev()
            .map(|y| {
                (0..self.width as i32)
                    .filter_map(|x| self.tile(GridCoord::new(x, y)))
                    .map(TileKind::symbol)
                    .collect()
            })
            .collect()
    }
}

impl MapService for TileMap {
    fn is_walkable(&self, coord: GridCoord) -> bool {
        self.tile(coord).is_some_and(TileKind::is_walkable)
    }

    fn neighbors_of(&self, coord: GridCoord) -> Vec<GridCoord> {
        coord
            .cardinal_neighbors()
            .into_iter()
            .filter(|n| self.in_bounds(*n))
            .collect()
    }

    fn movement_cost(&self, coord: GridCoord) -> Option<Fixed> {
        self.tile(coord).and_then(TileKind::movement_cost)
    }
}

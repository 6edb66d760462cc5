//! Tile classification grid.
//!
//! Maps continuous world coordinates onto unit tiles and records which
//! tiles are blocked for a ground unit. The grid is rebuilt from the
//! current building set whenever a path is planned, so destroyed
//! buildings and walls open up immediately.

use serde::{Deserialize, Serialize};

use crate::buildings::Building;
use crate::math::{Fixed, Rect, Vec2Fixed, HALF};

/// Occupancy of a single tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileState {
    /// Walkable.
    #[default]
    Free,
    /// Inside a building hitbox; impassable for ground units.
    Building,
    /// Wall segment; passable at a per-kind penalty.
    Wall,
}

/// Square tile grid, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    size: u32,
    tiles: Vec<TileState>,
}

impl TileGrid {
    /// Create a grid with every tile free.
    #[must_use]
    pub fn new(size: u32) -> Self {
        Self {
            size,
            tiles: vec![TileState::Free; (size as usize) * (size as usize)],
        }
    }

    /// Classify tiles for a unit.
    ///
    /// Flying units see an empty grid. Ground units see live building
    /// hitboxes as [`TileState::Building`] and live walls as
    /// [`TileState::Wall`]; a wall standing in a building's gap is
    /// classified as a wall.
    #[must_use]
    pub fn from_buildings(size: u32, structures: &[Building], walls: &[Building], flying: bool) -> Self {
        let mut grid = Self::new(size);
        if flying {
            return grid;
        }

        for building in structures.iter().filter(|b| !b.is_destroyed()) {
            grid.mark_rect(building.hitbox(), TileState::Building);
        }
        for wall in walls.iter().filter(|w| !w.is_destroyed()) {
            if let (Ok(x), Ok(y)) = (u32::try_from(wall.x), u32::try_from(wall.y)) {
                grid.set(x, y, TileState::Wall);
            }
        }
        grid
    }

    /// Side length in tiles.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        (y as usize) * (self.size as usize) + (x as usize)
    }

    /// Check if coordinates are within grid bounds.
    #[must_use]
    pub const fn in_bounds(&self, x: u32, y: u32) -> bool {
        x < self.size && y < self.size
    }

    /// Tile state, or `None` out of bounds.
    #[must_use]
    pub fn get(&self, x: u32, y: u32) -> Option<TileState> {
        self.in_bounds(x, y).then(|| self.tiles[self.index(x, y)])
    }

    /// Set a tile. Out-of-bounds writes are ignored.
    pub fn set(&mut self, x: u32, y: u32, state: TileState) {
        if self.in_bounds(x, y) {
            let index = self.index(x, y);
            self.tiles[index] = state;
        }
    }

    /// Whether a tile is in bounds and free.
    #[must_use]
    pub fn is_free(&self, x: u32, y: u32) -> bool {
        self.get(x, y) == Some(TileState::Free)
    }

    /// Mark every tile whose area intersects `rect`, edges included.
    fn mark_rect(&mut self, rect: Rect, state: TileState) {
        let max = i64::from(self.size) - 1;
        let first_x = rect.min.x.floor().to_num::<i64>().clamp(0, max);
        let first_y = rect.min.y.floor().to_num::<i64>().clamp(0, max);
        let last_x = rect.max.x.floor().to_num::<i64>().clamp(0, max);
        let last_y = rect.max.y.floor().to_num::<i64>().clamp(0, max);

        for y in first_y..=last_y {
            for x in first_x..=last_x {
                // Bounds were clamped above, the casts cannot truncate.
                self.set(x as u32, y as u32, state);
            }
        }
    }

    /// Tile containing a world point, clamped onto the grid.
    #[must_use]
    pub fn clamp_tile(&self, point: Vec2Fixed) -> (u32, u32) {
        let max = i64::from(self.size) - 1;
        let x = point.x.floor().to_num::<i64>().clamp(0, max);
        let y = point.y.floor().to_num::<i64>().clamp(0, max);
        (x as u32, y as u32)
    }

    /// Centre of a tile in world units.
    #[must_use]
    pub fn tile_center(x: u32, y: u32) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x) + HALF, Fixed::from_num(y) + HALF)
    }

    /// Count of tiles in a given state.
    #[must_use]
    pub fn count(&self, state: TileState) -> usize {
        self.tiles.iter().filter(|t| **t == state).count()
    }
}

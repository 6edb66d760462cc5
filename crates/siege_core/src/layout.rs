//! Base layouts: placement rules, population caps and scoring.
//!
//! A [`BaseLayout`] owns two arenas, one for structures and one for wall
//! segments, addressed by [`BuildingId`]. Placement is validated against
//! grid bounds, footprint overlap, clearance gaps and per-kind caps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::buildings::{Building, BuildingId, BuildingKind};
use crate::data::GameData;
use crate::error::{Result, SiegeError};
use crate::grid::TileGrid;

/// Default grid side length.
pub const DEFAULT_GRID_SIZE: u32 = 44;

// ============================================================================
// Layout schema
// ============================================================================

/// One non-wall building in the layout schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingEntry {
    /// Kind identifier, e.g. `"cannon"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Level.
    pub level: u8,
    /// Origin x.
    pub x: i32,
    /// Origin y.
    pub y: i32,
}

/// One wall segment in the layout schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallEntry {
    /// Level.
    pub level: u8,
    /// Tile x.
    pub x: i32,
    /// Tile y.
    pub y: i32,
}

/// Serializable description of a base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutData {
    /// Display name.
    pub name: String,
    /// Non-wall buildings.
    #[serde(default)]
    pub buildings: Vec<BuildingEntry>,
    /// Wall segments.
    #[serde(default)]
    pub walls: Vec<WallEntry>,
}

/// An entry that failed validation while loading a layout.
#[derive(Debug)]
pub struct RejectedEntry {
    /// Kind identifier as written.
    pub kind: String,
    /// Level as written.
    pub level: u8,
    /// Origin as written.
    pub position: (i32, i32),
    /// Why it was rejected.
    pub error: SiegeError,
}

// ============================================================================
// BaseLayout
// ============================================================================

/// A defended base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseLayout {
    name: String,
    grid_size: u32,
    data: GameData,
    structures: Vec<Building>,
    walls: Vec<Building>,
    counts: BTreeMap<BuildingKind, u32>,
    /// Footprint owner of each tile, row-major.
    occupancy: Vec<Option<BuildingId>>,
}

impl BaseLayout {
    /// Empty base on the default grid with the built-in stat tables.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_data(name, GameData::default(), DEFAULT_GRID_SIZE)
    }

    /// Empty base with explicit stat tables and grid size.
    #[must_use]
    pub fn with_data(name: impl Into<String>, data: GameData, grid_size: u32) -> Self {
        Self {
            name: name.into(),
            grid_size,
            data,
            structures: Vec::new(),
            walls: Vec::new(),
            counts: BTreeMap::new(),
            occupancy: vec![None; (grid_size as usize) * (grid_size as usize)],
        }
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid side length.
    #[must_use]
    pub const fn grid_size(&self) -> u32 {
        self.grid_size
    }

    /// Stat tables used by this layout.
    #[must_use]
    pub const fn data(&self) -> &GameData {
        &self.data
    }

    /// Non-wall buildings.
    #[must_use]
    pub fn structures(&self) -> &[Building] {
        &self.structures
    }

    /// Wall segments.
    #[must_use]
    pub fn walls(&self) -> &[Building] {
        &self.walls
    }

    /// Mutable access to the non-wall buildings.
    pub fn structures_mut(&mut self) -> &mut [Building] {
        &mut self.structures
    }

    /// Look up a building by handle.
    #[must_use]
    pub fn get(&self, id: BuildingId) -> Option<&Building> {
        match id {
            BuildingId::Structure(i) => self.structures.get(i),
            BuildingId::Wall(i) => self.walls.get(i),
        }
    }

    /// Look up a building mutably by handle.
    pub fn get_mut(&mut self, id: BuildingId) -> Option<&mut Building> {
        match id {
            BuildingId::Structure(i) => self.structures.get_mut(i),
            BuildingId::Wall(i) => self.walls.get_mut(i),
        }
    }

    /// Every building and wall with its handle, structures first.
    pub fn iter(&self) -> impl Iterator<Item = (BuildingId, &Building)> {
        let structures = self
            .structures
            .iter()
            .enumerate()
            .map(|(i, b)| (BuildingId::Structure(i), b));
        let walls = self
            .walls
            .iter()
            .enumerate()
            .map(|(i, b)| (BuildingId::Wall(i), b));
        structures.chain(walls)
    }

    /// Placed count per kind.
    #[must_use]
    pub const fn building_counts(&self) -> &BTreeMap<BuildingKind, u32> {
        &self.counts
    }

    /// Defensive buildings with their handles.
    pub fn defenses(&self) -> impl Iterator<Item = (BuildingId, &Building)> {
        self.iter().filter(|(_, b)| b.kind.is_defense())
    }

    /// Resource buildings with their handles.
    pub fn resource_buildings(&self) -> impl Iterator<Item = (BuildingId, &Building)> {
        self.iter().filter(|(_, b)| b.kind.is_resource())
    }

    // ------------------------------------------------------------------------
    // Placement
    // ------------------------------------------------------------------------

    /// Place a building, reporting why placement failed.
    ///
    /// # Errors
    ///
    /// - [`SiegeError::BuildingLimitReached`] if the kind is at its cap
    /// - [`SiegeError::UnknownLevel`] if the level is not tabulated
    /// - [`SiegeError::OutOfBounds`] if the footprint leaves the grid
    /// - [`SiegeError::Overlap`] if the footprint covers another building
    /// - [`SiegeError::GapViolation`] if a non-wall building would sit
    ///   inside the clearance of another non-wall building
    pub fn try_add_building(&mut self, kind: BuildingKind, level: u8, x: i32, y: i32) -> Result<BuildingId> {
        let limit = self.data.limit(kind);
        if self.counts.get(&kind).copied().unwrap_or(0) >= limit {
            return Err(SiegeError::BuildingLimitReached {
                kind: kind.as_str().to_string(),
                limit,
            });
        }

        let building = Building::new(kind, level, x, y, &self.data)?;
        let size = i32::from(building.size);
        let grid = i32::try_from(self.grid_size).unwrap_or(i32::MAX);
        if x < 0 || y < 0 || x + size > grid || y + size > grid {
            return Err(SiegeError::OutOfBounds {
                x: f64::from(x),
                y: f64::from(y),
                grid_size: self.grid_size,
            });
        }

        if self.tiles(x, y, x + size, y + size).any(|owner| owner.is_some()) {
            return Err(SiegeError::Overlap {
                kind: kind.as_str().to_string(),
                x,
                y,
            });
        }

        if !kind.is_wall() {
            let gap = building.gap.ceil().to_num::<i32>();
            let crowded = self
                .tiles(x - gap, y - gap, x + size + gap, y + size + gap)
                .any(|owner| matches!(owner, Some(BuildingId::Structure(_))));
            if crowded {
                return Err(SiegeError::GapViolation {
                    kind: kind.as_str().to_string(),
                    x,
                    y,
                });
            }
        }

        let id = if kind.is_wall() {
            self.walls.push(building);
            BuildingId::Wall(self.walls.len() - 1)
        } else {
            self.structures.push(building);
            BuildingId::Structure(self.structures.len() - 1)
        };
        self.mark(x, y, size, Some(id));
        *self.counts.entry(kind).or_insert(0) += 1;
        Ok(id)
    }

    /// Place a building by kind name. Failures are logged and reported as
    /// `false`.
    pub fn add_building(&mut self, kind: &str, level: u8, position: (i32, i32)) -> bool {
        let result = kind
            .parse::<BuildingKind>()
            .and_then(|kind| self.try_add_building(kind, level, position.0, position.1));
        match result {
            Ok(_) => true,
            Err(error) => {
                warn!(kind, level, x = position.0, y = position.1, %error, "Placement rejected");
                false
            }
        }
    }

    /// Remove a building.
    ///
    /// Handles of later buildings in the same arena shift down by one.
    pub fn remove_building(&mut self, id: BuildingId) -> Option<Building> {
        let removed = match id {
            BuildingId::Structure(i) if i < self.structures.len() => self.structures.remove(i),
            BuildingId::Wall(i) if i < self.walls.len() => self.walls.remove(i),
            _ => return None,
        };
        if let Some(count) = self.counts.get_mut(&removed.kind) {
            *count = count.saturating_sub(1);
        }
        self.rebuild_occupancy();
        Some(removed)
    }

    /// Occupancy of tiles in `[x0, x1) × [y0, y1)`, clipped to the grid.
    fn tiles(&self, x0: i32, y0: i32, x1: i32, y1: i32) -> impl Iterator<Item = Option<BuildingId>> + '_ {
        let grid = i32::try_from(self.grid_size).unwrap_or(i32::MAX);
        let (x0, x1) = (x0.max(0), x1.min(grid));
        let (y0, y1) = (y0.max(0), y1.min(grid));
        let width = self.grid_size as usize;
        (y0..y1).flat_map(move |ty| {
            (x0..x1).map(move |tx| self.occupancy[(ty as usize) * width + tx as usize])
        })
    }

    fn mark(&mut self, x: i32, y: i32, size: i32, owner: Option<BuildingId>) {
        let width = self.grid_size as usize;
        for ty in y..y + size {
            for tx in x..x + size {
                if let Some(cell) = self.occupancy.get_mut((ty as usize) * width + tx as usize) {
                    *cell = owner;
                }
            }
        }
    }

    fn rebuild_occupancy(&mut self) {
        self.occupancy.iter_mut().for_each(|cell| *cell = None);
        let placed: Vec<(BuildingId, i32, i32, i32)> = self
            .iter()
            .map(|(id, b)| (id, b.x, b.y, i32::from(b.size)))
            .collect();
        for (id, x, y, size) in placed {
            self.mark(x, y, size, Some(id));
        }
    }

    // ------------------------------------------------------------------------
    // Schema
    // ------------------------------------------------------------------------

    /// Export to the layout schema.
    #[must_use]
    pub fn to_layout_data(&self) -> LayoutData {
        LayoutData {
            name: self.name.clone(),
            buildings: self
                .structures
                .iter()
                .map(|b| BuildingEntry {
                    kind: b.kind.as_str().to_string(),
                    level: b.level,
                    x: b.x,
                    y: b.y,
                })
                .collect(),
            walls: self
                .walls
                .iter()
                .map(|w| WallEntry {
                    level: w.level,
                    x: w.x,
                    y: w.y,
                })
                .collect(),
        }
    }

    /// Build a layout from the schema.
    ///
    /// Entries that fail validation are skipped with a warning and
    /// returned alongside the layout.
    #[must_use]
    pub fn from_layout_data(layout: &LayoutData, data: GameData, grid_size: u32) -> (Self, Vec<RejectedEntry>) {
        let mut base = Self::with_data(layout.name.clone(), data, grid_size);
        let mut rejected = Vec::new();

        let entries = layout
            .buildings
            .iter()
            .map(|b| (b.kind.as_str(), b.level, b.x, b.y))
            .chain(layout.walls.iter().map(|w| ("wall", w.level, w.x, w.y)));

        for (kind, level, x, y) in entries {
            let result = kind
                .parse::<BuildingKind>()
                .and_then(|parsed| base.try_add_building(parsed, level, x, y));
            if let Err(error) = result {
                warn!(layout = %layout.name, kind, level, x, y, %error, "Skipping layout entry");
                rejected.push(RejectedEntry {
                    kind: kind.to_string(),
                    level,
                    position: (x, y),
                    error,
                });
            }
        }

        (base, rejected)
    }

    // ------------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------------

    /// Number of destroyed non-wall buildings.
    #[must_use]
    pub fn destroyed_count(&self) -> usize {
        self.structures.iter().filter(|b| b.is_destroyed()).count()
    }

    /// Whether every non-wall building is destroyed. Walls never count.
    #[must_use]
    pub fn all_structures_destroyed(&self) -> bool {
        self.structures.iter().all(Building::is_destroyed)
    }

    /// Share of non-wall buildings destroyed, 0–100.
    #[must_use]
    pub fn destruction_percentage(&self) -> f64 {
        if self.structures.is_empty() {
            return 0.0;
        }
        self.destroyed_count() as f64 * 100.0 / self.structures.len() as f64
    }

    /// Whether any town hall has fallen.
    #[must_use]
    pub fn town_hall_destroyed(&self) -> bool {
        self.structures
            .iter()
            .any(|b| b.kind == BuildingKind::TownHall && b.is_destroyed())
    }

    /// Star rating: one for half destruction or the town hall, two for
    /// both, three for total destruction.
    #[must_use]
    pub fn stars(&self) -> u8 {
        let total = self.structures.len();
        let destroyed = self.destroyed_count();
        if total > 0 && destroyed == total {
            return 3;
        }
        let half = total > 0 && destroyed * 2 >= total;
        match (half, self.town_hall_destroyed()) {
            (true, true) => 2,
            (true, false) | (false, true) => 1,
            (false, false) => 0,
        }
    }

    /// Remaining hit points across buildings and walls.
    #[must_use]
    pub fn total_hp(&self) -> u64 {
        self.iter().map(|(_, b)| u64::from(b.hp)).sum()
    }

    /// Restore every building to full health.
    pub fn reset(&mut self) {
        self.structures.iter_mut().for_each(Building::reset);
        self.walls.iter_mut().for_each(Building::reset);
    }

    /// Tile classification for pathfinding.
    #[must_use]
    pub fn tile_grid(&self, flying: bool) -> TileGrid {
        TileGrid::from_buildings(self.grid_size, &self.structures, &self.walls, flying)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_building_validates() {
        let mut base = BaseLayout::new("test");
        assert!(base.add_building("town_hall", 3, (20, 20)));
        // Overlap.
        assert!(matches!(
            base.try_add_building(BuildingKind::Cannon, 1, 21, 21),
            Err(SiegeError::Overlap { .. })
        ));
        // Touching the town hall leaves no gap.
        assert!(matches!(
            base.try_add_building(BuildingKind::Cannon, 1, 24, 20),
            Err(SiegeError::GapViolation { .. })
        ));
        // One free tile is enough.
        assert!(base.add_building("cannon", 1, (25, 20)));
        // Off the grid.
        assert!(matches!(
            base.try_add_building(BuildingKind::Cannon, 1, 42, 0),
            Err(SiegeError::OutOfBounds { .. })
        ));
        // Unknown kind and level.
        assert!(!base.add_building("moat", 1, (0, 0)));
        assert!(matches!(
            base.try_add_building(BuildingKind::Mortar, 7, 0, 0),
            Err(SiegeError::UnknownLevel { .. })
        ));
    }

    #[test]
    fn test_limits() {
        let mut base = BaseLayout::new("limits");
        assert!(base.add_building("town_hall", 3, (0, 0)));
        assert!(matches!(
            base.try_add_building(BuildingKind::TownHall, 3, 10, 10),
            Err(SiegeError::BuildingLimitReached { limit: 1, .. })
        ));
        assert_eq!(base.building_counts().get(&BuildingKind::TownHall), Some(&1));
    }

    #[test]
    fn test_walls_may_sit_in_gap() {
        let mut base = BaseLayout::new("walls");
        assert!(base.add_building("cannon", 1, (10, 10)));
        assert!(base.add_building("wall", 1, (9, 10)));
        assert!(base.add_building("wall", 1, (13, 10)));
        assert!(!base.add_building("wall", 1, (11, 11)));
        assert_eq!(base.walls().len(), 2);
        assert_eq!(base.structures().len(), 1);
    }

    #[test]
    fn test_remove_building_frees_tiles() {
        let mut base = BaseLayout::new("remove");
        assert!(base.add_building("cannon", 1, (10, 10)));
        let removed = base.remove_building(BuildingId::Structure(0)).unwrap();
        assert_eq!(removed.kind, BuildingKind::Cannon);
        assert_eq!(base.building_counts().get(&BuildingKind::Cannon), Some(&0));
        assert!(base.add_building("cannon", 1, (11, 11)));
        assert!(base.remove_building(BuildingId::Wall(3)).is_none());
    }

    #[test]
    fn test_layout_round_trip() {
        let mut base = BaseLayout::new("round trip");
        assert!(base.add_building("town_hall", 3, (20, 20)));
        assert!(base.add_building("mortar", 1, (10, 10)));
        assert!(base.add_building("wall", 2, (18, 18)));

        let data = base.to_layout_data();
        assert_eq!(data.buildings[0].kind, "town_hall");
        let (rebuilt, rejected) = BaseLayout::from_layout_data(&data, GameData::default(), 44);
        assert!(rejected.is_empty());
        assert_eq!(rebuilt, base);
    }

    #[test]
    fn test_from_layout_data_skips_bad_entries() {
        let data = LayoutData {
            name: "bad".into(),
            buildings: vec![
                BuildingEntry {
                    kind: "town_hall".into(),
                    level: 3,
                    x: 5,
                    y: 5,
                },
                BuildingEntry {
                    kind: "dragon_lair".into(),
                    level: 1,
                    x: 20,
                    y: 20,
                },
            ],
            walls: vec![WallEntry { level: 1, x: 6, y: 6 }],
        };
        let (base, rejected) = BaseLayout::from_layout_data(&data, GameData::default(), 44);
        assert_eq!(base.structures().len(), 1);
        assert!(base.walls().is_empty());
        assert_eq!(rejected.len(), 2);
        assert!(matches!(rejected[0].error, SiegeError::UnknownBuildingKind(_)));
        assert!(matches!(rejected[1].error, SiegeError::Overlap { .. }));
    }

    #[test]
    fn test_stars_and_destruction() {
        let mut base = BaseLayout::new("stars");
        assert!(base.add_building("town_hall", 3, (0, 0)));
        assert!(base.add_building("cannon", 1, (10, 0)));
        assert!(base.add_building("gold_mine", 1, (20, 0)));
        assert!(base.add_building("elixir_collector", 1, (30, 0)));
        assert!(base.add_building("wall", 1, (40, 40)));
        assert_eq!(base.stars(), 0);

        base.structures_mut()[0].take_damage(u32::MAX);
        assert!(base.town_hall_destroyed());
        assert_eq!(base.stars(), 1);
        assert!((base.destruction_percentage() - 25.0).abs() < f64::EPSILON);

        base.structures_mut()[1].take_damage(u32::MAX);
        assert_eq!(base.stars(), 2);

        base.structures_mut()[2].take_damage(u32::MAX);
        base.structures_mut()[3].take_damage(u32::MAX);
        assert!(base.all_structures_destroyed());
        assert_eq!(base.stars(), 3);
        assert!(!base.walls()[0].is_destroyed());

        base.reset();
        assert_eq!(base.stars(), 0);
        assert_eq!(base.total_hp(), 1_400 + 420 + 400 + 400 + 300);
    }

    #[test]
    fn test_half_without_town_hall_is_one_star() {
        let mut base = BaseLayout::new("half");
        assert!(base.add_building("town_hall", 3, (0, 0)));
        assert!(base.add_building("cannon", 1, (10, 0)));
        base.structures_mut()[1].take_damage(u32::MAX);
        assert_eq!(base.stars(), 1);
    }

    #[test]
    fn test_category_views() {
        let mut base = BaseLayout::new("views");
        assert!(base.add_building("cannon", 1, (0, 0)));
        assert!(base.add_building("gold_storage", 1, (10, 0)));
        assert!(base.add_building("laboratory", 1, (20, 0)));
        assert_eq!(base.defenses().count(), 1);
        assert_eq!(base.resource_buildings().count(), 1);
    }
}

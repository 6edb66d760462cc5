//! Building catalogue and per-building combat state.
//!
//! A [`Building`] is a flat record: identity (`kind`, `level`, origin),
//! geometry (`size`, `gap`) and life (`hp`, `destroyed`). Defensive kinds
//! additionally carry a [`DefenseState`] with their weapon stats and
//! current target handle.
//!
//! All geometry is expressed in tiles using fixed-point math.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::{GameData, WeaponStats};
use crate::error::{Result, SiegeError};
use crate::math::{fixed_serde, Fixed, Rect, Vec2Fixed, HALF};
use crate::troops::TroopId;

// ============================================================================
// Kinds
// ============================================================================

/// Every building kind a base may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildingKind {
    /// Town hall.
    TownHall,
    /// Single-target ground defense.
    Cannon,
    /// Single-target ground and air defense.
    ArcherTower,
    /// Splash ground defense with a dead zone.
    Mortar,
    /// Clan castle.
    ClanCastle,
    /// Army camp.
    ArmyCamp,
    /// Barracks.
    Barracks,
    /// Laboratory.
    Laboratory,
    /// Builder's hut.
    BuilderHut,
    /// Elixir collector.
    ElixirCollector,
    /// Elixir storage.
    ElixirStorage,
    /// Gold mine.
    GoldMine,
    /// Gold storage.
    GoldStorage,
    /// One wall segment.
    Wall,
}

/// Coarse grouping used by targeting and scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingCategory {
    /// The town hall.
    TownHall,
    /// Buildings that shoot back.
    Defense,
    /// Collectors and storages.
    Resource,
    /// Troop production and research.
    Army,
    /// Everything else that counts towards destruction.
    Utility,
    /// Walls.
    Wall,
}

impl BuildingKind {
    /// All kinds, in catalogue order.
    pub const ALL: [Self; 14] = [
        Self::TownHall,
        Self::Cannon,
        Self::ArcherTower,
        Self::Mortar,
        Self::ClanCastle,
        Self::ArmyCamp,
        Self::Barracks,
        Self::Laboratory,
        Self::BuilderHut,
        Self::ElixirCollector,
        Self::ElixirStorage,
        Self::GoldMine,
        Self::GoldStorage,
        Self::Wall,
    ];

    /// Layout-file identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TownHall => "town_hall",
            Self::Cannon => "cannon",
            Self::ArcherTower => "archer_tower",
            Self::Mortar => "mortar",
            Self::ClanCastle => "clan_castle",
            Self::ArmyCamp => "army_camp",
            Self::Barracks => "barracks",
            Self::Laboratory => "laboratory",
            Self::BuilderHut => "builder_hut",
            Self::ElixirCollector => "elixir_collector",
            Self::ElixirStorage => "elixir_storage",
            Self::GoldMine => "gold_mine",
            Self::GoldStorage => "gold_storage",
            Self::Wall => "wall",
        }
    }

    /// Category of this kind.
    #[must_use]
    pub const fn category(self) -> BuildingCategory {
        match self {
            Self::TownHall => BuildingCategory::TownHall,
            Self::Cannon | Self::ArcherTower | Self::Mortar => BuildingCategory::Defense,
            Self::ElixirCollector | Self::ElixirStorage | Self::GoldMine | Self::GoldStorage => {
                BuildingCategory::Resource
            }
            Self::Barracks | Self::ArmyCamp | Self::Laboratory => BuildingCategory::Army,
            Self::ClanCastle | Self::BuilderHut => BuildingCategory::Utility,
            Self::Wall => BuildingCategory::Wall,
        }
    }

    /// Whether this kind is a wall segment.
    #[must_use]
    pub const fn is_wall(self) -> bool {
        matches!(self, Self::Wall)
    }

    /// Whether this kind is a defense.
    #[must_use]
    pub const fn is_defense(self) -> bool {
        matches!(self.category(), BuildingCategory::Defense)
    }

    /// Whether this kind stores or produces resources.
    #[must_use]
    pub const fn is_resource(self) -> bool {
        matches!(self.category(), BuildingCategory::Resource)
    }
}

impl fmt::Display for BuildingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildingKind {
    type Err = SiegeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SiegeError::UnknownBuildingKind(s.to_string()))
    }
}

/// Stable handle to a building inside a [`crate::layout::BaseLayout`].
///
/// Structures and walls live in separate arenas, so the handle records
/// which one it indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildingId {
    /// Index into the non-wall building list.
    Structure(usize),
    /// Index into the wall list.
    Wall(usize),
}

// ============================================================================
// Building
// ============================================================================

/// Mutable combat state of a defensive building.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseState {
    /// Weapon stats for this level.
    pub weapon: WeaponStats,
    /// Troop currently tracked, if any.
    pub target: Option<TroopId>,
    /// Simulated time of the last shot.
    pub last_attack_ms: u64,
}

/// A placed building or wall segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Building {
    /// Kind.
    pub kind: BuildingKind,
    /// Level.
    pub level: u8,
    /// Origin tile (lower-left corner of the footprint).
    pub x: i32,
    /// Origin tile (lower-left corner of the footprint).
    pub y: i32,
    /// Footprint side length in tiles.
    pub size: u8,
    /// Clearance around the footprint.
    #[serde(with = "fixed_serde")]
    pub gap: Fixed,
    /// Maximum hit points.
    pub max_hp: u32,
    /// Current hit points.
    pub hp: u32,
    /// Set once `hp` reaches zero; never cleared except by [`Building::reset`].
    pub destroyed: bool,
    /// Weapon and target state for defenses.
    pub defense: Option<DefenseState>,
}

impl Building {
    /// Instantiate a building from the stat tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind/level pair is not in `data`.
    pub fn new(kind: BuildingKind, level: u8, x: i32, y: i32, data: &GameData) -> Result<Self> {
        let stats = data.building_level(kind, level)?;
        Ok(Self {
            kind,
            level,
            x,
            y,
            size: stats.size,
            gap: data.gap(kind),
            max_hp: stats.hp,
            hp: stats.hp,
            destroyed: false,
            defense: stats.weapon.clone().map(|weapon| DefenseState {
                weapon,
                target: None,
                last_attack_ms: 0,
            }),
        })
    }

    /// Whether the building has been destroyed.
    #[must_use]
    pub const fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether this building is a defense that can still fire.
    #[must_use]
    pub const fn is_active_defense(&self) -> bool {
        self.defense.is_some() && !self.destroyed
    }

    /// Footprint rectangle, without the gap.
    #[must_use]
    pub fn footprint(&self) -> Rect {
        let size = i32::from(self.size);
        Rect::new(
            Vec2Fixed::from_ints(self.x, self.y),
            Vec2Fixed::from_ints(self.x + size, self.y + size),
        )
    }

    /// Footprint expanded by the clearance gap.
    #[must_use]
    pub fn hitbox(&self) -> Rect {
        self.footprint().expand(self.gap)
    }

    /// Geometric centre of the footprint.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        let half = Fixed::from_num(self.size) * HALF;
        Vec2Fixed::new(
            Fixed::from_num(self.x) + half,
            Fixed::from_num(self.y) + half,
        )
    }

    /// Apply damage. Returns `true` if this hit destroyed the building.
    ///
    /// Damage to an already destroyed building is ignored.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if self.destroyed {
            return false;
        }
        self.hp = self.hp.saturating_sub(amount);
        if self.hp == 0 {
            self.destroyed = true;
            if let Some(defense) = self.defense.as_mut() {
                defense.target = None;
            }
            return true;
        }
        false
    }

    /// Restore full hp and clear combat state.
    pub fn reset(&mut self) {
        self.hp = self.max_hp;
        self.destroyed = false;
        if let Some(defense) = self.defense.as_mut() {
            defense.target = None;
            defense.last_attack_ms = 0;
        }
    }

    /// Points from which an attacker with `range` can hit this building.
    ///
    /// Samples every half tile along the rectangle offset `range` outside
    /// the hitbox, keeps points inside the grid and within range of the
    /// hitbox, and returns them sorted and deduplicated.
    #[must_use]
    pub fn attack_positions(&self, range: Fixed, grid_size: u32) -> Vec<Vec2Fixed> {
        let hitbox = self.hitbox();
        let ring = hitbox.expand(range);
        let mut points = BTreeSet::new();

        let mut x = ring.min.x;
        while x <= ring.max.x {
            points.insert(Vec2Fixed::new(x, ring.min.y));
            points.insert(Vec2Fixed::new(x, ring.max.y));
            x += HALF;
        }
        let mut y = ring.min.y;
        while y <= ring.max.y {
            points.insert(Vec2Fixed::new(ring.min.x, y));
            points.insert(Vec2Fixed::new(ring.max.x, y));
            y += HALF;
        }

        let limit = Fixed::from_num(grid_size);
        points
            .into_iter()
            .filter(|p| p.x >= Fixed::ZERO && p.y >= Fixed::ZERO && p.x < limit && p.y < limit)
            .filter(|p| hitbox.within_range(*p, range))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(kind: BuildingKind, level: u8, x: i32, y: i32) -> Building {
        Building::new(kind, level, x, y, &GameData::default()).unwrap()
    }

    #[test]
    fn test_kind_parse_and_display() {
        for kind in BuildingKind::ALL {
            assert_eq!(kind.as_str().parse::<BuildingKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.as_str());
        }
        assert!(matches!(
            "moat".parse::<BuildingKind>(),
            Err(SiegeError::UnknownBuildingKind(_))
        ));
    }

    #[test]
    fn test_categories() {
        assert!(BuildingKind::Mortar.is_defense());
        assert!(BuildingKind::GoldMine.is_resource());
        assert!(BuildingKind::Wall.is_wall());
        assert_eq!(BuildingKind::Laboratory.category(), BuildingCategory::Army);
        assert_eq!(BuildingKind::TownHall.category(), BuildingCategory::TownHall);
    }

    #[test]
    fn test_geometry() {
        let th = build(BuildingKind::TownHall, 3, 20, 20);
        assert_eq!(th.size, 4);
        assert_eq!(th.center(), Vec2Fixed::from_ints(22, 22));
        let hitbox = th.hitbox();
        assert_eq!(hitbox.min, Vec2Fixed::from_f64(19.5, 19.5));
        assert_eq!(hitbox.max, Vec2Fixed::from_f64(24.5, 24.5));

        let wall = build(BuildingKind::Wall, 1, 5, 5);
        assert_eq!(wall.hitbox(), wall.footprint());
        assert_eq!(wall.center(), Vec2Fixed::from_f64(5.5, 5.5));
    }

    #[test]
    fn test_defense_state_only_on_defenses() {
        assert!(build(BuildingKind::Cannon, 1, 0, 0).defense.is_some());
        assert!(build(BuildingKind::Mortar, 1, 0, 0).defense.is_some());
        assert!(build(BuildingKind::GoldMine, 1, 0, 0).defense.is_none());
    }

    #[test]
    fn test_take_damage_clamps_and_latches() {
        let mut wall = build(BuildingKind::Wall, 1, 0, 0);
        assert!(!wall.take_damage(100));
        assert_eq!(wall.hp, 200);
        assert!(wall.take_damage(500));
        assert_eq!(wall.hp, 0);
        assert!(wall.is_destroyed());
        assert!(!wall.take_damage(10));
        assert_eq!(wall.hp, 0);

        wall.reset();
        assert_eq!(wall.hp, 300);
        assert!(!wall.is_destroyed());
    }

    #[test]
    fn test_attack_positions_within_range() {
        let cannon = build(BuildingKind::Cannon, 1, 10, 10);
        let range = Fixed::from_num(0.4);
        let positions = cannon.attack_positions(range, 44);
        assert!(!positions.is_empty());

        let hitbox = cannon.hitbox();
        for p in &positions {
            assert!(hitbox.within_range(*p, range));
        }
        // Corners of the offset ring are sqrt(2) * range away and excluded.
        let corner = hitbox.expand(range).min;
        assert!(!positions.contains(&corner));

        let mut sorted = positions.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, positions);
    }

    #[test]
    fn test_attack_positions_clipped_to_grid() {
        let hut = build(BuildingKind::BuilderHut, 1, 0, 0);
        let positions = hut.attack_positions(Fixed::ONE, 44);
        assert!(!positions.is_empty());
        assert!(positions
            .iter()
            .all(|p| p.x >= Fixed::ZERO && p.y >= Fixed::ZERO));
    }
}

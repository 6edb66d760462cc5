//! Building stat tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::math::{fixed_decimal, option_fixed_decimal, Fixed, HALF};

/// Weapon attached to a defensive building level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponStats {
    /// Damage per shot (at the impact point for splash weapons).
    pub damage: u32,

    /// Maximum range, measured from the building footprint edge.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,

    /// Dead zone around the building centre. Zero for direct-fire weapons.
    #[serde(default, with = "fixed_decimal")]
    pub range_min: Fixed,

    /// Milliseconds between shots.
    pub attack_cooldown_ms: u64,

    /// Splash radius. Weapons with a radius fire projectiles.
    #[serde(default, with = "option_fixed_decimal")]
    pub splash_radius: Option<Fixed>,

    /// Ground-only weapons never target flying troops.
    #[serde(default)]
    pub ground_only: bool,
}

/// Stats for one building kind at one level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingLevel {
    /// Maximum hit points.
    pub hp: u32,

    /// Footprint side length in tiles.
    pub size: u8,

    /// Present only on defensive buildings.
    #[serde(default)]
    pub weapon: Option<WeaponStats>,
}

/// Per-kind building definition.
///
/// # Example RON
///
/// ```ron
/// BuildingSpec(
///     gap: 0.5,
///     limit: 2,
///     levels: {
///         1: (hp: 420, size: 3, weapon: Some((
///             damage: 7, range: 9.0, attack_cooldown_ms: 800, ground_only: true,
///         ))),
///     },
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSpec {
    /// Clearance kept around the footprint, in tiles.
    #[serde(with = "fixed_decimal")]
    pub gap: Fixed,

    /// Population cap per base.
    pub limit: u32,

    /// Stats keyed by level.
    pub levels: BTreeMap<u8, BuildingLevel>,
}

fn passive(hp: u32, size: u8) -> BuildingLevel {
    BuildingLevel {
        hp,
        size,
        weapon: None,
    }
}

fn direct_fire(hp: u32, damage: u32, range: i32, cooldown_ms: u64, ground_only: bool) -> BuildingLevel {
    BuildingLevel {
        hp,
        size: 3,
        weapon: Some(WeaponStats {
            damage,
            range: Fixed::from_num(range),
            range_min: Fixed::ZERO,
            attack_cooldown_ms: cooldown_ms,
            splash_radius: None,
            ground_only,
        }),
    }
}

fn spec(gap: Fixed, limit: u32, levels: impl IntoIterator<Item = (u8, BuildingLevel)>) -> BuildingSpec {
    BuildingSpec {
        gap,
        limit,
        levels: levels.into_iter().collect(),
    }
}

/// Town Hall 3 building table.
pub(crate) fn th3_buildings() -> BTreeMap<BuildingKind, BuildingSpec> {
    let mut buildings = BTreeMap::new();

    buildings.insert(BuildingKind::TownHall, spec(HALF, 1, [(3, passive(1_400, 4))]));

    buildings.insert(
        BuildingKind::Cannon,
        spec(
            HALF,
            2,
            [
                (1, direct_fire(420, 7, 9, 800, true)),
                (2, direct_fire(470, 9, 9, 800, true)),
                (3, direct_fire(520, 11, 9, 800, true)),
                (4, direct_fire(570, 15, 9, 800, true)),
            ],
        ),
    );
    buildings.insert(
        BuildingKind::ArcherTower,
        spec(
            HALF,
            1,
            [
                (1, direct_fire(380, 11, 10, 500, false)),
                (2, direct_fire(420, 13, 10, 500, false)),
                (3, direct_fire(460, 16, 10, 500, false)),
            ],
        ),
    );
    buildings.insert(
        BuildingKind::Mortar,
        spec(
            HALF,
            1,
            [(
                1,
                BuildingLevel {
                    hp: 400,
                    size: 4,
                    weapon: Some(WeaponStats {
                        damage: 20,
                        range: Fixed::from_num(11),
                        range_min: Fixed::from_num(4),
                        attack_cooldown_ms: 5_000,
                        splash_radius: Some(Fixed::from_num(1.5)),
                        ground_only: true,
                    }),
                },
            )],
        ),
    );

    buildings.insert(BuildingKind::ClanCastle, spec(HALF, 1, [(1, passive(700, 3))]));
    buildings.insert(BuildingKind::ArmyCamp, spec(Fixed::ONE, 2, [(1, passive(250, 5))]));
    buildings.insert(
        BuildingKind::Barracks,
        spec(HALF, 2, [(1, passive(250, 3)), (2, passive(275, 3)), (3, passive(300, 3))]),
    );
    buildings.insert(BuildingKind::Laboratory, spec(HALF, 1, [(1, passive(250, 3))]));
    buildings.insert(BuildingKind::BuilderHut, spec(HALF, 5, [(1, passive(250, 2))]));

    let collector_levels = [
        (1, passive(400, 3)),
        (2, passive(450, 3)),
        (3, passive(500, 3)),
        (4, passive(550, 3)),
    ];
    let storage_levels = [(1, passive(400, 3)), (2, passive(500, 3)), (3, passive(600, 3))];
    buildings.insert(BuildingKind::ElixirCollector, spec(HALF, 3, collector_levels.clone()));
    buildings.insert(BuildingKind::GoldMine, spec(HALF, 3, collector_levels));
    buildings.insert(BuildingKind::ElixirStorage, spec(HALF, 2, storage_levels.clone()));
    buildings.insert(BuildingKind::GoldStorage, spec(HALF, 2, storage_levels));

    buildings.insert(
        BuildingKind::Wall,
        spec(
            Fixed::ZERO,
            50,
            [(1, passive(300, 1)), (2, passive(500, 1)), (3, passive(700, 1))],
        ),
    );

    buildings
}

//! Built-in bases and armies.
//!
//! Presets are stored in the same schema as layout and army files, so a
//! preset exported with `export-base` loads back unchanged.

use siege_core::army::ArmyEntry;
use siege_core::layout::{BuildingEntry, LayoutData, WallEntry};
use siege_core::troops::TroopKind;

use crate::error::{Result, RunnerError};

/// Names accepted by [`base_preset`].
pub const BASE_PRESETS: &[&str] = &["default", "minimal"];

/// Names accepted by [`army_preset`].
pub const ARMY_PRESETS: &[&str] = &["mixed", "small", "minimal"];

fn building(kind: &str, level: u8, x: i32, y: i32) -> BuildingEntry {
    BuildingEntry {
        kind: kind.to_string(),
        level,
        x,
        y,
    }
}

/// Look up a base preset by name.
///
/// # Errors
///
/// Returns [`RunnerError::UnknownPreset`] for names not in [`BASE_PRESETS`].
pub fn base_preset(name: &str) -> Result<LayoutData> {
    match name {
        "default" => Ok(default_base()),
        "minimal" => Ok(minimal_base()),
        _ => Err(RunnerError::UnknownPreset {
            kind: "base",
            name: name.to_string(),
            available: BASE_PRESETS.join(", "),
        }),
    }
}

/// Look up an army preset by name.
///
/// # Errors
///
/// Returns [`RunnerError::UnknownPreset`] for names not in [`ARMY_PRESETS`].
pub fn army_preset(name: &str) -> Result<Vec<ArmyEntry>> {
    match name {
        "mixed" => Ok(mixed_army()),
        "small" => Ok(small_army()),
        "minimal" => Ok(minimal_army()),
        _ => Err(RunnerError::UnknownPreset {
            kind: "army",
            name: name.to_string(),
            available: ARMY_PRESETS.join(", "),
        }),
    }
}

/// Town Hall 3 base: a walled keep around the town hall, a cannon on each
/// flank behind a wall line, resources and army buildings on the outside.
pub fn default_base() -> LayoutData {
    let buildings = vec![
        building("town_hall", 3, 20, 20),
        building("cannon", 3, 14, 19),
        building("cannon", 3, 27, 19),
        building("archer_tower", 2, 20, 14),
        building("mortar", 1, 20, 27),
        building("gold_storage", 2, 10, 10),
        building("elixir_storage", 2, 31, 31),
        building("gold_mine", 3, 8, 16),
        building("gold_mine", 3, 16, 8),
        building("gold_mine", 3, 8, 26),
        building("elixir_collector", 3, 33, 16),
        building("elixir_collector", 3, 27, 8),
        building("elixir_collector", 3, 33, 26),
        building("army_camp", 1, 8, 33),
        building("army_camp", 1, 33, 3),
        building("barracks", 2, 3, 21),
        building("laboratory", 1, 38, 21),
        building("clan_castle", 1, 20, 35),
        building("builder_hut", 1, 2, 2),
        building("builder_hut", 1, 40, 40),
    ];

    let mut walls = Vec::new();
    // Keep around the town hall.
    for y in 18..=25 {
        walls.push(WallEntry { level: 3, x: 18, y });
        walls.push(WallEntry { level: 3, x: 25, y });
    }
    for x in 19..=24 {
        walls.push(WallEntry { level: 3, x, y: 18 });
        walls.push(WallEntry { level: 3, x, y: 25 });
    }
    // Screens north of each cannon.
    for x in (13..=17).chain(26..=30) {
        walls.push(WallEntry { level: 2, x, y: 17 });
    }

    LayoutData {
        name: "default".to_string(),
        buildings,
        walls,
    }
}

/// Town hall and one cannon, no walls.
pub fn minimal_base() -> LayoutData {
    LayoutData {
        name: "minimal".to_string(),
        buildings: vec![building("town_hall", 3, 10, 10), building("cannon", 2, 5, 10)],
        walls: Vec::new(),
    }
}

/// Full-housing mixed army attacking from three corners.
pub fn mixed_army() -> Vec<ArmyEntry> {
    let mut army = vec![
        ArmyEntry::new(TroopKind::Giant, 1, (5.0, 10.0)),
        ArmyEntry::new(TroopKind::Giant, 1, (5.0, 30.0)),
        ArmyEntry::new(TroopKind::Giant, 1, (35.0, 10.0)),
    ];
    for point in [(6.0, 9.0), (6.0, 31.0), (34.0, 9.0), (34.0, 31.0), (20.0, 5.0)] {
        army.push(ArmyEntry::new(TroopKind::WallBreaker, 1, point));
    }
    for point in [
        (7.0, 11.0),
        (7.0, 29.0),
        (33.0, 11.0),
        (33.0, 29.0),
        (4.0, 15.0),
        (4.0, 25.0),
        (36.0, 15.0),
        (36.0, 25.0),
        (10.0, 5.0),
        (30.0, 5.0),
    ] {
        army.push(ArmyEntry::new(TroopKind::Barbarian, 2, point));
    }
    for point in [
        (8.0, 12.0),
        (8.0, 28.0),
        (32.0, 12.0),
        (32.0, 28.0),
        (3.0, 5.0),
        (3.0, 35.0),
        (37.0, 5.0),
        (37.0, 35.0),
        (15.0, 3.0),
    ] {
        army.push(ArmyEntry::new(TroopKind::Archer, 2, point));
    }
    for point in [(1.0, 2.0), (2.0, 1.0), (39.0, 2.0), (38.0, 1.0)] {
        army.push(ArmyEntry::new(TroopKind::Goblin, 2, point));
    }
    army
}

/// One of each role from a single point.
pub fn small_army() -> Vec<ArmyEntry> {
    vec![
        ArmyEntry::new(TroopKind::Giant, 1, (10.0, 20.0)),
        ArmyEntry::new(TroopKind::Barbarian, 2, (11.0, 20.0)),
        ArmyEntry::new(TroopKind::Barbarian, 2, (12.0, 20.0)),
        ArmyEntry::new(TroopKind::Archer, 2, (13.0, 20.0)),
        ArmyEntry::new(TroopKind::Archer, 2, (14.0, 20.0)),
        ArmyEntry::new(TroopKind::WallBreaker, 1, (15.0, 20.0)),
    ]
}

/// A barbarian and an archer on the west edge.
pub fn minimal_army() -> Vec<ArmyEntry> {
    vec![
        ArmyEntry::new(TroopKind::Barbarian, 2, (0.0, 10.0)),
        ArmyEntry::new(TroopKind::Archer, 2, (0.0, 11.0)),
    ]
}

//! Immutable stat tables for troops and buildings.
//!
//! The tables are plain data: they are built once (from the built-in
//! Town Hall 3 catalogue or a RON document) and injected into layouts
//! and simulators. Nothing in the engine mutates them.
//!
//! **Note:** This module contains no IO. File loading is handled by
//! `siege_headless`.

mod building_data;
mod troop_data;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use building_data::{BuildingLevel, BuildingSpec, WeaponStats};
pub use troop_data::TroopStats;

use crate::buildings::BuildingKind;
use crate::error::{Result, SiegeError};
use crate::math::Fixed;
use crate::troops::TroopKind;

/// Complete stat catalogue for one town hall tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameData {
    /// Troop stats keyed by kind and level.
    pub troops: BTreeMap<TroopKind, BTreeMap<u8, TroopStats>>,
    /// Building definitions keyed by kind.
    pub buildings: BTreeMap<BuildingKind, BuildingSpec>,
}

impl Default for GameData {
    fn default() -> Self {
        Self::town_hall_3()
    }
}

impl GameData {
    /// The built-in Town Hall 3 catalogue.
    #[must_use]
    pub fn town_hall_3() -> Self {
        Self {
            troops: troop_data::th3_troops(),
            buildings: building_data::th3_buildings(),
        }
    }

    /// Parse a catalogue from RON.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::DataParse`] if the document is malformed.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        Ok(ron::from_str(source)?)
    }

    /// Render the catalogue as pretty RON.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::Serialization`] if rendering fails.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| SiegeError::Serialization(e.to_string()))
    }

    /// Stats for a troop kind at a level.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::UnknownLevel`] if the level is not tabulated.
    pub fn troop_stats(&self, kind: TroopKind, level: u8) -> Result<&TroopStats> {
        self.troops
            .get(&kind)
            .and_then(|levels| levels.get(&level))
            .ok_or_else(|| SiegeError::UnknownLevel {
                kind: kind.as_str().to_string(),
                level,
            })
    }

    /// Definition of a building kind.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::UnknownBuildingKind`] if the kind is missing.
    pub fn building_spec(&self, kind: BuildingKind) -> Result<&BuildingSpec> {
        self.buildings
            .get(&kind)
            .ok_or_else(|| SiegeError::UnknownBuildingKind(kind.as_str().to_string()))
    }

    /// Stats for a building kind at a level.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind or level is not tabulated.
    pub fn building_level(&self, kind: BuildingKind, level: u8) -> Result<&BuildingLevel> {
        self.building_spec(kind)?
            .levels
            .get(&level)
            .ok_or_else(|| SiegeError::UnknownLevel {
                kind: kind.as_str().to_string(),
                level,
            })
    }

    /// Population cap for a kind. Unknown kinds may not be placed at all.
    #[must_use]
    pub fn limit(&self, kind: BuildingKind) -> u32 {
        self.buildings.get(&kind).map_or(0, |spec| spec.limit)
    }

    /// Clearance gap for a kind.
    #[must_use]
    pub fn gap(&self, kind: BuildingKind) -> Fixed {
        self.buildings.get(&kind).map_or(Fixed::ZERO, |spec| spec.gap)
    }
}

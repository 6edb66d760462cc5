//! Error types for the battle engine.

use thiserror::Error;

/// Result type alias using [`SiegeError`].
pub type Result<T> = std::result::Result<T, SiegeError>;

/// Top-level error type for all battle engine errors.
#[derive(Debug, Error)]
pub enum SiegeError {
    /// Building kind name not present in the catalogue.
    #[error("Unknown building kind: {0}")]
    UnknownBuildingKind(String),

    /// Troop kind name not present in the catalogue.
    #[error("Unknown troop kind: {0}")]
    UnknownTroopKind(String),

    /// Kind exists but has no stats for the requested level.
    #[error("No stats for {kind} level {level}")]
    UnknownLevel {
        /// Kind name.
        kind: String,
        /// Requested level.
        level: u8,
    },

    /// Population cap for a building kind already reached.
    #[error("Building limit reached for {kind} (max {limit})")]
    BuildingLimitReached {
        /// Kind name.
        kind: String,
        /// Configured cap.
        limit: u32,
    },

    /// Placement or spawn position lies outside the grid.
    #[error("Position ({x}, {y}) is outside the {grid_size}x{grid_size} grid")]
    OutOfBounds {
        /// X coordinate (tiles).
        x: f64,
        /// Y coordinate (tiles).
        y: f64,
        /// Grid side length.
        grid_size: u32,
    },

    /// Footprint overlaps an existing building.
    #[error("{kind} at ({x}, {y}) overlaps an existing building")]
    Overlap {
        /// Kind name.
        kind: String,
        /// Origin x.
        x: i32,
        /// Origin y.
        y: i32,
    },

    /// Footprint intrudes into the clearance gap of a neighbour.
    #[error("{kind} at ({x}, {y}) violates the clearance gap of a neighbour")]
    GapViolation {
        /// Kind name.
        kind: String,
        /// Origin x.
        x: i32,
        /// Origin y.
        y: i32,
    },

    /// Operation not valid in the current battle state.
    #[error("Invalid battle state: {0}")]
    InvalidState(String),

    /// Data file parsing error.
    #[error("Failed to parse data: {0}")]
    DataParse(String),

    /// Save/restore failure.
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<ron::error::SpannedError> for SiegeError {
    fn from(err: ron::error::SpannedError) -> Self {
        Self::DataParse(err.to_string())
    }
}

impl From<bincode::Error> for SiegeError {
    fn from(err: bincode::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

//! # Siege Core
//!
//! Deterministic battle engine for a base-assault game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No wall-clock time
//! - No floating-point math in the tick path (uses fixed-point)
//!
//! This separation enables:
//! - Headless batch runs
//! - Bit-identical replays
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`data`] - Stat tables per kind and level
//! - [`buildings`] / [`troops`] - Entity model
//! - [`layout`] - Base placement rules and scoring
//! - [`grid`] / [`pathfinding`] - Tile grid and A*
//! - [`targeting`] / [`combat`] - Target selection and damage
//! - [`simulation`] - Battle loop and end conditions
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod army;
pub mod buildings;
pub mod combat;
pub mod config;
pub mod data;
pub mod error;
pub mod grid;
pub mod layout;
pub mod math;
pub mod pathfinding;
pub mod simulation;
pub mod targeting;
pub mod troops;

pub use error::{Result, SiegeError};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::army::ArmyEntry;
    pub use crate::buildings::{Building, BuildingCategory, BuildingId, BuildingKind};
    pub use crate::combat::{CombatEvent, Projectile};
    pub use crate::config::BattleConfig;
    pub use crate::data::GameData;
    pub use crate::error::{Result, SiegeError};
    pub use crate::layout::{BaseLayout, LayoutData};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::simulation::{BattleSimulator, BattleState, BattleStatistics, SimClock};
    pub use crate::troops::{Troop, TroopClass, TroopId, TroopKind, TroopState};
}

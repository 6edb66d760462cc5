//! Combat resolution.
//!
//! One tick of combat runs in three phases, always in this order:
//!
//! 1. [`update_troop`] for every living troop: target acquisition, then
//!    attack if in range, otherwise follow (or replan) a path.
//! 2. [`update_defense`] for every standing defense: validate or acquire a
//!    target, then fire once the cooldown allows.
//! 3. [`advance_projectiles`]: move splash shells and detonate those whose
//!    travel time has elapsed.
//!
//! Damage always flows through `take_damage` on the receiving entity.
//! Everything that happened is reported as [`CombatEvent`]s.

mod assault;
mod defense;
mod projectile;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingId;
use crate::math::Vec2Fixed;
use crate::troops::TroopId;

pub use assault::update_troop;
pub use defense::{can_target, in_range, select_defense_target, update_defense};
pub use projectile::{advance_projectiles, apply_splash, Projectile};

/// Something that happened during combat processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatEvent {
    /// A troop hit a building.
    TroopAttack {
        /// Attacker.
        troop: TroopId,
        /// Building hit.
        building: BuildingId,
        /// Damage dealt.
        damage: u32,
    },
    /// A direct-fire defense hit a troop.
    DefenseAttack {
        /// Firing defense.
        building: BuildingId,
        /// Troop hit.
        troop: TroopId,
        /// Damage dealt.
        damage: u32,
    },
    /// A splash defense launched a shell.
    ProjectileFired {
        /// Firing defense.
        building: BuildingId,
        /// Point the shell will land on.
        impact: Vec2Fixed,
    },
    /// A shell landed.
    ProjectileImpact {
        /// Firing defense.
        building: BuildingId,
        /// Landing point.
        impact: Vec2Fixed,
        /// Number of troops damaged.
        hits: usize,
    },
    /// A building's hit points reached zero.
    BuildingDestroyed {
        /// Destroyed building.
        building: BuildingId,
        /// Troop that dealt the final blow.
        by: TroopId,
    },
    /// A troop died, either to damage or by detonating.
    TroopKilled {
        /// Dead troop.
        troop: TroopId,
    },
}

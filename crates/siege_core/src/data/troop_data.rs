//! Troop stat tables.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::math::{fixed_decimal, Fixed};
use crate::troops::TroopKind;

/// Combat and movement statistics for one troop kind at one level.
///
/// # Example RON
///
/// ```ron
/// TroopStats(
///     hp: 45,
///     damage: 8,
///     speed: 16.0,
///     range: 0.4,
///     attack_cooldown_ms: 1000,
///     housing: 1,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopStats {
    /// Maximum hit points.
    pub hp: u32,

    /// Damage per hit against ordinary buildings.
    pub damage: u32,

    /// Damage per hit against walls, when different from `damage`.
    #[serde(default)]
    pub wall_damage: Option<u32>,

    /// Damage per hit against resource buildings, when different from `damage`.
    #[serde(default)]
    pub resource_damage: Option<u32>,

    /// Movement speed in tiles per second.
    #[serde(with = "fixed_decimal")]
    pub speed: Fixed,

    /// Attack range measured from the target's hitbox edge.
    #[serde(with = "fixed_decimal")]
    pub range: Fixed,

    /// Milliseconds between attacks.
    pub attack_cooldown_ms: u64,

    /// Army camp space taken.
    pub housing: u32,

    /// Flying troops ignore buildings and walls when pathing.
    #[serde(default)]
    pub flying: bool,
}

impl TroopStats {
    fn ground(hp: u32, damage: u32, speed: i32, range: Fixed, housing: u32) -> Self {
        Self {
            hp,
            damage,
            wall_damage: None,
            resource_damage: None,
            speed: Fixed::from_num(speed),
            range,
            attack_cooldown_ms: 1_000,
            housing,
            flying: false,
        }
    }
}

/// Melee reach used by barbarians and goblins (0.4 tiles).
const MELEE_RANGE: Fixed = Fixed::from_bits(1_717_986_918);

/// Contact range used by wall breakers (0.1 tiles).
const CONTACT_RANGE: Fixed = Fixed::from_bits(429_496_730);

/// Town Hall 3 troop table.
pub(crate) fn th3_troops() -> BTreeMap<TroopKind, BTreeMap<u8, TroopStats>> {
    let archer_range = Fixed::from_num(3.5);
    let mut troops = BTreeMap::new();

    troops.insert(
        TroopKind::Barbarian,
        BTreeMap::from([
            (1, TroopStats::ground(45, 8, 16, MELEE_RANGE, 1)),
            (2, TroopStats::ground(54, 11, 16, MELEE_RANGE, 1)),
        ]),
    );
    troops.insert(
        TroopKind::Archer,
        BTreeMap::from([
            (1, TroopStats::ground(20, 7, 24, archer_range, 1)),
            (2, TroopStats::ground(23, 9, 24, archer_range, 1)),
        ]),
    );
    troops.insert(
        TroopKind::Giant,
        BTreeMap::from([(1, TroopStats::ground(300, 11, 12, Fixed::ONE, 5))]),
    );
    troops.insert(
        TroopKind::WallBreaker,
        BTreeMap::from([(
            1,
            TroopStats {
                wall_damage: Some(60),
                ..TroopStats::ground(20, 6, 24, CONTACT_RANGE, 2)
            },
        )]),
    );
    troops.insert(
        TroopKind::Goblin,
        BTreeMap::from([
            (
                1,
                TroopStats {
                    resource_damage: Some(22),
                    ..TroopStats::ground(25, 11, 32, MELEE_RANGE, 1)
                },
            ),
            (
                2,
                TroopStats {
                    resource_damage: Some(28),
                    ..TroopStats::ground(30, 14, 32, MELEE_RANGE, 1)
                },
            ),
        ]),
    );

    troops
}

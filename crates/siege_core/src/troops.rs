//! Attacking troops.
//!
//! Troop behaviour differs by [`TroopClass`]; the class is derived from
//! the kind with a `match`, and every behavioural switch in targeting,
//! pathfinding and combat dispatches on it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::buildings::{Building, BuildingId};
use crate::data::{GameData, TroopStats};
use crate::error::{Result, SiegeError};
use crate::math::{Fixed, Vec2Fixed};

/// Every troop kind an army may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopKind {
    /// Melee generalist.
    Barbarian,
    /// Ranged generalist.
    Archer,
    /// Defense-seeking tank.
    Giant,
    /// Suicide wall breacher.
    WallBreaker,
    /// Fast resource raider.
    Goblin,
}

/// Behavioural class of a troop kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TroopClass {
    /// Short-range, no preference.
    Melee,
    /// Long-range, no preference.
    Ranged,
    /// Targets defenses first.
    Tank,
    /// Breaches walls and dies doing it.
    Demolition,
    /// Prefers resource buildings.
    Raider,
}

impl TroopKind {
    /// All kinds.
    pub const ALL: [Self; 5] = [
        Self::Barbarian,
        Self::Archer,
        Self::Giant,
        Self::WallBreaker,
        Self::Goblin,
    ];

    /// Army-file identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Barbarian => "barbarian",
            Self::Archer => "archer",
            Self::Giant => "giant",
            Self::WallBreaker => "wall_breaker",
            Self::Goblin => "goblin",
        }
    }

    /// Behavioural class.
    #[must_use]
    pub const fn class(self) -> TroopClass {
        match self {
            Self::Barbarian => TroopClass::Melee,
            Self::Archer => TroopClass::Ranged,
            Self::Giant => TroopClass::Tank,
            Self::WallBreaker => TroopClass::Demolition,
            Self::Goblin => TroopClass::Raider,
        }
    }
}

impl fmt::Display for TroopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TroopKind {
    type Err = SiegeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| SiegeError::UnknownTroopKind(s.to_string()))
    }
}

/// Life-cycle state of a troop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TroopState {
    /// Waiting for a target or a path.
    Idle,
    /// Following a path.
    Moving,
    /// In range of its target.
    Attacking,
    /// Terminal.
    Dead,
}

/// Stable handle to a troop: its index in the simulator's troop list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TroopId(pub usize);

/// A deployed troop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Troop {
    /// Kind.
    pub kind: TroopKind,
    /// Level.
    pub level: u8,
    /// Current position in tiles.
    pub position: Vec2Fixed,
    /// Deployment position, restored on reset.
    pub spawn: Vec2Fixed,
    /// Stats for this kind and level.
    pub stats: TroopStats,
    /// Current hit points.
    pub hp: u32,
    /// Life-cycle state.
    pub state: TroopState,
    /// Building currently targeted.
    pub target: Option<BuildingId>,
    /// Waypoints towards the target, if a path is held.
    pub path: Option<Vec<Vec2Fixed>>,
    /// Index of the next waypoint in `path`.
    pub path_cursor: usize,
    /// Building the held path leads to.
    pub path_target: Option<BuildingId>,
    /// Attack position the held path was planned towards.
    pub path_destination: Option<Vec2Fixed>,
    /// Simulated time of the last attack.
    pub last_attack_ms: u64,
    /// Simulated time of the last target evaluation.
    pub last_retarget_ms: u64,
    /// Simulated time of the last path computation.
    pub last_path_ms: u64,
}

impl Troop {
    /// Instantiate a troop from the stat tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind/level pair is not in `data`.
    pub fn new(kind: TroopKind, level: u8, position: Vec2Fixed, data: &GameData) -> Result<Self> {
        let stats = data.troop_stats(kind, level)?.clone();
        Ok(Self {
            kind,
            level,
            position,
            spawn: position,
            hp: stats.hp,
            stats,
            state: TroopState::Idle,
            target: None,
            path: None,
            path_cursor: 0,
            path_target: None,
            path_destination: None,
            last_attack_ms: 0,
            last_retarget_ms: 0,
            last_path_ms: 0,
        })
    }

    /// Behavioural class.
    #[must_use]
    pub const fn class(&self) -> TroopClass {
        self.kind.class()
    }

    /// Maximum hit points.
    #[must_use]
    pub const fn max_hp(&self) -> u32 {
        self.stats.hp
    }

    /// Whether the troop is still fighting.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.state != TroopState::Dead
    }

    /// Whether the troop ignores ground obstacles.
    #[must_use]
    pub const fn is_flying(&self) -> bool {
        self.stats.flying
    }

    /// Apply damage. Returns `true` if this hit killed the troop.
    pub fn take_damage(&mut self, amount: u32) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.hp = self.hp.saturating_sub(amount);
        if self.hp == 0 {
            self.kill();
            return true;
        }
        false
    }

    /// Force the terminal state, dropping target and path.
    pub fn kill(&mut self) {
        self.hp = 0;
        self.state = TroopState::Dead;
        self.clear_path();
        self.target = None;
    }

    /// Drop the held path so the next update replans.
    pub fn clear_path(&mut self) {
        self.path = None;
        self.path_cursor = 0;
        self.path_target = None;
        self.path_destination = None;
    }

    /// Whether the attack cooldown has elapsed at `now_ms`.
    #[must_use]
    pub const fn can_attack(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_attack_ms) >= self.stats.attack_cooldown_ms
    }

    /// Whether `building`'s hitbox edge is within attack range.
    #[must_use]
    pub fn is_in_range(&self, building: &Building) -> bool {
        building.hitbox().within_range(self.position, self.stats.range)
    }

    /// Damage one hit deals to `building`.
    #[must_use]
    pub fn damage_against(&self, building: &Building) -> u32 {
        match self.class() {
            TroopClass::Demolition if building.kind.is_wall() => {
                self.stats.wall_damage.unwrap_or(self.stats.damage)
            }
            TroopClass::Raider if building.kind.is_resource() => {
                self.stats.resource_damage.unwrap_or(self.stats.damage)
            }
            _ => self.stats.damage,
        }
    }

    /// Advance towards `point` for `dt_ms` of simulated time.
    pub fn move_towards(&mut self, point: Vec2Fixed, dt_ms: u64) {
        if self.position == point {
            self.state = TroopState::Idle;
            return;
        }
        let max_step = self.stats.speed * Fixed::from_num(dt_ms) / Fixed::from_num(1_000);
        self.position = self.position.step_towards(point, max_step);
        self.state = TroopState::Moving;
    }

    /// Return to the deployment state.
    pub fn reset(&mut self) {
        self.position = self.spawn;
        self.hp = self.stats.hp;
        self.state = TroopState::Idle;
        self.target = None;
        self.clear_path();
        self.last_attack_ms = 0;
        self.last_retarget_ms = 0;
        self.last_path_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildings::BuildingKind;

    fn troop(kind: TroopKind, x: f64, y: f64) -> Troop {
        Troop::new(kind, 1, Vec2Fixed::from_f64(x, y), &GameData::default()).unwrap()
    }

    fn building(kind: BuildingKind, level: u8, x: i32, y: i32) -> Building {
        Building::new(kind, level, x, y, &GameData::default()).unwrap()
    }

    #[test]
    fn test_kind_parse() {
        assert_eq!("wall_breaker".parse::<TroopKind>().unwrap(), TroopKind::WallBreaker);
        assert!(matches!(
            "dragon".parse::<TroopKind>(),
            Err(SiegeError::UnknownTroopKind(_))
        ));
        assert_eq!(TroopKind::Goblin.class(), TroopClass::Raider);
    }

    #[test]
    fn test_take_damage_kills_once() {
        let mut barbarian = troop(TroopKind::Barbarian, 1.0, 1.0);
        barbarian.target = Some(BuildingId::Structure(0));
        barbarian.path = Some(vec![Vec2Fixed::ZERO]);

        assert!(!barbarian.take_damage(40));
        assert_eq!(barbarian.hp, 5);
        assert!(barbarian.take_damage(40));
        assert_eq!(barbarian.hp, 0);
        assert_eq!(barbarian.state, TroopState::Dead);
        assert!(barbarian.target.is_none());
        assert!(barbarian.path.is_none());
        assert!(!barbarian.take_damage(1));
    }

    #[test]
    fn test_damage_against_bonus() {
        let goblin = troop(TroopKind::Goblin, 0.0, 0.0);
        assert_eq!(goblin.damage_against(&building(BuildingKind::GoldMine, 1, 5, 5)), 22);
        assert_eq!(goblin.damage_against(&building(BuildingKind::Cannon, 1, 5, 5)), 11);

        let breaker = troop(TroopKind::WallBreaker, 0.0, 0.0);
        assert_eq!(breaker.damage_against(&building(BuildingKind::Wall, 1, 5, 5)), 60);
        assert_eq!(breaker.damage_against(&building(BuildingKind::TownHall, 3, 5, 5)), 6);
    }

    #[test]
    fn test_in_range_uses_hitbox() {
        let cannon = building(BuildingKind::Cannon, 1, 10, 10);
        // Hitbox edge at x = 9.5; melee range 0.4.
        assert!(troop(TroopKind::Barbarian, 9.1, 11.0).is_in_range(&cannon));
        assert!(!troop(TroopKind::Barbarian, 9.0, 11.0).is_in_range(&cannon));
        assert!(troop(TroopKind::Archer, 6.0, 11.0).is_in_range(&cannon));
    }

    #[test]
    fn test_cooldown() {
        let mut archer = troop(TroopKind::Archer, 0.0, 0.0);
        assert!(!archer.can_attack(900));
        assert!(archer.can_attack(1_000));
        archer.last_attack_ms = 1_000;
        assert!(!archer.can_attack(1_999));
        assert!(archer.can_attack(2_000));
    }

    #[test]
    fn test_move_towards_caps_step() {
        let mut giant = troop(TroopKind::Giant, 0.0, 0.0);
        giant.move_towards(Vec2Fixed::from_ints(10, 0), 100);
        assert_eq!(giant.position, Vec2Fixed::from_f64(1.2, 0.0));
        assert_eq!(giant.state, TroopState::Moving);

        giant.move_towards(Vec2Fixed::from_f64(1.5, 0.0), 100);
        assert_eq!(giant.position, Vec2Fixed::from_f64(1.5, 0.0));
    }

    #[test]
    fn test_reset_restores_spawn() {
        let mut archer = troop(TroopKind::Archer, 3.0, 4.0);
        archer.position = Vec2Fixed::from_ints(10, 10);
        archer.kill();
        archer.reset();
        assert_eq!(archer.position, Vec2Fixed::from_ints(3, 4));
        assert_eq!(archer.hp, 20);
        assert!(archer.is_alive());
    }
}

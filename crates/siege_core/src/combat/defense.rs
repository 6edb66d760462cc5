//! Defense update: validate, acquire, fire.

use tracing::{debug, info};

use super::{CombatEvent, Projectile};
use crate::buildings::BuildingId;
use crate::config::BattleConfig;
use crate::data::WeaponStats;
use crate::layout::BaseLayout;
use crate::math::{Fixed, Rect, Vec2Fixed, RANGE_EPSILON};
use crate::simulation::SimClock;
use crate::troops::{Troop, TroopId};

/// Whether `weapon` may engage `troop` at all.
///
/// Ground-only weapons ignore flying troops. Weapons with a minimum range
/// only engage troops inside the annulus around the building centre.
#[must_use]
pub fn can_target(weapon: &WeaponStats, center: Vec2Fixed, troop: &Troop) -> bool {
    if !troop.is_alive() || (weapon.ground_only && troop.is_flying()) {
        return false;
    }
    if weapon.range_min > Fixed::ZERO {
        let distance_sq = center.distance_squared(troop.position);
        return distance_sq >= weapon.range_min * weapon.range_min
            && distance_sq <= weapon.range * weapon.range + RANGE_EPSILON;
    }
    true
}

/// Whether `troop` is within `weapon` range of the building footprint.
#[must_use]
pub fn in_range(weapon: &WeaponStats, footprint: Rect, troop: &Troop) -> bool {
    footprint.within_range(troop.position, weapon.range)
}

fn engageable(weapon: &WeaponStats, center: Vec2Fixed, footprint: Rect, troop: &Troop) -> bool {
    can_target(weapon, center, troop) && in_range(weapon, footprint, troop)
}

/// Pick a target among all engageable troops.
///
/// Direct-fire weapons take the troop nearest the building centre. Splash
/// weapons take the troop with the most living troops inside the splash
/// radius around it. Ties keep the lowest troop id.
#[must_use]
pub fn select_defense_target(
    weapon: &WeaponStats,
    center: Vec2Fixed,
    footprint: Rect,
    troops: &[Troop],
) -> Option<TroopId> {
    let candidates = troops
        .iter()
        .enumerate()
        .filter(|(_, troop)| engageable(weapon, center, footprint, troop));

    match weapon.splash_radius {
        Some(radius) => {
            let reach_sq = radius * radius + RANGE_EPSILON;
            let mut best: Option<(usize, usize)> = None;
            for (index, candidate) in candidates {
                let cluster = troops
                    .iter()
                    .filter(|t| t.is_alive() && t.position.distance_squared(candidate.position) <= reach_sq)
                    .count();
                if best.map_or(true, |(_, count)| cluster > count) {
                    best = Some((index, cluster));
                }
            }
            best.map(|(index, _)| TroopId(index))
        }
        None => candidates
            .min_by_key(|(_, troop)| center.distance_squared(troop.position))
            .map(|(index, _)| TroopId(index)),
    }
}

/// Advance the defense at `index` in the structure list by one tick.
///
/// Drops a target that died, became untargetable or left range, acquires
/// a new one if needed, and fires once the cooldown has elapsed. Direct
/// weapons damage immediately; splash weapons launch a [`Projectile`].
/// On return the held target, if any, is alive and in range.
pub fn update_defense(
    index: usize,
    layout: &mut BaseLayout,
    troops: &mut [Troop],
    projectiles: &mut Vec<Projectile>,
    config: &BattleConfig,
    clock: SimClock,
    events: &mut Vec<CombatEvent>,
) {
    let building_id = BuildingId::Structure(index);
    let Some(building) = layout.structures_mut().get_mut(index) else {
        return;
    };
    if building.is_destroyed() {
        return;
    }
    let kind = building.kind;
    let center = building.center();
    let footprint = building.footprint();
    let Some(defense) = building.defense.as_mut() else {
        return;
    };
    let weapon = defense.weapon.clone();

    if let Some(target) = defense.target {
        let valid = troops
            .get(target.0)
            .is_some_and(|troop| engageable(&weapon, center, footprint, troop));
        if !valid {
            debug!(
                tick = clock.tick,
                sim_time_ms = clock.time_ms,
                defense = %kind,
                troop = target.0,
                "Defense dropped target"
            );
            defense.target = None;
        }
    }

    if defense.target.is_none() {
        defense.target = select_defense_target(&weapon, center, footprint, troops);
        if let Some(target) = defense.target {
            info!(
                tick = clock.tick,
                sim_time_ms = clock.time_ms,
                defense = %kind,
                troop = target.0,
                "Defense acquired target"
            );
        }
    }

    let Some(target) = defense.target else {
        return;
    };
    if clock.time_ms.saturating_sub(defense.last_attack_ms) < weapon.attack_cooldown_ms {
        return;
    }
    let Some(troop) = troops.get_mut(target.0) else {
        defense.target = None;
        return;
    };
    // The target may have moved since it was acquired.
    if !in_range(&weapon, footprint, troop) {
        defense.target = None;
        return;
    }

    defense.last_attack_ms = clock.time_ms;
    match weapon.splash_radius {
        Some(radius) => {
            let shell = Projectile::launch(
                building_id,
                center,
                troop.position,
                config.projectile_speed,
                weapon.damage,
                radius,
            );
            debug!(
                tick = clock.tick,
                sim_time_ms = clock.time_ms,
                defense = %kind,
                travel_ms = shell.travel_ms,
                "Projectile fired"
            );
            events.push(CombatEvent::ProjectileFired {
                building: building_id,
                impact: shell.impact,
            });
            projectiles.push(shell);
        }
        None => {
            let killed = troop.take_damage(weapon.damage);
            events.push(CombatEvent::DefenseAttack {
                building: building_id,
                troop: target,
                damage: weapon.damage,
            });
            if killed {
                info!(
                    tick = clock.tick,
                    sim_time_ms = clock.time_ms,
                    troop = target.0,
                    kind = %troop.kind,
                    by = %kind,
                    "Troop killed"
                );
                events.push(CombatEvent::TroopKilled { troop: target });
            }
        }
    }

    if !troop.is_alive() {
        defense.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::advance_projectiles;
    use crate::data::GameData;
    use crate::troops::{TroopKind, TroopState};

    fn troop(kind: TroopKind, x: f64, y: f64) -> Troop {
        Troop::new(kind, 1, Vec2Fixed::from_f64(x, y), &GameData::default()).unwrap()
    }

    fn clock(tick: u64) -> SimClock {
        SimClock {
            tick,
            time_ms: tick * 100,
        }
    }

    fn base_with(kind: &str, level: u8, origin: (i32, i32)) -> BaseLayout {
        let mut base = BaseLayout::new("defense");
        assert!(base.add_building(kind, level, origin));
        base
    }

    #[test]
    fn test_cannon_kills_in_seven_shots() {
        // Cannon L1: 7 damage every 800 ms; barbarian L1: 45 hp.
        let mut base = base_with("cannon", 1, (10, 10));
        let mut troops = vec![troop(TroopKind::Barbarian, 9.0, 11.0)];
        let mut projectiles = Vec::new();
        let config = BattleConfig::default();
        let mut events = Vec::new();

        for tick in 0..56 {
            update_defense(0, &mut base, &mut troops, &mut projectiles, &config, clock(tick), &mut events);
            assert!(troops[0].is_alive(), "died early at tick {tick}");
        }
        update_defense(0, &mut base, &mut troops, &mut projectiles, &config, clock(56), &mut events);

        assert_eq!(troops[0].state, TroopState::Dead);
        assert_eq!(troops[0].hp, 0);
        let shots = events
            .iter()
            .filter(|e| matches!(e, CombatEvent::DefenseAttack { .. }))
            .count();
        assert_eq!(shots, 7);
        assert!(base.structures()[0].defense.as_ref().unwrap().target.is_none());
    }

    #[test]
    fn test_nearest_troop_chosen() {
        let base = base_with("archer_tower", 1, (10, 10));
        let tower = &base.structures()[0];
        let weapon = &tower.defense.as_ref().unwrap().weapon;
        let troops = vec![
            troop(TroopKind::Archer, 4.0, 11.0),
            troop(TroopKind::Archer, 16.0, 11.5),
            troop(TroopKind::Archer, 30.0, 30.0),
        ];
        assert_eq!(
            select_defense_target(weapon, tower.center(), tower.footprint(), &troops),
            Some(TroopId(1))
        );
    }

    #[test]
    fn test_target_dropped_when_out_of_range() {
        let mut base = base_with("cannon", 1, (10, 10));
        let mut troops = vec![troop(TroopKind::Barbarian, 9.0, 11.0)];
        let mut projectiles = Vec::new();
        let config = BattleConfig::default();
        let mut events = Vec::new();

        update_defense(0, &mut base, &mut troops, &mut projectiles, &config, clock(1), &mut events);
        assert_eq!(base.structures()[0].defense.as_ref().unwrap().target, Some(TroopId(0)));

        troops[0].position = Vec2Fixed::from_ints(40, 40);
        update_defense(0, &mut base, &mut troops, &mut projectiles, &config, clock(2), &mut events);
        assert!(base.structures()[0].defense.as_ref().unwrap().target.is_none());
    }

    #[test]
    fn test_dead_building_is_silent() {
        let mut base = base_with("cannon", 1, (10, 10));
        base.structures_mut()[0].take_damage(u32::MAX);
        let mut troops = vec![troop(TroopKind::Barbarian, 9.0, 11.0)];
        let mut projectiles = Vec::new();
        let mut events = Vec::new();
        update_defense(0, &mut base, &mut troops, &mut projectiles, &BattleConfig::default(), clock(8), &mut events);
        assert!(events.is_empty());
        assert_eq!(troops[0].hp, 45);
    }

    #[test]
    fn test_mortar_dead_zone() {
        // Mortar at (20, 20), size 4: centre (22, 22), minimum range 4.
        let base = base_with("mortar", 1, (20, 20));
        let mortar = &base.structures()[0];
        let weapon = &mortar.defense.as_ref().unwrap().weapon;
        let close = troop(TroopKind::Barbarian, 22.0, 25.0);
        let far = troop(TroopKind::Barbarian, 22.0, 30.0);
        assert!(!can_target(weapon, mortar.center(), &close));
        assert!(can_target(weapon, mortar.center(), &far));
    }

    #[test]
    fn test_mortar_prefers_clusters() {
        let base = base_with("mortar", 1, (20, 20));
        let mortar = &base.structures()[0];
        let weapon = &mortar.defense.as_ref().unwrap().weapon;
        let troops = vec![
            troop(TroopKind::Barbarian, 30.0, 22.0),
            troop(TroopKind::Barbarian, 22.0, 30.0),
            troop(TroopKind::Barbarian, 22.5, 30.5),
            troop(TroopKind::Barbarian, 21.5, 30.5),
        ];
        assert_eq!(
            select_defense_target(weapon, mortar.center(), mortar.footprint(), &troops),
            Some(TroopId(1))
        );
    }

    #[test]
    fn test_mortar_splash_falloff() {
        let mut base = base_with("mortar", 1, (20, 20));
        // Impact troop 8 tiles from the centre; the second sits exactly on
        // the 1.5 tile splash edge.
        let mut troops = vec![
            troop(TroopKind::Barbarian, 22.0, 30.0),
            troop(TroopKind::Barbarian, 22.0, 31.5),
        ];
        let mut projectiles = Vec::new();
        let config = BattleConfig::default();
        let mut events = Vec::new();

        // Cooldown 5000 ms: the first shell leaves at tick 50.
        let mut tick = 0;
        while projectiles.is_empty() {
            update_defense(0, &mut base, &mut troops, &mut projectiles, &config, clock(tick), &mut events);
            tick += 1;
        }
        assert_eq!(tick, 51);
        assert_eq!(projectiles[0].impact, Vec2Fixed::from_ints(22, 30));
        // 8 tiles at 3 tiles/s.
        assert_eq!(projectiles[0].travel_ms, 2_667);

        while !projectiles.is_empty() {
            advance_projectiles(&mut projectiles, &mut troops, 100, clock(tick), &mut events);
            tick += 1;
        }

        assert_eq!(troops[0].hp, 45 - 20);
        assert_eq!(troops[1].hp, 45 - 10);
        assert!(events.iter().any(|e| matches!(e, CombatEvent::ProjectileImpact { hits: 2, .. })));
    }
}

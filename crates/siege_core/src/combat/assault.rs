//! Troop update: target, then attack or move.

use tracing::{debug, info};

use super::CombatEvent;
use crate::buildings::BuildingId;
use crate::config::BattleConfig;
use crate::layout::BaseLayout;
use crate::math::{Fixed, Vec2Fixed, RANGE_EPSILON};
use crate::pathfinding::{find_path, resolve_destination};
use crate::simulation::SimClock;
use crate::targeting::acquire_target;
use crate::troops::{Troop, TroopClass, TroopId, TroopState};

/// Squared contact distance (0.5 tiles) at which a wall breaker detonates
/// on a wall without waiting for its attack cycle.
const CONTACT_DISTANCE_SQ: Fixed = Fixed::from_bits(1 << 30);

/// Advance one troop by one tick.
///
/// Dead troops are skipped. Wall breakers touching a standing wall
/// detonate on it immediately. Otherwise the troop (re)acquires a target,
/// attacks it when in range and off cooldown, and walks its path when not.
pub fn update_troop(
    id: TroopId,
    troop: &mut Troop,
    layout: &mut BaseLayout,
    config: &BattleConfig,
    clock: SimClock,
    events: &mut Vec<CombatEvent>,
) {
    if !troop.is_alive() {
        return;
    }

    if troop.class() == TroopClass::Demolition {
        if let Some(wall) = touching_wall(troop, layout) {
            troop.target = Some(wall);
            strike(id, troop, wall, layout, clock, events);
            return;
        }
    }

    acquire_target(troop, layout, clock, config.retarget_interval_ms);
    let Some(target) = troop.target else {
        troop.state = TroopState::Idle;
        return;
    };

    if layout.get(target).is_some_and(|b| troop.is_in_range(b)) {
        troop.state = TroopState::Attacking;
        if troop.can_attack(clock.time_ms) {
            strike(id, troop, target, layout, clock, events);
        }
        return;
    }

    follow_path(troop, target, layout, config, clock);
}

/// Nearest standing wall whose centre is within contact distance.
fn touching_wall(troop: &Troop, layout: &BaseLayout) -> Option<BuildingId> {
    layout
        .walls()
        .iter()
        .enumerate()
        .filter(|(_, wall)| !wall.is_destroyed())
        .map(|(index, wall)| (index, wall.center().distance_squared(troop.position)))
        .filter(|(_, distance_sq)| *distance_sq <= CONTACT_DISTANCE_SQ + RANGE_EPSILON)
        .min_by_key(|(_, distance_sq)| *distance_sq)
        .map(|(index, _)| BuildingId::Wall(index))
}

/// Deal one hit to `target`. Wall breakers die on their first hit.
fn strike(
    id: TroopId,
    troop: &mut Troop,
    target: BuildingId,
    layout: &mut BaseLayout,
    clock: SimClock,
    events: &mut Vec<CombatEvent>,
) {
    let Some(building) = layout.get_mut(target).filter(|b| !b.is_destroyed()) else {
        troop.target = None;
        return;
    };

    let damage = troop.damage_against(building);
    let destroyed = building.take_damage(damage);
    let kind = building.kind;
    troop.last_attack_ms = clock.time_ms;
    troop.state = TroopState::Attacking;
    events.push(CombatEvent::TroopAttack {
        troop: id,
        building: target,
        damage,
    });

    if destroyed {
        info!(
            tick = clock.tick,
            sim_time_ms = clock.time_ms,
            building = %kind,
            id = ?target,
            by = %troop.kind,
            "Building destroyed"
        );
        events.push(CombatEvent::BuildingDestroyed { building: target, by: id });
    }

    if troop.class() == TroopClass::Demolition {
        troop.kill();
        info!(
            tick = clock.tick,
            sim_time_ms = clock.time_ms,
            troop = id.0,
            on = %kind,
            "Wall breaker detonated"
        );
        events.push(CombatEvent::TroopKilled { troop: id });
    }
}

/// Replan if needed, then step along the held path.
///
/// The held path is stale when there is none, when it leads to another
/// building or another attack position, or when the recompute interval
/// has elapsed.
fn follow_path(troop: &mut Troop, target: BuildingId, layout: &BaseLayout, config: &BattleConfig, clock: SimClock) {
    let now = clock.time_ms;
    let Some(building) = layout.get(target) else {
        troop.clear_path();
        troop.state = TroopState::Idle;
        return;
    };
    let destination = resolve_destination(building, troop.stats.range, troop.position, layout.grid_size());

    let stale = troop.path.is_none()
        || troop.path_target != Some(target)
        || troop.path_destination != Some(destination)
        || now.saturating_sub(troop.last_path_ms) >= config.path_recompute_interval_ms;
    if stale {
        plan_path(troop, target, destination, layout, clock);
    }

    let waypoint = troop
        .path
        .as_ref()
        .and_then(|path| path.get(troop.path_cursor))
        .copied();

    if let Some(waypoint) = waypoint {
        troop.move_towards(waypoint, config.tick_duration_ms());
        let tolerance = config.waypoint_tolerance;
        if troop.position.distance_squared(waypoint) < tolerance * tolerance {
            troop.path_cursor += 1;
        }
        return;
    }

    // Path exhausted (or never found) while still out of range.
    troop.state = TroopState::Idle;
    if now.saturating_sub(troop.last_path_ms) > config.path_recompute_interval_ms / 2 {
        troop.clear_path();
    }
}

/// Compute a fresh path to `destination`, an attack position of `target`.
///
/// A failed search stores an empty path so the troop idles until stuck
/// recovery clears it.
fn plan_path(troop: &mut Troop, target: BuildingId, destination: Vec2Fixed, layout: &BaseLayout, clock: SimClock) {
    let grid = layout.tile_grid(troop.is_flying());
    let path = find_path(&grid, troop.kind, troop.position, destination);

    match &path {
        Some(waypoints) => debug!(
            tick = clock.tick,
            sim_time_ms = clock.time_ms,
            troop = %troop.kind,
            target = ?target,
            waypoints = waypoints.len(),
            "Path computed"
        ),
        None => debug!(
            tick = clock.tick,
            sim_time_ms = clock.time_ms,
            troop = %troop.kind,
            target = ?target,
            "No path found"
        ),
    }

    troop.path = Some(path.unwrap_or_default());
    troop.path_cursor = 0;
    troop.path_target = Some(target);
    troop.path_destination = Some(destination);
    troop.last_path_ms = clock.time_ms;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameData;
    use crate::troops::TroopKind;

    fn troop(kind: TroopKind, x: f64, y: f64) -> Troop {
        Troop::new(kind, 1, Vec2Fixed::from_f64(x, y), &GameData::default()).unwrap()
    }

    fn clock(tick: u64) -> SimClock {
        SimClock {
            tick,
            time_ms: tick * 100,
        }
    }

    #[test]
    fn test_wall_breaker_detonates_on_contact() {
        let mut base = BaseLayout::new("breach");
        assert!(base.add_building("wall", 1, (5, 5)));
        assert!(base.add_building("town_hall", 3, (20, 20)));
        // 0.4 tiles from the wall centre (5.5, 5.5).
        let mut breaker = troop(TroopKind::WallBreaker, 5.5, 5.9);
        let mut events = Vec::new();

        update_troop(TroopId(0), &mut breaker, &mut base, &BattleConfig::default(), clock(0), &mut events);

        assert_eq!(breaker.hp, 0);
        assert_eq!(breaker.state, TroopState::Dead);
        assert!(breaker.target.is_none());
        assert!(breaker.path.is_none());
        assert_eq!(base.walls()[0].hp, 300 - 60);
        assert!(events.contains(&CombatEvent::TroopKilled { troop: TroopId(0) }));
    }

    #[test]
    fn test_wall_breaker_outside_contact_walks() {
        let mut base = BaseLayout::new("approach");
        assert!(base.add_building("wall", 1, (5, 5)));
        let mut breaker = troop(TroopKind::WallBreaker, 5.5, 7.5);
        let mut events = Vec::new();

        update_troop(TroopId(0), &mut breaker, &mut base, &BattleConfig::default(), clock(0), &mut events);

        assert!(breaker.is_alive());
        assert_eq!(base.walls()[0].hp, 300);
        assert_eq!(breaker.target, Some(BuildingId::Wall(0)));
    }

    #[test]
    fn test_in_range_troop_attacks_on_cooldown() {
        let mut base = BaseLayout::new("hit");
        assert!(base.add_building("cannon", 1, (10, 10)));
        // Archer range 3.5; cannon hitbox edge at x = 9.5.
        let mut archer = troop(TroopKind::Archer, 7.0, 11.0);
        let config = BattleConfig::default();
        let mut events = Vec::new();

        for tick in 0..=20 {
            update_troop(TroopId(0), &mut archer, &mut base, &config, clock(tick), &mut events);
        }

        let hits = events
            .iter()
            .filter(|e| matches!(e, CombatEvent::TroopAttack { .. }))
            .count();
        // Cooldown 1000 ms from t = 0: hits at 1000 and 2000.
        assert_eq!(hits, 2);
        assert_eq!(archer.state, TroopState::Attacking);
        assert_eq!(archer.position, Vec2Fixed::from_f64(7.0, 11.0));
        assert_eq!(base.structures()[0].hp, 420 - 2 * archer.stats.damage);
    }

    #[test]
    fn test_troop_walks_into_range_and_destroys() {
        let mut base = BaseLayout::new("walk");
        assert!(base.add_building("builder_hut", 1, (20, 20)));
        let mut barbarian = troop(TroopKind::Barbarian, 5.5, 5.5);
        let config = BattleConfig::default();
        let mut events = Vec::new();

        for tick in 0..600 {
            update_troop(TroopId(0), &mut barbarian, &mut base, &config, clock(tick), &mut events);
            if base.structures()[0].is_destroyed() {
                break;
            }
        }

        assert!(base.structures()[0].is_destroyed());
        assert!(events.contains(&CombatEvent::BuildingDestroyed {
            building: BuildingId::Structure(0),
            by: TroopId(0),
        }));
        assert!(barbarian.is_in_range(&base.structures()[0]));
    }

    #[test]
    fn test_no_target_idles() {
        let mut base = BaseLayout::new("empty");
        let mut archer = troop(TroopKind::Archer, 3.0, 3.0);
        let mut events = Vec::new();
        update_troop(TroopId(0), &mut archer, &mut base, &BattleConfig::default(), clock(0), &mut events);
        assert_eq!(archer.state, TroopState::Idle);
        assert!(events.is_empty());
    }

    #[test]
    fn test_dead_troop_is_skipped() {
        let mut base = BaseLayout::new("dead");
        assert!(base.add_building("cannon", 1, (10, 10)));
        let mut archer = troop(TroopKind::Archer, 7.0, 11.0);
        archer.kill();
        let mut events = Vec::new();
        update_troop(TroopId(0), &mut archer, &mut base, &BattleConfig::default(), clock(50), &mut events);
        assert!(archer.target.is_none());
        assert!(archer.path.is_none());
        assert_eq!(base.structures()[0].hp, 420);
    }

    #[test]
    fn test_unreachable_target_recovers() {
        // Empty path as left behind by a failed search.
        let mut base = BaseLayout::new("stuck");
        assert!(base.add_building("cannon", 1, (10, 10)));
        let mut archer = troop(TroopKind::Archer, 30.0, 30.0);
        archer.target = Some(BuildingId::Structure(0));
        archer.path = Some(Vec::new());
        archer.path_target = Some(BuildingId::Structure(0));
        archer.path_destination = Some(resolve_destination(
            &base.structures()[0],
            archer.stats.range,
            archer.position,
            base.grid_size(),
        ));
        archer.last_path_ms = 0;
        let config = BattleConfig::default();

        follow_path(&mut archer, BuildingId::Structure(0), &base, &config, clock(20));
        assert_eq!(archer.state, TroopState::Idle);
        assert!(archer.path.is_some());

        follow_path(&mut archer, BuildingId::Structure(0), &base, &config, clock(26));
        assert!(archer.path.is_none());
    }

    #[test]
    fn test_replans_when_destination_moves() {
        let mut base = BaseLayout::new("flank");
        assert!(base.add_building("cannon", 1, (20, 20)));
        let mut archer = troop(TroopKind::Archer, 5.5, 21.5);
        let config = BattleConfig::default();

        follow_path(&mut archer, BuildingId::Structure(0), &base, &config, clock(0));
        let west = archer.path.as_ref().and_then(|p| p.last()).copied().unwrap();
        assert!(west.x < Fixed::from_num(20));

        // Same target and well inside the recompute interval, but now on the far side.
        archer.position = Vec2Fixed::from_f64(35.5, 21.5);
        follow_path(&mut archer, BuildingId::Structure(0), &base, &config, clock(1));

        let east = archer.path.as_ref().and_then(|p| p.last()).copied().unwrap();
        assert!(east.x > Fixed::from_num(23));
        assert!(archer.path_destination.is_some_and(|d| d.x > Fixed::from_num(23)));
        assert_eq!(archer.last_path_ms, 100);
    }
}

//! Grid-based pathfinding using A* algorithm.
//!
//! Paths run over the 8-connected tile grid. Cardinal steps cost 1 and
//! diagonal steps cost √2, each scaled by the traversal multiplier of
//! the tile entered: free tiles 1, wall tiles a per-kind penalty,
//! building tiles impassable for ground units.
//!
//! All calculations use fixed-point math for deterministic results.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::buildings::Building;
use crate::grid::{TileGrid, TileState};
use crate::math::{Fixed, Vec2Fixed, SQRT_2};
use crate::troops::{TroopClass, TroopKind};

/// Search radius, in tiles, for a walkable stand-in when the destination
/// tile is blocked.
const FALLBACK_RADIUS: i64 = 3;

/// A precise destination closer than this to the last tile centre
/// replaces that centre as the final waypoint (1.5 tiles, squared).
const SNAP_DISTANCE_SQ: Fixed = Fixed::from_bits(9 << 30);

/// Wall traversal penalty for a troop kind.
#[must_use]
pub fn wall_penalty(kind: TroopKind) -> Fixed {
    match kind {
        TroopKind::Barbarian | TroopKind::Archer => Fixed::from_num(15),
        TroopKind::Giant => Fixed::from_num(10),
        // 0.1
        TroopKind::WallBreaker => Fixed::from_bits(429_496_730),
        TroopKind::Goblin => Fixed::from_num(20),
    }
}

/// Cost multiplier for entering a tile. `None` means impassable.
#[must_use]
pub fn traversal_multiplier(tile: TileState, kind: TroopKind) -> Option<Fixed> {
    match tile {
        TileState::Free => Some(Fixed::ONE),
        TileState::Wall => Some(wall_penalty(kind)),
        TileState::Building => None,
    }
}

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    index: usize,
    f_score: Fixed,
    /// Lower tile index wins ties, for determinism.
    tie_breaker: usize,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for lowest f first.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.tie_breaker.cmp(&self.tie_breaker),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (0, 1),
    (0, -1),
    (1, 0),
    (-1, 0),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

#[inline]
fn manhattan(a: (u32, u32), b: (u32, u32)) -> Fixed {
    Fixed::from_num(a.0.abs_diff(b.0) + a.1.abs_diff(b.1))
}

#[inline]
const fn step_cost(dx: i32, dy: i32) -> Fixed {
    if dx != 0 && dy != 0 {
        SQRT_2
    } else {
        Fixed::ONE
    }
}

/// A* over tile coordinates.
///
/// The start tile is never checked for walkability so a unit standing in
/// a hitbox gap can still leave it. Returns the tile sequence including
/// both endpoints, or `None` if the goal is unreachable.
#[must_use]
pub fn find_tile_path(
    grid: &TileGrid,
    kind: TroopKind,
    start: (u32, u32),
    goal: (u32, u32),
) -> Option<Vec<(u32, u32)>> {
    if !grid.in_bounds(start.0, start.1) || !grid.in_bounds(goal.0, goal.1) {
        return None;
    }

    let size = grid.size() as usize;
    let index_of = |(x, y): (u32, u32)| (y as usize) * size + (x as usize);
    let coords_of = |index: usize| ((index % size) as u32, (index / size) as u32);

    let mut g_score = vec![Fixed::MAX; size * size];
    let mut came_from: Vec<Option<usize>> = vec![None; size * size];
    let mut open_set = BinaryHeap::new();

    let start_index = index_of(start);
    let goal_index = index_of(goal);
    g_score[start_index] = Fixed::ZERO;
    open_set.push(AStarNode {
        index: start_index,
        f_score: manhattan(start, goal),
        tie_breaker: start_index,
    });

    while let Some(current) = open_set.pop() {
        if current.index == goal_index {
            return Some(reconstruct(&came_from, goal_index, coords_of));
        }

        let current_g = g_score[current.index];
        let (cx, cy) = coords_of(current.index);
        // Skip stale heap entries.
        if current.f_score > current_g + manhattan((cx, cy), goal) {
            continue;
        }

        for &(dx, dy) in &DIRECTIONS {
            let (Some(nx), Some(ny)) = (cx.checked_add_signed(dx), cy.checked_add_signed(dy)) else {
                continue;
            };
            let Some(tile) = grid.get(nx, ny) else {
                continue;
            };
            let Some(multiplier) = traversal_multiplier(tile, kind) else {
                continue;
            };

            let tentative_g = current_g + step_cost(dx, dy) * multiplier;
            let neighbor = index_of((nx, ny));
            if tentative_g < g_score[neighbor] {
                came_from[neighbor] = Some(current.index);
                g_score[neighbor] = tentative_g;
                open_set.push(AStarNode {
                    index: neighbor,
                    f_score: tentative_g + manhattan((nx, ny), goal),
                    tie_breaker: neighbor,
                });
            }
        }
    }

    None
}

fn reconstruct(
    came_from: &[Option<usize>],
    goal_index: usize,
    coords_of: impl Fn(usize) -> (u32, u32),
) -> Vec<(u32, u32)> {
    let mut path = vec![coords_of(goal_index)];
    let mut current = goal_index;
    while let Some(previous) = came_from[current] {
        path.push(coords_of(previous));
        current = previous;
    }
    path.reverse();
    path
}

/// Total multiplied cost of walking a tile sequence.
///
/// Returns `None` if any step enters an impassable tile.
#[must_use]
pub fn path_cost(grid: &TileGrid, kind: TroopKind, tiles: &[(u32, u32)]) -> Option<Fixed> {
    tiles.windows(2).try_fold(Fixed::ZERO, |total, step| {
        let (from, to) = (step[0], step[1]);
        let dx = i64::from(to.0) - i64::from(from.0);
        let dy = i64::from(to.1) - i64::from(from.1);
        let multiplier = traversal_multiplier(grid.get(to.0, to.1)?, kind)?;
        Some(total + step_cost(dx as i32, dy as i32) * multiplier)
    })
}

/// Pick the walkable tile nearest to `desired` within the fallback window
/// around `blocked`.
fn nearest_walkable(grid: &TileGrid, blocked: (u32, u32), desired: Vec2Fixed) -> Option<(u32, u32)> {
    let mut best: Option<((u32, u32), Fixed)> = None;
    for dy in -FALLBACK_RADIUS..=FALLBACK_RADIUS {
        for dx in -FALLBACK_RADIUS..=FALLBACK_RADIUS {
            if dx == 0 && dy == 0 {
                continue;
            }
            let x = i64::from(blocked.0) + dx;
            let y = i64::from(blocked.1) + dy;
            let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                continue;
            };
            if !grid.is_free(x, y) {
                continue;
            }
            let distance = TileGrid::tile_center(x, y).distance_squared(desired);
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some(((x, y), distance));
            }
        }
    }
    best.map(|(tile, _)| tile)
}

/// Plan a route from `start` to the world point `goal`.
///
/// If the goal tile is blocked for a ground unit, the nearest walkable
/// tile in a 7×7 window stands in for it; a demolition unit may instead
/// head straight onto a wall tile. The returned waypoints are tile
/// centres, except that the final one becomes `goal` itself whenever
/// `goal` lies within 1.5 tiles of the last centre.
///
/// Returns `None` when no route exists.
#[must_use]
pub fn find_path(
    grid: &TileGrid,
    kind: TroopKind,
    start: Vec2Fixed,
    goal: Vec2Fixed,
) -> Option<Vec<Vec2Fixed>> {
    let start_tile = grid.clamp_tile(start);
    let mut goal_tile = grid.clamp_tile(goal);

    let goal_state = grid.get(goal_tile.0, goal_tile.1)?;
    if goal_state != TileState::Free {
        match nearest_walkable(grid, goal_tile, goal) {
            Some(tile) => goal_tile = tile,
            None if goal_state == TileState::Wall && kind.class() == TroopClass::Demolition => {}
            None => return None,
        }
    }

    let tiles = find_tile_path(grid, kind, start_tile, goal_tile)?;
    let mut waypoints: Vec<Vec2Fixed> = tiles
        .iter()
        .map(|&(x, y)| TileGrid::tile_center(x, y))
        .collect();

    if let Some(last) = waypoints.last_mut() {
        if last.distance_squared(goal) < SNAP_DISTANCE_SQ {
            *last = goal;
        }
    }
    Some(waypoints)
}

/// World point a troop should walk to in order to attack `building`.
///
/// The attack position nearest to `from`; the building centre when no
/// attack position survives grid clipping.
#[must_use]
pub fn resolve_destination(building: &Building, range: Fixed, from: Vec2Fixed, grid_size: u32) -> Vec2Fixed {
    building
        .attack_positions(range, grid_size)
        .into_iter()
        .min_by_key(|p| p.distance_squared(from))
        .unwrap_or_else(|| building.center())
}

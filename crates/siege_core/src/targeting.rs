//! Troop target selection.
//!
//! Lower preference scores are better. A candidate's score is its
//! straight-line distance from the troop multiplied by the troop kind's
//! preference for the building kind.

use tracing::debug;

use crate::buildings::{BuildingCategory, BuildingId, BuildingKind};
use crate::layout::BaseLayout;
use crate::math::{fixed_sqrt, Fixed};
use crate::simulation::SimClock;
use crate::troops::{Troop, TroopClass};

/// 0.3
const TANK_DEFENSE_PREFERENCE: Fixed = Fixed::from_bits(1_288_490_189);
/// 0.4
const RAIDER_RESOURCE_PREFERENCE: Fixed = Fixed::from_bits(1_717_986_918);
/// 0.8
const GENERALIST_PREFERENCE: Fixed = Fixed::from_bits(3_435_973_837);

/// Preference multiplier of `class` for `kind`. `None` excludes the kind.
#[must_use]
pub fn preference(class: TroopClass, kind: BuildingKind) -> Option<Fixed> {
    let category = kind.category();
    match class {
        TroopClass::Demolition => Some(Fixed::ONE),
        _ if category == BuildingCategory::Wall => None,
        TroopClass::Tank if category == BuildingCategory::Defense => Some(TANK_DEFENSE_PREFERENCE),
        TroopClass::Raider if category == BuildingCategory::Resource => Some(RAIDER_RESOURCE_PREFERENCE),
        TroopClass::Melee | TroopClass::Ranged => Some(GENERALIST_PREFERENCE),
        TroopClass::Tank | TroopClass::Raider => Some(Fixed::ONE),
    }
}

/// How many of the nearest candidates are scored.
#[must_use]
pub const fn candidate_count(class: TroopClass) -> usize {
    match class {
        TroopClass::Demolition => 4,
        _ => 3,
    }
}

/// Choose the best target for `troop` among live buildings.
///
/// Excluded kinds are filtered out before the nearest candidates are
/// taken. Tanks only consider active defenses while any remain. Ties keep
/// the nearer candidate.
#[must_use]
pub fn select_target(troop: &Troop, layout: &BaseLayout) -> Option<BuildingId> {
    let class = troop.class();
    let defenses_remain = layout.structures().iter().any(|b| b.is_active_defense());

    let mut candidates: Vec<(BuildingId, Fixed, Fixed)> = layout
        .iter()
        .filter(|(_, b)| !b.is_destroyed())
        .filter(|(_, b)| class != TroopClass::Tank || !defenses_remain || b.kind.is_defense())
        .filter_map(|(id, b)| {
            let multiplier = preference(class, b.kind)?;
            Some((id, b.center().distance_squared(troop.position), multiplier))
        })
        .collect();

    candidates.sort_by_key(|(_, distance_sq, _)| *distance_sq);
    candidates
        .into_iter()
        .take(candidate_count(class))
        .map(|(id, distance_sq, multiplier)| (id, fixed_sqrt(distance_sq) * multiplier))
        .fold(None, |best: Option<(BuildingId, Fixed)>, (id, score)| match best {
            Some((_, best_score)) if best_score <= score => best,
            _ => Some((id, score)),
        })
        .map(|(id, _)| id)
}

/// Keep or replace the troop's target.
///
/// A live target is kept until the retarget interval has elapsed since
/// the last evaluation. Changing target drops the held path. Returns
/// `true` if the target changed.
pub fn acquire_target(troop: &mut Troop, layout: &BaseLayout, clock: SimClock, retarget_interval_ms: u64) -> bool {
    let current_alive = troop
        .target
        .and_then(|id| layout.get(id))
        .is_some_and(|b| !b.is_destroyed());
    if current_alive && clock.time_ms.saturating_sub(troop.last_retarget_ms) < retarget_interval_ms {
        return false;
    }

    troop.last_retarget_ms = clock.time_ms;
    let chosen = select_target(troop, layout);
    if chosen == troop.target {
        return false;
    }

    debug!(
        tick = clock.tick,
        sim_time_ms = clock.time_ms,
        troop = %troop.kind,
        from = ?troop.target,
        to = ?chosen,
        "Troop retargeted"
    );
    troop.target = chosen;
    troop.clear_path();
    true
}

//! Splash projectiles.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::CombatEvent;
use crate::buildings::BuildingId;
use crate::math::{fixed_serde, fixed_sqrt, Fixed, Vec2Fixed, HALF, RANGE_EPSILON};
use crate::simulation::SimClock;
use crate::troops::{Troop, TroopId};

/// A shell in flight from a splash defense to a fixed impact point.
///
/// Only `elapsed_ms` changes after launch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Defense that fired it.
    pub source: BuildingId,
    /// Launch point.
    pub origin: Vec2Fixed,
    /// Landing point.
    pub impact: Vec2Fixed,
    /// Damage at the impact point.
    pub damage: u32,
    /// Splash radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Total flight time.
    pub travel_ms: u64,
    /// Flight time so far.
    pub elapsed_ms: u64,
}

impl Projectile {
    /// Launch a shell travelling in a straight line at `speed` tiles/s.
    #[must_use]
    pub fn launch(
        source: BuildingId,
        origin: Vec2Fixed,
        impact: Vec2Fixed,
        speed: Fixed,
        damage: u32,
        radius: Fixed,
    ) -> Self {
        let travel_ms = if speed > Fixed::ZERO {
            (origin.distance(impact) * Fixed::from_num(1_000) / speed)
                .round()
                .saturating_to_num::<u64>()
        } else {
            0
        };
        Self {
            source,
            origin,
            impact,
            damage,
            radius,
            travel_ms,
            elapsed_ms: 0,
        }
    }

    /// Current position along the flight line.
    #[must_use]
    pub fn position(&self) -> Vec2Fixed {
        if self.travel_ms == 0 {
            return self.impact;
        }
        let t = Fixed::from_num(self.elapsed_ms.min(self.travel_ms)) / Fixed::from_num(self.travel_ms);
        self.origin.lerp(self.impact, t)
    }

    /// Advance the flight clock. Returns `true` once the shell has landed.
    pub fn advance(&mut self, dt_ms: u64) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        self.elapsed_ms >= self.travel_ms
    }
}

/// Damage every living troop within `radius` of `impact`.
///
/// Damage falls off linearly from the full amount at the impact point to
/// half of it at the radius edge, rounded down. Returns the damaged
/// troops and the subset killed, both in id order.
pub fn apply_splash(impact: Vec2Fixed, radius: Fixed, damage: u32, troops: &mut [Troop]) -> (Vec<TroopId>, Vec<TroopId>) {
    let reach_sq = radius * radius + RANGE_EPSILON;
    let mut hit = Vec::new();
    let mut killed = Vec::new();

    for (index, troop) in troops.iter_mut().enumerate() {
        if !troop.is_alive() {
            continue;
        }
        let distance_sq = troop.position.distance_squared(impact);
        if distance_sq > reach_sq {
            continue;
        }
        let falloff = if radius > Fixed::ZERO {
            (fixed_sqrt(distance_sq) / radius).min(Fixed::ONE) * HALF
        } else {
            Fixed::ZERO
        };
        let dealt = (Fixed::from_num(damage) * (Fixed::ONE - falloff)).saturating_to_num::<u32>();
        hit.push(TroopId(index));
        if troop.take_damage(dealt) {
            killed.push(TroopId(index));
        }
    }
    (hit, killed)
}

/// Advance every shell by `dt_ms`, detonating and removing those that land.
pub fn advance_projectiles(
    projectiles: &mut Vec<Projectile>,
    troops: &mut [Troop],
    dt_ms: u64,
    clock: SimClock,
    events: &mut Vec<CombatEvent>,
) {
    projectiles.retain_mut(|shell| {
        if !shell.advance(dt_ms) {
            return true;
        }

        let (hit, killed) = apply_splash(shell.impact, shell.radius, shell.damage, troops);
        debug!(
            tick = clock.tick,
            sim_time_ms = clock.time_ms,
            source = ?shell.source,
            hits = hit.len(),
            "Projectile impacted"
        );
        events.push(CombatEvent::ProjectileImpact {
            building: shell.source,
            impact: shell.impact,
            hits: hit.len(),
        });
        for troop in killed {
            info!(
                tick = clock.tick,
                sim_time_ms = clock.time_ms,
                troop = troop.0,
                by = ?shell.source,
                "Troop killed by splash"
            );
            events.push(CombatEvent::TroopKilled { troop });
        }
        false
    });
}

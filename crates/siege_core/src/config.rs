//! Battle tuning knobs.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SiegeError};
use crate::math::{fixed_decimal, Fixed};

/// Engine configuration.
///
/// Every interval is in simulated milliseconds; nothing here refers to
/// wall-clock time.
///
/// # Example RON
///
/// ```ron
/// BattleConfig(
///     grid_size: 44,
///     tick_rate: 10,
///     max_duration_ms: 180000,
///     retarget_interval_ms: 3000,
///     path_recompute_interval_ms: 5000,
///     snapshot_interval_ticks: 5,
///     waypoint_tolerance: 0.2,
///     projectile_speed: 3.0,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Side length of the square tile grid.
    pub grid_size: u32,
    /// Ticks per simulated second.
    pub tick_rate: u32,
    /// Battle duration cap.
    pub max_duration_ms: u64,
    /// How long a troop keeps a live target before re-evaluating.
    pub retarget_interval_ms: u64,
    /// How long a path is followed before it is replanned.
    pub path_recompute_interval_ms: u64,
    /// Record a snapshot every this many ticks.
    pub snapshot_interval_ticks: u64,
    /// Distance at which a waypoint counts as reached.
    #[serde(with = "fixed_decimal")]
    pub waypoint_tolerance: Fixed,
    /// Speed of splash projectiles in tiles per second.
    #[serde(with = "fixed_decimal")]
    pub projectile_speed: Fixed,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            grid_size: 44,
            tick_rate: 10,
            max_duration_ms: 180_000,
            retarget_interval_ms: 3_000,
            path_recompute_interval_ms: 5_000,
            snapshot_interval_ticks: 5,
            waypoint_tolerance: Fixed::from_bits(858_993_459),
            projectile_speed: Fixed::from_num(3),
        }
    }
}

impl BattleConfig {
    /// Parse a configuration from RON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::DataParse`] on malformed input and
    /// [`SiegeError::InvalidState`] if the values fail [`Self::validate`].
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can drive a battle.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::InvalidState`] describing the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.grid_size == 0 {
            return Err(SiegeError::InvalidState("grid_size must be positive".into()));
        }
        if self.tick_rate == 0 || self.tick_rate > 1_000 {
            return Err(SiegeError::InvalidState(format!(
                "tick_rate must be within 1..=1000, got {}",
                self.tick_rate
            )));
        }
        if self.snapshot_interval_ticks == 0 {
            return Err(SiegeError::InvalidState(
                "snapshot_interval_ticks must be positive".into(),
            ));
        }
        if self.projectile_speed <= Fixed::ZERO {
            return Err(SiegeError::InvalidState("projectile_speed must be positive".into()));
        }
        Ok(())
    }

    /// Simulated milliseconds per tick.
    #[must_use]
    pub fn tick_duration_ms(&self) -> u64 {
        (1_000 / u64::from(self.tick_rate.max(1))).max(1)
    }
}

//! Instant and paced battle runners.
//!
//! A runner owns one [`BattleSimulator`] and drives it to the end on the
//! calling thread. Pacing only changes how long the runner waits between
//! ticks; the simulated outcome is identical either way.

use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use siege_core::army::ArmyEntry;
use siege_core::config::BattleConfig;
use siege_core::layout::BaseLayout;
use siege_core::simulation::{BattleSimulator, BattleSnapshot, BattleStatistics, TickEvents};
use tracing::{debug, info};

use crate::error::{Result, RunnerError};

/// How ticks are spaced in wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Pacing {
    /// Tick as fast as possible.
    #[default]
    Instant,
    /// Real time divided by `speed`; 2.0 plays a 3 minute battle in 90 s.
    Paced {
        /// Speed multiplier.
        speed: f64,
    },
}

impl Pacing {
    /// Paced playback, rejecting non-positive or non-finite speeds.
    pub fn paced(speed: f64) -> Result<Self> {
        if !speed.is_finite() || speed <= 0.0 {
            return Err(RunnerError::InvalidSpeed(speed));
        }
        Ok(Self::Paced { speed })
    }

    /// Wall-clock time between ticks.
    #[must_use]
    pub fn tick_interval(self, tick_ms: u64) -> Duration {
        match self {
            Self::Instant => Duration::ZERO,
            Self::Paced { speed } => Duration::from_secs_f64(tick_ms as f64 / 1_000.0 / speed),
        }
    }
}

/// Result of one battle, tagged with its inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReport {
    /// Base name.
    pub base: String,
    /// Army name.
    pub army: String,
    /// Troops that failed to deploy.
    pub skipped_troops: usize,
    /// Final statistics.
    pub statistics: BattleStatistics,
}

/// Drives a single battle.
pub struct BattleRunner {
    sim: BattleSimulator,
    army_name: String,
    skipped_troops: usize,
    pacing: Pacing,
}

impl BattleRunner {
    /// Deploy `army` against `layout`.
    ///
    /// Army entries that fail to deploy are skipped and counted.
    pub fn new(layout: BaseLayout, army_name: impl Into<String>, army: &[ArmyEntry], config: BattleConfig) -> Result<Self> {
        let mut sim = BattleSimulator::new(layout, config)?;
        let deployed = sim.deploy_army(army);
        Ok(Self {
            sim,
            army_name: army_name.into(),
            skipped_troops: army.len() - deployed.len(),
            pacing: Pacing::Instant,
        })
    }

    /// Set the pacing.
    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// The simulator being driven.
    #[must_use]
    pub fn simulator(&self) -> &BattleSimulator {
        &self.sim
    }

    /// Snapshots recorded so far.
    #[must_use]
    pub fn history(&self) -> &[BattleSnapshot] {
        self.sim.history()
    }

    /// Run to the end and report.
    pub fn run(&mut self) -> BattleReport {
        self.run_with(|_| {})
    }

    /// Run to the end, calling `on_tick` after every tick.
    pub fn run_with<F>(&mut self, mut on_tick: F) -> BattleReport
    where
        F: FnMut(&TickEvents),
    {
        let interval = self.pacing.tick_interval(self.sim.config().tick_duration_ms());
        info!(
            base = %self.sim.layout().name(),
            army = %self.army_name,
            troops = self.sim.troops().len(),
            pacing = ?self.pacing,
            "Running battle"
        );

        self.sim.start();
        let started = Instant::now();
        let mut ticks: u32 = 0;
        while !self.sim.is_finished() {
            let events = self.sim.tick();
            on_tick(&events);
            ticks = ticks.saturating_add(1);

            if !interval.is_zero() {
                // Sleep until this tick's slot on the schedule.
                let due = started + interval * ticks;
                let now = Instant::now();
                if due > now {
                    thread::sleep(due - now);
                }
            }
        }

        let statistics = self.sim.statistics();
        debug!(wall_ms = started.elapsed().as_millis() as u64, "Battle finished");
        BattleReport {
            base: self.sim.layout().name().to_string(),
            army: self.army_name.clone(),
            skipped_troops: self.skipped_troops,
            statistics,
        }
    }
}

/// Run one battle instantly.
pub fn run_battle(layout: BaseLayout, army_name: &str, army: &[ArmyEntry], config: BattleConfig) -> Result<BattleReport> {
    Ok(BattleRunner::new(layout, army_name, army, config)?.run())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{army_preset, base_preset};
    use siege_core::data::GameData;
    use siege_core::simulation::BattleState;

    fn minimal() -> BaseLayout {
        BaseLayout::from_layout_data(&base_preset("minimal").unwrap(), GameData::default(), 44).0
    }

    #[test]
    fn test_pacing_validation() {
        assert!(Pacing::paced(2.0).is_ok());
        assert!(matches!(Pacing::paced(0.0), Err(RunnerError::InvalidSpeed(_))));
        assert!(Pacing::paced(f64::NAN).is_err());
        assert_eq!(Pacing::Instant.tick_interval(100), Duration::ZERO);
        assert_eq!(Pacing::paced(4.0).unwrap().tick_interval(100), Duration::from_millis(25));
    }

    #[test]
    fn test_instant_run_terminates() {
        let army = army_preset("minimal").unwrap();
        let report = run_battle(minimal(), "minimal", &army, BattleConfig::default()).unwrap();

        assert_eq!(report.base, "minimal");
        assert_eq!(report.skipped_troops, 0);
        assert!(report.statistics.state.is_terminal());
        assert_eq!(report.statistics.troops_deployed, 2);
    }

    #[test]
    fn test_paced_matches_instant() {
        let army = army_preset("minimal").unwrap();
        let config = BattleConfig {
            max_duration_ms: 2_000,
            ..BattleConfig::default()
        };

        let instant = run_battle(minimal(), "minimal", &army, config.clone()).unwrap();
        let paced = BattleRunner::new(minimal(), "minimal", &army, config)
            .unwrap()
            .with_pacing(Pacing::paced(100.0).unwrap())
            .run();

        assert_eq!(instant, paced);
    }

    #[test]
    fn test_run_with_sees_every_tick() {
        let army = army_preset("minimal").unwrap();
        let config = BattleConfig {
            max_duration_ms: 1_000,
            ..BattleConfig::default()
        };
        let mut runner = BattleRunner::new(minimal(), "minimal", &army, config).unwrap();
        let mut seen = 0u64;
        let report = runner.run_with(|_| seen += 1);

        assert_eq!(seen, report.statistics.tick_count);
        assert_eq!(report.statistics.state, BattleState::Timeout);
        assert!(!runner.history().is_empty());
    }

    #[test]
    fn test_skipped_entries_counted() {
        let mut army = army_preset("minimal").unwrap();
        army.push(ArmyEntry("dragon".into(), 1, (0.0, 0.0)));
        let runner = BattleRunner::new(minimal(), "custom", &army, BattleConfig::default()).unwrap();
        assert_eq!(runner.skipped_troops, 1);
        assert_eq!(runner.simulator().troops().len(), 2);
    }
}

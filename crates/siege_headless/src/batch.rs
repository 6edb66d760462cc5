//! Batch runner: every base against every army.
//!
//! Battles run in parallel using rayon, one simulator per job. Results
//! come back in job order regardless of which thread finished first.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use siege_core::army::ArmyEntry;
use siege_core::config::BattleConfig;
use siege_core::layout::BaseLayout;
use siege_core::simulation::BattleState;
use tracing::{info, warn};

use crate::error::Result;
use crate::runner::{run_battle, BattleReport};

/// One base/army pairing.
#[derive(Debug, Clone)]
pub struct BatchJob {
    /// Base to attack.
    pub base: BaseLayout,
    /// Army label.
    pub army_name: String,
    /// Army to deploy.
    pub army: Vec<ArmyEntry>,
}

/// Cross every base with every army.
#[must_use]
pub fn matchups(bases: &[BaseLayout], armies: &[(String, Vec<ArmyEntry>)]) -> Vec<BatchJob> {
    bases
        .iter()
        .flat_map(|base| {
            armies.iter().map(move |(name, army)| BatchJob {
                base: base.clone(),
                army_name: name.clone(),
                army: army.clone(),
            })
        })
        .collect()
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchError {
    /// Job index
    pub job_index: usize,
    /// Base name
    pub base: String,
    /// Army name
    pub army: String,
    /// Error message
    pub message: String,
}

/// Aggregate over a batch, keyed by army name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Battles completed.
    pub total_battles: usize,
    /// Victories per army.
    pub victories: BTreeMap<String, usize>,
    /// Mean destruction percentage per army.
    pub avg_destruction: BTreeMap<String, f64>,
    /// Mean stars per army.
    pub avg_stars: BTreeMap<String, f64>,
    /// Mean simulated duration in ms.
    pub avg_duration_ms: f64,
}

impl BatchSummary {
    /// Summarise a set of reports.
    #[must_use]
    pub fn from_reports(reports: &[BattleReport]) -> Self {
        if reports.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total_battles: reports.len(),
            ..Default::default()
        };
        let mut per_army: BTreeMap<&str, (usize, f64, u64)> = BTreeMap::new();
        let mut duration_sum = 0u64;

        for report in reports {
            let stats = &report.statistics;
            duration_sum += stats.duration_ms;
            let entry = per_army.entry(report.army.as_str()).or_default();
            entry.0 += 1;
            entry.1 += stats.destruction_percentage;
            entry.2 += u64::from(stats.stars);
            let wins = summary.victories.entry(report.army.clone()).or_default();
            if stats.state == BattleState::Victory {
                *wins += 1;
            }
        }

        for (army, (count, destruction, stars)) in per_army {
            summary.avg_destruction.insert(army.to_string(), destruction / count as f64);
            summary.avg_stars.insert(army.to_string(), stars as f64 / count as f64);
        }
        summary.avg_duration_ms = duration_sum as f64 / reports.len() as f64;
        summary
    }
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Per-battle reports in job order.
    pub reports: Vec<BattleReport>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Total runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

/// Run every job to completion.
///
/// `parallel` caps the worker threads; 0 uses rayon's default pool.
pub fn run_batch(jobs: Vec<BatchJob>, config: &BattleConfig, parallel: usize) -> BatchResults {
    let start = Instant::now();
    info!(jobs = jobs.len(), parallel, "Starting batch run");

    let run_all = || -> Vec<std::result::Result<BattleReport, BatchError>> {
        jobs.into_par_iter()
            .enumerate()
            .map(|(index, job)| {
                let base = job.base.name().to_string();
                run_battle(job.base, &job.army_name, &job.army, config.clone()).map_err(|e| {
                    warn!(job = index, base = %base, army = %job.army_name, error = %e, "Battle failed");
                    BatchError {
                        job_index: index,
                        base,
                        army: job.army_name.clone(),
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    };

    let results = if parallel > 0 {
        match rayon::ThreadPoolBuilder::new().num_threads(parallel).build() {
            Ok(pool) => pool.install(run_all),
            Err(e) => {
                warn!(error = %e, "Failed to build thread pool, using the global pool");
                run_all()
            }
        }
    } else {
        run_all()
    };

    let (reports, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(std::result::Result::is_ok);
    let reports: Vec<BattleReport> = reports.into_iter().filter_map(std::result::Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(std::result::Result::err).collect();

    let summary = BatchSummary::from_reports(&reports);
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        "Batch complete: {} battles in {:.1}s ({} failed)",
        reports.len(),
        duration_seconds,
        errors.len()
    );

    BatchResults {
        reports,
        summary,
        duration_seconds,
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presets::{army_preset, base_preset, ARMY_PRESETS, BASE_PRESETS};
    use siege_core::data::GameData;
    use tempfile::tempdir;

    fn preset_jobs() -> Vec<BatchJob> {
        let bases: Vec<BaseLayout> = BASE_PRESETS
            .iter()
            .map(|name| BaseLayout::from_layout_data(&base_preset(name).unwrap(), GameData::default(), 44).0)
            .collect();
        let armies: Vec<(String, Vec<ArmyEntry>)> = ARMY_PRESETS
            .iter()
            .map(|name| (name.to_string(), army_preset(name).unwrap()))
            .collect();
        matchups(&bases, &armies)
    }

    fn short_config() -> BattleConfig {
        BattleConfig {
            max_duration_ms: 30_000,
            ..BattleConfig::default()
        }
    }

    #[test]
    fn test_matchups_cross_product() {
        let jobs = preset_jobs();
        assert_eq!(jobs.len(), BASE_PRESETS.len() * ARMY_PRESETS.len());
        assert_eq!(jobs[0].base.name(), "default");
        assert_eq!(jobs[0].army_name, "mixed");
        assert_eq!(jobs[3].base.name(), "minimal");
    }

    #[test]
    fn test_batch_is_ordered_and_deterministic() {
        let first = run_batch(preset_jobs(), &short_config(), 2);
        let second = run_batch(preset_jobs(), &short_config(), 0);

        assert!(first.errors.is_empty());
        assert_eq!(first.reports.len(), 6);
        assert_eq!(first.reports, second.reports);
        assert_eq!(first.summary, second.summary);
        assert!(first.reports.iter().all(|r| r.statistics.state.is_terminal()));
    }

    #[test]
    fn test_grid_mismatch_reported_as_error() {
        let config = BattleConfig {
            grid_size: 30,
            ..short_config()
        };
        let results = run_batch(preset_jobs().into_iter().take(2).collect(), &config, 1);
        assert!(results.reports.is_empty());
        assert_eq!(results.errors.len(), 2);
        assert_eq!(results.errors[1].job_index, 1);
    }

    #[test]
    fn test_summary_and_save() {
        let results = run_batch(preset_jobs(), &short_config(), 0);
        assert_eq!(results.summary.total_battles, 6);
        assert_eq!(results.summary.avg_destruction.len(), ARMY_PRESETS.len());

        let dir = tempdir().unwrap();
        let path = dir.path().join("out/batch.json");
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.reports.len(), results.reports.len());
        assert_eq!(loaded.reports[0].statistics.state, results.reports[0].statistics.state);
    }
}

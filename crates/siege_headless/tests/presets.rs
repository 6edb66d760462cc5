//! Preset battles replay identically.

use siege_core::config::BattleConfig;
use siege_core::data::GameData;
use siege_core::layout::BaseLayout;
use siege_core::simulation::BattleSimulator;
use siege_headless::presets::{army_preset, base_preset, ARMY_PRESETS};
use siege_headless::runner::run_battle;
use siege_test_utils::determinism::{run_parallel_battles, verify_serialization_determinism};

fn default_base() -> BaseLayout {
    BaseLayout::from_layout_data(&base_preset("default").unwrap(), GameData::default(), 44).0
}

fn preset_battle(army: &str) -> BattleSimulator {
    let mut sim = BattleSimulator::new(default_base(), BattleConfig::default()).unwrap();
    sim.deploy_army(&army_preset(army).unwrap());
    sim.start();
    sim
}

#[test]
fn test_default_base_parallel_runs_agree() {
    for army in ARMY_PRESETS {
        run_parallel_battles(|| preset_battle(army), 3, 400).assert_deterministic();
    }
}

#[test]
fn test_default_base_survives_save_restore() {
    assert!(verify_serialization_determinism(|| preset_battle("mixed"), 300));
}

#[test]
fn test_runner_matches_simulator() {
    let army = army_preset("small").unwrap();
    let report = run_battle(default_base(), "small", &army, BattleConfig::default()).unwrap();

    let mut sim = preset_battle("small");
    let stats = sim.run_to_end();
    assert_eq!(report.statistics, stats);
}

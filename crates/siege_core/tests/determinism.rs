//! Reproducibility of whole battles.

use siege_core::army::ArmyEntry;
use siege_core::troops::TroopKind;
use siege_test_utils::determinism::{
    find_first_divergence, run_parallel_battles, verify_battle_determinism, verify_serialization_determinism,
};
use siege_test_utils::fixtures::{cannon_layout, mixed_army, outpost_layout, started_battle};

#[test]
fn test_outpost_battle_is_deterministic() {
    assert!(verify_battle_determinism(
        || started_battle(outpost_layout(), &mixed_army()),
        1_000
    ));
}

#[test]
fn test_no_divergence_tick_by_tick() {
    assert_eq!(
        find_first_divergence(|| started_battle(outpost_layout(), &mixed_army()), 400),
        None
    );
}

#[test]
fn test_parallel_runs_match() {
    let army = vec![
        ArmyEntry::new(TroopKind::Giant, 1, (5.0, 5.0)),
        ArmyEntry::new(TroopKind::Archer, 1, (6.0, 5.0)),
    ];
    run_parallel_battles(|| started_battle(cannon_layout(), &army), 8, 500).assert_deterministic();
}

#[test]
fn test_restored_battle_continues_in_lockstep() {
    assert!(verify_serialization_determinism(
        || started_battle(outpost_layout(), &mixed_army()),
        250
    ));
}

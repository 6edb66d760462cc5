//! Property tests over random bases and armies.

use proptest::prelude::*;
use siege_core::combat::in_range;
use siege_core::simulation::BattleState;
use siege_test_utils::determinism::strategies::{arb_army, arb_layout};
use siege_test_utils::fixtures::started_battle;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_hp_never_increases(base in arb_layout(8, 12), army in arb_army(8)) {
        let mut sim = started_battle(base, &army);
        let mut building_hp: Vec<u32> = sim.layout().iter().map(|(_, b)| b.hp).collect();
        let mut troop_hp: Vec<u32> = sim.troops().iter().map(|t| t.hp).collect();

        for _ in 0..300 {
            if sim.is_finished() {
                break;
            }
            sim.tick();
            let now_buildings: Vec<u32> = sim.layout().iter().map(|(_, b)| b.hp).collect();
            let now_troops: Vec<u32> = sim.troops().iter().map(|t| t.hp).collect();
            for (before, after) in building_hp.iter().zip(&now_buildings) {
                prop_assert!(after <= before);
            }
            for (before, after) in troop_hp.iter().zip(&now_troops) {
                prop_assert!(after <= before);
            }
            building_hp = now_buildings;
            troop_hp = now_troops;
        }
    }

    #[test]
    fn prop_destroyed_is_one_way(base in arb_layout(8, 12), army in arb_army(8)) {
        let mut sim = started_battle(base, &army);
        let mut destroyed: Vec<bool> = sim.layout().iter().map(|(_, b)| b.is_destroyed()).collect();
        for _ in 0..300 {
            if sim.is_finished() {
                break;
            }
            sim.tick();
            let now: Vec<bool> = sim.layout().iter().map(|(_, b)| b.is_destroyed()).collect();
            for (before, after) in destroyed.iter().zip(&now) {
                prop_assert!(!before || *after);
            }
            for (_, building) in sim.layout().iter() {
                prop_assert_eq!(building.is_destroyed(), building.hp == 0);
            }
            destroyed = now;
        }
    }

    #[test]
    fn prop_dead_troops_hold_nothing(base in arb_layout(8, 12), army in arb_army(8)) {
        let mut sim = started_battle(base, &army);
        for _ in 0..300 {
            if sim.is_finished() {
                break;
            }
            sim.tick();
            for troop in sim.troops().iter().filter(|t| !t.is_alive()) {
                prop_assert!(troop.target.is_none());
                prop_assert!(troop.path.is_none());
                prop_assert_eq!(troop.hp, 0);
            }
        }
    }

    #[test]
    fn prop_defense_targets_valid_after_tick(base in arb_layout(8, 12), army in arb_army(8)) {
        let mut sim = started_battle(base, &army);
        for _ in 0..300 {
            if sim.is_finished() {
                break;
            }
            sim.tick();
            for building in sim.layout().structures().iter().filter(|b| !b.is_destroyed()) {
                let Some(defense) = &building.defense else { continue };
                let Some(target) = defense.target else { continue };
                let troop = &sim.troops()[target.0];
                // A later defense or a landing shell may finish the held
                // target within the same tick; it is dropped on the next one.
                if !troop.is_alive() {
                    continue;
                }
                prop_assert!(in_range(&defense.weapon, building.footprint(), troop));
            }
        }
    }

    #[test]
    fn prop_end_check_is_idempotent(base in arb_layout(6, 6), army in arb_army(4)) {
        let mut sim = started_battle(base, &army);
        for _ in 0..50 {
            sim.tick();
            let first = sim.check_end_conditions();
            prop_assert_eq!(first, sim.check_end_conditions());
            prop_assert!(first == sim.state() || sim.state() == BattleState::InProgress);
        }
    }
}

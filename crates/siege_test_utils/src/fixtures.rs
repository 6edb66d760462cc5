//! Test fixtures and helpers.
//!
//! Small bases and armies for consistent testing.

use fixed::types::I32F32;
use siege_core::army::ArmyEntry;
use siege_core::config::BattleConfig;
use siege_core::layout::BaseLayout;
use siege_core::math::Vec2Fixed;
use siege_core::simulation::BattleSimulator;
use siege_core::troops::TroopKind;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a vector from floats (for tests only).
#[must_use]
pub fn vec2(x: f64, y: f64) -> Vec2Fixed {
    Vec2Fixed::new(fixed_f(x), fixed_f(y))
}

/// A single level 1 cannon at (20, 20).
#[must_use]
pub fn cannon_layout() -> BaseLayout {
    let mut base = BaseLayout::new("cannon");
    base.add_building("cannon", 1, (20, 20));
    base
}

/// Town hall guarded by a cannon, an archer tower and a mortar, with a
/// wall line across the southern approach and two resource buildings.
#[must_use]
pub fn outpost_layout() -> BaseLayout {
    let mut base = BaseLayout::new("outpost");
    base.add_building("town_hall", 3, (20, 20));
    base.add_building("cannon", 2, (15, 20));
    base.add_building("archer_tower", 1, (26, 20));
    base.add_building("mortar", 1, (20, 26));
    base.add_building("gold_mine", 1, (10, 10));
    base.add_building("elixir_collector", 1, (31, 10));
    for x in 14..=30 {
        base.add_building("wall", 1, (x, 17));
    }
    base
}

/// Mixed army deployed along the southern edge.
#[must_use]
pub fn mixed_army() -> Vec<ArmyEntry> {
    let mut army = Vec::new();
    for i in 0..6 {
        army.push(ArmyEntry::new(TroopKind::Barbarian, 1, (14.0 + f64::from(i) * 2.0, 4.0)));
    }
    for i in 0..4 {
        army.push(ArmyEntry::new(TroopKind::Archer, 1, (16.0 + f64::from(i) * 3.0, 2.0)));
    }
    army.push(ArmyEntry::new(TroopKind::Giant, 1, (21.0, 3.0)));
    army.push(ArmyEntry::new(TroopKind::WallBreaker, 1, (20.0, 8.0)));
    army.push(ArmyEntry::new(TroopKind::WallBreaker, 1, (24.0, 8.0)));
    army.push(ArmyEntry::new(TroopKind::Goblin, 1, (8.0, 4.0)));
    army.push(ArmyEntry::new(TroopKind::Goblin, 1, (33.0, 4.0)));
    army
}

/// Build a simulator with the default config and deploy `army`.
///
/// # Panics
///
/// Panics if the layout grid does not match the default config.
#[must_use]
pub fn battle(layout: BaseLayout, army: &[ArmyEntry]) -> BattleSimulator {
    let mut sim = BattleSimulator::new(layout, BattleConfig::default())
        .expect("fixture layout uses the default grid");
    sim.deploy_army(army);
    sim
}

/// [`battle`] with the battle already started.
#[must_use]
pub fn started_battle(layout: BaseLayout, army: &[ArmyEntry]) -> BattleSimulator {
    let mut sim = battle(layout, army);
    sim.start();
    sim
}

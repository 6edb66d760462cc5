//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the battle engine produces
//! identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Battles must be bit-for-bit reproducible so that a recorded layout and
//! army always replay to the same outcome. Sources of non-determinism
//! include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`siege_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Troops and buildings are always processed in index order.
//!
//! - **Wall-clock time**: Cooldowns and intervals only ever read the
//!   simulated clock.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual steps (targeting, pathing, combat)
//! 2. **Property tests**: Random layouts and armies still replay identically
//! 3. **Integration tests**: Full battles are reproducible
//! 4. **Parallel tests**: Running N battles on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use siege_core::simulation::BattleSimulator;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic battle).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the battle was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Battle is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a state machine multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `ticks` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one step
/// * `hash` - Function to compute the state hash
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run a battle twice with identical setup and compare final hashes.
///
/// `setup_fn` should return a started simulator.
pub fn verify_battle_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> BattleSimulator,
{
    verify_determinism(
        2,
        num_ticks,
        setup_fn,
        |sim| {
            sim.tick();
        },
        BattleSimulator::state_hash,
    )
    .is_deterministic
}

/// Run N battles on N scoped threads and collect their final hashes.
///
/// Each thread owns its own simulator; no simulator is ever ticked from
/// more than one thread.
pub fn run_parallel_battles<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> DeterminismResult
where
    F: Fn() -> BattleSimulator + Sync,
{
    let hashes: Vec<u64> = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut sim = setup_fn();
                    for _ in 0..num_ticks {
                        sim.tick();
                    }
                    sim.state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("battle thread panicked"))
            .collect()
    });

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks: num_ticks,
    }
}

/// Compare two battle runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs agree throughout, `Some(tick)` for the first tick
/// after which they differ (0 for differing initial states).
pub fn find_first_divergence<F>(setup_fn: F, num_ticks: u64) -> Option<u64>
where
    F: Fn() -> BattleSimulator,
{
    let mut sim1 = setup_fn();
    let mut sim2 = setup_fn();

    if sim1.state_hash() != sim2.state_hash() {
        return Some(0);
    }

    for tick in 1..=num_ticks {
        sim1.tick();
        sim2.tick();

        if sim1.state_hash() != sim2.state_hash() {
            return Some(tick);
        }
    }

    None
}

/// Check that a battle survives a bincode round trip mid-fight and that
/// the restored copy keeps ticking in lockstep with the original.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> BattleSimulator,
{
    let mut sim = setup_fn();

    for _ in 0..num_ticks {
        sim.tick();
    }

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = BattleSimulator::deserialize(&bytes) else {
        return false;
    };

    if restored.state_hash() != sim.state_hash() {
        return false;
    }

    for _ in 0..num_ticks {
        sim.tick();
        restored.tick();
    }
    restored.state_hash() == sim.state_hash()
}

/// Hash any hashable value with the standard hasher.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for battle inputs.
pub mod strategies {
    use proptest::prelude::*;
    use siege_core::army::ArmyEntry;
    use siege_core::buildings::BuildingKind;
    use siege_core::layout::BaseLayout;
    use siege_core::math::{Fixed, Vec2Fixed};
    use siege_core::troops::TroopKind;

    /// Grid side the strategies generate for.
    pub const GRID: i32 = 44;

    /// A coordinate on the default grid at quarter-tile resolution.
    pub fn arb_coordinate() -> impl Strategy<Value = Fixed> {
        (0..GRID * 4).prop_map(|q| Fixed::from_num(q) / Fixed::from_num(4))
    }

    /// A point on the default grid.
    pub fn arb_grid_position() -> impl Strategy<Value = Vec2Fixed> {
        (arb_coordinate(), arb_coordinate()).prop_map(|(x, y)| Vec2Fixed::new(x, y))
    }

    /// Any troop kind.
    pub fn arb_troop_kind() -> impl Strategy<Value = TroopKind> {
        prop::sample::select(TroopKind::ALL.to_vec())
    }

    /// A level 1 army entry somewhere on the grid.
    pub fn arb_army_entry() -> impl Strategy<Value = ArmyEntry> {
        (arb_troop_kind(), 0..GRID * 4, 0..GRID * 4).prop_map(|(kind, x, y)| {
            ArmyEntry::new(kind, 1, (f64::from(x) / 4.0, f64::from(y) / 4.0))
        })
    }

    /// An army of 1 to `max_len` entries.
    pub fn arb_army(max_len: usize) -> impl Strategy<Value = Vec<ArmyEntry>> {
        proptest::collection::vec(arb_army_entry(), 1..=max_len.max(1))
    }

    /// A placeable (non-wall) building kind.
    pub fn arb_building_kind() -> impl Strategy<Value = BuildingKind> {
        let kinds: Vec<BuildingKind> = BuildingKind::ALL.into_iter().filter(|k| !k.is_wall()).collect();
        prop::sample::select(kinds)
    }

    /// A base built from up to `max_buildings` random placements plus up
    /// to `max_walls` random wall tiles. Rejected placements are dropped,
    /// and a town hall is always attempted first.
    pub fn arb_layout(max_buildings: usize, max_walls: usize) -> impl Strategy<Value = BaseLayout> {
        let buildings = proptest::collection::vec((arb_building_kind(), 0..GRID, 0..GRID), 0..=max_buildings);
        let walls = proptest::collection::vec((0..GRID, 0..GRID), 0..=max_walls);
        (0..GRID - 4, 0..GRID - 4, buildings, walls).prop_map(|(hx, hy, buildings, walls)| {
            let mut base = BaseLayout::new("generated");
            base.add_building("town_hall", 3, (hx, hy));
            for (kind, x, y) in buildings {
                base.add_building(kind.as_str(), 1, (x, y));
            }
            for (x, y) in walls {
                base.add_building("wall", 1, (x, y));
            }
            base
        })
    }

    /// Generate damage values (1-100).
    pub fn arb_damage() -> impl Strategy<Value = u32> {
        1u32..100u32
    }
}

//! Battle simulator.
//!
//! The simulator owns the base, the troops and the shells in flight, and
//! advances them at a fixed timestep. Each tick processes every troop,
//! then every defense, then every projectile, and finally evaluates the
//! end conditions.
//!
//! # Determinism
//!
//! Everything in this module is deterministic:
//! - No floating-point math in the tick path (uses fixed-point via [`Fixed`])
//! - Simulated time only, counted in integer milliseconds
//! - Fixed iteration order (troops and buildings by index)
//! - Same inputs always produce the same outputs
//!
//! # Example
//!
//! ```
//! use siege_core::config::BattleConfig;
//! use siege_core::layout::BaseLayout;
//! use siege_core::math::Vec2Fixed;
//! use siege_core::simulation::{BattleSimulator, BattleState};
//! use siege_core::troops::TroopKind;
//!
//! let mut base = BaseLayout::new("demo");
//! assert!(base.add_building("town_hall", 3, (20, 20)));
//!
//! let mut sim = BattleSimulator::new(base, BattleConfig::default()).unwrap();
//! sim.create_troop(TroopKind::Barbarian, 1, Vec2Fixed::from_ints(2, 2)).unwrap();
//!
//! let stats = sim.run_to_end();
//! assert!(stats.state.is_terminal());
//! assert_ne!(sim.state(), BattleState::InProgress);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::army::ArmyEntry;
use crate::buildings::{BuildingId, BuildingKind};
use crate::combat::{advance_projectiles, update_defense, update_troop, CombatEvent, Projectile};
use crate::config::BattleConfig;
use crate::error::{Result, SiegeError};
use crate::layout::BaseLayout;
use crate::math::{Fixed, Vec2Fixed};
use crate::troops::{Troop, TroopId, TroopKind, TroopState};

/// Tick counter and simulated time, passed to every update for logging
/// and cooldown checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SimClock {
    /// Ticks completed before this one.
    pub tick: u64,
    /// Simulated milliseconds elapsed before this tick.
    pub time_ms: u64,
}

/// Battle life cycle. Terminal states are never left except by reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleState {
    /// Troops may still be created.
    #[default]
    NotStarted,
    /// Ticking.
    InProgress,
    /// Every non-wall building destroyed.
    Victory,
    /// Every troop dead.
    Defeat,
    /// Duration cap reached.
    Timeout,
}

impl BattleState {
    /// Whether the battle is over.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Victory | Self::Defeat | Self::Timeout)
    }

    /// Lower-case label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::InProgress => "in_progress",
            Self::Victory => "victory",
            Self::Defeat => "defeat",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for BattleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events generated during a simulation tick.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Clock of the processed tick.
    pub clock: SimClock,
    /// Combat events in processing order.
    pub combat: Vec<CombatEvent>,
    /// State after the tick.
    pub state: BattleState,
}

impl TickEvents {
    /// Buildings destroyed this tick.
    pub fn buildings_destroyed(&self) -> impl Iterator<Item = BuildingId> + '_ {
        self.combat.iter().filter_map(|event| match event {
            CombatEvent::BuildingDestroyed { building, .. } => Some(*building),
            _ => None,
        })
    }

    /// Troops that died this tick.
    pub fn troops_killed(&self) -> impl Iterator<Item = TroopId> + '_ {
        self.combat.iter().filter_map(|event| match event {
            CombatEvent::TroopKilled { troop } => Some(*troop),
            _ => None,
        })
    }
}

// ============================================================================
// Snapshots and statistics
// ============================================================================

/// Recorded state of one troop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TroopSnapshot {
    /// Kind.
    pub kind: TroopKind,
    /// Position.
    pub position: Vec2Fixed,
    /// Hit points.
    pub hp: u32,
    /// Life-cycle state.
    pub state: TroopState,
}

/// Recorded state of one building or wall.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    /// Kind.
    pub kind: BuildingKind,
    /// Origin tile.
    pub origin: (i32, i32),
    /// Hit points.
    pub hp: u32,
    /// Destroyed flag.
    pub destroyed: bool,
}

/// Immutable picture of the battle, recorded periodically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    /// When it was taken.
    pub clock: SimClock,
    /// Living troops, in id order.
    pub troops: Vec<TroopSnapshot>,
    /// Structures then walls.
    pub buildings: Vec<BuildingSnapshot>,
    /// Destruction at that moment.
    pub destruction_percentage: f64,
}

/// Summary of a battle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleStatistics {
    /// Simulated duration.
    pub duration_ms: u64,
    /// Battle state.
    pub state: BattleState,
    /// Share of non-wall buildings destroyed, 0–100.
    pub destruction_percentage: f64,
    /// Stars earned.
    pub stars: u8,
    /// Troops deployed.
    pub troops_deployed: usize,
    /// Troops dead.
    pub troops_lost: usize,
    /// Non-wall buildings destroyed.
    pub buildings_destroyed: usize,
    /// Wall segments destroyed.
    pub walls_destroyed: usize,
    /// Defenses destroyed.
    pub defenses_destroyed: usize,
    /// Ticks processed.
    pub tick_count: u64,
}

// ============================================================================
// Simulator
// ============================================================================

/// The battle engine.
///
/// # System Execution Order
///
/// Each tick runs, in this order:
/// 1. **Troops** - targeting, then attack or move
/// 2. **Defenses** - targeting, then fire
/// 3. **Projectiles** - flight and splash
/// 4. **End check** - victory, defeat, timeout
/// 5. **Snapshot** - every `snapshot_interval_ticks`
/// 6. **Clock** - advance time and tick counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleSimulator {
    config: BattleConfig,
    layout: BaseLayout,
    troops: Vec<Troop>,
    projectiles: Vec<Projectile>,
    state: BattleState,
    tick: u64,
    time_ms: u64,
    history: Vec<BattleSnapshot>,
}

impl BattleSimulator {
    /// Create a simulator for `layout`.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::InvalidState`] if the configuration is invalid
    /// or its grid size differs from the layout's.
    pub fn new(layout: BaseLayout, config: BattleConfig) -> Result<Self> {
        config.validate()?;
        if layout.grid_size() != config.grid_size {
            return Err(SiegeError::InvalidState(format!(
                "layout grid {} does not match configured grid {}",
                layout.grid_size(),
                config.grid_size
            )));
        }
        Ok(Self {
            config,
            layout,
            troops: Vec::new(),
            projectiles: Vec::new(),
            state: BattleState::NotStarted,
            tick: 0,
            time_ms: 0,
            history: Vec::new(),
        })
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> BattleState {
        self.state
    }

    /// Ticks processed so far.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Simulated time elapsed.
    #[must_use]
    pub const fn time_ms(&self) -> u64 {
        self.time_ms
    }

    /// Clock of the next tick.
    #[must_use]
    pub const fn clock(&self) -> SimClock {
        SimClock {
            tick: self.tick,
            time_ms: self.time_ms,
        }
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &BattleConfig {
        &self.config
    }

    /// The defended base.
    #[must_use]
    pub const fn layout(&self) -> &BaseLayout {
        &self.layout
    }

    /// Deployed troops, indexed by [`TroopId`].
    #[must_use]
    pub fn troops(&self) -> &[Troop] {
        &self.troops
    }

    /// Look up a troop.
    #[must_use]
    pub fn troop(&self, id: TroopId) -> Option<&Troop> {
        self.troops.get(id.0)
    }

    /// Shells in flight.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Recorded snapshots, oldest first.
    #[must_use]
    pub fn history(&self) -> &[BattleSnapshot] {
        &self.history
    }

    /// Whether the battle reached a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Simulated time left before the duration cap.
    #[must_use]
    pub const fn remaining_time_ms(&self) -> u64 {
        self.config.max_duration_ms.saturating_sub(self.time_ms)
    }

    // ------------------------------------------------------------------------
    // Deployment
    // ------------------------------------------------------------------------

    /// Deploy a troop before the battle starts.
    ///
    /// # Errors
    ///
    /// Returns [`SiegeError::InvalidState`] once the battle has started,
    /// [`SiegeError::OutOfBounds`] for positions off the grid, or a data
    /// error for unknown levels.
    pub fn create_troop(&mut self, kind: TroopKind, level: u8, position: Vec2Fixed) -> Result<TroopId> {
        if self.state != BattleState::NotStarted {
            return Err(SiegeError::InvalidState(format!(
                "cannot deploy troops in state {}",
                self.state
            )));
        }
        let limit = Fixed::from_num(self.config.grid_size);
        let inside = |v: Fixed| v >= Fixed::ZERO && v < limit;
        if !inside(position.x) || !inside(position.y) {
            let (x, y) = position.to_f64();
            return Err(SiegeError::OutOfBounds {
                x,
                y,
                grid_size: self.config.grid_size,
            });
        }

        let troop = Troop::new(kind, level, position, self.layout.data())?;
        self.troops.push(troop);
        Ok(TroopId(self.troops.len() - 1))
    }

    /// Deploy every valid entry of an army. Invalid entries are skipped
    /// with a warning.
    pub fn deploy_army(&mut self, army: &[ArmyEntry]) -> Vec<TroopId> {
        let mut deployed = Vec::with_capacity(army.len());
        for entry in army {
            let result = entry
                .kind()
                .and_then(|kind| self.create_troop(kind, entry.level(), entry.position()));
            match result {
                Ok(id) => deployed.push(id),
                Err(error) => {
                    let (x, y) = entry.2;
                    warn!(kind = entry.kind_name(), level = entry.level(), x, y, %error, "Skipping army entry");
                }
            }
        }
        deployed
    }

    // ------------------------------------------------------------------------
    // Life cycle
    // ------------------------------------------------------------------------

    /// Begin the battle. Only valid before the first start; later calls
    /// are ignored with a warning.
    pub fn start(&mut self) {
        if self.state != BattleState::NotStarted {
            warn!(state = %self.state, "Battle already started");
            return;
        }
        self.state = BattleState::InProgress;
        info!(
            tick = self.tick,
            sim_time_ms = self.time_ms,
            base = self.layout.name(),
            troops = self.troops.len(),
            buildings = self.layout.structures().len(),
            walls = self.layout.walls().len(),
            "Battle started"
        );
    }

    /// Advance the battle by one tick.
    ///
    /// Outside [`BattleState::InProgress`] this is a no-op that logs a
    /// warning and returns empty events.
    pub fn tick(&mut self) -> TickEvents {
        let clock = self.clock();
        let mut events = TickEvents {
            clock,
            combat: Vec::new(),
            state: self.state,
        };
        if self.state != BattleState::InProgress {
            warn!(tick = clock.tick, sim_time_ms = clock.time_ms, state = %self.state, "Tick outside a running battle");
            return events;
        }
        let dt_ms = self.config.tick_duration_ms();

        // 1. Troops
        for (index, troop) in self.troops.iter_mut().enumerate() {
            update_troop(TroopId(index), troop, &mut self.layout, &self.config, clock, &mut events.combat);
        }

        // 2. Defenses
        for index in 0..self.layout.structures().len() {
            update_defense(
                index,
                &mut self.layout,
                &mut self.troops,
                &mut self.projectiles,
                &self.config,
                clock,
                &mut events.combat,
            );
        }

        // 3. Projectiles
        advance_projectiles(&mut self.projectiles, &mut self.troops, dt_ms, clock, &mut events.combat);

        // 4. End conditions
        let next = self.check_end_conditions();
        if next != self.state {
            self.state = next;
            info!(
                tick = clock.tick,
                sim_time_ms = clock.time_ms,
                state = %next,
                destruction = self.layout.destruction_percentage(),
                stars = self.layout.stars(),
                "Battle ended"
            );
        }
        events.state = self.state;

        // 5. Snapshot
        if self.tick % self.config.snapshot_interval_ticks.max(1) == 0 {
            let snapshot = self.snapshot();
            self.history.push(snapshot);
        }

        // 6. Clock
        self.time_ms += dt_ms;
        self.tick += 1;
        events
    }

    /// State the battle should be in, given the entities as they stand.
    ///
    /// Victory takes priority over defeat, which takes priority over
    /// timeout. Pure: calling it repeatedly yields the same answer.
    #[must_use]
    pub fn check_end_conditions(&self) -> BattleState {
        if self.state != BattleState::InProgress {
            return self.state;
        }
        if self.layout.all_structures_destroyed() {
            BattleState::Victory
        } else if !self.troops.iter().any(Troop::is_alive) {
            BattleState::Defeat
        } else if self.time_ms >= self.config.max_duration_ms {
            BattleState::Timeout
        } else {
            BattleState::InProgress
        }
    }

    /// Start if needed and tick until the battle ends.
    pub fn run_to_end(&mut self) -> BattleStatistics {
        if self.state == BattleState::NotStarted {
            self.start();
        }
        while self.state == BattleState::InProgress {
            self.tick();
        }
        self.statistics()
    }

    /// Return every entity to its initial state and the battle to
    /// [`BattleState::NotStarted`]. Troops stay deployed.
    pub fn reset(&mut self) {
        self.layout.reset();
        self.troops.iter_mut().for_each(Troop::reset);
        self.projectiles.clear();
        self.history.clear();
        self.state = BattleState::NotStarted;
        self.tick = 0;
        self.time_ms = 0;
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    /// Picture of the current state.
    #[must_use]
    pub fn snapshot(&self) -> BattleSnapshot {
        BattleSnapshot {
            clock: self.clock(),
            troops: self
                .troops
                .iter()
                .filter(|t| t.is_alive())
                .map(|t| TroopSnapshot {
                    kind: t.kind,
                    position: t.position,
                    hp: t.hp,
                    state: t.state,
                })
                .collect(),
            buildings: self
                .layout
                .iter()
                .map(|(_, b)| BuildingSnapshot {
                    kind: b.kind,
                    origin: (b.x, b.y),
                    hp: b.hp,
                    destroyed: b.is_destroyed(),
                })
                .collect(),
            destruction_percentage: self.layout.destruction_percentage(),
        }
    }

    /// Battle summary.
    #[must_use]
    pub fn statistics(&self) -> BattleStatistics {
        BattleStatistics {
            duration_ms: self.time_ms,
            state: self.state,
            destruction_percentage: self.layout.destruction_percentage(),
            stars: self.layout.stars(),
            troops_deployed: self.troops.len(),
            troops_lost: self.troops.iter().filter(|t| !t.is_alive()).count(),
            buildings_destroyed: self.layout.destroyed_count(),
            walls_destroyed: self.layout.walls().iter().filter(|w| w.is_destroyed()).count(),
            defenses_destroyed: self
                .layout
                .structures()
                .iter()
                .filter(|b| b.kind.is_defense() && b.is_destroyed())
                .count(),
            tick_count: self.tick,
        }
    }

    /// Calculate a hash of the current battle state.
    ///
    /// Two simulators with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.time_ms.hash(&mut hasher);
        self.state.hash(&mut hasher);

        self.troops.len().hash(&mut hasher);
        for troop in &self.troops {
            troop.kind.hash(&mut hasher);
            troop.position.x.to_bits().hash(&mut hasher);
            troop.position.y.to_bits().hash(&mut hasher);
            troop.hp.hash(&mut hasher);
            troop.state.hash(&mut hasher);
            troop.target.hash(&mut hasher);
            troop.path_cursor.hash(&mut hasher);
        }

        for (id, building) in self.layout.iter() {
            id.hash(&mut hasher);
            building.hp.hash(&mut hasher);
            building.destroyed.hash(&mut hasher);
            if let Some(defense) = &building.defense {
                defense.target.hash(&mut hasher);
                defense.last_attack_ms.hash(&mut hasher);
            }
        }

        self.projectiles.len().hash(&mut hasher);
        for shell in &self.projectiles {
            shell.impact.x.to_bits().hash(&mut hasher);
            shell.impact.y.to_bits().hash(&mut hasher);
            shell.elapsed_ms.hash(&mut hasher);
        }

        hasher.finish()
    }

    /// Serialize the full battle state.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SiegeError::Serialization(format!("Failed to serialize battle: {e}")))
    }

    /// Restore a battle from [`Self::serialize`] output.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| SiegeError::Serialization(format!("Failed to deserialize battle: {e}")))
    }
}

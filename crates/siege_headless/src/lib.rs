//! Headless battle runner for CI and balance checks.
//!
//! Loads bases and armies from JSON files or built-in presets, runs
//! battles instantly or paced in real time, and runs every base against
//! every army in parallel.
//!
//! - **stdout**: battle statistics and batch results (JSON)
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # One battle against the default base, printed as JSON
//! cargo run -p siege_headless -- run --base default --army mixed
//!
//! # Watch it at 4x speed with debug logs
//! cargo run -p siege_headless -- -v run --army small --speed 4
//!
//! # Every preset base against every preset army
//! cargo run -p siege_headless -- batch --output results/batch.json
//!
//! # Check a layout file
//! cargo run -p siege_headless -- validate bases/my_base.json
//! ```

pub mod batch;
pub mod error;
pub mod files;
pub mod presets;
pub mod runner;

pub use batch::{matchups, run_batch, BatchJob, BatchResults, BatchSummary};
pub use error::{Result, RunnerError};
pub use files::{resolve_army, resolve_base};
pub use runner::{run_battle, BattleReport, BattleRunner, Pacing};

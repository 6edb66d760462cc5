//! Headless battle runner.
//!
//! # Usage
//!
//! ```bash
//! # Run a preset battle instantly
//! cargo run -p siege_headless -- run --base default --army mixed
//!
//! # Run from files at double speed, saving the statistics
//! cargo run -p siege_headless -- run --base my_base.json --army raid.json --speed 2 --output stats.json
//!
//! # Every base against every army
//! cargo run -p siege_headless -- batch --bases default,minimal --armies mixed,small
//!
//! # Validate layout files
//! cargo run -p siege_headless -- validate bases/*.json
//!
//! # Write a preset out as an editable file
//! cargo run -p siege_headless -- export-base --preset default --output default.json
//! ```

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use siege_core::config::BattleConfig;
use siege_core::data::GameData;
use siege_headless::{
    batch::{matchups, run_batch},
    files::{load_config, load_game_data, load_layout, resolve_army, resolve_base, save_army, save_layout_data},
    presets::{army_preset, base_preset, ARMY_PRESETS, BASE_PRESETS},
    runner::{BattleRunner, Pacing},
    Result,
};

#[derive(Parser)]
#[command(name = "siege_headless")]
#[command(about = "Headless base-assault battle runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Battle config (RON); defaults apply to missing fields
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Stat tables (RON); defaults to the built-in Town Hall 3 tables
    #[arg(long, global = true)]
    data: Option<PathBuf>,

    /// Override the battle duration cap, in seconds
    #[arg(long, global = true)]
    duration_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single battle
    Run {
        /// Base preset name or layout file
        #[arg(short, long, default_value = "default")]
        base: String,

        /// Army preset name or army file
        #[arg(short, long, default_value = "mixed")]
        army: String,

        /// Play back in real time at this multiplier instead of instantly
        #[arg(long)]
        speed: Option<f64>,

        /// Also write the statistics to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the snapshot history to this file
        #[arg(long)]
        snapshots: Option<PathBuf>,
    },

    /// Run every base against every army
    Batch {
        /// Base presets or layout files (default: all presets)
        #[arg(long, value_delimiter = ',')]
        bases: Vec<String>,

        /// Army presets or army files (default: all presets)
        #[arg(long, value_delimiter = ',')]
        armies: Vec<String>,

        /// Maximum parallel battles (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Output file for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check layout files against the placement rules
    Validate {
        /// Layout files
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Write a base preset as a layout file
    ExportBase {
        /// Preset name
        #[arg(short, long, default_value = "default")]
        preset: String,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write an army preset as an army file
    ExportArmy {
        /// Preset name
        #[arg(short, long, default_value = "mixed")]
        preset: String,

        /// Output path
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries JSON.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = load_inputs(&cli).and_then(|(config, data)| match cli.command {
        Commands::Run {
            base,
            army,
            speed,
            output,
            snapshots,
        } => cmd_run(&base, &army, speed, output, snapshots, config, data),
        Commands::Batch {
            bases,
            armies,
            parallel,
            output,
        } => cmd_batch(bases, armies, parallel, output, &config, &data),
        Commands::Validate { files } => cmd_validate(&files, &config, &data),
        Commands::ExportBase { preset, output } => save_layout_data(&output, &base_preset(&preset)?),
        Commands::ExportArmy { preset, output } => save_army(&output, &army_preset(&preset)?),
    });

    if let Err(e) = result {
        tracing::error!(error = %e, "Command failed");
        eprintln!("FATAL: {e}");
        std::process::exit(1);
    }
}

/// Battle config and stat tables from the global flags.
fn load_inputs(cli: &Cli) -> Result<(BattleConfig, GameData)> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BattleConfig::default(),
    };
    if let Some(secs) = cli.duration_secs {
        config.max_duration_ms = secs.saturating_mul(1_000);
    }
    let data = match &cli.data {
        Some(path) => load_game_data(path)?,
        None => GameData::default(),
    };
    Ok((config, data))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Run a single battle
fn cmd_run(
    base: &str,
    army: &str,
    speed: Option<f64>,
    output: Option<PathBuf>,
    snapshots: Option<PathBuf>,
    config: BattleConfig,
    data: GameData,
) -> Result<()> {
    let pacing = match speed {
        Some(speed) => Pacing::paced(speed)?,
        None => Pacing::Instant,
    };
    let layout = resolve_base(base, data, config.grid_size)?;
    let troops = resolve_army(army)?;

    let watch = matches!(pacing, Pacing::Paced { .. });
    let mut runner = BattleRunner::new(layout, army, &troops, config)?.with_pacing(pacing);
    let report = runner.run_with(|events| {
        if !watch {
            return;
        }
        let secs = events.clock.time_ms as f64 / 1_000.0;
        for building in events.buildings_destroyed() {
            eprintln!("[{secs:6.1}s] destroyed {building:?}");
        }
        for troop in events.troops_killed() {
            eprintln!("[{secs:6.1}s] troop {} down", troop.0);
        }
    });

    print_json(&report)?;
    if let Some(path) = output {
        write_json(&path, &report)?;
        tracing::info!(path = %path.display(), "Statistics saved");
    }
    if let Some(path) = snapshots {
        write_json(&path, &runner.history())?;
        tracing::info!(path = %path.display(), snapshots = runner.history().len(), "Snapshots saved");
    }
    Ok(())
}

/// Run every base against every army
fn cmd_batch(
    bases: Vec<String>,
    armies: Vec<String>,
    parallel: usize,
    output: Option<PathBuf>,
    config: &BattleConfig,
    data: &GameData,
) -> Result<()> {
    let layouts = or_presets(bases, BASE_PRESETS)
        .iter()
        .map(|source| resolve_base(source, data.clone(), config.grid_size))
        .collect::<Result<Vec<_>>>()?;
    let armies = or_presets(armies, ARMY_PRESETS)
        .into_iter()
        .map(|source| resolve_army(&source).map(|army| (source, army)))
        .collect::<Result<Vec<_>>>()?;

    let results = run_batch(matchups(&layouts, &armies), config, parallel);

    print_json(&results)?;
    if let Some(path) = output {
        results.save(&path)?;
        tracing::info!(path = %path.display(), "Batch results saved");
    }
    Ok(())
}

fn or_presets(names: Vec<String>, presets: &[&str]) -> Vec<String> {
    if names.is_empty() {
        presets.iter().map(|name| (*name).to_string()).collect()
    } else {
        names
    }
}

/// Validate layout files
fn cmd_validate(files: &[PathBuf], config: &BattleConfig, data: &GameData) -> Result<()> {
    let mut failures = 0usize;
    for path in files {
        let (base, rejected) = load_layout(path, data.clone(), config.grid_size)?;
        if rejected.is_empty() {
            eprintln!(
                "OK    {} ({} buildings, {} walls)",
                path.display(),
                base.structures().len(),
                base.walls().len()
            );
            continue;
        }
        failures += 1;
        eprintln!("FAIL  {}", path.display());
        for entry in &rejected {
            eprintln!(
                "      {} L{} at ({}, {}): {}",
                entry.kind, entry.level, entry.position.0, entry.position.1, entry.error
            );
        }
    }
    if failures > 0 {
        eprintln!("{failures} of {} layout(s) have invalid entries", files.len());
        std::process::exit(2);
    }
    Ok(())
}

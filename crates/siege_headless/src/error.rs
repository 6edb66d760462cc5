//! Error type for the headless runner.

use siege_core::SiegeError;
use thiserror::Error;

/// Errors raised while loading inputs or running battles.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Input file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Malformed layout, army or report JSON.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// Malformed RON config or data file.
    #[error("Invalid RON: {0}")]
    Ron(#[from] ron::error::SpannedError),
    /// Engine rejected the input.
    #[error(transparent)]
    Core(#[from] SiegeError),
    /// No preset of that name.
    #[error("Unknown {kind} preset '{name}' (available: {available})")]
    UnknownPreset {
        /// "base" or "army".
        kind: &'static str,
        /// Name asked for.
        name: String,
        /// Comma-separated preset names.
        available: String,
    },
    /// Pacing multiplier must be positive and finite.
    #[error("Invalid speed multiplier {0}")]
    InvalidSpeed(f64),
}

/// Result alias for the runner.
pub type Result<T> = std::result::Result<T, RunnerError>;

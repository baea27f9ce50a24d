//! CLI commands for the prediction engine.

pub mod calibrate;
pub mod lines;
pub mod predict;
pub mod simulate;
pub mod size_bet;
pub mod watch;

pub use calibrate::CalibrateArgs;
pub use lines::LinesArgs;
pub use predict::PredictArgs;
pub use simulate::SimulateArgs;
pub use size_bet::SizeBetArgs;
pub use watch::WatchArgs;

use std::path::Path;

use anyhow::{Context, Result};
use progno_core::{AppConfig, CalibrationParameterSet, ConfigLoader, GameContext, ParameterFile};
use serde::Serialize;

/// Loads layered configuration, with an optional profile on top.
pub fn load_config(dir: &Path, profile: Option<&str>) -> Result<AppConfig> {
    let loader = ConfigLoader::new(dir);
    match profile {
        Some(p) => loader.load_with_profile(p),
        None => loader.load(),
    }
}

/// Reads a game context from a JSON file.
pub fn load_game(path: &Path) -> Result<GameContext> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read game file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse game file {}", path.display()))
}

/// Loads the active parameter set, falling back to defaults when the file
/// does not exist yet.
pub fn load_parameters(config: &AppConfig) -> Result<CalibrationParameterSet> {
    let path = Path::new(&config.parameters_path);
    if !path.exists() {
        tracing::warn!(
            path = %path.display(),
            "No calibrated parameters found, using defaults"
        );
        return Ok(CalibrationParameterSet::default());
    }
    ParameterFile::read(path)
        .with_context(|| format!("Failed to load parameters from {}", path.display()))
}

/// Prints a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

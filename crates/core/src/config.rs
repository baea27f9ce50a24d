use serde::{Deserialize, Serialize};

/// Hard ceiling on simulation iterations per request.
pub const MAX_SIMULATION_ITERATIONS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub calibration: CalibrationConfig,
    #[serde(default = "default_parameters_path")]
    pub parameters_path: String,
}

fn default_parameters_path() -> String {
    "config/parameters.json".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            sizing: SizingConfig::default(),
            calibration: CalibrationConfig::default(),
            parameters_path: default_parameters_path(),
        }
    }
}

/// Simulation Runner settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub simulation_iterations: usize,
    pub variance_factor: f64,
    /// Worker threads for the simulation pool; 0 uses rayon's default.
    pub worker_threads: usize,
    pub time_budget_ms: Option<u64>,
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            simulation_iterations: 500,
            variance_factor: 1.5,
            worker_threads: 0,
            time_budget_ms: None,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Iterations clamped to [1, 1000].
    #[must_use]
    pub fn iterations(&self) -> usize {
        self.simulation_iterations.clamp(1, MAX_SIMULATION_ITERATIONS)
    }
}

/// Bankroll Sizer settings. Multipliers are fractions of full Kelly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingConfig {
    pub max_bankroll_fraction: f64,
    pub min_unit: f64,
    pub conservative_multiplier: f64,
    pub balanced_multiplier: f64,
    pub aggressive_multiplier: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            max_bankroll_fraction: 0.10,
            min_unit: 1.0,
            conservative_multiplier: 0.25,
            balanced_multiplier: 0.5,
            aggressive_multiplier: 1.0,
        }
    }
}

/// Offline Calibration Search settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
    pub starting_bankroll: f64,
    pub min_bets: usize,
    /// Combinations evaluated between checkpoints.
    pub checkpoint_every: usize,
    pub checkpoint_path: Option<String>,
    /// Ranked sets kept per leaderboard.
    pub top_n: usize,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            starting_bankroll: 1000.0,
            min_bets: 10,
            checkpoint_every: 5000,
            checkpoint_path: None,
            top_n: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.engine.simulation_iterations, 500);
        assert!((config.sizing.max_bankroll_fraction - 0.10).abs() < f64::EPSILON);
        assert_eq!(config.calibration.min_bets, 10);
    }

    #[test]
    fn iterations_are_capped() {
        let engine = EngineConfig {
            simulation_iterations: 50_000,
            ..EngineConfig::default()
        };
        assert_eq!(engine.iterations(), MAX_SIMULATION_ITERATIONS);

        let zero = EngineConfig {
            simulation_iterations: 0,
            ..EngineConfig::default()
        };
        assert_eq!(zero.iterations(), 1);
    }

    #[test]
    fn partial_section_fills_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"engine": {"variance_factor": 2.0}}"#).unwrap();
        assert!((config.engine.variance_factor - 2.0).abs() < f64::EPSILON);
        assert_eq!(config.engine.simulation_iterations, 500);
        assert_eq!(config.parameters_path, "config/parameters.json");
    }
}

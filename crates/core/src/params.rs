//! Calibration parameter set, weight multipliers and their persistence.
//!
//! A [`CalibrationParameterSet`] is immutable once built. Retuning produces a
//! new set with a new id and generation time; nothing edits one in place.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::model::ModelWeights;

/// Upper bound a learned weight multiplier can reach before renormalization.
pub const WEIGHT_CAP: f64 = 2.0;
/// Lower bound a learned weight multiplier can reach before renormalization.
pub const WEIGHT_FLOOR: f64 = 0.5;

/// Per-factor weight multipliers. Factors not present default to 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightSet(BTreeMap<String, f64>);

impl WeightSet {
    /// Creates an empty set (every factor at 1.0).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with one multiplier set.
    #[must_use]
    pub fn with(mut self, factor: impl Into<String>, multiplier: f64) -> Self {
        self.0.insert(factor.into(), multiplier);
        self
    }

    /// Multiplier for a factor; 1.0 when absent or not a finite non-negative value.
    #[must_use]
    pub fn get(&self, factor: &str) -> f64 {
        match self.0.get(factor) {
            Some(w) if w.is_finite() && *w >= 0.0 => *w,
            _ => 1.0,
        }
    }

    /// Iterates over explicit multipliers.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of explicit multipliers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when every factor is at the 1.0 default.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Derives the next weight set from realized per-factor results.
    ///
    /// Win rate above 55% scales a factor by 1.1 (cap 2.0); below 48% by 0.9
    /// (floor 0.5). Factors with no resolved picks keep their weight. The
    /// result is renormalized so the mean multiplier over `factors`, the
    /// explicit entries and the scored factors is 1.0. Every one of those is
    /// written out explicitly, so pass the full model list: a factor left
    /// out stays at the implicit 1.0 and is not rescaled with the rest.
    #[must_use]
    pub fn update(&self, performance: &FactorPerformance, factors: &[&str]) -> Self {
        let mut next: BTreeMap<String, f64> = factors
            .iter()
            .map(|f| (*f).to_string())
            .chain(self.0.keys().cloned())
            .chain(performance.0.keys().cloned())
            .map(|f| {
                let w = self.get(&f);
                (f, w)
            })
            .collect();

        for (factor, record) in &performance.0 {
            let current = self.get(factor);
            let updated = match record.win_rate() {
                Some(rate) if rate > 0.55 => (current * 1.1).min(WEIGHT_CAP),
                Some(rate) if rate < 0.48 => (current * 0.9).max(WEIGHT_FLOOR),
                _ => current,
            };
            next.insert(factor.clone(), updated);
        }

        let n = next.len();
        if n > 0 {
            let mean = next.values().sum::<f64>() / n as f64;
            if mean > 0.0 {
                for w in next.values_mut() {
                    *w /= mean;
                }
            }
        }
        Self(next)
    }
}

impl FromIterator<(String, f64)> for WeightSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Resolved picks for one factor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorRecord {
    pub wins: u32,
    pub losses: u32,
}

impl FactorRecord {
    /// Win rate, or `None` with no resolved picks.
    #[must_use]
    pub fn win_rate(&self) -> Option<f64> {
        let total = self.wins + self.losses;
        (total > 0).then(|| f64::from(self.wins) / f64::from(total))
    }
}

/// Realized win/loss counts per factor over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorPerformance(pub BTreeMap<String, FactorRecord>);

impl FactorPerformance {
    /// Creates an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy with one factor's record set.
    #[must_use]
    pub fn with(mut self, factor: impl Into<String>, wins: u32, losses: u32) -> Self {
        self.0.insert(factor.into(), FactorRecord { wins, losses });
        self
    }

    /// Record for a factor.
    #[must_use]
    pub fn get(&self, factor: &str) -> Option<&FactorRecord> {
        self.0.get(factor)
    }
}

/// Tunable constants of the simulation's confidence formula.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationTuning {
    /// `consensus_calibration = base + slope * majority_share`.
    pub consensus_base: f64,
    pub consensus_slope: f64,
    /// Ceiling on final confidence. Never raised above 0.85.
    pub confidence_ceiling: f64,
}

impl Default for SimulationTuning {
    fn default() -> Self {
        Self {
            consensus_base: 0.6,
            consensus_slope: 0.3,
            confidence_ceiling: 0.85,
        }
    }
}

/// Identity of the historical dataset a set was tuned on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetIdentity {
    pub name: String,
    /// Hex SHA-256 of the canonical game records.
    pub fingerprint: String,
    pub games: usize,
}

/// Backtest outcome tied to one parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Net profit over total staked.
    pub roi: f64,
    pub win_rate: f64,
    pub bets: usize,
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    /// `mean(pnl) / stdev(pnl) * sqrt(bets)`.
    pub sharpe: f64,
    pub final_bankroll: f64,
    /// Largest peak-to-trough bankroll decline as a fraction of the peak.
    pub max_drawdown: f64,
    pub brier: f64,
    /// Expected calibration error over 10 equal-width bins.
    pub ece: f64,
}

/// Production parameters for the Aggregator and Sizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParameterSet {
    pub id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub dataset: Option<DatasetIdentity>,
    #[serde(default)]
    pub weights: WeightSet,
    /// Minimum edge over the de-vigged line, as a probability (0.03 = 3 pts).
    pub min_edge: f64,
    /// Minimum model probability of the side bet.
    pub min_confidence: f64,
    pub odds_min: f64,
    pub odds_max: f64,
    /// Fraction of full Kelly.
    pub kelly_fraction: f64,
    #[serde(default)]
    pub model: ModelWeights,
    #[serde(default)]
    pub simulation: SimulationTuning,
    #[serde(default)]
    pub backtest: Option<BacktestResult>,
}

impl Default for CalibrationParameterSet {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            dataset: None,
            weights: WeightSet::new(),
            min_edge: 0.02,
            min_confidence: 0.5,
            odds_min: -300.0,
            odds_max: 300.0,
            kelly_fraction: 0.5,
            model: ModelWeights::default(),
            simulation: SimulationTuning::default(),
            backtest: None,
        }
    }
}

impl CalibrationParameterSet {
    /// Returns a new generation with different weights.
    #[must_use]
    pub fn with_weights(&self, weights: WeightSet) -> Self {
        Self {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            weights,
            ..self.clone()
        }
    }

    /// True when American odds fall within `[odds_min, odds_max]`.
    #[must_use]
    pub fn odds_in_range(&self, american: f64) -> bool {
        american >= self.odds_min && american <= self.odds_max
    }
}

/// Storage collaborator for the active parameter set.
pub trait ParameterRepository: Send + Sync {
    /// Persists a set, replacing the previous one.
    ///
    /// # Errors
    /// Returns a [`PersistenceError`] if the set cannot be written.
    fn save(&self, params: &CalibrationParameterSet) -> Result<(), PersistenceError>;

    /// Loads the stored set.
    ///
    /// # Errors
    /// Returns a [`PersistenceError`] if the set cannot be read or parsed.
    fn load(&self) -> Result<CalibrationParameterSet, PersistenceError>;
}

/// JSON file holding one parameter set. Writes go to a temp file that is
/// renamed over the target, so readers never see a half-written file.
#[derive(Debug, Clone)]
pub struct ParameterFile {
    path: PathBuf,
}

impl ParameterFile {
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads a set from any path.
    ///
    /// # Errors
    /// Returns a [`PersistenceError`] on IO or parse failure.
    pub fn read(path: &Path) -> Result<CalibrationParameterSet, PersistenceError> {
        let content = std::fs::read_to_string(path)?;
        let params: CalibrationParameterSet = serde_json::from_str(&content)?;
        if params.odds_min > params.odds_max {
            return Err(PersistenceError::Incompatible(format!(
                "odds_min {} exceeds odds_max {}",
                params.odds_min, params.odds_max
            )));
        }
        Ok(params)
    }
}

impl ParameterRepository for ParameterFile {
    fn save(&self, params: &CalibrationParameterSet) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(params)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::info!(
            path = %self.path.display(),
            id = %params.id,
            "Saved calibration parameters"
        );
        Ok(())
    }

    fn load(&self) -> Result<CalibrationParameterSet, PersistenceError> {
        Self::read(&self.path)
    }
}

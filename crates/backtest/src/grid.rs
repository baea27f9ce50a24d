//! Hyperparameter grid for the Calibration Search.
//!
//! Combinations are addressed by a flat index decoded in mixed radix, so the
//! search can split, checkpoint and resume the space without materializing
//! it.

use progno_core::{CalibrationDataError, ModelWeights};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One point in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub model: ModelWeights,
    /// Minimum edge over the de-vigged line, as a probability.
    pub min_edge: f64,
    /// Minimum model probability of the side bet.
    pub min_confidence: f64,
    pub odds_min: f64,
    pub odds_max: f64,
    pub kelly_fraction: f64,
}

/// Values to try along each axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    pub home_adv: Vec<f64>,
    pub form: Vec<f64>,
    pub h2h: Vec<f64>,
    pub record: Vec<f64>,
    pub min_edge: Vec<f64>,
    pub min_confidence: Vec<f64>,
    pub odds_min: Vec<f64>,
    pub odds_max: Vec<f64>,
    pub kelly_fraction: Vec<f64>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            home_adv: vec![0.0, 0.5, 1.0],
            form: vec![0.0, 0.2, 0.4, 0.6],
            h2h: vec![0.0, 0.1, 0.2],
            record: vec![0.0, 0.1, 0.2, 0.3],
            min_edge: vec![0.02, 0.03, 0.05, 0.08],
            min_confidence: vec![0.45, 0.5, 0.55, 0.6],
            odds_min: vec![-400.0, -250.0, -150.0],
            odds_max: vec![150.0, 250.0, 400.0],
            kelly_fraction: vec![0.25, 0.5, 1.0],
        }
    }
}

impl ParameterGrid {
    /// Grid holding a single point.
    #[must_use]
    pub fn single(point: &GridPoint) -> Self {
        Self {
            home_adv: vec![point.model.home_adv],
            form: vec![point.model.form],
            h2h: vec![point.model.h2h],
            record: vec![point.model.record],
            min_edge: vec![point.min_edge],
            min_confidence: vec![point.min_confidence],
            odds_min: vec![point.odds_min],
            odds_max: vec![point.odds_max],
            kelly_fraction: vec![point.kelly_fraction],
        }
    }

    fn axes(&self) -> [(&'static str, &[f64]); 9] {
        [
            ("home_adv", self.home_adv.as_slice()),
            ("form", self.form.as_slice()),
            ("h2h", self.h2h.as_slice()),
            ("record", self.record.as_slice()),
            ("min_edge", self.min_edge.as_slice()),
            ("min_confidence", self.min_confidence.as_slice()),
            ("odds_min", self.odds_min.as_slice()),
            ("odds_max", self.odds_max.as_slice()),
            ("kelly_fraction", self.kelly_fraction.as_slice()),
        ]
    }

    /// Checks that every axis has at least one finite value.
    ///
    /// # Errors
    /// Returns [`CalibrationDataError::EmptyGridAxis`] for an empty axis and
    /// [`CalibrationDataError::InvalidCombination`] for a non-finite value.
    pub fn validate(&self) -> Result<(), CalibrationDataError> {
        for (name, values) in self.axes() {
            if values.is_empty() {
                return Err(CalibrationDataError::EmptyGridAxis(name));
            }
            if values.iter().any(|v| !v.is_finite()) {
                return Err(CalibrationDataError::InvalidCombination(format!(
                    "axis '{name}' has a non-finite value"
                )));
            }
        }
        Ok(())
    }

    /// Number of combinations; 0 if any axis is empty.
    #[must_use]
    pub fn len(&self) -> usize {
        self.axes()
            .iter()
            .map(|(_, v)| v.len())
            .fold(1usize, usize::saturating_mul)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decodes a flat index. The last axis varies fastest.
    #[must_use]
    pub fn combination(&self, index: usize) -> Option<GridPoint> {
        if index >= self.len() {
            return None;
        }
        let axes = self.axes();
        let mut picks = [0.0; 9];
        let mut rest = index;
        for (slot, (_, values)) in picks.iter_mut().zip(axes.iter()).rev() {
            *slot = values[rest % values.len()];
            rest /= values.len();
        }
        let [home_adv, form, h2h, record, min_edge, min_confidence, odds_min, odds_max, kelly_fraction] =
            picks;
        Some(GridPoint {
            model: ModelWeights {
                home_adv,
                form,
                h2h,
                record,
            },
            min_edge,
            min_confidence,
            odds_min,
            odds_max,
            kelly_fraction,
        })
    }

    /// Hex SHA-256 of the grid definition, used to match checkpoints.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, values) in self.axes() {
            hasher.update(name.as_bytes());
            for v in values {
                hasher.update(v.to_le_bytes());
            }
            hasher.update(b";");
        }
        hex::encode(hasher.finalize())
    }
}

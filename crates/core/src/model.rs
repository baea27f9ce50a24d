//! Linear home-probability model tuned by the Calibration Search.
//!
//! ```text
//! p = baseline
//!   + home_adv * 0.05
//!   + form     * (form_home - form_away)
//!   + h2h      * (h2h_rate_home - 0.5)
//!   + record   * (win_pct_home - win_pct_away)
//! ```
//! clamped to [0.05, 0.95]. `baseline` is the de-vigged home probability.

use serde::{Deserialize, Serialize};

use crate::game::{recency_form_score, GameContext};
use crate::signal::clamp_probability;

/// Home-advantage bump per unit of `home_adv` weight.
pub const HOME_ADVANTAGE: f64 = 0.05;

/// Coefficients of the linear model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelWeights {
    pub home_adv: f64,
    pub form: f64,
    pub h2h: f64,
    pub record: f64,
}

impl Default for ModelWeights {
    fn default() -> Self {
        Self {
            home_adv: 1.0,
            form: 0.4,
            h2h: 0.2,
            record: 0.2,
        }
    }
}

/// Features the model reads, precomputed so the backtester can reuse them
/// across thousands of parameter combinations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelInputs {
    /// De-vigged home probability.
    pub baseline: f64,
    pub form_home: f64,
    pub form_away: f64,
    pub h2h_home_rate: f64,
    pub win_pct_home: f64,
    pub win_pct_away: f64,
}

impl ModelInputs {
    /// Extracts the features from a context given its de-vigged baseline.
    #[must_use]
    pub fn from_context(ctx: &GameContext, baseline: f64) -> Self {
        Self {
            baseline,
            form_home: recency_form_score(&ctx.home_form),
            form_away: recency_form_score(&ctx.away_form),
            h2h_home_rate: ctx.head_to_head.home_win_rate(),
            win_pct_home: ctx.home_stats.win_pct(),
            win_pct_away: ctx.away_stats.win_pct(),
        }
    }
}

/// Evaluates the model.
#[must_use]
pub fn model_home_probability(inputs: &ModelInputs, weights: &ModelWeights) -> f64 {
    let p = inputs.baseline
        + weights.home_adv * HOME_ADVANTAGE
        + weights.form * (inputs.form_home - inputs.form_away)
        + weights.h2h * (inputs.h2h_home_rate - 0.5)
        + weights.record * (inputs.win_pct_home - inputs.win_pct_away);
    clamp_probability(p)
}

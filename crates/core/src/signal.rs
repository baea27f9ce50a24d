//! Signal model contract and the estimate/result types that flow through the
//! ensemble.
//!
//! A signal model is a pure function of a [`GameContext`]. It may decline to
//! emit an estimate; it never fails the prediction.

use serde::{Deserialize, Serialize};

use crate::game::{GameContext, Side};

/// Lower probability clamp applied wherever a probability feeds a decision.
pub const PROB_FLOOR: f64 = 0.05;
/// Upper probability clamp.
pub const PROB_CEIL: f64 = 0.95;

/// Clamps a probability to [`PROB_FLOOR`, `PROB_CEIL`]. NaN maps to 0.5.
#[must_use]
pub fn clamp_probability(p: f64) -> f64 {
    if p.is_nan() {
        0.5
    } else {
        p.clamp(PROB_FLOOR, PROB_CEIL)
    }
}

/// One factor's opinion about a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEstimate {
    /// Name of the producing factor, also the key into a weight set.
    pub factor: String,
    /// Home win probability.
    pub home_win_prob: f64,
    /// Away win probability, always `1 - home_win_prob`.
    pub away_win_prob: f64,
    /// Expected combined score, if the factor has one.
    #[serde(default)]
    pub expected_total: Option<f64>,
    /// Confidence from 0 to 100.
    pub confidence: f64,
    /// Base weight before calibration multipliers.
    pub weight: f64,
}

impl SignalEstimate {
    /// Creates an estimate, clamping the probability and confidence into range.
    #[must_use]
    pub fn new(factor: impl Into<String>, home_win_prob: f64, confidence: f64, weight: f64) -> Self {
        let home = clamp_probability(home_win_prob);
        Self {
            factor: factor.into(),
            home_win_prob: home,
            away_win_prob: 1.0 - home,
            expected_total: None,
            confidence: if confidence.is_nan() {
                0.0
            } else {
                confidence.clamp(0.0, 100.0)
            },
            weight: if weight.is_finite() && weight > 0.0 {
                weight
            } else {
                0.0
            },
        }
    }

    /// Attaches an expected total.
    #[must_use]
    pub fn with_expected_total(mut self, total: f64) -> Self {
        if total.is_finite() && total >= 0.0 {
            self.expected_total = Some(total);
        }
        self
    }

    /// Probability for a side.
    #[must_use]
    pub fn prob(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.home_win_prob,
            Side::Away => self.away_win_prob,
        }
    }
}

/// A single win-probability factor.
///
/// Implementations hold no shared mutable state and must be callable from
/// many threads at once.
pub trait SignalModel: Send + Sync {
    /// Stable factor name used for weight lookup and logging.
    fn name(&self) -> &str;

    /// Produces an estimate, or `None` when the factor has nothing to say
    /// about this game.
    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate>;
}

/// Predicted side of an ensemble result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pick {
    /// Home team favored.
    Home,
    /// Away team favored.
    Away,
    /// No opinion.
    NoPrediction,
}

impl Pick {
    /// Returns the picked side, if any.
    #[must_use]
    pub const fn side(self) -> Option<Side> {
        match self {
            Self::Home => Some(Side::Home),
            Self::Away => Some(Side::Away),
            Self::NoPrediction => None,
        }
    }
}

impl From<Side> for Pick {
    fn from(side: Side) -> Self {
        match side {
            Side::Home => Self::Home,
            Side::Away => Self::Away,
        }
    }
}

/// Agreement between factor models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Consensus {
    /// Disagreement below 0.08.
    Strong,
    /// Between the two thresholds.
    Moderate,
    /// Disagreement above 0.12.
    Weak,
}

/// Why a result carries no opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeutralReason {
    /// No signal model emitted an estimate.
    NoSignals,
    /// The context failed validation.
    InvalidInput,
    /// Every simulation iteration failed.
    AllIterationsFailed,
}

/// Market a recommended bet is placed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetMarket {
    /// Straight winner.
    Moneyline,
    /// Against the spread.
    Spread,
}

/// Bet suggested by an ensemble result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedBet {
    /// Market.
    pub market: BetMarket,
    /// Side to back.
    pub side: Side,
    /// Posted moneyline for the side.
    pub american_odds: f64,
    /// Spread line for the side, for spread bets.
    #[serde(default)]
    pub line: Option<f64>,
}

/// Combined prediction for one game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// Home win probability.
    pub home_win_prob: f64,
    /// Away win probability.
    pub away_win_prob: f64,
    /// Weighted expected total over estimates that carry one.
    #[serde(default)]
    pub expected_total: Option<f64>,
    /// Confidence from 0 to 100.
    pub confidence: f64,
    /// Picked side.
    pub pick: Pick,
    /// `|home_win_prob - 0.5| * 100`.
    pub edge: f64,
    /// Agreement label.
    pub consensus: Consensus,
    /// Population standard deviation of per-model home probabilities.
    pub disagreement: f64,
    /// Estimates that went into the result.
    pub contributions: Vec<SignalEstimate>,
    /// Points of edge over the de-vigged line for the picked side.
    #[serde(default)]
    pub market_edge: Option<f64>,
    /// Suggested bet, when the market edge is large enough.
    #[serde(default)]
    pub recommended_bet: Option<RecommendedBet>,
    /// Set when the result is a neutral placeholder.
    #[serde(default)]
    pub neutral_reason: Option<NeutralReason>,
}

impl EnsembleResult {
    /// The 50/50 "no opinion" result.
    #[must_use]
    pub fn neutral(reason: NeutralReason) -> Self {
        Self {
            home_win_prob: 0.5,
            away_win_prob: 0.5,
            expected_total: None,
            confidence: 50.0,
            pick: Pick::NoPrediction,
            edge: 0.0,
            consensus: Consensus::Weak,
            disagreement: 0.0,
            contributions: Vec::new(),
            market_edge: None,
            recommended_bet: None,
            neutral_reason: Some(reason),
        }
    }

    /// Returns true when the result carries an opinion.
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        self.neutral_reason.is_none()
    }

    /// Probability for the picked side, 0.5 if there is no pick.
    #[must_use]
    pub fn pick_probability(&self) -> f64 {
        match self.pick {
            Pick::Home => self.home_win_prob,
            Pick::Away => self.away_win_prob,
            Pick::NoPrediction => 0.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimate_probabilities_sum_to_one() {
        let e = SignalEstimate::new("form", 0.6137, 70.0, 1.0);
        assert!((e.home_win_prob + e.away_win_prob - 1.0).abs() < 1e-12);
    }

    #[test]
    fn estimate_clamps_extremes() {
        let high = SignalEstimate::new("x", 1.2, 150.0, 1.0);
        assert!((high.home_win_prob - PROB_CEIL).abs() < f64::EPSILON);
        assert!((high.confidence - 100.0).abs() < f64::EPSILON);

        let low = SignalEstimate::new("x", -0.3, -5.0, 1.0);
        assert!((low.home_win_prob - PROB_FLOOR).abs() < f64::EPSILON);
        assert!(low.confidence.abs() < f64::EPSILON);
    }

    #[test]
    fn estimate_nan_probability_is_neutral() {
        let e = SignalEstimate::new("x", f64::NAN, 50.0, 1.0);
        assert!((e.home_win_prob - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn estimate_rejects_non_positive_weight() {
        assert!(SignalEstimate::new("x", 0.5, 50.0, -1.0).weight.abs() < f64::EPSILON);
        assert!(SignalEstimate::new("x", 0.5, 50.0, f64::INFINITY).weight.abs() < f64::EPSILON);
    }

    #[test]
    fn neutral_result_has_no_pick() {
        let r = EnsembleResult::neutral(NeutralReason::NoSignals);
        assert_eq!(r.pick, Pick::NoPrediction);
        assert!((r.confidence - 50.0).abs() < f64::EPSILON);
        assert!(!r.is_actionable());
        assert!((r.pick_probability() - 0.5).abs() < f64::EPSILON);
    }
}

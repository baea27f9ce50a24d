//! Ensemble Aggregator.
//!
//! Combines factor estimates into one prediction. Weights are the product of
//! each estimate's base weight and the calibrated multiplier for its factor,
//! normalized to sum to 1.

use std::sync::Arc;

use progno_core::odds::{devig, DevigMethod};
use progno_core::{
    BetMarket, CalibrationParameterSet, Consensus, EnsembleResult, FactorPerformance,
    GameContext, InputError, NeutralReason, Pick, RecommendedBet, SignalEstimate, WeightSet,
};

use crate::registry::ModelRegistry;

/// Disagreement above which confidence is cut by 20%.
pub const HIGH_DISAGREEMENT: f64 = 0.15;
/// Disagreement below which confidence is raised by 10%.
pub const LOW_DISAGREEMENT: f64 = 0.05;
/// Confidence ceiling after adjustment.
pub const MAX_CONFIDENCE: f64 = 95.0;
/// Disagreement below which consensus is strong.
pub const STRONG_CONSENSUS: f64 = 0.08;
/// Disagreement above which consensus is weak.
pub const WEAK_CONSENSUS: f64 = 0.12;
/// Market edge, in points, needed before a bet is recommended.
pub const MIN_RECOMMEND_EDGE: f64 = 2.0;
/// Confidence above which a spread bet is preferred to the moneyline.
pub const SPREAD_CONFIDENCE: f64 = 65.0;

/// Runs the registered models on a game and combines their output.
///
/// Holds one parameter generation; build a new aggregator (cheap, both
/// fields are `Arc`s) to pick up a newly published set.
#[derive(Debug, Clone)]
pub struct Aggregator {
    registry: Arc<ModelRegistry>,
    params: Arc<CalibrationParameterSet>,
}

impl Aggregator {
    #[must_use]
    pub fn new(registry: Arc<ModelRegistry>, params: Arc<CalibrationParameterSet>) -> Self {
        Self { registry, params }
    }

    /// Aggregator over the standard model set for a parameter generation.
    #[must_use]
    pub fn standard(params: Arc<CalibrationParameterSet>) -> Self {
        let registry = Arc::new(ModelRegistry::standard(&params));
        Self { registry, params }
    }

    #[must_use]
    pub fn params(&self) -> &Arc<CalibrationParameterSet> {
        &self.params
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Next weight set from realized factor performance, renormalized over
    /// every registered model.
    #[must_use]
    pub fn learn(&self, performance: &FactorPerformance) -> WeightSet {
        self.params
            .weights
            .update(performance, &self.registry.names())
    }

    /// Validates the context, then predicts.
    ///
    /// # Errors
    /// Returns [`InputError`] when the context is malformed.
    pub fn try_predict(&self, ctx: &GameContext) -> Result<EnsembleResult, InputError> {
        ctx.validate()?;
        let estimates = self.registry.estimate_all(ctx);
        let mut result = Self::combine(&estimates, &self.params.weights);
        if result.is_actionable() {
            annotate_market(&mut result, ctx);
        }
        tracing::debug!(
            game = %ctx.game_id,
            signals = estimates.len(),
            home = result.home_win_prob,
            confidence = result.confidence,
            "Ensemble prediction"
        );
        Ok(result)
    }

    /// Predicts, returning a neutral result tagged `InvalidInput` when the
    /// context is malformed.
    #[must_use]
    pub fn predict(&self, ctx: &GameContext) -> EnsembleResult {
        match self.try_predict(ctx) {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(game = %ctx.game_id, error = %e, "Rejected game context");
                EnsembleResult::neutral(NeutralReason::InvalidInput)
            }
        }
    }

    /// Combines estimates under a weight set.
    ///
    /// An empty slice yields the neutral 50/50 result. If every effective
    /// weight is zero the estimates are weighted equally.
    #[must_use]
    pub fn combine(estimates: &[SignalEstimate], weights: &WeightSet) -> EnsembleResult {
        if estimates.is_empty() {
            return EnsembleResult::neutral(NeutralReason::NoSignals);
        }

        let raw: Vec<f64> = estimates
            .iter()
            .map(|e| e.weight * weights.get(&e.factor))
            .collect();
        let total: f64 = raw.iter().sum();
        let normalized: Vec<f64> = if total.is_finite() && total > 0.0 {
            raw.iter().map(|w| w / total).collect()
        } else {
            vec![1.0 / estimates.len() as f64; estimates.len()]
        };

        let home: f64 = estimates
            .iter()
            .zip(&normalized)
            .map(|(e, w)| e.home_win_prob * w)
            .sum();

        let (total_sum, total_weight) = estimates
            .iter()
            .zip(&normalized)
            .filter_map(|(e, w)| e.expected_total.map(|t| (t * w, *w)))
            .fold((0.0, 0.0), |(s, ws), (t, w)| (s + t, ws + w));
        let expected_total = (total_weight > 0.0).then(|| total_sum / total_weight);

        let disagreement = std_dev(estimates.iter().map(|e| e.home_win_prob));

        let base_confidence: f64 = estimates
            .iter()
            .zip(&normalized)
            .map(|(e, w)| e.confidence * w)
            .sum();
        let confidence = if disagreement > HIGH_DISAGREEMENT {
            base_confidence * 0.8
        } else if disagreement < LOW_DISAGREEMENT {
            base_confidence * 1.1
        } else {
            base_confidence
        }
        .clamp(0.0, MAX_CONFIDENCE);

        let consensus = if disagreement < STRONG_CONSENSUS {
            Consensus::Strong
        } else if disagreement > WEAK_CONSENSUS {
            Consensus::Weak
        } else {
            Consensus::Moderate
        };

        let pick = if home > 0.5 {
            Pick::Home
        } else if home < 0.5 {
            Pick::Away
        } else {
            Pick::NoPrediction
        };

        EnsembleResult {
            home_win_prob: home,
            away_win_prob: 1.0 - home,
            expected_total,
            confidence,
            pick,
            edge: (home - 0.5).abs() * 100.0,
            consensus,
            disagreement,
            contributions: estimates.to_vec(),
            market_edge: None,
            recommended_bet: None,
            neutral_reason: None,
        }
    }
}

/// Population standard deviation; 0 for fewer than two values.
fn std_dev(values: impl Iterator<Item = f64> + Clone) -> f64 {
    let n = values.clone().count();
    if n < 2 {
        return 0.0;
    }
    let mean = values.clone().sum::<f64>() / n as f64;
    let var = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
    var.sqrt()
}

/// Fills in market edge and a recommended bet from the posted line.
fn annotate_market(result: &mut EnsembleResult, ctx: &GameContext) {
    let Some(side) = result.pick.side() else {
        return;
    };
    let Ok(fair) = devig(ctx.odds.home, ctx.odds.away, DevigMethod::Proportional) else {
        return;
    };
    let edge = (result.pick_probability() - fair.prob(side)) * 100.0;
    result.market_edge = Some(edge);
    if edge < MIN_RECOMMEND_EDGE {
        return;
    }

    let spread_line = ctx.odds.spread.map(|s| match side {
        progno_core::Side::Home => s,
        progno_core::Side::Away => -s,
    });
    let (market, line) = match spread_line {
        Some(line) if result.confidence > SPREAD_CONFIDENCE => (BetMarket::Spread, Some(line)),
        _ => (BetMarket::Moneyline, None),
    };
    result.recommended_bet = Some(RecommendedBet {
        market,
        side,
        american_odds: ctx.odds.for_side(side),
        line,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::{FormResult, OddsSnapshot, Side};

    fn est(factor: &str, p: f64, confidence: f64, weight: f64) -> SignalEstimate {
        SignalEstimate::new(factor, p, confidence, weight)
    }

    // ============================================
    // Combination Tests
    // ============================================

    #[test]
    fn empty_input_is_neutral() {
        let r = Aggregator::combine(&[], &WeightSet::new());
        assert_eq!(r.pick, Pick::NoPrediction);
        assert!((r.home_win_prob - 0.5).abs() < f64::EPSILON);
        assert!((r.confidence - 50.0).abs() < f64::EPSILON);
        assert_eq!(r.neutral_reason, Some(NeutralReason::NoSignals));
    }

    #[test]
    fn single_estimate_is_identity() {
        let e = est("a", 0.6372, 64.0, 0.7);
        let r = Aggregator::combine(std::slice::from_ref(&e), &WeightSet::new());
        assert!((r.home_win_prob - e.home_win_prob).abs() < 1e-15);
        assert!((r.away_win_prob - e.away_win_prob).abs() < 1e-15);
        assert!(r.disagreement.abs() < f64::EPSILON);
    }

    #[test]
    fn duplicate_estimates_match_single_and_are_strong() {
        let e = est("a", 0.58, 60.0, 1.0);
        let single = Aggregator::combine(std::slice::from_ref(&e), &WeightSet::new());
        let double = Aggregator::combine(&[e.clone(), e], &WeightSet::new());
        assert!((single.home_win_prob - double.home_win_prob).abs() < 1e-15);
        assert!(double.disagreement.abs() < f64::EPSILON);
        assert_eq!(double.consensus, Consensus::Strong);
    }

    #[test]
    fn multipliers_shift_the_blend() {
        let estimates = [est("a", 0.7, 60.0, 1.0), est("b", 0.4, 60.0, 1.0)];
        let even = Aggregator::combine(&estimates, &WeightSet::new());
        let tilted = Aggregator::combine(&estimates, &WeightSet::new().with("a", 3.0));
        assert!((even.home_win_prob - 0.55).abs() < 1e-12);
        assert!((tilted.home_win_prob - 0.625).abs() < 1e-12);
    }

    #[test]
    fn zero_multipliers_fall_back_to_equal_weights() {
        let estimates = [est("a", 0.7, 60.0, 1.0), est("b", 0.5, 60.0, 1.0)];
        let weights = WeightSet::new().with("a", 0.0).with("b", 0.0);
        let r = Aggregator::combine(&estimates, &weights);
        assert!((r.home_win_prob - 0.6).abs() < 1e-12);
    }

    #[test]
    fn disagreement_is_unweighted_std_dev() {
        let estimates = [est("a", 0.7, 60.0, 10.0), est("b", 0.5, 60.0, 1.0)];
        let r = Aggregator::combine(&estimates, &WeightSet::new());
        assert!((r.disagreement - 0.1).abs() < 1e-12);
        assert_eq!(r.consensus, Consensus::Moderate);
    }

    #[test]
    fn high_disagreement_cuts_confidence() {
        let estimates = [est("a", 0.9, 80.0, 1.0), est("b", 0.5, 80.0, 1.0)];
        let r = Aggregator::combine(&estimates, &WeightSet::new());
        assert!(r.disagreement > HIGH_DISAGREEMENT);
        assert!((r.confidence - 64.0).abs() < 1e-9);
        assert_eq!(r.consensus, Consensus::Weak);
    }

    #[test]
    fn low_disagreement_boosts_confidence_with_cap() {
        let estimates = [est("a", 0.6, 90.0, 1.0), est("b", 0.61, 90.0, 1.0)];
        let r = Aggregator::combine(&estimates, &WeightSet::new());
        assert!((r.confidence - MAX_CONFIDENCE).abs() < 1e-9);

        let mild = [est("a", 0.6, 50.0, 1.0)];
        let r = Aggregator::combine(&mild, &WeightSet::new());
        assert!((r.confidence - 55.0).abs() < 1e-9);
    }

    #[test]
    fn pick_and_edge() {
        let r = Aggregator::combine(&[est("a", 0.38, 60.0, 1.0)], &WeightSet::new());
        assert_eq!(r.pick, Pick::Away);
        assert!((r.edge - 12.0).abs() < 1e-9);
    }

    #[test]
    fn expected_total_uses_only_estimates_with_totals() {
        let estimates = [
            est("a", 0.6, 60.0, 1.0).with_expected_total(44.0),
            est("b", 0.6, 60.0, 3.0),
            est("c", 0.6, 60.0, 1.0).with_expected_total(48.0),
        ];
        let r = Aggregator::combine(&estimates, &WeightSet::new());
        assert!((r.expected_total.unwrap() - 46.0).abs() < 1e-9);
    }

    // ============================================
    // Prediction Tests
    // ============================================

    fn favored_home() -> GameContext {
        GameContext::new("Chiefs", "Raiders", OddsSnapshot::moneyline(-150.0, 130.0)).with_form(
            FormResult::parse_sequence("WWWWW"),
            FormResult::parse_sequence("LLLLL"),
        )
    }

    #[test]
    fn predict_invalid_context_is_neutral() {
        let agg = Aggregator::standard(Arc::new(CalibrationParameterSet::default()));
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(-150.0, 10.0));
        let r = agg.predict(&ctx);
        assert_eq!(r.neutral_reason, Some(NeutralReason::InvalidInput));
        assert!(agg.try_predict(&ctx).is_err());
    }

    #[test]
    fn predict_recommends_value_side() {
        let agg = Aggregator::standard(Arc::new(CalibrationParameterSet::default()));
        let r = agg.predict(&favored_home());
        assert_eq!(r.pick, Pick::Home);
        assert!(r.market_edge.unwrap() >= MIN_RECOMMEND_EDGE);
        let bet = r.recommended_bet.unwrap();
        assert_eq!(bet.side, Side::Home);
        assert_eq!(bet.market, BetMarket::Moneyline);
        assert!((bet.american_odds + 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn predict_probabilities_sum_to_one() {
        let agg = Aggregator::standard(Arc::new(CalibrationParameterSet::default()));
        let r = agg.predict(&favored_home());
        assert!((r.home_win_prob + r.away_win_prob - 1.0).abs() < 1e-12);
        assert!((0.0..=100.0).contains(&r.confidence));
    }
}

//! The linear model tuned offline by the Calibration Search.

use progno_core::model::{model_home_probability, ModelInputs, ModelWeights};
use progno_core::odds::{devig, DevigMethod};
use progno_core::{GameContext, SignalEstimate, SignalModel};

/// Evaluates the calibrated linear model on a live game, using the same
/// features and coefficients the backtester scored.
#[derive(Debug, Clone)]
pub struct CalibratedModel {
    weights: ModelWeights,
    weight: f64,
}

impl CalibratedModel {
    #[must_use]
    pub const fn new(weights: ModelWeights, weight: f64) -> Self {
        Self { weights, weight }
    }

    #[must_use]
    pub const fn weights(&self) -> &ModelWeights {
        &self.weights
    }
}

impl SignalModel for CalibratedModel {
    fn name(&self) -> &str {
        "calibrated"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        let baseline = devig(ctx.odds.home, ctx.odds.away, DevigMethod::Proportional)
            .ok()?
            .home;
        let inputs = ModelInputs::from_context(ctx, baseline);
        let p = model_home_probability(&inputs, &self.weights);
        // Confidence tracks how far the model departs from the market.
        let confidence = (55.0 + (p - baseline).abs() * 150.0).min(85.0);
        Some(SignalEstimate::new(self.name(), p, confidence, self.weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::{FormResult, OddsSnapshot};

    #[test]
    fn matches_offline_model() {
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(-150.0, 130.0)).with_form(
            FormResult::parse_sequence("WWWLL"),
            FormResult::parse_sequence("LLLWW"),
        );
        let weights = ModelWeights::default();
        let est = CalibratedModel::new(weights, 1.5).estimate(&ctx).unwrap();

        let baseline = devig(-150.0, 130.0, DevigMethod::Proportional).unwrap().home;
        let expected = model_home_probability(&ModelInputs::from_context(&ctx, baseline), &weights);
        assert!((est.home_win_prob - expected).abs() < 1e-12);
        assert!(est.home_win_prob > baseline);
    }

    #[test]
    fn declines_on_bad_odds() {
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(0.0, 130.0));
        assert!(CalibratedModel::new(ModelWeights::default(), 1.0)
            .estimate(&ctx)
            .is_none());
    }
}

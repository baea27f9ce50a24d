//! Market baseline: the de-vigged moneyline.

use progno_core::odds::{devig, DevigMethod};
use progno_core::{GameContext, SignalEstimate, SignalModel};

/// Reads the bookmaker's fair probability as a signal.
///
/// Confidence starts at 70 and drops one point per point of overround, so a
/// heavily juiced line counts for less.
#[derive(Debug, Clone)]
pub struct MarketModel {
    method: DevigMethod,
    weight: f64,
}

impl Default for MarketModel {
    fn default() -> Self {
        Self::new(DevigMethod::Proportional, 1.2)
    }
}

impl MarketModel {
    #[must_use]
    pub const fn new(method: DevigMethod, weight: f64) -> Self {
        Self { method, weight }
    }
}

impl SignalModel for MarketModel {
    fn name(&self) -> &str {
        "market"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        let fair = devig(ctx.odds.home, ctx.odds.away, self.method).ok()?;
        let confidence = (70.0 - fair.overround * 100.0).clamp(40.0, 80.0);
        let mut estimate = SignalEstimate::new(self.name(), fair.home, confidence, self.weight);
        if let Some(total) = ctx.odds.total {
            estimate = estimate.with_expected_total(total);
        }
        Some(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::OddsSnapshot;

    #[test]
    fn reproduces_devigged_line() {
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(-150.0, 130.0));
        let est = MarketModel::default().estimate(&ctx).unwrap();
        let fair = devig(-150.0, 130.0, DevigMethod::Proportional).unwrap();
        assert!((est.home_win_prob - fair.home).abs() < 1e-12);
        assert!(est.confidence < 70.0);
    }

    #[test]
    fn declines_on_bad_odds() {
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(-150.0, 50.0));
        assert!(MarketModel::default().estimate(&ctx).is_none());
    }

    #[test]
    fn carries_posted_total() {
        let mut odds = OddsSnapshot::moneyline(-110.0, -110.0);
        odds.total = Some(47.5);
        let ctx = GameContext::new("A", "B", odds);
        let est = MarketModel::default().estimate(&ctx).unwrap();
        assert_eq!(est.expected_total, Some(47.5));
    }
}

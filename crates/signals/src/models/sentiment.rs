use progno_core::{GameContext, SignalEstimate, SignalModel};

/// News and social sentiment. Weak by nature: a full swing from -1 to +1
/// moves the estimate by 10 points, and confidence stays at 40.
#[derive(Debug, Clone)]
pub struct SentimentModel {
    weight: f64,
}

impl Default for SentimentModel {
    fn default() -> Self {
        Self::new(0.4)
    }
}

impl SentimentModel {
    #[must_use]
    pub const fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl SignalModel for SentimentModel {
    fn name(&self) -> &str {
        "sentiment"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        let sentiment = ctx.sentiment.as_ref()?;
        if !sentiment.home.is_finite() || !sentiment.away.is_finite() {
            return None;
        }
        let diff = sentiment.home.clamp(-1.0, 1.0) - sentiment.away.clamp(-1.0, 1.0);
        if diff.abs() < 0.05 {
            return None;
        }
        Some(SignalEstimate::new(
            self.name(),
            0.5 + diff * 0.05,
            40.0,
            self.weight,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::{OddsSnapshot, Sentiment};

    fn ctx(home: f64, away: f64) -> GameContext {
        GameContext::new("A", "B", OddsSnapshot::moneyline(-110.0, -110.0))
            .with_sentiment(Sentiment { home, away })
    }

    #[test]
    fn full_swing_is_ten_points() {
        let est = SentimentModel::default().estimate(&ctx(1.0, -1.0)).unwrap();
        assert!((est.home_win_prob - 0.6).abs() < 1e-12);
    }

    #[test]
    fn out_of_range_scores_clamped() {
        let est = SentimentModel::default().estimate(&ctx(-5.0, 5.0)).unwrap();
        assert!((est.home_win_prob - 0.4).abs() < 1e-12);
    }

    #[test]
    fn negligible_difference_is_silent() {
        assert!(SentimentModel::default().estimate(&ctx(0.3, 0.28)).is_none());
    }
}

use progno_core::{GameContext, SignalEstimate, SignalModel};

/// Passes through a probability supplied by an outside judge.
///
/// Probabilities outside [0, 1] are dropped with a warning rather than
/// clamped, since they indicate a broken upstream.
#[derive(Debug, Clone)]
pub struct ExternalJudgmentModel {
    weight: f64,
}

impl Default for ExternalJudgmentModel {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl ExternalJudgmentModel {
    #[must_use]
    pub const fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl SignalModel for ExternalJudgmentModel {
    fn name(&self) -> &str {
        "external-judgment"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        let judgment = ctx.external_judgment.as_ref()?;
        if !(0.0..=1.0).contains(&judgment.home_win_prob) {
            tracing::warn!(
                source = %judgment.source,
                value = judgment.home_win_prob,
                "Ignoring external judgment with out-of-range probability"
            );
            return None;
        }
        Some(SignalEstimate::new(
            self.name(),
            judgment.home_win_prob,
            judgment.confidence,
            self.weight,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::{ExternalJudgment, OddsSnapshot};

    fn ctx(p: f64) -> GameContext {
        GameContext::new("A", "B", OddsSnapshot::moneyline(-110.0, -110.0)).with_external_judgment(
            ExternalJudgment {
                home_win_prob: p,
                confidence: 72.0,
                source: "analyst".to_string(),
            },
        )
    }

    #[test]
    fn passes_probability_through() {
        let est = ExternalJudgmentModel::default().estimate(&ctx(0.64)).unwrap();
        assert!((est.home_win_prob - 0.64).abs() < 1e-12);
        assert!((est.confidence - 72.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(ExternalJudgmentModel::default().estimate(&ctx(1.4)).is_none());
        assert!(ExternalJudgmentModel::default().estimate(&ctx(f64::NAN)).is_none());
    }
}

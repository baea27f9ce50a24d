//! Form-based factors: recency-weighted last five and head-to-head.

use progno_core::game::recency_form_score;
use progno_core::{GameContext, SignalEstimate, SignalModel};

/// Recency-weighted form differential.
#[derive(Debug, Clone)]
pub struct RecentFormModel {
    /// Probability shift per unit of form differential.
    sensitivity: f64,
    weight: f64,
}

impl Default for RecentFormModel {
    fn default() -> Self {
        Self::new(0.3, 1.0)
    }
}

impl RecentFormModel {
    #[must_use]
    pub const fn new(sensitivity: f64, weight: f64) -> Self {
        Self {
            sensitivity,
            weight,
        }
    }
}

impl SignalModel for RecentFormModel {
    fn name(&self) -> &str {
        "recent-form"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        if ctx.home_form.is_empty() || ctx.away_form.is_empty() {
            return None;
        }
        let diff = recency_form_score(&ctx.home_form) - recency_form_score(&ctx.away_form);
        let games = ctx.home_form.len().min(ctx.away_form.len()).min(5);
        // Five games each: 70
        let confidence = 40.0 + 6.0 * games as f64;
        Some(SignalEstimate::new(
            self.name(),
            0.5 + self.sensitivity * diff,
            confidence,
            self.weight,
        ))
    }
}

/// Head-to-head record between the two teams.
#[derive(Debug, Clone)]
pub struct HeadToHeadModel {
    weight: f64,
}

impl Default for HeadToHeadModel {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl HeadToHeadModel {
    #[must_use]
    pub const fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl SignalModel for HeadToHeadModel {
    fn name(&self) -> &str {
        "head-to-head"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        let h2h = ctx.head_to_head;
        let meetings = h2h.total();
        if meetings == 0 {
            return None;
        }
        let p = 0.5 + (h2h.home_win_rate() - 0.5) * 0.4;
        let confidence = (30.0 + 5.0 * f64::from(meetings)).min(65.0);
        Some(SignalEstimate::new(self.name(), p, confidence, self.weight))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::{FormResult, HeadToHead, OddsSnapshot};

    fn ctx() -> GameContext {
        GameContext::new("A", "B", OddsSnapshot::moneyline(-110.0, -110.0))
    }

    #[test]
    fn better_form_favors_home() {
        let c = ctx().with_form(
            FormResult::parse_sequence("WWWWW"),
            FormResult::parse_sequence("LLLLL"),
        );
        let est = RecentFormModel::default().estimate(&c).unwrap();
        assert!((est.home_win_prob - 0.8).abs() < 1e-12);
        assert!((est.confidence - 70.0).abs() < 1e-12);
    }

    #[test]
    fn form_declines_when_one_side_missing() {
        let c = ctx().with_form(FormResult::parse_sequence("WW"), Vec::new());
        assert!(RecentFormModel::default().estimate(&c).is_none());
    }

    #[test]
    fn head_to_head_dampens_record() {
        let c = ctx().with_head_to_head(HeadToHead {
            home_wins: 4,
            away_wins: 0,
            draws: 0,
        });
        let est = HeadToHeadModel::default().estimate(&c).unwrap();
        assert!((est.home_win_prob - 0.7).abs() < 1e-12);
        assert!((est.confidence - 50.0).abs() < 1e-12);
    }

    #[test]
    fn head_to_head_declines_without_meetings() {
        assert!(HeadToHeadModel::default().estimate(&ctx()).is_none());
    }
}

//! Public-betting fade.

use progno_core::{BettingSplits, GameContext, SignalEstimate, SignalModel};

/// Minimum fade confidence before the model speaks.
pub const FADE_THRESHOLD: f64 = 60.0;

/// Confidence in fading the public: `50 + |tickets - money| + 15 if the line
/// moved against the public`.
#[must_use]
pub fn fade_confidence(splits: &BettingSplits) -> f64 {
    let divergence = (splits.public_pct_home - splits.money_pct_home).abs();
    let rlm = if splits.reverse_line_movement { 15.0 } else { 0.0 };
    50.0 + divergence + rlm
}

/// Fades the side holding the tickets when the money disagrees.
///
/// Emits only when [`fade_confidence`] exceeds 60.
#[derive(Debug, Clone)]
pub struct BettingSplitsModel {
    weight: f64,
}

impl Default for BettingSplitsModel {
    fn default() -> Self {
        Self::new(0.9)
    }
}

impl BettingSplitsModel {
    #[must_use]
    pub const fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl SignalModel for BettingSplitsModel {
    fn name(&self) -> &str {
        "betting-splits"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        let splits = ctx.betting_splits.as_ref()?;
        if !splits.public_pct_home.is_finite() || !splits.money_pct_home.is_finite() {
            return None;
        }
        let confidence = fade_confidence(splits);
        if confidence <= FADE_THRESHOLD {
            return None;
        }

        let divergence = (splits.public_pct_home - splits.money_pct_home).abs();
        let shift = (divergence / 200.0).min(0.15);
        // Tickets heavier than money on home: the public is on home, fade it.
        let p = if splits.public_pct_home > splits.money_pct_home {
            0.5 - shift
        } else {
            0.5 + shift
        };
        Some(SignalEstimate::new(
            self.name(),
            p,
            confidence.min(90.0),
            self.weight,
        ))
    }
}

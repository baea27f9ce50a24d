//! Fractional Kelly bankroll sizing for American-odds moneylines.
//!
//! The Kelly formula for decimal odds `d` and win probability `p` is:
//! ```text
//! b  = d - 1            (net odds)
//! f* = (b*p - (1-p)) / b
//! ```
//! `f*` is clamped to [0, 1], scaled by a risk-profile multiplier and a
//! quality factor, then hard-capped at a fraction of bankroll.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::SizingConfig;
use crate::odds::american_to_decimal;
use crate::signal::clamp_probability;

/// Full Kelly fraction for a bet at American odds.
///
/// Returns 0 for malformed odds, non-positive net odds, or negative edge.
#[must_use]
pub fn kelly_fraction(win_prob: f64, american_odds: f64) -> f64 {
    let Ok(decimal) = american_to_decimal(american_odds) else {
        return 0.0;
    };
    let b = decimal - 1.0;
    if b <= 0.0 || !b.is_finite() {
        return 0.0;
    }
    let p = clamp_probability(win_prob);
    ((b * p - (1.0 - p)) / b).clamp(0.0, 1.0)
}

/// Expected profit per unit staked: `p * b - (1 - p)`.
#[must_use]
pub fn expected_value(win_prob: f64, american_odds: f64) -> f64 {
    let Ok(decimal) = american_to_decimal(american_odds) else {
        return 0.0;
    };
    let p = clamp_probability(win_prob);
    p * (decimal - 1.0) - (1.0 - p)
}

/// Operator risk appetite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskProfile {
    /// Quarter Kelly by default.
    Conservative,
    /// Half Kelly by default.
    #[default]
    Balanced,
    /// Full Kelly by default.
    Aggressive,
}

impl std::str::FromStr for RiskProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "conservative" => Ok(Self::Conservative),
            "balanced" => Ok(Self::Balanced),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(format!("unknown risk profile: {other}")),
        }
    }
}

/// How the wager was arrived at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    /// Scaled Kelly stake.
    FractionalKelly,
    /// No bet recommended.
    NoBet,
}

/// Output of [`BankrollSizer::size_bet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSizeRecommendation {
    /// Amount to stake, rounded to cents. Zero when no bet.
    pub wager: Decimal,
    /// Full Kelly fraction before any scaling.
    pub kelly_fraction: f64,
    /// Fraction of bankroll actually staked.
    pub applied_fraction: f64,
    /// Sizing method.
    pub method: SizingMethod,
    /// True when the max-fraction cap bound the stake.
    pub capped: bool,
    /// Human-readable trail of the decision.
    pub reasoning: Vec<String>,
}

impl BetSizeRecommendation {
    fn no_bet(kelly_fraction: f64, reasoning: Vec<String>) -> Self {
        Self {
            wager: Decimal::ZERO,
            kelly_fraction,
            applied_fraction: 0.0,
            method: SizingMethod::NoBet,
            capped: false,
            reasoning,
        }
    }

    /// Returns true when a positive wager is recommended.
    #[must_use]
    pub fn should_bet(&self) -> bool {
        self.method == SizingMethod::FractionalKelly && self.wager > Decimal::ZERO
    }
}

/// Converts a calibrated probability and edge into a bounded stake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankrollSizer {
    /// Caps, minimum unit and profile multipliers.
    pub config: SizingConfig,
}

impl Default for BankrollSizer {
    fn default() -> Self {
        Self::new(SizingConfig::default())
    }
}

impl BankrollSizer {
    /// Creates a sizer from explicit configuration.
    #[must_use]
    pub const fn new(config: SizingConfig) -> Self {
        Self { config }
    }

    /// Creates a sizer whose balanced multiplier is a calibrated Kelly
    /// fraction. Conservative is half of it and aggressive double, capped at
    /// full Kelly.
    #[must_use]
    pub fn calibrated(mut config: SizingConfig, kelly_fraction: f64) -> Self {
        if kelly_fraction.is_finite() && kelly_fraction > 0.0 {
            let k = kelly_fraction.min(1.0);
            config.balanced_multiplier = k;
            config.conservative_multiplier = k * 0.5;
            config.aggressive_multiplier = (k * 2.0).min(1.0);
        }
        Self { config }
    }

    /// Multiplier applied to full Kelly for a profile.
    #[must_use]
    pub fn multiplier(&self, profile: RiskProfile) -> f64 {
        match profile {
            RiskProfile::Conservative => self.config.conservative_multiplier,
            RiskProfile::Balanced => self.config.balanced_multiplier,
            RiskProfile::Aggressive => self.config.aggressive_multiplier,
        }
    }

    /// Sizes a bet.
    ///
    /// The staked fraction is
    /// `min(f* * multiplier * (0.5 + 0.5 * quality), max_bankroll_fraction)`.
    /// The quality factor extends the plain `bankroll * f* * multiplier`
    /// rule: a quality of 1 stakes exactly that, a quality of 0 stakes half
    /// of it. A NaN quality counts as 0. [`stake_fraction`](Self::stake_fraction)
    /// has no quality input and uses the plain rule.
    ///
    /// # Arguments
    /// * `probability` - calibrated win probability of the side being bet
    /// * `edge` - model edge over the de-vigged line, in percentage points
    /// * `quality` - prediction quality in [0, 1]; scales stake by `0.5 + 0.5*quality`
    /// * `american_odds` - posted price of the side
    /// * `bankroll` - current bankroll
    /// * `profile` - risk profile
    ///
    /// # Examples
    /// ```
    /// use progno_core::kelly::{BankrollSizer, RiskProfile};
    /// use rust_decimal_macros::dec;
    ///
    /// let sizer = BankrollSizer::default();
    /// let rec = sizer.size_bet(0.6, 5.0, 1.0, 100.0, dec!(1000), RiskProfile::Balanced);
    /// assert!(rec.should_bet());
    /// assert!(rec.wager <= dec!(100));
    /// ```
    #[must_use]
    pub fn size_bet(
        &self,
        probability: f64,
        edge: f64,
        quality: f64,
        american_odds: f64,
        bankroll: Decimal,
        profile: RiskProfile,
    ) -> BetSizeRecommendation {
        let mut reasoning = Vec::new();

        if bankroll <= Decimal::ZERO {
            reasoning.push(format!("bankroll {bankroll} is not positive"));
            return BetSizeRecommendation::no_bet(0.0, reasoning);
        }
        let decimal_odds = match american_to_decimal(american_odds) {
            Ok(d) => d,
            Err(e) => {
                reasoning.push(format!("odds rejected: {e}"));
                return BetSizeRecommendation::no_bet(0.0, reasoning);
            }
        };
        if edge.is_nan() || edge <= 0.0 {
            reasoning.push(format!("no positive edge ({edge:.2} pts)"));
            return BetSizeRecommendation::no_bet(0.0, reasoning);
        }

        let p = clamp_probability(probability);
        let full_kelly = kelly_fraction(p, american_odds);
        reasoning.push(format!(
            "p={p:.3}, decimal odds {decimal_odds:.3}, full Kelly {:.2}%",
            full_kelly * 100.0
        ));
        if full_kelly <= 0.0 {
            reasoning.push("Kelly fraction is zero at this price".to_string());
            return BetSizeRecommendation::no_bet(0.0, reasoning);
        }

        let multiplier = self.multiplier(profile).clamp(0.0, 1.0);
        let quality = if quality.is_nan() { 0.0 } else { quality.clamp(0.0, 1.0) };
        let quality_factor = 0.5 + 0.5 * quality;
        let mut fraction = full_kelly * multiplier * quality_factor;
        reasoning.push(format!(
            "{profile:?} multiplier {multiplier:.2}, quality factor {quality_factor:.2}"
        ));

        let cap = self.config.max_bankroll_fraction.clamp(0.0, 1.0);
        let capped = fraction > cap;
        if capped {
            reasoning.push(format!(
                "capped from {:.2}% to {:.2}% of bankroll",
                fraction * 100.0,
                cap * 100.0
            ));
            fraction = cap;
        }

        let wager = Decimal::from_f64(fraction)
            .map(|f| (bankroll * f).round_dp(2))
            .unwrap_or(Decimal::ZERO);
        let min_unit = Decimal::from_f64(self.config.min_unit).unwrap_or(Decimal::ONE);
        if wager < min_unit {
            reasoning.push(format!("stake {wager} below minimum unit {min_unit}"));
            return BetSizeRecommendation::no_bet(full_kelly, reasoning);
        }

        tracing::debug!(
            wager = %wager,
            kelly = full_kelly,
            applied = fraction,
            capped,
            "Sized bet"
        );

        BetSizeRecommendation {
            wager,
            kelly_fraction: full_kelly,
            applied_fraction: fraction,
            method: SizingMethod::FractionalKelly,
            capped,
            reasoning,
        }
    }

    /// Sizes a bet against an `f64` bankroll, returning the stake as `f64`.
    ///
    /// Used by the backtester, which compounds in floating point.
    #[must_use]
    pub fn stake_fraction(&self, probability: f64, american_odds: f64, multiplier: f64) -> f64 {
        let f = kelly_fraction(probability, american_odds) * multiplier.max(0.0);
        f.min(self.config.max_bankroll_fraction.clamp(0.0, 1.0))
    }
}

/// Converts a Decimal amount to `f64`, or 0 when unrepresentable.
#[must_use]
pub fn decimal_to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

//! Line normalization: American odds conversion, de-vig, cross-source
//! consensus and arbitrage detection.
//!
//! All functions take American odds. Prices with magnitude below 100 are
//! malformed and rejected; prices beyond ±10000 are clamped.

use serde::{Deserialize, Serialize};

use crate::error::InputError;
use crate::game::{validate_american, Side};

/// Largest magnitude accepted for an American price.
pub const MAX_AMERICAN: f64 = 10_000.0;

/// Default deviation from consensus (in probability) that flags an outlier.
pub const DEFAULT_OUTLIER_THRESHOLD: f64 = 0.03;

/// Implied-probability sum below `1 - ARB_TOLERANCE` counts as an arbitrage.
pub const ARB_TOLERANCE: f64 = 0.001;

/// Validates and clamps an American price.
///
/// # Errors
/// Returns [`InputError::InvalidOdds`] for NaN, infinite or (-100, 100) prices.
pub fn sanitize_american(odds: f64, field: &'static str) -> Result<f64, InputError> {
    validate_american(odds, field)?;
    Ok(odds.clamp(-MAX_AMERICAN, MAX_AMERICAN))
}

/// Converts American odds to a raw (vigged) implied probability.
///
/// # Errors
/// Returns [`InputError::InvalidOdds`] for malformed prices.
pub fn american_to_implied(odds: f64) -> Result<f64, InputError> {
    let odds = sanitize_american(odds, "odds")?;
    Ok(if odds < 0.0 {
        -odds / (-odds + 100.0)
    } else {
        100.0 / (odds + 100.0)
    })
}

/// Converts American odds to decimal odds (stake included).
///
/// # Errors
/// Returns [`InputError::InvalidOdds`] for malformed prices.
pub fn american_to_decimal(odds: f64) -> Result<f64, InputError> {
    let odds = sanitize_american(odds, "odds")?;
    Ok(if odds < 0.0 {
        1.0 + 100.0 / -odds
    } else {
        1.0 + odds / 100.0
    })
}

/// Converts a probability to fair American odds.
///
/// The probability is clamped away from 0 and 1 first; 0.5 maps to +100.
#[must_use]
pub fn probability_to_american(p: f64) -> f64 {
    let p = if p.is_nan() { 0.5 } else { p.clamp(0.0001, 0.9999) };
    let odds = if p > 0.5 {
        -(p / (1.0 - p)) * 100.0
    } else {
        ((1.0 - p) / p) * 100.0
    };
    odds.clamp(-MAX_AMERICAN, MAX_AMERICAN)
}

/// De-vig method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevigMethod {
    /// Scale raw implied probabilities so they sum to 1.
    #[default]
    Proportional,
    /// Shin's insider-trading model, solved by bisection on `z`.
    Shin,
}

/// Fair probabilities for a two-way market.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevigResult {
    /// Fair home probability.
    pub home: f64,
    /// Fair away probability.
    pub away: f64,
    /// Raw implied sum minus 1 (the bookmaker margin).
    pub overround: f64,
}

impl DevigResult {
    /// Fair probability for a side.
    #[must_use]
    pub fn prob(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.home,
            Side::Away => self.away,
        }
    }
}

/// Removes the bookmaker margin from a moneyline pair.
///
/// # Errors
/// Returns [`InputError::InvalidOdds`] if either price is malformed.
pub fn devig(home_odds: f64, away_odds: f64, method: DevigMethod) -> Result<DevigResult, InputError> {
    let q_home = american_to_implied(home_odds)?;
    let q_away = american_to_implied(away_odds)?;
    let sum = q_home + q_away;
    let overround = sum - 1.0;

    let (home, away) = match method {
        DevigMethod::Proportional => (q_home / sum, q_away / sum),
        // No margin to remove; Shin degenerates to proportional.
        DevigMethod::Shin if sum <= 1.0 => (q_home / sum, q_away / sum),
        DevigMethod::Shin => shin(q_home, q_away),
    };

    Ok(DevigResult {
        home,
        away,
        overround,
    })
}

fn shin_prob(q: f64, sum: f64, z: f64) -> f64 {
    ((z * z + 4.0 * (1.0 - z) * q * q / sum).sqrt() - z) / (2.0 * (1.0 - z))
}

fn shin(q_home: f64, q_away: f64) -> (f64, f64) {
    let sum = q_home + q_away;
    let (mut lo, mut hi) = (0.0_f64, 0.5_f64);
    for _ in 0..60 {
        let z = (lo + hi) / 2.0;
        let total = shin_prob(q_home, sum, z) + shin_prob(q_away, sum, z);
        if total > 1.0 {
            lo = z;
        } else {
            hi = z;
        }
    }
    let z = (lo + hi) / 2.0;
    let home = shin_prob(q_home, sum, z);
    let away = shin_prob(q_away, sum, z);
    let s = home + away;
    if s > 0.0 {
        (home / s, away / s)
    } else {
        (0.5, 0.5)
    }
}

/// One source's moneyline for a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineQuote {
    /// Bookmaker or feed name.
    pub source: String,
    /// Home moneyline.
    pub home: f64,
    /// Away moneyline.
    pub away: f64,
    /// How much the source's line is trusted, > 0. Sharp books rate higher.
    #[serde(default = "default_sharpness")]
    pub sharpness: f64,
}

fn default_sharpness() -> f64 {
    1.0
}

impl LineQuote {
    /// Creates a quote with default sharpness.
    #[must_use]
    pub fn new(source: impl Into<String>, home: f64, away: f64) -> Self {
        Self {
            source: source.into(),
            home,
            away,
            sharpness: default_sharpness(),
        }
    }

    /// Sets the sharpness rating.
    #[must_use]
    pub fn with_sharpness(mut self, sharpness: f64) -> Self {
        self.sharpness = sharpness;
        self
    }
}

/// A source whose fair line sits too far from consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierLine {
    /// Source name.
    pub source: String,
    /// Source fair home probability minus consensus.
    pub deviation: f64,
    /// Side the source prices more generously than consensus.
    pub soft_side: Side,
}

/// Sharpness-weighted consensus line across sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusLine {
    /// Consensus fair home probability.
    pub home_prob: f64,
    /// Consensus fair away probability.
    pub away_prob: f64,
    /// Fair American price for the home side.
    pub fair_home: f64,
    /// Fair American price for the away side.
    pub fair_away: f64,
    /// Number of sources used.
    pub sources: usize,
    /// Sources deviating beyond the threshold.
    pub outliers: Vec<OutlierLine>,
}

/// Cross-book arbitrage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Arbitrage {
    /// Source with the best home price.
    pub home_source: String,
    /// Best home price.
    pub home_odds: f64,
    /// Source with the best away price.
    pub away_source: String,
    /// Best away price.
    pub away_odds: f64,
    /// Sum of raw implied probabilities (< 1).
    pub implied_sum: f64,
    /// Stake on the home side.
    pub home_stake: f64,
    /// Stake on the away side.
    pub away_stake: f64,
    /// Guaranteed profit as a percentage of total stake.
    pub profit_pct: f64,
}

/// Converts odds to probabilities and compares lines across sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineNormalizer {
    /// De-vig method used for every conversion.
    pub method: DevigMethod,
    /// Outlier threshold in probability units.
    pub outlier_threshold: f64,
}

impl Default for LineNormalizer {
    fn default() -> Self {
        Self {
            method: DevigMethod::Proportional,
            outlier_threshold: DEFAULT_OUTLIER_THRESHOLD,
        }
    }
}

impl LineNormalizer {
    /// Creates a normalizer.
    #[must_use]
    pub const fn new(method: DevigMethod, outlier_threshold: f64) -> Self {
        Self {
            method,
            outlier_threshold,
        }
    }

    /// Raw implied probability of one price.
    ///
    /// # Errors
    /// Returns [`InputError::InvalidOdds`] for malformed prices.
    pub fn implied_probability(&self, odds: f64) -> Result<f64, InputError> {
        american_to_implied(odds)
    }

    /// Fair probabilities for a moneyline pair.
    ///
    /// # Errors
    /// Returns [`InputError::InvalidOdds`] if either price is malformed.
    pub fn devig(&self, home_odds: f64, away_odds: f64) -> Result<DevigResult, InputError> {
        devig(home_odds, away_odds, self.method)
    }

    /// Builds a sharpness-weighted consensus line and flags outliers.
    ///
    /// Quotes with malformed odds are skipped with a warning. Non-positive
    /// sharpness counts as 1.
    ///
    /// # Errors
    /// Returns [`InputError::NoQuotes`] when no usable quote remains.
    pub fn consensus(&self, quotes: &[LineQuote]) -> Result<ConsensusLine, InputError> {
        let fair: Vec<(&LineQuote, f64, f64)> = quotes
            .iter()
            .filter_map(|q| match self.devig(q.home, q.away) {
                Ok(d) => {
                    let w = if q.sharpness.is_finite() && q.sharpness > 0.0 {
                        q.sharpness
                    } else {
                        1.0
                    };
                    Some((q, d.home, w))
                }
                Err(e) => {
                    tracing::warn!(source = %q.source, error = %e, "Skipping malformed line quote");
                    None
                }
            })
            .collect();

        if fair.is_empty() {
            return Err(InputError::NoQuotes);
        }

        let weight_sum: f64 = fair.iter().map(|(_, _, w)| w).sum();
        let home_prob = fair.iter().map(|(_, p, w)| p * w).sum::<f64>() / weight_sum;

        let outliers = fair
            .iter()
            .filter_map(|(q, p, _)| {
                let deviation = p - home_prob;
                (deviation.abs() > self.outlier_threshold).then(|| OutlierLine {
                    source: q.source.clone(),
                    deviation,
                    // A lower fair home probability means a longer home price.
                    soft_side: if deviation < 0.0 { Side::Home } else { Side::Away },
                })
            })
            .collect();

        Ok(ConsensusLine {
            home_prob,
            away_prob: 1.0 - home_prob,
            fair_home: probability_to_american(home_prob),
            fair_away: probability_to_american(1.0 - home_prob),
            sources: fair.len(),
            outliers,
        })
    }
}

/// Finds the best cross-source arbitrage, if one exists.
///
/// Pairs where both prices come from the same source are ignored. Stakes are
/// split in proportion to each side's implied probability so either outcome
/// returns the same amount.
#[must_use]
pub fn find_arbitrage(quotes: &[LineQuote], total_stake: f64) -> Option<Arbitrage> {
    let priced: Vec<(&LineQuote, f64, f64)> = quotes
        .iter()
        .filter_map(|q| {
            let home = american_to_implied(q.home).ok()?;
            let away = american_to_implied(q.away).ok()?;
            Some((q, home, away))
        })
        .collect();

    let mut best: Option<(usize, usize, f64)> = None;
    for (i, (home_quote, q_home, _)) in priced.iter().enumerate() {
        for (j, (away_quote, _, q_away)) in priced.iter().enumerate() {
            if home_quote.source == away_quote.source {
                continue;
            }
            let sum = q_home + q_away;
            if best.map_or(true, |(_, _, s)| sum < s) {
                best = Some((i, j, sum));
            }
        }
    }

    let (i, j, implied_sum) = best?;
    if implied_sum >= 1.0 - ARB_TOLERANCE {
        return None;
    }
    let (home_quote, q_home, _) = priced[i];
    let (away_quote, _, q_away) = priced[j];

    Some(Arbitrage {
        home_source: home_quote.source.clone(),
        home_odds: home_quote.home,
        away_source: away_quote.source.clone(),
        away_odds: away_quote.away,
        implied_sum,
        home_stake: total_stake * q_home / implied_sum,
        away_stake: total_stake * q_away / implied_sum,
        profit_pct: (1.0 / implied_sum - 1.0) * 100.0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============================================
    // Conversion Tests
    // ============================================

    #[test]
    fn implied_from_favorite() {
        assert!((american_to_implied(-150.0).unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn implied_from_underdog() {
        assert!((american_to_implied(130.0).unwrap() - 100.0 / 230.0).abs() < 1e-12);
    }

    #[test]
    fn even_money_is_half() {
        assert!((american_to_implied(100.0).unwrap() - 0.5).abs() < 1e-12);
        assert!((american_to_implied(-100.0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn decimal_conversion() {
        assert!((american_to_decimal(-200.0).unwrap() - 1.5).abs() < 1e-12);
        assert!((american_to_decimal(150.0).unwrap() - 2.5).abs() < 1e-12);
        assert!((american_to_decimal(100.0).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn odds_inside_hundred_rejected() {
        assert!(matches!(
            american_to_implied(50.0),
            Err(InputError::InvalidOdds { .. })
        ));
        assert!(american_to_implied(-99.0).is_err());
        assert!(american_to_implied(0.0).is_err());
        assert!(american_to_implied(f64::NAN).is_err());
    }

    #[test]
    fn extreme_odds_clamped() {
        assert!((sanitize_american(50_000.0, "odds").unwrap() - MAX_AMERICAN).abs() < f64::EPSILON);
        assert!((sanitize_american(-50_000.0, "odds").unwrap() + MAX_AMERICAN).abs() < f64::EPSILON);
    }

    #[test]
    fn probability_to_american_round_trip() {
        let odds = probability_to_american(0.6);
        assert!((odds + 150.0).abs() < 1e-9);
        let odds = probability_to_american(0.4);
        assert!((odds - 150.0).abs() < 1e-9);
    }

    // ============================================
    // De-vig Tests
    // ============================================

    #[test]
    fn proportional_devig_sums_to_one() {
        let d = devig(-150.0, 130.0, DevigMethod::Proportional).unwrap();
        assert!((d.home + d.away - 1.0).abs() < 1e-12);
        assert!((d.home - 0.6 / (0.6 + 100.0 / 230.0)).abs() < 1e-12);
        assert!(d.overround > 0.0);
    }

    #[test]
    fn shin_devig_sums_to_one_and_favours_favourite() {
        let prop = devig(-300.0, 240.0, DevigMethod::Proportional).unwrap();
        let shin = devig(-300.0, 240.0, DevigMethod::Shin).unwrap();
        assert!((shin.home + shin.away - 1.0).abs() < 1e-9);
        // Shin shifts margin toward the longshot.
        assert!(shin.home > prop.home);
    }

    #[test]
    fn shin_without_margin_matches_proportional() {
        let shin = devig(100.0, 100.0, DevigMethod::Shin).unwrap();
        assert!((shin.home - 0.5).abs() < 1e-12);
    }

    #[test]
    fn devig_rejects_bad_price() {
        assert!(devig(-150.0, 10.0, DevigMethod::Proportional).is_err());
    }

    // ============================================
    // Consensus Tests
    // ============================================

    #[test]
    fn consensus_weights_by_sharpness() {
        let normalizer = LineNormalizer::default();
        let quotes = vec![
            LineQuote::new("sharp", -150.0, 130.0).with_sharpness(3.0),
            LineQuote::new("soft", -110.0, -110.0),
        ];
        let line = normalizer.consensus(&quotes).unwrap();
        let sharp = devig(-150.0, 130.0, DevigMethod::Proportional).unwrap().home;
        let expected = (sharp * 3.0 + 0.5) / 4.0;
        assert!((line.home_prob - expected).abs() < 1e-12);
        assert_eq!(line.sources, 2);
    }

    #[test]
    fn consensus_flags_outlier() {
        let normalizer = LineNormalizer::new(DevigMethod::Proportional, 0.05);
        let quotes = vec![
            LineQuote::new("a", -150.0, 130.0),
            LineQuote::new("b", -150.0, 130.0),
            LineQuote::new("c", -148.0, 128.0),
            LineQuote::new("d", 110.0, -130.0),
        ];
        let line = normalizer.consensus(&quotes).unwrap();
        assert_eq!(line.outliers.len(), 1);
        assert_eq!(line.outliers[0].source, "d");
        assert_eq!(line.outliers[0].soft_side, Side::Home);
    }

    #[test]
    fn consensus_skips_malformed_quotes() {
        let normalizer = LineNormalizer::default();
        let quotes = vec![
            LineQuote::new("bad", 20.0, 130.0),
            LineQuote::new("good", -110.0, -110.0),
        ];
        let line = normalizer.consensus(&quotes).unwrap();
        assert_eq!(line.sources, 1);
    }

    #[test]
    fn consensus_empty_is_error() {
        let normalizer = LineNormalizer::default();
        assert_eq!(normalizer.consensus(&[]), Err(InputError::NoQuotes));
    }

    // ============================================
    // Arbitrage Tests
    // ============================================

    #[test]
    fn arbitrage_found_across_books() {
        let quotes = vec![
            LineQuote::new("book_a", 120.0, -140.0),
            LineQuote::new("book_b", -140.0, 125.0),
        ];
        let arb = find_arbitrage(&quotes, 100.0).unwrap();
        assert_eq!(arb.home_source, "book_a");
        assert_eq!(arb.away_source, "book_b");
        assert!(arb.implied_sum < 1.0);
        assert!(arb.profit_pct > 0.0);
        assert!((arb.home_stake + arb.away_stake - 100.0).abs() < 1e-9);

        let home_return = arb.home_stake * american_to_decimal(arb.home_odds).unwrap();
        let away_return = arb.away_stake * american_to_decimal(arb.away_odds).unwrap();
        assert!((home_return - away_return).abs() < 1e-9);
    }

    #[test]
    fn no_arbitrage_on_normal_market() {
        let quotes = vec![
            LineQuote::new("a", -110.0, -110.0),
            LineQuote::new("b", -105.0, -115.0),
        ];
        assert!(find_arbitrage(&quotes, 100.0).is_none());
    }

    #[test]
    fn same_source_pair_never_reported() {
        let quotes = vec![LineQuote::new("broken", 150.0, 150.0)];
        assert!(find_arbitrage(&quotes, 100.0).is_none());
    }
}

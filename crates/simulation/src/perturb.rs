//! Randomized jitter applied to a game context before each simulation draw.
//!
//! Jitters are uniform in `[-a, +a]`. Odds, spread and total use fixed
//! half-widths; team statistics scale with the variance factor `V`:
//!
//! | field                         | half-width |
//! |-------------------------------|------------|
//! | moneylines                    | 2.5        |
//! | spread                        | 0.75       |
//! | total                         | 1.5        |
//! | recent avg points / allowed   | 2 × V      |
//! | season points for / against   | 20 × V     |
//!
//! Statistics are floored at zero. Moneyline jitter moves along the price
//! line, where -100 and +100 are the same even-money point: +100 nudged by
//! -2 becomes -102, never +98. A price already inside (-100, 100) is
//! malformed and is shifted as is; the runner skips such draws.

use progno_core::{GameContext, TeamStats};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Jitter half-widths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub odds: f64,
    pub spread: f64,
    pub total: f64,
    /// Multiplied by `V` for per-game averages.
    pub per_game: f64,
    /// Multiplied by `V` for season totals.
    pub season: f64,
}

impl Default for Perturbation {
    fn default() -> Self {
        Self {
            odds: 2.5,
            spread: 0.75,
            total: 1.5,
            per_game: 2.0,
            season: 20.0,
        }
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, half_width: f64) -> f64 {
    if half_width <= 0.0 || !half_width.is_finite() {
        return 0.0;
    }
    rng.gen_range(-half_width..=half_width)
}

/// Shifts an American price by `delta` points, crossing even money from
/// +100 straight to -100 and back.
fn shift_price(price: f64, delta: f64) -> f64 {
    let from_even = if price >= 100.0 {
        price - 100.0
    } else if price <= -100.0 {
        price + 100.0
    } else {
        return price + delta;
    };
    let moved = from_even + delta;
    if moved >= 0.0 {
        100.0 + moved
    } else {
        moved - 100.0
    }
}

impl Perturbation {
    /// Returns a perturbed copy of `ctx`. The original is not touched.
    ///
    /// A negative or non-finite variance factor is treated as zero.
    pub fn apply<R: Rng + ?Sized>(&self, ctx: &GameContext, variance: f64, rng: &mut R) -> GameContext {
        let v = if variance.is_finite() { variance.max(0.0) } else { 0.0 };
        let mut out = ctx.clone();

        out.odds.home = shift_price(out.odds.home, jitter(rng, self.odds));
        out.odds.away = shift_price(out.odds.away, jitter(rng, self.odds));
        if let Some(spread) = out.odds.spread.as_mut() {
            *spread += jitter(rng, self.spread);
        }
        if let Some(total) = out.odds.total.as_mut() {
            *total = (*total + jitter(rng, self.total)).max(0.0);
        }

        self.perturb_stats(&mut out.home_stats, v, rng);
        self.perturb_stats(&mut out.away_stats, v, rng);
        out
    }

    fn perturb_stats<R: Rng + ?Sized>(&self, stats: &mut TeamStats, v: f64, rng: &mut R) {
        let per_game = self.per_game * v;
        let season = self.season * v;
        stats.recent_avg_points = (stats.recent_avg_points + jitter(rng, per_game)).max(0.0);
        stats.recent_avg_allowed = (stats.recent_avg_allowed + jitter(rng, per_game)).max(0.0);
        stats.points_for = (stats.points_for + jitter(rng, season)).max(0.0);
        stats.points_against = (stats.points_against + jitter(rng, season)).max(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::OddsSnapshot;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ctx() -> GameContext {
        let mut odds = OddsSnapshot::moneyline(-150.0, 130.0);
        odds.spread = Some(-3.5);
        odds.total = Some(45.0);
        GameContext::new("A", "B", odds).with_stats(
            TeamStats {
                recent_avg_points: 24.0,
                recent_avg_allowed: 1.0,
                points_for: 300.0,
                points_against: 250.0,
                wins: 7,
                losses: 3,
            },
            TeamStats::default(),
        )
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let p = Perturbation::default();
        let base = ctx();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..500 {
            let out = p.apply(&base, 1.5, &mut rng);
            assert!((out.odds.home - base.odds.home).abs() <= 2.5);
            assert!((out.odds.spread.unwrap() + 3.5).abs() <= 0.75);
            assert!((out.odds.total.unwrap() - 45.0).abs() <= 1.5);
            assert!((out.home_stats.recent_avg_points - 24.0).abs() <= 3.0);
            assert!((out.home_stats.points_for - 300.0).abs() <= 30.0);
            assert_eq!(out.home_stats.wins, 7);
        }
    }

    #[test]
    fn stats_floored_at_zero() {
        let p = Perturbation::default();
        let base = ctx();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..200 {
            let out = p.apply(&base, 3.0, &mut rng);
            assert!(out.home_stats.recent_avg_allowed >= 0.0);
            assert!(out.away_stats.points_for >= 0.0);
        }
    }

    #[test]
    fn zero_variance_leaves_stats_alone() {
        let p = Perturbation::default();
        let base = ctx();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let out = p.apply(&base, 0.0, &mut rng);
        assert_eq!(out.home_stats, base.home_stats);
        assert_ne!(out.odds.home, base.odds.home);
    }

    #[test]
    fn same_seed_same_draw() {
        let p = Perturbation::default();
        let base = ctx();
        let a = p.apply(&base, 1.0, &mut ChaCha8Rng::seed_from_u64(42));
        let b = p.apply(&base, 1.0, &mut ChaCha8Rng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn negative_variance_treated_as_zero() {
        let p = Perturbation::default();
        let base = ctx();
        let out = p.apply(&base, -4.0, &mut ChaCha8Rng::seed_from_u64(5));
        assert_eq!(out.home_stats, base.home_stats);
    }

    // ============================================
    // Moneyline Jitter
    // ============================================

    #[test]
    fn price_shift_crosses_even_money() {
        assert!((shift_price(100.0, -2.0) + 102.0).abs() < 1e-12);
        assert!((shift_price(-101.0, 2.5) - 101.5).abs() < 1e-12);
        assert!((shift_price(-150.0, 2.0) + 148.0).abs() < 1e-12);
        assert!((shift_price(130.0, -2.0) - 128.0).abs() < 1e-12);
    }

    #[test]
    fn pick_em_lines_never_become_degenerate() {
        let p = Perturbation::default();
        let base = GameContext::new("A", "B", OddsSnapshot::moneyline(100.0, 100.0));
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        let mut crossed = 0;
        for _ in 0..1000 {
            let out = p.apply(&base, 1.0, &mut rng);
            for price in [out.odds.home, out.odds.away] {
                assert!(price.abs() >= 100.0, "{price}");
                assert!(price.abs() <= 102.5);
                if price < 0.0 {
                    crossed += 1;
                }
            }
            assert!(out.validate().is_ok());
        }
        assert!(crossed > 0);
    }
}

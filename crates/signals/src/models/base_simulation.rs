//! Statistical base model: Pythagorean strength plus expected score.

use progno_core::{GameContext, SignalEstimate, SignalModel, TeamStats};

/// Exponent used for the Pythagorean expectation.
pub const PYTHAGOREAN_EXPONENT: f64 = 2.37;

/// Expected win share from points scored and allowed.
///
/// Returns 0.5 when the team has no scoring history.
#[must_use]
pub fn pythagorean_expectation(points_for: f64, points_against: f64) -> f64 {
    if points_for <= 0.0 && points_against <= 0.0 {
        return 0.5;
    }
    let pf = points_for.max(0.0).powf(PYTHAGOREAN_EXPONENT);
    let pa = points_against.max(0.0).powf(PYTHAGOREAN_EXPONENT);
    if pf + pa <= 0.0 {
        0.5
    } else {
        pf / (pf + pa)
    }
}

fn has_history(stats: &TeamStats) -> bool {
    stats.wins + stats.losses > 0
        || stats.points_for > 0.0
        || stats.points_against > 0.0
        || stats.recent_avg_points > 0.0
}

/// Team strength: 60% Pythagorean, 40% actual record.
fn strength(stats: &TeamStats) -> f64 {
    0.6 * pythagorean_expectation(stats.points_for, stats.points_against) + 0.4 * stats.win_pct()
}

/// Base statistical model.
///
/// Home probability is the home share of combined strength plus a fixed
/// home-field bump. Expected points per side average the side's recent
/// offence with the opponent's recent defence.
#[derive(Debug, Clone)]
pub struct BaseSimulationModel {
    home_advantage: f64,
    weight: f64,
}

impl Default for BaseSimulationModel {
    fn default() -> Self {
        Self::new(0.03, 1.0)
    }
}

impl BaseSimulationModel {
    #[must_use]
    pub const fn new(home_advantage: f64, weight: f64) -> Self {
        Self {
            home_advantage,
            weight,
        }
    }

    /// Expected points for (home, away), if recent scoring is known.
    #[must_use]
    pub fn expected_points(ctx: &GameContext) -> Option<(f64, f64)> {
        let home = &ctx.home_stats;
        let away = &ctx.away_stats;
        if home.recent_avg_points <= 0.0 && away.recent_avg_points <= 0.0 {
            return None;
        }
        Some((
            (home.recent_avg_points + away.recent_avg_allowed) / 2.0,
            (away.recent_avg_points + home.recent_avg_allowed) / 2.0,
        ))
    }
}

impl SignalModel for BaseSimulationModel {
    fn name(&self) -> &str {
        "base-simulation"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        if !has_history(&ctx.home_stats) && !has_history(&ctx.away_stats) {
            return None;
        }
        let home = strength(&ctx.home_stats);
        let away = strength(&ctx.away_stats);
        let share = if home + away > 0.0 {
            home / (home + away)
        } else {
            0.5
        };
        let p = share + self.home_advantage;
        let confidence = (50.0 + (p - 0.5).abs() * 100.0).min(85.0);

        let mut estimate = SignalEstimate::new(self.name(), p, confidence, self.weight);
        if let Some((h, a)) = Self::expected_points(ctx) {
            estimate = estimate.with_expected_total(h + a);
        }
        Some(estimate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::OddsSnapshot;

    fn stats(points_for: f64, points_against: f64, wins: u32, losses: u32) -> TeamStats {
        TeamStats {
            recent_avg_points: points_for / 10.0,
            recent_avg_allowed: points_against / 10.0,
            points_for,
            points_against,
            wins,
            losses,
        }
    }

    #[test]
    fn pythagorean_even_teams_is_half() {
        assert!((pythagorean_expectation(300.0, 300.0) - 0.5).abs() < 1e-12);
        assert!((pythagorean_expectation(0.0, 0.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn pythagorean_favors_better_differential() {
        assert!(pythagorean_expectation(350.0, 250.0) > 0.6);
    }

    #[test]
    fn stronger_home_team_favored() {
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(-110.0, -110.0))
            .with_stats(stats(300.0, 200.0, 7, 3), stats(220.0, 280.0, 3, 7));
        let est = BaseSimulationModel::default().estimate(&ctx).unwrap();
        assert!(est.home_win_prob > 0.6);
        assert!(est.confidence <= 85.0);
    }

    #[test]
    fn even_teams_get_home_bump_only() {
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(-110.0, -110.0))
            .with_stats(stats(250.0, 250.0, 5, 5), stats(250.0, 250.0, 5, 5));
        let est = BaseSimulationModel::default().estimate(&ctx).unwrap();
        assert!((est.home_win_prob - 0.53).abs() < 1e-12);
    }

    #[test]
    fn expected_total_averages_offence_and_defence() {
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(-110.0, -110.0))
            .with_stats(stats(280.0, 200.0, 6, 4), stats(240.0, 260.0, 4, 6));
        // home (28 + 26) / 2 = 27, away (24 + 20) / 2 = 22
        let (h, a) = BaseSimulationModel::expected_points(&ctx).unwrap();
        assert!((h - 27.0).abs() < 1e-12);
        assert!((a - 22.0).abs() < 1e-12);
        let est = BaseSimulationModel::default().estimate(&ctx).unwrap();
        assert!((est.expected_total.unwrap() - 49.0).abs() < 1e-12);
    }

    #[test]
    fn declines_without_history() {
        let ctx = GameContext::new("A", "B", OddsSnapshot::moneyline(-110.0, -110.0));
        assert!(BaseSimulationModel::default().estimate(&ctx).is_none());
    }
}

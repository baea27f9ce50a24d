use progno_core::BacktestResult;

/// Settlement of one bet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetOutcome {
    Win,
    Loss,
    Push,
}

/// Accumulates settled bets and produces a [`BacktestResult`].
pub struct MetricsCalculator {
    pnls: Vec<f64>,
    equity_curve: Vec<f64>,
    /// (model probability of the side bet, 1.0 if it won) per resolved bet.
    forecasts: Vec<(f64, f64)>,
    total_staked: f64,
    wins: usize,
    losses: usize,
    pushes: usize,
}

impl MetricsCalculator {
    /// Creates a new `MetricsCalculator` with the specified starting bankroll.
    #[must_use]
    pub fn new(starting_bankroll: f64) -> Self {
        Self {
            pnls: Vec::new(),
            equity_curve: vec![starting_bankroll],
            forecasts: Vec::new(),
            total_staked: 0.0,
            wins: 0,
            losses: 0,
            pushes: 0,
        }
    }

    /// Current bankroll.
    #[must_use]
    pub fn bankroll(&self) -> f64 {
        self.equity_curve.last().copied().unwrap_or(0.0)
    }

    /// Number of bets recorded, pushes included.
    #[must_use]
    pub fn bets(&self) -> usize {
        self.pnls.len()
    }

    /// Records a settled bet.
    pub fn add_bet(&mut self, stake: f64, pnl: f64, probability: f64, outcome: BetOutcome) {
        let equity = self.bankroll() + pnl;
        self.equity_curve.push(equity);
        self.pnls.push(pnl);
        self.total_staked += stake;

        match outcome {
            BetOutcome::Win => {
                self.wins += 1;
                self.forecasts.push((probability, 1.0));
            }
            BetOutcome::Loss => {
                self.losses += 1;
                self.forecasts.push((probability, 0.0));
            }
            BetOutcome::Push => self.pushes += 1,
        }
    }

    /// Calculates and returns the result.
    #[must_use]
    pub fn calculate(&self) -> BacktestResult {
        let net: f64 = self.pnls.iter().sum();
        let roi = if self.total_staked > 0.0 {
            net / self.total_staked
        } else {
            0.0
        };

        let resolved = self.wins + self.losses;
        let win_rate = if resolved > 0 {
            self.wins as f64 / resolved as f64
        } else {
            0.0
        };

        BacktestResult {
            roi,
            win_rate,
            bets: self.pnls.len(),
            wins: self.wins,
            losses: self.losses,
            pushes: self.pushes,
            sharpe: trade_sharpe(&self.pnls),
            final_bankroll: self.bankroll(),
            max_drawdown: self.calculate_max_drawdown(),
            brier: brier_score(&self.forecasts),
            ece: expected_calibration_error(&self.forecasts, 10),
        }
    }

    fn calculate_max_drawdown(&self) -> f64 {
        let mut max_drawdown = 0.0_f64;
        let mut peak = self.equity_curve.first().copied().unwrap_or(0.0);

        for &equity in &self.equity_curve {
            if equity > peak {
                peak = equity;
            }
            if peak > 0.0 {
                max_drawdown = max_drawdown.max((peak - equity) / peak);
            }
        }

        max_drawdown
    }
}

/// Trade-level Sharpe: `mean(pnl) / sample_stdev(pnl) * sqrt(n)`.
///
/// Zero with fewer than two trades or no dispersion.
#[must_use]
pub fn trade_sharpe(pnls: &[f64]) -> f64 {
    let n = pnls.len();
    if n < 2 {
        return 0.0;
    }
    let n_f = n as f64;
    let mean = pnls.iter().sum::<f64>() / n_f;
    let variance = pnls.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n_f - 1.0);
    let std_dev = variance.sqrt();
    if std_dev > f64::EPSILON {
        mean / std_dev * n_f.sqrt()
    } else {
        0.0
    }
}

/// Mean squared error of probability forecasts against 0/1 outcomes.
#[must_use]
pub fn brier_score(forecasts: &[(f64, f64)]) -> f64 {
    if forecasts.is_empty() {
        return 0.0;
    }
    forecasts.iter().map(|(p, o)| (p - o).powi(2)).sum::<f64>() / forecasts.len() as f64
}

/// Expected calibration error over equal-width probability bins.
///
/// Each bin contributes `|mean forecast - hit rate|` weighted by its share of
/// forecasts.
#[must_use]
pub fn expected_calibration_error(forecasts: &[(f64, f64)], bins: usize) -> f64 {
    if forecasts.is_empty() || bins == 0 {
        return 0.0;
    }
    // (sum of forecasts, sum of outcomes, count)
    let mut buckets = vec![(0.0, 0.0, 0usize); bins];
    for &(p, o) in forecasts {
        let idx = ((p.clamp(0.0, 1.0) * bins as f64) as usize).min(bins - 1);
        let b = &mut buckets[idx];
        b.0 += p;
        b.1 += o;
        b.2 += 1;
    }
    let total = forecasts.len() as f64;
    buckets
        .iter()
        .filter(|b| b.2 > 0)
        .map(|&(sum_p, sum_o, n)| {
            let n = n as f64;
            (n / total) * (sum_p / n - sum_o / n).abs()
        })
        .sum()
}

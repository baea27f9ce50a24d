//! Chronological bankroll backtest of one parameter combination.
//!
//! For each game, in date order:
//! 1. De-vig the closing moneylines into a fair home probability.
//! 2. Evaluate the calibration model for the home side.
//! 3. Take the side whose model probability beats its fair probability, and
//!    bet it only if the edge is at least `min_edge`, the model probability
//!    is at least `min_confidence` and the side's price is inside
//!    `[odds_min, odds_max]`.
//! 4. Stake `min(kelly * kelly_fraction, max_fraction)` of the current
//!    bankroll, so results compound.
//!
//! A tie settles as a push.

use progno_core::model::model_home_probability;
use progno_core::odds::{american_to_decimal, devig, DevigMethod};
use progno_core::{
    BacktestResult, BankrollSizer, CalibrationConfig, CalibrationDataError, ModelInputs, Side,
    SizingConfig,
};

use crate::dataset::HistoricalDataset;
use crate::grid::GridPoint;
use crate::metrics::{BetOutcome, MetricsCalculator};

/// A game reduced to what the backtest reads, computed once per search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreparedGame {
    pub inputs: ModelInputs,
    pub home_odds: f64,
    pub away_odds: f64,
    /// Decimal payout per side, for settlement.
    pub home_decimal: f64,
    pub away_decimal: f64,
    pub winner: Option<Side>,
}

impl PreparedGame {
    fn odds(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.home_odds,
            Side::Away => self.away_odds,
        }
    }

    fn decimal(&self, side: Side) -> f64 {
        match side {
            Side::Home => self.home_decimal,
            Side::Away => self.away_decimal,
        }
    }
}

/// Reduces a dataset to prepared games, skipping games with malformed odds.
#[must_use]
pub fn prepare(dataset: &HistoricalDataset) -> Vec<PreparedGame> {
    dataset
        .games()
        .iter()
        .filter_map(|game| {
            let prepared = devig(game.home_odds, game.away_odds, DevigMethod::Proportional)
                .and_then(|fair| {
                    let home_decimal = american_to_decimal(game.home_odds)?;
                    let away_decimal = american_to_decimal(game.away_odds)?;
                    Ok(PreparedGame {
                        inputs: ModelInputs::from_context(&game.to_context(), fair.home),
                        home_odds: game.home_odds,
                        away_odds: game.away_odds,
                        home_decimal,
                        away_decimal,
                        winner: game.winner(),
                    })
                });
            match prepared {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(game = %game.id, error = %e, "Skipping game with malformed odds");
                    None
                }
            }
        })
        .collect()
}

/// Runs one combination over prepared games.
#[derive(Debug, Clone)]
pub struct Backtester {
    starting_bankroll: f64,
    min_bets: usize,
    sizer: BankrollSizer,
}

impl Backtester {
    #[must_use]
    pub fn new(calibration: &CalibrationConfig, sizing: &SizingConfig) -> Self {
        Self {
            starting_bankroll: calibration.starting_bankroll,
            min_bets: calibration.min_bets,
            sizer: BankrollSizer::new(sizing.clone()),
        }
    }

    #[must_use]
    pub fn starting_bankroll(&self) -> f64 {
        self.starting_bankroll
    }

    /// Backtests `point` over `games`.
    ///
    /// # Errors
    /// Returns [`CalibrationDataError::InvalidCombination`] when the odds
    /// bounds are inverted and [`CalibrationDataError::InsufficientBets`]
    /// when fewer than `min_bets` bets were placed.
    pub fn run(&self, games: &[PreparedGame], point: &GridPoint) -> Result<BacktestResult, CalibrationDataError> {
        if point.odds_min > point.odds_max {
            return Err(CalibrationDataError::InvalidCombination(format!(
                "odds_min {} exceeds odds_max {}",
                point.odds_min, point.odds_max
            )));
        }

        let mut metrics = MetricsCalculator::new(self.starting_bankroll);
        for game in games {
            let bankroll = metrics.bankroll();
            if bankroll <= 0.0 {
                break;
            }

            let home_p = model_home_probability(&game.inputs, &point.model);
            let home_edge = home_p - game.inputs.baseline;
            let (side, p, edge) = if home_edge > 0.0 {
                (Side::Home, home_p, home_edge)
            } else {
                (Side::Away, 1.0 - home_p, -home_edge)
            };

            let odds = game.odds(side);
            if edge < point.min_edge
                || p < point.min_confidence
                || odds < point.odds_min
                || odds > point.odds_max
            {
                continue;
            }

            let fraction = self.sizer.stake_fraction(p, odds, point.kelly_fraction);
            let stake = bankroll * fraction;
            if stake <= 0.0 {
                continue;
            }

            let (pnl, outcome) = match game.winner {
                None => (0.0, BetOutcome::Push),
                Some(w) if w == side => (stake * (game.decimal(side) - 1.0), BetOutcome::Win),
                Some(_) => (-stake, BetOutcome::Loss),
            };
            metrics.add_bet(stake, pnl, p, outcome);
        }

        if metrics.bets() < self.min_bets {
            return Err(CalibrationDataError::InsufficientBets {
                bets: metrics.bets(),
                required: self.min_bets,
            });
        }
        Ok(metrics.calculate())
    }
}

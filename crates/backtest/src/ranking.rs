//! Bounded leaderboards of backtested combinations.

use std::cmp::Ordering;

use progno_core::BacktestResult;
use serde::{Deserialize, Serialize};

use crate::grid::GridPoint;

/// Metric a leaderboard orders by, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankBy {
    Roi,
    Sharpe,
}

impl RankBy {
    fn score(self, result: &BacktestResult) -> f64 {
        match self {
            Self::Roi => result.roi,
            Self::Sharpe => result.sharpe,
        }
    }
}

/// A combination that qualified, with its backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedEntry {
    /// Flat grid index.
    pub index: usize,
    pub point: GridPoint,
    pub result: BacktestResult,
}

/// Top-N entries by one metric. Ties go to the lower grid index, so the
/// board is the same however the grid was split across workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    rank_by: RankBy,
    capacity: usize,
    entries: Vec<RankedEntry>,
}

impl Leaderboard {
    #[must_use]
    pub fn new(rank_by: RankBy, capacity: usize) -> Self {
        Self {
            rank_by,
            capacity: capacity.max(1),
            entries: Vec::new(),
        }
    }

    fn compare(&self, a: &RankedEntry, b: &RankedEntry) -> Ordering {
        let (sa, sb) = (self.rank_by.score(&a.result), self.rank_by.score(&b.result));
        sb.partial_cmp(&sa)
            .unwrap_or(Ordering::Equal)
            .then(a.index.cmp(&b.index))
    }

    /// Offers an entry; it is kept if it ranks within capacity.
    pub fn offer(&mut self, entry: &RankedEntry) {
        let score = self.rank_by.score(&entry.result);
        if !score.is_finite() {
            return;
        }
        if self.entries.len() == self.capacity {
            if let Some(worst) = self.entries.last() {
                if self.compare(entry, worst) != Ordering::Less {
                    return;
                }
            }
        }
        let pos = self
            .entries
            .partition_point(|e| self.compare(e, entry) == Ordering::Less);
        self.entries.insert(pos, entry.clone());
        self.entries.truncate(self.capacity);
    }

    #[must_use]
    pub fn entries(&self) -> &[RankedEntry] {
        &self.entries
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<RankedEntry> {
        self.entries
    }

    #[must_use]
    pub const fn rank_by(&self) -> RankBy {
        self.rank_by
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::ModelWeights;

    fn entry(index: usize, roi: f64, sharpe: f64) -> RankedEntry {
        RankedEntry {
            index,
            point: GridPoint {
                model: ModelWeights::default(),
                min_edge: 0.02,
                min_confidence: 0.5,
                odds_min: -300.0,
                odds_max: 300.0,
                kelly_fraction: 0.5,
            },
            result: BacktestResult {
                roi,
                win_rate: 0.5,
                bets: 10,
                wins: 5,
                losses: 5,
                pushes: 0,
                sharpe,
                final_bankroll: 1000.0,
                max_drawdown: 0.0,
                brier: 0.25,
                ece: 0.0,
            },
        }
    }

    #[test]
    fn keeps_best_in_order() {
        let mut board = Leaderboard::new(RankBy::Roi, 2);
        for e in [entry(0, 0.1, 0.0), entry(1, 0.3, 0.0), entry(2, 0.2, 0.0), entry(3, -0.1, 0.0)] {
            board.offer(&e);
        }
        let idx: Vec<usize> = board.entries().iter().map(|e| e.index).collect();
        assert_eq!(idx, vec![1, 2]);
    }

    #[test]
    fn ties_prefer_lower_index_regardless_of_arrival() {
        let mut a = Leaderboard::new(RankBy::Sharpe, 2);
        let mut b = Leaderboard::new(RankBy::Sharpe, 2);
        let es = [entry(5, 0.0, 1.0), entry(2, 0.0, 1.0), entry(9, 0.0, 1.0)];
        for e in &es {
            a.offer(e);
        }
        for e in es.iter().rev() {
            b.offer(e);
        }
        assert_eq!(a, b);
        assert_eq!(a.entries()[0].index, 2);
        assert_eq!(a.entries()[1].index, 5);
    }

    #[test]
    fn non_finite_scores_ignored() {
        let mut board = Leaderboard::new(RankBy::Roi, 3);
        board.offer(&entry(0, f64::NAN, 0.0));
        assert!(board.entries().is_empty());
    }
}

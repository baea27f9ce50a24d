//! Rolling per-factor hit rates for weight learning.
//!
//! The window only observes outcomes. Turning them into new multipliers is
//! an explicit, pure step: `aggregator.learn(&window.performance())`.

use std::collections::{BTreeMap, VecDeque};

use progno_core::{FactorPerformance, SignalEstimate, Side};

/// Default number of resolved picks remembered per factor.
pub const DEFAULT_WINDOW: usize = 50;

/// Rolling window of factor picks and whether they were right.
#[derive(Debug, Clone)]
pub struct PerformanceWindow {
    capacity: usize,
    outcomes: BTreeMap<String, VecDeque<bool>>,
}

impl Default for PerformanceWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl PerformanceWindow {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            outcomes: BTreeMap::new(),
        }
    }

    /// Records a finished game against the estimates made before it.
    ///
    /// An estimate at exactly 50% made no pick and is not scored. Draws
    /// (`winner == None`) score nothing.
    pub fn record(&mut self, contributions: &[SignalEstimate], winner: Option<Side>) {
        let Some(winner) = winner else {
            return;
        };
        for estimate in contributions {
            let picked = if estimate.home_win_prob > 0.5 {
                Side::Home
            } else if estimate.home_win_prob < 0.5 {
                Side::Away
            } else {
                continue;
            };
            let window = self
                .outcomes
                .entry(estimate.factor.clone())
                .or_insert_with(|| VecDeque::with_capacity(self.capacity));
            if window.len() == self.capacity {
                window.pop_front();
            }
            window.push_back(picked == winner);
        }
    }

    /// Win/loss counts per factor over the window.
    #[must_use]
    pub fn performance(&self) -> FactorPerformance {
        self.outcomes
            .iter()
            .fold(FactorPerformance::new(), |perf, (factor, window)| {
                let wins = window.iter().filter(|hit| **hit).count();
                let losses = window.len() - wins;
                perf.with(
                    factor.clone(),
                    u32::try_from(wins).unwrap_or(u32::MAX),
                    u32::try_from(losses).unwrap_or(u32::MAX),
                )
            })
    }

    /// Number of factors tracked.
    #[must_use]
    pub fn factors(&self) -> usize {
        self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::WeightSet;

    fn est(factor: &str, p: f64) -> SignalEstimate {
        SignalEstimate::new(factor, p, 60.0, 1.0)
    }

    #[test]
    fn records_hits_and_misses() {
        let mut window = PerformanceWindow::new(10);
        window.record(&[est("a", 0.6), est("b", 0.4)], Some(Side::Home));
        window.record(&[est("a", 0.6), est("b", 0.4)], Some(Side::Away));
        let perf = window.performance();
        assert_eq!(perf.get("a").unwrap().wins, 1);
        assert_eq!(perf.get("a").unwrap().losses, 1);
        assert_eq!(perf.get("b").unwrap().wins, 1);
    }

    #[test]
    fn window_evicts_oldest() {
        let mut window = PerformanceWindow::new(3);
        window.record(&[est("a", 0.7)], Some(Side::Away));
        for _ in 0..3 {
            window.record(&[est("a", 0.7)], Some(Side::Home));
        }
        let record = *window.performance().get("a").unwrap();
        assert_eq!((record.wins, record.losses), (3, 0));
    }

    #[test]
    fn coin_flips_and_draws_are_not_scored() {
        let mut window = PerformanceWindow::default();
        window.record(&[est("a", 0.5)], Some(Side::Home));
        window.record(&[est("b", 0.6)], None);
        assert_eq!(window.factors(), 0);
    }

    #[test]
    fn feeds_weight_update() {
        let mut window = PerformanceWindow::new(20);
        for i in 0..20 {
            let winner = if i % 4 == 0 { Side::Away } else { Side::Home };
            window.record(&[est("sharp", 0.6), est("dull", 0.4)], Some(winner));
        }
        let next = WeightSet::new().update(&window.performance(), &["sharp", "dull"]);
        assert!(next.get("sharp") > next.get("dull"));
    }
}

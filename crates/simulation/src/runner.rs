//! Simulation Runner.
//!
//! Runs `K` perturbed copies of a game through the aggregator on a bounded
//! rayon pool and folds the draws into one confidence-weighted consensus.
//!
//! ```text
//! consensus_calibration = base + slope * majority_share     (0.6 + 0.3 * share)
//! simulation_boost      = min(0.05, (K - 1) / 2000)
//! final_confidence      = min(ceiling, avg_confidence * consensus_calibration + boost)
//! quality               = 0.4 * final_confidence + 0.3 * |edge| + 0.2 * share + 0.1 * min(1, K / 500)
//! ```
//!
//! `K` in these formulas is the number of draws that actually completed, so a
//! run cut short by its budget is scored on what it has.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use progno_core::config::MAX_SIMULATION_ITERATIONS;
use progno_core::{
    BetMarket, EngineConfig, EnsembleResult, GameContext, NeutralReason, Pick, Side,
    SimulationIterationError, SimulationTuning,
};
use progno_signals::Aggregator;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::perturb::Perturbation;

/// Absolute ceiling on final confidence, whatever the tuning says.
pub const CONFIDENCE_CEILING: f64 = 0.85;

/// Calibrated confidence of a run, before quality scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibratedConfidence {
    pub consensus_calibration: f64,
    pub simulation_boost: f64,
    pub final_confidence: f64,
}

/// Applies the consensus calibration, iteration boost and ceiling.
///
/// For a fixed `completed`, the result never decreases as `share` grows: a
/// negative slope is treated as flat and a negative confidence as zero.
#[must_use]
pub fn calibrate_confidence(
    tuning: &SimulationTuning,
    avg_confidence: f64,
    share: f64,
    completed: usize,
) -> CalibratedConfidence {
    let ceiling = tuning.confidence_ceiling.clamp(0.0, CONFIDENCE_CEILING);
    let consensus_calibration = tuning.consensus_base + tuning.consensus_slope.max(0.0) * share;
    let simulation_boost = ((completed as f64 - 1.0) / 2000.0).clamp(0.0, 0.05);
    let final_confidence = (avg_confidence.max(0.0) * consensus_calibration + simulation_boost)
        .clamp(0.0, ceiling);
    CalibratedConfidence {
        consensus_calibration,
        simulation_boost,
        final_confidence,
    }
}

/// Cooperative cancellation flag shared with a running simulation.
///
/// Cancelling stops new draws from starting; draws already running finish
/// and are aggregated.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Seed for reproducible runs; a random seed is drawn per run when unset.
    pub seed: Option<u64>,
    /// Wall-clock budget per run.
    pub time_budget: Option<Duration>,
    /// Worker threads; 0 uses rayon's default.
    pub worker_threads: usize,
    pub perturbation: Perturbation,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: None,
            time_budget: None,
            worker_threads: 0,
            perturbation: Perturbation::default(),
        }
    }
}

impl SimulationConfig {
    /// Sets the seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the time budget.
    #[must_use]
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Sets the worker count.
    #[must_use]
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }
}

impl From<&EngineConfig> for SimulationConfig {
    fn from(engine: &EngineConfig) -> Self {
        Self {
            seed: engine.seed,
            time_budget: engine.time_budget_ms.map(Duration::from_millis),
            worker_threads: engine.worker_threads,
            perturbation: Perturbation::default(),
        }
    }
}

/// Confidence-weighted consensus over recommended bets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusBet {
    pub market: BetMarket,
    pub side: Side,
    /// Share of completed draws recommending this exact bet.
    pub share: f64,
    /// Posted price of the side on the unperturbed line.
    pub american_odds: f64,
}

/// Result of a simulation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustedPrediction {
    pub consensus_winner: Pick,
    /// Share of completed draws that picked the consensus winner.
    pub consensus_share: f64,
    #[serde(default)]
    pub consensus_bet: Option<ConsensusBet>,
    /// Confidence-weighted mean home probability across draws.
    pub avg_home_prob: f64,
    /// Confidence-weighted mean confidence, as a fraction.
    pub avg_confidence: f64,
    /// Confidence-weighted mean edge, in points.
    pub avg_edge: f64,
    /// Confidence-weighted mean edge over the market for the consensus side, in points.
    #[serde(default)]
    pub avg_market_edge: Option<f64>,
    pub consensus_calibration: f64,
    pub simulation_boost: f64,
    /// Final confidence in [0, 0.85].
    pub final_confidence: f64,
    pub quality: f64,
    pub iterations_requested: usize,
    pub iterations_completed: usize,
    pub iterations_failed: usize,
    /// Draws never started because of the budget or cancellation.
    pub iterations_skipped: usize,
    #[serde(default)]
    pub neutral_reason: Option<NeutralReason>,
}

impl AdjustedPrediction {
    fn neutral(requested: usize, failed: usize, skipped: usize) -> Self {
        Self {
            consensus_winner: Pick::NoPrediction,
            consensus_share: 0.0,
            consensus_bet: None,
            avg_home_prob: 0.5,
            avg_confidence: 0.0,
            avg_edge: 0.0,
            avg_market_edge: None,
            consensus_calibration: 0.0,
            simulation_boost: 0.0,
            final_confidence: 0.0,
            quality: 0.0,
            iterations_requested: requested,
            iterations_completed: 0,
            iterations_failed: failed,
            iterations_skipped: skipped,
            neutral_reason: Some(NeutralReason::AllIterationsFailed),
        }
    }

    /// Mean probability of the consensus side; 0.5 with no consensus.
    #[must_use]
    pub fn win_probability(&self) -> f64 {
        match self.consensus_winner {
            Pick::Home => self.avg_home_prob,
            Pick::Away => 1.0 - self.avg_home_prob,
            Pick::NoPrediction => 0.5,
        }
    }

    /// True when the run was cut short.
    #[must_use]
    pub const fn is_partial(&self) -> bool {
        self.iterations_skipped > 0
    }
}

enum Draw {
    Done(EnsembleResult),
    Failed,
    Skipped,
}

#[derive(Default)]
struct Tally {
    weighted: f64,
    count: usize,
}

/// Runs perturbed predictions in parallel.
pub struct SimulationRunner {
    aggregator: Aggregator,
    config: SimulationConfig,
    pool: rayon::ThreadPool,
}

impl SimulationRunner {
    /// Builds a runner with its own worker pool.
    ///
    /// # Errors
    /// Returns an error if the thread pool cannot be created.
    pub fn new(aggregator: Aggregator, config: SimulationConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("progno-sim-{i}"))
            .build()
            .context("Failed to create simulation thread pool")?;
        Ok(Self {
            aggregator,
            config,
            pool,
        })
    }

    #[must_use]
    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// Swaps in an aggregator for a new parameter generation.
    pub fn set_aggregator(&mut self, aggregator: Aggregator) {
        self.aggregator = aggregator;
    }

    #[must_use]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Runs `k` draws (clamped to [1, 1000]) with variance factor `variance`.
    #[must_use]
    pub fn simulate(&self, ctx: &GameContext, k: usize, variance: f64) -> AdjustedPrediction {
        self.simulate_with_cancel(ctx, k, variance, &CancelToken::new())
    }

    /// Like [`simulate`](Self::simulate), stopping early once `cancel` fires.
    #[must_use]
    pub fn simulate_with_cancel(
        &self,
        ctx: &GameContext,
        k: usize,
        variance: f64,
        cancel: &CancelToken,
    ) -> AdjustedPrediction {
        let k = k.clamp(1, MAX_SIMULATION_ITERATIONS);
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let deadline = self.config.time_budget.map(|b| Instant::now() + b);
        let perturbation = self.config.perturbation;

        tracing::debug!(game = %ctx.game_id, k, variance, seed, "Starting simulation");

        let draws: Vec<Draw> = self.pool.install(|| {
            (0..k)
                .into_par_iter()
                .map(|i| {
                    if cancel.is_cancelled() || deadline.is_some_and(|d| Instant::now() >= d) {
                        return Draw::Skipped;
                    }
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    rng.set_stream(i as u64);
                    let perturbed = perturbation.apply(ctx, variance, &mut rng);
                    match self.aggregator.try_predict(&perturbed) {
                        Ok(result) => Draw::Done(result),
                        Err(source) => {
                            let e = SimulationIterationError::DegenerateInput {
                                iteration: i,
                                source,
                            };
                            tracing::warn!(iteration = i, error = %e, "Simulation iteration failed, skipping");
                            Draw::Failed
                        }
                    }
                })
                .collect()
        });

        let prediction = self.aggregate(ctx, k, &draws);
        tracing::info!(
            game = %ctx.game_id,
            completed = prediction.iterations_completed,
            failed = prediction.iterations_failed,
            skipped = prediction.iterations_skipped,
            winner = ?prediction.consensus_winner,
            confidence = prediction.final_confidence,
            "Simulation complete"
        );
        prediction
    }

    fn aggregate(&self, ctx: &GameContext, requested: usize, draws: &[Draw]) -> AdjustedPrediction {
        let failed = draws.iter().filter(|d| matches!(d, Draw::Failed)).count();
        let skipped = draws.iter().filter(|d| matches!(d, Draw::Skipped)).count();
        let results: Vec<&EnsembleResult> = draws
            .iter()
            .filter_map(|d| match d {
                Draw::Done(r) => Some(r),
                _ => None,
            })
            .collect();

        if results.is_empty() {
            return AdjustedPrediction::neutral(requested, failed, skipped);
        }
        let completed = results.len();

        let mut home = Tally::default();
        let mut away = Tally::default();
        let mut bets: BTreeMap<(Side, BetMarket), Tally> = BTreeMap::new();
        let (mut w_sum, mut conf_sum, mut edge_sum, mut prob_sum) = (0.0, 0.0, 0.0, 0.0);

        for r in &results {
            let w = r.confidence / 100.0;
            w_sum += w;
            conf_sum += w * w;
            edge_sum += w * r.edge;
            prob_sum += w * r.home_win_prob;

            let tally = match r.pick {
                Pick::Home => Some(&mut home),
                Pick::Away => Some(&mut away),
                Pick::NoPrediction => None,
            };
            if let Some(t) = tally {
                t.weighted += w;
                t.count += 1;
            }
            if let Some(bet) = &r.recommended_bet {
                let t = bets.entry((bet.side, bet.market)).or_default();
                t.weighted += w;
                t.count += 1;
            }
        }

        let mean = |sum: f64, plain: f64| {
            if w_sum > 0.0 {
                sum / w_sum
            } else {
                plain
            }
        };
        let n = completed as f64;
        let avg_confidence = mean(
            conf_sum,
            results.iter().map(|r| r.confidence / 100.0).sum::<f64>() / n,
        );
        let avg_edge = mean(edge_sum, results.iter().map(|r| r.edge).sum::<f64>() / n);
        let avg_home_prob = mean(
            prob_sum,
            results.iter().map(|r| r.home_win_prob).sum::<f64>() / n,
        );

        let winner = if home.count == 0 && away.count == 0 {
            Pick::NoPrediction
        } else if outranks(&away, &home) {
            Pick::Away
        } else {
            Pick::Home
        };
        let winner_count = match winner {
            Pick::Home => home.count,
            Pick::Away => away.count,
            Pick::NoPrediction => 0,
        };
        let share = winner_count as f64 / n;

        let consensus_bet = bets
            .iter()
            .fold(None::<(&(Side, BetMarket), &Tally)>, |best, (key, t)| match best {
                Some((_, b)) if !outranks(t, b) => best,
                _ => Some((key, t)),
            })
            .map(|((side, market), t)| ConsensusBet {
                market: *market,
                side: *side,
                share: t.count as f64 / n,
                american_odds: ctx.odds.for_side(*side),
            });

        let avg_market_edge = winner.side().and_then(|side| {
            let (sum, weight) = results
                .iter()
                .filter(|r| r.pick.side() == Some(side))
                .filter_map(|r| r.market_edge.map(|e| (e, r.confidence / 100.0)))
                .fold((0.0, 0.0), |(s, ws), (e, w)| (s + e * w, ws + w));
            (weight > 0.0).then(|| sum / weight)
        });

        let CalibratedConfidence {
            consensus_calibration,
            simulation_boost,
            final_confidence,
        } = calibrate_confidence(&self.aggregator.params().simulation, avg_confidence, share, completed);
        let quality = 0.4 * final_confidence
            + 0.3 * (avg_edge / 100.0).abs()
            + 0.2 * share
            + 0.1 * (n / 500.0).min(1.0);

        AdjustedPrediction {
            consensus_winner: winner,
            consensus_share: share,
            consensus_bet,
            avg_home_prob,
            avg_confidence,
            avg_edge,
            avg_market_edge,
            consensus_calibration,
            simulation_boost,
            final_confidence,
            quality,
            iterations_requested: requested,
            iterations_completed: completed,
            iterations_failed: failed,
            iterations_skipped: skipped,
            neutral_reason: (winner == Pick::NoPrediction).then_some(NeutralReason::NoSignals),
        }
    }
}

/// Weighted total first, then raw count.
fn outranks(a: &Tally, b: &Tally) -> bool {
    a.weighted > b.weighted || (a.weighted == b.weighted && a.count > b.count)
}

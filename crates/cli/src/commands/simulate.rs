//! `progno simulate`: Monte Carlo consensus plus a sized bet.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use progno_core::{AppConfig, BankrollSizer, BetSizeRecommendation, RiskProfile};
use progno_signals::Aggregator;
use progno_simulation::{AdjustedPrediction, SimulationConfig, SimulationRunner};
use rust_decimal::Decimal;
use serde::Serialize;

use super::{load_game, load_parameters, print_json};

/// Arguments for the simulate command.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Game context JSON file
    #[arg(short, long)]
    pub game: PathBuf,

    /// Iterations (capped at 1000); defaults to engine.simulation_iterations
    #[arg(short = 'k', long)]
    pub iterations: Option<usize>,

    /// Variance factor for stat jitter; defaults to engine.variance_factor
    #[arg(long)]
    pub variance: Option<f64>,

    /// RNG seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Bankroll to size the consensus bet against
    #[arg(long)]
    pub bankroll: Option<Decimal>,

    /// Risk profile: conservative, balanced or aggressive
    #[arg(long, default_value = "balanced")]
    pub risk: RiskProfile,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SimulationReport {
    prediction: AdjustedPrediction,
    #[serde(skip_serializing_if = "Option::is_none")]
    sizing: Option<BetSizeRecommendation>,
}

pub fn run(args: SimulateArgs, config: &AppConfig) -> Result<()> {
    let ctx = load_game(&args.game)?;
    let params = Arc::new(load_parameters(config)?);
    let kelly = params.kelly_fraction;

    let mut sim_config = SimulationConfig::from(&config.engine);
    if let Some(seed) = args.seed {
        sim_config = sim_config.with_seed(seed);
    }
    let runner = SimulationRunner::new(Aggregator::standard(params), sim_config)?;

    let k = args.iterations.unwrap_or_else(|| config.engine.iterations());
    let variance = args.variance.unwrap_or(config.engine.variance_factor);
    let prediction = runner.simulate(&ctx, k, variance);

    let sizing = match (args.bankroll, prediction.consensus_winner.side()) {
        (Some(bankroll), Some(side)) => {
            let odds = prediction
                .consensus_bet
                .as_ref()
                .map_or_else(|| ctx.odds.for_side(side), |b| b.american_odds);
            let sizer = BankrollSizer::calibrated(config.sizing.clone(), kelly);
            let edge = prediction.avg_market_edge.unwrap_or(0.0);
            Some(sizer.size_bet(
                prediction.win_probability(),
                edge,
                prediction.quality,
                odds,
                bankroll,
                args.risk,
            ))
        }
        _ => None,
    };

    if args.json {
        return print_json(&SimulationReport { prediction, sizing });
    }

    println!("\n=== {} @ {} ({} draws) ===\n", ctx.away_team, ctx.home_team, prediction.iterations_requested);
    println!(
        "  Consensus: {:?}  share {:.1}%  win prob {:.1}%",
        prediction.consensus_winner,
        prediction.consensus_share * 100.0,
        prediction.win_probability() * 100.0
    );
    println!(
        "  Confidence: avg {:.3} x calibration {:.3} + boost {:.3} = {:.3}",
        prediction.avg_confidence,
        prediction.consensus_calibration,
        prediction.simulation_boost,
        prediction.final_confidence
    );
    println!("  Edge {:.1} pts  quality {:.3}", prediction.avg_edge, prediction.quality);
    if let Some(bet) = &prediction.consensus_bet {
        println!(
            "  Consensus bet: {:?} {:?} at {:+.0} ({:.1}% of draws)",
            bet.market,
            bet.side,
            bet.american_odds,
            bet.share * 100.0
        );
    }
    println!(
        "  Draws: {} completed, {} failed, {} skipped",
        prediction.iterations_completed, prediction.iterations_failed, prediction.iterations_skipped
    );
    if let Some(reason) = prediction.neutral_reason {
        println!("  No prediction: {reason:?}");
    }
    if let Some(rec) = &sizing {
        println!("\n  Wager: {} ({:?})", rec.wager, rec.method);
        for line in &rec.reasoning {
            println!("    - {line}");
        }
    }
    println!();
    Ok(())
}

//! `progno predict`: one ensemble pass over a game file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use progno_core::{AppConfig, EnsembleResult};
use progno_signals::Aggregator;

use super::{load_game, load_parameters, print_json};

/// Arguments for the predict command.
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// Game context JSON file
    #[arg(short, long)]
    pub game: PathBuf,

    /// Print the full result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PredictArgs, config: &AppConfig) -> Result<()> {
    let ctx = load_game(&args.game)?;
    let params = Arc::new(load_parameters(config)?);
    let aggregator = Aggregator::standard(params);
    let result = aggregator.predict(&ctx);

    if args.json {
        return print_json(&result);
    }
    print_summary(&ctx.home_team, &ctx.away_team, &result);
    Ok(())
}

pub(crate) fn print_summary(home: &str, away: &str, result: &EnsembleResult) {
    println!("\n=== {away} @ {home} ===\n");
    println!(
        "  Home {:.1}%  |  Away {:.1}%",
        result.home_win_prob * 100.0,
        result.away_win_prob * 100.0
    );
    println!(
        "  Pick: {:?}  edge {:.1} pts  confidence {:.1}  consensus {:?} (sd {:.3})",
        result.pick, result.edge, result.confidence, result.consensus, result.disagreement
    );
    if let Some(total) = result.expected_total {
        println!("  Expected total: {total:.1}");
    }
    if let Some(edge) = result.market_edge {
        println!("  Edge over market: {edge:+.1} pts");
    }
    if let Some(bet) = &result.recommended_bet {
        let line = bet.line.map(|l| format!(" {l:+.1}")).unwrap_or_default();
        println!("  Recommended: {:?} {:?}{line} at {:+.0}", bet.market, bet.side, bet.american_odds);
    }
    if let Some(reason) = result.neutral_reason {
        println!("  No prediction: {reason:?}");
    }

    println!("\n  {:<20} {:>8} {:>8} {:>8}", "factor", "home%", "conf", "weight");
    for c in &result.contributions {
        println!(
            "  {:<20} {:>8.1} {:>8.1} {:>8.2}",
            c.factor,
            c.home_win_prob * 100.0,
            c.confidence,
            c.weight
        );
    }
    println!();
}

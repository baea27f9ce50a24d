//! `progno size-bet`: fractional Kelly sizing from the command line.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use progno_core::{AppConfig, BankrollSizer, RiskProfile};
use rust_decimal::Decimal;

use super::{load_parameters, print_json};

/// Arguments for the size-bet command.
#[derive(Args, Debug)]
pub struct SizeBetArgs {
    /// Calibrated win probability of the side, in (0, 1)
    #[arg(short, long)]
    pub probability: f64,

    /// Edge over the market, in points
    #[arg(short, long)]
    pub edge: f64,

    /// Prediction quality in [0, 1]
    #[arg(short, long, default_value = "0.5")]
    pub quality: f64,

    /// American odds of the side (e.g. -110, 150)
    #[arg(short, long, allow_hyphen_values = true)]
    pub odds: f64,

    /// Current bankroll
    #[arg(short, long)]
    pub bankroll: Decimal,

    /// Risk profile: conservative, balanced or aggressive
    #[arg(short, long, default_value = "balanced")]
    pub risk: RiskProfile,

    /// Print the recommendation as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: SizeBetArgs, config: &AppConfig) -> Result<()> {
    let params = Arc::new(load_parameters(config)?);
    let sizer = BankrollSizer::calibrated(config.sizing.clone(), params.kelly_fraction);
    let rec = sizer.size_bet(
        args.probability,
        args.edge,
        args.quality,
        args.odds,
        args.bankroll,
        args.risk,
    );

    if args.json {
        return print_json(&rec);
    }

    println!("\n=== Bet Sizing ({:?}) ===\n", args.risk);
    println!("  Full Kelly: {:.4}", rec.kelly_fraction);
    println!(
        "  Applied:    {:.4}{}",
        rec.applied_fraction,
        if rec.capped { " (capped)" } else { "" }
    );
    println!("  Wager:      {}", rec.wager);
    for line in &rec.reasoning {
        println!("    - {line}");
    }
    println!();
    Ok(())
}

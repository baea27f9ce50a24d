//! `progno lines`: consensus pricing across sources.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use progno_core::odds::{find_arbitrage, Arbitrage, ConsensusLine, DEFAULT_OUTLIER_THRESHOLD};
use progno_core::{DevigMethod, LineNormalizer, LineQuote};
use serde::Serialize;

use super::print_json;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Proportional,
    Shin,
}

impl From<MethodArg> for DevigMethod {
    fn from(m: MethodArg) -> Self {
        match m {
            MethodArg::Proportional => Self::Proportional,
            MethodArg::Shin => Self::Shin,
        }
    }
}

/// Arguments for the lines command.
#[derive(Args, Debug)]
pub struct LinesArgs {
    /// JSON array of quotes: [{"source", "home", "away", "sharpness"?}]
    #[arg(short, long)]
    pub quotes: PathBuf,

    /// De-vig method
    #[arg(short, long, value_enum, default_value = "proportional")]
    pub method: MethodArg,

    /// Deviation from consensus (probability) that flags an outlier
    #[arg(long, default_value_t = DEFAULT_OUTLIER_THRESHOLD)]
    pub outlier_threshold: f64,

    /// Total stake to split across an arbitrage
    #[arg(long, default_value = "100")]
    pub stake: f64,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct LinesReport {
    consensus: ConsensusLine,
    #[serde(skip_serializing_if = "Option::is_none")]
    arbitrage: Option<Arbitrage>,
}

pub fn run(args: LinesArgs) -> Result<()> {
    let content = std::fs::read_to_string(&args.quotes)
        .with_context(|| format!("Failed to read quotes file {}", args.quotes.display()))?;
    let quotes: Vec<LineQuote> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse quotes file {}", args.quotes.display()))?;

    let normalizer = LineNormalizer::new(args.method.into(), args.outlier_threshold);
    let consensus = normalizer
        .consensus(&quotes)
        .context("No usable quotes")?;
    let arbitrage = find_arbitrage(&quotes, args.stake);

    if args.json {
        return print_json(&LinesReport {
            consensus,
            arbitrage,
        });
    }

    println!("\n=== Consensus over {} sources ({:?}) ===\n", consensus.sources, args.method);
    println!(
        "  Home {:.2}% ({:+.0})  |  Away {:.2}% ({:+.0})",
        consensus.home_prob * 100.0,
        consensus.fair_home,
        consensus.away_prob * 100.0,
        consensus.fair_away
    );
    if consensus.outliers.is_empty() {
        println!("  No outliers beyond {:.1}%", args.outlier_threshold * 100.0);
    }
    for o in &consensus.outliers {
        println!(
            "  Outlier: {:<16} {:+.2}%  soft on {}",
            o.source,
            o.deviation * 100.0,
            o.soft_side
        );
    }
    match &arbitrage {
        Some(arb) => {
            println!(
                "\n  Arbitrage: home {:+.0} @ {} / away {:+.0} @ {}",
                arb.home_odds, arb.home_source, arb.away_odds, arb.away_source
            );
            println!(
                "  Stake {:.2} / {:.2} for {:.2}% profit",
                arb.home_stake, arb.away_stake, arb.profit_pct
            );
        }
        None => println!("\n  No arbitrage"),
    }
    println!();
    Ok(())
}

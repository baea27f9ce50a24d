//! `progno calibrate`: grid search over historical games.
//!
//! The search is CPU-bound and runs on a blocking thread. Ctrl-C stops it
//! between chunks; the checkpoint (when configured) lets the next run pick
//! up where this one stopped.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use progno_backtest::{CalibrationSearch, HistoricalDataset, ParameterGrid, RankedEntry};
use progno_core::{AppConfig, ParameterFile, ParameterRepository};

use super::{load_parameters, print_json};

/// Arguments for the calibrate command.
#[derive(Args, Debug)]
pub struct CalibrateArgs {
    /// Historical games (.csv or .json)
    #[arg(short, long)]
    pub data: PathBuf,

    /// Grid definition JSON; defaults to the built-in grid
    #[arg(short, long)]
    pub grid: Option<PathBuf>,

    /// Write the best combination by ROI to the parameters file
    #[arg(long)]
    pub publish: bool,

    /// Rows to print per leaderboard
    #[arg(long, default_value = "10")]
    pub top: usize,

    /// Print the ranked sets as JSON
    #[arg(long)]
    pub json: bool,
}

fn load_grid(path: Option<&Path>) -> Result<ParameterGrid> {
    let Some(path) = path else {
        return Ok(ParameterGrid::default());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read grid file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse grid file {}", path.display()))
}

pub async fn run(args: CalibrateArgs, config: &AppConfig) -> Result<()> {
    let dataset = HistoricalDataset::load(&args.data)
        .with_context(|| format!("Failed to load dataset {}", args.data.display()))?;
    let grid = load_grid(args.grid.as_deref())?;
    let base = load_parameters(config)?;

    tracing::info!(
        dataset = dataset.name(),
        games = dataset.len(),
        combinations = grid.len(),
        "Starting calibration search"
    );

    let cancel = Arc::new(AtomicBool::new(false));
    let signal_flag = Arc::clone(&cancel);
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current chunk");
            signal_flag.store(true, Ordering::SeqCst);
        }
    });

    let search = CalibrationSearch::from_config(config);
    let worker_flag = Arc::clone(&cancel);
    let ranked = tokio::task::spawn_blocking(move || {
        search.calibrate_with_cancel(&dataset, &grid, &worker_flag)
    })
    .await
    .context("Calibration task panicked")?
    .context("Calibration search failed")?;
    ctrl_c.abort();

    let published = if args.publish && ranked.complete {
        match ranked.best_by_roi() {
            Some(best) => {
                let params = ranked.to_parameter_set(best, &base);
                ParameterFile::new(&config.parameters_path)
                    .save(&params)
                    .context("Failed to save calibrated parameters")?;
                tracing::info!(
                    id = %params.id,
                    path = %config.parameters_path,
                    roi = best.result.roi,
                    "Published calibrated parameters"
                );
                Some(params)
            }
            None => {
                tracing::warn!("No combination placed enough bets, nothing published");
                None
            }
        }
    } else {
        if args.publish {
            tracing::warn!("Search did not finish, nothing published");
        }
        None
    };

    if args.json {
        return print_json(&ranked);
    }

    println!("\n=== Calibration: {} ({} games) ===\n", ranked.dataset.name, ranked.dataset.games);
    println!(
        "  Evaluated {} of {} combinations, {} rejected{}",
        ranked.evaluated,
        ranked.total,
        ranked.rejected,
        if ranked.complete { "" } else { " (partial)" }
    );
    print_board("By ROI", &ranked.by_roi, args.top);
    print_board("By Sharpe", &ranked.by_sharpe, args.top);
    if let Some(params) = published {
        println!("\n  Published {} to {}", params.id, config.parameters_path);
    }
    println!();
    Ok(())
}

fn print_board(title: &str, entries: &[RankedEntry], top: usize) {
    println!("\n  {title}");
    println!(
        "  {:>6} {:>8} {:>7} {:>5} {:>6} {:>6} {:>9} {:>6}",
        "index", "roi%", "sharpe", "bets", "win%", "edge", "odds", "kelly"
    );
    for e in entries.iter().take(top) {
        println!(
            "  {:>6} {:>8.2} {:>7.2} {:>5} {:>6.1} {:>6.3} {:>4.0}/{:<4.0} {:>6.2}",
            e.index,
            e.result.roi * 100.0,
            e.result.sharpe,
            e.result.bets,
            e.result.win_rate * 100.0,
            e.point.min_edge,
            e.point.odds_min,
            e.point.odds_max,
            e.point.kelly_fraction
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_grid_file_uses_default_grid() {
        assert_eq!(load_grid(None).unwrap(), ParameterGrid::default());
    }

    #[test]
    fn grid_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let grid = ParameterGrid {
            kelly_fraction: vec![0.25],
            ..ParameterGrid::default()
        };
        std::fs::write(&path, serde_json::to_string(&grid).unwrap()).unwrap();
        assert_eq!(load_grid(Some(&path)).unwrap(), grid);
    }
}

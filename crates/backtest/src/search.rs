//! Offline Calibration Search.
//!
//! Evaluates every grid combination against a historical dataset in parallel,
//! keeps the top combinations by ROI and by Sharpe, and checkpoints after
//! each chunk so an interrupted search resumes where it stopped.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use chrono::Utc;
use progno_core::{
    AppConfig, BacktestResult, CalibrationConfig, CalibrationDataError, CalibrationParameterSet,
    DatasetIdentity, ParameterRepository, SizingConfig,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::checkpoint::{Checkpoint, CheckpointFile};
use crate::dataset::HistoricalDataset;
use crate::engine::{prepare, Backtester};
use crate::grid::ParameterGrid;
use crate::ranking::{Leaderboard, RankBy, RankedEntry};

/// Output of a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedParameterSets {
    pub dataset: DatasetIdentity,
    pub by_roi: Vec<RankedEntry>,
    pub by_sharpe: Vec<RankedEntry>,
    /// Combinations evaluated, qualifying or not.
    pub evaluated: usize,
    /// Combinations excluded (too few bets, invalid bounds).
    pub rejected: usize,
    /// Grid size.
    pub total: usize,
    /// False if the search was cancelled before covering the grid.
    pub complete: bool,
}

impl RankedParameterSets {
    #[must_use]
    pub fn best_by_roi(&self) -> Option<&RankedEntry> {
        self.by_roi.first()
    }

    #[must_use]
    pub fn best_by_sharpe(&self) -> Option<&RankedEntry> {
        self.by_sharpe.first()
    }

    /// Builds a production parameter set from a ranked entry.
    ///
    /// Factor weight multipliers and simulation tuning are carried over from
    /// `base`; everything the grid searched comes from the entry.
    #[must_use]
    pub fn to_parameter_set(&self, entry: &RankedEntry, base: &CalibrationParameterSet) -> CalibrationParameterSet {
        CalibrationParameterSet {
            id: Uuid::new_v4(),
            generated_at: Utc::now(),
            dataset: Some(self.dataset.clone()),
            weights: base.weights.clone(),
            min_edge: entry.point.min_edge,
            min_confidence: entry.point.min_confidence,
            odds_min: entry.point.odds_min,
            odds_max: entry.point.odds_max,
            kelly_fraction: entry.point.kelly_fraction,
            model: entry.point.model,
            simulation: base.simulation,
            backtest: Some(entry.result.clone()),
        }
    }
}

/// Grid search driver.
#[derive(Debug, Clone)]
pub struct CalibrationSearch {
    config: CalibrationConfig,
    backtester: Backtester,
    settings_fingerprint: String,
}

/// Hash of every setting that changes a combination's result or ranking.
///
/// Chunk size and checkpoint path are left out: they do not change the
/// outcome.
#[must_use]
pub fn settings_fingerprint(config: &CalibrationConfig, sizing: &SizingConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.starting_bankroll.to_le_bytes());
    hasher.update((config.min_bets as u64).to_le_bytes());
    hasher.update((config.top_n as u64).to_le_bytes());
    for v in [
        sizing.max_bankroll_fraction,
        sizing.min_unit,
        sizing.conservative_multiplier,
        sizing.balanced_multiplier,
        sizing.aggressive_multiplier,
    ] {
        hasher.update(v.to_le_bytes());
    }
    hex::encode(hasher.finalize())
}

impl CalibrationSearch {
    #[must_use]
    pub fn new(config: CalibrationConfig, sizing: &SizingConfig) -> Self {
        let backtester = Backtester::new(&config, sizing);
        let settings_fingerprint = settings_fingerprint(&config, sizing);
        Self {
            config,
            backtester,
            settings_fingerprint,
        }
    }

    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.calibration.clone(), &config.sizing)
    }

    /// Runs the whole grid.
    ///
    /// # Errors
    /// Returns [`CalibrationDataError::EmptyDataset`] when there is nothing
    /// to backtest, or a grid validation error.
    pub fn calibrate(&self, dataset: &HistoricalDataset, grid: &ParameterGrid) -> Result<RankedParameterSets, CalibrationDataError> {
        self.calibrate_with_cancel(dataset, grid, &AtomicBool::new(false))
    }

    /// Runs the grid until done or until `cancel` is set. Cancellation is
    /// checked between chunks; the partial ranking is returned with
    /// `complete == false` and the checkpoint is left for a later resume.
    ///
    /// # Errors
    /// See [`calibrate`](Self::calibrate).
    pub fn calibrate_with_cancel(
        &self,
        dataset: &HistoricalDataset,
        grid: &ParameterGrid,
        cancel: &AtomicBool,
    ) -> Result<RankedParameterSets, CalibrationDataError> {
        if dataset.is_empty() {
            return Err(CalibrationDataError::EmptyDataset);
        }
        grid.validate()?;
        let games = prepare(dataset);
        if games.is_empty() {
            return Err(CalibrationDataError::EmptyDataset);
        }

        let total = grid.len();
        let grid_fingerprint = grid.fingerprint();
        let checkpoint_file = self.config.checkpoint_path.as_ref().map(CheckpointFile::new);
        let mut state = self
            .resume(checkpoint_file.as_ref(), dataset.fingerprint(), &grid_fingerprint)
            .unwrap_or_else(|| Checkpoint {
                dataset_fingerprint: dataset.fingerprint().to_string(),
                grid_fingerprint: grid_fingerprint.clone(),
                settings_fingerprint: self.settings_fingerprint.clone(),
                next_index: 0,
                evaluated: 0,
                rejected: 0,
                by_roi: Leaderboard::new(RankBy::Roi, self.config.top_n),
                by_sharpe: Leaderboard::new(RankBy::Sharpe, self.config.top_n),
                saved_at: Utc::now(),
            });

        tracing::info!(
            dataset = %dataset.name(),
            games = games.len(),
            combinations = total,
            start = state.next_index,
            "Starting calibration search"
        );

        let chunk = self.config.checkpoint_every.max(1);
        while state.next_index < total {
            if cancel.load(Ordering::Relaxed) {
                tracing::info!(next_index = state.next_index, "Calibration search cancelled");
                break;
            }
            let start = state.next_index;
            let end = start.saturating_add(chunk).min(total);

            let results: Vec<(usize, Result<RankedEntry, CalibrationDataError>)> = (start..end)
                .into_par_iter()
                .filter_map(|index| {
                    let point = grid.combination(index)?;
                    let outcome = self
                        .backtester
                        .run(&games, &point)
                        .map(|result| RankedEntry { index, point, result });
                    Some((index, outcome))
                })
                .collect();

            for (index, outcome) in results {
                state.evaluated += 1;
                match outcome {
                    Ok(entry) => {
                        state.by_roi.offer(&entry);
                        state.by_sharpe.offer(&entry);
                    }
                    Err(e) => {
                        state.rejected += 1;
                        tracing::debug!(index, error = %e, "Combination excluded");
                    }
                }
            }
            state.next_index = end;
            state.saved_at = Utc::now();

            if let Some(file) = &checkpoint_file {
                if let Err(e) = file.save(&state) {
                    tracing::warn!(path = %file.path().display(), error = %e, "Failed to write checkpoint");
                }
            }
            tracing::info!(
                evaluated = state.evaluated,
                rejected = state.rejected,
                total,
                best_roi = state.by_roi.entries().first().map(|e| e.result.roi),
                "Calibration progress"
            );
        }

        Ok(RankedParameterSets {
            dataset: dataset.identity(),
            complete: state.next_index >= total,
            evaluated: state.evaluated,
            rejected: state.rejected,
            total,
            by_roi: state.by_roi.into_entries(),
            by_sharpe: state.by_sharpe.into_entries(),
        })
    }

    fn resume(&self, file: Option<&CheckpointFile>, dataset_fp: &str, grid_fp: &str) -> Option<Checkpoint> {
        let file = file?;
        match file.load() {
            Ok(Some(ckpt)) if ckpt.matches(dataset_fp, grid_fp, &self.settings_fingerprint) => {
                tracing::info!(
                    path = %file.path().display(),
                    next_index = ckpt.next_index,
                    "Resuming calibration from checkpoint"
                );
                Some(ckpt)
            }
            Ok(Some(_)) => {
                tracing::warn!(
                    path = %file.path().display(),
                    "Checkpoint is for a different dataset, grid or settings, starting fresh"
                );
                None
            }
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(path = %file.path().display(), error = %e, "Unreadable checkpoint, starting fresh");
                None
            }
        }
    }

    /// Backtests one existing parameter set on a dataset.
    ///
    /// # Errors
    /// See [`Backtester::run`].
    pub fn evaluate(&self, dataset: &HistoricalDataset, params: &CalibrationParameterSet) -> Result<BacktestResult, CalibrationDataError> {
        let point = crate::grid::GridPoint {
            model: params.model,
            min_edge: params.min_edge,
            min_confidence: params.min_confidence,
            odds_min: params.odds_min,
            odds_max: params.odds_max,
            kelly_fraction: params.kelly_fraction,
        };
        self.backtester.run(&prepare(dataset), &point)
    }

    /// Runs the search and saves the top-by-ROI set through `repo`.
    ///
    /// Returns the ranking and the published set, if any combination
    /// qualified.
    ///
    /// # Errors
    /// Returns an error if the search cannot run or the set cannot be saved.
    pub fn calibrate_and_publish(
        &self,
        dataset: &HistoricalDataset,
        grid: &ParameterGrid,
        base: &CalibrationParameterSet,
        repo: &dyn ParameterRepository,
    ) -> Result<(RankedParameterSets, Option<CalibrationParameterSet>)> {
        let ranked = self
            .calibrate(dataset, grid)
            .context("Calibration search failed")?;
        let Some(best) = ranked.best_by_roi() else {
            tracing::warn!(
                evaluated = ranked.evaluated,
                "No combination placed enough bets, nothing published"
            );
            return Ok((ranked, None));
        };
        let params = ranked.to_parameter_set(best, base);
        repo.save(&params)
            .context("Failed to save calibrated parameters")?;
        tracing::info!(
            id = %params.id,
            roi = best.result.roi,
            sharpe = best.result.sharpe,
            bets = best.result.bets,
            "Published calibrated parameters"
        );
        Ok((ranked, Some(params)))
    }
}

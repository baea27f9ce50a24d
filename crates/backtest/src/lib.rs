//! Historical backtesting and offline Calibration Search.
//!
//! The search walks a [`ParameterGrid`] over a [`HistoricalDataset`],
//! backtests every combination with compounding Kelly stakes, and ranks the
//! survivors by ROI and by Sharpe. The winning combination becomes the
//! production [`CalibrationParameterSet`](progno_core::CalibrationParameterSet).

pub mod checkpoint;
pub mod dataset;
pub mod engine;
pub mod grid;
pub mod metrics;
pub mod ranking;
pub mod search;

pub use checkpoint::{Checkpoint, CheckpointFile};
pub use dataset::{DatasetError, HistoricalDataset, HistoricalGame};
pub use engine::{prepare, Backtester, PreparedGame};
pub use grid::{GridPoint, ParameterGrid};
pub use metrics::{BetOutcome, MetricsCalculator};
pub use ranking::{Leaderboard, RankBy, RankedEntry};
pub use search::{settings_fingerprint, CalibrationSearch, RankedParameterSets};

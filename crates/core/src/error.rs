//! Error types shared across the prediction engine.
//!
//! Only genuinely unusable input is an error. "No opinion" outcomes
//! (no signals, every simulation draw failed) are values carrying a
//! [`NeutralReason`](crate::signal::NeutralReason) instead.

use thiserror::Error;

/// Malformed or incomplete game input, rejected before any computation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InputError {
    /// A required field is empty or absent.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// American odds must be finite with magnitude of at least 100.
    #[error("invalid american odds for {field}: {value}")]
    InvalidOdds {
        /// Which price was rejected.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A numeric field is NaN, infinite, or negative where it must not be.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// Name of the field.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A probability fell outside [0, 1].
    #[error("probability out of range for {field}: {value}")]
    InvalidProbability {
        /// Name of the field.
        field: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A multi-source comparison was requested with no sources.
    #[error("no line quotes supplied")]
    NoQuotes,
}

/// One perturbed simulation draw could not be evaluated.
///
/// The runner skips and logs these; they never abort a batch.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulationIterationError {
    /// The perturbed context failed validation (e.g. odds pushed inside ±100).
    #[error("iteration {iteration}: degenerate input: {source}")]
    DegenerateInput {
        /// Zero-based iteration index.
        iteration: usize,
        /// Underlying validation failure.
        #[source]
        source: InputError,
    },
}

/// A parameter combination or dataset cannot produce a usable backtest.
///
/// Per-combination variants exclude that combination from ranking; the
/// search as a whole continues.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationDataError {
    /// Too few resolved bets for the result to mean anything.
    #[error("insufficient sample: {bets} bets, {required} required")]
    InsufficientBets {
        /// Bets placed by the combination.
        bets: usize,
        /// Minimum configured.
        required: usize,
    },

    /// The historical dataset has no games.
    #[error("historical dataset is empty")]
    EmptyDataset,

    /// The grid has an axis with no values.
    #[error("parameter grid axis '{0}' is empty")]
    EmptyGridAxis(&'static str),

    /// The combination is internally inconsistent (e.g. odds_min > odds_max).
    #[error("invalid parameter combination: {0}")]
    InvalidCombination(String),
}

/// Failure reading or writing persisted engine state.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// IO error reading/writing file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Stored data does not match what the caller expects.
    #[error("incompatible stored data: {0}")]
    Incompatible(String),
}

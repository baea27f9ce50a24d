//! Monte Carlo simulation over the ensemble.
//!
//! Each draw jitters the posted lines and team statistics, runs the full
//! aggregator, and the runner folds the draws into an
//! [`AdjustedPrediction`] with a calibrated, capped confidence.

pub mod perturb;
pub mod runner;

pub use perturb::Perturbation;
pub use runner::{
    calibrate_confidence, AdjustedPrediction, CalibratedConfidence, CancelToken, ConsensusBet,
    SimulationConfig, SimulationRunner, CONFIDENCE_CEILING,
};

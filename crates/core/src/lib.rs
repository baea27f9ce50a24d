pub mod config;
pub mod config_loader;
pub mod error;
pub mod game;
pub mod kelly;
pub mod model;
pub mod odds;
pub mod param_store;
pub mod params;
pub mod signal;

pub use config::{AppConfig, CalibrationConfig, EngineConfig, SizingConfig};
pub use config_loader::ConfigLoader;
pub use error::{CalibrationDataError, InputError, PersistenceError, SimulationIterationError};
pub use game::{
    BettingSplits, ExternalJudgment, FormResult, GameContext, HeadToHead, InjuryReport,
    OddsSnapshot, Sentiment, Side, TeamStats, Venue, Weather,
};
pub use kelly::{BankrollSizer, BetSizeRecommendation, RiskProfile, SizingMethod};
pub use model::{ModelInputs, ModelWeights};
pub use odds::{DevigMethod, DevigResult, LineNormalizer, LineQuote};
pub use param_store::{ParameterStore, ParameterWatcher};
pub use params::{
    BacktestResult, CalibrationParameterSet, DatasetIdentity, FactorPerformance,
    ParameterFile, ParameterRepository, SimulationTuning, WeightSet,
};
pub use signal::{
    BetMarket, Consensus, EnsembleResult, NeutralReason, Pick, RecommendedBet, SignalEstimate,
    SignalModel,
};

pub mod ensemble;
pub mod learning;
pub mod models;
pub mod registry;

pub use ensemble::Aggregator;
pub use learning::PerformanceWindow;
pub use models::{
    AltitudeModel, BaseSimulationModel, BettingSplitsModel, CalibratedModel,
    ExternalJudgmentModel, HeadToHeadModel, InjuryModel, MarketModel, RecentFormModel,
    SentimentModel, WeatherModel,
};
pub use registry::ModelRegistry;

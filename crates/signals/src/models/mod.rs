//! Factor models.
//!
//! One [`SignalModel`](progno_core::SignalModel) per factor. A model that
//! has no information about a game returns `None` and simply drops out of
//! the ensemble.

mod base_simulation;
mod calibrated;
mod environment;
mod external;
mod form;
mod injury;
mod market;
mod sentiment;
mod splits;

pub use base_simulation::{pythagorean_expectation, BaseSimulationModel, PYTHAGOREAN_EXPONENT};
pub use calibrated::CalibratedModel;
pub use environment::{altitude_edge, AltitudeModel, WeatherModel};
pub use external::ExternalJudgmentModel;
pub use form::{HeadToHeadModel, RecentFormModel};
pub use injury::InjuryModel;
pub use market::MarketModel;
pub use sentiment::SentimentModel;
pub use splits::{fade_confidence, BettingSplitsModel};

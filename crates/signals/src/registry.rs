//! Model registry for the ensemble.
//!
//! The registry owns an ordered list of factor models. Order is preserved so
//! an ensemble's contributions list is stable across runs.

use progno_core::{CalibrationParameterSet, GameContext, SignalEstimate, SignalModel};

use crate::models::{
    AltitudeModel, BaseSimulationModel, BettingSplitsModel, CalibratedModel,
    ExternalJudgmentModel, HeadToHeadModel, InjuryModel, MarketModel, RecentFormModel,
    SentimentModel, WeatherModel,
};

/// Registry for managing factor models.
///
/// Models are `Send + Sync` and stateless, so one registry can be shared
/// behind an `Arc` by every concurrent prediction.
#[derive(Default)]
pub struct ModelRegistry {
    models: Vec<Box<dyn SignalModel>>,
}

impl std::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("models", &self.names())
            .finish()
    }
}

impl ModelRegistry {
    /// Creates a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { models: Vec::new() }
    }

    /// Registry with every built-in factor. The calibrated model takes its
    /// coefficients from `params`.
    #[must_use]
    pub fn standard(params: &CalibrationParameterSet) -> Self {
        Self::new()
            .with_model(Box::new(MarketModel::default()))
            .with_model(Box::new(BaseSimulationModel::default()))
            .with_model(Box::new(RecentFormModel::default()))
            .with_model(Box::new(HeadToHeadModel::default()))
            .with_model(Box::new(WeatherModel::default()))
            .with_model(Box::new(AltitudeModel::default()))
            .with_model(Box::new(InjuryModel::default()))
            .with_model(Box::new(BettingSplitsModel::default()))
            .with_model(Box::new(SentimentModel::default()))
            .with_model(Box::new(ExternalJudgmentModel::default()))
            .with_model(Box::new(CalibratedModel::new(params.model, 1.5)))
    }

    /// Registers a model.
    ///
    /// If a model with the same name already exists, it is replaced in place.
    pub fn register(&mut self, model: Box<dyn SignalModel>) {
        if let Some(slot) = self.models.iter_mut().find(|m| m.name() == model.name()) {
            *slot = model;
        } else {
            self.models.push(model);
        }
    }

    /// Builder method to register a model.
    #[must_use]
    pub fn with_model(mut self, model: Box<dyn SignalModel>) -> Self {
        self.register(model);
        self
    }

    /// Returns a model by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn SignalModel> {
        self.models.iter().find(|m| m.name() == name).map(|b| b.as_ref())
    }

    /// Returns true if the registry contains a model with the given name.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Names of all registered models, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    /// Returns the number of registered models.
    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Returns true if no models are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Removes a model by name.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn SignalModel>> {
        let idx = self.models.iter().position(|m| m.name() == name)?;
        Some(self.models.remove(idx))
    }

    /// Runs every model and collects the estimates that were emitted.
    ///
    /// Estimates with a zero base weight are dropped.
    #[must_use]
    pub fn estimate_all(&self, ctx: &GameContext) -> Vec<SignalEstimate> {
        self.models
            .iter()
            .filter_map(|model| {
                let estimate = model.estimate(ctx);
                match &estimate {
                    Some(e) if e.weight <= 0.0 => {
                        tracing::debug!(model = %model.name(), "Dropping zero-weight estimate");
                        None
                    }
                    Some(_) => estimate,
                    None => {
                        tracing::trace!(model = %model.name(), "Model declined");
                        None
                    }
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progno_core::OddsSnapshot;

    struct Fixed {
        name: &'static str,
        p: f64,
    }

    impl SignalModel for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn estimate(&self, _ctx: &GameContext) -> Option<SignalEstimate> {
            Some(SignalEstimate::new(self.name, self.p, 60.0, 1.0))
        }
    }

    struct Silent;

    impl SignalModel for Silent {
        fn name(&self) -> &str {
            "silent"
        }

        fn estimate(&self, _ctx: &GameContext) -> Option<SignalEstimate> {
            None
        }
    }

    fn ctx() -> GameContext {
        GameContext::new("A", "B", OddsSnapshot::moneyline(-110.0, -110.0))
    }

    #[test]
    fn registry_new_is_empty() {
        let registry = ModelRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn registry_register_replaces_same_name() {
        let mut registry = ModelRegistry::new();
        registry.register(Box::new(Fixed { name: "a", p: 0.6 }));
        registry.register(Box::new(Fixed { name: "b", p: 0.4 }));
        registry.register(Box::new(Fixed { name: "a", p: 0.7 }));
        assert_eq!(registry.names(), vec!["a", "b"]);

        let estimates = registry.estimate_all(&ctx());
        assert!((estimates[0].home_win_prob - 0.7).abs() < 1e-12);
    }

    #[test]
    fn registry_skips_declining_models() {
        let registry = ModelRegistry::new()
            .with_model(Box::new(Silent))
            .with_model(Box::new(Fixed { name: "a", p: 0.6 }));
        let estimates = registry.estimate_all(&ctx());
        assert_eq!(estimates.len(), 1);
        assert_eq!(estimates[0].factor, "a");
    }

    #[test]
    fn registry_remove() {
        let mut registry = ModelRegistry::new().with_model(Box::new(Silent));
        assert!(registry.remove("silent").is_some());
        assert!(registry.remove("silent").is_none());
        assert!(!registry.contains("silent"));
    }

    #[test]
    fn standard_registry_has_every_factor() {
        let registry = ModelRegistry::standard(&CalibrationParameterSet::default());
        for name in [
            "market",
            "base-simulation",
            "recent-form",
            "head-to-head",
            "weather-impact",
            "altitude",
            "injury-impact",
            "betting-splits",
            "sentiment",
            "external-judgment",
            "calibrated",
        ] {
            assert!(registry.contains(name), "missing {name}");
        }
    }

    #[test]
    fn bare_context_gets_market_and_calibrated_only() {
        let registry = ModelRegistry::standard(&CalibrationParameterSet::default());
        let factors: Vec<String> = registry
            .estimate_all(&ctx())
            .into_iter()
            .map(|e| e.factor)
            .collect();
        assert_eq!(factors, vec!["market", "calibrated"]);
    }
}

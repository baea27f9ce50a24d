use progno_core::{GameContext, SignalEstimate, SignalModel};

/// Injury impact differential. A team missing more strength is less likely
/// to win; confidence grows with the gap, up to 80.
#[derive(Debug, Clone)]
pub struct InjuryModel {
    weight: f64,
}

impl Default for InjuryModel {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl InjuryModel {
    #[must_use]
    pub const fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl SignalModel for InjuryModel {
    fn name(&self) -> &str {
        "injury-impact"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        let report = ctx.injuries.as_ref()?;
        if !report.home_impact.is_finite() || !report.away_impact.is_finite() {
            return None;
        }
        let diff = report.away_impact.clamp(0.0, 1.0) - report.home_impact.clamp(0.0, 1.0);
        let confidence = (diff.abs() * 3.0).min(0.8) * 100.0;
        Some(SignalEstimate::new(
            self.name(),
            0.5 + diff * 0.5,
            confidence,
            self.weight,
        ))
    }
}

//! Venue and weather factors.

use progno_core::{GameContext, SignalEstimate, SignalModel};

/// Home edge from the elevation gap between the two home venues.
///
/// Stepped: under 500 ft none, under 2000 ft 1%, under 4000 ft 2.5%,
/// otherwise 4%. Positive when the home venue sits higher.
#[must_use]
pub fn altitude_edge(difference_ft: f64) -> f64 {
    if !difference_ft.is_finite() {
        return 0.0;
    }
    let step = match difference_ft.abs() {
        d if d < 500.0 => 0.0,
        d if d < 2000.0 => 0.01,
        d if d < 4000.0 => 0.025,
        _ => 0.04,
    };
    step * difference_ft.signum()
}

/// Altitude acclimatization.
#[derive(Debug, Clone)]
pub struct AltitudeModel {
    weight: f64,
}

impl Default for AltitudeModel {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl AltitudeModel {
    #[must_use]
    pub const fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl SignalModel for AltitudeModel {
    fn name(&self) -> &str {
        "altitude"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        let venue = ctx.venue.as_ref()?;
        let edge = altitude_edge(venue.home_elevation_ft - venue.away_elevation_ft);
        if edge == 0.0 {
            return None;
        }
        let confidence = 55.0 + 250.0 * edge.abs();
        Some(SignalEstimate::new(self.name(), 0.5 + edge, confidence, self.weight))
    }
}

/// Adverse weather, which tends to favor the home side and suppress scoring.
///
/// Precipitation adds 0.10 impact, wind above 20 mph 0.15, temperature
/// below 20°F 0.05. Indoor venues and calm conditions emit nothing.
#[derive(Debug, Clone)]
pub struct WeatherModel {
    weight: f64,
}

impl Default for WeatherModel {
    fn default() -> Self {
        Self::new(0.6)
    }
}

impl WeatherModel {
    #[must_use]
    pub const fn new(weight: f64) -> Self {
        Self { weight }
    }
}

impl SignalModel for WeatherModel {
    fn name(&self) -> &str {
        "weather-impact"
    }

    fn estimate(&self, ctx: &GameContext) -> Option<SignalEstimate> {
        if ctx.venue.as_ref().is_some_and(|v| v.indoor) {
            return None;
        }
        let weather = ctx.weather.as_ref()?;
        let mut impact: f64 = 0.0;
        if weather.precipitation {
            impact += 0.10;
        }
        if weather.wind_mph > 20.0 {
            impact += 0.15;
        }
        if weather.temperature_f < 20.0 {
            impact += 0.05;
        }
        if impact == 0.0 {
            return None;
        }

        let confidence = (impact * 5.0).min(0.7) * 100.0;
        let mut estimate =
            SignalEstimate::new(self.name(), 0.5 + impact * 0.2, confidence, self.weight);
        if let Some(total) = ctx.odds.total {
            estimate = estimate.with_expected_total(total * (1.0 - impact * 0.3));
        }
        Some(estimate)
    }
}

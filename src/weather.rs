//! Weather alerts derived from point observations.
//!
//! An [`ObservationSource`] reports current conditions at a point; the
//! thresholds here turn each observation into zero or more [`WeatherAlert`]s
//! and fold them into the route-level [`WeatherSummary`] the conditions
//! analyzer consumes.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ProviderError;
use crate::traits::{AlertKind, AlertSeverity, WeatherAlert, WeatherProvider, WeatherSummary};
use crate::types::GeoPoint;

/// Wind speed (m/s) above which a wind alert is raised.
const STRONG_WIND_MS: f64 = 15.0;
/// Visibility (km) below which fog is high severity.
const LOW_VISIBILITY_KM: f64 = 1.0;
/// Visibility (km) below which fog is moderate severity.
const REDUCED_VISIBILITY_KM: f64 = 5.0;

/// Current conditions at one point.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherObservation {
    /// Short condition label, e.g. "Rain", "Thunderstorm".
    pub condition: String,
    #[serde(default)]
    pub wind_speed_ms: f64,
    /// `None` when the source did not report visibility.
    #[serde(default)]
    pub visibility_km: Option<f64>,
}

impl WeatherObservation {
    pub fn new(condition: impl Into<String>) -> Self {
        Self {
            condition: condition.into(),
            ..Self::default()
        }
    }

    pub fn with_wind(mut self, wind_speed_ms: f64) -> Self {
        self.wind_speed_ms = wind_speed_ms;
        self
    }

    pub fn with_visibility(mut self, visibility_km: f64) -> Self {
        self.visibility_km = Some(visibility_km);
        self
    }
}

/// Reports current conditions at a point.
pub trait ObservationSource: Send + Sync {
    fn observe(&self, point: GeoPoint) -> Result<WeatherObservation, ProviderError>;
}

fn alert(kind: AlertKind, severity: AlertSeverity, message: String) -> WeatherAlert {
    WeatherAlert {
        kind,
        severity,
        message,
        location: None,
    }
}

/// Alerts for one observation, in a fixed order: precipitation, wind,
/// visibility, storm.
pub fn alerts_for(observation: &WeatherObservation) -> Vec<WeatherAlert> {
    let condition = observation.condition.to_lowercase();
    let mut alerts = Vec::new();

    if condition.contains("rain") || condition.contains("drizzle") {
        alerts.push(alert(
            AlertKind::Rain,
            AlertSeverity::Moderate,
            "Rain expected - Drive carefully and allow extra time".to_string(),
        ));
    }
    if condition.contains("snow") {
        alerts.push(alert(
            AlertKind::Snow,
            AlertSeverity::High,
            "Snow conditions - Drive slowly, roads may be slippery".to_string(),
        ));
    }

    let wind = observation.wind_speed_ms;
    if wind > STRONG_WIND_MS {
        alerts.push(alert(
            AlertKind::Wind,
            AlertSeverity::Moderate,
            format!("Strong winds ({wind:.1} m/s) - Be cautious, especially with food truck"),
        ));
    }

    match observation.visibility_km {
        Some(km) if km < LOW_VISIBILITY_KM => alerts.push(alert(
            AlertKind::Fog,
            AlertSeverity::High,
            format!("Low visibility ({km:.1} km) - Drive slowly with headlights on"),
        )),
        Some(km) if km < REDUCED_VISIBILITY_KM => alerts.push(alert(
            AlertKind::Fog,
            AlertSeverity::Moderate,
            format!("Reduced visibility ({km:.1} km) - Drive carefully"),
        )),
        _ => {}
    }

    if condition.contains("thunderstorm") {
        alerts.push(alert(
            AlertKind::Storm,
            AlertSeverity::High,
            "Thunderstorm warning - Consider delaying delivery if safe".to_string(),
        ));
    }

    alerts
}

/// Fold per-location observations into one summary. Locations without an
/// observation contribute nothing; each alert is tagged with its location.
pub fn summarize_observations<'a>(
    observations: impl IntoIterator<Item = (&'a str, Option<&'a WeatherObservation>)>,
) -> WeatherSummary {
    let alerts: Vec<WeatherAlert> = observations
        .into_iter()
        .filter_map(|(name, observation)| observation.map(|o| (name, o)))
        .flat_map(|(name, observation)| {
            alerts_for(observation).into_iter().map(move |mut alert| {
                alert.location = Some(name.to_string());
                alert
            })
        })
        .collect();

    let mut summary = WeatherSummary {
        alerts,
        summary: String::new(),
    };
    summary.summary = match summary.most_severe_alert() {
        Some(worst) => format!(
            "{} weather alert(s); most severe at {}: {}",
            summary.alerts.len(),
            worst.location.as_deref().unwrap_or("route"),
            worst.message
        ),
        None => "No weather alerts along the route".to_string(),
    };
    summary
}

/// [`WeatherProvider`] that observes every point and derives alerts locally.
///
/// Points are labelled "Stop 1", "Stop 2", ... in route order. Points whose
/// observation fails are skipped. If every observation fails, the last
/// failure is reported as [`ProviderError::Unavailable`].
#[derive(Debug, Clone)]
pub struct ObservedWeather<S> {
    source: S,
}

impl<S: ObservationSource> ObservedWeather<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }
}

impl<S: ObservationSource> WeatherProvider for ObservedWeather<S> {
    fn summarize(&self, points: &[GeoPoint]) -> Result<WeatherSummary, ProviderError> {
        let results: Vec<Result<WeatherObservation, ProviderError>> = points
            .par_iter()
            .map(|&point| self.source.observe(point))
            .collect();

        let names: Vec<String> = (1..=points.len()).map(|n| format!("Stop {n}")).collect();
        let mut observed = 0usize;
        let mut last_error = None;
        let mut labelled = Vec::with_capacity(results.len());
        for (name, result) in names.iter().zip(&results) {
            match result {
                Ok(observation) => {
                    observed += 1;
                    labelled.push((name.as_str(), Some(observation)));
                }
                Err(err) => {
                    debug!(location = %name, error = %err, "weather observation unavailable");
                    last_error = Some(err);
                    labelled.push((name.as_str(), None));
                }
            }
        }

        if let (0, Some(err)) = (observed, last_error) {
            return Err(ProviderError::Unavailable(format!("weather: {err}")));
        }
        Ok(summarize_observations(labelled))
    }
}

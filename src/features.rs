//! Fixed-size numeric encoding of a routing scenario.
//!
//! Layout: four values per stop slot for up to [`MAX_STOPS`] stops (distance
//! from start in km, priority / 3, urgent flag, window urgency), zero-padded,
//! then four global values (traffic, weather, hour / 24, rush-hour flag), then
//! the stop count over [`MAX_STOPS`].

use chrono::{DateTime, Timelike};
use serde::{Deserialize, Serialize};

use crate::haversine::haversine_km;
use crate::types::{GeoPoint, Stop};

/// Largest scenario the learner encodes.
pub const MAX_STOPS: usize = 7;
pub const FEATURES_PER_STOP: usize = 4;
pub const GLOBAL_FEATURES: usize = 4;
/// Length of every feature vector.
pub const FEATURE_SIZE: usize = MAX_STOPS * FEATURES_PER_STOP + GLOBAL_FEATURES + 1;

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLevel {
    Low,
    #[default]
    Moderate,
    High,
}

impl TrafficLevel {
    pub const ALL: [Self; 3] = [Self::Low, Self::Moderate, Self::High];

    pub fn encode(self) -> f64 {
        match self {
            Self::Low => 0.0,
            Self::Moderate => 0.5,
            Self::High => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeatherCondition {
    #[default]
    Clear,
    Rain,
    Snow,
    Fog,
}

impl WeatherCondition {
    pub const ALL: [Self; 4] = [Self::Clear, Self::Rain, Self::Snow, Self::Fog];

    pub fn encode(self) -> f64 {
        match self {
            Self::Clear => 0.0,
            Self::Rain => 0.3,
            Self::Snow => 0.5,
            Self::Fog => 0.4,
        }
    }
}

/// Scenario-wide conditions fed to the learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conditions {
    pub traffic_level: TrafficLevel,
    pub weather: WeatherCondition,
    /// Hour of day, 0..=23.
    pub hour: u32,
}

impl Default for Conditions {
    fn default() -> Self {
        Self {
            traffic_level: TrafficLevel::Moderate,
            weather: WeatherCondition::Clear,
            hour: 12,
        }
    }
}

impl Conditions {
    /// Moderate traffic and clear weather at the UTC hour of `epoch_ms`.
    pub fn at(epoch_ms: i64) -> Self {
        let hour = DateTime::from_timestamp_millis(epoch_ms).map_or(12, |dt| dt.hour());
        Self {
            hour,
            ..Self::default()
        }
    }
}

/// Hours 7 to 9 and 17 to 19, inclusive.
pub fn is_rush_hour(hour: u32) -> bool {
    (7..=9).contains(&hour) || (17..=19).contains(&hour)
}

/// `1 - hours until the window opens / 24`, floored at 0; 0 without a window.
pub fn window_urgency(stop: &Stop, now_ms: i64) -> f64 {
    match stop.time_window {
        Some(window) => {
            let hours_until_start = window.start.saturating_sub(now_ms) as f64 / MS_PER_HOUR;
            (1.0 - hours_until_start / 24.0).max(0.0)
        }
        None => 0.0,
    }
}

/// Encode a scenario. Stops beyond [`MAX_STOPS`] are ignored.
pub fn extract_features(
    stops: &[Stop],
    start: GeoPoint,
    conditions: &Conditions,
    now_ms: i64,
) -> Vec<f64> {
    let mut features = vec![0.0; FEATURE_SIZE];
    let count = stops.len().min(MAX_STOPS);

    for (slot, stop) in features
        .chunks_exact_mut(FEATURES_PER_STOP)
        .zip(stops.iter().take(count))
    {
        slot[0] = haversine_km(start, stop.location());
        slot[1] = f64::from(stop.priority_level()) / 3.0;
        slot[2] = if stop.urgent { 1.0 } else { 0.0 };
        slot[3] = window_urgency(stop, now_ms);
    }

    let global = MAX_STOPS * FEATURES_PER_STOP;
    features[global] = conditions.traffic_level.encode();
    features[global + 1] = conditions.weather.encode();
    features[global + 2] = f64::from(conditions.hour) / 24.0;
    features[global + 3] = if is_rush_hour(conditions.hour) { 1.0 } else { 0.0 };
    features[global + GLOBAL_FEATURES] = count as f64 / MAX_STOPS as f64;

    features
}

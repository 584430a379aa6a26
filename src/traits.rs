//! Collaborator contracts consumed by the planner core.
//!
//! Routing, parking and weather lookups are the only external dependencies.
//! They are injected into planners and the conditions analyzer as trait
//! objects; a failing collaborator never aborts an optimization, the caller
//! falls back to a deterministic estimate instead.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::haversine::DistanceMatrix;
use crate::polyline::Polyline;
use crate::types::{GeoPoint, ParkingSpot, TravelMode};

/// Per-request routing options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RouteOptions {
    /// Ask the provider for alternative routes as well as the primary one.
    pub alternatives: bool,
    /// Departure time in epoch milliseconds, for traffic-aware providers.
    pub departure_time: Option<i64>,
}

/// One turn-by-turn instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStep {
    pub instruction: String,
    pub distance_km: f64,
    pub duration_min: f64,
}

/// A single candidate route between two points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteOption {
    pub distance_km: f64,
    pub duration_min: f64,
    pub duration_in_traffic_min: Option<f64>,
    pub polyline: Option<Polyline>,
    pub steps: Vec<RouteStep>,
}

impl RouteOption {
    /// Duration with traffic where the provider reports it, base duration otherwise.
    pub fn traffic_aware_duration(&self) -> f64 {
        self.duration_in_traffic_min.unwrap_or(self.duration_min)
    }

    pub fn traffic_delay(&self) -> f64 {
        self.traffic_aware_duration() - self.duration_min
    }
}

/// Provider answer: the primary route plus any alternatives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directions {
    pub primary: RouteOption,
    #[serde(default)]
    pub alternatives: Vec<RouteOption>,
    /// True when produced by the multiplier-based estimator.
    #[serde(default)]
    pub estimated: bool,
}

impl Directions {
    /// Primary first, then alternatives in provider order.
    pub fn options(&self) -> impl Iterator<Item = &RouteOption> {
        std::iter::once(&self.primary).chain(self.alternatives.iter())
    }
}

/// Computes routes between two points.
pub trait RoutingProvider: Send + Sync {
    fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
        options: &RouteOptions,
    ) -> Result<Directions, ProviderError>;
}

/// Finds a vehicle-accessible point near a location.
pub trait ParkingLocator: Send + Sync {
    fn find(&self, point: GeoPoint, radius_m: f64) -> Result<ParkingSpot, ProviderError>;
}

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Rain,
    Snow,
    Wind,
    Fog,
    Storm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub severity: AlertSeverity,
    pub message: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherSummary {
    pub alerts: Vec<WeatherAlert>,
    pub summary: String,
}

impl WeatherSummary {
    pub fn has_high_severity_alert(&self) -> bool {
        self.alerts
            .iter()
            .any(|alert| alert.severity == AlertSeverity::High)
    }

    /// The first alert of the highest severity present.
    pub fn most_severe_alert(&self) -> Option<&WeatherAlert> {
        self.alerts
            .iter()
            .min_by_key(|alert| std::cmp::Reverse(alert.severity))
    }
}

/// Summarizes weather along a set of points.
pub trait WeatherProvider: Send + Sync {
    fn summarize(&self, points: &[GeoPoint]) -> Result<WeatherSummary, ProviderError>;
}

/// Provides a road-distance matrix (km) for a set of locations.
///
/// The matrix is indexed by the provided location order.
pub trait DistanceMatrixProvider {
    fn matrix_for(&self, locations: &[GeoPoint]) -> DistanceMatrix;
}

/// A collaborator that is switched off. Every call reports
/// [`ProviderError::Unavailable`], which sends callers down their fallback path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unavailable;

impl RoutingProvider for Unavailable {
    fn route(
        &self,
        _origin: GeoPoint,
        _destination: GeoPoint,
        _mode: TravelMode,
        _options: &RouteOptions,
    ) -> Result<Directions, ProviderError> {
        Err(ProviderError::Unavailable("routing".to_string()))
    }
}

impl ParkingLocator for Unavailable {
    fn find(&self, _point: GeoPoint, _radius_m: f64) -> Result<ParkingSpot, ProviderError> {
        Err(ProviderError::Unavailable("parking".to_string()))
    }
}

impl WeatherProvider for Unavailable {
    fn summarize(&self, _points: &[GeoPoint]) -> Result<WeatherSummary, ProviderError> {
        Err(ProviderError::Unavailable("weather".to_string()))
    }
}

/// The three collaborators one optimization run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub routing: &'a dyn RoutingProvider,
    pub parking: &'a dyn ParkingLocator,
    pub weather: &'a dyn WeatherProvider,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        routing: &'a dyn RoutingProvider,
        parking: &'a dyn ParkingLocator,
        weather: &'a dyn WeatherProvider,
    ) -> Self {
        Self {
            routing,
            parking,
            weather,
        }
    }

    /// Every collaborator switched off; all legs use the estimators.
    pub fn offline() -> Collaborators<'static> {
        Collaborators {
            routing: &Unavailable,
            parking: &Unavailable,
            weather: &Unavailable,
        }
    }
}

impl std::fmt::Debug for Collaborators<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

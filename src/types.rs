//! Domain types for a single optimization run.
//!
//! Stops and the start location are supplied per call and discarded after the
//! run. Everything produced by the planners (legs, strategy results, the final
//! optimization record) serializes with camelCase field names.

use serde::{Deserialize, Serialize};

use crate::polyline::Polyline;
use crate::traits::{RouteStep, WeatherSummary};

/// Default priority for stops that do not specify one (lowest).
pub const DEFAULT_PRIORITY: u8 = 3;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Delivery window, both ends in epoch milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }
}

/// A delivery location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stop {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    /// 1 is the highest priority, 3 the lowest.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub urgent: bool,
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
    /// Number of original stops this stop represents after clustering.
    #[serde(default = "default_cluster_size")]
    pub cluster_size: usize,
}

fn default_priority() -> u8 {
    DEFAULT_PRIORITY
}

fn default_cluster_size() -> usize {
    1
}

impl Stop {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lng,
            priority: DEFAULT_PRIORITY,
            urgent: false,
            time_window: None,
            cluster_size: 1,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn urgent(mut self) -> Self {
        self.urgent = true;
        self
    }

    pub fn with_time_window(mut self, start: i64, end: i64) -> Self {
        self.time_window = Some(TimeWindow::new(start, end));
        self
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }

    /// Priority clamped into 1..=3; out-of-range values degrade rather than fail.
    pub fn priority_level(&self) -> u8 {
        self.priority.clamp(1, 3)
    }
}

/// Where the vehicle starts the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartLocation {
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub name: String,
}

impl StartLocation {
    pub fn new(lat: f64, lng: f64, name: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            name: name.into(),
        }
    }

    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Travel mode for a single leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Walking,
    Bicycling,
}

/// Vehicle-accessible point near a stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpot {
    pub lat: f64,
    pub lng: f64,
    pub name: String,
    pub walking_distance_km: f64,
    /// True when the spot was synthesized by the fallback rather than found.
    #[serde(default)]
    pub estimated: bool,
}

impl ParkingSpot {
    pub fn location(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Annotations attached to a vehicle leg by the conditions analyzer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegConditions {
    pub has_warnings: bool,
    pub route_score: Option<f64>,
}

/// One visited stop: the vehicle leg to its parking spot and the walk to the door.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteLeg {
    pub stop: Stop,
    /// 1-based position in the route.
    pub order: usize,
    /// Planning estimate from the distance matrix.
    pub distance_from_previous: f64,
    pub vehicle_distance: f64,
    pub vehicle_duration: f64,
    pub vehicle_duration_in_traffic: Option<f64>,
    pub vehicle_traffic_delay: f64,
    pub vehicle_polyline: Option<Polyline>,
    pub vehicle_steps: Vec<RouteStep>,
    pub walking_distance: f64,
    pub walking_duration: f64,
    pub walking_polyline: Option<Polyline>,
    pub walking_steps: Vec<RouteStep>,
    pub parking_location: ParkingSpot,
    /// Arrival at the parking spot, epoch milliseconds.
    pub estimated_arrival: i64,
    /// Traffic-aware vehicle minutes.
    pub estimated_vehicle_time: f64,
    pub estimated_walking_time: f64,
    pub route_conditions: LegConditions,
}

/// Identifies which ordering algorithm produced a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    #[serde(rename = "nearest-neighbor")]
    NearestNeighbor,
    #[serde(rename = "priority-based")]
    PriorityBased,
    #[serde(rename = "time-window")]
    TimeWindow,
    #[serde(rename = "ml-optimized")]
    Learned,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::NearestNeighbor => "nearest-neighbor",
            Strategy::PriorityBased => "priority-based",
            Strategy::TimeWindow => "time-window",
            Strategy::Learned => "ml-optimized",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A complete ordered route produced by one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyResult {
    pub strategy: Strategy,
    pub route: Vec<RouteLeg>,
    pub total_distance: f64,
    pub total_time: f64,
}

impl StrategyResult {
    /// Sums vehicle distance and traffic-aware vehicle time over the legs.
    pub fn from_legs(strategy: Strategy, route: Vec<RouteLeg>) -> Self {
        let total_distance = route.iter().map(|leg| leg.vehicle_distance).sum();
        let total_time = route.iter().map(|leg| leg.estimated_vehicle_time).sum();
        Self {
            strategy,
            route,
            total_distance,
            total_time,
        }
    }

    /// Composite selection score: time plus half the distance.
    pub fn composite_score(&self) -> f64 {
        self.total_time + 0.5 * self.total_distance
    }
}

/// Aggregate statistics over the winning route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteStatistics {
    pub total_stops: usize,
    pub total_distance: f64,
    pub total_vehicle_distance: f64,
    pub total_walking_distance: f64,
    pub estimated_time: f64,
    pub estimated_vehicle_time: f64,
    pub estimated_walking_time: f64,
    pub average_distance_per_stop: f64,
}

/// Traffic level of one vehicle segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficSeverity {
    Low,
    Moderate,
    Heavy,
    Severe,
    Unknown,
}

impl TrafficSeverity {
    /// Heavy and severe segments count against route safety.
    pub fn is_congested(&self) -> bool {
        matches!(self, TrafficSeverity::Heavy | TrafficSeverity::Severe)
    }
}

/// Traffic report for the segment leading to one stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentTraffic {
    pub stop_id: String,
    pub stop_order: usize,
    pub level: TrafficSeverity,
    /// Delay of the least-delayed alternative, minutes.
    pub delay: f64,
    pub has_warnings: bool,
    pub message: String,
    pub recommendation: String,
}

/// Whole-route safety classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyLevel {
    Good,
    Moderate,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningKind {
    Weather,
    Road,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    pub severity: crate::traits::AlertSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Safety {
    pub overall: SafetyLevel,
    pub factors: Vec<String>,
    pub warnings: Vec<SafetyWarning>,
}

/// Traffic, weather and safety summary for the whole route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConditions {
    pub traffic: Vec<SegmentTraffic>,
    pub weather: Option<WeatherSummary>,
    pub safety: Safety,
    pub recommendations: Vec<String>,
}

/// Final record returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub route: Vec<RouteLeg>,
    pub statistics: RouteStatistics,
    pub optimized: bool,
    pub best_strategy: Strategy,
    pub conditions: RouteConditions,
}

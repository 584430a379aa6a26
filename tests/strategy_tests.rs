//! End-to-end optimization tests.
//!
//! These run the full multi-strategy pipeline against offline, live-looking
//! and hostile collaborators, and check strategy selection with a learned
//! model in the mix.

mod fixtures;

use delivery_planner::haversine::HaversineRouter;
use delivery_planner::learner::{MODEL_VERSION, ModelRecord};
use delivery_planner::planner::stop_ids;
use delivery_planner::traits::{AlertKind, Collaborators, Unavailable};
use delivery_planner::types::{SafetyLevel, StartLocation, Stop, Strategy, TrafficSeverity};
use delivery_planner::weather::{ObservedWeather, WeatherObservation};
use delivery_planner::{Learner, OptimizerConfig, optimize_route};

use fixtures::mocks::{FixedParking, SteadyObservation, StormWeather, TrafficRouter};
use fixtures::{depot, parish_stops};

fn config() -> OptimizerConfig {
    OptimizerConfig::default()
        .with_seed(99)
        .with_start_time(1_704_103_200_000)
}

/// Model whose output ranks slot 1 first, then slot 0, then slot 2.
fn fixed_ranking_model() -> Learner {
    let record = ModelRecord {
        version: MODEL_VERSION,
        input_size: 33,
        hidden_size: 1,
        output_size: 7,
        learning_rate: 0.001,
        weights1: vec![0.0; 33],
        weights2: vec![2.0, 1.0, 3.0, 8.0, 8.0, 8.0, 8.0],
        bias1: vec![1.0],
        bias2: vec![0.0; 7],
        training_history: Vec::new(),
    };
    Learner::try_from(record).expect("valid record")
}

/// Three stops on the equator where the greedy tour backtracks.
fn backtracking_stops() -> (StartLocation, Vec<Stop>) {
    let start = StartLocation::new(0.0, 0.0, "Origin");
    let stops = vec![
        Stop::new("A", 0.0, 0.01),
        Stop::new("B", 0.0, -0.015),
        Stop::new("C", 0.0, 0.03),
    ];
    (start, stops)
}

// ============================================================================
// Offline collaborators
// ============================================================================

#[test]
fn offline_run_is_fully_estimated() {
    let start = depot();
    let stops = parish_stops();

    let result = optimize_route(&stops, &start, &config(), Collaborators::offline(), None)
        .expect("optimize");

    assert!(result.optimized);
    assert_eq!(result.best_strategy, Strategy::NearestNeighbor);
    assert_eq!(result.statistics.total_stops, stops.len());
    assert_eq!(result.conditions.traffic.len(), stops.len());
    assert!(
        result
            .conditions
            .traffic
            .iter()
            .all(|segment| segment.level == TrafficSeverity::Unknown)
    );
    assert!(result.conditions.weather.is_none());
    assert_eq!(result.conditions.safety.overall, SafetyLevel::Good);
    assert!(result.conditions.recommendations.is_empty());

    for leg in &result.route {
        assert!(leg.parking_location.estimated);
        assert_eq!(leg.parking_location.name, "Estimated Parking");
        assert!(leg.route_conditions.route_score.is_none());
        assert!(leg.vehicle_duration_in_traffic.is_none());
    }
}

#[test]
fn same_seed_gives_identical_offline_results() {
    let start = depot();
    let stops = parish_stops();

    let first = optimize_route(&stops, &start, &config(), Collaborators::offline(), None)
        .expect("first run");
    let second = optimize_route(&stops, &start, &config(), Collaborators::offline(), None)
        .expect("second run");

    assert_eq!(first, second);
}

#[test]
fn statistics_sum_the_winning_legs() {
    let start = depot();
    let stops = parish_stops();

    let result = optimize_route(&stops, &start, &config(), Collaborators::offline(), None)
        .expect("optimize");

    let vehicle: f64 = result.route.iter().map(|leg| leg.vehicle_distance).sum();
    let walking: f64 = result.route.iter().map(|leg| leg.walking_distance).sum();
    let stats = &result.statistics;
    assert!((stats.total_vehicle_distance - vehicle).abs() < 1e-9);
    assert!((stats.total_walking_distance - walking).abs() < 1e-9);
    assert!((stats.estimated_time - stats.total_distance * 1.5).abs() < 1e-9);
    assert!(
        (stats.average_distance_per_stop - stats.total_distance / stops.len() as f64).abs() < 1e-9
    );
}

#[test]
fn estimating_router_leaves_legs_unannotated() {
    let start = depot();
    let stops = parish_stops();
    let parking = FixedParking { offset_deg: 0.0004 };
    let collaborators = Collaborators::new(&HaversineRouter, &parking, &Unavailable);

    let result = optimize_route(&stops, &start, &config(), collaborators, None).expect("optimize");

    for leg in &result.route {
        assert_eq!(leg.parking_location.name, "Curbside");
        assert!(leg.route_conditions.route_score.is_none());
        assert!(!leg.route_conditions.has_warnings);
    }
    assert!(
        result
            .conditions
            .traffic
            .iter()
            .all(|segment| segment.level == TrafficSeverity::Unknown)
    );
}

// ============================================================================
// Live-looking collaborators
// ============================================================================

#[test]
fn heavy_traffic_in_a_storm_is_poor() {
    let start = depot();
    let stops = parish_stops();
    let router = TrafficRouter::new(3.0);
    let parking = FixedParking { offset_deg: 0.0004 };
    let weather = StormWeather {
        kind: AlertKind::Rain,
    };
    let collaborators = Collaborators::new(&router, &parking, &weather);

    let result = optimize_route(&stops, &start, &config(), collaborators, None).expect("optimize");

    assert_eq!(result.conditions.safety.overall, SafetyLevel::Poor);
    assert_eq!(
        result.conditions.recommendations,
        vec![
            "Consider delaying route or using alternative paths",
            "Allow extra time for traffic delays",
            "Exercise caution due to weather conditions",
            "Reduce speed in wet/icy conditions",
            "Consider leaving earlier to avoid peak traffic",
        ]
    );
    let weather = result.conditions.weather.as_ref().expect("weather summary");
    assert_eq!(weather.alerts.len(), 1);

    for leg in &result.route {
        assert_eq!(leg.parking_location.name, "Curbside");
        assert!(leg.vehicle_duration_in_traffic.is_some());
        assert!(leg.route_conditions.route_score.is_some());
        // Primary route carries no risk markers and beats the alternative.
        assert!(!leg.route_conditions.has_warnings);
        assert!(
            (leg.estimated_vehicle_time - leg.vehicle_duration * 3.0).abs() < 1e-9,
            "traffic-aware time drives the clock"
        );
    }
}

#[test]
fn fog_alert_without_congestion_is_moderate() {
    let start = depot();
    // Two stops a few hundred metres apart keep every segment short.
    let stops = vec![
        Stop::new("library", 32.5259, -92.6393),
        Stop::new("city-hall", 32.5229, -92.6402),
    ];
    let router = TrafficRouter::new(1.05);
    let parking = FixedParking { offset_deg: 0.0002 };
    let weather = StormWeather {
        kind: AlertKind::Fog,
    };
    let collaborators = Collaborators::new(&router, &parking, &weather);

    let result = optimize_route(&stops, &start, &config(), collaborators, None).expect("optimize");

    assert_eq!(result.conditions.safety.overall, SafetyLevel::Moderate);
    assert_eq!(
        result.conditions.safety.factors,
        vec!["Severe weather conditions".to_string()]
    );
    assert_eq!(
        result.conditions.recommendations,
        vec!["Exercise caution due to weather conditions"]
    );
    assert!(
        result
            .conditions
            .traffic
            .iter()
            .all(|segment| segment.level == TrafficSeverity::Low)
    );
}

#[test]
fn observed_thunderstorm_raises_weather_warnings() {
    let start = depot();
    let stops = vec![
        Stop::new("library", 32.5259, -92.6393),
        Stop::new("city-hall", 32.5229, -92.6402),
    ];
    let router = TrafficRouter::new(1.05);
    let parking = FixedParking { offset_deg: 0.0002 };
    let weather = ObservedWeather::new(SteadyObservation(
        WeatherObservation::new("Thunderstorm").with_wind(4.0).with_visibility(8.0),
    ));
    let collaborators = Collaborators::new(&router, &parking, &weather);

    let result = optimize_route(&stops, &start, &config(), collaborators, None).expect("optimize");

    let summary = result.conditions.weather.as_ref().expect("weather summary");
    assert_eq!(summary.alerts.len(), stops.len());
    assert!(summary.alerts.iter().all(|alert| alert.kind == AlertKind::Storm));
    assert_eq!(summary.alerts[0].location.as_deref(), Some("Stop 1"));
    assert_eq!(result.conditions.safety.overall, SafetyLevel::Moderate);
    assert_eq!(result.conditions.safety.warnings.len(), stops.len());
    assert_eq!(
        result.conditions.recommendations,
        vec!["Exercise caution due to weather conditions"]
    );
}

// ============================================================================
// Learned strategy
// ============================================================================

#[test]
fn learned_order_wins_when_greedy_backtracks() {
    let (start, stops) = backtracking_stops();
    let model = fixed_ranking_model();

    let result = optimize_route(&stops, &start, &config(), Collaborators::offline(), Some(&model))
        .expect("optimize");

    assert_eq!(result.best_strategy, Strategy::Learned);
    assert_eq!(stop_ids(&result.route), vec!["B", "A", "C"]);
}

#[test]
fn disabling_the_learner_falls_back_to_greedy() {
    let (start, stops) = backtracking_stops();
    let model = fixed_ranking_model();
    let config = config().without_learner();

    let result = optimize_route(&stops, &start, &config, Collaborators::offline(), Some(&model))
        .expect("optimize");

    assert_eq!(result.best_strategy, Strategy::NearestNeighbor);
    assert_eq!(stop_ids(&result.route), vec!["A", "C", "B"]);
}

#[test]
fn mismatched_model_is_skipped() {
    let (start, stops) = backtracking_stops();
    let record = ModelRecord {
        version: MODEL_VERSION,
        input_size: 10,
        hidden_size: 1,
        output_size: 7,
        learning_rate: 0.001,
        weights1: vec![0.0; 10],
        weights2: vec![0.0; 7],
        bias1: vec![0.0],
        bias2: vec![0.0; 7],
        training_history: Vec::new(),
    };
    let model = Learner::try_from(record).expect("valid record");

    let result = optimize_route(&stops, &start, &config(), Collaborators::offline(), Some(&model))
        .expect("optimize");

    assert_eq!(result.best_strategy, Strategy::NearestNeighbor);
    assert_eq!(result.route.len(), stops.len());
}

#[test]
fn learned_strategy_sits_out_large_inputs() {
    let start = depot();
    let mut stops = parish_stops();
    stops.push(Stop::new("Ruston High School", 32.5400, -92.6290));
    let model = fixed_ranking_model();

    let result = optimize_route(&stops, &start, &config(), Collaborators::offline(), Some(&model))
        .expect("optimize");

    assert_ne!(result.best_strategy, Strategy::Learned);
    assert_eq!(result.route.len(), stops.len());
}

// ============================================================================
// Strategy competition
// ============================================================================

#[test]
fn constrained_strategies_compete_with_greedy() {
    let start = depot();
    let stops: Vec<Stop> = parish_stops()
        .into_iter()
        .enumerate()
        .map(|(i, stop)| if i == 5 { stop.with_priority(1) } else { stop })
        .collect();
    let router = TrafficRouter::new(1.0);
    let parking = FixedParking { offset_deg: 0.0 };
    let collaborators = Collaborators::new(&router, &parking, &Unavailable);

    let result = optimize_route(&stops, &start, &config(), collaborators, None).expect("optimize");

    assert!(matches!(
        result.best_strategy,
        Strategy::NearestNeighbor | Strategy::PriorityBased
    ));
    assert_eq!(result.route.len(), stops.len());
}

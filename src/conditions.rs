//! Traffic, weather and road-safety scoring.
//!
//! Per leg, route alternatives are scored as traffic-aware minutes plus half
//! the distance in km, with a flat penalty when any step mentions a risk
//! marker; the lowest score wins. Per route, congested segments and weather
//! alerts are folded into a safety level and a fixed list of recommendations.

use tracing::{debug, warn};

use crate::traits::{
    AlertKind, AlertSeverity, Directions, RouteOption, RouteOptions, RoutingProvider,
    WeatherProvider, WeatherSummary,
};
use crate::types::{
    GeoPoint, RouteConditions, RouteLeg, Safety, SafetyLevel, SafetyWarning, SegmentTraffic,
    StartLocation, TrafficSeverity, TravelMode, WarningKind,
};

/// Flat score penalty for a route whose steps mention a risk marker.
const WARNING_PENALTY: f64 = 10.0;

/// Score weight per km of route distance.
const DISTANCE_WEIGHT: f64 = 0.5;

/// More congested segments than this make a route poor on their own.
const POOR_CONGESTION_SEGMENTS: usize = 2;

/// Road hazards recognised in step text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoadWarning {
    Closure,
    Construction,
    Detour,
    Toll,
}

impl RoadWarning {
    const MARKERS: [(&'static str, RoadWarning); 5] = [
        ("closed", RoadWarning::Closure),
        ("closure", RoadWarning::Closure),
        ("construction", RoadWarning::Construction),
        ("detour", RoadWarning::Detour),
        ("toll", RoadWarning::Toll),
    ];

    pub fn message(&self) -> &'static str {
        match self {
            RoadWarning::Closure => "Road closure detected",
            RoadWarning::Construction => "Construction zone ahead",
            RoadWarning::Detour => "Detour required",
            RoadWarning::Toll => "Toll road",
        }
    }
}

/// Distinct road warnings mentioned anywhere in the route's steps.
pub fn road_warnings(option: &RouteOption) -> Vec<RoadWarning> {
    let mut found = Vec::new();
    for step in &option.steps {
        let text = step.instruction.to_lowercase();
        for (marker, warning) in RoadWarning::MARKERS {
            if text.contains(marker) && !found.contains(&warning) {
                found.push(warning);
            }
        }
    }
    found
}

/// Lower is better.
pub fn score_route(option: &RouteOption) -> f64 {
    let mut score = option.traffic_aware_duration() + DISTANCE_WEIGHT * option.distance_km;
    if !road_warnings(option).is_empty() {
        score += WARNING_PENALTY;
    }
    score
}

/// A route alternative with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRoute<'d> {
    /// 0 is the primary route, `k + 1` is alternative `k`.
    pub index: usize,
    pub option: &'d RouteOption,
    pub score: f64,
    pub warnings: Vec<RoadWarning>,
}

impl ScoredRoute<'_> {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Level from the traffic delay as a share of the base duration.
    pub fn traffic_level(&self) -> TrafficSeverity {
        if self.option.duration_min <= 0.0 {
            return TrafficSeverity::Low;
        }
        classify_delay_percent(self.option.traffic_delay() / self.option.duration_min * 100.0)
    }

    pub fn warning_messages(&self) -> Vec<&'static str> {
        self.warnings.iter().map(RoadWarning::message).collect()
    }
}

fn scored(index: usize, option: &RouteOption) -> ScoredRoute<'_> {
    ScoredRoute {
        index,
        option,
        score: score_route(option),
        warnings: road_warnings(option),
    }
}

/// Minimal-score option; the earliest wins ties, so the primary is kept
/// unless an alternative is strictly better.
pub fn best_alternative(directions: &Directions) -> ScoredRoute<'_> {
    directions
        .options()
        .enumerate()
        .skip(1)
        .map(|(index, option)| scored(index, option))
        .fold(scored(0, &directions.primary), |best, candidate| {
            if candidate.score < best.score {
                candidate
            } else {
                best
            }
        })
}

/// Level of a single alternative from its delay as a share of base duration.
pub fn classify_delay_percent(delay_percent: f64) -> TrafficSeverity {
    if delay_percent > 50.0 {
        TrafficSeverity::Severe
    } else if delay_percent > 25.0 {
        TrafficSeverity::Heavy
    } else if delay_percent > 10.0 {
        TrafficSeverity::Moderate
    } else {
        TrafficSeverity::Low
    }
}

/// Segment level from the worst delay across alternatives, minutes.
pub fn classify_delay_minutes(max_delay: f64) -> TrafficSeverity {
    if max_delay > 30.0 {
        TrafficSeverity::Severe
    } else if max_delay > 15.0 {
        TrafficSeverity::Heavy
    } else if max_delay > 5.0 {
        TrafficSeverity::Moderate
    } else {
        TrafficSeverity::Low
    }
}

pub fn traffic_message(level: TrafficSeverity, delay: f64) -> String {
    match level {
        TrafficSeverity::Low => format!("Light traffic ({delay:.1} min delay)"),
        TrafficSeverity::Moderate => format!("Moderate traffic ({delay:.1} min delay)"),
        TrafficSeverity::Heavy => format!("Heavy traffic ({delay:.1} min delay)"),
        TrafficSeverity::Severe => format!("Severe traffic ({delay:.1} min delay)"),
        TrafficSeverity::Unknown => "Traffic data unavailable".to_string(),
    }
}

pub fn traffic_recommendation(level: TrafficSeverity, delay: f64) -> String {
    let text = if level == TrafficSeverity::Severe || delay > 30.0 {
        "Consider alternative route or delay departure"
    } else if level == TrafficSeverity::Heavy || delay > 15.0 {
        "Expect significant delays, allow extra time"
    } else if level == TrafficSeverity::Moderate || delay > 5.0 {
        "Minor delays expected"
    } else {
        "Normal traffic conditions"
    };
    text.to_string()
}

/// Safety level from congestion, weather and road signals.
///
/// Poor when congestion coincides with a high-severity weather alert, or when
/// more than two segments are congested. Moderate when any one signal holds
/// on its own. Good otherwise.
pub fn classify_safety(
    congested_segments: usize,
    high_weather_alert: bool,
    road_issues: bool,
) -> SafetyLevel {
    let congested = congested_segments > 0;
    if (congested && high_weather_alert) || congested_segments > POOR_CONGESTION_SEGMENTS {
        SafetyLevel::Poor
    } else if congested || high_weather_alert || road_issues {
        SafetyLevel::Moderate
    } else {
        SafetyLevel::Good
    }
}

/// Fixed-template advice, in a stable order.
pub fn recommendations(
    overall: SafetyLevel,
    congested_segments: usize,
    weather: Option<&WeatherSummary>,
    road_issues: bool,
) -> Vec<String> {
    let high_alerts: Vec<AlertKind> = weather
        .map(|summary| {
            summary
                .alerts
                .iter()
                .filter(|alert| alert.severity == AlertSeverity::High)
                .map(|alert| alert.kind)
                .collect()
        })
        .unwrap_or_default();

    let mut advice = Vec::new();
    if overall == SafetyLevel::Poor {
        advice.push("Consider delaying route or using alternative paths");
    }
    if congested_segments > 0 {
        advice.push("Allow extra time for traffic delays");
    }
    if weather.is_some_and(WeatherSummary::has_high_severity_alert) {
        advice.push("Exercise caution due to weather conditions");
    }
    if road_issues {
        advice.push("Watch for construction zones and road closures");
    }
    if high_alerts
        .iter()
        .any(|kind| matches!(kind, AlertKind::Rain | AlertKind::Snow))
    {
        advice.push("Reduce speed in wet/icy conditions");
    }
    if congested_segments > 0 {
        advice.push("Consider leaving earlier to avoid peak traffic");
    }
    advice.into_iter().map(str::to_string).collect()
}

/// Traffic picture of one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentReport {
    pub level: TrafficSeverity,
    /// Delay of the least-delayed alternative, minutes.
    pub delay: f64,
}

/// Evaluates route alternatives and whole-route conditions against the
/// injected routing and weather collaborators.
#[derive(Clone, Copy)]
pub struct ConditionsAnalyzer<'a> {
    routing: &'a dyn RoutingProvider,
    weather: &'a dyn WeatherProvider,
}

impl<'a> ConditionsAnalyzer<'a> {
    pub fn new(routing: &'a dyn RoutingProvider, weather: &'a dyn WeatherProvider) -> Self {
        Self { routing, weather }
    }

    /// Traffic level for one driving segment. `Unknown` when the provider
    /// fails or only an estimate is available.
    pub fn segment_traffic(&self, origin: GeoPoint, destination: GeoPoint) -> SegmentReport {
        let options = RouteOptions {
            alternatives: true,
            departure_time: None,
        };
        let directions = match self
            .routing
            .route(origin, destination, TravelMode::Driving, &options)
        {
            Ok(directions) if !directions.estimated => directions,
            Ok(_) => return unknown_segment(),
            Err(err) => {
                debug!(error = %err, "traffic lookup unavailable");
                return unknown_segment();
            }
        };

        let delays: Vec<f64> = directions.options().map(RouteOption::traffic_delay).collect();
        let max_delay = delays.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_delay = delays.iter().copied().fold(f64::INFINITY, f64::min);

        SegmentReport {
            level: classify_delay_minutes(max_delay),
            delay: min_delay,
        }
    }

    /// Traffic per segment, weather along the stops, and the combined safety
    /// summary for a finished route.
    pub fn analyze_route(&self, route: &[RouteLeg], start: &StartLocation) -> RouteConditions {
        let mut previous = start.location();
        let mut traffic = Vec::with_capacity(route.len());
        for leg in route {
            let parking = leg.parking_location.location();
            let report = self.segment_traffic(previous, parking);
            traffic.push(SegmentTraffic {
                stop_id: leg.stop.id.clone(),
                stop_order: leg.order,
                level: report.level,
                delay: report.delay,
                has_warnings: leg.route_conditions.has_warnings,
                message: traffic_message(report.level, report.delay),
                recommendation: traffic_recommendation(report.level, report.delay),
            });
            previous = parking;
        }

        let points: Vec<GeoPoint> = route.iter().map(|leg| leg.stop.location()).collect();
        let weather = if points.is_empty() {
            None
        } else {
            match self.weather.summarize(&points) {
                Ok(summary) => Some(summary),
                Err(err) => {
                    warn!(error = %err, "weather summary unavailable");
                    None
                }
            }
        };

        summarize_conditions(traffic, weather)
    }
}

impl std::fmt::Debug for ConditionsAnalyzer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionsAnalyzer").finish_non_exhaustive()
    }
}

fn unknown_segment() -> SegmentReport {
    SegmentReport {
        level: TrafficSeverity::Unknown,
        delay: 0.0,
    }
}

/// Fold per-segment traffic and the weather summary into [`RouteConditions`].
pub fn summarize_conditions(
    traffic: Vec<SegmentTraffic>,
    weather: Option<WeatherSummary>,
) -> RouteConditions {
    let congested = traffic.iter().filter(|t| t.level.is_congested()).count();
    let road_issues = traffic.iter().any(|t| t.has_warnings);

    let mut warnings: Vec<SafetyWarning> = weather
        .iter()
        .flat_map(|summary| summary.alerts.iter())
        .filter(|alert| alert.severity == AlertSeverity::High)
        .map(|alert| SafetyWarning {
            kind: WarningKind::Weather,
            message: alert.message.clone(),
            severity: alert.severity,
        })
        .collect();
    let high_weather = weather
        .as_ref()
        .is_some_and(WeatherSummary::has_high_severity_alert);

    let mut factors = Vec::new();
    if road_issues {
        factors.push("Road construction or closures detected".to_string());
        warnings.push(SafetyWarning {
            kind: WarningKind::Road,
            message: "Some routes may have construction or closures".to_string(),
            severity: AlertSeverity::Moderate,
        });
    }
    if congested > 0 && high_weather {
        factors.push("Heavy traffic and severe weather conditions".to_string());
    } else if congested > 0 {
        factors.push("Heavy traffic conditions".to_string());
    } else if high_weather {
        factors.push("Severe weather conditions".to_string());
    }

    let overall = classify_safety(congested, high_weather, road_issues);
    let recommendations = recommendations(overall, congested, weather.as_ref(), road_issues);

    RouteConditions {
        traffic,
        weather,
        safety: Safety {
            overall,
            factors,
            warnings,
        },
        recommendations,
    }
}

/// When a route should be recomputed from the vehicle's current position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReoptimizeThreshold {
    /// Segment delay in minutes above which the route is stale.
    pub delay_min: f64,
    pub level: TrafficSeverity,
}

impl Default for ReoptimizeThreshold {
    fn default() -> Self {
        Self {
            delay_min: 15.0,
            level: TrafficSeverity::Heavy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReoptimizeCause {
    Traffic,
    Weather,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReoptimizeAdvice {
    pub should_reoptimize: bool,
    pub reason: Option<String>,
    pub cause: Option<ReoptimizeCause>,
}

/// Whether current conditions warrant a fresh optimization.
pub fn should_reoptimize(
    conditions: &RouteConditions,
    threshold: ReoptimizeThreshold,
) -> ReoptimizeAdvice {
    let slow_segments = conditions
        .traffic
        .iter()
        .filter(|t| {
            t.delay > threshold.delay_min
                || t.level == threshold.level
                || t.level == TrafficSeverity::Severe
        })
        .count();
    let weather_warnings = conditions
        .safety
        .warnings
        .iter()
        .filter(|w| w.severity == AlertSeverity::High)
        .count();

    let (cause, reason) = if slow_segments > 0 {
        (
            Some(ReoptimizeCause::Traffic),
            Some(format!("Heavy traffic detected ({slow_segments} segments)")),
        )
    } else if weather_warnings > 0 {
        (
            Some(ReoptimizeCause::Weather),
            Some(format!("Severe weather warnings ({weather_warnings} alerts)")),
        )
    } else {
        (None, None)
    };

    ReoptimizeAdvice {
        should_reoptimize: reason.is_some(),
        reason,
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::{RouteStep, WeatherAlert};

    fn option(distance_km: f64, duration: f64, traffic: Option<f64>, steps: &[&str]) -> RouteOption {
        RouteOption {
            distance_km,
            duration_min: duration,
            duration_in_traffic_min: traffic,
            polyline: None,
            steps: steps
                .iter()
                .map(|text| RouteStep {
                    instruction: text.to_string(),
                    distance_km: 0.1,
                    duration_min: 0.2,
                })
                .collect(),
        }
    }

    fn segment(level: TrafficSeverity) -> SegmentTraffic {
        SegmentTraffic {
            stop_id: "s".into(),
            stop_order: 1,
            level,
            delay: 0.0,
            has_warnings: false,
            message: String::new(),
            recommendation: String::new(),
        }
    }

    fn high_alert(kind: AlertKind) -> WeatherSummary {
        WeatherSummary {
            alerts: vec![WeatherAlert {
                kind,
                severity: AlertSeverity::High,
                message: "Snow conditions".into(),
                location: None,
            }],
            summary: "snow".into(),
        }
    }

    #[test]
    fn score_adds_half_distance_and_warning_penalty() {
        let clean = option(10.0, 12.0, Some(15.0), &["turn left onto Main Street"]);
        assert_eq!(score_route(&clean), 20.0);

        let tolled = option(10.0, 12.0, Some(15.0), &["merge onto I-20 (toll)"]);
        assert_eq!(score_route(&tolled), 30.0);
        assert_eq!(road_warnings(&tolled), vec![RoadWarning::Toll]);
    }

    #[test]
    fn scored_route_reports_level_and_warning_text() {
        let directions = Directions {
            primary: option(10.0, 12.0, Some(16.0), &["Detour via Farmerville Highway"]),
            alternatives: Vec::new(),
            estimated: false,
        };

        let best = best_alternative(&directions);

        // 4 minutes on 12 is a 33% delay.
        assert_eq!(best.traffic_level(), TrafficSeverity::Heavy);
        assert_eq!(best.warning_messages(), vec!["Detour required"]);
    }

    #[test]
    fn marker_scan_is_case_insensitive_and_deduplicated() {
        let route = option(
            1.0,
            1.0,
            None,
            &["Road CLOSED ahead", "Construction zone", "closure continues"],
        );
        assert_eq!(
            road_warnings(&route),
            vec![RoadWarning::Closure, RoadWarning::Construction]
        );
    }

    #[test]
    fn best_alternative_prefers_strictly_lower_score() {
        let directions = Directions {
            primary: option(5.0, 10.0, Some(20.0), &[]),
            alternatives: vec![
                option(6.0, 10.0, Some(12.0), &["detour via Elm"]),
                option(6.0, 10.0, Some(12.0), &[]),
            ],
            estimated: false,
        };

        let best = best_alternative(&directions);
        assert_eq!(best.index, 2);
        assert_eq!(best.score, 15.0);
        assert!(!best.has_warnings());
    }

    #[test]
    fn best_alternative_keeps_primary_on_tie() {
        let directions = Directions {
            primary: option(5.0, 10.0, None, &[]),
            alternatives: vec![option(5.0, 10.0, None, &[])],
            estimated: false,
        };
        assert_eq!(best_alternative(&directions).index, 0);
    }

    #[test]
    fn delay_classification_thresholds() {
        assert_eq!(classify_delay_minutes(31.0), TrafficSeverity::Severe);
        assert_eq!(classify_delay_minutes(16.0), TrafficSeverity::Heavy);
        assert_eq!(classify_delay_minutes(6.0), TrafficSeverity::Moderate);
        assert_eq!(classify_delay_minutes(5.0), TrafficSeverity::Low);
        assert_eq!(classify_delay_percent(60.0), TrafficSeverity::Severe);
        assert_eq!(classify_delay_percent(30.0), TrafficSeverity::Heavy);
        assert_eq!(classify_delay_percent(11.0), TrafficSeverity::Moderate);
        assert_eq!(classify_delay_percent(10.0), TrafficSeverity::Low);
    }

    #[test]
    fn three_congested_segments_alone_are_poor() {
        assert_eq!(classify_safety(3, false, false), SafetyLevel::Poor);
    }

    #[test]
    fn congestion_with_high_weather_alert_is_poor() {
        assert_eq!(classify_safety(1, true, false), SafetyLevel::Poor);
    }

    #[test]
    fn single_congested_segment_is_moderate() {
        assert_eq!(classify_safety(1, false, false), SafetyLevel::Moderate);
        assert_eq!(classify_safety(2, false, false), SafetyLevel::Moderate);
        assert_eq!(classify_safety(0, true, false), SafetyLevel::Moderate);
    }

    #[test]
    fn no_signals_is_good() {
        assert_eq!(classify_safety(0, false, false), SafetyLevel::Good);
    }

    #[test]
    fn summary_for_poor_route_lists_all_recommendations() {
        let traffic = vec![
            segment(TrafficSeverity::Heavy),
            segment(TrafficSeverity::Low),
        ];
        let conditions = summarize_conditions(traffic, Some(high_alert(AlertKind::Snow)));

        assert_eq!(conditions.safety.overall, SafetyLevel::Poor);
        assert_eq!(
            conditions.safety.factors,
            vec!["Heavy traffic and severe weather conditions".to_string()]
        );
        assert_eq!(conditions.safety.warnings.len(), 1);
        assert_eq!(conditions.safety.warnings[0].kind, WarningKind::Weather);
        assert_eq!(
            conditions.recommendations,
            vec![
                "Consider delaying route or using alternative paths",
                "Allow extra time for traffic delays",
                "Exercise caution due to weather conditions",
                "Reduce speed in wet/icy conditions",
                "Consider leaving earlier to avoid peak traffic",
            ]
        );
    }

    #[test]
    fn moderate_weather_alone_stays_good() {
        let mut weather = high_alert(AlertKind::Rain);
        weather.alerts[0].severity = AlertSeverity::Moderate;

        let conditions = summarize_conditions(vec![segment(TrafficSeverity::Low)], Some(weather));

        assert_eq!(conditions.safety.overall, SafetyLevel::Good);
        assert!(conditions.safety.factors.is_empty());
        assert!(conditions.safety.warnings.is_empty());
        assert!(conditions.recommendations.is_empty());
        assert!(conditions.weather.is_some());
    }

    #[test]
    fn road_warnings_add_factor_and_warning() {
        let mut flagged = segment(TrafficSeverity::Low);
        flagged.has_warnings = true;
        let conditions = summarize_conditions(vec![flagged], None);

        assert_eq!(conditions.safety.overall, SafetyLevel::Moderate);
        assert_eq!(conditions.safety.warnings[0].kind, WarningKind::Road);
        assert_eq!(
            conditions.recommendations,
            vec!["Watch for construction zones and road closures"]
        );
    }

    #[test]
    fn quiet_route_has_no_recommendations() {
        let conditions = summarize_conditions(vec![segment(TrafficSeverity::Low)], None);
        assert_eq!(conditions.safety.overall, SafetyLevel::Good);
        assert!(conditions.safety.factors.is_empty());
        assert!(conditions.recommendations.is_empty());
    }

    #[test]
    fn reoptimize_on_slow_segment() {
        let mut slow = segment(TrafficSeverity::Moderate);
        slow.delay = 20.0;
        let conditions = summarize_conditions(vec![slow], None);

        let advice = should_reoptimize(&conditions, ReoptimizeThreshold::default());
        assert!(advice.should_reoptimize);
        assert_eq!(advice.cause, Some(ReoptimizeCause::Traffic));
        assert_eq!(
            advice.reason.as_deref(),
            Some("Heavy traffic detected (1 segments)")
        );
    }

    #[test]
    fn reoptimize_on_weather_only() {
        let conditions =
            summarize_conditions(vec![segment(TrafficSeverity::Low)], Some(high_alert(AlertKind::Fog)));
        let advice = should_reoptimize(&conditions, ReoptimizeThreshold::default());
        assert!(advice.should_reoptimize);
        assert_eq!(advice.cause, Some(ReoptimizeCause::Weather));
    }

    #[test]
    fn quiet_route_needs_no_reoptimization() {
        let conditions = summarize_conditions(vec![segment(TrafficSeverity::Low)], None);
        let advice = should_reoptimize(&conditions, ReoptimizeThreshold::default());
        assert!(!advice.should_reoptimize);
        assert_eq!(advice.cause, None);
        assert_eq!(advice.reason, None);
    }

    #[test]
    fn traffic_templates() {
        assert_eq!(
            traffic_message(TrafficSeverity::Heavy, 17.0),
            "Heavy traffic (17.0 min delay)"
        );
        assert_eq!(
            traffic_recommendation(TrafficSeverity::Low, 0.0),
            "Normal traffic conditions"
        );
        assert_eq!(
            traffic_recommendation(TrafficSeverity::Low, 40.0),
            "Consider alternative route or delay departure"
        );
    }
}

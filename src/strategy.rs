//! Multi-strategy route optimization.
//!
//! Every applicable planner runs against the same planning stops and matrix,
//! each with its own leg resolver, and the route with the lowest composite
//! score wins. Strategies run in parallel; results keep registration order so
//! ties go to the earlier strategy.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::cluster::representatives;
use crate::conditions::ConditionsAnalyzer;
use crate::config::OptimizerConfig;
use crate::error::PlannerError;
use crate::features::{Conditions, MAX_STOPS, extract_features};
use crate::haversine::HaversineMatrix;
use crate::learner::Learner;
use crate::legs::LegResolver;
use crate::planner::{
    PlanContext, build_route_from_order, has_priorities, has_time_windows, nearest_neighbor,
    priority_based, time_window,
};
use crate::traits::{Collaborators, DistanceMatrixProvider};
use crate::types::{
    GeoPoint, OptimizationResult, RouteLeg, RouteStatistics, StartLocation, Stop, Strategy,
    StrategyResult,
};

/// Reject structurally invalid input. Everything past this point degrades
/// instead of failing.
pub fn validate(stops: &[Stop], start: &StartLocation) -> Result<(), PlannerError> {
    if stops.is_empty() {
        return Err(PlannerError::NoStops);
    }
    if !start.location().is_valid() {
        return Err(PlannerError::InvalidStartLocation(format!(
            "coordinates ({}, {}) are not a valid position",
            start.lat, start.lng
        )));
    }
    for (index, stop) in stops.iter().enumerate() {
        if !stop.location().is_valid() {
            return Err(PlannerError::InvalidStop {
                index,
                reason: format!(
                    "coordinates ({}, {}) are not a valid position",
                    stop.lat, stop.lng
                ),
            });
        }
    }
    Ok(())
}

/// Strategies worth running for `stops`, in registration order.
pub fn applicable_strategies(stops: &[Stop], model: Option<&Learner>) -> Vec<Strategy> {
    let mut strategies = vec![Strategy::NearestNeighbor];
    if has_priorities(stops) {
        strategies.push(Strategy::PriorityBased);
    }
    if has_time_windows(stops) {
        strategies.push(Strategy::TimeWindow);
    }
    if model.is_some() && stops.len() <= MAX_STOPS {
        strategies.push(Strategy::Learned);
    }
    strategies
}

/// Independent RNG stream per strategy.
pub fn strategy_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Stop order predicted by `model`, restricted to the stops present.
pub fn learned_order(model: &Learner, ctx: &PlanContext<'_>) -> Option<Vec<usize>> {
    let conditions = Conditions::at(ctx.start_time_ms);
    let features = extract_features(
        ctx.stops,
        ctx.start.location(),
        &conditions,
        ctx.start_time_ms,
    );
    match model.predict(&features) {
        Ok(order) => Some(
            order
                .into_iter()
                .filter(|&index| index < ctx.stops.len())
                .collect(),
        ),
        Err(err) => {
            warn!(error = %err, "learned strategy skipped");
            None
        }
    }
}

/// Run one strategy to a full route. Only the learned strategy can decline.
pub fn run_strategy(
    strategy: Strategy,
    ctx: &PlanContext<'_>,
    resolver: &mut LegResolver<'_>,
    model: Option<&Learner>,
) -> Option<StrategyResult> {
    let route = match strategy {
        Strategy::NearestNeighbor => nearest_neighbor(ctx, resolver),
        Strategy::PriorityBased => priority_based(ctx, resolver),
        Strategy::TimeWindow => time_window(ctx, resolver),
        Strategy::Learned => {
            let order = learned_order(model?, ctx)?;
            build_route_from_order(ctx, resolver, &order)
        }
    };
    Some(StrategyResult::from_legs(strategy, route))
}

/// Runs the applicable strategies against one set of collaborators.
pub struct StrategyRunner<'a> {
    collaborators: Collaborators<'a>,
    parking_radius_m: f64,
    seed: u64,
    model: Option<&'a Learner>,
}

impl<'a> StrategyRunner<'a> {
    pub fn new(collaborators: Collaborators<'a>, parking_radius_m: f64, seed: u64) -> Self {
        Self {
            collaborators,
            parking_radius_m,
            seed,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<&'a Learner>) -> Self {
        self.model = model;
        self
    }

    /// Candidate results in registration order.
    pub fn run(&self, ctx: &PlanContext<'_>) -> Vec<StrategyResult> {
        let strategies = applicable_strategies(ctx.stops, self.model);
        debug!(?strategies, "running strategies");

        strategies
            .par_iter()
            .enumerate()
            .filter_map(|(index, &strategy)| {
                let mut resolver = LegResolver::new(
                    self.collaborators,
                    self.parking_radius_m,
                    strategy_seed(self.seed, index),
                );
                run_strategy(strategy, ctx, &mut resolver, self.model)
            })
            .collect()
    }
}

impl std::fmt::Debug for StrategyRunner<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrategyRunner")
            .field("parking_radius_m", &self.parking_radius_m)
            .field("seed", &self.seed)
            .field("has_model", &self.model.is_some())
            .finish_non_exhaustive()
    }
}

/// Lowest composite score wins; the earlier candidate keeps exact ties.
pub fn select_best(results: Vec<StrategyResult>) -> Option<StrategyResult> {
    let mut best: Option<StrategyResult> = None;
    for result in results {
        let score = result.composite_score();
        debug!(strategy = %result.strategy, score, "candidate route");
        if best
            .as_ref()
            .is_none_or(|current| score < current.composite_score())
        {
            best = Some(result);
        }
    }
    if let Some(best) = &best {
        info!(
            strategy = %best.strategy,
            score = best.composite_score(),
            "selected route"
        );
    }
    best
}

/// Aggregates the winning route into the final record.
pub struct RouteAssembler<'a> {
    analyzer: ConditionsAnalyzer<'a>,
}

impl<'a> RouteAssembler<'a> {
    pub fn new(collaborators: Collaborators<'a>) -> Self {
        Self {
            analyzer: ConditionsAnalyzer::new(collaborators.routing, collaborators.weather),
        }
    }

    /// `total_stops` counts the caller's stops, before clustering.
    pub fn statistics(result: &StrategyResult, total_stops: usize) -> RouteStatistics {
        let route: &[RouteLeg] = &result.route;
        let per_stop = if total_stops == 0 {
            0.0
        } else {
            result.total_distance / total_stops as f64
        };

        RouteStatistics {
            total_stops,
            total_distance: result.total_distance,
            total_vehicle_distance: route.iter().map(|leg| leg.vehicle_distance).sum(),
            total_walking_distance: route.iter().map(|leg| leg.walking_distance).sum(),
            estimated_time: result.total_distance * crate::planner::MINUTES_PER_KM,
            estimated_vehicle_time: route.iter().map(|leg| leg.estimated_vehicle_time).sum(),
            estimated_walking_time: route.iter().map(|leg| leg.estimated_walking_time).sum(),
            average_distance_per_stop: per_stop,
        }
    }

    pub fn assemble(
        &self,
        best: StrategyResult,
        start: &StartLocation,
        total_stops: usize,
    ) -> OptimizationResult {
        let statistics = Self::statistics(&best, total_stops);
        let conditions = self.analyzer.analyze_route(&best.route, start);

        OptimizationResult {
            route: best.route,
            statistics,
            optimized: true,
            best_strategy: best.strategy,
            conditions,
        }
    }
}

impl std::fmt::Debug for RouteAssembler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteAssembler").finish_non_exhaustive()
    }
}

/// Order `stops` from `start`.
///
/// Collaborator failures fall back to estimates; only structurally invalid
/// input is an error. `model` adds the learned strategy when
/// `config.use_learner` is set.
pub fn optimize_route(
    stops: &[Stop],
    start: &StartLocation,
    config: &OptimizerConfig,
    collaborators: Collaborators<'_>,
    model: Option<&Learner>,
) -> Result<OptimizationResult, PlannerError> {
    validate(stops, start)?;

    let planning_stops = if config.enable_clustering {
        let reps = representatives(stops, config.cluster_distance_km);
        info!(stops = stops.len(), clusters = reps.len(), "clustered stops");
        reps
    } else {
        stops.to_vec()
    };

    let mut points: Vec<GeoPoint> = Vec::with_capacity(planning_stops.len() + 1);
    points.push(start.location());
    points.extend(planning_stops.iter().map(Stop::location));
    let matrix = HaversineMatrix::default().matrix_for(&points);

    let start_time_ms = config.resolved_start_time();
    let ctx = PlanContext::new(&planning_stops, start, &matrix, start_time_ms);
    let model = model.filter(|_| config.use_learner);

    let runner = StrategyRunner::new(collaborators, config.parking_radius_m, config.resolved_seed())
        .with_model(model);
    let best = select_best(runner.run(&ctx)).ok_or(PlannerError::NoStops)?;

    Ok(RouteAssembler::new(collaborators).assemble(best, start, stops.len()))
}

//! Greedy constrained planners.
//!
//! All planners share one walk: pick the next stop, resolve its legs through
//! [`LegResolver`], then advance the simulated position to the parking spot
//! and the simulated clock by the traffic-aware vehicle time. They differ only
//! in how the next stop is picked.
//!
//! Scores read the planning matrix (index 0 is the start, index `k + 1` is
//! stop `k`). Reported legs use the resolved parking spots.

use tracing::{debug, warn};

use crate::haversine::DistanceMatrix;
use crate::legs::LegResolver;
use crate::types::{DEFAULT_PRIORITY, GeoPoint, RouteLeg, StartLocation, Stop};

/// Simulated driving minutes per planning kilometre.
pub const MINUTES_PER_KM: f64 = 1.5;

/// Penalty per minute of lateness past a window end.
const LATE_PENALTY: f64 = 10.0;

/// Inputs shared by every planner in one optimization run.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'p> {
    pub stops: &'p [Stop],
    pub start: &'p StartLocation,
    pub matrix: &'p DistanceMatrix,
    pub start_time_ms: i64,
}

impl<'p> PlanContext<'p> {
    pub fn new(
        stops: &'p [Stop],
        start: &'p StartLocation,
        matrix: &'p DistanceMatrix,
        start_time_ms: i64,
    ) -> Self {
        Self {
            stops,
            start,
            matrix,
            start_time_ms,
        }
    }
}

/// Whether any stop carries a non-default priority.
pub fn has_priorities(stops: &[Stop]) -> bool {
    stops.iter().any(|stop| stop.priority_level() != DEFAULT_PRIORITY)
}

/// Whether any stop carries a time window.
pub fn has_time_windows(stops: &[Stop]) -> bool {
    stops.iter().any(|stop| stop.time_window.is_some())
}

fn window_start(stop: &Stop) -> i64 {
    stop.time_window.map_or(i64::MAX, |window| window.start)
}

/// Stop indices sorted by (priority, earliest window start). Stable, so input
/// order breaks the remaining ties.
pub fn presort(stops: &[Stop]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..stops.len()).collect();
    order.sort_by_key(|&i| (stops[i].priority_level(), window_start(&stops[i])));
    order
}

/// Score of a candidate for the first pick. Proximity dominates; urgency and
/// top priority only nudge it.
pub fn first_stop_score(stop: &Stop, distance_km: f64) -> f64 {
    let top_priority = stop.priority_level() == 1;
    if !stop.urgent && !top_priority {
        return distance_km;
    }

    let mut score = distance_km * 0.85;
    if stop.urgent {
        score *= 0.9;
    }
    if top_priority {
        score *= 0.95;
    }
    score
}

/// Score of a candidate for every pick after the first.
pub fn next_stop_score(stop: &Stop, distance_km: f64, clock_ms: i64) -> f64 {
    let priority = f64::from(stop.priority_level());
    let mut score = distance_km * ((4.0 - priority) / 3.0);

    if let Some(window) = stop.time_window {
        let arrival = clock_ms as f64 + distance_km * MINUTES_PER_KM * 60_000.0;
        if arrival < window.start as f64 {
            score += (window.start as f64 - arrival) / 60_000.0;
        } else if arrival > window.end as f64 {
            score += LATE_PENALTY * (arrival - window.end as f64) / 60_000.0;
        }
    }

    if stop.urgent {
        score *= 0.5;
    }
    score
}

/// In-progress route: simulated position, clock and the legs so far.
struct Walk<'c, 'p, 'r, 'a> {
    ctx: &'c PlanContext<'p>,
    resolver: &'r mut LegResolver<'a>,
    position: GeoPoint,
    matrix_index: usize,
    clock_ms: i64,
    visited: Vec<bool>,
    legs: Vec<RouteLeg>,
}

impl<'c, 'p, 'r, 'a> Walk<'c, 'p, 'r, 'a> {
    fn new(ctx: &'c PlanContext<'p>, resolver: &'r mut LegResolver<'a>) -> Self {
        Self {
            ctx,
            resolver,
            position: ctx.start.location(),
            matrix_index: 0,
            clock_ms: ctx.start_time_ms,
            visited: vec![false; ctx.stops.len()],
            legs: Vec::with_capacity(ctx.stops.len()),
        }
    }

    fn distance_to(&self, stop_index: usize) -> f64 {
        self.ctx.matrix.get(self.matrix_index, stop_index + 1)
    }

    fn is_done(&self) -> bool {
        self.legs.len() == self.ctx.stops.len()
    }

    fn unvisited<'o>(&'o self, order: &'o [usize]) -> impl Iterator<Item = usize> + 'o {
        order.iter().copied().filter(|&i| !self.visited[i])
    }

    fn visit(&mut self, stop_index: usize) {
        let stop = &self.ctx.stops[stop_index];
        let distance = self.distance_to(stop_index);
        let leg = self.resolver.resolve(
            stop,
            self.legs.len() + 1,
            self.position,
            distance,
            self.clock_ms,
        );
        debug!(stop = %stop.id, order = leg.order, distance, "stop selected");

        self.position = leg.parking_location.location();
        self.clock_ms = leg.estimated_arrival;
        self.matrix_index = stop_index + 1;
        self.visited[stop_index] = true;
        self.legs.push(leg);
    }

    fn finish(self) -> Vec<RouteLeg> {
        self.legs
    }
}

/// Lowest finite score among `candidates`; the earliest wins ties.
fn min_by_score(candidates: impl Iterator<Item = (usize, f64)>) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, score) in candidates {
        if !score.is_finite() {
            continue;
        }
        if best.is_none_or(|(_, best_score)| score < best_score) {
            best = Some((index, score));
        }
    }
    best.map(|(index, _)| index)
}

/// Nearest-neighbor planner with priority, urgency and time-window scoring.
pub fn nearest_neighbor(ctx: &PlanContext<'_>, resolver: &mut LegResolver<'_>) -> Vec<RouteLeg> {
    let order = presort(ctx.stops);
    let mut walk = Walk::new(ctx, resolver);

    while !walk.is_done() {
        let first = walk.legs.is_empty();
        let scored = walk.unvisited(&order).map(|i| {
            let stop = &ctx.stops[i];
            let distance = walk.distance_to(i);
            let score = if first {
                first_stop_score(stop, distance)
            } else {
                next_stop_score(stop, distance, walk.clock_ms)
            };
            (i, score)
        });

        let next = match min_by_score(scored) {
            Some(next) => next,
            None => {
                warn!("no scorable stop left; appending in presort order");
                match walk.unvisited(&order).next() {
                    Some(next) => next,
                    None => break,
                }
            }
        };
        walk.visit(next);
    }

    walk.finish()
}

/// Pick the unvisited stops with the lowest `key`, then the nearest among
/// them. Presort order breaks distance ties.
fn keyed_nearest<K, F>(ctx: &PlanContext<'_>, resolver: &mut LegResolver<'_>, key: F) -> Vec<RouteLeg>
where
    K: Ord,
    F: Fn(&Stop) -> K,
{
    let order = presort(ctx.stops);
    let mut walk = Walk::new(ctx, resolver);

    while !walk.is_done() {
        let Some(min_key) = walk.unvisited(&order).map(|i| key(&ctx.stops[i])).min() else {
            break;
        };
        let group: Vec<usize> = walk
            .unvisited(&order)
            .filter(|&i| key(&ctx.stops[i]) == min_key)
            .collect();

        let next = min_by_score(group.iter().map(|&i| (i, walk.distance_to(i))))
            .or_else(|| group.first().copied());
        match next {
            Some(next) => walk.visit(next),
            None => break,
        }
    }

    walk.finish()
}

/// Strict priority first, nearest neighbor within one priority level.
pub fn priority_based(ctx: &PlanContext<'_>, resolver: &mut LegResolver<'_>) -> Vec<RouteLeg> {
    keyed_nearest(ctx, resolver, Stop::priority_level)
}

/// Earliest window start first; stops without a window go last.
pub fn time_window(ctx: &PlanContext<'_>, resolver: &mut LegResolver<'_>) -> Vec<RouteLeg> {
    keyed_nearest(ctx, resolver, window_start)
}

/// Resolve a route that visits stops in a given order.
///
/// Out-of-range and repeated indices are ignored; stops the order leaves out
/// are appended in input order, so every stop appears exactly once.
pub fn build_route_from_order(
    ctx: &PlanContext<'_>,
    resolver: &mut LegResolver<'_>,
    order: &[usize],
) -> Vec<RouteLeg> {
    let mut walk = Walk::new(ctx, resolver);

    for &index in order {
        if index < ctx.stops.len() && !walk.visited[index] {
            walk.visit(index);
        }
    }
    for index in 0..ctx.stops.len() {
        if !walk.visited[index] {
            walk.visit(index);
        }
    }

    walk.finish()
}

/// Stop ids in visiting order.
pub fn stop_ids(route: &[RouteLeg]) -> Vec<&str> {
    let mut legs: Vec<&RouteLeg> = route.iter().collect();
    legs.sort_by_key(|leg| leg.order);
    legs.into_iter().map(|leg| leg.stop.id.as_str()).collect()
}

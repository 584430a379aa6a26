//! Resolution of one stop into a parking spot, a vehicle leg and a walking leg.
//!
//! Every collaborator call has a deterministic fallback: a missing parking
//! spot is synthesized near the stop, a missing route is estimated with the
//! mode multipliers. Resolution is sequential within a route because each
//! vehicle leg starts at the previous leg's parking spot.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use crate::conditions::best_alternative;
use crate::haversine::{estimate_directions, haversine_km};
use crate::traits::{Collaborators, Directions, RouteOption, RouteOptions};
use crate::types::{GeoPoint, LegConditions, ParkingSpot, RouteLeg, Stop, TravelMode};

/// Kilometres per degree of latitude, roughly.
const KM_PER_DEGREE: f64 = 111.0;

/// Synthesize a parking spot within the search radius of `point`.
///
/// The offset is random (from `rng`); the walking distance is the
/// great-circle distance to it.
pub fn estimated_parking(point: GeoPoint, radius_m: f64, rng: &mut impl Rng) -> ParkingSpot {
    let offset = radius_m / 1000.0 / KM_PER_DEGREE;
    let lat = point.lat + (rng.gen_range(0.0..1.0) - 0.5) * offset * 0.5;
    let lng = point.lng + (rng.gen_range(0.0..1.0) - 0.5) * offset * 0.5;
    let walking_distance_km = haversine_km(GeoPoint::new(lat, lng), point);

    ParkingSpot {
        lat,
        lng,
        name: "Estimated Parking".to_string(),
        walking_distance_km,
        estimated: true,
    }
}

/// The chosen vehicle route and its annotations.
#[derive(Debug, Clone, PartialEq)]
pub struct VehicleLeg {
    pub route: RouteOption,
    pub conditions: LegConditions,
}

/// Resolves stops into legs against one set of collaborators.
///
/// Owns the RNG for fallback parking offsets so that independent planner runs
/// never share mutable state.
pub struct LegResolver<'a> {
    collaborators: Collaborators<'a>,
    parking_radius_m: f64,
    rng: ChaCha8Rng,
}

impl<'a> LegResolver<'a> {
    pub fn new(collaborators: Collaborators<'a>, parking_radius_m: f64, seed: u64) -> Self {
        Self {
            collaborators,
            parking_radius_m,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Parking spot near `point`, falling back to an estimate.
    pub fn parking_for(&mut self, point: GeoPoint) -> ParkingSpot {
        match self.collaborators.parking.find(point, self.parking_radius_m) {
            Ok(spot) => spot,
            Err(err) => {
                debug!(error = %err, "using estimated parking");
                estimated_parking(point, self.parking_radius_m, &mut self.rng)
            }
        }
    }

    /// Driving leg between two points. An alternative replaces the primary
    /// route only when it scores strictly lower.
    pub fn vehicle_leg(&self, from: GeoPoint, to: GeoPoint) -> VehicleLeg {
        let options = RouteOptions {
            alternatives: true,
            departure_time: None,
        };
        let directions = self.directions(from, to, TravelMode::Driving, &options);
        if directions.estimated {
            return VehicleLeg {
                route: directions.primary,
                conditions: LegConditions::default(),
            };
        }

        let best = best_alternative(&directions);
        let conditions = LegConditions {
            has_warnings: best.has_warnings(),
            route_score: Some(best.score),
        };
        debug!(
            index = best.index,
            score = best.score,
            level = ?best.traffic_level(),
            warnings = ?best.warning_messages(),
            "vehicle route chosen"
        );
        VehicleLeg {
            route: best.option.clone(),
            conditions,
        }
    }

    /// Walking leg between two points.
    pub fn walking_leg(&self, from: GeoPoint, to: GeoPoint) -> RouteOption {
        self.directions(from, to, TravelMode::Walking, &RouteOptions::default())
            .primary
    }

    fn directions(
        &self,
        from: GeoPoint,
        to: GeoPoint,
        mode: TravelMode,
        options: &RouteOptions,
    ) -> Directions {
        match self.collaborators.routing.route(from, to, mode, options) {
            Ok(directions) => directions,
            Err(err) => {
                debug!(error = %err, ?mode, "using estimated route");
                estimate_directions(from, to, mode)
            }
        }
    }

    /// Resolve `stop` as the `order`-th leg of a route.
    ///
    /// `from` is the previous resolved point (start or previous parking spot),
    /// `clock_ms` the simulated departure time from it.
    pub fn resolve(
        &mut self,
        stop: &Stop,
        order: usize,
        from: GeoPoint,
        distance_from_previous: f64,
        clock_ms: i64,
    ) -> RouteLeg {
        let parking = self.parking_for(stop.location());
        let vehicle = self.vehicle_leg(from, parking.location());
        let walking = self.walking_leg(parking.location(), stop.location());

        let vehicle_time = vehicle.route.traffic_aware_duration();

        RouteLeg {
            stop: stop.clone(),
            order,
            distance_from_previous,
            vehicle_distance: vehicle.route.distance_km,
            vehicle_duration: vehicle.route.duration_min,
            vehicle_duration_in_traffic: vehicle.route.duration_in_traffic_min,
            vehicle_traffic_delay: vehicle.route.traffic_delay(),
            vehicle_polyline: vehicle.route.polyline,
            vehicle_steps: vehicle.route.steps,
            walking_distance: walking.distance_km,
            walking_duration: walking.duration_min,
            walking_polyline: walking.polyline,
            walking_steps: walking.steps,
            parking_location: parking,
            estimated_arrival: clock_ms.saturating_add(minutes_to_ms(vehicle_time)),
            estimated_vehicle_time: vehicle_time,
            estimated_walking_time: walking.duration_min,
            route_conditions: vehicle.conditions,
        }
    }
}

impl std::fmt::Debug for LegResolver<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegResolver")
            .field("parking_radius_m", &self.parking_radius_m)
            .finish_non_exhaustive()
    }
}

/// Non-finite or negative durations do not move the clock.
pub(crate) fn minutes_to_ms(minutes: f64) -> i64 {
    if minutes.is_finite() && minutes > 0.0 {
        (minutes * 60_000.0).round() as i64
    } else {
        0
    }
}

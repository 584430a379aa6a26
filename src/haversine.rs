//! Great-circle distance and multiplier-based road estimates.
//!
//! Used for planning scores and as the fallback whenever live routing is
//! unavailable. Less accurate than a routing engine (ignores roads) but always
//! available.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::traits::{Directions, DistanceMatrixProvider, RouteOption, RouteOptions, RoutingProvider};
use crate::types::{GeoPoint, TravelMode};

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

const DRIVING_MULTIPLIER: f64 = 1.3;
const WALKING_MULTIPLIER: f64 = 1.1;
const BICYCLING_MULTIPLIER: f64 = 1.15;

const DRIVING_SPEED_KMH: f64 = 40.0;
const WALKING_SPEED_KMH: f64 = 6.0;
const BICYCLING_SPEED_KMH: f64 = 15.0;

/// Great-circle distance between two points in kilometers.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1_rad = from.lat.to_radians();
    let lat2_rad = to.lat.to_radians();
    let delta_lat = (to.lat - from.lat).to_radians();
    let delta_lng = (to.lng - from.lng).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

/// Ratio of road (or path) distance to straight-line distance.
pub fn road_multiplier(mode: TravelMode) -> f64 {
    match mode {
        TravelMode::Driving => DRIVING_MULTIPLIER,
        TravelMode::Walking => WALKING_MULTIPLIER,
        TravelMode::Bicycling => BICYCLING_MULTIPLIER,
    }
}

/// Assumed average speed for the mode.
pub fn speed_kmh(mode: TravelMode) -> f64 {
    match mode {
        TravelMode::Driving => DRIVING_SPEED_KMH,
        TravelMode::Walking => WALKING_SPEED_KMH,
        TravelMode::Bicycling => BICYCLING_SPEED_KMH,
    }
}

/// Estimated road distance in kilometers.
pub fn road_distance_km(from: GeoPoint, to: GeoPoint, mode: TravelMode) -> f64 {
    haversine_km(from, to) * road_multiplier(mode)
}

/// Convert a distance in km to travel minutes at the mode's assumed speed.
pub fn estimated_minutes(km: f64, mode: TravelMode) -> f64 {
    km / speed_kmh(mode) * 60.0
}

/// Multiplier-based directions, the fallback for every routing call.
pub fn estimate_directions(from: GeoPoint, to: GeoPoint, mode: TravelMode) -> Directions {
    let distance_km = road_distance_km(from, to, mode);
    Directions {
        primary: RouteOption {
            distance_km,
            duration_min: estimated_minutes(distance_km, mode),
            duration_in_traffic_min: None,
            polyline: None,
            steps: Vec::new(),
        },
        alternatives: Vec::new(),
        estimated: true,
    }
}

/// Square matrix of estimated road distances in km.
///
/// Index 0 is the start location, index `k + 1` is stop `k`. The diagonal is
/// zero; symmetry is not guaranteed once live values are substituted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    size: usize,
    values: Vec<f64>,
}

impl DistanceMatrix {
    /// A `size`×`size` matrix of zeros.
    pub fn zeros(size: usize) -> Self {
        Self {
            size,
            values: vec![0.0; size * size],
        }
    }

    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Distance from `from` to `to`, or infinity when either index is out of range.
    pub fn get(&self, from: usize, to: usize) -> f64 {
        if from >= self.size || to >= self.size {
            return f64::INFINITY;
        }
        self.values[from * self.size + to]
    }

    /// Substitute a value, e.g. a live routing distance. Diagonal writes are ignored.
    pub fn set(&mut self, from: usize, to: usize, km: f64) {
        if from < self.size && to < self.size && from != to {
            self.values[from * self.size + to] = km;
        }
    }

    pub fn row(&self, from: usize) -> &[f64] {
        let start = from.min(self.size) * self.size;
        let end = if from < self.size { start + self.size } else { start };
        &self.values[start..end]
    }
}

/// Haversine-based distance matrix provider.
///
/// Applies the driving multiplier uniformly; the values feed planning scores,
/// not necessarily the final reported distances.
#[derive(Debug, Clone)]
pub struct HaversineMatrix {
    pub multiplier: f64,
}

impl Default for HaversineMatrix {
    fn default() -> Self {
        Self {
            multiplier: DRIVING_MULTIPLIER,
        }
    }
}

impl HaversineMatrix {
    pub fn new(multiplier: f64) -> Self {
        Self { multiplier }
    }
}

impl DistanceMatrixProvider for HaversineMatrix {
    fn matrix_for(&self, locations: &[GeoPoint]) -> DistanceMatrix {
        let mut matrix = DistanceMatrix::zeros(locations.len());

        for (i, from) in locations.iter().enumerate() {
            for (j, to) in locations.iter().enumerate() {
                if i != j {
                    matrix.set(i, j, haversine_km(*from, *to) * self.multiplier);
                }
            }
        }

        matrix
    }
}

/// Full pairwise driving-distance matrix.
pub fn distance_matrix(locations: &[GeoPoint]) -> DistanceMatrix {
    HaversineMatrix::default().matrix_for(locations)
}

/// Routing provider that always answers with the multiplier estimate.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaversineRouter;

impl RoutingProvider for HaversineRouter {
    fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
        _options: &RouteOptions,
    ) -> Result<Directions, ProviderError> {
        Ok(estimate_directions(origin, destination, mode))
    }
}

//! Hand-written collaborator mocks.

use std::sync::Mutex;

use delivery_planner::error::ProviderError;
use delivery_planner::haversine::haversine_km;
use delivery_planner::traits::{
    AlertKind, AlertSeverity, Directions, ParkingLocator, RouteOption, RouteOptions, RouteStep,
    RoutingProvider, WeatherAlert, WeatherProvider, WeatherSummary,
};
use delivery_planner::types::{GeoPoint, ParkingSpot, TravelMode};
use delivery_planner::weather::{ObservationSource, WeatherObservation};

/// Live-looking routes: road distance from the driving multiplier, base time
/// at 40 km/h, traffic time scaled by `traffic_factor`. Records every call.
pub struct TrafficRouter {
    pub traffic_factor: f64,
    pub calls: Mutex<Vec<(GeoPoint, GeoPoint, TravelMode)>>,
}

impl TrafficRouter {
    pub fn new(traffic_factor: f64) -> Self {
        Self {
            traffic_factor,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(GeoPoint, GeoPoint, TravelMode)> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl RoutingProvider for TrafficRouter {
    fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
        options: &RouteOptions,
    ) -> Result<Directions, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((origin, destination, mode));
        }

        let km = haversine_km(origin, destination);
        let (distance_km, duration_min) = match mode {
            TravelMode::Walking => (km * 1.1, km * 1.1 / 6.0 * 60.0),
            _ => (km * 1.3, km * 1.3 / 40.0 * 60.0),
        };
        let primary = RouteOption {
            distance_km,
            duration_min,
            duration_in_traffic_min: Some(duration_min * self.traffic_factor),
            polyline: None,
            steps: vec![RouteStep {
                instruction: "depart onto Trenton Street".into(),
                distance_km,
                duration_min,
            }],
        };

        let alternatives = if options.alternatives && mode == TravelMode::Driving {
            vec![RouteOption {
                distance_km: distance_km * 1.5,
                duration_min: duration_min * 1.5,
                duration_in_traffic_min: Some(duration_min * 1.5 * self.traffic_factor),
                polyline: None,
                steps: vec![RouteStep {
                    instruction: "Road construction on Farmerville Highway".into(),
                    distance_km: distance_km * 1.5,
                    duration_min: duration_min * 1.5,
                }],
            }]
        } else {
            Vec::new()
        };

        Ok(Directions {
            primary,
            alternatives,
            estimated: false,
        })
    }
}

/// Returns nonsense for every request.
pub struct GarbageRouter;

impl RoutingProvider for GarbageRouter {
    fn route(
        &self,
        _origin: GeoPoint,
        _destination: GeoPoint,
        _mode: TravelMode,
        _options: &RouteOptions,
    ) -> Result<Directions, ProviderError> {
        Ok(Directions {
            primary: RouteOption {
                distance_km: f64::NAN,
                duration_min: -5.0,
                duration_in_traffic_min: Some(f64::INFINITY),
                polyline: None,
                steps: Vec::new(),
            },
            alternatives: Vec::new(),
            estimated: false,
        })
    }
}

/// Parking a fixed offset north of every stop.
pub struct FixedParking {
    pub offset_deg: f64,
}

impl ParkingLocator for FixedParking {
    fn find(&self, point: GeoPoint, _radius_m: f64) -> Result<ParkingSpot, ProviderError> {
        let lat = point.lat + self.offset_deg;
        Ok(ParkingSpot {
            lat,
            lng: point.lng,
            name: "Curbside".into(),
            walking_distance_km: haversine_km(GeoPoint::new(lat, point.lng), point),
            estimated: false,
        })
    }
}

/// Same parking spot whatever the stop.
pub struct OneLotParking;

impl ParkingLocator for OneLotParking {
    fn find(&self, _point: GeoPoint, _radius_m: f64) -> Result<ParkingSpot, ProviderError> {
        Ok(ParkingSpot {
            lat: 32.5232,
            lng: -92.6379,
            name: "Railroad Park Lot".into(),
            walking_distance_km: 0.0,
            estimated: false,
        })
    }
}

/// A storm over the whole area.
pub struct StormWeather {
    pub kind: AlertKind,
}

impl WeatherProvider for StormWeather {
    fn summarize(&self, points: &[GeoPoint]) -> Result<WeatherSummary, ProviderError> {
        Ok(WeatherSummary {
            alerts: vec![WeatherAlert {
                kind: self.kind,
                severity: AlertSeverity::High,
                message: format!("Severe storm over {} stops", points.len()),
                location: Some("Lincoln Parish".into()),
            }],
            summary: "Storms".into(),
        })
    }
}

/// The same observation everywhere.
pub struct SteadyObservation(pub WeatherObservation);

impl ObservationSource for SteadyObservation {
    fn observe(&self, _point: GeoPoint) -> Result<WeatherObservation, ProviderError> {
        Ok(self.0.clone())
    }
}

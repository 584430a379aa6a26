//! OSRM HTTP adapter for point-to-point routes.
//!
//! Calls the `route` service with alternatives and steps enabled and converts
//! the answer into [`Directions`]: metres to km, seconds to minutes, encoded
//! geometry to [`Polyline`]. OSRM has no live traffic, so
//! `duration_in_traffic_min` is always `None`.

use reqwest::StatusCode;
use reqwest::blocking::RequestBuilder;
use serde::Deserialize;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::polyline::Polyline;
use crate::traits::{Directions, RouteOption, RouteOptions, RouteStep, RoutingProvider};
use crate::types::{GeoPoint, TravelMode};

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: ProviderConfig,
    client: reqwest::blocking::Client,
}

impl OsrmClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    fn profile(&self, mode: TravelMode) -> &str {
        match mode {
            TravelMode::Driving => &self.config.driving_profile,
            TravelMode::Walking => &self.config.walking_profile,
            TravelMode::Bicycling => &self.config.cycling_profile,
        }
    }

    /// Route URL without credentials.
    fn route_url(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
        options: &RouteOptions,
    ) -> String {
        format!(
            "{}/route/v1/{}/{:.6},{:.6};{:.6},{:.6}?overview=full&steps=true&alternatives={}",
            self.config.base_url.trim_end_matches('/'),
            self.profile(mode),
            origin.lng,
            origin.lat,
            destination.lng,
            destination.lat,
            options.alternatives
        )
    }

    /// GET request for the route, with the API key as an encoded query pair.
    fn route_request(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url);
        match &self.config.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    fn convert_response(&self, response: OsrmRouteResponse) -> Result<Directions, ProviderError> {
        match response.code.as_str() {
            "Ok" => {}
            "NoRoute" => return Err(ProviderError::NoRoute),
            _ => {
                return Err(ProviderError::Service {
                    code: response.code,
                    message: response.message.unwrap_or_default(),
                });
            }
        }

        let mut routes = response.routes.unwrap_or_default().into_iter().map(convert_route);
        let primary = routes.next().ok_or(ProviderError::NoRoute)?;

        Ok(Directions {
            primary,
            alternatives: routes.collect(),
            estimated: false,
        })
    }

    /// OSRM reports failures as JSON with a `code` even on 4xx, so the body
    /// is read before the status.
    fn interpret_response(&self, status: StatusCode, body: &str) -> Result<Directions, ProviderError> {
        match serde_json::from_str::<OsrmRouteResponse>(body) {
            Ok(response) => self.convert_response(response),
            Err(err) if status.is_success() => Err(ProviderError::Parse {
                message: err.to_string(),
            }),
            Err(_) => Err(ProviderError::Service {
                code: status.as_str().to_string(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            }),
        }
    }
}

impl RoutingProvider for OsrmClient {
    fn route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
        mode: TravelMode,
        options: &RouteOptions,
    ) -> Result<Directions, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::Unavailable("routing".to_string()));
        }

        let url = self.route_url(origin, destination, mode, options);
        debug!(%url, "requesting OSRM route");

        let response = self.route_request(&url).send()?;
        let status = response.status();
        let body = response.text()?;

        self.interpret_response(status, &body)
    }
}

fn convert_route(route: OsrmRoute) -> RouteOption {
    let steps = route
        .legs
        .into_iter()
        .flat_map(|leg| leg.steps)
        .map(|step| RouteStep {
            instruction: step_instruction(&step),
            distance_km: step.distance / 1000.0,
            duration_min: step.duration / 60.0,
        })
        .collect();

    RouteOption {
        distance_km: route.distance / 1000.0,
        duration_min: route.duration / 60.0,
        duration_in_traffic_min: None,
        polyline: route.geometry.as_deref().and_then(Polyline::decode),
        steps,
    }
}

/// Human-readable step text: maneuver, road name, then any road classes
/// (toll, ferry, ...) seen at the step's intersections.
fn step_instruction(step: &OsrmStep) -> String {
    let mut parts = vec![step.maneuver.kind.clone()];
    if let Some(modifier) = &step.maneuver.modifier {
        parts.push(modifier.clone());
    }
    if !step.name.is_empty() {
        parts.push(format!("onto {}", step.name));
    }
    let mut classes: Vec<&str> = step
        .intersections
        .iter()
        .flat_map(|intersection| intersection.classes.iter().map(String::as_str))
        .collect();
    classes.sort_unstable();
    classes.dedup();
    if !classes.is_empty() {
        parts.push(format!("({})", classes.join(", ")));
    }
    parts.join(" ")
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    routes: Option<Vec<OsrmRoute>>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    /// Metres.
    distance: f64,
    /// Seconds.
    duration: f64,
    geometry: Option<String>,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    #[serde(default)]
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    name: String,
    maneuver: OsrmManeuver,
    #[serde(default)]
    intersections: Vec<OsrmIntersection>,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    modifier: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OsrmIntersection {
    #[serde(default)]
    classes: Vec<String>,
}

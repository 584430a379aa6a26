//! delivery-planner core
//!
//! Orders delivery stops from a start location under priority, urgency and
//! time-window constraints. Each stop is split into a vehicle leg to a parking
//! spot and a walking leg to the door. Several greedy planners and an optional
//! learned predictor compete; the cheapest full route wins.

pub mod cluster;
pub mod conditions;
pub mod config;
pub mod error;
pub mod features;
pub mod haversine;
pub mod learner;
pub mod legs;
pub mod osrm;
pub mod planner;
pub mod polyline;
pub mod strategy;
pub mod training;
pub mod traits;
pub mod types;
pub mod weather;

pub use config::{OptimizerConfig, ProviderConfig};
pub use error::{ModelError, PlannerError, ProviderError};
pub use learner::{Learner, TrainOptions, train_model};
pub use strategy::optimize_route;
pub use traits::{Collaborators, ParkingLocator, RoutingProvider, WeatherProvider};
pub use types::{OptimizationResult, StartLocation, Stop, Strategy};
pub use weather::{ObservationSource, ObservedWeather, WeatherObservation};

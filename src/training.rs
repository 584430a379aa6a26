//! Synthetic training corpus for the learner.
//!
//! Each example is a random scenario, its feature vector, and the order a
//! simplified greedy heuristic picks for it. The learner imitates that
//! heuristic.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ModelError;
use crate::features::{Conditions, MAX_STOPS, TrafficLevel, WeatherCondition, extract_features};
use crate::haversine::haversine_km;
use crate::types::{GeoPoint, Stop, TimeWindow};

/// Shape of the generated corpus.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorConfig {
    pub examples: usize,
    pub min_stops: usize,
    pub max_stops: usize,
    /// North-east corner of the sampling box; points fall south-west of it.
    pub origin: GeoPoint,
    pub span_degrees: f64,
    pub seed: u64,
    /// Reference time for windows. `None` uses the current clock.
    pub now_ms: Option<i64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            examples: 200,
            min_stops: 3,
            max_stops: MAX_STOPS,
            origin: GeoPoint::new(32.4, -92.6),
            span_degrees: 0.3,
            seed: 42,
            now_ms: None,
        }
    }
}

impl GeneratorConfig {
    pub fn with_examples(mut self, examples: usize) -> Self {
        self.examples = examples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_span(mut self, span_degrees: f64) -> Self {
        self.span_degrees = span_degrees;
        self
    }

    pub fn with_now(mut self, now_ms: i64) -> Self {
        self.now_ms = Some(now_ms);
        self
    }
}

/// One random routing problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub stops: Vec<Stop>,
    pub start: GeoPoint,
    pub conditions: Conditions,
    pub now_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingExample {
    pub features: Vec<f64>,
    /// 1-based rank per stop slot; `MAX_STOPS + 1` marks an empty slot.
    pub target: Vec<f64>,
    pub order: Vec<usize>,
    pub scenario: Scenario,
}

impl TrainingExample {
    pub fn from_scenario(scenario: Scenario) -> Self {
        let order = reference_order(&scenario.stops, scenario.start, &scenario.conditions);
        let features = extract_features(
            &scenario.stops,
            scenario.start,
            &scenario.conditions,
            scenario.now_ms,
        );
        Self {
            features,
            target: order_to_vector(&order),
            order,
            scenario,
        }
    }
}

/// Greedy ground-truth order: distance minus a priority and urgency bonus,
/// with distance weighted up under high traffic.
pub fn reference_order(stops: &[Stop], start: GeoPoint, conditions: &Conditions) -> Vec<usize> {
    let mut visited = vec![false; stops.len()];
    let mut order = Vec::with_capacity(stops.len());
    let mut current = start;

    while order.len() < stops.len() {
        let mut best: Option<(usize, f64)> = None;
        for (index, stop) in stops.iter().enumerate() {
            if visited[index] {
                continue;
            }
            let distance = haversine_km(current, stop.location());
            let mut score = distance - f64::from(stop.priority_level()) * 0.5;
            if stop.urgent {
                score -= 2.0;
            }
            if conditions.traffic_level == TrafficLevel::High {
                score += distance * 0.3;
            }
            if best.is_none_or(|(_, best_score)| score < best_score) {
                best = Some((index, score));
            }
        }

        let Some((index, _)) = best else { break };
        visited[index] = true;
        order.push(index);
        current = stops[index].location();
    }

    order
}

/// Rank vector for an order: slot `i` holds the 1-based position of stop `i`.
pub fn order_to_vector(order: &[usize]) -> Vec<f64> {
    let mut vector = vec![(MAX_STOPS + 1) as f64; MAX_STOPS];
    for (position, &index) in order.iter().enumerate() {
        if index < MAX_STOPS {
            vector[index] = (position + 1) as f64;
        }
    }
    vector
}

fn random_point(config: &GeneratorConfig, rng: &mut impl Rng) -> GeoPoint {
    GeoPoint::new(
        config.origin.lat + rng.gen_range(0.0..1.0) * config.span_degrees,
        config.origin.lng - rng.gen_range(0.0..1.0) * config.span_degrees,
    )
}

fn random_stop(id: usize, config: &GeneratorConfig, now_ms: i64, rng: &mut impl Rng) -> Stop {
    let point = random_point(config, rng);
    let mut stop = Stop::new(format!("stop-{id}"), point.lat, point.lng)
        .with_priority(rng.gen_range(1..=3));
    stop.urgent = rng.gen_bool(0.2);

    if rng.gen_bool(0.5) {
        let start = now_ms + (rng.gen_range(0.0..1.0) * 3_600_000.0) as i64;
        let end = now_ms + (rng.gen_range(0.0..1.0) * 7_200_000.0) as i64;
        stop.time_window = Some(TimeWindow::new(start.min(end), start.max(end)));
    }
    stop
}

/// A random scenario drawn from `config`.
pub fn random_scenario(config: &GeneratorConfig, now_ms: i64, rng: &mut impl Rng) -> Scenario {
    let max_stops = config.max_stops.clamp(1, MAX_STOPS);
    let min_stops = config.min_stops.clamp(1, max_stops);
    let count = rng.gen_range(min_stops..=max_stops);

    let stops = (1..=count).map(|id| random_stop(id, config, now_ms, rng)).collect();
    let start = random_point(config, rng);
    let conditions = Conditions {
        traffic_level: TrafficLevel::ALL[rng.gen_range(0..TrafficLevel::ALL.len())],
        weather: WeatherCondition::ALL[rng.gen_range(0..WeatherCondition::ALL.len())],
        hour: rng.gen_range(0..24),
    };

    Scenario {
        stops,
        start,
        conditions,
        now_ms,
    }
}

/// Generate a labelled corpus. Deterministic for a fixed seed and `now_ms`.
pub fn generate_training_data(config: &GeneratorConfig) -> Vec<TrainingExample> {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let now_ms = config
        .now_ms
        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

    let data: Vec<TrainingExample> = (0..config.examples)
        .map(|_| TrainingExample::from_scenario(random_scenario(config, now_ms, &mut rng)))
        .collect();
    info!(examples = data.len(), seed = config.seed, "generated training data");
    data
}

pub fn save_training_data(path: impl AsRef<Path>, data: &[TrainingExample]) -> Result<(), ModelError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, data)?;
    info!(path = %path.display(), examples = data.len(), "saved training data");
    Ok(())
}

pub fn load_training_data(path: impl AsRef<Path>) -> Result<Vec<TrainingExample>, ModelError> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}

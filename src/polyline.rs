//! Polyline representation for route geometries.
//!
//! Geometries are kept as decoded coordinate sequences. The compact encoded
//! polyline format (precision 5, as returned by routing services) is only
//! handled at the provider boundary through [`Polyline::decode`] and
//! [`Polyline::encode`].

use geo_types::Coord;
use serde::{Deserialize, Serialize};

use crate::haversine::haversine_km;
use crate::types::GeoPoint;

/// Decimal digits kept by the encoded format.
const PRECISION: u32 = 5;

/// A route geometry as decoded (latitude, longitude) points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<(f64, f64)>,
}

impl Polyline {
    pub fn new(points: Vec<(f64, f64)>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn into_points(self) -> Vec<(f64, f64)> {
        self.points
    }

    /// Sum of great-circle distances between consecutive points, km.
    pub fn length_km(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| {
                haversine_km(
                    GeoPoint::new(pair[0].0, pair[0].1),
                    GeoPoint::new(pair[1].0, pair[1].1),
                )
            })
            .sum()
    }

    /// Decode an encoded polyline string. Returns `None` on malformed input.
    pub fn decode(encoded: &str) -> Option<Self> {
        let line = ::polyline::decode_polyline(encoded, PRECISION).ok()?;
        Some(Self {
            points: line.coords().map(|coord| (coord.y, coord.x)).collect(),
        })
    }

    /// Encode into the compact polyline format. Returns `None` when a point
    /// lies outside the valid coordinate ranges.
    pub fn encode(&self) -> Option<String> {
        let coords = self
            .points
            .iter()
            .map(|&(lat, lng)| Coord { x: lng, y: lat });
        ::polyline::encode_coordinates(coords, PRECISION).ok()
    }
}

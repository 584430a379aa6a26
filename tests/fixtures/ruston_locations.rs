//! Ruston, Louisiana area locations for realistic test fixtures.
//!
//! Coordinates are approximate landmark positions in Lincoln Parish, inside
//! the same box the synthetic training data is drawn from.

use delivery_planner::types::{StartLocation, Stop};

/// A named location with coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub name: &'static str,
    pub lat: f64,
    pub lng: f64,
}

impl Location {
    pub const fn new(name: &'static str, lat: f64, lng: f64) -> Self {
        Self { name, lat, lng }
    }

    pub fn stop(&self) -> Stop {
        Stop::new(self.name, self.lat, self.lng)
    }

    pub fn start(&self) -> StartLocation {
        StartLocation::new(self.lat, self.lng, self.name)
    }
}

// ============================================================================
// Depots
// ============================================================================

pub const DEPOTS: &[Location] = &[
    Location::new("Ruston Distribution Center", 32.5232, -92.6379),
    Location::new("Grambling Warehouse", 32.5277, -92.7140),
];

// ============================================================================
// Downtown Ruston (dense; good for clustering)
// ============================================================================

pub const DOWNTOWN: &[Location] = &[
    Location::new("Railroad Park", 32.5236, -92.6377),
    Location::new("Ruston Post Office", 32.5245, -92.6368),
    Location::new("Lincoln Parish Library", 32.5259, -92.6393),
    Location::new("Ruston City Hall", 32.5229, -92.6402),
];

// ============================================================================
// Spread across the parish
// ============================================================================

pub const PARISH: &[Location] = &[
    Location::new("Louisiana Tech University", 32.5263, -92.6479),
    Location::new("Grambling State University", 32.5231, -92.7146),
    Location::new("Lincoln Parish Park", 32.5733, -92.6561),
    Location::new("Choudrant", 32.5327, -92.5140),
    Location::new("Simsboro", 32.5343, -92.7854),
    Location::new("Dubach", 32.6982, -92.6568),
    Location::new("Vienna", 32.6043, -92.6465),
];

pub fn depot() -> StartLocation {
    DEPOTS[0].start()
}

pub fn parish_stops() -> Vec<Stop> {
    PARISH.iter().map(Location::stop).collect()
}

pub fn downtown_stops() -> Vec<Stop> {
    DOWNTOWN.iter().map(Location::stop).collect()
}

//! Test fixtures for delivery-planner.
//!
//! Provides realistic test data including:
//! - Ruston, Louisiana locations
//! - Mock routing, parking and weather collaborators

#![allow(dead_code)]

pub mod mocks;
pub mod ruston_locations;

pub use ruston_locations::*;

//! Bin Locator - location resolution and nearby recycling bin matching
//!
//! Resolves the requester's position through an ordered fallback chain
//! (device sensor, then network locators, then a configured default) and
//! ranks recycling bins around that position by great-circle distance.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{
    distance::{distance, haversine_distance},
    FacilityMatcher, LocationProvider, LocationResolver, MatchingSession, ProviderError,
    ResolverConfig,
};
pub use models::{Coordinate, Facility, FacilityStatus, MatchRequest, MatchResult, RankedFacility, ResolutionSource};

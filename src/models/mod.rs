// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Coordinate, CoordinateError, Facility, FacilityStatus, MatchRequest, MatchResult,
    RankedFacility, ResolutionSource,
};
pub use requests::{DeviceReport, NearbyBinsRequest};
pub use responses::{ErrorResponse, HealthResponse, NearbyBinsResponse};

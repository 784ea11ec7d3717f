// Core algorithm exports
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod provider;
pub mod resolver;
pub mod session;

pub use distance::{distance, haversine_distance, EARTH_RADIUS_KM};
pub use filters::{accepts_any_category, within_radius};
pub use matcher::{FacilityMatcher, MatchOutcome};
pub use provider::{LocationProvider, ProviderError};
pub use resolver::{LocationResolver, Resolution, ResolverConfig, ResolverState};
pub use session::MatchingSession;

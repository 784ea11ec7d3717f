use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// Errors raised when constructing a coordinate from raw values
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("coordinate component is not a finite number")]
    NotFinite,

    #[error("latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

/// A point on the Earth's surface in decimal degrees (WGS84)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Build a coordinate, rejecting non-finite or out-of-range components
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self { latitude, longitude })
    }

    /// Fields are public and deserializable, so values coming from outside
    /// must be checked before use.
    pub fn is_valid(&self) -> bool {
        Self::new(self.latitude, self.longitude).is_ok()
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// Operational state of a bin as reported by the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacilityStatus {
    Active,
    Maintenance,
    Offline,
    Full,
}

/// A recycling bin or drop-off point supplied by the facility catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facility {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinate: Option<Coordinate>,
    pub status: FacilityStatus,
    #[serde(rename = "acceptedCategories", default)]
    pub accepted_categories: BTreeSet<String>,
    #[serde(rename = "operatingWindow", default)]
    pub operating_window: String,
}

impl Facility {
    /// The facility's coordinate if present and within range
    pub fn valid_coordinate(&self) -> Option<Coordinate> {
        self.coordinate.filter(Coordinate::is_valid)
    }
}

/// Facility annotated with its distance from the resolved coordinate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedFacility {
    #[serde(flatten)]
    pub facility: Facility,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
}

/// Per-invocation matching parameters
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRequest {
    /// Empty means no category filter
    pub category_filter: BTreeSet<String>,
    pub radius_km: f64,
    pub prefer_nearby_only: bool,
    pub limit: Option<usize>,
}

impl MatchRequest {
    pub fn new(radius_km: f64) -> Self {
        Self {
            category_filter: BTreeSet::new(),
            radius_km,
            prefer_nearby_only: false,
            limit: None,
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.category_filter = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn nearby_only(mut self, prefer_nearby_only: bool) -> Self {
        self.prefer_nearby_only = prefer_nearby_only;
        self
    }

    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }
}

/// Which strategy produced the coordinate used for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "index", rename_all = "lowercase")]
pub enum ResolutionSource {
    Device,
    /// Index into the configured network locator list
    Network(usize),
    Default,
}

impl ResolutionSource {
    /// Only a device fix is precise enough to default to nearby-only results
    pub fn prefers_nearby(&self) -> bool {
        matches!(self, ResolutionSource::Device)
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionSource::Device => write!(f, "device"),
            ResolutionSource::Network(i) => write!(f, "network[{}]", i),
            ResolutionSource::Default => write!(f, "default"),
        }
    }
}

/// Outcome of one end-to-end matching invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    #[serde(rename = "resolvedCoordinate")]
    pub resolved_coordinate: Coordinate,
    #[serde(rename = "resolutionSource")]
    pub resolution_source: ResolutionSource,
    pub facilities: Vec<RankedFacility>,
    pub widened: bool,
}

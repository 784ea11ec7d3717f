use serde::{Deserialize, Serialize};
use crate::models::domain::MatchResult;

/// Response for the nearby bins endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyBinsResponse {
    #[serde(flatten)]
    pub result: MatchResult,
    #[serde(rename = "totalFacilities")]
    pub total_facilities: usize,
    /// Informational banners for the UI, never blocking errors
    pub notices: Vec<String>,
    #[serde(rename = "requestId")]
    pub request_id: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

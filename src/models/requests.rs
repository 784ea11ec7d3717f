use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Request to find bins near the caller
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NearbyBinsRequest {
    #[serde(default)]
    pub categories: Vec<String>,
    #[validate(range(exclusive_min = 0.0, max = 20000.0))]
    #[serde(alias = "radius_km", rename = "radiusKm", default)]
    pub radius_km: Option<f64>,
    /// When absent the default follows the resolution source
    #[serde(alias = "prefer_nearby_only", rename = "preferNearbyOnly", default)]
    pub prefer_nearby_only: Option<bool>,
    #[validate(range(min = 1, max = 500))]
    #[serde(default)]
    pub limit: Option<u16>,
    #[validate(range(min = 100, max = 60000))]
    #[serde(alias = "deadline_ms", rename = "deadlineMs", default)]
    pub deadline_ms: Option<u64>,
    #[serde(default)]
    pub device: Option<DeviceReport>,
}

/// Outcome of a client-side position read forwarded with the request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeviceReport {
    Fix {
        latitude: f64,
        longitude: f64,
        #[serde(rename = "capturedAt", default)]
        captured_at: Option<DateTime<Utc>>,
    },
    Denied,
    Unavailable,
    Timeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_request() {
        let req: NearbyBinsRequest = serde_json::from_str(r#"{"categories": ["battery"]}"#).unwrap();
        assert_eq!(req.categories, vec!["battery"]);
        assert!(req.radius_km.is_none());
        assert!(req.device.is_none());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_zero_radius_rejected() {
        let req: NearbyBinsRequest = serde_json::from_str(r#"{"radiusKm": 0}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_device_report_variants() {
        let fix: DeviceReport =
            serde_json::from_str(r#"{"status": "fix", "latitude": 28.6, "longitude": 77.2}"#).unwrap();
        assert!(matches!(fix, DeviceReport::Fix { captured_at: None, .. }));

        let denied: DeviceReport = serde_json::from_str(r#"{"status": "denied"}"#).unwrap();
        assert_eq!(denied, DeviceReport::Denied);
    }
}

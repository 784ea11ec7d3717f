use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::core::{LocationProvider, ProviderError};
use crate::models::Coordinate;

/// Where a provider puts the coordinate in its JSON response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CoordinateSchema {
    /// Separate latitude and longitude fields, given as dot paths
    /// (e.g. `location.lat`). Values may be numbers or numeric strings.
    Fields { latitude: String, longitude: String },
    /// A single `"lat,lon"` string field
    Combined {
        field: String,
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    ",".to_string()
}

impl CoordinateSchema {
    pub fn fields(latitude: &str, longitude: &str) -> Self {
        CoordinateSchema::Fields {
            latitude: latitude.to_string(),
            longitude: longitude.to_string(),
        }
    }

    /// Pull a validated coordinate out of a response body
    pub fn extract(&self, body: &Value) -> Result<Coordinate, ProviderError> {
        let (latitude, longitude) = match self {
            CoordinateSchema::Fields { latitude, longitude } => {
                (numeric_at(body, latitude)?, numeric_at(body, longitude)?)
            }
            CoordinateSchema::Combined { field, separator } => {
                let raw = lookup(body, field)
                    .and_then(Value::as_str)
                    .ok_or_else(|| missing(field))?;
                let mut parts = raw.split(separator.as_str()).map(str::trim);
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(lat), Some(lon), None) => (parse_number(field, lat)?, parse_number(field, lon)?),
                    _ => {
                        return Err(ProviderError::MalformedResponse(format!(
                            "field `{}` is not a coordinate pair: {:?}",
                            field, raw
                        )))
                    }
                }
            }
        };

        Coordinate::new(latitude, longitude)
            .map_err(|e| ProviderError::MalformedResponse(e.to_string()))
    }
}

fn lookup<'a>(body: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(body, |value, key| value.get(key))
}

fn missing(path: &str) -> ProviderError {
    ProviderError::MalformedResponse(format!("missing field `{}`", path))
}

fn parse_number(path: &str, raw: &str) -> Result<f64, ProviderError> {
    raw.parse::<f64>().map_err(|_| {
        ProviderError::MalformedResponse(format!("field `{}` is not numeric: {:?}", path, raw))
    })
}

fn numeric_at(body: &Value, path: &str) -> Result<f64, ProviderError> {
    match lookup(body, path) {
        Some(Value::Number(n)) => n.as_f64().ok_or_else(|| missing(path)),
        Some(Value::String(s)) => parse_number(path, s.trim()),
        Some(other) => Err(ProviderError::MalformedResponse(format!(
            "field `{}` is not numeric: {}",
            path, other
        ))),
        None => Err(missing(path)),
    }
}

/// Addresses a third-party geolocation service can say something about
fn is_public(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_public_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_public_v4(&v4),
            None => {
                let first = v6.segments()[0];
                let unique_local = first & 0xfe00 == 0xfc00;
                let link_local = first & 0xffc0 == 0xfe80;
                !(v6.is_loopback() || v6.is_unspecified() || unique_local || link_local)
            }
        },
    }
}

/// `::ffff:a.b.c.d` becomes `a.b.c.d`
fn unmap_ipv4(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => v6.to_ipv4_mapped().map_or(ip, IpAddr::V4),
        v4 => v4,
    }
}

fn is_public_v4(v4: &Ipv4Addr) -> bool {
    !(v4.is_private()
        || v4.is_loopback()
        || v4.is_link_local()
        || v4.is_unspecified()
        || v4.is_broadcast()
        || v4.is_documentation())
}

/// Network-based position estimate from a third-party HTTP endpoint
///
/// Each instance has its own endpoint and response schema. One GET per
/// attempt, bounded by the attempt timeout.
#[derive(Debug, Clone)]
pub struct NetworkLocator {
    name: String,
    endpoint: String,
    /// Template with an `{ip}` placeholder for locating a specific client
    client_endpoint: Option<String>,
    schema: CoordinateSchema,
    client: Client,
    target_ip: Option<IpAddr>,
}

impl NetworkLocator {
    /// Create a locator for `endpoint`
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        schema: CoordinateSchema,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("bin-locator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            name: name.into(),
            endpoint: endpoint.into(),
            client_endpoint: None,
            schema,
            client,
            target_ip: None,
        })
    }

    pub fn with_client_endpoint(mut self, template: impl Into<String>) -> Self {
        self.client_endpoint = Some(template.into());
        self
    }

    /// ipapi.co (`latitude` / `longitude`)
    pub fn ipapi_co() -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            "ipapi.co",
            "https://ipapi.co/json/",
            CoordinateSchema::fields("latitude", "longitude"),
        )?
        .with_client_endpoint("https://ipapi.co/{ip}/json/"))
    }

    /// ip-api.com (`lat` / `lon`)
    pub fn ip_api_com() -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            "ip-api.com",
            "http://ip-api.com/json/",
            CoordinateSchema::fields("lat", "lon"),
        )?
        .with_client_endpoint("http://ip-api.com/json/{ip}"))
    }

    /// ipinfo.io (`loc` as `"lat,lon"`)
    pub fn ipinfo_io() -> Result<Self, reqwest::Error> {
        Ok(Self::new(
            "ipinfo.io",
            "https://ipinfo.io/json",
            CoordinateSchema::Combined {
                field: "loc".to_string(),
                separator: default_separator(),
            },
        )?
        .with_client_endpoint("https://ipinfo.io/{ip}/json"))
    }

    /// Copy of this locator aimed at a specific requester
    ///
    /// Private and loopback addresses are ignored, since the provider can
    /// only geolocate public addresses.
    pub fn for_client(&self, ip: Option<IpAddr>) -> Self {
        let mut locator = self.clone();
        locator.target_ip = ip.map(unmap_ipv4).filter(is_public);
        locator
    }

    /// URL requested on the next attempt
    pub fn request_url(&self) -> String {
        match (&self.client_endpoint, self.target_ip) {
            (Some(template), Some(ip)) => template.replace("{ip}", &ip.to_string()),
            _ => self.endpoint.clone(),
        }
    }
}

#[async_trait]
impl LocationProvider for NetworkLocator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, timeout: Duration) -> Result<Coordinate, ProviderError> {
        let url = self.request_url();
        tracing::debug!("Querying {} at {}", self.name, url);

        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout
                } else {
                    ProviderError::Unreachable(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Unreachable(format!("HTTP {}", status)));
        }

        let body: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout
            } else {
                ProviderError::MalformedResponse(format!("body is not JSON: {}", e))
            }
        })?;

        self.schema.extract(&body)
    }
}

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::core::ResolverConfig;
use crate::models::{Coordinate, CoordinateError};
use crate::services::{CoordinateSchema, NetworkLocator};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub device: DeviceSettings,
    /// Network locators in fallback order
    #[serde(default = "default_locators")]
    pub locators: Vec<LocatorSettings>,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverSettings {
    #[serde(default = "default_device_timeout_ms")]
    pub device_timeout_ms: u64,
    #[serde(default = "default_network_timeout_ms")]
    pub network_timeout_ms: u64,
    /// End-to-end budget for the whole fallback chain
    #[serde(default = "default_deadline_ms")]
    pub deadline_ms: u64,
    #[serde(default = "default_latitude")]
    pub default_latitude: f64,
    #[serde(default = "default_longitude")]
    pub default_longitude: f64,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            device_timeout_ms: default_device_timeout_ms(),
            network_timeout_ms: default_network_timeout_ms(),
            deadline_ms: default_deadline_ms(),
            default_latitude: default_latitude(),
            default_longitude: default_longitude(),
        }
    }
}

fn default_device_timeout_ms() -> u64 { 5000 }
fn default_network_timeout_ms() -> u64 { 4000 }
fn default_deadline_ms() -> u64 { 12000 }
fn default_latitude() -> f64 { 28.6139 }
fn default_longitude() -> f64 { 77.2090 }

impl ResolverSettings {
    pub fn to_resolver_config(&self) -> Result<ResolverConfig, CoordinateError> {
        Ok(ResolverConfig {
            device_timeout: Duration::from_millis(self.device_timeout_ms),
            network_timeout: Duration::from_millis(self.network_timeout_ms),
            default_coordinate: Coordinate::new(self.default_latitude, self.default_longitude)?,
        })
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceSettings {
    /// gpsd socket address, e.g. `127.0.0.1:2947`. Unset means the host
    /// has no sensor of its own.
    pub gpsd_addr: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocatorSettings {
    pub name: String,
    pub endpoint: String,
    pub client_endpoint: Option<String>,
    pub schema: CoordinateSchema,
}

impl LocatorSettings {
    pub fn build(&self) -> Result<NetworkLocator, reqwest::Error> {
        let locator = NetworkLocator::new(&self.name, &self.endpoint, self.schema.clone())?;
        Ok(match &self.client_endpoint {
            Some(template) => locator.with_client_endpoint(template),
            None => locator,
        })
    }
}

fn default_locators() -> Vec<LocatorSettings> {
    vec![
        LocatorSettings {
            name: "ipapi.co".to_string(),
            endpoint: "https://ipapi.co/json/".to_string(),
            client_endpoint: Some("https://ipapi.co/{ip}/json/".to_string()),
            schema: CoordinateSchema::fields("latitude", "longitude"),
        },
        LocatorSettings {
            name: "ip-api.com".to_string(),
            endpoint: "http://ip-api.com/json/".to_string(),
            client_endpoint: Some("http://ip-api.com/json/{ip}".to_string()),
            schema: CoordinateSchema::fields("lat", "lon"),
        },
    ]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogSettings {
    /// Local JSON or TOML file
    pub path: Option<String>,
    /// Remote JSON endpoint, takes precedence over `path`
    pub url: Option<String>,
    pub api_key: Option<String>,
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            path: Some("data/bins.json".to_string()),
            url: None,
            api_key: None,
            timeout_secs: default_catalog_timeout_secs(),
        }
    }
}

fn default_catalog_timeout_secs() -> u64 { 10 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_radius_km")]
    pub default_radius_km: f64,
    pub max_results: Option<usize>,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_radius_km: default_radius_km(),
            max_results: Some(100),
        }
    }
}

fn default_radius_km() -> f64 { 10.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with BINLOC__)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., BINLOC__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("BINLOC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("BINLOC")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Instantiate the configured network locators in fallback order
    pub fn build_locators(&self) -> Result<Vec<NetworkLocator>, reqwest::Error> {
        self.locators.iter().map(LocatorSettings::build).collect()
    }
}

/// Apply the unprefixed deployment variables (`CATALOG_URL`,
/// `CATALOG_API_KEY`, `GPSD_ADDR`) on top of the layered config
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("CATALOG_URL") {
        builder = builder.set_override("catalog.url", url)?;
    }
    if let Ok(api_key) = env::var("CATALOG_API_KEY") {
        builder = builder.set_override("catalog.api_key", api_key)?;
    }
    if let Ok(addr) = env::var("GPSD_ADDR") {
        builder = builder.set_override("device.gpsd_addr", addr)?;
    }

    builder.build()
}

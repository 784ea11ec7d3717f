use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use crate::core::{LocationProvider, ProviderError};
use crate::models::{Coordinate, DeviceReport};

/// Options passed to a position source for one fix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Oldest acceptable age of a previously obtained fix
    pub maximum_age: Duration,
    pub timeout: Duration,
}

/// Host-level source of device position fixes
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Result<Coordinate, ProviderError>;
}

/// High-accuracy device sensor provider
///
/// Always asks its source for the most accurate fix with `maximum_age` of
/// zero, so a fix obtained before this attempt is never reused.
#[derive(Clone)]
pub struct DeviceSensor {
    source: Option<Arc<dyn PositionSource>>,
}

impl DeviceSensor {
    pub fn new(source: Arc<dyn PositionSource>) -> Self {
        Self { source: Some(source) }
    }

    /// Sensor for hosts without any position capability
    pub fn absent() -> Self {
        Self { source: None }
    }

    /// Sensor backed by a client-side read forwarded with the request
    pub fn from_report(report: DeviceReport) -> Self {
        Self::new(Arc::new(ReportedPosition::new(report, Utc::now())))
    }
}

#[async_trait]
impl LocationProvider for DeviceSensor {
    fn name(&self) -> &str {
        "device"
    }

    async fn resolve(&self, timeout: Duration) -> Result<Coordinate, ProviderError> {
        let source = self.source.as_ref().ok_or(ProviderError::Unavailable)?;

        let options = PositionOptions {
            high_accuracy: true,
            maximum_age: Duration::ZERO,
            timeout,
        };

        tokio::time::timeout(timeout, source.current_position(&options))
            .await
            .unwrap_or(Err(ProviderError::Timeout))
    }
}

/// Position read performed by the client and forwarded to the service
#[derive(Debug, Clone)]
pub struct ReportedPosition {
    report: DeviceReport,
    received_at: DateTime<Utc>,
}

impl ReportedPosition {
    pub fn new(report: DeviceReport, received_at: DateTime<Utc>) -> Self {
        Self { report, received_at }
    }
}

#[async_trait]
impl PositionSource for ReportedPosition {
    async fn current_position(&self, options: &PositionOptions) -> Result<Coordinate, ProviderError> {
        match &self.report {
            DeviceReport::Fix { latitude, longitude, captured_at } => {
                let coordinate = Coordinate::new(*latitude, *longitude)
                    .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

                // A fix from the future (clock skew) is accepted as fresh
                if let Some(captured_at) = captured_at {
                    if let Ok(age) = (self.received_at - *captured_at).to_std() {
                        if age > options.maximum_age + options.timeout {
                            tracing::debug!("Rejecting stale device fix ({:?} old)", age);
                            return Err(ProviderError::Timeout);
                        }
                    }
                }

                Ok(coordinate)
            }
            DeviceReport::Denied => Err(ProviderError::Denied),
            DeviceReport::Unavailable => Err(ProviderError::Unavailable),
            DeviceReport::Timeout => Err(ProviderError::Timeout),
        }
    }
}

const GPSD_WATCH: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// Subset of a gpsd JSON report
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
}

/// Position source reading the host GPS daemon (gpsd) over its JSON socket
#[derive(Debug, Clone)]
pub struct GpsdSource {
    addr: String,
}

impl GpsdSource {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl PositionSource for GpsdSource {
    async fn current_position(&self, options: &PositionOptions) -> Result<Coordinate, ProviderError> {
        let stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            tracing::debug!("gpsd at {} not reachable: {}", self.addr, e);
            match e.kind() {
                std::io::ErrorKind::PermissionDenied => ProviderError::Denied,
                _ => ProviderError::Unavailable,
            }
        })?;

        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(GPSD_WATCH)
            .await
            .map_err(|_| ProviderError::Unavailable)?;

        // mode 2 is a 2D fix, mode 3 a 3D fix
        let min_mode = if options.high_accuracy { 3 } else { 2 };

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|_| ProviderError::Unavailable)?
        {
            let Ok(report) = serde_json::from_str::<GpsdReport>(&line) else {
                continue;
            };
            if report.class != "TPV" || report.mode < min_mode {
                continue;
            }
            if let (Some(lat), Some(lon)) = (report.lat, report.lon) {
                return Coordinate::new(lat, lon)
                    .map_err(|e| ProviderError::MalformedResponse(e.to_string()));
            }
        }

        // Daemon closed the stream without producing a fix
        Err(ProviderError::Unavailable)
    }
}

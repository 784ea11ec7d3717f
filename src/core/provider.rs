use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::models::Coordinate;

/// Reasons a single location provider failed to produce a coordinate
///
/// These never leave the resolver: each one only moves the fallback chain
/// on to the next provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("location capability unavailable on this host")]
    Unavailable,

    #[error("location permission denied")]
    Denied,

    #[error("provider unreachable: {0}")]
    Unreachable(String),

    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("no position within the deadline")]
    Timeout,
}

/// A strategy that can determine the requester's position
///
/// # Thread Safety
/// Implementations must be `Send + Sync`; the resolver holds them behind
/// `Arc` and may run on any tokio worker.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Attempt one position fix, returning within `timeout`
    ///
    /// Implementations must surface failures instead of substituting a
    /// default coordinate.
    async fn resolve(&self, timeout: Duration) -> Result<Coordinate, ProviderError>;
}

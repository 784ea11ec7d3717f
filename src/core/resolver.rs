use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::core::provider::{LocationProvider, ProviderError};
use crate::models::{Coordinate, ResolutionSource};

/// Coordinate chosen by the resolver and where it came from
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub coordinate: Coordinate,
    pub source: ResolutionSource,
}

/// Fallback chain states
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolverState {
    NotStarted,
    TryingDevice,
    TryingNetwork(usize),
    Resolved(Resolution),
    Exhausted,
}

/// Timeouts and fallback coordinate for the chain
#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    pub device_timeout: Duration,
    pub network_timeout: Duration,
    pub default_coordinate: Coordinate,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            device_timeout: Duration::from_secs(5),
            network_timeout: Duration::from_secs(4),
            // New Delhi
            default_coordinate: Coordinate { latitude: 28.6139, longitude: 77.2090 },
        }
    }
}

enum Attempt {
    Success(Coordinate),
    /// The provider's error has already been logged
    Failed,
    DeadlineReached,
}

/// Ordered fallback over location providers
///
/// The device sensor is tried first, then each network locator in declared
/// order. Attempts run strictly one after another and every attempt gets its
/// own timeout, capped by what is left of the end-to-end deadline. The chain
/// always ends with a coordinate: when every provider fails, or the deadline
/// passes, the configured default is returned with `ResolutionSource::Default`.
#[derive(Clone)]
pub struct LocationResolver {
    device: Arc<dyn LocationProvider>,
    network: Vec<Arc<dyn LocationProvider>>,
    config: ResolverConfig,
}

impl LocationResolver {
    pub fn new(
        device: Arc<dyn LocationProvider>,
        network: Vec<Arc<dyn LocationProvider>>,
        config: ResolverConfig,
    ) -> Self {
        Self { device, network, config }
    }

    /// Run the chain to completion within `deadline`
    pub async fn resolve(&self, deadline: Duration) -> Resolution {
        let deadline_at = Instant::now() + deadline;
        let mut state = ResolverState::NotStarted;

        loop {
            tracing::trace!("Resolver state: {:?}", state);

            state = match state {
                ResolverState::NotStarted => ResolverState::TryingDevice,

                ResolverState::TryingDevice => {
                    match self
                        .attempt(self.device.as_ref(), self.config.device_timeout, deadline_at)
                        .await
                    {
                        Attempt::Success(coordinate) => ResolverState::Resolved(Resolution {
                            coordinate,
                            source: ResolutionSource::Device,
                        }),
                        Attempt::Failed => self.next_network(0),
                        Attempt::DeadlineReached => ResolverState::Exhausted,
                    }
                }

                ResolverState::TryingNetwork(i) => {
                    let locator = self.network[i].as_ref();
                    match self
                        .attempt(locator, self.config.network_timeout, deadline_at)
                        .await
                    {
                        Attempt::Success(coordinate) => ResolverState::Resolved(Resolution {
                            coordinate,
                            source: ResolutionSource::Network(i),
                        }),
                        Attempt::Failed => self.next_network(i + 1),
                        Attempt::DeadlineReached => ResolverState::Exhausted,
                    }
                }

                ResolverState::Resolved(resolution) => {
                    tracing::info!(
                        "Resolved location {} via {}",
                        resolution.coordinate,
                        resolution.source
                    );
                    return resolution;
                }

                ResolverState::Exhausted => {
                    tracing::warn!(
                        "All location providers failed, using default {}",
                        self.config.default_coordinate
                    );
                    return Resolution {
                        coordinate: self.config.default_coordinate,
                        source: ResolutionSource::Default,
                    };
                }
            };
        }
    }

    fn next_network(&self, index: usize) -> ResolverState {
        if index < self.network.len() {
            ResolverState::TryingNetwork(index)
        } else {
            ResolverState::Exhausted
        }
    }

    async fn attempt(
        &self,
        provider: &dyn LocationProvider,
        attempt_timeout: Duration,
        deadline_at: Instant,
    ) -> Attempt {
        let now = Instant::now();
        if now >= deadline_at {
            tracing::warn!("Resolution deadline passed before trying {}", provider.name());
            return Attempt::DeadlineReached;
        }

        let remaining = deadline_at - now;
        let bounded_by_deadline = remaining < attempt_timeout;
        let budget = attempt_timeout.min(remaining);

        // The outer timeout drops the provider future, cancelling it in flight
        match tokio::time::timeout(budget, provider.resolve(budget)).await {
            Ok(Ok(coordinate)) if coordinate.is_valid() => {
                tracing::debug!(
                    "{} resolved {} in {:?}",
                    provider.name(),
                    coordinate,
                    now.elapsed()
                );
                Attempt::Success(coordinate)
            }
            Ok(Ok(coordinate)) => {
                let err = ProviderError::MalformedResponse(format!(
                    "coordinate out of range: {}",
                    coordinate
                ));
                tracing::warn!("{} failed: {}", provider.name(), err);
                Attempt::Failed
            }
            Ok(Err(err)) => {
                tracing::warn!("{} failed: {}", provider.name(), err);
                Attempt::Failed
            }
            Err(_) if bounded_by_deadline => {
                tracing::warn!("{} cancelled by the resolution deadline", provider.name());
                Attempt::DeadlineReached
            }
            Err(_) => {
                tracing::warn!("{} timed out after {:?}", provider.name(), budget);
                Attempt::Failed
            }
        }
    }
}

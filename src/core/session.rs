use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use crate::core::{matcher::FacilityMatcher, resolver::LocationResolver};
use crate::models::{Facility, MatchRequest, MatchResult};

/// End-to-end operation: resolve the requester's position, then rank facilities
///
/// Holds no state between invocations. Given the same facility snapshot and
/// the same resolved coordinate, the result is identical.
#[derive(Clone)]
pub struct MatchingSession {
    resolver: LocationResolver,
    matcher: FacilityMatcher,
}

impl MatchingSession {
    pub fn new(resolver: LocationResolver, matcher: FacilityMatcher) -> Self {
        Self { resolver, matcher }
    }

    /// Resolve within `deadline` and match with an explicit request
    pub async fn run(
        &self,
        facilities: &[Facility],
        request: &MatchRequest,
        deadline: Duration,
    ) -> MatchResult {
        let resolution = self.resolver.resolve(deadline).await;
        let outcome = self
            .matcher
            .match_facilities(&resolution.coordinate, facilities, request);

        tracing::info!(
            "Matched {} of {} facilities around {} (source: {}, widened: {})",
            outcome.facilities.len(),
            facilities.len(),
            resolution.coordinate,
            resolution.source,
            outcome.widened
        );

        MatchResult {
            resolved_coordinate: resolution.coordinate,
            resolution_source: resolution.source,
            facilities: outcome.facilities,
            widened: outcome.widened,
        }
    }

    /// Like [`run`](Self::run), but nearby-only is decided by the resolution
    /// source: on for a device fix, off for network or default positions.
    pub async fn run_source_aware(
        &self,
        facilities: &[Facility],
        category_filter: BTreeSet<String>,
        radius_km: f64,
        limit: Option<usize>,
        deadline: Duration,
    ) -> MatchResult {
        let resolution = self.resolver.resolve(deadline).await;

        let request = MatchRequest {
            category_filter,
            radius_km,
            prefer_nearby_only: resolution.source.prefers_nearby(),
            limit,
        };

        let outcome = self
            .matcher
            .match_facilities(&resolution.coordinate, facilities, &request);

        tracing::info!(
            "Matched {} of {} facilities around {} (source: {}, nearby-only: {}, widened: {})",
            outcome.facilities.len(),
            facilities.len(),
            resolution.coordinate,
            resolution.source,
            request.prefer_nearby_only,
            outcome.widened
        );

        MatchResult {
            resolved_coordinate: resolution.coordinate,
            resolution_source: resolution.source,
            facilities: outcome.facilities,
            widened: outcome.widened,
        }
    }

    /// Run on a tokio worker so the caller is never blocked; the result is
    /// delivered through the returned handle.
    pub fn spawn(
        self: Arc<Self>,
        facilities: Vec<Facility>,
        request: MatchRequest,
        deadline: Duration,
    ) -> JoinHandle<MatchResult> {
        tokio::spawn(async move { self.run(&facilities, &request, deadline).await })
    }
}

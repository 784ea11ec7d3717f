use actix_web::{web, HttpRequest, HttpResponse, Responder};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

use crate::core::{FacilityMatcher, LocationProvider, LocationResolver, MatchingSession, ResolverConfig};
use crate::models::{
    ErrorResponse, HealthResponse, MatchRequest, MatchResult, NearbyBinsRequest,
    NearbyBinsResponse, ResolutionSource,
};
use crate::services::{DeviceSensor, FacilityCatalog, NetworkLocator, PositionSource};

/// Application state shared across all handlers
///
/// Only immutable building blocks live here; each request assembles its own
/// resolver so nothing carries over between invocations.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn FacilityCatalog>,
    pub locators: Arc<Vec<NetworkLocator>>,
    pub host_sensor: Option<Arc<dyn PositionSource>>,
    pub resolver_config: ResolverConfig,
    pub deadline: Duration,
    pub default_radius_km: f64,
    pub matcher: FacilityMatcher,
}

impl AppState {
    /// Build the per-request session
    fn session(&self, req: &NearbyBinsRequest, client_ip: Option<IpAddr>) -> MatchingSession {
        let device = match (&req.device, &self.host_sensor) {
            (Some(report), _) => DeviceSensor::from_report(report.clone()),
            (None, Some(source)) => DeviceSensor::new(source.clone()),
            (None, None) => DeviceSensor::absent(),
        };

        let network: Vec<Arc<dyn LocationProvider>> = self
            .locators
            .iter()
            .map(|locator| Arc::new(locator.for_client(client_ip)) as Arc<dyn LocationProvider>)
            .collect();

        let resolver = LocationResolver::new(Arc::new(device), network, self.resolver_config);
        MatchingSession::new(resolver, self.matcher.clone())
    }
}

/// Configure all bin-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/bins/nearby", web::post().to(find_nearby_bins));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let catalog_healthy = match state.catalog.snapshot().await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!("Catalog health check failed: {}", e);
            false
        }
    };

    let status = if catalog_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Requester address as seen by the service, honoring forwarding headers
fn client_ip(req: &HttpRequest) -> Option<IpAddr> {
    let info = req.connection_info();
    let raw = info.realip_remote_addr()?;
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|addr| addr.ip()))
}

/// Banner texts the UI shows for degraded resolution or widened results
pub fn notices_for(result: &MatchResult, radius_km: f64) -> Vec<String> {
    let mut notices = Vec::new();

    if result.resolution_source == ResolutionSource::Default {
        notices.push(
            "Your location could not be determined; showing bins around a default location."
                .to_string(),
        );
    }
    if result.widened {
        notices.push(format!(
            "No bins found within {} km; showing the nearest bins nationwide.",
            radius_km
        ));
    }

    notices
}

/// Find nearby bins endpoint
///
/// POST /api/v1/bins/nearby
///
/// Request body:
/// ```json
/// {
///   "categories": ["battery", "laptop"],
///   "radiusKm": 10,
///   "preferNearbyOnly": true,
///   "limit": 20,
///   "deadlineMs": 8000,
///   "device": { "status": "fix", "latitude": 28.63, "longitude": 77.21 }
/// }
/// ```
async fn find_nearby_bins(
    state: web::Data<AppState>,
    req: web::Json<NearbyBinsRequest>,
    http_req: HttpRequest,
) -> impl Responder {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for nearby bins request: {:?}", errors);
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let request_id = uuid::Uuid::new_v4().to_string();
    let radius_km = req.radius_km.unwrap_or(state.default_radius_km);
    let deadline = req
        .deadline_ms
        .map(Duration::from_millis)
        .unwrap_or(state.deadline);
    let limit = req.limit.map(usize::from);
    let categories: BTreeSet<String> = req
        .categories
        .iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();

    tracing::info!(
        "Finding bins for request {}: categories={:?}, radius={}km, deadline={:?}",
        request_id,
        categories,
        radius_km,
        deadline
    );

    let facilities = match state.catalog.snapshot().await {
        Ok(facilities) => facilities,
        Err(e) => {
            tracing::error!("Failed to load facility catalog for {}: {}", request_id, e);
            return HttpResponse::InternalServerError().json(ErrorResponse {
                error: "Failed to load facilities".to_string(),
                message: e.to_string(),
                status_code: 500,
            });
        }
    };

    let session = state.session(&req, client_ip(&http_req));

    let result = match req.prefer_nearby_only {
        Some(prefer_nearby_only) => {
            let request = MatchRequest {
                category_filter: categories,
                radius_km,
                prefer_nearby_only,
                limit,
            };
            session.run(&facilities, &request, deadline).await
        }
        None => {
            session
                .run_source_aware(&facilities, categories, radius_km, limit, deadline)
                .await
        }
    };

    let response = NearbyBinsResponse {
        notices: notices_for(&result, radius_km),
        total_facilities: facilities.len(),
        result,
        request_id,
    };

    tracing::info!(
        "Returning {} bins for request {} (source: {}, widened: {})",
        response.result.facilities.len(),
        response.request_id,
        response.result.resolution_source,
        response.result.widened
    );

    HttpResponse::Ok().json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Coordinate;

    fn result(source: ResolutionSource, widened: bool) -> MatchResult {
        MatchResult {
            resolved_coordinate: Coordinate { latitude: 28.6139, longitude: 77.2090 },
            resolution_source: source,
            facilities: vec![],
            widened,
        }
    }

    #[test]
    fn test_no_notices_for_precise_nearby_result() {
        assert!(notices_for(&result(ResolutionSource::Device, false), 10.0).is_empty());
    }

    #[test]
    fn test_notices_for_default_and_widened() {
        let notices = notices_for(&result(ResolutionSource::Default, true), 25.0);
        assert_eq!(notices.len(), 2);
        assert!(notices[1].contains("25 km"));
    }
}

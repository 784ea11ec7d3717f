use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use bin_locator::config::Settings;
use bin_locator::core::FacilityMatcher;
use bin_locator::routes::{self, bins::AppState};
use bin_locator::services::{FacilityCatalog, FileCatalog, GpsdSource, HttpCatalog, PositionSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

fn build_catalog(settings: &Settings) -> std::io::Result<Arc<dyn FacilityCatalog>> {
    let timeout = Duration::from_secs(settings.catalog.timeout_secs);

    match (&settings.catalog.url, &settings.catalog.path) {
        (Some(url), _) => {
            let catalog = HttpCatalog::new(url.clone(), settings.catalog.api_key.clone(), timeout)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
            info!("Using remote facility catalog at {}", url);
            Ok(Arc::new(catalog))
        }
        (None, Some(path)) => {
            info!("Using facility catalog file {}", path);
            Ok(Arc::new(FileCatalog::new(path)))
        }
        (None, None) => Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "catalog.url or catalog.path must be configured",
        )),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
        }
    };

    // LOG_LEVEL / LOG_FORMAT win over the config file
    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());
    init_logging(&log_level, &log_format);

    info!("Starting bin locator service...");

    let resolver_config = settings.resolver.to_resolver_config().map_err(|e| {
        error!("Invalid default coordinate: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    let locators = settings.build_locators().map_err(|e| {
        error!("Failed to build network locators: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e)
    })?;

    info!(
        "Resolver chain: device -> {} -> default {}",
        locators.iter().map(|l| l.request_url()).collect::<Vec<_>>().join(" -> "),
        resolver_config.default_coordinate
    );

    let host_sensor: Option<Arc<dyn PositionSource>> = settings
        .device
        .gpsd_addr
        .as_ref()
        .map(|addr| {
            info!("Host device sensor: gpsd at {}", addr);
            Arc::new(GpsdSource::new(addr.clone())) as Arc<dyn PositionSource>
        });

    let catalog = build_catalog(&settings)?;

    let app_state = AppState {
        catalog,
        locators: Arc::new(locators),
        host_sensor,
        resolver_config,
        deadline: settings.resolver.deadline(),
        default_radius_km: settings.matching.default_radius_km,
        matcher: FacilityMatcher::new(settings.matching.max_results),
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(routes::json_error_handler))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}

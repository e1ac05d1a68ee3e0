// Weather API binary entry point

#[path = "api/config.rs"]
mod config;

#[path = "api/cors.rs"]
mod cors;

#[path = "api/error.rs"]
mod error;

#[path = "api/router.rs"]
mod router;

#[path = "api/handlers/mod.rs"]
mod handlers;

mod repo;
mod store_config;

use lambda_http::{run, service_fn, Body, Error, Request, RequestExt, Response};
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use agriweather_backend::{DeviceRegistry, InMemoryDeviceRegistry, SystemClock, WeatherService};
use config::ApiConfig;
use repo::devices::DynamoDbDeviceRegistry;

/// Process-wide state shared by every invocation
pub struct AppState {
    pub service: WeatherService,
    pub cors_allowed_origin: String,
}

impl AppState {
    pub fn new(service: WeatherService, cors_allowed_origin: impl Into<String>) -> Self {
        Self {
            service,
            cors_allowed_origin: cors_allowed_origin.into(),
        }
    }
}

async fn build_state(config: &ApiConfig) -> AppState {
    let store = match config.store.connect() {
        Ok(Some(store)) => {
            info!(
                backend = config.store.backend.as_ref().map(|b| b.kind()).unwrap_or("none"),
                "Reading store connected"
            );
            Some(store)
        }
        Ok(None) => {
            warn!("No store credentials configured, reading store unavailable");
            None
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect reading store, continuing without it");
            None
        }
    };

    let registry: Arc<dyn DeviceRegistry> = match &config.devices_table {
        Some(table) => Arc::new(DynamoDbDeviceRegistry::from_env(table.clone()).await),
        None => Arc::new(InMemoryDeviceRegistry::new()),
    };
    info!(registry = registry.backend_name(), "Device registry selected");

    let service = WeatherService::new(
        store,
        registry,
        Arc::new(SystemClock::new()),
        config.polling_interval,
    );

    match service.seed_devices(&config.seed_devices).await {
        Ok(added) => info!(added, requested = config.seed_devices.len(), "Seeded devices"),
        Err(e) => warn!(error = %e, "Failed to seed devices"),
    }

    AppState::new(service, config.cors_allowed_origin.clone())
}

async fn function_handler(event: Request, state: &AppState) -> Result<Response<Body>, Error> {
    let request_id = event.lambda_context().request_id.clone();
    let method = event.method().clone();
    let path = event.uri().path().to_string();

    let response = router::route_request(event, &request_id, state).await;

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        status = %response.status(),
        "Request completed"
    );

    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .without_time()
        .init();

    let config = ApiConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        Error::from(format!("Configuration error: {}", e))
    })?;

    info!(
        polling_interval_secs = config.polling_interval.as_secs(),
        "Weather API starting"
    );

    let state = Arc::new(build_state(&config).await);
    state.service.poller().start();

    let handler_state = Arc::clone(&state);
    let result = run(service_fn(move |event: Request| {
        let state = Arc::clone(&handler_state);
        async move { function_handler(event, &state).await }
    }))
    .await;

    state.service.poller().stop().await;
    result
}

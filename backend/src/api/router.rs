use lambda_http::{http::Method, Body, Request, Response};
use tracing::{error, info, warn};

use super::cors;
use super::error::ApiError;
use super::handlers;
use super::AppState;
use agriweather_backend::{validate_device_id, WeatherService};

/// Route an incoming request to its handler and render errors as JSON.
///
/// Paths are normalized first (trailing slashes and the `/api` prefix are
/// stripped), so `/api/devices/` and `/devices` hit the same handler.
pub async fn route_request(event: Request, request_id: &str, state: &AppState) -> Response<Body> {
    let path = normalize_path(event.uri().path());
    let method = event.method().clone();

    info!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Routing request"
    );

    if method == Method::OPTIONS {
        return cors::preflight_response(&state.cors_allowed_origin);
    }

    let service = &state.service;
    let result = match (&method, path.as_str()) {
        (&Method::GET, "/health") => handle_health(service),

        (&Method::GET, "/devices") => handlers::devices::list_devices(request_id, service).await,
        (&Method::POST, "/devices") => {
            handlers::devices::register_device(&event, request_id, service).await
        }
        (&Method::GET, path) if path.starts_with("/devices/") => {
            route_device_path(&event, request_id, service, path).await
        }

        (&Method::GET, "/alerts") => {
            handlers::alerts::get_all_alerts(&event, request_id, service).await
        }

        (&Method::GET, "/analytics/aggregated") => {
            handlers::analytics::get_aggregated(&event, request_id, service).await
        }
        (&Method::GET, "/analytics/irrigation") => {
            handlers::analytics::get_irrigation(&event, request_id, service).await
        }

        _ => {
            warn!(
                request_id = %request_id,
                method = %method,
                path = %path,
                "Unknown route"
            );
            Err(ApiError::RouteNotFound {
                method: method.to_string(),
                path: path.clone(),
            })
        }
    };

    let response = result.unwrap_or_else(|e| {
        let (status, code, _) = e.parts();
        if status >= 500 {
            error!(request_id = %request_id, error = %e, code, "Request failed");
        } else {
            warn!(request_id = %request_id, error = %e, code, "Request rejected");
        }
        e.to_http_response(request_id)
    });

    cors::add_cors_headers(response, &state.cors_allowed_origin)
}

fn normalize_path(path: &str) -> String {
    let path = match path.strip_prefix("/api") {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    if path.is_empty() || path == "/" {
        return "/".to_string();
    }

    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

async fn route_device_path(
    event: &Request,
    request_id: &str,
    service: &WeatherService,
    path: &str,
) -> Result<Response<Body>, ApiError> {
    let parts: Vec<&str> = path.trim_start_matches("/devices/").split('/').collect();

    let Some(device_id) = parts.first().copied() else {
        return Err(not_found(path));
    };
    validate_device_id(device_id)?;

    match parts.as_slice() {
        [_] => handlers::devices::get_device(request_id, service, device_id).await,
        [_, "status"] => handlers::devices::get_device_status(request_id, service, device_id).await,
        [_, "current"] => handlers::readings::get_current(request_id, service, device_id).await,
        [_, "history"] => {
            handlers::readings::get_history(event, request_id, service, device_id).await
        }
        [_, "alerts"] => {
            handlers::alerts::get_device_alerts(event, request_id, service, device_id).await
        }
        _ => Err(not_found(path)),
    }
}

fn not_found(path: &str) -> ApiError {
    ApiError::RouteNotFound {
        method: Method::GET.to_string(),
        path: path.to_string(),
    }
}

fn handle_health(service: &WeatherService) -> Result<Response<Body>, ApiError> {
    handlers::json_response(200, &service.health())
}

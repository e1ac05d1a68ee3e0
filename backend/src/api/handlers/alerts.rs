use lambda_http::{Body, Request, Response};
use tracing::info;

use super::{json_response, limit_param, query_param};
use crate::error::ApiError;
use agriweather_backend::{Severity, ValidationError, WeatherService};

/// Handler for GET /devices/{device_id}/alerts
///
/// # Query Parameters
/// * `severity` - `critical`, `warning` or `info`
/// * `limit` - most recent alerts to return (default 20)
pub async fn get_device_alerts(
    event: &Request,
    request_id: &str,
    service: &WeatherService,
    device_id: &str,
) -> Result<Response<Body>, ApiError> {
    let severity = query_param(event, "severity")
        .map(|raw| {
            raw.parse::<Severity>()
                .map_err(|e| ValidationError::new("severity", e))
        })
        .transpose()?;
    let limit = limit_param(event)?;

    let report = service.get_alerts(device_id, severity, limit).await?;

    info!(
        request_id = %request_id,
        device_id = %device_id,
        count = report.count,
        has_critical = report.has_critical,
        "Fetched device alerts"
    );

    json_response(200, &report)
}

/// Handler for GET /alerts
pub async fn get_all_alerts(
    event: &Request,
    request_id: &str,
    service: &WeatherService,
) -> Result<Response<Body>, ApiError> {
    let report = service.get_all_alerts(limit_param(event)?)?;

    info!(
        request_id = %request_id,
        count = report.count,
        "Fetched recent alerts"
    );

    json_response(200, &report)
}

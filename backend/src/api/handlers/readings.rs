use lambda_http::{Body, Request, Response};
use tracing::info;

use super::{json_response, limit_param, query_param};
use crate::error::ApiError;
use agriweather_backend::{HistoryQuery, WeatherService};

/// Handler for GET /devices/{device_id}/current
pub async fn get_current(
    request_id: &str,
    service: &WeatherService,
    device_id: &str,
) -> Result<Response<Body>, ApiError> {
    let reading = service.get_current(device_id).await?;

    info!(
        request_id = %request_id,
        device_id = %device_id,
        timestamp = %reading.timestamp,
        "Fetched current reading"
    );

    json_response(200, &reading)
}

/// Handler for GET /devices/{device_id}/history
///
/// # Query Parameters
/// * `from` - inclusive lower bound (ISO-8601)
/// * `to` - inclusive upper bound (ISO-8601)
/// * `limit` - most recent readings to return (default 100)
pub async fn get_history(
    event: &Request,
    request_id: &str,
    service: &WeatherService,
    device_id: &str,
) -> Result<Response<Body>, ApiError> {
    let query = HistoryQuery {
        from: query_param(event, "from"),
        to: query_param(event, "to"),
        limit: limit_param(event)?,
    };

    info!(
        request_id = %request_id,
        device_id = %device_id,
        from = ?query.from,
        to = ?query.to,
        limit = ?query.limit,
        "Parsed history query"
    );

    let report = service.get_history(device_id, query).await?;
    json_response(200, &report)
}

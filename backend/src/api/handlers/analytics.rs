use lambda_http::{Body, Request, Response};
use tracing::info;

use super::{json_response, query_param};
use crate::error::ApiError;
use agriweather_backend::{validate_device_id, AggregateQuery, ValidationError, WeatherService};

fn required_device_id(event: &Request) -> Result<String, ApiError> {
    let device_id = query_param(event, "device_id")
        .ok_or_else(|| ValidationError::missing("device_id", "Device ID is required"))?;
    validate_device_id(&device_id)?;
    Ok(device_id)
}

/// Handler for GET /analytics/aggregated
///
/// # Query Parameters
/// * `device_id` - required
/// * `period` - label echoed in the response (default `day`)
/// * `from`, `to` - optional inclusive window
pub async fn get_aggregated(
    event: &Request,
    request_id: &str,
    service: &WeatherService,
) -> Result<Response<Body>, ApiError> {
    let device_id = required_device_id(event)?;
    let query = AggregateQuery {
        period: query_param(event, "period"),
        from: query_param(event, "from"),
        to: query_param(event, "to"),
    };

    let report = service.get_aggregated(&device_id, query).await?;

    info!(
        request_id = %request_id,
        device_id = %device_id,
        readings_count = report.stats.readings_count,
        "Aggregated readings"
    );

    json_response(200, &report)
}

/// Handler for GET /analytics/irrigation
pub async fn get_irrigation(
    event: &Request,
    request_id: &str,
    service: &WeatherService,
) -> Result<Response<Body>, ApiError> {
    let device_id = required_device_id(event)?;
    let crop_type = query_param(event, "crop_type");

    let report = service
        .get_irrigation(&device_id, crop_type.as_deref())
        .await?;

    info!(
        request_id = %request_id,
        device_id = %device_id,
        needs_irrigation = report.recommendation.needs_irrigation,
        "Generated irrigation recommendation"
    );

    json_response(200, &report)
}

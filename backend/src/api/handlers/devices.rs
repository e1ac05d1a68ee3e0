use lambda_http::{Body, Request, Response};
use serde::Serialize;
use tracing::{info, warn};

use super::json_response;
use crate::error::ApiError;
use agriweather_backend::{DeviceRecord, RegisterDeviceRequest, WeatherService};

/// Response payload for device listing
#[derive(Debug, Serialize)]
pub struct ListDevicesResponse {
    pub devices: Vec<DeviceRecord>,
    pub count: usize,
}

/// Handler for GET /devices
pub async fn list_devices(
    request_id: &str,
    service: &WeatherService,
) -> Result<Response<Body>, ApiError> {
    let devices = service.list_devices().await?;

    info!(
        request_id = %request_id,
        count = devices.len(),
        "Listed devices"
    );

    json_response(
        200,
        &ListDevicesResponse {
            count: devices.len(),
            devices,
        },
    )
}

/// Handler for POST /devices
///
/// Registers (or re-registers) a device. Returns 201 with the stored record.
pub async fn register_device(
    event: &Request,
    request_id: &str,
    service: &WeatherService,
) -> Result<Response<Body>, ApiError> {
    let body_bytes = match event.body() {
        Body::Text(text) => text.as_bytes(),
        Body::Binary(bytes) => bytes.as_slice(),
        Body::Empty => {
            return Err(ApiError::BadRequest("Request body is required".to_string()));
        }
    };

    let request: RegisterDeviceRequest = serde_json::from_slice(body_bytes).map_err(|e| {
        warn!(request_id = %request_id, error = %e, "Failed to parse request body");
        ApiError::BadRequest(format!("Invalid JSON: {}", e))
    })?;

    let device = service.register_device(request).await?;

    info!(
        request_id = %request_id,
        device_id = %device.device_id,
        "Registration completed"
    );

    json_response(201, &device)
}

/// Handler for GET /devices/{device_id}
pub async fn get_device(
    request_id: &str,
    service: &WeatherService,
    device_id: &str,
) -> Result<Response<Body>, ApiError> {
    let details = service.get_device(device_id).await?;

    info!(
        request_id = %request_id,
        device_id = %device_id,
        has_reading = details.last_reading.is_some(),
        "Fetched device details"
    );

    json_response(200, &details)
}

/// Handler for GET /devices/{device_id}/status
pub async fn get_device_status(
    request_id: &str,
    service: &WeatherService,
    device_id: &str,
) -> Result<Response<Body>, ApiError> {
    let report = service.get_device_status(device_id).await?;

    info!(
        request_id = %request_id,
        device_id = %device_id,
        status = ?report.status,
        "Resolved device status"
    );

    json_response(200, &report)
}

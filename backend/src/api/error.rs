use lambda_http::{Body, Response};
use thiserror::Error;

use agriweather_backend::shared::error::{error_codes, ErrorResponse};
use agriweather_backend::{RegistryError, ServiceError, ValidationError, ValidationKind};

/// Main error type for the weather API
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Route {method} {path} not found")]
    RouteNotFound { method: String, path: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Service(ServiceError::Validation(err))
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Service(ServiceError::Registry(err))
    }
}

impl ApiError {
    /// HTTP status, stable error code and client-facing message
    pub fn parts(&self) -> (u16, &'static str, String) {
        match self {
            ApiError::Service(ServiceError::Validation(e)) => {
                let code = match (e.kind, e.field.as_str()) {
                    (ValidationKind::Missing, _) => error_codes::MISSING_FIELD,
                    (_, "device_id") => error_codes::INVALID_DEVICE_ID,
                    (_, "from" | "to") => error_codes::INVALID_TIMESTAMP,
                    _ => error_codes::INVALID_VALUE,
                };
                (400, code, e.message.clone())
            }
            ApiError::BadRequest(message) => (400, error_codes::INVALID_BODY, message.clone()),
            ApiError::Service(e @ ServiceError::DeviceNotFound(_)) => {
                (404, error_codes::DEVICE_NOT_FOUND, e.to_string())
            }
            ApiError::Service(ServiceError::NotFound(message)) => {
                (404, error_codes::NOT_FOUND, message.clone())
            }
            ApiError::Service(ServiceError::NoData(message)) => {
                (404, error_codes::NO_DATA, message.clone())
            }
            ApiError::RouteNotFound { method, path } => (
                404,
                error_codes::NOT_FOUND,
                format!("Route {} {} not found", method, path),
            ),
            ApiError::Service(ServiceError::StoreUnavailable(_)) => (
                503,
                error_codes::STORE_UNAVAILABLE,
                "Reading store is unavailable".to_string(),
            ),
            ApiError::Service(ServiceError::Store(_)) => (
                500,
                error_codes::STORE_ERROR,
                "Reading store error occurred".to_string(),
            ),
            ApiError::Service(ServiceError::Registry(_)) => (
                500,
                error_codes::REGISTRY_ERROR,
                "Device registry error occurred".to_string(),
            ),
            ApiError::Internal(_) => (
                500,
                error_codes::INTERNAL_ERROR,
                "Internal server error occurred".to_string(),
            ),
        }
    }

    /// Convert error to HTTP response with appropriate status code and error payload
    pub fn to_http_response(&self, request_id: &str) -> Response<Body> {
        let (status, error_code, message) = self.parts();
        let error_response = ErrorResponse::new(error_code, &message, request_id);

        let body = error_response
            .to_json()
            .unwrap_or_else(|_| r#"{"error":"INTERNAL_ERROR","message":"Failed to serialize error response","request_id":""}"#.to_string());

        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap_or_else(|_| {
                let mut fallback = Response::new(Body::from(
                    r#"{"error":"INTERNAL_ERROR","message":"Failed to build response"}"#,
                ));
                *fallback.status_mut() = lambda_http::http::StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}

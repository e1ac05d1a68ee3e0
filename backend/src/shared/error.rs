use serde::{Deserialize, Serialize};

/// Standard error response payload
/// Contains stable machine-readable error code, human-readable message, and request ID
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable error code (e.g., "DEVICE_NOT_FOUND", "STORE_UNAVAILABLE")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// Request ID for tracing and debugging
    pub request_id: String,
}

impl ErrorResponse {
    pub fn new(
        error: impl Into<String>,
        message: impl Into<String>,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            request_id: request_id.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Common error codes used across the API
pub mod error_codes {
    // Validation errors
    pub const MISSING_FIELD: &str = "MISSING_FIELD";
    pub const INVALID_DEVICE_ID: &str = "INVALID_DEVICE_ID";
    pub const INVALID_VALUE: &str = "INVALID_VALUE";
    pub const INVALID_TIMESTAMP: &str = "INVALID_TIMESTAMP";
    pub const INVALID_BODY: &str = "INVALID_BODY";

    // Not found errors
    pub const NOT_FOUND: &str = "NOT_FOUND";
    pub const DEVICE_NOT_FOUND: &str = "DEVICE_NOT_FOUND";
    pub const NO_DATA: &str = "NO_DATA";

    // Storage errors
    pub const STORE_UNAVAILABLE: &str = "STORE_UNAVAILABLE";
    pub const STORE_ERROR: &str = "STORE_ERROR";
    pub const REGISTRY_ERROR: &str = "REGISTRY_ERROR";

    // Internal errors
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_creation() {
        let error = ErrorResponse::new(
            error_codes::DEVICE_NOT_FOUND,
            "Device not found: dev-1",
            "req-123",
        );

        assert_eq!(error.error, "DEVICE_NOT_FOUND");
        assert_eq!(error.message, "Device not found: dev-1");
        assert_eq!(error.request_id, "req-123");
    }

    #[test]
    fn test_error_response_to_json() {
        let error = ErrorResponse::new(
            error_codes::STORE_UNAVAILABLE,
            "Storage not configured",
            "req-456",
        );

        let json = error.to_json().unwrap();
        assert!(json.contains("STORE_UNAVAILABLE"));
        assert!(json.contains("req-456"));

        let deserialized: ErrorResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.error, error.error);
        assert_eq!(deserialized.message, error.message);
    }
}

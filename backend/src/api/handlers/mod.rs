pub mod alerts;
pub mod analytics;
pub mod devices;
pub mod readings;

use lambda_http::{Body, Request, RequestExt, Response};
use serde::Serialize;

use crate::error::ApiError;
use agriweather_backend::ValidationError;

/// Serialize `payload` into a JSON response with the given status
pub fn json_response<T: Serialize>(status: u16, payload: &T) -> Result<Response<Body>, ApiError> {
    let body = serde_json::to_string(payload)
        .map_err(|e| ApiError::Internal(format!("Failed to serialize response: {}", e)))?;

    Response::builder()
        .status(status)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {}", e)))
}

/// First value of a query parameter, empty values treated as absent
pub fn query_param(event: &Request, name: &str) -> Option<String> {
    event
        .query_string_parameters()
        .first(name)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Optional `limit` query parameter; must be a positive integer when given
pub fn limit_param(event: &Request) -> Result<Option<usize>, ApiError> {
    match query_param(event, "limit") {
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| ValidationError::new("limit", "limit must be a positive integer").into()),
        None => Ok(None),
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::create_test_request;
    use super::*;
    use lambda_http::http::Method;

    #[test]
    fn test_json_response() {
        let response = json_response(201, &serde_json::json!({"ok": true})).unwrap();
        assert_eq!(response.status(), 201);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_limit_param() {
        let request = create_test_request(Method::GET, "/alerts", &[("limit", "5")]);
        assert_eq!(limit_param(&request).unwrap(), Some(5));

        let request = create_test_request(Method::GET, "/alerts", &[]);
        assert_eq!(limit_param(&request).unwrap(), None);

        let request = create_test_request(Method::GET, "/alerts", &[("limit", "ten")]);
        let err = limit_param(&request).unwrap_err();
        assert_eq!(err.parts().0, 400);
    }

    #[test]
    fn test_empty_query_param_is_absent() {
        let request = create_test_request(Method::GET, "/alerts", &[("severity", "")]);
        assert_eq!(query_param(&request, "severity"), None);
    }
}

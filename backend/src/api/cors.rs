use lambda_http::http::HeaderValue;
use lambda_http::{Body, Response};

pub const DEFAULT_ALLOWED_ORIGIN: &str = "*";

/// Add CORS headers to a response.
///
/// An origin that is not a valid header value falls back to `*`.
pub fn add_cors_headers(mut response: Response<Body>, allowed_origin: &str) -> Response<Body> {
    let headers = response.headers_mut();

    let origin = HeaderValue::from_str(allowed_origin)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_ALLOWED_ORIGIN));

    headers.insert("Access-Control-Allow-Origin", origin);
    headers.insert(
        "Access-Control-Allow-Methods",
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        "Access-Control-Allow-Headers",
        HeaderValue::from_static("Content-Type"),
    );
    headers.insert("Access-Control-Max-Age", HeaderValue::from_static("3600"));

    response
}

/// Empty 200 response for OPTIONS preflight requests
pub fn preflight_response(allowed_origin: &str) -> Response<Body> {
    let mut response = Response::new(Body::Empty);
    *response.status_mut() = lambda_http::http::StatusCode::OK;

    add_cors_headers(response, allowed_origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_cors_headers() {
        let response = Response::builder().status(200).body(Body::Empty).unwrap();
        let response = add_cors_headers(response, "https://farm.example.com");

        let headers = response.headers();
        assert_eq!(
            headers.get("Access-Control-Allow-Origin").unwrap(),
            "https://farm.example.com"
        );
        assert_eq!(
            headers.get("Access-Control-Allow-Methods").unwrap(),
            "GET, POST, OPTIONS"
        );
        assert_eq!(headers.get("Access-Control-Max-Age").unwrap(), "3600");
    }

    #[test]
    fn test_invalid_origin_falls_back_to_wildcard() {
        let response = Response::builder().status(200).body(Body::Empty).unwrap();
        let response = add_cors_headers(response, "bad\norigin");

        assert_eq!(
            response.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );
    }

    #[test]
    fn test_preflight_response() {
        let response = preflight_response("*");

        assert_eq!(response.status(), 200);
        assert!(matches!(response.body(), Body::Empty));
        assert!(response.headers().contains_key("Access-Control-Allow-Headers"));
    }
}

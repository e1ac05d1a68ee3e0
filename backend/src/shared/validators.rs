use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::time::parse_timestamp;

/// Whether the field was absent or present with a bad value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    Missing,
    Invalid,
}

/// Validation error type
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    pub kind: ValidationKind,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            kind: ValidationKind::Invalid,
        }
    }

    /// A required field that was not supplied
    pub fn missing(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ValidationKind::Missing,
            ..Self::new(field, message)
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Validation error for field '{}': {}",
            self.field, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

/// Validate a device identifier.
/// 1-128 characters of `[A-Za-z0-9_.-]`, not starting with `.`. The id is
/// also the first segment of every shard key, so `/` is never allowed.
pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    static DEVICE_ID_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex =
        DEVICE_ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9_.-]{0,127}$").unwrap());

    if device_id.is_empty() {
        return Err(ValidationError::missing("device_id", "Device ID is required"));
    }

    if regex.is_match(device_id) {
        Ok(())
    } else {
        Err(ValidationError::new(
            "device_id",
            "Device ID must be 1-128 characters of letters, digits, '_', '-' or '.', and must not start with '.'",
        ))
    }
}

/// Validate a device display name
/// Max 64 chars, safe ASCII only
pub fn validate_device_name(name: &str) -> Result<(), ValidationError> {
    if name.is_empty() {
        return Err(ValidationError::new("name", "Device name cannot be empty"));
    }

    if name.len() > 64 {
        return Err(ValidationError::new(
            "name",
            format!(
                "Device name length {} exceeds maximum of 64 characters",
                name.len()
            ),
        ));
    }

    // Printable ASCII (0x20-0x7E)
    if !name.chars().all(|c| c.is_ascii() && (' '..='~').contains(&c)) {
        return Err(ValidationError::new(
            "name",
            "Device name must contain only safe ASCII characters (printable ASCII 0x20-0x7E)",
        ));
    }

    Ok(())
}

/// Validate latitude/longitude ranges
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ValidationError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(ValidationError::new(
            "latitude",
            format!("Latitude {} must be between -90 and 90", latitude),
        ));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(ValidationError::new(
            "longitude",
            format!("Longitude {} must be between -180 and 180", longitude),
        ));
    }
    Ok(())
}

/// Parse an optional history/aggregation bound.
/// Accepts RFC3339, naive ISO-8601 (UTC) and `YYYY-MM-DD`.
pub fn parse_time_bound(
    field: &str,
    value: Option<&str>,
) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_timestamp(raw).map(Some).ok_or_else(|| {
            ValidationError::new(
                field,
                format!(
                    "'{}' is not a valid timestamp (expected e.g. 2024-01-15T10:30:00Z or 2024-01-15)",
                    raw
                ),
            )
        }),
    }
}

/// Validate a result limit (must be at least 1)
pub fn validate_limit(limit: usize) -> Result<usize, ValidationError> {
    if limit == 0 {
        return Err(ValidationError::new("limit", "Limit must be at least 1"));
    }
    Ok(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_device_id() {
        // Valid device IDs
        assert!(validate_device_id("agriweather-device-001").is_ok());
        assert!(validate_device_id("field_7.north").is_ok());
        assert!(validate_device_id("a").is_ok());
        assert!(validate_device_id(&"a".repeat(128)).is_ok());

        // Invalid device IDs
        assert!(validate_device_id("").is_err());
        assert!(validate_device_id(&"a".repeat(129)).is_err()); // too long
        assert!(validate_device_id(".hidden").is_err()); // leading dot
        assert!(validate_device_id("a/b").is_err()); // path separator
        assert!(validate_device_id("device 1").is_err()); // space
        assert!(validate_device_id("czujnik-ł").is_err()); // non-ASCII
    }

    #[test]
    fn test_validate_device_id_field_name() {
        let err = validate_device_id("").unwrap_err();
        assert_eq!(err.field, "device_id");
        assert!(err.to_string().contains("device_id"));
    }

    #[test]
    fn test_validate_device_name() {
        // Valid names
        assert!(validate_device_name("North Field Station").is_ok());
        assert!(validate_device_name("a").is_ok());
        assert!(validate_device_name(&"a".repeat(64)).is_ok());

        // Invalid names
        assert!(validate_device_name("").is_err());
        assert!(validate_device_name(&"a".repeat(65)).is_err());
        assert!(validate_device_name("line\nbreak").is_err());
        assert!(validate_device_name("tab\tname").is_err());
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(50.0, 20.0).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert_eq!(
            validate_coordinates(91.0, 0.0).unwrap_err().field,
            "latitude"
        );
        assert_eq!(
            validate_coordinates(0.0, -180.5).unwrap_err().field,
            "longitude"
        );
        assert!(validate_coordinates(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_parse_time_bound() {
        assert_eq!(parse_time_bound("from", None).unwrap(), None);
        assert!(parse_time_bound("from", Some("2024-01-15T10:30:00Z"))
            .unwrap()
            .is_some());
        assert!(parse_time_bound("from", Some("2024-01-15")).unwrap().is_some());

        let err = parse_time_bound("to", Some("last tuesday")).unwrap_err();
        assert_eq!(err.field, "to");
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(1).unwrap(), 1);
        assert_eq!(validate_limit(100).unwrap(), 100);
        assert!(validate_limit(0).is_err());
    }
}

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Clock trait for abstracting time operations
/// Provides methods for getting current time in different formats
pub trait Clock: Send + Sync {
    /// Get current time
    fn now(&self) -> DateTime<Utc>;

    /// Get current time as RFC3339 string (for record timestamps)
    /// Format: "2024-01-15T10:30:00+00:00"
    fn now_rfc3339(&self) -> String {
        self.now().to_rfc3339()
    }
}

/// Production implementation of Clock using system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test implementation of Clock with fixed/controllable time
/// Useful for deterministic testing
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new FixedClock with the given timestamp
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self { timestamp }
    }

    /// Create a FixedClock from RFC3339 string
    pub fn from_rfc3339(timestamp_str: &str) -> Result<Self, chrono::ParseError> {
        let timestamp = DateTime::parse_from_rfc3339(timestamp_str)?.with_timezone(&Utc);
        Ok(Self { timestamp })
    }

    /// Update the fixed time
    pub fn set_time(&mut self, timestamp: DateTime<Utc>) {
        self.timestamp = timestamp;
    }

    /// Advance time by the given number of seconds
    pub fn advance_seconds(&mut self, seconds: i64) {
        self.timestamp += chrono::Duration::seconds(seconds);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Parse an ISO-8601 timestamp into a UTC instant.
///
/// Accepts RFC3339 with any offset, a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// (taken as UTC) and a bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_now_rfc3339() {
        let clock = SystemClock::new();
        let now = clock.now_rfc3339();

        // Verify it's a valid RFC3339 timestamp
        assert!(DateTime::parse_from_rfc3339(&now).is_ok());
        assert!(now.contains('T'));
    }

    #[test]
    fn test_fixed_clock_from_rfc3339() {
        let clock = FixedClock::from_rfc3339("2024-01-15T10:30:00Z").unwrap();

        let rfc3339 = clock.now_rfc3339();
        assert!(rfc3339.starts_with("2024-01-15T10:30:00"));
        assert_eq!(clock.now().timestamp(), 1705314600);
    }

    #[test]
    fn test_fixed_clock_advance_seconds() {
        let mut clock = FixedClock::from_rfc3339("2024-01-15T10:30:00Z").unwrap();
        let initial = clock.now();

        clock.advance_seconds(3600);

        assert_eq!((clock.now() - initial).num_seconds(), 3600);
    }

    #[test]
    fn test_fixed_clock_set_time() {
        let mut clock = FixedClock::from_rfc3339("2024-01-15T10:30:00Z").unwrap();

        let new_time = DateTime::parse_from_rfc3339("2024-12-25T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        clock.set_time(new_time);

        assert_eq!(clock.now_rfc3339(), "2024-12-25T00:00:00+00:00");
    }

    #[test]
    fn test_clock_trait_object() {
        let clock: Box<dyn Clock> =
            Box::new(FixedClock::from_rfc3339("2024-01-15T10:30:00Z").unwrap());
        assert_eq!(clock.now().timestamp(), 1705314600);
    }

    #[test]
    fn test_parse_timestamp_rfc3339_variants() {
        let expected = parse_timestamp("2024-01-15T10:30:00Z").unwrap();
        assert_eq!(parse_timestamp("2024-01-15T10:30:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-15T12:30:00+02:00"), Some(expected));
        assert!(parse_timestamp("2024-01-15T10:30:00.123456+00:00").is_some());
    }

    #[test]
    fn test_parse_timestamp_naive_and_date() {
        let naive = parse_timestamp("2024-01-15T10:30:00").unwrap();
        assert_eq!(naive.to_rfc3339(), "2024-01-15T10:30:00+00:00");

        let date = parse_timestamp("2024-01-15").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-01-15T00:00:00+00:00");
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-45T99:00:00Z").is_none());
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::time::parse_timestamp;

/// Temperature used by the alert engine when a reading omits it (°C)
pub const DEFAULT_TEMPERATURE_C: f64 = 0.0;
/// Humidity used when a reading omits it (%)
pub const DEFAULT_HUMIDITY_PCT: f64 = 50.0;
/// Soil moisture used when a reading omits it (%)
pub const DEFAULT_SOIL_MOISTURE_PCT: f64 = 50.0;
/// Wind speed used when a reading omits it (km/h)
pub const DEFAULT_WIND_SPEED_KMH: f64 = 0.0;
/// Rainfall used when a reading omits it (mm/h)
pub const DEFAULT_RAINFALL_MM: f64 = 0.0;

// ============================================================================
// Readings
// ============================================================================

/// Geographic position of a device
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            latitude: 50.0,
            longitude: 20.0,
        }
    }
}

/// Environmental sensor reading as produced by a field device.
///
/// One JSON object per shard line. Every measurement is optional on the wire;
/// consumers decide whether a missing value is defaulted (alerts,
/// recommendations) or skipped (aggregation). Unknown fields are ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    #[serde(default)]
    pub device_id: String,
    /// ISO-8601 UTC timestamp of the measurement
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Air temperature (°C)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Relative humidity (%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    /// Rainfall (mm/h)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rainfall: Option<f64>,
    /// Soil moisture (%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soil_moisture: Option<f64>,
    /// Wind speed (km/h)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind_speed: Option<f64>,
}

impl Reading {
    /// Create a reading with no measurements
    pub fn new(device_id: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp: timestamp.into(),
            location: None,
            temperature: None,
            humidity: None,
            rainfall: None,
            soil_moisture: None,
            wind_speed: None,
        }
    }

    /// Parsed measurement time, `None` when the timestamp is not ISO-8601
    pub fn event_time(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Total ordering key used wherever readings are ranked by time.
    ///
    /// Parsed instants compare numerically; the raw string breaks ties.
    /// Readings with an unparsable timestamp rank below every parsed one.
    pub fn order_key(&self) -> (Option<DateTime<Utc>>, &str) {
        (self.event_time(), self.timestamp.as_str())
    }

    /// Whether this reading is strictly newer than `other`
    pub fn is_newer_than(&self, other: &Reading) -> bool {
        self.order_key() > other.order_key()
    }

    pub fn temperature_or_default(&self) -> f64 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE_C)
    }

    pub fn humidity_or_default(&self) -> f64 {
        self.humidity.unwrap_or(DEFAULT_HUMIDITY_PCT)
    }

    pub fn soil_moisture_or_default(&self) -> f64 {
        self.soil_moisture.unwrap_or(DEFAULT_SOIL_MOISTURE_PCT)
    }

    pub fn wind_speed_or_default(&self) -> f64 {
        self.wind_speed.unwrap_or(DEFAULT_WIND_SPEED_KMH)
    }

    pub fn rainfall_or_default(&self) -> f64 {
        self.rainfall.unwrap_or(DEFAULT_RAINFALL_MM)
    }
}

/// Sort readings ascending by time (see [`Reading::order_key`])
pub fn sort_by_time(readings: &mut [Reading]) {
    readings.sort_by(|a, b| a.order_key().cmp(&b.order_key()));
}

/// Newest reading of a set, if any
pub fn latest_of(readings: Vec<Reading>) -> Option<Reading> {
    readings
        .into_iter()
        .reduce(|best, next| if next.is_newer_than(&best) { next } else { best })
}

/// Whether a reading falls inside an inclusive time window.
///
/// With no bounds every reading qualifies. Once any bound is set, readings
/// whose timestamp does not parse are excluded.
pub fn in_window(
    reading: &Reading,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    if from.is_none() && to.is_none() {
        return true;
    }
    match reading.event_time() {
        Some(at) => from.map_or(true, |f| at >= f) && to.map_or(true, |t| at <= t),
        None => false,
    }
}

/// Round to two decimal places for presentation
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// Devices
// ============================================================================

/// Registered field device
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceRecord {
    pub device_id: String,
    pub name: String,
    pub location: Location,
    /// RFC3339 registration time
    pub registered_at: String,
    pub status: String,
}

/// Connectivity derived from the age of the latest reading
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityStatus {
    Online,
    Offline,
    Unknown,
}

impl ConnectivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectivityStatus::Online => "online",
            ConnectivityStatus::Offline => "offline",
            ConnectivityStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceStatusReport {
    pub device_id: String,
    pub status: ConnectivityStatus,
    pub last_seen: Option<String>,
    pub registered: String,
}

/// Device record enriched with the timestamp of its cached reading
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceDetails {
    #[serde(flatten)]
    pub device: DeviceRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reading: Option<String>,
}

// ============================================================================
// Alerts
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Frost,
    LowTemperature,
    HighTemperature,
    LowSoilMoisture,
    HighWind,
    LowHumidity,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::Frost => "frost",
            AlertType::LowTemperature => "low_temperature",
            AlertType::HighTemperature => "high_temperature",
            AlertType::LowSoilMoisture => "low_soil_moisture",
            AlertType::HighWind => "high_wind",
            AlertType::LowHumidity => "low_humidity",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(Severity::Critical),
            "warning" => Ok(Severity::Warning),
            "info" => Ok(Severity::Info),
            other => Err(format!("unknown severity '{}'", other)),
        }
    }
}

/// Notification derived from a reading crossing a threshold
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    /// Generation time
    pub timestamp: DateTime<Utc>,
    /// Measured value that triggered the alert
    pub value: f64,
    pub threshold: f64,
}

/// Alert tagged with the device it was raised for
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceAlert {
    pub device_id: String,
    #[serde(flatten)]
    pub alert: Alert,
}

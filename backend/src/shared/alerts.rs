//! Threshold alerts
//!
//! `evaluate` is pure: one reading in, zero or more alerts out. Missing
//! measurements take the documented defaults. `AlertHistory` keeps the
//! most recent alerts per device, oldest first.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::VecDeque;

use crate::domain::{Alert, AlertType, DeviceAlert, Reading, Severity};

/// Alerts retained per device
pub const ALERT_HISTORY_LIMIT: usize = 50;

pub const FROST_THRESHOLD_C: f64 = 0.0;
pub const LOW_TEMPERATURE_THRESHOLD_C: f64 = 5.0;
pub const HIGH_TEMPERATURE_THRESHOLD_C: f64 = 35.0;
pub const LOW_SOIL_MOISTURE_THRESHOLD_PCT: f64 = 30.0;
pub const HIGH_WIND_THRESHOLD_KMH: f64 = 40.0;
pub const LOW_HUMIDITY_THRESHOLD_PCT: f64 = 20.0;

/// Derive the alerts a reading raises, stamped with `now`.
///
/// Frost (at or below freezing) and low temperature are mutually exclusive;
/// every other condition is checked independently.
pub fn evaluate(reading: &Reading, now: DateTime<Utc>) -> Vec<Alert> {
    let temperature = reading.temperature_or_default();
    let soil_moisture = reading.soil_moisture_or_default();
    let wind_speed = reading.wind_speed_or_default();
    let humidity = reading.humidity_or_default();

    let alert = |alert_type, severity, message: String, value, threshold| Alert {
        alert_type,
        severity,
        message,
        timestamp: now,
        value,
        threshold,
    };

    let mut alerts = Vec::new();

    if temperature <= FROST_THRESHOLD_C {
        alerts.push(alert(
            AlertType::Frost,
            Severity::Critical,
            format!(
                "Frost warning! Temperature is {:.1}°C. Protect your crops immediately.",
                temperature
            ),
            temperature,
            FROST_THRESHOLD_C,
        ));
    } else if temperature < LOW_TEMPERATURE_THRESHOLD_C {
        alerts.push(alert(
            AlertType::LowTemperature,
            Severity::Warning,
            format!(
                "Low temperature alert: {:.1}°C. Monitor for frost risk.",
                temperature
            ),
            temperature,
            LOW_TEMPERATURE_THRESHOLD_C,
        ));
    }

    if temperature > HIGH_TEMPERATURE_THRESHOLD_C {
        alerts.push(alert(
            AlertType::HighTemperature,
            Severity::Warning,
            format!(
                "High temperature warning: {:.1}°C. Crops may experience heat stress.",
                temperature
            ),
            temperature,
            HIGH_TEMPERATURE_THRESHOLD_C,
        ));
    }

    if soil_moisture < LOW_SOIL_MOISTURE_THRESHOLD_PCT {
        alerts.push(alert(
            AlertType::LowSoilMoisture,
            Severity::Warning,
            format!(
                "Low soil moisture: {:.1}%. Irrigation recommended.",
                soil_moisture
            ),
            soil_moisture,
            LOW_SOIL_MOISTURE_THRESHOLD_PCT,
        ));
    }

    if wind_speed > HIGH_WIND_THRESHOLD_KMH {
        alerts.push(alert(
            AlertType::HighWind,
            Severity::Warning,
            format!(
                "High wind warning: {:.1} km/h. Potential crop damage risk.",
                wind_speed
            ),
            wind_speed,
            HIGH_WIND_THRESHOLD_KMH,
        ));
    }

    if humidity < LOW_HUMIDITY_THRESHOLD_PCT {
        alerts.push(alert(
            AlertType::LowHumidity,
            Severity::Info,
            format!("Low humidity: {:.1}%. Increased water loss risk.", humidity),
            humidity,
            LOW_HUMIDITY_THRESHOLD_PCT,
        ));
    }

    alerts
}

/// Bounded per-device alert log
#[derive(Debug)]
pub struct AlertHistory {
    entries: DashMap<String, VecDeque<Alert>>,
    capacity: usize,
}

impl Default for AlertHistory {
    fn default() -> Self {
        Self::with_capacity(ALERT_HISTORY_LIMIT)
    }
}

impl AlertHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    /// Append alerts for a device and drop the oldest beyond capacity.
    /// Both steps happen under the device's entry lock.
    pub fn append(&self, device_id: &str, alerts: Vec<Alert>) {
        if alerts.is_empty() {
            return;
        }

        let mut history = self.entries.entry(device_id.to_string()).or_default();
        history.extend(alerts);
        while history.len() > self.capacity {
            history.pop_front();
        }
    }

    /// The last `limit` alerts of a device (after severity filtering),
    /// oldest first
    pub fn recent(&self, device_id: &str, severity: Option<Severity>, limit: usize) -> Vec<Alert> {
        let Some(history) = self.entries.get(device_id) else {
            return Vec::new();
        };

        let matching: Vec<&Alert> = history
            .iter()
            .filter(|alert| severity.map_or(true, |s| alert.severity == s))
            .collect();

        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    /// Alerts across all devices, newest first, at most `limit`.
    ///
    /// Alerts sharing a timestamp come latest-appended first.
    pub fn all_recent(&self, limit: usize) -> Vec<DeviceAlert> {
        let mut all: Vec<(usize, DeviceAlert)> = self
            .entries
            .iter()
            .flat_map(|entry| {
                let device_id = entry.key().clone();
                entry
                    .value()
                    .iter()
                    .enumerate()
                    .map(|(index, alert)| {
                        (
                            index,
                            DeviceAlert {
                                device_id: device_id.clone(),
                                alert: alert.clone(),
                            },
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();

        all.sort_by(|(ia, a), (ib, b)| {
            b.alert
                .timestamp
                .cmp(&a.alert.timestamp)
                .then_with(|| ib.cmp(ia))
        });
        all.truncate(limit);
        all.into_iter().map(|(_, alert)| alert).collect()
    }

    pub fn len(&self, device_id: &str) -> usize {
        self.entries.get(device_id).map_or(0, |history| history.len())
    }
}

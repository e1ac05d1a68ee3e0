//! Test utilities for property-based testing
//!
//! Generators for device ids, ISO-8601 timestamps and complete readings,
//! plus helpers for building in-memory fixtures.

pub mod generators {
    use chrono::{DateTime, TimeZone, Utc};
    use proptest::prelude::*;

    use crate::domain::{Location, Reading};

    /// Generate a valid device id
    pub fn device_id() -> impl Strategy<Value = String> {
        prop::string::string_regex("[a-z0-9][a-z0-9_-]{0,31}").expect("Valid regex for device_id")
    }

    /// Generate an invalid device id
    pub fn invalid_device_id() -> impl Strategy<Value = String> {
        prop_oneof![
            // Empty
            Just("".to_string()),
            // Leading dot
            Just(".hidden".to_string()),
            // Path separator
            Just("field/north".to_string()),
            // Whitespace
            Just("device 1".to_string()),
            // Too long (>128 characters)
            prop::string::string_regex("[a-z]{129,160}").expect("Valid regex"),
        ]
    }

    /// Generate an instant between 2020-01-01 and 2030-12-31 (second precision)
    pub fn instant() -> impl Strategy<Value = DateTime<Utc>> {
        // 2020-01-01T00:00:00Z .. 2030-12-31T23:59:59Z
        (1_577_836_800i64..1_924_991_999i64)
            .prop_map(|secs| Utc.timestamp_opt(secs, 0).single().unwrap_or_default())
    }

    /// Generate an ISO-8601 timestamp in one of the formats producers emit
    pub fn timestamp() -> impl Strategy<Value = String> {
        (instant(), 0u8..3).prop_map(|(at, style)| match style {
            0 => at.to_rfc3339(),
            1 => at.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            _ => at.format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string(),
        })
    }

    /// Generate a reading with each measurement independently present or absent
    pub fn reading(device_id: &'static str) -> impl Strategy<Value = Reading> {
        (
            timestamp(),
            prop::option::of(-10.0..40.0f64),
            prop::option::of(20.0..100.0f64),
            prop::option::of(0.0..15.0f64),
            prop::option::of(0.0..100.0f64),
            prop::option::of(0.0..50.0f64),
        )
            .prop_map(
                move |(timestamp, temperature, humidity, rainfall, soil_moisture, wind_speed)| {
                    Reading {
                        device_id: device_id.to_string(),
                        timestamp,
                        location: Some(Location::default()),
                        temperature,
                        humidity,
                        rainfall,
                        soil_moisture,
                        wind_speed,
                    }
                },
            )
    }
}

pub mod helpers {
    use std::sync::Arc;

    use crate::domain::Reading;
    use crate::registry::{DeviceRegistry, InMemoryDeviceRegistry};
    use crate::store::{shard_path, ReadingStore};
    use crate::time::FixedClock;

    /// Fixed clock at the given RFC3339 instant
    pub fn clock_at(timestamp: &str) -> Arc<FixedClock> {
        Arc::new(FixedClock::from_rfc3339(timestamp).expect("Fixture clock needs an RFC3339 instant"))
    }

    pub fn memory_registry() -> Arc<dyn DeviceRegistry> {
        Arc::new(InMemoryDeviceRegistry::new())
    }

    /// Reading with every measurement set
    pub fn full_reading(
        device_id: &str,
        timestamp: &str,
        temperature: f64,
        humidity: f64,
        rainfall: f64,
        soil_moisture: f64,
        wind_speed: f64,
    ) -> Reading {
        let mut reading = Reading::new(device_id, timestamp);
        reading.temperature = Some(temperature);
        reading.humidity = Some(humidity);
        reading.rainfall = Some(rainfall);
        reading.soil_moisture = Some(soil_moisture);
        reading.wind_speed = Some(wind_speed);
        reading
    }

    /// Write each reading into its minute shard
    pub async fn store_readings(store: &ReadingStore, readings: &[Reading]) {
        for reading in readings {
            let at = reading
                .event_time()
                .expect("Fixture reading needs a parsable timestamp");
            store
                .append_reading(&shard_path(&reading.device_id, at), reading.clone())
                .await
                .expect("Failed to write fixture shard");
        }
    }
}

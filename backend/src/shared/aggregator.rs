//! Summary statistics over a device's readings.
//!
//! Each field is aggregated over the readings that carry it; a missing value
//! is skipped, never defaulted. An empty selection yields zero-valued stats.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{in_window, round2, Reading};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RainfallStats {
    pub total: f64,
    pub avg: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregateStats {
    pub temperature: FieldStats,
    pub humidity: FieldStats,
    pub rainfall: RainfallStats,
    /// Readings inside the window, whether or not they carry every field
    pub readings_count: usize,
}

/// Aggregate the readings inside `[from, to]`. Results are rounded to two
/// decimals.
pub fn aggregate(
    readings: &[Reading],
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> AggregateStats {
    let selected: Vec<&Reading> = readings
        .iter()
        .filter(|r| in_window(r, from, to))
        .collect();

    let temperatures: Vec<f64> = selected.iter().filter_map(|r| r.temperature).collect();
    let humidities: Vec<f64> = selected.iter().filter_map(|r| r.humidity).collect();
    let rainfalls: Vec<f64> = selected.iter().filter_map(|r| r.rainfall).collect();

    AggregateStats {
        temperature: field_stats(&temperatures),
        humidity: field_stats(&humidities),
        rainfall: rainfall_stats(&rainfalls),
        readings_count: selected.len(),
    }
}

fn field_stats(values: &[f64]) -> FieldStats {
    if values.is_empty() {
        return FieldStats::default();
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let avg = values.iter().sum::<f64>() / values.len() as f64;

    FieldStats {
        min: round2(min),
        max: round2(max),
        avg: round2(avg),
    }
}

fn rainfall_stats(values: &[f64]) -> RainfallStats {
    if values.is_empty() {
        return RainfallStats::default();
    }

    let total: f64 = values.iter().sum();
    RainfallStats {
        total: round2(total),
        avg: round2(total / values.len() as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::parse_timestamp;

    fn reading(ts: &str, temperature: f64, humidity: f64, rainfall: Option<f64>) -> Reading {
        let mut r = Reading::new("dev-1", ts);
        r.temperature = Some(temperature);
        r.humidity = Some(humidity);
        r.rainfall = rainfall;
        r
    }

    #[test]
    fn test_aggregate_basic_stats() {
        let readings = vec![
            reading("2024-01-15T10:00:00Z", 10.0, 60.0, Some(0.0)),
            reading("2024-01-15T11:00:00Z", 20.0, 50.0, Some(2.5)),
            reading("2024-01-15T12:00:00Z", 15.0, 40.0, Some(1.0)),
        ];

        let stats = aggregate(&readings, None, None);
        assert_eq!(stats.readings_count, 3);
        assert_eq!(stats.temperature, FieldStats { min: 10.0, max: 20.0, avg: 15.0 });
        assert_eq!(stats.humidity, FieldStats { min: 40.0, max: 60.0, avg: 50.0 });
        assert_eq!(stats.rainfall, RainfallStats { total: 3.5, avg: 1.17 });
    }

    #[test]
    fn test_missing_rainfall_is_skipped_not_defaulted() {
        let readings = vec![
            reading("2024-01-15T10:00:00Z", 10.0, 60.0, Some(4.0)),
            reading("2024-01-15T11:00:00Z", 20.0, 40.0, None),
        ];

        let stats = aggregate(&readings, None, None);
        assert_eq!(stats.rainfall, RainfallStats { total: 4.0, avg: 4.0 });
        assert_eq!(stats.temperature.avg, 15.0);
        assert_eq!(stats.humidity.avg, 50.0);
        assert_eq!(stats.readings_count, 2);
    }

    #[test]
    fn test_empty_selection_is_zero_valued() {
        assert_eq!(aggregate(&[], None, None), AggregateStats::default());

        let readings = vec![reading("2024-01-15T10:00:00Z", 10.0, 60.0, None)];
        let from = parse_timestamp("2024-02-01");
        let stats = aggregate(&readings, from, None);
        assert_eq!(stats.readings_count, 0);
        assert_eq!(stats.temperature, FieldStats::default());
    }

    #[test]
    fn test_window_is_inclusive() {
        let readings = vec![
            reading("2024-01-15T10:00:00Z", 10.0, 60.0, None),
            reading("2024-01-15T11:00:00Z", 20.0, 50.0, None),
            reading("2024-01-15T12:00:00Z", 30.0, 40.0, None),
        ];

        let stats = aggregate(
            &readings,
            parse_timestamp("2024-01-15T10:00:00Z"),
            parse_timestamp("2024-01-15T11:00:00Z"),
        );
        assert_eq!(stats.readings_count, 2);
        assert_eq!(stats.temperature.max, 20.0);
    }

    #[test]
    fn test_negative_values() {
        let readings = vec![
            reading("2024-01-15T10:00:00Z", -5.25, 90.0, None),
            reading("2024-01-15T11:00:00Z", -1.0, 80.0, None),
        ];
        let stats = aggregate(&readings, None, None);
        assert_eq!(stats.temperature.min, -5.25);
        assert_eq!(stats.temperature.max, -1.0);
        assert_eq!(stats.temperature.avg, -3.13);
    }
}

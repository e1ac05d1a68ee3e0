//! Property Test: Alert History Retention
//!
//! This property test verifies that:
//! - A device's history never holds more than 50 alerts
//! - The retained alerts are the most recently appended ones, in order
//! - Limited queries return the newest alerts, oldest first

use agriweather_backend::test_utils::generators;
use agriweather_backend::{
    evaluate, Alert, AlertHistory, AlertType, Severity, ALERT_HISTORY_LIMIT,
};
use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

fn alert(seq: usize) -> Alert {
    let base = Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap();
    Alert {
        alert_type: AlertType::LowHumidity,
        severity: if seq % 3 == 0 { Severity::Warning } else { Severity::Info },
        message: format!("alert {}", seq),
        timestamp: base + Duration::seconds(seq as i64),
        value: seq as f64,
        threshold: 20.0,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: history is truncated to the newest 50 alerts
    #[test]
    fn prop_history_is_bounded(batches in prop::collection::vec(0usize..12, 1..30)) {
        let history = AlertHistory::new();
        let mut seq = 0;

        for size in batches {
            let batch: Vec<Alert> = (seq..seq + size).map(alert).collect();
            seq += size;
            history.append("dev-1", batch);
            prop_assert!(history.len("dev-1") <= ALERT_HISTORY_LIMIT);
        }

        let retained = history.recent("dev-1", None, usize::MAX);
        let expected_start = seq.saturating_sub(ALERT_HISTORY_LIMIT);
        let expected: Vec<f64> = (expected_start..seq).map(|s| s as f64).collect();
        let actual: Vec<f64> = retained.iter().map(|a| a.value).collect();
        prop_assert_eq!(actual, expected);
    }

    /// Property: a limited query returns the newest alerts oldest first
    #[test]
    fn prop_recent_returns_tail(total in 0usize..80, limit in 1usize..60) {
        let history = AlertHistory::new();
        history.append("dev-1", (0..total).map(alert).collect());

        let recent = history.recent("dev-1", None, limit);
        let kept = total.min(ALERT_HISTORY_LIMIT);
        prop_assert_eq!(recent.len(), kept.min(limit));

        for pair in recent.windows(2) {
            prop_assert!(pair[0].timestamp < pair[1].timestamp);
        }
        if let Some(last) = recent.last() {
            prop_assert_eq!(last.value, (total - 1) as f64);
        }
    }

    /// Property: severity filtering only returns matching alerts
    #[test]
    fn prop_severity_filter(total in 0usize..50) {
        let history = AlertHistory::new();
        history.append("dev-1", (0..total).map(alert).collect());

        let warnings = history.recent("dev-1", Some(Severity::Warning), usize::MAX);
        prop_assert!(warnings.iter().all(|a| a.severity == Severity::Warning));
        prop_assert_eq!(warnings.len(), (0..total).filter(|s| s % 3 == 0).count());
    }

    /// Property: at most one temperature alert is raised per reading
    #[test]
    fn prop_temperature_alerts_exclusive(reading in generators::reading("dev-1")) {
        let alerts = evaluate(&reading, Utc::now());
        let temperature_alerts = alerts
            .iter()
            .filter(|a| matches!(
                a.alert_type,
                AlertType::Frost | AlertType::LowTemperature | AlertType::HighTemperature
            ))
            .count();
        prop_assert!(temperature_alerts <= 1);

        let frost = alerts.iter().any(|a| a.alert_type == AlertType::Frost);
        prop_assert_eq!(frost, reading.temperature_or_default() <= 0.0);
    }
}

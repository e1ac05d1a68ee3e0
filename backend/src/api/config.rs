use std::time::Duration;

use crate::cors::DEFAULT_ALLOWED_ORIGIN;
use crate::store_config::{non_empty, parse_or, ConfigError, StoreConfig};

pub const DEFAULT_POLLING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_SEED_DEVICE: &str = "agriweather-device-001";

/// Configuration for the weather API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
    pub store: StoreConfig,
    /// Period between poll ticks
    pub polling_interval: Duration,
    /// DynamoDB devices table; in-memory registry when unset
    pub devices_table: Option<String>,
    /// Devices registered at start-up if missing
    pub seed_devices: Vec<String>,
    pub cors_allowed_origin: String,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store = StoreConfig::from_lookup(&lookup)?;

        let polling_secs: u64 = parse_or(
            "POLLING_INTERVAL",
            lookup("POLLING_INTERVAL"),
            DEFAULT_POLLING_INTERVAL_SECS,
        )?;
        if polling_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "POLLING_INTERVAL".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let seed_devices = match lookup("SEED_DEVICES") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect(),
            None => vec![DEFAULT_SEED_DEVICE.to_string()],
        };

        Ok(Self {
            store,
            polling_interval: Duration::from_secs(polling_secs),
            devices_table: non_empty(lookup("DEVICES_TABLE")),
            seed_devices,
            cors_allowed_origin: non_empty(lookup("CORS_ALLOWED_ORIGIN"))
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.polling_interval, Duration::from_secs(30));
        assert_eq!(config.devices_table, None);
        assert_eq!(config.seed_devices, vec!["agriweather-device-001"]);
        assert_eq!(config.store.backend, None);
        assert_eq!(config.cors_allowed_origin, "*");
    }

    #[test]
    fn test_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("POLLING_INTERVAL", "5"),
            ("DEVICES_TABLE", "weather-devices"),
            ("SEED_DEVICES", "north, south,,east "),
            ("DATA_DIR", "/var/lib/weather"),
        ]))
        .unwrap();

        assert_eq!(config.polling_interval, Duration::from_secs(5));
        assert_eq!(config.devices_table.as_deref(), Some("weather-devices"));
        assert_eq!(config.seed_devices, vec!["north", "south", "east"]);
        assert_eq!(config.store.backend.unwrap().kind(), "local");
    }

    #[test]
    fn test_empty_seed_list() {
        let config = ApiConfig::from_lookup(lookup(&[("SEED_DEVICES", "")])).unwrap();
        assert!(config.seed_devices.is_empty());
    }

    #[test]
    fn test_invalid_polling_interval() {
        for value in ["0", "fast", "-5"] {
            let err = ApiConfig::from_lookup(lookup(&[("POLLING_INTERVAL", value)])).unwrap_err();
            assert!(err.to_string().contains("POLLING_INTERVAL"), "{}", value);
        }
    }
}

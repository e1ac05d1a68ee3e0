use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use agriweather_backend::{ReadingStore, StoreBackend, StoreError, DEFAULT_STORE_TIMEOUT};

pub const DEFAULT_CONTAINER_NAME: &str = "weather-data";

/// Blob store settings shared by the API and the simulator
#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// `None` when no credentials are configured
    pub backend: Option<StoreBackend>,
    pub timeout: Duration,
}

impl StoreConfig {
    /// Read store settings from environment variables.
    ///
    /// Precedence: Azure account credentials, then `S3_BUCKET`, then
    /// `DATA_DIR`. Missing credentials leave the store unconfigured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let container = non_empty(lookup("CONTAINER_NAME"))
            .unwrap_or_else(|| DEFAULT_CONTAINER_NAME.to_string());
        let timeout_secs: u64 = parse_or("STORE_TIMEOUT_SECS", lookup("STORE_TIMEOUT_SECS"), DEFAULT_STORE_TIMEOUT.as_secs())?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                var: "STORE_TIMEOUT_SECS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let azure = (
            non_empty(lookup("STORAGE_ACCOUNT_NAME")),
            non_empty(lookup("STORAGE_ACCOUNT_KEY")),
        );

        let backend = if let (Some(account), Some(access_key)) = azure {
            Some(StoreBackend::Azure {
                account,
                access_key,
                container,
            })
        } else if let Some(bucket) = non_empty(lookup("S3_BUCKET")) {
            Some(StoreBackend::S3 { bucket })
        } else {
            non_empty(lookup("DATA_DIR")).map(|dir| StoreBackend::Local {
                root: PathBuf::from(dir),
            })
        };

        Ok(Self {
            backend,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Connect to the configured backend, `None` when unconfigured
    pub fn connect(&self) -> Result<Option<ReadingStore>, ConfigError> {
        self.backend
            .as_ref()
            .map(|backend| ReadingStore::connect(backend, self.timeout))
            .transpose()
            .map_err(ConfigError::Store)
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },

    #[error("Store configuration error: {0}")]
    Store(#[from] StoreError),
}

pub fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional variable, falling back to `default` when unset
pub fn parse_or<T>(var: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(value) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            var: var.to_string(),
            reason: format!("'{}': {}", raw, e),
        }),
    }
}

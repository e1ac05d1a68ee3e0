//! Weather service facade
//!
//! Owns the process-wide state (registry, latest-state cache, alert history,
//! poller) and implements every read operation the request layer exposes.
//! Errors are reported with the `ServiceError` taxonomy so callers can tell
//! an unreachable store from a missing device or an empty history.

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::aggregator::{aggregate, AggregateStats};
use crate::domain::{
    in_window, latest_of, sort_by_time, ConnectivityStatus, DeviceAlert, DeviceDetails,
    DeviceRecord, DeviceStatusReport, Location, Reading, Severity, Alert,
};
use crate::irrigation::{recommend, IrrigationRecommendation, DEFAULT_CROP_TYPE};
use crate::monitor::DeviceMonitor;
use crate::poller::Poller;
use crate::registry::{DeviceRegistry, RegistryError};
use crate::store::{ReadingStore, StoreError};
use crate::time::Clock;
use crate::validators::{
    parse_time_bound, validate_coordinates, validate_device_id, validate_device_name,
    validate_limit, ValidationError,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_ALERT_LIMIT: usize = 20;
pub const DEFAULT_ALL_ALERTS_LIMIT: usize = 50;
pub const DEFAULT_PERIOD: &str = "day";

/// A device is online while its latest reading is younger than this
pub const ONLINE_WINDOW_MINUTES: i64 = 60;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Reading store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    NoData(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        if err.is_unavailable() {
            ServiceError::StoreUnavailable(err.to_string())
        } else {
            match err {
                StoreError::NotFound(name) => ServiceError::NotFound(format!("Shard not found: {}", name)),
                other => ServiceError::Store(other),
            }
        }
    }
}

/// Registration payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterDeviceRequest {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct AggregateQuery {
    pub period: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HistoryReport {
    pub device_id: String,
    pub readings: Vec<Reading>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AggregatedReport {
    pub device_id: String,
    pub period: String,
    #[serde(flatten)]
    pub stats: AggregateStats,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IrrigationReport {
    pub device_id: String,
    #[serde(flatten)]
    pub recommendation: IrrigationRecommendation,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceAlertsReport {
    pub device_id: String,
    pub alerts: Vec<Alert>,
    pub count: usize,
    pub has_critical: bool,
    pub has_warnings: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AllAlertsReport {
    pub alerts: Vec<DeviceAlert>,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: String,
    pub storage_connected: bool,
    pub registry_backend: String,
    pub polling_active: bool,
}

pub struct WeatherService {
    store: Option<ReadingStore>,
    registry: Arc<dyn DeviceRegistry>,
    monitor: Arc<DeviceMonitor>,
    poller: Poller,
}

impl WeatherService {
    /// Build the service; the poller is created but not started
    pub fn new(
        store: Option<ReadingStore>,
        registry: Arc<dyn DeviceRegistry>,
        clock: Arc<dyn Clock>,
        polling_interval: Duration,
    ) -> Self {
        let monitor = Arc::new(DeviceMonitor::new(clock));
        let poller = Poller::new(
            store.clone(),
            Arc::clone(&registry),
            Arc::clone(&monitor),
            polling_interval,
        );
        Self {
            store,
            registry,
            monitor,
            poller,
        }
    }

    pub fn poller(&self) -> &Poller {
        &self.poller
    }

    pub fn monitor(&self) -> &DeviceMonitor {
        &self.monitor
    }

    fn store(&self) -> Result<&ReadingStore, ServiceError> {
        self.store
            .as_ref()
            .ok_or_else(|| ServiceError::StoreUnavailable("Storage not configured".to_string()))
    }

    async fn require_device(&self, device_id: &str) -> Result<DeviceRecord, ServiceError> {
        self.registry
            .get_device(device_id)
            .await?
            .ok_or_else(|| ServiceError::DeviceNotFound(device_id.to_string()))
    }

    // ------------------------------------------------------------------
    // Devices
    // ------------------------------------------------------------------

    /// Validate and upsert a device record
    pub async fn register_device(
        &self,
        request: RegisterDeviceRequest,
    ) -> Result<DeviceRecord, ServiceError> {
        let device_id = request.device_id.unwrap_or_default();
        validate_device_id(&device_id)?;

        let name = match request.name {
            Some(name) => {
                validate_device_name(&name)?;
                name
            }
            None => format!("Device {}", device_id),
        };

        let location = request.location.unwrap_or_default();
        validate_coordinates(location.latitude, location.longitude)?;

        let record = DeviceRecord {
            device_id,
            name,
            location,
            registered_at: self.monitor.clock().now_rfc3339(),
            status: "online".to_string(),
        };

        self.registry.put_device(record.clone()).await?;
        info!(device_id = %record.device_id, "Device registered");
        Ok(record)
    }

    /// Register each id that is not yet known. Returns how many were added.
    pub async fn seed_devices(&self, device_ids: &[String]) -> Result<usize, ServiceError> {
        let mut added = 0;
        for device_id in device_ids {
            if self.registry.get_device(device_id).await?.is_some() {
                continue;
            }
            self.register_device(RegisterDeviceRequest {
                device_id: Some(device_id.clone()),
                ..RegisterDeviceRequest::default()
            })
            .await?;
            added += 1;
        }
        Ok(added)
    }

    pub async fn list_devices(&self) -> Result<Vec<DeviceRecord>, ServiceError> {
        Ok(self.registry.list_devices().await?)
    }

    /// Device record plus the timestamp of its cached reading
    pub async fn get_device(&self, device_id: &str) -> Result<DeviceDetails, ServiceError> {
        let device = self.require_device(device_id).await?;
        Ok(DeviceDetails {
            device,
            last_reading: self.monitor.cache().last_seen(device_id),
        })
    }

    // ------------------------------------------------------------------
    // Readings
    // ------------------------------------------------------------------

    /// Latest reading of a device.
    ///
    /// A cache miss reads the most recently modified shard and offers its
    /// newest reading to the monitor, exactly as a poll tick would.
    pub async fn get_current(&self, device_id: &str) -> Result<Reading, ServiceError> {
        if let Some(reading) = self.monitor.cache().get(device_id) {
            return Ok(reading);
        }

        let store = self.store()?;
        let shards = store.list_shards(device_id, None).await?;
        let newest = shards
            .iter()
            .max_by(|a, b| {
                a.last_modified
                    .cmp(&b.last_modified)
                    .then_with(|| a.name.cmp(&b.name))
            })
            .ok_or_else(|| ServiceError::NotFound(format!("No data found for device {}", device_id)))?;

        let raw = store.read_shard(newest).await?;
        let readings = crate::parser::parse_shard(&raw).unwrap_or_else(|e| {
            warn!(device_id = %device_id, shard = %newest.name, error = %e, "Newest shard unreadable");
            Vec::new()
        });

        let latest = latest_of(readings)
            .ok_or_else(|| ServiceError::NotFound(format!("No readings found for device {}", device_id)))?;

        debug!(device_id = %device_id, timestamp = %latest.timestamp, "Fetched current reading on cache miss");
        self.monitor.observe(device_id, latest.clone());

        // A concurrent poll may have stored something newer meanwhile
        Ok(self.monitor.cache().get(device_id).unwrap_or(latest))
    }

    /// The most recent `limit` readings inside the window, oldest first
    pub async fn get_history(
        &self,
        device_id: &str,
        query: HistoryQuery,
    ) -> Result<HistoryReport, ServiceError> {
        let limit = validate_limit(query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT))?;
        let from = parse_time_bound("from", query.from.as_deref())?;
        let to = parse_time_bound("to", query.to.as_deref())?;
        let store = self.store()?;

        // Narrow the listing only when the whole window sits in one day
        let day = match (from, to) {
            (Some(f), Some(t)) if f.date_naive() == t.date_naive() => Some(f.date_naive()),
            _ => None,
        };

        let scan = store.scan_device(device_id, day).await?;
        let mut readings: Vec<Reading> = scan
            .readings
            .into_iter()
            .filter(|r| in_window(r, from, to))
            .collect();
        sort_by_time(&mut readings);

        let skip = readings.len().saturating_sub(limit);
        let readings: Vec<Reading> = readings.into_iter().skip(skip).collect();

        Ok(HistoryReport {
            device_id: device_id.to_string(),
            count: readings.len(),
            readings,
        })
    }

    /// Summary statistics over the device's readings.
    /// `NoData` only when the device has no shards at all.
    pub async fn get_aggregated(
        &self,
        device_id: &str,
        query: AggregateQuery,
    ) -> Result<AggregatedReport, ServiceError> {
        let from = parse_time_bound("from", query.from.as_deref())?;
        let to = parse_time_bound("to", query.to.as_deref())?;
        let store = self.store()?;

        let scan = store.scan_device(device_id, None).await?;
        if scan.shard_count == 0 {
            return Err(ServiceError::NoData(format!(
                "No data found for device {}",
                device_id
            )));
        }

        Ok(AggregatedReport {
            device_id: device_id.to_string(),
            period: query.period.unwrap_or_else(|| DEFAULT_PERIOD.to_string()),
            stats: aggregate(&scan.readings, from, to),
        })
    }

    /// Irrigation advice from the device's latest reading
    pub async fn get_irrigation(
        &self,
        device_id: &str,
        crop_type: Option<&str>,
    ) -> Result<IrrigationReport, ServiceError> {
        let current = self.get_current(device_id).await?;
        let recommendation = recommend(&current, crop_type.unwrap_or(DEFAULT_CROP_TYPE));

        Ok(IrrigationReport {
            device_id: device_id.to_string(),
            recommendation,
            timestamp: self.monitor.clock().now_rfc3339(),
        })
    }

    /// Connectivity derived from the age of the cached reading
    pub async fn get_device_status(
        &self,
        device_id: &str,
    ) -> Result<DeviceStatusReport, ServiceError> {
        let device = self.require_device(device_id).await?;
        let last_seen = self.monitor.cache().last_seen(device_id);

        let status = match last_seen.as_deref().and_then(crate::time::parse_timestamp) {
            Some(last) => {
                let age = self.monitor.clock().now() - last;
                if age < ChronoDuration::minutes(ONLINE_WINDOW_MINUTES) {
                    ConnectivityStatus::Online
                } else {
                    ConnectivityStatus::Offline
                }
            }
            None => ConnectivityStatus::Unknown,
        };

        Ok(DeviceStatusReport {
            device_id: device_id.to_string(),
            status,
            last_seen,
            registered: device.registered_at,
        })
    }

    // ------------------------------------------------------------------
    // Alerts
    // ------------------------------------------------------------------

    /// Most recent alerts of a device, newest last
    pub async fn get_alerts(
        &self,
        device_id: &str,
        severity: Option<Severity>,
        limit: Option<usize>,
    ) -> Result<DeviceAlertsReport, ServiceError> {
        self.require_device(device_id).await?;
        let limit = validate_limit(limit.unwrap_or(DEFAULT_ALERT_LIMIT))?;

        let alerts = self.monitor.alerts().recent(device_id, severity, limit);
        Ok(DeviceAlertsReport {
            device_id: device_id.to_string(),
            count: alerts.len(),
            has_critical: alerts.iter().any(|a| a.severity == Severity::Critical),
            has_warnings: alerts.iter().any(|a| a.severity == Severity::Warning),
            alerts,
        })
    }

    /// Alerts across all devices, newest first
    pub fn get_all_alerts(&self, limit: Option<usize>) -> Result<AllAlertsReport, ServiceError> {
        let limit = validate_limit(limit.unwrap_or(DEFAULT_ALL_ALERTS_LIMIT))?;
        let alerts = self.monitor.alerts().all_recent(limit);
        Ok(AllAlertsReport {
            count: alerts.len(),
            alerts,
        })
    }

    pub fn health(&self) -> HealthReport {
        HealthReport {
            status: "healthy".to_string(),
            timestamp: self.monitor.clock().now_rfc3339(),
            storage_connected: self.store.is_some(),
            registry_backend: self.registry.backend_name().to_string(),
            polling_active: self.poller.is_running(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::InMemoryDeviceRegistry;
    use crate::time::FixedClock;

    fn service(store: Option<ReadingStore>) -> WeatherService {
        WeatherService::new(
            store,
            Arc::new(InMemoryDeviceRegistry::new()),
            Arc::new(FixedClock::from_rfc3339("2024-01-15T12:00:00Z").unwrap()),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn test_register_defaults() {
        let service = service(None);
        let record = service
            .register_device(RegisterDeviceRequest {
                device_id: Some("dev-1".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(record.name, "Device dev-1");
        assert_eq!(record.location, Location::default());
        assert_eq!(record.status, "online");
        assert_eq!(record.registered_at, "2024-01-15T12:00:00+00:00");
    }

    #[tokio::test]
    async fn test_register_requires_device_id() {
        let service = service(None);
        let result = service.register_device(RegisterDeviceRequest::default()).await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
        assert!(service.list_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_unavailable_is_distinct() {
        let service = service(None);
        assert!(matches!(
            service.get_current("dev-1").await,
            Err(ServiceError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.get_history("dev-1", HistoryQuery::default()).await,
            Err(ServiceError::StoreUnavailable(_))
        ));
        assert!(matches!(
            service.get_aggregated("dev-1", AggregateQuery::default()).await,
            Err(ServiceError::StoreUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_history_validates_before_touching_store() {
        let service = service(None);
        let result = service
            .get_history(
                "dev-1",
                HistoryQuery {
                    limit: Some(0),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn test_health() {
        let service = service(Some(ReadingStore::in_memory()));
        let health = service.health();
        assert_eq!(health.status, "healthy");
        assert!(health.storage_connected);
        assert_eq!(health.registry_backend, "memory");
        assert!(!health.polling_active);
    }

    #[tokio::test]
    async fn test_seed_devices_skips_known() {
        let service = service(None);
        let ids = vec!["dev-1".to_string(), "dev-2".to_string()];
        assert_eq!(service.seed_devices(&ids).await.unwrap(), 2);
        assert_eq!(service.seed_devices(&ids).await.unwrap(), 0);
        assert_eq!(service.list_devices().await.unwrap().len(), 2);
    }
}

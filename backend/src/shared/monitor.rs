use dashmap::DashMap;
use std::sync::Arc;
use tracing::{info, warn};

use crate::alerts::{evaluate, AlertHistory};
use crate::cache::LatestStateCache;
use crate::domain::{Alert, Reading, Severity};
use crate::time::Clock;

/// Latest-state cache plus alert history, updated together.
///
/// Both the poller and on-demand fetches feed readings through `observe`,
/// so alerts are evaluated once per reading that actually advances the
/// cache. Observations of one device are serialized, so its alert history
/// follows reading order.
pub struct DeviceMonitor {
    cache: LatestStateCache,
    alerts: AlertHistory,
    clock: Arc<dyn Clock>,
    observing: DashMap<String, ()>,
}

impl DeviceMonitor {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            cache: LatestStateCache::new(),
            alerts: AlertHistory::new(),
            clock,
            observing: DashMap::new(),
        }
    }

    pub fn cache(&self) -> &LatestStateCache {
        &self.cache
    }

    pub fn alerts(&self) -> &AlertHistory {
        &self.alerts
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Offer a reading for a device. Returns the alerts raised when the
    /// reading was newer than the cached one, `None` when it was stale.
    pub fn observe(&self, device_id: &str, reading: Reading) -> Option<Vec<Alert>> {
        // Held until the alerts are appended
        let _device = self.observing.entry(device_id.to_string()).or_default();

        if !self.cache.update_if_newer(device_id, reading.clone()) {
            return None;
        }

        let raised = evaluate(&reading, self.clock.now());
        for alert in &raised {
            match alert.severity {
                Severity::Critical => warn!(
                    device_id = %device_id,
                    alert_type = alert.alert_type.as_str(),
                    value = alert.value,
                    "{}",
                    alert.message
                ),
                _ => info!(
                    device_id = %device_id,
                    alert_type = alert.alert_type.as_str(),
                    severity = %alert.severity,
                    value = alert.value,
                    "{}",
                    alert.message
                ),
            }
        }
        self.alerts.append(device_id, raised.clone());
        Some(raised)
    }
}

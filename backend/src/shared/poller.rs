//! Background poller
//!
//! Each tick scans every registered device: all shards are listed, read and
//! parsed, the readings sorted by time and the newest one offered to the
//! monitor. Failures are isolated per device and logged; a tick never
//! aborts early and the loop never exits on error. Shutdown is only
//! observed between ticks.

use futures::stream::{self, StreamExt};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::domain::{sort_by_time, Reading};
use crate::monitor::DeviceMonitor;
use crate::registry::DeviceRegistry;
use crate::store::{ReadingStore, StoreError};

/// Default period between ticks
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(30);

/// Devices scanned concurrently within a tick
const DEVICE_CONCURRENCY: usize = 8;

/// Why a device produced no reading in a tick
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("No shards found")]
    NoShards,

    #[error("No readable readings in {shards} shard(s)")]
    NoReadings { shards: usize },
}

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub devices: usize,
    /// Devices whose cached reading advanced
    pub updated: usize,
    /// Devices scanned without a newer reading (including no data)
    pub unchanged: usize,
    /// Devices whose scan hit a store failure
    pub failed: usize,
}

struct PollerTask {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

struct PollerShared {
    store: Option<ReadingStore>,
    registry: Arc<dyn DeviceRegistry>,
    monitor: Arc<DeviceMonitor>,
    interval: Duration,
}

/// Supervised periodic scan of all devices
pub struct Poller {
    shared: Arc<PollerShared>,
    task: Mutex<Option<PollerTask>>,
}

impl Poller {
    pub fn new(
        store: Option<ReadingStore>,
        registry: Arc<dyn DeviceRegistry>,
        monitor: Arc<DeviceMonitor>,
        interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(PollerShared {
                store,
                registry,
                monitor,
                interval,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.shared.interval
    }

    /// Spawn the polling loop. Returns `false` if it is already running.
    ///
    /// The first tick runs immediately; later ticks start a full interval
    /// after the previous one finished.
    pub fn start(&self) -> bool {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            return false;
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let shared = Arc::clone(&self.shared);

        let handle = tokio::spawn(async move {
            info!(
                interval_secs = shared.interval.as_secs(),
                "Poller started"
            );
            loop {
                shared.tick().await;

                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = tokio::time::sleep(shared.interval) => {}
                }
            }
            info!("Poller stopped");
        });

        *task = Some(PollerTask {
            shutdown: shutdown_tx,
            handle,
        });
        true
    }

    /// Signal the loop to stop and wait for it. A tick in progress is
    /// allowed to finish. Returns `false` if the poller was not running.
    pub async fn stop(&self) -> bool {
        let task = self.lock_task().take();
        let Some(task) = task else {
            return false;
        };

        // The loop may already have exited; a closed channel is fine
        let _ = task.shutdown.send(());
        if let Err(e) = task.handle.await {
            error!(error = %e, "Poller task ended abnormally");
        }
        true
    }

    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    /// Run one scan of all devices now
    pub async fn tick(&self) -> TickReport {
        self.shared.tick().await
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<PollerTask>> {
        self.task.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PollerShared {
    async fn tick(&self) -> TickReport {
        let Some(store) = self.store.as_ref() else {
            warn!("Reading store not configured, skipping tick");
            return TickReport::default();
        };

        let device_ids = match self.registry.list_device_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                warn!(error = %e, "Failed to enumerate devices, skipping tick");
                return TickReport::default();
            }
        };

        let outcomes: Vec<(String, Result<Reading, ScanError>)> = stream::iter(device_ids)
            .map(|device_id| async move {
                let outcome = latest_reading(store, &device_id).await;
                (device_id, outcome)
            })
            .buffer_unordered(DEVICE_CONCURRENCY)
            .collect()
            .await;

        let mut report = TickReport {
            devices: outcomes.len(),
            ..TickReport::default()
        };

        for (device_id, outcome) in outcomes {
            match outcome {
                Ok(reading) => {
                    if self.monitor.observe(&device_id, reading).is_some() {
                        report.updated += 1;
                    } else {
                        report.unchanged += 1;
                    }
                }
                Err(ScanError::Store(e)) => {
                    warn!(device_id = %device_id, error = %e, "Failed to scan device");
                    report.failed += 1;
                }
                Err(e) => {
                    debug!(device_id = %device_id, reason = %e, "No reading for device");
                    report.unchanged += 1;
                }
            }
        }

        info!(
            devices = report.devices,
            updated = report.updated,
            unchanged = report.unchanged,
            failed = report.failed,
            "Poll tick complete"
        );
        report
    }
}

/// Newest reading across every shard of a device.
/// The full set is sorted by time so the winner never depends on listing
/// or read completion order.
pub async fn latest_reading(store: &ReadingStore, device_id: &str) -> Result<Reading, ScanError> {
    let scan = store.scan_device(device_id, None).await?;
    if scan.shard_count == 0 {
        return Err(ScanError::NoShards);
    }

    let mut readings = scan.readings;
    sort_by_time(&mut readings);
    readings.pop().ok_or(ScanError::NoReadings {
        shards: scan.shard_count,
    })
}

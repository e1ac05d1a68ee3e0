//! Device registry contract
//!
//! The poller enumerates ids from here and the registration endpoint
//! upserts into it. Re-registering an id overwrites the record; there is no
//! delete.

use async_trait::async_trait;
use dashmap::DashMap;
use thiserror::Error;

use crate::domain::DeviceRecord;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Short label for health reporting
    fn backend_name(&self) -> &'static str;

    async fn list_device_ids(&self) -> Result<Vec<String>, RegistryError>;

    /// All records, sorted by device id
    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, RegistryError>;

    async fn get_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, RegistryError>;

    /// Insert or overwrite a record
    async fn put_device(&self, device: DeviceRecord) -> Result<(), RegistryError>;
}

/// Process-local registry
#[derive(Debug, Default)]
pub struct InMemoryDeviceRegistry {
    devices: DashMap<String, DeviceRecord>,
}

impl InMemoryDeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DeviceRegistry for InMemoryDeviceRegistry {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn list_device_ids(&self) -> Result<Vec<String>, RegistryError> {
        let mut ids: Vec<String> = self.devices.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }

    async fn list_devices(&self) -> Result<Vec<DeviceRecord>, RegistryError> {
        let mut devices: Vec<DeviceRecord> =
            self.devices.iter().map(|e| e.value().clone()).collect();
        devices.sort_by(|a, b| a.device_id.cmp(&b.device_id));
        Ok(devices)
    }

    async fn get_device(&self, device_id: &str) -> Result<Option<DeviceRecord>, RegistryError> {
        Ok(self.devices.get(device_id).map(|e| e.value().clone()))
    }

    async fn put_device(&self, device: DeviceRecord) -> Result<(), RegistryError> {
        self.devices.insert(device.device_id.clone(), device);
        Ok(())
    }
}

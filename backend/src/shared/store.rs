//! Reading store adapter
//!
//! Uniform access to the time-partitioned shards held in blob storage.
//! Shard keys follow the hub routing layout
//! `{device_id}/{partition}/{YYYY}/{MM}/{DD}/{HH}/{mm}`.
//! Every call is bounded by the configured timeout.

use chrono::{DateTime, NaiveDate, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use object_store::azure::MicrosoftAzureBuilder;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ClientOptions, ObjectMeta, ObjectStore, PutMode, PutOptions, PutPayload};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::domain::Reading;
use crate::parser::{encode_shard, parse_shard};

/// Partition segment written by producers
pub const DEFAULT_PARTITION: &str = "0";

/// Default bound applied to each store call
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum shard reads in flight during one device scan
pub const SHARD_CONCURRENCY: usize = 16;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Reading store is not configured")]
    Unavailable,

    #[error("Store {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Shard not found: {0}")]
    NotFound(String),

    #[error("Shard already exists: {0}")]
    AlreadyExists(String),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Failed to encode shard: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether the error means the store could not be reached at all
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable | StoreError::Timeout { .. } | StoreError::Backend(_)
        )
    }
}

impl From<object_store::Error> for StoreError {
    fn from(err: object_store::Error) -> Self {
        match err {
            object_store::Error::NotFound { path, .. } => StoreError::NotFound(path),
            object_store::Error::AlreadyExists { path, .. } => StoreError::AlreadyExists(path),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// A listed shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardHandle {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub size: usize,
}

impl From<ObjectMeta> for ShardHandle {
    fn from(meta: ObjectMeta) -> Self {
        Self {
            name: meta.location.to_string(),
            last_modified: meta.last_modified,
            size: meta.size,
        }
    }
}

/// Readings gathered from every shard of a device
#[derive(Debug, Clone, Default)]
pub struct DeviceScan {
    /// Shards listed, including those that failed to parse
    pub shard_count: usize,
    /// Shards dropped because they were unreadable or vanished
    pub skipped: usize,
    /// Readings in shard order, not sorted
    pub readings: Vec<Reading>,
}

/// Where shards live
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Azure {
        account: String,
        access_key: String,
        container: String,
    },
    S3 {
        bucket: String,
    },
    Local {
        root: std::path::PathBuf,
    },
    Memory,
}

impl StoreBackend {
    pub fn kind(&self) -> &'static str {
        match self {
            StoreBackend::Azure { .. } => "azure",
            StoreBackend::S3 { .. } => "s3",
            StoreBackend::Local { .. } => "local",
            StoreBackend::Memory => "memory",
        }
    }
}

/// Shard key for the minute containing `at`
pub fn shard_path(device_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}",
        device_id,
        DEFAULT_PARTITION,
        at.format("%Y/%m/%d/%H/%M")
    )
}

/// Shard key for the hour containing `at` (minute segment fixed to `00`)
pub fn hourly_shard_path(device_id: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}/{}/00",
        device_id,
        DEFAULT_PARTITION,
        at.format("%Y/%m/%d/%H")
    )
}

/// Listing prefix covering one calendar day of a device
pub fn day_prefix(device_id: &str, date: NaiveDate) -> String {
    format!(
        "{}/{}/{}",
        device_id,
        DEFAULT_PARTITION,
        date.format("%Y/%m/%d")
    )
}

/// Handle to the blob store holding reading shards
#[derive(Debug, Clone)]
pub struct ReadingStore {
    inner: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl ReadingStore {
    pub fn new(inner: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    /// Process-local store, used for tests and local runs
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemory::new()), DEFAULT_STORE_TIMEOUT)
    }

    /// Build a store client for the given backend.
    ///
    /// Construction does not touch the network; an unreachable backend
    /// surfaces later as `Backend`/`Timeout` errors on individual calls.
    pub fn connect(backend: &StoreBackend, timeout: Duration) -> Result<Self, StoreError> {
        let client_options = ClientOptions::new().with_timeout(timeout);

        let inner: Arc<dyn ObjectStore> = match backend {
            StoreBackend::Azure {
                account,
                access_key,
                container,
            } => Arc::new(
                MicrosoftAzureBuilder::new()
                    .with_account(account)
                    .with_access_key(access_key)
                    .with_container_name(container)
                    .with_client_options(client_options)
                    .build()?,
            ),
            StoreBackend::S3 { bucket } => Arc::new(
                AmazonS3Builder::from_env()
                    .with_bucket_name(bucket)
                    .with_client_options(client_options)
                    .build()?,
            ),
            StoreBackend::Local { root } => {
                std::fs::create_dir_all(root).map_err(|e| {
                    StoreError::Backend(format!("Failed to create {}: {}", root.display(), e))
                })?;
                Arc::new(LocalFileSystem::new_with_prefix(root)?)
            }
            StoreBackend::Memory => Arc::new(InMemory::new()),
        };

        Ok(Self::new(inner, timeout))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// List every shard of a device, optionally narrowed to one calendar day.
    /// Handles are ordered by name.
    pub async fn list_shards(
        &self,
        device_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<Vec<ShardHandle>, StoreError> {
        let prefix = match day {
            Some(date) => Path::from(day_prefix(device_id, date)),
            None => Path::from(device_id),
        };

        let metas = self
            .bounded("list", self.inner.list(Some(&prefix)).try_collect::<Vec<_>>())
            .await?;

        let mut shards: Vec<ShardHandle> = metas.into_iter().map(ShardHandle::from).collect();
        shards.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(shards)
    }

    /// Raw bytes of a shard
    pub async fn read_shard(&self, shard: &ShardHandle) -> Result<Vec<u8>, StoreError> {
        self.read(&shard.name).await
    }

    pub async fn read(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let location = Path::from(name);
        let bytes = self
            .bounded("read", async {
                self.inner.get(&location).await?.bytes().await
            })
            .await?;
        Ok(bytes.to_vec())
    }

    /// Write a shard; with `overwrite == false` an existing shard is left
    /// untouched and `AlreadyExists` is returned.
    pub async fn write_shard(
        &self,
        name: &str,
        bytes: Vec<u8>,
        overwrite: bool,
    ) -> Result<(), StoreError> {
        let location = Path::from(name);
        let payload = PutPayload::from(bytes);

        if overwrite {
            self.bounded("write", self.inner.put(&location, payload))
                .await?;
        } else {
            self.bounded(
                "write",
                self.inner
                    .put_opts(&location, payload, PutOptions::from(PutMode::Create)),
            )
            .await?;
        }
        Ok(())
    }

    /// List, read and parse every shard of a device (optionally one day).
    ///
    /// A shard that fails to parse, or disappears between listing and
    /// reading, is logged and skipped. Any other store failure aborts the
    /// scan.
    pub async fn scan_device(
        &self,
        device_id: &str,
        day: Option<NaiveDate>,
    ) -> Result<DeviceScan, StoreError> {
        let shards = self.list_shards(device_id, day).await?;
        let mut scan = DeviceScan {
            shard_count: shards.len(),
            ..DeviceScan::default()
        };

        let mut reads = std::pin::pin!(stream::iter(shards)
            .map(|shard| async move {
                let result = self.read_shard(&shard).await;
                (shard, result)
            })
            .buffered(SHARD_CONCURRENCY));

        while let Some((shard, result)) = reads.next().await {
            let raw = match result {
                Ok(raw) => raw,
                Err(StoreError::NotFound(_)) => {
                    scan.skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            match parse_shard(&raw) {
                Ok(mut readings) => scan.readings.append(&mut readings),
                Err(e) => {
                    warn!(device_id = %device_id, shard = %shard.name, error = %e, "Skipping unparsable shard");
                    scan.skipped += 1;
                }
            }
        }

        Ok(scan)
    }

    /// Replace a shard with the given readings
    pub async fn write_readings(&self, name: &str, readings: &[Reading]) -> Result<(), StoreError> {
        let bytes = encode_shard(readings)?;
        self.write_shard(name, bytes, true).await
    }

    /// Append one reading to a shard (read-modify-write).
    ///
    /// An unreadable existing shard is replaced rather than extended.
    pub async fn append_reading(&self, name: &str, reading: Reading) -> Result<usize, StoreError> {
        let mut readings = match self.read(name).await {
            Ok(raw) => parse_shard(&raw).unwrap_or_else(|e| {
                warn!(shard = %name, error = %e, "Existing shard unreadable, starting a new one");
                Vec::new()
            }),
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        readings.push(reading);
        self.write_readings(name, &readings).await?;
        Ok(readings.len())
    }

    async fn bounded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, object_store::Error>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => Err(StoreError::Timeout {
                operation,
                after: self.timeout,
            }),
        }
    }
}

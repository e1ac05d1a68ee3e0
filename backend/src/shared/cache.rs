use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::Reading;

/// Most recent reading per device.
///
/// Entries only move forward in time: `update_if_newer` swaps a whole
/// reading in under the entry's shard lock, so readers never see a partial
/// update and a stale shard read after a fresh one cannot regress an entry.
#[derive(Debug, Default)]
pub struct LatestStateCache {
    entries: DashMap<String, Reading>,
}

impl LatestStateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, device_id: &str) -> Option<Reading> {
        self.entries.get(device_id).map(|entry| entry.value().clone())
    }

    /// Store `reading` if it is strictly newer than the cached entry or no
    /// entry exists. Returns whether the cache changed.
    pub fn update_if_newer(&self, device_id: &str, reading: Reading) -> bool {
        match self.entries.entry(device_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if reading.is_newer_than(entry.get()) {
                    entry.insert(reading);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(reading);
                true
            }
        }
    }

    /// Timestamp of the cached reading
    pub fn last_seen(&self, device_id: &str) -> Option<String> {
        self.entries
            .get(device_id)
            .map(|entry| entry.value().timestamp.clone())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Concurrent registry of in-flight file pairs.
//!
//! The registry is the single owner of every [`Pair`]. Callers only ever
//! receive clones, and every mutation happens under one `RwLock` so readers
//! never observe a half-applied update.

use crate::types::{Pair, CHECKSUM_SUFFIX};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;
use tracing::debug;

/// Key of a data file: its base name.
pub fn data_key(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    if name.is_empty() {
        None
    } else {
        Some(name.into_owned())
    }
}

/// Key of a checksum file: its base name minus the `.sha256` suffix. `None`
/// for names without the suffix.
pub fn checksum_key(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_string_lossy();
    let key = name.strip_suffix(CHECKSUM_SUFFIX)?;
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[derive(Debug, Default)]
pub struct PairRegistry {
    pairs: RwLock<HashMap<String, Pair>>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the lock cannot leave a pair half-written, so a
    // poisoned lock is still usable.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Pair>> {
        self.pairs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Pair>> {
        self.pairs.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a sighting of a data file.
    pub fn record_data(&self, path: &Path, size: u64) {
        self.record_data_at(path, size, Utc::now());
    }

    pub fn record_data_at(&self, path: &Path, size: u64, now: DateTime<Utc>) {
        if path.as_os_str().is_empty() {
            return;
        }
        let Some(key) = data_key(path) else {
            return;
        };

        let mut pairs = self.write();
        let pair = pairs.entry(key.clone()).or_insert_with(|| {
            debug!(pair = %key, "first sighting (data)");
            Pair::new(key, now)
        });
        pair.data_path = Some(path.to_path_buf());
        pair.data_size = size;
    }

    /// Record a sighting of a checksum file.
    pub fn record_checksum(&self, path: &Path) {
        self.record_checksum_at(path, Utc::now());
    }

    pub fn record_checksum_at(&self, path: &Path, now: DateTime<Utc>) {
        if path.as_os_str().is_empty() {
            return;
        }
        let Some(key) = checksum_key(path) else {
            return;
        };

        let mut pairs = self.write();
        let pair = pairs.entry(key.clone()).or_insert_with(|| {
            debug!(pair = %key, "first sighting (checksum)");
            Pair::new(key, now)
        });
        pair.checksum_path = Some(path.to_path_buf());
    }

    /// Every both-present pair, in no particular order.
    pub fn ready_for_verification(&self) -> Vec<Pair> {
        self.read()
            .values()
            .filter(|pair| pair.is_ready())
            .cloned()
            .collect()
    }

    /// Pairs whose age has reached `timeout`, regardless of readiness.
    pub fn expired(&self, now: DateTime<Utc>, timeout: Duration) -> Vec<Pair> {
        let Ok(timeout) = chrono::Duration::from_std(timeout) else {
            return Vec::new();
        };
        self.read()
            .values()
            .filter(|pair| now.signed_duration_since(pair.first_seen) >= timeout)
            .cloned()
            .collect()
    }

    /// Delete a pair. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.write().remove(key).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.read().len()
    }

    /// Set the in-flight flag if it was clear. False if already claimed or unknown.
    pub fn try_claim(&self, key: &str) -> bool {
        match self.write().get_mut(key) {
            Some(pair) if !pair.in_flight => {
                pair.in_flight = true;
                true
            }
            _ => false,
        }
    }

    /// Clear the in-flight flag. Unknown keys are ignored.
    pub fn release(&self, key: &str) {
        if let Some(pair) = self.write().get_mut(key) {
            pair.in_flight = false;
        }
    }

    pub fn get(&self, key: &str) -> Option<Pair> {
        self.read().get(key).cloned()
    }

    pub fn snapshot(&self) -> Vec<Pair> {
        self.read().values().cloned().collect()
    }
}

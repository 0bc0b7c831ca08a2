/// Per-thread "last seen" timestamps.
///
/// The collection is persisted as a single array under one storage key. Saves
/// first drop entries older than the retention window. If the write is still
/// rejected (typically the per-item quota of `chrome.storage.sync`), the
/// oldest entry is dropped and the write retried after `RETRY_DELAY`, until it
/// succeeds or nothing is left to drop. A failure with an empty collection is
/// returned to the caller.
///
/// Every save takes a new generation number. A save that wakes from its retry
/// delay and finds a newer generation gives up without writing, so a stale
/// retry can never overwrite what the newer save persisted.

use crate::clock::Clock;
use crate::error::StorageResult;
use crate::logger::Logger;
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::time::Duration;

/// Delay between truncate-and-retry attempts
pub const RETRY_DELAY: Duration = Duration::from_millis(100);

/// Default retention window: one week
pub const DEFAULT_RETENTION_SECONDS: u64 = 7 * 24 * 60 * 60;

/// Last visit to a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadHistoryEntry {
    pub id: String,
    /// Unix seconds
    pub timestamp: u64,
}

pub struct ThreadHistory<S: Storage, C: Clock> {
    storage: S,
    clock: C,
    logger: Logger,
    retention_seconds: Cell<u64>,
    generation: Cell<u64>,
}

impl<S: Storage, C: Clock> ThreadHistory<S, C> {
    pub fn new(storage: S, clock: C, logger: Logger, retention_seconds: u64) -> Self {
        ThreadHistory {
            storage,
            clock,
            logger,
            retention_seconds: Cell::new(retention_seconds),
            generation: Cell::new(0),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn retention_seconds(&self) -> u64 {
        self.retention_seconds.get()
    }

    pub fn set_retention(&self, seconds: u64) {
        self.retention_seconds.set(seconds);
    }

    pub async fn get(&self, id: &str) -> StorageResult<Option<ThreadHistoryEntry>> {
        Ok(self.load().await?.into_iter().find(|entry| entry.id == id))
    }

    pub async fn entries(&self) -> StorageResult<Vec<ThreadHistoryEntry>> {
        self.load().await
    }

    /// Record a visit now, replacing any earlier visit to the same thread
    pub async fn add(&self, id: &str) -> StorageResult<ThreadHistoryEntry> {
        let mut entries = self.load().await?;
        entries.retain(|entry| entry.id != id);

        let entry = ThreadHistoryEntry {
            id: id.to_string(),
            timestamp: self.clock.now(),
        };
        entries.push(entry.clone());

        self.logger
            .debug(format!("recording visit to {} at {}", entry.id, entry.timestamp));
        self.save(entries).await?;
        Ok(entry)
    }

    /// Returns whether an entry was removed; nothing is written otherwise
    pub async fn remove(&self, id: &str) -> StorageResult<bool> {
        let mut entries = self.load().await?;
        let original_len = entries.len();
        entries.retain(|entry| entry.id != id);

        if entries.len() == original_len {
            return Ok(false);
        }

        self.save(entries).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> StorageResult<()> {
        self.generation.set(self.generation.get() + 1);
        self.storage.clear().await
    }

    /// Apply the retention window and persist the result
    pub async fn cleanup(&self) -> StorageResult<()> {
        let entries = self.load().await?;
        self.save(entries).await
    }

    async fn load(&self) -> StorageResult<Vec<ThreadHistoryEntry>> {
        match self.storage.load().await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, mut entries: Vec<ThreadHistoryEntry>) -> StorageResult<()> {
        let generation = self.generation.get() + 1;
        self.generation.set(generation);

        let cutoff = self
            .clock
            .now()
            .saturating_sub(self.retention_seconds.get());
        let before = entries.len();
        entries.retain(|entry| entry.timestamp >= cutoff);
        if entries.len() < before {
            self.logger.debug(format!(
                "dropped {} entries older than {}",
                before - entries.len(),
                cutoff
            ));
        }

        loop {
            let value = serde_json::to_value(&entries)?;
            let err = match self.storage.save(value).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };

            if entries.is_empty() {
                self.logger
                    .error(format!("failed to save empty thread history: {}", err));
                return Err(err);
            }

            let oldest = oldest_index(&entries);
            let dropped = entries.remove(oldest);
            self.logger.warn(format!(
                "save failed ({}), dropping oldest entry {} and retrying, {} left",
                err,
                dropped.id,
                entries.len()
            ));

            self.clock.sleep(RETRY_DELAY).await;

            if self.generation.get() != generation {
                self.logger
                    .debug("retry superseded by a newer save, abandoning");
                return Ok(());
            }
        }
    }
}

fn oldest_index(entries: &[ThreadHistoryEntry]) -> usize {
    entries
        .iter()
        .enumerate()
        .min_by_key(|(_, entry)| entry.timestamp)
        .map(|(index, _)| index)
        .unwrap_or(0)
}

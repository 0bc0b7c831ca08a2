/// In-process storage, with an optional per-item byte quota

use super::{Storage, StorageChange};
use crate::error::{StorageError, StorageResult};
use crate::events::Event;
use serde_json::Value;
use std::cell::{Cell, RefCell};

pub struct MemoryStorage {
    key: String,
    value: RefCell<Option<Value>>,
    quota_bytes: Cell<Option<usize>>,
    fail_writes: Cell<bool>,
    writes: Cell<usize>,
    changed: Event<StorageChange>,
}

impl MemoryStorage {
    pub fn new(key: &str) -> Self {
        MemoryStorage {
            key: key.to_string(),
            value: RefCell::new(None),
            quota_bytes: Cell::new(None),
            fail_writes: Cell::new(false),
            writes: Cell::new(0),
            changed: Event::new(),
        }
    }

    /// Reject saves whose serialized JSON is longer than `bytes`,
    /// the way `chrome.storage.sync` enforces QUOTA_BYTES_PER_ITEM
    pub fn with_quota(key: &str, bytes: usize) -> Self {
        let storage = Self::new(key);
        storage.quota_bytes.set(Some(bytes));
        storage
    }

    pub fn set_quota(&self, bytes: Option<usize>) {
        self.quota_bytes.set(bytes);
    }

    /// Make every save fail with a backend error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of saves attempted, successful or not
    pub fn write_count(&self) -> usize {
        self.writes.get()
    }

    pub fn snapshot(&self) -> Option<Value> {
        self.value.borrow().clone()
    }

    /// Replace the value as if another context wrote it
    pub fn set_external(&self, value: Value) {
        *self.value.borrow_mut() = Some(value);
        self.notify();
    }

    fn notify(&self) {
        self.changed.emit(&StorageChange {
            key: self.key.clone(),
        });
    }
}

impl Storage for MemoryStorage {
    fn key(&self) -> &str {
        &self.key
    }

    async fn load(&self) -> StorageResult<Option<Value>> {
        Ok(self.value.borrow().clone())
    }

    async fn save(&self, value: Value) -> StorageResult<()> {
        self.writes.set(self.writes.get() + 1);

        if self.fail_writes.get() {
            return Err(StorageError::Backend("writes disabled".to_string()));
        }

        if let Some(quota) = self.quota_bytes.get() {
            let size = serde_json::to_string(&value)?.len() + self.key.len();
            if size > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "{} bytes exceeds quota of {} bytes",
                    size, quota
                )));
            }
        }

        *self.value.borrow_mut() = Some(value);
        self.notify();
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        *self.value.borrow_mut() = None;
        self.notify();
        Ok(())
    }

    fn on_change(&self) -> &Event<StorageChange> {
        &self.changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pollster::block_on;
    use serde_json::json;
    use std::rc::Rc;

    #[test]
    fn test_empty_load() {
        let storage = MemoryStorage::new("options");
        assert_eq!(block_on(storage.load()).unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let storage = MemoryStorage::new("options");
        block_on(storage.save(json!({"debug": true}))).unwrap();

        assert_eq!(block_on(storage.load()).unwrap(), Some(json!({"debug": true})));
    }

    #[test]
    fn test_quota_rejects_large_values() {
        let storage = MemoryStorage::with_quota("k", 10);

        let err = block_on(storage.save(json!("a string that is far too long"))).unwrap_err();

        assert!(matches!(err, StorageError::QuotaExceeded(_)));
        assert_eq!(storage.snapshot(), None);
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_change_notifications() {
        let storage = MemoryStorage::new("threadHistory");
        let keys = Rc::new(RefCell::new(Vec::new()));
        {
            let keys = keys.clone();
            storage
                .on_change()
                .subscribe(move |change: &StorageChange| keys.borrow_mut().push(change.key.clone()));
        }

        block_on(storage.save(json!([]))).unwrap();
        block_on(storage.clear()).unwrap();
        storage.set_external(json!([]));

        assert_eq!(keys.borrow().len(), 3);
        assert!(keys.borrow().iter().all(|k| k == "threadHistory"));
    }

    #[test]
    fn test_failed_write_does_not_notify() {
        let storage = MemoryStorage::new("k");
        storage.set_fail_writes(true);
        let calls = Rc::new(Cell::new(0));
        {
            let calls = calls.clone();
            storage.on_change().subscribe(move |_| calls.set(calls.get() + 1));
        }

        assert!(block_on(storage.save(json!(1))).is_err());
        assert_eq!(calls.get(), 0);
    }
}

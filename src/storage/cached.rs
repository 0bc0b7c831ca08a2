/// Caches the value of the wrapped storage; the cache is dropped whenever the
/// inner storage reports a change (including writes from other contexts).

use super::{Storage, StorageChange};
use crate::error::StorageResult;
use crate::events::{Event, ListenerToken};
use serde_json::Value;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, PartialEq)]
enum Cached {
    Empty,
    Loaded(Option<Value>),
}

pub struct CachedStorage<S: Storage> {
    inner: S,
    cache: Rc<RefCell<Cached>>,
    token: ListenerToken,
}

impl<S: Storage> CachedStorage<S> {
    pub fn new(inner: S) -> Self {
        let cache = Rc::new(RefCell::new(Cached::Empty));
        let token = {
            let cache = cache.clone();
            inner.on_change().subscribe(move |_| {
                *cache.borrow_mut() = Cached::Empty;
            })
        };

        CachedStorage {
            inner,
            cache,
            token,
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn is_cached(&self) -> bool {
        *self.cache.borrow() != Cached::Empty
    }
}

impl<S: Storage> Storage for CachedStorage<S> {
    fn key(&self) -> &str {
        self.inner.key()
    }

    async fn load(&self) -> StorageResult<Option<Value>> {
        if let Cached::Loaded(value) = &*self.cache.borrow() {
            return Ok(value.clone());
        }

        let value = self.inner.load().await?;
        *self.cache.borrow_mut() = Cached::Loaded(value.clone());
        Ok(value)
    }

    async fn save(&self, value: Value) -> StorageResult<()> {
        self.inner.save(value.clone()).await?;
        // The inner change notification already emptied the cache
        *self.cache.borrow_mut() = Cached::Loaded(Some(value));
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.inner.clear().await?;
        *self.cache.borrow_mut() = Cached::Loaded(None);
        Ok(())
    }

    fn on_change(&self) -> &Event<StorageChange> {
        self.inner.on_change()
    }
}

impl<S: Storage> Drop for CachedStorage<S> {
    fn drop(&mut self) {
        self.inner.on_change().unsubscribe(self.token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pollster::block_on;
    use serde_json::json;

    #[test]
    fn test_load_is_cached() {
        let inner = Rc::new(MemoryStorage::new("options"));
        let cached = CachedStorage::new(inner.clone());

        assert!(!cached.is_cached());
        assert_eq!(block_on(cached.load()).unwrap(), None);
        assert!(cached.is_cached());
    }

    #[test]
    fn test_save_updates_cache() {
        let inner = Rc::new(MemoryStorage::new("options"));
        let cached = CachedStorage::new(inner.clone());

        block_on(cached.save(json!({"debug": true}))).unwrap();

        assert!(cached.is_cached());
        assert_eq!(block_on(cached.load()).unwrap(), Some(json!({"debug": true})));
        assert_eq!(inner.snapshot(), Some(json!({"debug": true})));
    }

    #[test]
    fn test_external_change_invalidates() {
        let inner = Rc::new(MemoryStorage::new("options"));
        let cached = CachedStorage::new(inner.clone());
        block_on(cached.load()).unwrap();

        inner.set_external(json!({"className": "fresh"}));

        assert!(!cached.is_cached());
        assert_eq!(block_on(cached.load()).unwrap(), Some(json!({"className": "fresh"})));
    }

    #[test]
    fn test_failed_save_keeps_previous_value() {
        let inner = Rc::new(MemoryStorage::new("options"));
        let cached = CachedStorage::new(inner.clone());
        block_on(cached.save(json!(1))).unwrap();

        inner.set_fail_writes(true);
        assert!(block_on(cached.save(json!(2))).is_err());

        assert_eq!(block_on(cached.load()).unwrap(), Some(json!(1)));
    }

    #[test]
    fn test_clear() {
        let inner = Rc::new(MemoryStorage::new("options"));
        let cached = CachedStorage::new(inner.clone());
        block_on(cached.save(json!(1))).unwrap();

        block_on(cached.clear()).unwrap();

        assert_eq!(block_on(cached.load()).unwrap(), None);
        assert_eq!(inner.snapshot(), None);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let inner = Rc::new(MemoryStorage::new("options"));
        let cached = CachedStorage::new(inner.clone());
        assert_eq!(inner.on_change().listener_count(), 1);

        drop(cached);

        assert_eq!(inner.on_change().listener_count(), 0);
    }
}

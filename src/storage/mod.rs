/// Key-value storage abstraction bound to a single key.
///
/// Variants compose by delegation: `CompressedStorage<CachedStorage<ExtensionStorage>>`
/// is what the background page runs on, `MemoryStorage` backs tests.
mod cached;
mod compressed;
#[cfg(target_arch = "wasm32")]
mod extension;
mod memory;

pub use cached::CachedStorage;
pub use compressed::CompressedStorage;
#[cfg(target_arch = "wasm32")]
pub use extension::{ExtensionStorage, StorageArea};
#[cfg(target_arch = "wasm32")]
pub(crate) use extension::js_error_message;
pub use memory::MemoryStorage;

use crate::error::StorageResult;
use crate::events::Event;
use serde_json::Value;

/// Storage key for the thread history collection
pub const THREAD_HISTORY_KEY: &str = "threadHistory";

/// Storage key for the options overrides
pub const OPTIONS_KEY: &str = "options";

/// Emitted whenever the stored value for a key changes
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
}

#[allow(async_fn_in_trait)]
pub trait Storage {
    fn key(&self) -> &str;

    /// `None` when nothing is stored under the key
    async fn load(&self) -> StorageResult<Option<Value>>;

    async fn save(&self, value: Value) -> StorageResult<()>;

    async fn clear(&self) -> StorageResult<()>;

    fn on_change(&self) -> &Event<StorageChange>;
}

impl<S: Storage> Storage for std::rc::Rc<S> {
    fn key(&self) -> &str {
        (**self).key()
    }

    async fn load(&self) -> StorageResult<Option<Value>> {
        (**self).load().await
    }

    async fn save(&self, value: Value) -> StorageResult<()> {
        (**self).save(value).await
    }

    async fn clear(&self) -> StorageResult<()> {
        (**self).clear().await
    }

    fn on_change(&self) -> &Event<StorageChange> {
        (**self).on_change()
    }
}

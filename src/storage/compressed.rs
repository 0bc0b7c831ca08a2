/// Optional compression of stored values.
///
/// When enabled the JSON text is written as a single deflated zip entry,
/// base64 encoded and stored as a string. Loading accepts both forms, so
/// switching compression on or off never strands existing data.

use super::{Storage, StorageChange};
use crate::error::{StorageError, StorageResult};
use crate::events::Event;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde_json::Value;
use std::cell::Cell;
use std::io::{Cursor, Read, Write};
use zip::write::SimpleFileOptions;

/// Prefix marking a compressed payload
const COMPRESSED_PREFIX: &str = "zip:";
const ENTRY_NAME: &str = "value.json";

pub struct CompressedStorage<S: Storage> {
    inner: S,
    enabled: Cell<bool>,
}

impl<S: Storage> CompressedStorage<S> {
    pub fn new(inner: S, enabled: bool) -> Self {
        CompressedStorage {
            inner,
            enabled: Cell::new(enabled),
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.set(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Storage> Storage for CompressedStorage<S> {
    fn key(&self) -> &str {
        self.inner.key()
    }

    async fn load(&self) -> StorageResult<Option<Value>> {
        match self.inner.load().await? {
            Some(Value::String(text)) if text.starts_with(COMPRESSED_PREFIX) => {
                let json = decompress(&text[COMPRESSED_PREFIX.len()..])?;
                Ok(Some(serde_json::from_str(&json)?))
            }
            other => Ok(other),
        }
    }

    async fn save(&self, value: Value) -> StorageResult<()> {
        if !self.enabled.get() {
            return self.inner.save(value).await;
        }

        let json = serde_json::to_string(&value)?;
        let packed = format!("{}{}", COMPRESSED_PREFIX, compress(&json)?);
        self.inner.save(Value::String(packed)).await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.inner.clear().await
    }

    fn on_change(&self) -> &Event<StorageChange> {
        self.inner.on_change()
    }
}

pub(crate) fn compress(text: &str) -> StorageResult<String> {
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .compression_level(Some(9));

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(ENTRY_NAME, options)
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    zip.write_all(text.as_bytes())
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    let cursor = zip
        .finish()
        .map_err(|e| StorageError::Compression(e.to_string()))?;

    Ok(BASE64.encode(cursor.into_inner()))
}

pub(crate) fn decompress(encoded: &str) -> StorageResult<String> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| StorageError::Compression(format!("base64 decode error: {}", e)))?;

    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    let mut entry = archive
        .by_index(0)
        .map_err(|e| StorageError::Compression(e.to_string()))?;

    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .map_err(|e| StorageError::Compression(e.to_string()))?;
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use pollster::block_on;
    use serde_json::json;
    use std::rc::Rc;

    fn history(count: usize) -> Value {
        let entries: Vec<Value> = (0..count)
            .map(|i| json!({"id": format!("t3_{:06}", i), "timestamp": 1_700_000_000 + i}))
            .collect();
        Value::Array(entries)
    }

    #[test]
    fn test_enabled_writes_compressed_string() {
        let inner = Rc::new(MemoryStorage::new("threadHistory"));
        let storage = CompressedStorage::new(inner.clone(), true);

        block_on(storage.save(history(3))).unwrap();

        match inner.snapshot() {
            Some(Value::String(text)) => assert!(text.starts_with(COMPRESSED_PREFIX)),
            other => panic!("expected compressed string, got {:?}", other),
        }
        assert_eq!(block_on(storage.load()).unwrap(), Some(history(3)));
    }

    #[test]
    fn test_disabled_passes_through() {
        let inner = Rc::new(MemoryStorage::new("threadHistory"));
        let storage = CompressedStorage::new(inner.clone(), false);

        block_on(storage.save(history(2))).unwrap();

        assert_eq!(inner.snapshot(), Some(history(2)));
    }

    #[test]
    fn test_toggling_keeps_data_readable() {
        let inner = Rc::new(MemoryStorage::new("threadHistory"));
        let storage = CompressedStorage::new(inner.clone(), false);
        block_on(storage.save(history(2))).unwrap();

        storage.set_enabled(true);
        assert_eq!(block_on(storage.load()).unwrap(), Some(history(2)));

        block_on(storage.save(history(4))).unwrap();
        storage.set_enabled(false);
        assert_eq!(block_on(storage.load()).unwrap(), Some(history(4)));
    }

    #[test]
    fn test_compression_shrinks_repetitive_history() {
        let json = serde_json::to_string(&history(500)).unwrap();
        let packed = compress(&json).unwrap();

        assert!(packed.len() < json.len());
        assert_eq!(decompress(&packed).unwrap(), json);
    }

    #[test]
    fn test_corrupt_payload_is_an_error() {
        let inner = Rc::new(MemoryStorage::new("threadHistory"));
        inner.set_external(json!("zip:not base64!"));
        let storage = CompressedStorage::new(inner, true);

        let err = block_on(storage.load()).unwrap_err();

        assert!(matches!(err, StorageError::Compression(_)));
    }

    #[test]
    fn test_plain_strings_are_not_decompressed() {
        let inner = Rc::new(MemoryStorage::new("k"));
        inner.set_external(json!("hello"));
        let storage = CompressedStorage::new(inner, true);

        assert_eq!(block_on(storage.load()).unwrap(), Some(json!("hello")));
    }
}

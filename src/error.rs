/// Error types shared by storage, options and messaging
use thiserror::Error;

/// Storage error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    /// The backing store refused the write because of its size quota
    #[error("Storage quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other failure reported by the backing store
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Compressed payload could not be packed or unpacked
    #[error("Compression error: {0}")]
    Compression(String),

    /// Options patch produced a record that is not a valid `Options`
    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Messaging bridge error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BridgeError {
    /// Message could not be delivered or no response arrived
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response envelope or result payload had an unexpected shape
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// Response answered a different method than the one requested
    #[error("Response method mismatch: expected {expected}, got {actual}")]
    MethodMismatch { expected: String, actual: String },

    /// Remote handler failed
    #[error("Remote error: {0}")]
    Remote(String),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;
pub type BridgeResult<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_messages() {
        let err = StorageError::QuotaExceeded("QUOTA_BYTES_PER_ITEM".to_string());
        assert_eq!(err.to_string(), "Storage quota exceeded: QUOTA_BYTES_PER_ITEM");
    }

    #[test]
    fn test_serde_error_converts() {
        let err: StorageError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_method_mismatch_message() {
        let err = BridgeError::MethodMismatch {
            expected: "getOptions".to_string(),
            actual: "clearOptions".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Response method mismatch: expected getOptions, got clearOptions"
        );
    }
}

use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by score stores regardless of the underlying backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human-readable context.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The backend answered but the stored data could not be used.
    #[error("corrupt record `{key}`: {reason}")]
    Corrupt {
        /// Identifier of the unreadable record.
        key: String,
        /// Why it could not be used.
        reason: String,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

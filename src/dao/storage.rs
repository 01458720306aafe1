use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of where the data lives.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Backend could not be reached or written.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// What was being attempted.
        message: String,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// Stored data could not be decoded.
    #[error("stored data is corrupted: {message}")]
    Corrupted {
        /// What was being decoded.
        message: String,
        /// Underlying decode failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
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

    /// Construct a corruption error for data that could not be decoded.
    pub fn corrupted(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Corrupted {
            message,
            source: Box::new(source),
        }
    }
}

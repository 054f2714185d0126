use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The stored version did not match the version the writer expected.
    #[error(
        "Concurrency conflict on {collection}/{key}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        collection: String,
        key: String,
        expected: Version,
        actual: Version,
    },

    /// A document failed validation before being written.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// A query referenced an unusable field path.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true if this error is an optimistic concurrency conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::ConcurrencyConflict { .. })
    }
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

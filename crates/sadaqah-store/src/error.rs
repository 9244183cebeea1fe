//! Error types for sadaqah storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A staged write's precondition no longer holds.
    ///
    /// Nothing in the batch was applied; the caller may re-read and retry.
    #[error("write conflict on {entity} {id}")]
    Conflict {
        /// Kind of record.
        entity: &'static str,
        /// Identifier of the contended record.
        id: String,
    },

    /// A natural key is already taken by another record.
    #[error("duplicate {entity}: {key}")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// The natural key in use.
        key: String,
    },
}

impl StoreError {
    /// Whether re-running the failed operation may succeed.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

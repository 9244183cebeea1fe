//! Error types for ledger operations.

use sadaqah_core::ConversionError;
use sadaqah_store::StoreError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors surfaced by the ledger and the reference-data layer.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Box not found.
    #[error("box not found: {box_id}")]
    BoxNotFound {
        /// The box ID that was not found.
        box_id: String,
    },

    /// Contribution not found, or it belongs to another box.
    #[error("contribution not found: {contribution_id}")]
    ContributionNotFound {
        /// The contribution ID that was not found.
        contribution_id: String,
    },

    /// Currency not found (by ID or by code).
    #[error("currency not found: {currency}")]
    CurrencyNotFound {
        /// The currency ID or code that was looked up.
        currency: String,
    },

    /// Any other reference record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A currency involved in the conversion has no reference rate.
    #[error("conversion unavailable: no reference rate for {currency}")]
    ConversionUnavailable {
        /// Code of the currency lacking a rate.
        currency: String,
    },

    /// The box changed under the transition and retries ran out.
    ///
    /// Nothing was written; the caller may retry.
    #[error("write conflict on box {box_id}")]
    WriteConflict {
        /// The contended box.
        box_id: String,
    },

    /// A natural key is already in use.
    #[error("duplicate {entity}: {key}")]
    Duplicate {
        /// Kind of record.
        entity: &'static str,
        /// The natural key in use.
        key: String,
    },

    /// The amount or repeat count is not acceptable.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The underlying store failed. The transition applied nothing.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LedgerError {
    /// Whether the caller may retry the same request unchanged.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::WriteConflict { .. })
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity: "box", id } => Self::BoxNotFound { box_id: id },
            StoreError::NotFound {
                entity: "contribution",
                id,
            } => Self::ContributionNotFound {
                contribution_id: id,
            },
            StoreError::NotFound {
                entity: "currency",
                id,
            } => Self::CurrencyNotFound { currency: id },
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::Conflict { id, .. } => Self::WriteConflict { box_id: id },
            StoreError::Duplicate { entity, key } => Self::Duplicate { entity, key },
            StoreError::Database(msg) | StoreError::Serialization(msg) => {
                Self::StorageUnavailable(msg)
            }
        }
    }
}

impl From<ConversionError> for LedgerError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::MissingRate { code } => Self::ConversionUnavailable { currency: code },
            ConversionError::Overflow { code } => {
                Self::InvalidAmount(format!("amount in {code} is too large to convert"))
            }
        }
    }
}

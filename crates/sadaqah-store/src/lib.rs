//! Storage layer for the sadaqah ledger.
//!
//! This crate persists reference data (currencies, currency types, tags) and
//! ledger rows (boxes, contributions, collections), and provides the atomic
//! batch writer every ledger transition commits through.
//!
//! # Backends
//!
//! - [`RocksStore`]: `RocksDB` with one column family per table plus
//!   box-scoped index families (behind the default `rocksdb-backend` feature).
//! - [`MemoryStore`]: an in-process implementation for tests and tooling.
//!
//! # Example
//!
//! ```no_run
//! use sadaqah_store::{RocksStore, Store};
//! use sadaqah_core::{SadaqahBox, UserId};
//!
//! let store = RocksStore::open("/tmp/sadaqah-db").unwrap();
//!
//! let sadaqah_box = SadaqahBox::new(UserId::generate(), "Ramadan");
//! store.create_box(&sadaqah_box).unwrap();
//!
//! let stored = store.get_box(&sadaqah_box.id).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod batch;
pub mod error;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use batch::{Precondition, WriteOp, WriteSet};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use sadaqah_core::{
    BoxId, Collection, CollectionId, Currency, CurrencyId, CurrencyType, CurrencyTypeId, Sadaqah,
    SadaqahBox, SadaqahId, Tag, TagId,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (`RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Currency Operations
    // =========================================================================

    /// Insert or replace a currency record, keeping the code index in step.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_currency(&self, currency: &Currency) -> Result<()>;

    /// Get a currency by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_currency(&self, currency_id: &CurrencyId) -> Result<Option<Currency>>;

    /// Find a currency by code (case-insensitive).
    ///
    /// When several currencies share a code the earliest created one wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_currency_by_code(&self, code: &str) -> Result<Option<Currency>>;

    /// List all currencies ordered by code.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_currencies(&self) -> Result<Vec<Currency>>;

    /// Delete a currency.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the currency doesn't exist.
    fn delete_currency(&self, currency_id: &CurrencyId) -> Result<()>;

    // =========================================================================
    // Currency Type Operations
    // =========================================================================

    /// Insert or replace a currency type.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if another type already uses the name.
    fn put_currency_type(&self, currency_type: &CurrencyType) -> Result<()>;

    /// Get a currency type by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_currency_type(&self, currency_type_id: &CurrencyTypeId) -> Result<Option<CurrencyType>>;

    /// Find a currency type by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_currency_type_by_name(&self, name: &str) -> Result<Option<CurrencyType>>;

    /// List all currency types ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_currency_types(&self) -> Result<Vec<CurrencyType>>;

    /// Delete a currency type.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the type doesn't exist.
    fn delete_currency_type(&self, currency_type_id: &CurrencyTypeId) -> Result<()>;

    // =========================================================================
    // Tag Operations
    // =========================================================================

    /// Insert or replace a tag.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Duplicate` if another tag already uses the name.
    fn put_tag(&self, tag: &Tag) -> Result<()>;

    /// Get a tag by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_tag(&self, tag_id: &TagId) -> Result<Option<Tag>>;

    /// Find a tag by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>>;

    /// List all tags ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_tags(&self) -> Result<Vec<Tag>>;

    /// Delete a tag.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the tag doesn't exist.
    fn delete_tag(&self, tag_id: &TagId) -> Result<()>;

    // =========================================================================
    // Ledger Reads
    // =========================================================================

    /// Get a box by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_box(&self, box_id: &BoxId) -> Result<Option<SadaqahBox>>;

    /// Get a contribution by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_contribution(&self, sadaqah_id: &SadaqahId) -> Result<Option<Sadaqah>>;

    /// List the live contributions of a box, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_contributions_by_box(&self, box_id: &BoxId) -> Result<Vec<Sadaqah>>;

    /// Get a collection by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_collection(&self, collection_id: &CollectionId) -> Result<Option<Collection>>;

    /// List the collections of a box, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_collections_by_box(&self, box_id: &BoxId) -> Result<Vec<Collection>>;

    // =========================================================================
    // Atomic Batch
    // =========================================================================

    /// Apply every staged write, or none of them.
    ///
    /// # Errors
    ///
    /// - `StoreError::Conflict` if a box precondition no longer holds.
    /// - `StoreError::NotFound` if a guarded box or deleted contribution is missing.
    /// - `StoreError::Database` if the write itself fails.
    fn commit(&self, batch: WriteSet) -> Result<()>;

    /// Insert a new, empty box.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if a box with the same ID exists.
    fn create_box(&self, sadaqah_box: &SadaqahBox) -> Result<()> {
        let mut batch = WriteSet::new();
        batch.put_box(sadaqah_box.clone(), Precondition::Absent);
        self.commit(batch)
    }
}

//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Every multi-row write goes through a single `WriteBatch`; a store-wide
//! write lock serialises precondition checks with the batch that depends on
//! them.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use sadaqah_core::{
    BoxId, Collection, CollectionId, Currency, CurrencyId, CurrencyType, CurrencyTypeId, Sadaqah,
    SadaqahBox, SadaqahId, Tag, TagId,
};

use crate::batch::check_box;
use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::{Store, WriteOp, WriteSet};

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get_record<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn all_records<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            records.push(Self::deserialize(&value)?);
        }
        Ok(records)
    }

    /// Collect all index keys starting with `prefix`, in key order.
    fn index_keys(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut found = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(prefix) {
                break;
            }
            found.push(key.to_vec());
        }
        Ok(found)
    }

    /// Look up a record through a `name -> id` index.
    fn find_by_name<T: serde::de::DeserializeOwned>(
        &self,
        index_cf: &str,
        records_cf: &str,
        name: &str,
    ) -> Result<Option<T>> {
        let index = self.cf(index_cf)?;
        let Some(id) = self
            .db
            .get_cf(&index, keys::name_key(name))
            .map_err(|e| StoreError::Database(e.to_string()))?
        else {
            return Ok(None);
        };
        self.get_record(records_cf, &id)
    }

    /// Upsert a record that is unique by name, maintaining its name index.
    ///
    /// Must be called with the write lock held.
    #[allow(clippy::too_many_arguments)]
    fn put_named<T: serde::Serialize>(
        &self,
        entity: &'static str,
        records_cf: &str,
        index_cf: &str,
        id: &[u8; 16],
        name: &str,
        previous_name: Option<&str>,
        record: &T,
    ) -> Result<()> {
        let records = self.cf(records_cf)?;
        let index = self.cf(index_cf)?;

        let owner = self
            .db
            .get_cf(&index, keys::name_key(name))
            .map_err(|e| StoreError::Database(e.to_string()))?;
        if owner.is_some_and(|owner| owner.as_slice() != id.as_slice()) {
            return Err(StoreError::Duplicate {
                entity,
                key: name.to_string(),
            });
        }

        let mut batch = WriteBatch::default();
        if let Some(previous) = previous_name.filter(|previous| *previous != name) {
            batch.delete_cf(&index, keys::name_key(previous));
        }
        batch.put_cf(&records, id, Self::serialize(record)?);
        batch.put_cf(&index, keys::name_key(name), id);
        self.write(batch)
    }

    /// Delete a record that is unique by name together with its index entry.
    ///
    /// Must be called with the write lock held.
    fn delete_named(&self, records_cf: &str, index_cf: &str, id: &[u8; 16], name: &str) -> Result<()> {
        let records = self.cf(records_cf)?;
        let index = self.cf(index_cf)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&records, id);
        batch.delete_cf(&index, keys::name_key(name));
        self.write(batch)
    }

    /// Load records referenced by `box_id || id` index keys, newest first.
    fn records_by_box<T: serde::de::DeserializeOwned>(
        &self,
        index_cf: &str,
        records_cf: &str,
        box_id: &BoxId,
    ) -> Result<Vec<T>> {
        let mut index_keys = self.index_keys(index_cf, &keys::box_prefix(box_id))?;
        // ULID suffixes are time-ordered; reverse for newest first.
        index_keys.reverse();

        let mut records = Vec::with_capacity(index_keys.len());
        for key in index_keys {
            let Some(id) = keys::pair_key_suffix(&key) else {
                tracing::warn!(cf = index_cf, "Skipping malformed index key");
                continue;
            };
            if let Some(record) = self.get_record(records_cf, &id)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Currency Operations
    // =========================================================================

    fn put_currency(&self, currency: &Currency) -> Result<()> {
        let _guard = self.lock()?;
        let cf_currencies = self.cf(cf::CURRENCIES)?;
        let cf_by_code = self.cf(cf::CURRENCIES_BY_CODE)?;

        let mut batch = WriteBatch::default();
        if let Some(previous) = self.get_currency(&currency.id)? {
            batch.delete_cf(
                &cf_by_code,
                keys::currency_code_key(&previous.code, &previous.created_at, &previous.id),
            );
        }
        batch.put_cf(
            &cf_currencies,
            keys::currency_key(&currency.id),
            Self::serialize(currency)?,
        );
        batch.put_cf(
            &cf_by_code,
            keys::currency_code_key(&currency.code, &currency.created_at, &currency.id),
            [],
        );
        self.write(batch)
    }

    fn get_currency(&self, currency_id: &CurrencyId) -> Result<Option<Currency>> {
        self.get_record(cf::CURRENCIES, &keys::currency_key(currency_id))
    }

    fn find_currency_by_code(&self, code: &str) -> Result<Option<Currency>> {
        let prefix = keys::currency_code_prefix(code);
        for key in self.index_keys(cf::CURRENCIES_BY_CODE, &prefix)? {
            if let Some(currency_id) = keys::currency_id_from_code_key(&key) {
                if let Some(currency) = self.get_currency(&currency_id)? {
                    return Ok(Some(currency));
                }
            }
        }
        Ok(None)
    }

    fn list_currencies(&self) -> Result<Vec<Currency>> {
        let mut currencies: Vec<Currency> = self.all_records(cf::CURRENCIES)?;
        currencies.sort_by(|a, b| a.code.cmp(&b.code).then(a.created_at.cmp(&b.created_at)));
        Ok(currencies)
    }

    fn delete_currency(&self, currency_id: &CurrencyId) -> Result<()> {
        let _guard = self.lock()?;
        let currency = self.get_currency(currency_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "currency",
            id: currency_id.to_string(),
        })?;

        let cf_currencies = self.cf(cf::CURRENCIES)?;
        let cf_by_code = self.cf(cf::CURRENCIES_BY_CODE)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_currencies, keys::currency_key(currency_id));
        batch.delete_cf(
            &cf_by_code,
            keys::currency_code_key(&currency.code, &currency.created_at, &currency.id),
        );
        self.write(batch)
    }

    // =========================================================================
    // Currency Type Operations
    // =========================================================================

    fn put_currency_type(&self, currency_type: &CurrencyType) -> Result<()> {
        let _guard = self.lock()?;
        let previous = self.get_currency_type(&currency_type.id)?;
        self.put_named(
            "currency type",
            cf::CURRENCY_TYPES,
            cf::CURRENCY_TYPES_BY_NAME,
            currency_type.id.as_bytes(),
            &currency_type.name,
            previous.as_ref().map(|p| p.name.as_str()),
            currency_type,
        )
    }

    fn get_currency_type(&self, currency_type_id: &CurrencyTypeId) -> Result<Option<CurrencyType>> {
        self.get_record(cf::CURRENCY_TYPES, &keys::currency_type_key(currency_type_id))
    }

    fn find_currency_type_by_name(&self, name: &str) -> Result<Option<CurrencyType>> {
        self.find_by_name(cf::CURRENCY_TYPES_BY_NAME, cf::CURRENCY_TYPES, name)
    }

    fn list_currency_types(&self) -> Result<Vec<CurrencyType>> {
        let mut types: Vec<CurrencyType> = self.all_records(cf::CURRENCY_TYPES)?;
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    fn delete_currency_type(&self, currency_type_id: &CurrencyTypeId) -> Result<()> {
        let _guard = self.lock()?;
        let existing = self
            .get_currency_type(currency_type_id)?
            .ok_or_else(|| StoreError::NotFound {
                entity: "currency type",
                id: currency_type_id.to_string(),
            })?;
        self.delete_named(
            cf::CURRENCY_TYPES,
            cf::CURRENCY_TYPES_BY_NAME,
            currency_type_id.as_bytes(),
            &existing.name,
        )
    }

    // =========================================================================
    // Tag Operations
    // =========================================================================

    fn put_tag(&self, tag: &Tag) -> Result<()> {
        let _guard = self.lock()?;
        let previous = self.get_tag(&tag.id)?;
        self.put_named(
            "tag",
            cf::TAGS,
            cf::TAGS_BY_NAME,
            tag.id.as_bytes(),
            &tag.name,
            previous.as_ref().map(|p| p.name.as_str()),
            tag,
        )
    }

    fn get_tag(&self, tag_id: &TagId) -> Result<Option<Tag>> {
        self.get_record(cf::TAGS, &keys::tag_key(tag_id))
    }

    fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        self.find_by_name(cf::TAGS_BY_NAME, cf::TAGS, name)
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.all_records(cf::TAGS)?;
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn delete_tag(&self, tag_id: &TagId) -> Result<()> {
        let _guard = self.lock()?;
        let existing = self.get_tag(tag_id)?.ok_or_else(|| StoreError::NotFound {
            entity: "tag",
            id: tag_id.to_string(),
        })?;
        self.delete_named(cf::TAGS, cf::TAGS_BY_NAME, tag_id.as_bytes(), &existing.name)
    }

    // =========================================================================
    // Ledger Reads
    // =========================================================================

    fn get_box(&self, box_id: &BoxId) -> Result<Option<SadaqahBox>> {
        self.get_record(cf::BOXES, &keys::box_key(box_id))
    }

    fn get_contribution(&self, sadaqah_id: &SadaqahId) -> Result<Option<Sadaqah>> {
        self.get_record(cf::CONTRIBUTIONS, &keys::contribution_key(sadaqah_id))
    }

    fn list_contributions_by_box(&self, box_id: &BoxId) -> Result<Vec<Sadaqah>> {
        self.records_by_box(cf::CONTRIBUTIONS_BY_BOX, cf::CONTRIBUTIONS, box_id)
    }

    fn get_collection(&self, collection_id: &CollectionId) -> Result<Option<Collection>> {
        self.get_record(cf::COLLECTIONS, &keys::collection_key(collection_id))
    }

    fn list_collections_by_box(&self, box_id: &BoxId) -> Result<Vec<Collection>> {
        self.records_by_box(cf::COLLECTIONS_BY_BOX, cf::COLLECTIONS, box_id)
    }

    // =========================================================================
    // Atomic Batch
    // =========================================================================

    fn commit(&self, staged: WriteSet) -> Result<()> {
        let op_count = staged.len();
        let _guard = self.lock()?;

        let cf_boxes = self.cf(cf::BOXES)?;
        let cf_contributions = self.cf(cf::CONTRIBUTIONS)?;
        let cf_contributions_by_box = self.cf(cf::CONTRIBUTIONS_BY_BOX)?;
        let cf_collections = self.cf(cf::COLLECTIONS)?;
        let cf_collections_by_box = self.cf(cf::COLLECTIONS_BY_BOX)?;

        let mut batch = WriteBatch::default();
        for op in staged {
            match op {
                WriteOp::PutBox { record, expect } => {
                    let stored = self.get_box(&record.id)?.map(|b| b.version);
                    check_box(&record.id, stored, expect)?;
                    batch.put_cf(&cf_boxes, keys::box_key(&record.id), Self::serialize(&record)?);
                }
                WriteOp::PutContribution(contribution) => {
                    batch.put_cf(
                        &cf_contributions,
                        keys::contribution_key(&contribution.id),
                        Self::serialize(&contribution)?,
                    );
                    batch.put_cf(
                        &cf_contributions_by_box,
                        keys::box_contribution_key(&contribution.box_id, &contribution.id),
                        [],
                    );
                }
                WriteOp::DeleteContribution { id, box_id } => {
                    let belongs = self
                        .get_contribution(&id)?
                        .is_some_and(|existing| existing.box_id == box_id);
                    if !belongs {
                        return Err(StoreError::NotFound {
                            entity: "contribution",
                            id: id.to_string(),
                        });
                    }
                    batch.delete_cf(&cf_contributions, keys::contribution_key(&id));
                    batch.delete_cf(
                        &cf_contributions_by_box,
                        keys::box_contribution_key(&box_id, &id),
                    );
                }
                WriteOp::PutCollection(collection) => {
                    batch.put_cf(
                        &cf_collections,
                        keys::collection_key(&collection.id),
                        Self::serialize(&collection)?,
                    );
                    batch.put_cf(
                        &cf_collections_by_box,
                        keys::box_collection_key(&collection.box_id, &collection.id),
                        [],
                    );
                }
            }
        }

        self.write(batch)?;
        tracing::trace!(ops = op_count, "Committed write set");
        Ok(())
    }
}

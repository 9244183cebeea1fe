//! Cached reference data: currencies, currency types and tags.
//!
//! Each kind gets its own strongly typed cache with its own TTL. Inside a kind
//! an entity is reachable by ID, by natural key (currency code, type name, tag
//! name) and through one "all" list entry. Every write through this layer
//! drops all three so no index can serve a stale record. Misses fall through
//! to the store and are never errors.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sadaqah_core::{Currency, CurrencyId, CurrencyType, CurrencyTypeId, Tag, TagId};
use sadaqah_store::Store;

use crate::cache::TtlCache;
use crate::config::LedgerConfig;
use crate::error::{LedgerError, Result};

/// Key of a single cached entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum EntryKey<Id> {
    Id(Id),
    Natural(String),
}

/// Key of the bulk list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ListKey {
    All,
}

/// Cache for one reference kind.
struct KindCache<Id, E>
where
    Id: Hash + Eq + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    kind: &'static str,
    entries: TtlCache<EntryKey<Id>, E>,
    lists: TtlCache<ListKey, Arc<Vec<E>>>,
    id_of: fn(&E) -> Id,
}

impl<Id, E> KindCache<Id, E>
where
    Id: Hash + Eq + Clone + Send + Sync + fmt::Debug + fmt::Display + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn new(
        kind: &'static str,
        capacity: u64,
        ttl: Duration,
        id_of: fn(&E) -> Id,
    ) -> Self {
        Self {
            kind,
            entries: TtlCache::new(capacity, ttl),
            lists: TtlCache::new(4, ttl),
            id_of,
        }
    }

    /// Natural keys need not be unique, so only a natural-key load may fill a
    /// natural-key entry. An ID load fills the ID entry alone.
    fn lookup(
        &self,
        key: EntryKey<Id>,
        load: impl FnOnce() -> sadaqah_store::Result<Option<E>>,
    ) -> Result<Option<E>> {
        if let Some(hit) = self.entries.get(&key) {
            return Ok(Some(hit));
        }
        tracing::debug!(kind = self.kind, ?key, "Reference cache miss");

        let loaded = load()?;
        if let Some(entity) = &loaded {
            if matches!(key, EntryKey::Natural(_)) {
                self.entries
                    .insert(EntryKey::Id((self.id_of)(entity)), entity.clone());
            }
            self.entries.insert(key, entity.clone());
        }
        Ok(loaded)
    }

    fn by_id(&self, id: &Id, load: impl FnOnce() -> sadaqah_store::Result<Option<E>>) -> Result<Option<E>> {
        self.lookup(EntryKey::Id(id.clone()), load)
    }

    fn by_natural_key(
        &self,
        key: String,
        load: impl FnOnce() -> sadaqah_store::Result<Option<E>>,
    ) -> Result<Option<E>> {
        self.lookup(EntryKey::Natural(key), load)
    }

    fn all(&self, load: impl FnOnce() -> sadaqah_store::Result<Vec<E>>) -> Result<Arc<Vec<E>>> {
        let ttl = self.lists.default_ttl();
        self.lists.get_or_set(
            ListKey::All,
            || {
                tracing::debug!(kind = self.kind, "Reference list cache miss");
                load().map(Arc::new).map_err(LedgerError::from)
            },
            ttl,
        )
    }

    /// Drop the ID entry, every given natural key and the list entry.
    fn invalidate(&self, id: &Id, natural_keys: &[String]) {
        self.entries.delete(&EntryKey::Id(id.clone()));
        for key in natural_keys {
            self.entries.delete(&EntryKey::Natural(key.clone()));
        }
        self.lists.delete(&ListKey::All);
        tracing::debug!(kind = self.kind, id = %id, "Reference cache invalidated");
    }

    fn clear(&self) {
        self.entries.clear();
        self.lists.clear();
    }
}

fn normalise_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Read-through, write-invalidating access to reference data.
///
/// Constructed once per process (see [`crate::Engine`]) and shared by `Arc`.
pub struct ReferenceData {
    store: Arc<dyn Store>,
    currencies: KindCache<CurrencyId, Currency>,
    currency_types: KindCache<CurrencyTypeId, CurrencyType>,
    tags: KindCache<TagId, Tag>,
}

impl ReferenceData {
    /// Create the reference layer over `store` with TTLs from `config`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: &LedgerConfig) -> Self {
        Self {
            store,
            currencies: KindCache::new(
                "currency",
                config.cache_capacity,
                config.currency_ttl(),
                |c: &Currency| c.id,
            ),
            currency_types: KindCache::new(
                "currency type",
                config.cache_capacity,
                config.currency_type_ttl(),
                |t: &CurrencyType| t.id,
            ),
            tags: KindCache::new(
                "tag",
                config.cache_capacity,
                config.tag_ttl(),
                |t: &Tag| t.id,
            ),
        }
    }

    // =========================================================================
    // Currencies
    // =========================================================================

    /// Get a currency by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn currency(&self, currency_id: &CurrencyId) -> Result<Option<Currency>> {
        self.currencies
            .by_id(currency_id, || self.store.get_currency(currency_id))
    }

    /// Get a currency by code (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn currency_by_code(&self, code: &str) -> Result<Option<Currency>> {
        self.currencies
            .by_natural_key(normalise_code(code), || self.store.find_currency_by_code(code))
    }

    /// All currencies ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn currencies(&self) -> Result<Arc<Vec<Currency>>> {
        self.currencies.all(|| self.store.list_currencies())
    }

    /// Create a currency.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store write fails.
    pub fn create_currency(&self, currency: &Currency) -> Result<()> {
        self.store.put_currency(currency)?;
        self.invalidate_currency(currency);
        tracing::info!(currency_id = %currency.id, code = %currency.code, "Currency created");
        Ok(())
    }

    /// Correct an existing currency (rate, code, name, ...).
    ///
    /// # Errors
    ///
    /// Returns `CurrencyNotFound` if the currency does not exist.
    pub fn update_currency(&self, currency: &Currency) -> Result<Currency> {
        let previous = self
            .store
            .get_currency(&currency.id)?
            .ok_or_else(|| LedgerError::CurrencyNotFound {
                currency: currency.id.to_string(),
            })?;

        let mut updated = currency.clone();
        updated.code = normalise_code(&updated.code);
        updated.created_at = previous.created_at;
        updated.updated_at = Utc::now();

        self.store.put_currency(&updated)?;
        self.currencies.invalidate(
            &updated.id,
            &[normalise_code(&previous.code), normalise_code(&updated.code)],
        );
        tracing::info!(
            currency_id = %updated.id,
            code = %updated.code,
            usd_value = ?updated.usd_value,
            "Currency updated"
        );
        Ok(updated)
    }

    /// Delete a currency.
    ///
    /// # Errors
    ///
    /// Returns `CurrencyNotFound` if the currency does not exist.
    pub fn delete_currency(&self, currency_id: &CurrencyId) -> Result<()> {
        let previous = self
            .store
            .get_currency(currency_id)?
            .ok_or_else(|| LedgerError::CurrencyNotFound {
                currency: currency_id.to_string(),
            })?;
        self.store.delete_currency(currency_id)?;
        self.invalidate_currency(&previous);
        tracing::info!(currency_id = %currency_id, "Currency deleted");
        Ok(())
    }

    /// Invalidation hook for currency writes made outside this layer.
    pub fn invalidate_currency(&self, currency: &Currency) {
        self.currencies
            .invalidate(&currency.id, &[normalise_code(&currency.code)]);
    }

    // =========================================================================
    // Currency Types
    // =========================================================================

    /// Get a currency type by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn currency_type(&self, currency_type_id: &CurrencyTypeId) -> Result<Option<CurrencyType>> {
        self.currency_types
            .by_id(currency_type_id, || self.store.get_currency_type(currency_type_id))
    }

    /// Get a currency type by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn currency_type_by_name(&self, name: &str) -> Result<Option<CurrencyType>> {
        self.currency_types
            .by_natural_key(name.to_string(), || self.store.find_currency_type_by_name(name))
    }

    /// All currency types ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn currency_types(&self) -> Result<Arc<Vec<CurrencyType>>> {
        self.currency_types.all(|| self.store.list_currency_types())
    }

    /// Create a currency type.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if another type already uses the name.
    pub fn create_currency_type(&self, currency_type: &CurrencyType) -> Result<()> {
        self.store.put_currency_type(currency_type)?;
        self.invalidate_currency_type(currency_type);
        tracing::info!(currency_type_id = %currency_type.id, name = %currency_type.name, "Currency type created");
        Ok(())
    }

    /// Rename an existing currency type.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the type does not exist, `Duplicate` if the new
    /// name is taken.
    pub fn update_currency_type(&self, currency_type: &CurrencyType) -> Result<CurrencyType> {
        let previous = self
            .store
            .get_currency_type(&currency_type.id)?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "currency type",
                id: currency_type.id.to_string(),
            })?;

        let mut updated = currency_type.clone();
        updated.created_at = previous.created_at;
        updated.updated_at = Utc::now();

        self.store.put_currency_type(&updated)?;
        self.currency_types
            .invalidate(&updated.id, &[previous.name, updated.name.clone()]);
        Ok(updated)
    }

    /// Delete a currency type.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the type does not exist.
    pub fn delete_currency_type(&self, currency_type_id: &CurrencyTypeId) -> Result<()> {
        let previous = self
            .store
            .get_currency_type(currency_type_id)?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "currency type",
                id: currency_type_id.to_string(),
            })?;
        self.store.delete_currency_type(currency_type_id)?;
        self.invalidate_currency_type(&previous);
        Ok(())
    }

    /// Invalidation hook for currency type writes made outside this layer.
    pub fn invalidate_currency_type(&self, currency_type: &CurrencyType) {
        self.currency_types
            .invalidate(&currency_type.id, &[currency_type.name.clone()]);
    }

    // =========================================================================
    // Tags
    // =========================================================================

    /// Get a tag by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn tag(&self, tag_id: &TagId) -> Result<Option<Tag>> {
        self.tags.by_id(tag_id, || self.store.get_tag(tag_id))
    }

    /// Get a tag by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        self.tags
            .by_natural_key(name.to_string(), || self.store.find_tag_by_name(name))
    }

    /// All tags ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `StorageUnavailable` if the store fails on a miss.
    pub fn tags(&self) -> Result<Arc<Vec<Tag>>> {
        self.tags.all(|| self.store.list_tags())
    }

    /// Create a tag.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate` if another tag already uses the name.
    pub fn create_tag(&self, tag: &Tag) -> Result<()> {
        self.store.put_tag(tag)?;
        self.invalidate_tag(tag);
        tracing::info!(tag_id = %tag.id, name = %tag.name, "Tag created");
        Ok(())
    }

    /// Rename an existing tag.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tag does not exist, `Duplicate` if the new
    /// name is taken.
    pub fn update_tag(&self, tag: &Tag) -> Result<Tag> {
        let previous = self.store.get_tag(&tag.id)?.ok_or_else(|| LedgerError::NotFound {
            entity: "tag",
            id: tag.id.to_string(),
        })?;

        let mut updated = tag.clone();
        updated.created_at = previous.created_at;
        updated.updated_at = Utc::now();

        self.store.put_tag(&updated)?;
        self.tags.invalidate(&updated.id, &[previous.name, updated.name.clone()]);
        Ok(updated)
    }

    /// Delete a tag.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the tag does not exist.
    pub fn delete_tag(&self, tag_id: &TagId) -> Result<()> {
        let previous = self.store.get_tag(tag_id)?.ok_or_else(|| LedgerError::NotFound {
            entity: "tag",
            id: tag_id.to_string(),
        })?;
        self.store.delete_tag(tag_id)?;
        self.invalidate_tag(&previous);
        Ok(())
    }

    /// Invalidation hook for tag writes made outside this layer.
    pub fn invalidate_tag(&self, tag: &Tag) {
        self.tags.invalidate(&tag.id, &[tag.name.clone()]);
    }

    /// Drop every cached reference entry of every kind.
    pub fn clear(&self) {
        self.currencies.clear();
        self.currency_types.clear();
        self.tags.clear();
    }
}

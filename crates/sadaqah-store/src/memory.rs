//! In-memory storage implementation.
//!
//! `MemoryStore` keeps every table behind one `RwLock`. A commit validates all
//! staged operations under the write lock before applying any of them, which
//! gives the same all-or-nothing behaviour as the `RocksDB` backend.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use sadaqah_core::{
    BoxId, Collection, CollectionId, Currency, CurrencyId, CurrencyType, CurrencyTypeId, Sadaqah,
    SadaqahBox, SadaqahId, Tag, TagId,
};

use crate::batch::check_box;
use crate::error::{Result, StoreError};
use crate::{Store, WriteOp, WriteSet};

#[derive(Default)]
struct Tables {
    currencies: HashMap<CurrencyId, Currency>,
    currency_types: HashMap<CurrencyTypeId, CurrencyType>,
    tags: HashMap<TagId, Tag>,
    boxes: HashMap<BoxId, SadaqahBox>,
    contributions: BTreeMap<SadaqahId, Sadaqah>,
    collections: BTreeMap<CollectionId, Collection>,
}

/// Storage backed by process memory.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }

    fn validate(tables: &Tables, op: &WriteOp) -> Result<()> {
        match op {
            WriteOp::PutBox { record, expect } => check_box(
                &record.id,
                tables.boxes.get(&record.id).map(|b| b.version),
                *expect,
            ),
            WriteOp::DeleteContribution { id, box_id } => {
                if tables
                    .contributions
                    .get(id)
                    .is_some_and(|existing| existing.box_id == *box_id)
                {
                    Ok(())
                } else {
                    Err(StoreError::NotFound {
                        entity: "contribution",
                        id: id.to_string(),
                    })
                }
            }
            WriteOp::PutContribution(_) | WriteOp::PutCollection(_) => Ok(()),
        }
    }
}

impl Store for MemoryStore {
    fn put_currency(&self, currency: &Currency) -> Result<()> {
        self.write()?
            .currencies
            .insert(currency.id, currency.clone());
        Ok(())
    }

    fn get_currency(&self, currency_id: &CurrencyId) -> Result<Option<Currency>> {
        Ok(self.read()?.currencies.get(currency_id).cloned())
    }

    fn find_currency_by_code(&self, code: &str) -> Result<Option<Currency>> {
        let code = code.trim().to_uppercase();
        Ok(self
            .read()?
            .currencies
            .values()
            .filter(|c| c.code == code)
            .min_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then(a.id.as_bytes().cmp(b.id.as_bytes()))
            })
            .cloned())
    }

    fn list_currencies(&self) -> Result<Vec<Currency>> {
        let mut currencies: Vec<Currency> = self.read()?.currencies.values().cloned().collect();
        currencies.sort_by(|a, b| a.code.cmp(&b.code).then(a.created_at.cmp(&b.created_at)));
        Ok(currencies)
    }

    fn delete_currency(&self, currency_id: &CurrencyId) -> Result<()> {
        self.write()?
            .currencies
            .remove(currency_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                entity: "currency",
                id: currency_id.to_string(),
            })
    }

    fn put_currency_type(&self, currency_type: &CurrencyType) -> Result<()> {
        let mut tables = self.write()?;
        if tables
            .currency_types
            .values()
            .any(|t| t.name == currency_type.name && t.id != currency_type.id)
        {
            return Err(StoreError::Duplicate {
                entity: "currency type",
                key: currency_type.name.clone(),
            });
        }
        tables
            .currency_types
            .insert(currency_type.id, currency_type.clone());
        Ok(())
    }

    fn get_currency_type(&self, currency_type_id: &CurrencyTypeId) -> Result<Option<CurrencyType>> {
        Ok(self.read()?.currency_types.get(currency_type_id).cloned())
    }

    fn find_currency_type_by_name(&self, name: &str) -> Result<Option<CurrencyType>> {
        Ok(self
            .read()?
            .currency_types
            .values()
            .find(|t| t.name == name)
            .cloned())
    }

    fn list_currency_types(&self) -> Result<Vec<CurrencyType>> {
        let mut types: Vec<CurrencyType> = self.read()?.currency_types.values().cloned().collect();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }

    fn delete_currency_type(&self, currency_type_id: &CurrencyTypeId) -> Result<()> {
        self.write()?
            .currency_types
            .remove(currency_type_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                entity: "currency type",
                id: currency_type_id.to_string(),
            })
    }

    fn put_tag(&self, tag: &Tag) -> Result<()> {
        let mut tables = self.write()?;
        if tables
            .tags
            .values()
            .any(|t| t.name == tag.name && t.id != tag.id)
        {
            return Err(StoreError::Duplicate {
                entity: "tag",
                key: tag.name.clone(),
            });
        }
        tables.tags.insert(tag.id, tag.clone());
        Ok(())
    }

    fn get_tag(&self, tag_id: &TagId) -> Result<Option<Tag>> {
        Ok(self.read()?.tags.get(tag_id).cloned())
    }

    fn find_tag_by_name(&self, name: &str) -> Result<Option<Tag>> {
        Ok(self.read()?.tags.values().find(|t| t.name == name).cloned())
    }

    fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.read()?.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }

    fn delete_tag(&self, tag_id: &TagId) -> Result<()> {
        self.write()?
            .tags
            .remove(tag_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound {
                entity: "tag",
                id: tag_id.to_string(),
            })
    }

    fn get_box(&self, box_id: &BoxId) -> Result<Option<SadaqahBox>> {
        Ok(self.read()?.boxes.get(box_id).cloned())
    }

    fn get_contribution(&self, sadaqah_id: &SadaqahId) -> Result<Option<Sadaqah>> {
        Ok(self.read()?.contributions.get(sadaqah_id).cloned())
    }

    fn list_contributions_by_box(&self, box_id: &BoxId) -> Result<Vec<Sadaqah>> {
        Ok(self
            .read()?
            .contributions
            .values()
            .rev()
            .filter(|c| c.box_id == *box_id)
            .cloned()
            .collect())
    }

    fn get_collection(&self, collection_id: &CollectionId) -> Result<Option<Collection>> {
        Ok(self.read()?.collections.get(collection_id).cloned())
    }

    fn list_collections_by_box(&self, box_id: &BoxId) -> Result<Vec<Collection>> {
        Ok(self
            .read()?
            .collections
            .values()
            .rev()
            .filter(|c| c.box_id == *box_id)
            .cloned()
            .collect())
    }

    fn commit(&self, staged: WriteSet) -> Result<()> {
        let mut tables = self.write()?;
        for op in staged.ops() {
            Self::validate(&tables, op)?;
        }

        for op in staged {
            match op {
                WriteOp::PutBox { record, .. } => {
                    tables.boxes.insert(record.id, record);
                }
                WriteOp::PutContribution(contribution) => {
                    tables.contributions.insert(contribution.id, contribution);
                }
                WriteOp::DeleteContribution { id, .. } => {
                    tables.contributions.remove(&id);
                }
                WriteOp::PutCollection(collection) => {
                    tables.collections.insert(collection.id, collection);
                }
            }
        }
        Ok(())
    }
}

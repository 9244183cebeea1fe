//! Key encoding utilities for `RocksDB`.
//!
//! Primary keys are the raw 16 identifier bytes. Box-scoped indexes prepend
//! the box ID so a prefix scan lists one box, and since ULIDs are time-ordered
//! those entries come back in creation order.

use chrono::{DateTime, Utc};
use sadaqah_core::{BoxId, CollectionId, CurrencyId, CurrencyTypeId, SadaqahId, TagId};

/// Length of an `id || id` index key.
pub const PAIR_KEY_LEN: usize = 32;

/// Create a box key.
#[must_use]
pub fn box_key(box_id: &BoxId) -> Vec<u8> {
    box_id.as_bytes().to_vec()
}

/// Create a currency key.
#[must_use]
pub fn currency_key(currency_id: &CurrencyId) -> Vec<u8> {
    currency_id.as_bytes().to_vec()
}

/// Create a currency type key.
#[must_use]
pub fn currency_type_key(currency_type_id: &CurrencyTypeId) -> Vec<u8> {
    currency_type_id.as_bytes().to_vec()
}

/// Create a tag key.
#[must_use]
pub fn tag_key(tag_id: &TagId) -> Vec<u8> {
    tag_id.as_bytes().to_vec()
}

/// Create a contribution key.
#[must_use]
pub fn contribution_key(sadaqah_id: &SadaqahId) -> Vec<u8> {
    sadaqah_id.to_bytes().to_vec()
}

/// Create a collection key.
#[must_use]
pub fn collection_key(collection_id: &CollectionId) -> Vec<u8> {
    collection_id.to_bytes().to_vec()
}

/// Create a box-contribution index key.
///
/// Format: `box_id (16 bytes) || sadaqah_id (16 bytes)`
#[must_use]
pub fn box_contribution_key(box_id: &BoxId, sadaqah_id: &SadaqahId) -> Vec<u8> {
    let mut key = Vec::with_capacity(PAIR_KEY_LEN);
    key.extend_from_slice(box_id.as_bytes());
    key.extend_from_slice(&sadaqah_id.to_bytes());
    key
}

/// Create a box-collection index key.
///
/// Format: `box_id (16 bytes) || collection_id (16 bytes)`
#[must_use]
pub fn box_collection_key(box_id: &BoxId, collection_id: &CollectionId) -> Vec<u8> {
    let mut key = Vec::with_capacity(PAIR_KEY_LEN);
    key.extend_from_slice(box_id.as_bytes());
    key.extend_from_slice(&collection_id.to_bytes());
    key
}

/// Create a prefix for iterating all index entries of a box.
#[must_use]
pub fn box_prefix(box_id: &BoxId) -> Vec<u8> {
    box_id.as_bytes().to_vec()
}

/// Extract the trailing 16-byte identifier from an `id || id` index key.
///
/// Returns `None` if the key has the wrong length.
#[must_use]
pub fn pair_key_suffix(key: &[u8]) -> Option<[u8; 16]> {
    if key.len() != PAIR_KEY_LEN {
        return None;
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[16..PAIR_KEY_LEN]);
    Some(bytes)
}

/// Create a prefix for iterating currencies with a given code.
///
/// Format: `CODE || 0x00`
#[must_use]
pub fn currency_code_prefix(code: &str) -> Vec<u8> {
    let mut key = code.trim().to_uppercase().into_bytes();
    key.push(0);
    key
}

/// Create a currency code index key.
///
/// Format: `CODE || 0x00 || created_at millis (8 bytes, order-preserving) || currency_id`
///
/// Entries sharing a code sort oldest first.
#[must_use]
pub fn currency_code_key(code: &str, created_at: &DateTime<Utc>, currency_id: &CurrencyId) -> Vec<u8> {
    let mut key = currency_code_prefix(code);
    let millis = created_at.timestamp_millis() ^ i64::MIN;
    key.extend_from_slice(&millis.to_be_bytes());
    key.extend_from_slice(currency_id.as_bytes());
    key
}

/// Extract the currency ID from a currency code index key.
#[must_use]
pub fn currency_id_from_code_key(key: &[u8]) -> Option<CurrencyId> {
    let start = key.len().checked_sub(16)?;
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[start..]);
    Some(CurrencyId::from_bytes(bytes))
}

/// Create a natural-key index key from a name.
#[must_use]
pub fn name_key(name: &str) -> Vec<u8> {
    name.as_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn box_key_length() {
        assert_eq!(box_key(&BoxId::generate()).len(), 16);
    }

    #[test]
    fn box_contribution_key_format() {
        let box_id = BoxId::generate();
        let sadaqah_id = SadaqahId::generate();
        let key = box_contribution_key(&box_id, &sadaqah_id);

        assert_eq!(key.len(), PAIR_KEY_LEN);
        assert!(key.starts_with(&box_prefix(&box_id)));
        assert_eq!(pair_key_suffix(&key), Some(sadaqah_id.to_bytes()));
    }

    #[test]
    fn pair_key_suffix_rejects_short_keys() {
        assert_eq!(pair_key_suffix(&[0u8; 20]), None);
    }

    #[test]
    fn currency_code_keys_sort_oldest_first() {
        let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let a = currency_code_key("usd", &newer, &CurrencyId::generate());
        let b = currency_code_key("USD", &older, &CurrencyId::generate());

        assert!(a.starts_with(&currency_code_prefix("USD")));
        assert!(b < a);
    }

    #[test]
    fn currency_code_prefix_does_not_match_longer_codes() {
        let key = currency_code_key("USDT", &Utc::now(), &CurrencyId::generate());
        assert!(!key.starts_with(&currency_code_prefix("USD")));
    }

    #[test]
    fn currency_id_survives_code_key() {
        let id = CurrencyId::generate();
        let key = currency_code_key("EUR", &Utc::now(), &id);
        assert_eq!(currency_id_from_code_key(&key), Some(id));
    }
}

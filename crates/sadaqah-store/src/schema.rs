//! Column families used by the `RocksDB` backend.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Box records, keyed by `box_id`.
    pub const BOXES: &str = "boxes";

    /// Currency records, keyed by `currency_id`.
    pub const CURRENCIES: &str = "currencies";

    /// Index: currencies by code, keyed by `code || 0x00 || created_at || currency_id`.
    /// Value is empty (index only).
    pub const CURRENCIES_BY_CODE: &str = "currencies_by_code";

    /// Currency type records, keyed by `currency_type_id`.
    pub const CURRENCY_TYPES: &str = "currency_types";

    /// Index: currency types by name. Value is the `currency_type_id`.
    pub const CURRENCY_TYPES_BY_NAME: &str = "currency_types_by_name";

    /// Tag records, keyed by `tag_id`.
    pub const TAGS: &str = "tags";

    /// Index: tags by name. Value is the `tag_id`.
    pub const TAGS_BY_NAME: &str = "tags_by_name";

    /// Contribution records, keyed by `sadaqah_id` (ULID).
    pub const CONTRIBUTIONS: &str = "contributions";

    /// Index: contributions by box, keyed by `box_id || sadaqah_id`.
    /// Value is empty (index only).
    pub const CONTRIBUTIONS_BY_BOX: &str = "contributions_by_box";

    /// Collection records, keyed by `collection_id` (ULID).
    pub const COLLECTIONS: &str = "collections";

    /// Index: collections by box, keyed by `box_id || collection_id`.
    /// Value is empty (index only).
    pub const COLLECTIONS_BY_BOX: &str = "collections_by_box";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::BOXES,
        cf::CURRENCIES,
        cf::CURRENCIES_BY_CODE,
        cf::CURRENCY_TYPES,
        cf::CURRENCY_TYPES_BY_NAME,
        cf::TAGS,
        cf::TAGS_BY_NAME,
        cf::CONTRIBUTIONS,
        cf::CONTRIBUTIONS_BY_BOX,
        cf::COLLECTIONS,
        cf::COLLECTIONS_BY_BOX,
    ]
}

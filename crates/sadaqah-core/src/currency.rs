//! Reference data: currencies, currency types and tags.
//!
//! These records are read far more often than written. The ledger only reads
//! them (through a cache); administrative paths create and correct them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CurrencyId, CurrencyTypeId, TagId};

/// A currency with an optional USD-pegged reference value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Currency {
    /// Currency ID.
    pub id: CurrencyId,

    /// Three-letter reference code (e.g. `USD`, `XAU`).
    ///
    /// Codes are not guaranteed unique across currency types.
    pub code: String,

    /// Display name.
    pub name: String,

    /// Display symbol, if any.
    pub symbol: Option<String>,

    /// How many USD one unit of this currency is worth.
    ///
    /// `None` for currencies with no known peg.
    pub usd_value: Option<Decimal>,

    /// The type this currency belongs to, if classified.
    pub currency_type_id: Option<CurrencyTypeId>,

    /// When the currency was created.
    pub created_at: DateTime<Utc>,

    /// When the currency was last corrected.
    pub updated_at: DateTime<Utc>,
}

impl Currency {
    /// Create a new currency record.
    ///
    /// The code is normalised to upper case.
    #[must_use]
    pub fn new(code: &str, name: impl Into<String>, usd_value: Option<Decimal>) -> Self {
        let now = Utc::now();
        Self {
            id: CurrencyId::generate(),
            code: code.trim().to_uppercase(),
            name: name.into(),
            symbol: None,
            usd_value,
            currency_type_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the display symbol.
    #[must_use]
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    /// Attach the currency to a type.
    #[must_use]
    pub fn with_type(mut self, currency_type_id: CurrencyTypeId) -> Self {
        self.currency_type_id = Some(currency_type_id);
        self
    }

    /// The USD reference rate, if one is usable for conversion.
    ///
    /// A zero rate is treated the same as a missing one.
    #[must_use]
    pub fn usable_rate(&self) -> Option<Decimal> {
        self.usd_value.filter(|rate| !rate.is_zero())
    }
}

/// A grouping of currencies (fiat, metal, crypto, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyType {
    /// Currency type ID.
    pub id: CurrencyTypeId,

    /// Unique name; doubles as the natural key.
    pub name: String,

    /// When the type was created.
    pub created_at: DateTime<Utc>,

    /// When the type was last renamed.
    pub updated_at: DateTime<Utc>,
}

impl CurrencyType {
    /// Create a new currency type.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: CurrencyTypeId::generate(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// A free-form label attached to boxes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// Tag ID.
    pub id: TagId,

    /// Unique name; doubles as the natural key.
    pub name: String,

    /// When the tag was created.
    pub created_at: DateTime<Utc>,

    /// When the tag was last renamed.
    pub updated_at: DateTime<Utc>,
}

impl Tag {
    /// Create a new tag.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TagId::generate(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn new_currency_normalises_code() {
        let currency = Currency::new(" eur ", "Euro", Some(dec!(1.08)));
        assert_eq!(currency.code, "EUR");
        assert!(currency.symbol.is_none());
    }

    #[test]
    fn zero_rate_is_not_usable() {
        let currency = Currency::new("XXX", "Broken", Some(Decimal::ZERO));
        assert_eq!(currency.usable_rate(), None);

        let unpriced = Currency::new("ZZZ", "Unlisted", None);
        assert_eq!(unpriced.usable_rate(), None);

        let gold = Currency::new("XAU", "Gold", Some(dec!(2000)));
        assert_eq!(gold.usable_rate(), Some(dec!(2000)));
    }
}

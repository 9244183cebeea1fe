//! Core types for the sadaqah contribution ledger.
//!
//! This crate provides the foundational types shared by the store and the
//! ledger:
//!
//! - **Identifiers**: `BoxId`, `CurrencyId`, `SadaqahId`, `CollectionId`, ...
//! - **Reference data**: `Currency`, `CurrencyType`, `Tag`
//! - **Ledger rows**: `SadaqahBox`, `Sadaqah`, `Collection`
//! - **Conversion**: `to_canonical`, `MissingRatePolicy`
//!
//! # Canonical unit
//!
//! Contributions arrive in any currency. Box totals are kept in a single
//! canonical unit (by default one gram of gold, `XAU`), reached through each
//! currency's USD reference rate:
//!
//! - 10 USD at `usd_value = 1` with gold at `usd_value = 2000` → 0.005
//! - Amounts are `rust_decimal::Decimal`; nothing is rounded in storage.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod boxes;
pub mod contribution;
pub mod conversion;
pub mod currency;
pub mod ids;

pub use boxes::{BoxSummary, SadaqahBox};
pub use contribution::{Collection, CurrencyAmount, Sadaqah};
pub use conversion::{to_canonical, to_canonical_with_policy, ConversionError, MissingRatePolicy};
pub use currency::{Currency, CurrencyType, Tag};
pub use ids::{BoxId, CollectionId, CurrencyId, CurrencyTypeId, IdError, SadaqahId, TagId, UserId};

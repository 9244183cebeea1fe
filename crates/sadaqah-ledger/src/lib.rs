//! Contribution ledger and canonical-value engine.
//!
//! This crate turns contributions in arbitrary currencies into a consistent
//! per-box running total in one canonical unit:
//!
//! - [`Ledger`]: add, batch add, remove and collect, each committed atomically
//!   with optimistic concurrency on the box version
//! - [`ReferenceData`]: currencies, currency types and tags behind per-kind
//!   TTL caches that invalidate on every write
//! - [`TtlCache`]: the generic per-entry TTL cache underneath
//! - [`Engine`]: the store, reference data and ledger wired together
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal::Decimal;
//! use sadaqah_core::{Currency, UserId};
//! use sadaqah_ledger::{AddContribution, Engine, LedgerConfig};
//!
//! let engine = Engine::in_memory(LedgerConfig::default()).unwrap();
//! let gold = Currency::new("XAU", "Gold (gram)", Some(Decimal::from(2000)));
//! let usd = Currency::new("USD", "US Dollar", Some(Decimal::ONE));
//! engine.reference().create_currency(&gold).unwrap();
//! engine.reference().create_currency(&usd).unwrap();
//!
//! let owner = UserId::generate();
//! let sadaqah_box = engine.ledger().create_box(owner, "Ramadan", None).unwrap();
//! let outcome = engine
//!     .ledger()
//!     .add_contribution(AddContribution::new(sadaqah_box.id, Decimal::TEN, usd.id, owner))
//!     .unwrap();
//! assert_eq!(outcome.updated_box.total_value, Decimal::new(5, 3));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod reference;

pub use cache::TtlCache;
pub use config::LedgerConfig;
pub use engine::Engine;
pub use error::{LedgerError, Result};
pub use ledger::{AddContribution, AddOutcome, CollectOutcome, Ledger, RemoveOutcome};
pub use reference::ReferenceData;

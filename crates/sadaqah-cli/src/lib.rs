//! Operator command line for the sadaqah ledger.
//!
//! The binary parses a [`cli::Cli`], opens an [`sadaqah_ledger::Engine`] over
//! the configured `RocksDB` directory and prints the JSON returned by
//! [`commands::run`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cli;
pub mod commands;

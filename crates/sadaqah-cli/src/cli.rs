//! Command line definition.

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;
use sadaqah_core::{BoxId, SadaqahId, UserId};

/// Sadaqah box ledger.
#[derive(Debug, Parser)]
#[command(name = "sadaqah", version, about)]
pub struct Cli {
    /// `RocksDB` data directory (overrides the configured one).
    #[arg(long, global = true, env = "SADAQAH_DATA_DIR")]
    pub data_dir: Option<String>,

    /// Command to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage currencies and their USD reference rates.
    #[command(subcommand)]
    Currency(CurrencyCommand),

    /// Create and inspect boxes.
    #[command(subcommand)]
    #[command(name = "box")]
    Boxes(BoxCommand),

    /// Deposit into a box.
    Add(AddArgs),

    /// Remove one contribution from a box.
    Remove {
        /// Box the contribution sits in.
        box_id: BoxId,
        /// Contribution to remove.
        sadaqah_id: SadaqahId,
    },

    /// Empty a box into a collection.
    Collect {
        /// Box to empty.
        box_id: BoxId,
    },

    /// List the collections of a box, newest first.
    History {
        /// Box to list.
        box_id: BoxId,
    },
}

/// `currency` subcommands.
#[derive(Debug, Subcommand)]
pub enum CurrencyCommand {
    /// Register a currency.
    Add {
        /// ISO-style code, e.g. USD or XAU.
        #[arg(long)]
        code: String,
        /// Display name.
        #[arg(long)]
        name: String,
        /// USD value of one unit. Omit for a currency without a rate.
        #[arg(long)]
        rate: Option<Decimal>,
        /// Display symbol.
        #[arg(long)]
        symbol: Option<String>,
    },

    /// Correct the USD rate of a currency.
    SetRate {
        /// Currency code.
        code: String,
        /// New USD value of one unit.
        rate: Decimal,
    },

    /// List all currencies.
    List,
}

/// `box` subcommands.
#[derive(Debug, Subcommand)]
pub enum BoxCommand {
    /// Create an empty box.
    Create {
        /// Display name.
        #[arg(long)]
        name: String,
        /// Optional description.
        #[arg(long)]
        description: Option<String>,
        /// Owner; a new user ID is generated when omitted.
        #[arg(long)]
        owner: Option<UserId>,
    },

    /// Show a box with its live contributions.
    Show {
        /// Box to show.
        box_id: BoxId,
    },
}

/// Arguments of `add`.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Target box.
    pub box_id: BoxId,

    /// Amount per deposit.
    pub amount: Decimal,

    /// Currency code of the amount.
    pub currency: String,

    /// Fold this many identical deposits into one row.
    #[arg(long, short = 'n')]
    pub repeat: Option<u32>,

    /// Depositor; defaults to the box owner.
    #[arg(long)]
    pub owner: Option<UserId>,
}

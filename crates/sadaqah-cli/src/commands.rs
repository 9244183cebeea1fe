//! Command handlers. Each returns the JSON document printed on success.

use anyhow::{Context, Result};
use sadaqah_core::{Currency, UserId};
use sadaqah_ledger::{AddContribution, Engine, LedgerError};
use serde_json::{json, Value};

use crate::cli::{AddArgs, BoxCommand, Command, CurrencyCommand};

/// Dispatch one command against `engine`.
///
/// # Errors
///
/// Returns the ledger error, with context, when the command fails.
pub fn run(engine: &Engine, command: Command) -> Result<Value> {
    match command {
        Command::Currency(sub) => currency(engine, sub),
        Command::Boxes(sub) => boxes(engine, sub),
        Command::Add(args) => add(engine, args),
        Command::Remove { box_id, sadaqah_id } => {
            let outcome = engine
                .ledger()
                .remove_contribution(&box_id, &sadaqah_id)
                .with_context(|| format!("removing {sadaqah_id} from box {box_id}"))?;
            Ok(serde_json::to_value(outcome)?)
        }
        Command::Collect { box_id } => {
            let outcome = engine
                .ledger()
                .collect(&box_id)
                .with_context(|| format!("collecting box {box_id}"))?;
            Ok(serde_json::to_value(outcome)?)
        }
        Command::History { box_id } => {
            let collections = engine.ledger().list_collections(&box_id)?;
            Ok(serde_json::to_value(collections)?)
        }
    }
}

fn currency(engine: &Engine, command: CurrencyCommand) -> Result<Value> {
    let reference = engine.reference();
    match command {
        CurrencyCommand::Add {
            code,
            name,
            rate,
            symbol,
        } => {
            let mut currency = Currency::new(&code, name, rate);
            if let Some(symbol) = symbol {
                currency = currency.with_symbol(symbol);
            }
            reference.create_currency(&currency)?;
            Ok(serde_json::to_value(currency)?)
        }
        CurrencyCommand::SetRate { code, rate } => {
            let mut currency = reference
                .currency_by_code(&code)?
                .ok_or(LedgerError::CurrencyNotFound { currency: code })?;
            currency.usd_value = Some(rate);
            let updated = reference.update_currency(&currency)?;
            Ok(serde_json::to_value(updated)?)
        }
        CurrencyCommand::List => Ok(serde_json::to_value(reference.currencies()?.as_slice())?),
    }
}

fn boxes(engine: &Engine, command: BoxCommand) -> Result<Value> {
    match command {
        BoxCommand::Create {
            name,
            description,
            owner,
        } => {
            let owner = owner.unwrap_or_else(UserId::generate);
            let sadaqah_box = engine.ledger().create_box(owner, &name, description)?;
            Ok(serde_json::to_value(sadaqah_box)?)
        }
        BoxCommand::Show { box_id } => {
            let sadaqah_box = engine.ledger().get_box(&box_id)?;
            let contributions = engine.ledger().list_contributions(&box_id)?;
            Ok(json!({
                "box": sadaqah_box,
                "contributions": contributions,
            }))
        }
    }
}

fn add(engine: &Engine, args: AddArgs) -> Result<Value> {
    let currency = engine
        .reference()
        .currency_by_code(&args.currency)?
        .ok_or_else(|| LedgerError::CurrencyNotFound {
            currency: args.currency.clone(),
        })?;

    let owner = match args.owner {
        Some(owner) => owner,
        None => engine.ledger().get_box(&args.box_id)?.owner_id,
    };

    let mut request = AddContribution::new(args.box_id, args.amount, currency.id, owner);
    request.repeat_count = args.repeat;

    let outcome = engine
        .ledger()
        .add_contribution(request)
        .with_context(|| format!("adding {} {} to box {}", args.amount, currency.code, args.box_id))?;
    Ok(serde_json::to_value(outcome)?)
}

//! Command dispatch tests against an in-memory engine.

use clap::Parser;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use sadaqah_cli::{cli::Cli, commands};
use sadaqah_ledger::{Engine, LedgerConfig};

fn run(engine: &Engine, args: &[&str]) -> anyhow::Result<Value> {
    let cli = Cli::try_parse_from(std::iter::once("sadaqah").chain(args.iter().copied()))?;
    commands::run(engine, cli.command)
}

fn decimal(value: &Value) -> Decimal {
    value.as_str().unwrap().parse().unwrap()
}

fn seeded() -> Engine {
    let engine = Engine::in_memory(LedgerConfig::default()).unwrap();
    run(&engine, &["currency", "add", "--code", "XAU", "--name", "Gold", "--rate", "2000"]).unwrap();
    run(&engine, &["currency", "add", "--code", "usd", "--name", "US Dollar", "--rate", "1", "--symbol", "$"]).unwrap();
    engine
}

#[test]
fn currency_add_normalises_code() {
    let engine = seeded();
    let listed = run(&engine, &["currency", "list"]).unwrap();
    let codes: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["code"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["USD", "XAU"]);
}

#[test]
fn full_box_lifecycle() {
    let engine = seeded();

    let created = run(&engine, &["box", "create", "--name", "Ramadan"]).unwrap();
    let box_id = created["id"].as_str().unwrap().to_string();

    let added = run(&engine, &["add", &box_id, "10", "USD"]).unwrap();
    assert_eq!(decimal(&added["updated_box"]["total_value"]), dec!(0.005));

    let batch = run(&engine, &["add", &box_id, "10", "usd", "--repeat", "3"]).unwrap();
    assert_eq!(decimal(&batch["contribution"]["value"]), dec!(30));
    assert_eq!(batch["updated_box"]["count"], 2);

    let sadaqah_id = batch["contribution"]["id"].as_str().unwrap().to_string();
    let removed = run(&engine, &["remove", &box_id, &sadaqah_id]).unwrap();
    assert_eq!(decimal(&removed["updated_box"]["total_value"]), dec!(0.005));

    let shown = run(&engine, &["box", "show", &box_id]).unwrap();
    assert_eq!(shown["contributions"].as_array().unwrap().len(), 1);

    let collected = run(&engine, &["collect", &box_id]).unwrap();
    assert_eq!(decimal(&collected["collection"]["total_value"]), dec!(0.005));
    assert_eq!(collected["reset_box"]["count"], 0);

    let history = run(&engine, &["history", &box_id]).unwrap();
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[test]
fn set_rate_changes_later_conversions() {
    let engine = seeded();
    let created = run(&engine, &["box", "create", "--name", "Rates"]).unwrap();
    let box_id = created["id"].as_str().unwrap().to_string();

    run(&engine, &["currency", "set-rate", "XAU", "2500"]).unwrap();
    let added = run(&engine, &["add", &box_id, "10", "USD"]).unwrap();
    assert_eq!(decimal(&added["contribution"]["canonical_value"]), dec!(0.004));
}

#[test]
fn unknown_currency_code_fails() {
    let engine = seeded();
    let created = run(&engine, &["box", "create", "--name", "Box"]).unwrap();
    let box_id = created["id"].as_str().unwrap().to_string();

    let err = run(&engine, &["add", &box_id, "10", "GBP"]).unwrap_err();
    assert!(err.to_string().contains("GBP"));
}

#[test]
fn malformed_ids_are_rejected_by_parser() {
    let engine = seeded();
    assert!(run(&engine, &["collect", "not-a-box"]).is_err());
    assert!(run(&engine, &["add", "not-a-box", "10", "USD"]).is_err());
}

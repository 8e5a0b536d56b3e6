use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cadence_core::service::CadenceService;

use super::helpers::{format_amount, parse_date, truncate};

pub(crate) fn cmd_finance_add(
    svc: &CadenceService,
    description: &str,
    amount: f64,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let tx = svc.add_transaction(description, amount, date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tx)?);
    } else {
        let id = tx.id;
        let amount = format_amount(tx.amount);
        println!("Recorded [{id}] {amount}: {}", tx.description);
    }
    Ok(())
}

pub(crate) fn cmd_finance_list(svc: &CadenceService, json: bool) -> Result<()> {
    let txs = svc.transactions()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&txs)?);
        return Ok(());
    }

    if txs.is_empty() {
        eprintln!("No transactions recorded.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct TxRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Description")]
        description: String,
        #[tabled(rename = "Amount")]
        amount: String,
    }

    let rows: Vec<TxRow> = txs
        .iter()
        .map(|t| TxRow {
            id: t.id,
            date: t.date.format("%Y-%m-%d").to_string(),
            description: truncate(&t.description, 40),
            amount: format_amount(t.amount),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let balance = svc.balance()?;
    let net = format_amount(balance.net);
    println!("  BALANCE: {net}");

    Ok(())
}

pub(crate) fn cmd_finance_balance(svc: &CadenceService, json: bool) -> Result<()> {
    let balance = svc.balance()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&balance)?);
    } else {
        let income = format_amount(balance.income);
        let expense = format_amount(balance.expense);
        let net = format_amount(balance.net);
        println!("  INCOME:  {income}");
        println!("  EXPENSE: {expense}");
        println!("  NET:     {net}");
    }
    Ok(())
}

pub(crate) fn cmd_finance_delete(svc: &CadenceService, id: i64, json: bool) -> Result<()> {
    let deleted = svc.delete_transaction(id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": deleted }));
    } else if deleted {
        println!("Deleted transaction {id}");
    } else {
        eprintln!("Transaction {id} not found");
    }
    Ok(())
}

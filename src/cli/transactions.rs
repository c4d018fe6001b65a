use std::collections::HashMap;
use std::path::Path;

use comfy_table::{Cell, Table};

use crate::cli::{open_db, parse_date};
use crate::error::Result;
use crate::fmt::{money, parse_money, signed_money};
use crate::ledger::{self, NewManualTransaction, TransactionSearch};
use crate::models::{Origin, Transaction};
use crate::period::MonthKey;

pub fn add(amount: &str, category: &str, description: &str, date: Option<&str>, db: Option<&Path>) -> Result<()> {
    let amount = parse_money(amount)?;
    let date = date.map(parse_date).transpose()?;
    let conn = open_db(db)?;
    let txn = ledger::add_transaction(
        &conn,
        &NewManualTransaction { amount, category, description, date },
    )?;
    println!("Added transaction {}: {} on {}", txn.id, money(txn.amount), txn.date);
    Ok(())
}

pub fn list(month: Option<&str>, db: Option<&Path>) -> Result<()> {
    let month = month.map(str::parse::<MonthKey>).transpose()?;
    let conn = open_db(db)?;
    let txns = ledger::list_transactions(&conn, month)?;
    let title = match month {
        Some(m) => format!("Transactions for {m}"),
        None => "Transactions".to_string(),
    };
    print_transactions(&conn, &title, &txns)
}

pub struct SearchArgs<'a> {
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub amount: Option<&'a str>,
    pub all: bool,
}

pub fn search(args: SearchArgs<'_>, db: Option<&Path>) -> Result<()> {
    let amount = args.amount.map(parse_money).transpose()?;
    let conn = open_db(db)?;
    let txns = ledger::search_transactions(
        &conn,
        &TransactionSearch {
            description: args.description,
            category: args.category,
            amount,
            match_all: args.all,
        },
    )?;
    if txns.is_empty() {
        println!("No matching transactions.");
        return Ok(());
    }
    print_transactions(&conn, "Matching transactions", &txns)
}

fn print_transactions(conn: &rusqlite::Connection, title: &str, txns: &[Transaction]) -> Result<()> {
    let names: HashMap<i64, String> = ledger::list_categories(conn)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Category", "Amount", "Source"]);
    let mut total = 0;
    for txn in txns {
        total += txn.amount;
        let source = match &txn.origin {
            Origin::Manual => "manual".to_string(),
            Origin::Subscription { period, .. } => format!("sub {period}"),
        };
        table.add_row(vec![
            Cell::new(txn.id),
            Cell::new(txn.date),
            Cell::new(&txn.description),
            Cell::new(names.get(&txn.category_id).map(String::as_str).unwrap_or("?")),
            Cell::new(signed_money(txn.amount)),
            Cell::new(source),
        ]);
    }
    println!("{title}\n{table}");
    println!("{} transaction(s), net {}", txns.len(), money(total));
    Ok(())
}

pub fn delete(id: i64, db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    ledger::delete_transaction(&conn, id)?;
    println!("Deleted transaction {id}");
    Ok(())
}

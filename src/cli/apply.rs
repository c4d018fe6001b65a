use std::collections::HashMap;
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::resolve_db;
use crate::error::{Result, TallyError};
use crate::fmt::signed_money;
use crate::materializer::materialize;
use crate::models::Origin;
use crate::period::MonthKey;
use crate::store::SqliteStore;

pub fn run(month: Option<&str>, db: Option<&Path>) -> Result<()> {
    let target = MonthKey::parse_or_current(month)?;

    let db_path = resolve_db(db);
    if !db_path.exists() {
        return Err(TallyError::StoreUnavailable(format!(
            "no database at {}",
            db_path.display()
        )));
    }
    let mut store = SqliteStore::open(&db_path)?;
    let report = materialize(&mut store, Some(target))?;

    let target = report.target;
    let complete = report.is_complete();
    let failures: Vec<String> = report
        .failures()
        .filter_map(|o| o.failure.as_ref().map(|err| format!("{} {}: {err}", "failed".red().bold(), o.name)))
        .collect();
    let names: HashMap<i64, String> = report
        .outcomes
        .iter()
        .map(|o| (o.subscription_id, o.name.clone()))
        .collect();
    let created = report.into_transactions();

    if created.is_empty() {
        println!("Nothing due through {target}.");
    } else {
        let mut table = Table::new();
        table.set_header(vec!["ID", "Date", "Subscription", "Period", "Amount"]);
        for txn in &created {
            let (name, period) = match &txn.origin {
                Origin::Subscription { subscription_id, period } => {
                    (names.get(subscription_id).map(String::as_str).unwrap_or("?"), period.to_string())
                }
                Origin::Manual => ("?", String::new()),
            };
            table.add_row(vec![
                Cell::new(txn.id),
                Cell::new(txn.date),
                Cell::new(name),
                Cell::new(period),
                Cell::new(signed_money(txn.amount)),
            ]);
        }
        println!("Applied through {target}\n{table}");
        println!("{} transaction(s) created", created.len());
    }

    if complete {
        return Ok(());
    }
    for line in &failures {
        eprintln!("{line}");
    }
    Err(TallyError::ApplyIncomplete(failures.len()))
}

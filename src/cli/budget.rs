use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::budget::{self, Targets};
use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{money, parse_money, signed_money};
use crate::period::MonthKey;

pub fn income(month: &str, amount: &str, db: Option<&Path>) -> Result<()> {
    let month: MonthKey = month.parse()?;
    let cents = parse_money(amount)?;
    let conn = open_db(db)?;
    budget::set_income(&conn, month, cents)?;
    println!("Income for {month}: {}", money(cents));
    Ok(())
}

pub fn targets(needs: f64, wants: f64, savings: f64, db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    budget::set_targets(&conn, Targets { needs, wants, savings })?;
    println!("Targets: needs {needs}%, wants {wants}%, savings {savings}%");
    Ok(())
}

pub fn summary(month: Option<&str>, db: Option<&Path>) -> Result<()> {
    let month = MonthKey::parse_or_current(month)?;
    let conn = open_db(db)?;
    let summary = budget::month_summary(&conn, month)?;

    let mut table = Table::new();
    table.set_header(vec!["Group", "Target", "Planned", "Actual", "Remaining"]);
    for g in &summary.groups {
        let remaining = if g.remaining < 0 {
            money(g.remaining).red().bold().to_string()
        } else {
            money(g.remaining)
        };
        table.add_row(vec![
            Cell::new(g.group),
            Cell::new(format!("{:.0}%", g.target_pct)),
            Cell::new(money(g.planned)),
            Cell::new(money(g.actual)),
            Cell::new(remaining),
        ]);
    }
    if summary.uncategorized > 0 {
        table.add_row(vec![
            Cell::new("Uncategorized"),
            Cell::new("-"),
            Cell::new("-"),
            Cell::new(money(summary.uncategorized)),
            Cell::new("-"),
        ]);
    }
    let income = summary.income.map(money).unwrap_or_else(|| "(not set)".to_string());
    println!("Budget for {}  (income {income})\n{table}", summary.month);

    if !summary.by_category.is_empty() {
        let mut ctable = Table::new();
        ctable.set_header(vec!["Category", "Group", "Total"]);
        for c in &summary.by_category {
            ctable.add_row(vec![
                Cell::new(&c.name),
                Cell::new(c.group.map(|g| g.to_string()).unwrap_or_default()),
                Cell::new(signed_money(c.total)),
            ]);
        }
        ctable.add_row(vec![Cell::new("Net".bold()), Cell::new(""), Cell::new(signed_money(summary.net))]);
        println!("\nBy Category\n{ctable}");
    }
    Ok(())
}

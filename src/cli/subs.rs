use std::collections::HashMap;
use std::path::Path;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::fmt::{parse_money, signed_money};
use crate::ledger;
use crate::models::Cadence;
use crate::period::MonthKey;
use crate::subscriptions::{self, NewSubscription, SubscriptionEdit};

pub struct AddArgs<'a> {
    pub name: &'a str,
    pub amount: &'a str,
    pub category: &'a str,
    pub cadence: &'a str,
    pub day: u32,
    pub month_of_year: Option<u32>,
    pub start: Option<&'a str>,
    pub end: Option<&'a str>,
}

pub fn add(args: AddArgs<'_>, db: Option<&Path>) -> Result<()> {
    let new = NewSubscription {
        name: args.name,
        amount: parse_money(args.amount)?,
        category: args.category,
        cadence: Cadence::from_parts(args.cadence, args.day, args.month_of_year)?,
        start: MonthKey::parse_or_current(args.start)?,
        end: args.end.map(str::parse).transpose()?,
    };
    let conn = open_db(db)?;
    let sub = subscriptions::add_subscription(&conn, &new)?;
    println!(
        "Added subscription {}: {} {} {}, starting {}",
        sub.id,
        sub.name,
        signed_money(sub.amount),
        sub.cadence,
        sub.effective_start
    );
    Ok(())
}

pub fn list(db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    let names: HashMap<i64, String> = ledger::list_categories(&conn)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();
    let subs = subscriptions::list_subscriptions(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Amount", "Category", "Cadence", "Start", "End", "Applied", "Status"]);
    for sub in subs {
        let status = if sub.active {
            "active".green().to_string()
        } else {
            "inactive".dimmed().to_string()
        };
        table.add_row(vec![
            Cell::new(sub.id),
            Cell::new(&sub.name),
            Cell::new(signed_money(sub.amount)),
            Cell::new(names.get(&sub.category_id).map(String::as_str).unwrap_or("?")),
            Cell::new(sub.cadence),
            Cell::new(sub.effective_start),
            Cell::new(sub.effective_end.map(|m| m.to_string()).unwrap_or_default()),
            Cell::new(sub.last_applied_period.map(|p| p.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(status),
        ]);
    }
    println!("Subscriptions\n{table}");
    Ok(())
}

pub fn deactivate(id: i64, db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    subscriptions::deactivate(&conn, id)?;
    println!("Deactivated subscription {id}");
    Ok(())
}

pub fn activate(id: i64, resume: Option<&str>, db: Option<&Path>) -> Result<()> {
    let resume = MonthKey::parse_or_current(resume)?;
    let conn = open_db(db)?;
    let sub = subscriptions::activate(&conn, id, resume)?;
    println!("Activated subscription {id}, posting again from {}", sub.effective_start);
    Ok(())
}

pub struct EditArgs<'a> {
    pub name: Option<&'a str>,
    pub amount: Option<&'a str>,
    pub category: Option<&'a str>,
    pub cadence: Option<&'a str>,
    pub day: Option<u32>,
    pub month_of_year: Option<u32>,
    pub end: Option<&'a str>,
    pub no_end: bool,
}

pub fn edit(id: i64, args: EditArgs<'_>, db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    let current = subscriptions::get_subscription(&conn, id)?;

    let cadence = if args.cadence.is_some() || args.day.is_some() || args.month_of_year.is_some() {
        Some(Cadence::from_parts(
            args.cadence.unwrap_or(current.cadence.name()),
            args.day.unwrap_or(current.cadence.day()),
            args.month_of_year.or(current.cadence.anchor_month()),
        )?)
    } else {
        None
    };
    let end = if args.no_end {
        Some(None)
    } else {
        args.end.map(|e| e.parse::<MonthKey>().map(Some)).transpose()?
    };

    let edit = SubscriptionEdit {
        name: args.name,
        amount: args.amount.map(parse_money).transpose()?,
        category: args.category,
        cadence,
        end,
    };
    let sub = subscriptions::edit_subscription(&conn, id, &edit)?;
    println!("Updated subscription {}: {} {} {}", sub.id, sub.name, signed_money(sub.amount), sub.cadence);
    Ok(())
}

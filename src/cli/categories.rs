use std::path::Path;

use comfy_table::{Cell, Table};

use crate::cli::open_db;
use crate::error::Result;
use crate::ledger;
use crate::models::{CategoryKind, Group};

fn parse_group(raw: Option<&str>) -> Result<Option<Group>> {
    raw.map(str::parse).transpose()
}

pub fn add(name: &str, kind: &str, group: Option<&str>, db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    let kind: CategoryKind = kind.parse()?;
    let category = ledger::add_category(&conn, name, kind, parse_group(group)?)?;
    println!("Added category: {} ({})", category.name, category.kind.as_str());
    Ok(())
}

pub fn list(db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    let categories = ledger::list_categories(&conn)?;

    let mut table = Table::new();
    table.set_header(vec!["ID", "Name", "Kind", "Group"]);
    for cat in categories {
        table.add_row(vec![
            Cell::new(cat.id),
            Cell::new(cat.name),
            Cell::new(cat.kind.as_str()),
            Cell::new(cat.group.map(|g| g.to_string()).unwrap_or_default()),
        ]);
    }
    println!("Categories\n{table}");
    Ok(())
}

pub fn group(name: &str, group: Option<&str>, db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    let group = parse_group(group)?;
    ledger::set_category_group(&conn, name, group)?;
    match group {
        Some(g) => println!("{name} now counts toward {g}"),
        None => println!("{name} no longer counts toward any group"),
    }
    Ok(())
}

pub fn delete(name: &str, db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;
    ledger::delete_category(&conn, name)?;
    println!("Deleted category: {name}");
    Ok(())
}

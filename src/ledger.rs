use chrono::{Local, NaiveDate};
use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, TallyError};
use crate::models::{Category, CategoryKind, Group, Origin, Transaction};
use crate::period::MonthKey;
use crate::store::{transaction_from_row, TRANSACTION_COLUMNS};

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

fn category_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Category> {
    let kind: String = row.get(2)?;
    let group: Option<String> = row.get(3)?;
    let text_err = |col, e: TallyError| {
        rusqlite::Error::FromSqlConversionFailure(col, rusqlite::types::Type::Text, Box::new(e))
    };
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        kind: kind.parse().map_err(|e| text_err(2, e))?,
        group: group
            .map(|g| g.parse::<Group>())
            .transpose()
            .map_err(|e| text_err(3, e))?,
    })
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, kind, budget_group FROM categories \
         ORDER BY CASE kind WHEN 'income' THEN 0 ELSE 1 END, name ASC",
    )?;
    let categories = stmt
        .query_map([], category_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(categories)
}

/// Case-insensitive lookup by name.
pub fn find_category(conn: &Connection, name: &str) -> Result<Category> {
    conn.query_row(
        "SELECT id, name, kind, budget_group FROM categories WHERE name = ?1 COLLATE NOCASE",
        [name.trim()],
        category_from_row,
    )
    .optional()?
    .ok_or_else(|| TallyError::UnknownCategory(name.to_string()))
}

pub fn add_category(conn: &Connection, name: &str, kind: CategoryKind, group: Option<Group>) -> Result<Category> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TallyError::MissingName("Category"));
    }
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1 COLLATE NOCASE)",
        [name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(TallyError::DuplicateCategory(name.to_string()));
    }
    conn.execute(
        "INSERT INTO categories (name, kind, budget_group) VALUES (?1, ?2, ?3)",
        rusqlite::params![name, kind.as_str(), group.map(|g| g.as_str())],
    )?;
    Ok(Category {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        kind,
        group,
    })
}

/// Map a category to a budget group, or clear its mapping with `None`.
pub fn set_category_group(conn: &Connection, name: &str, group: Option<Group>) -> Result<()> {
    let category = find_category(conn, name)?;
    conn.execute(
        "UPDATE categories SET budget_group = ?1 WHERE id = ?2",
        rusqlite::params![group.map(|g| g.as_str()), category.id],
    )?;
    Ok(())
}

/// Number of (transactions, subscriptions) referencing a category.
pub fn usage_count(conn: &Connection, id: i64) -> Result<(i64, i64)> {
    let txn_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM transactions WHERE category_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    let sub_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM subscriptions WHERE category_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    Ok((txn_count, sub_count))
}

pub fn delete_category(conn: &Connection, name: &str) -> Result<()> {
    let category = find_category(conn, name)?;
    let (txns, subs) = usage_count(conn, category.id)?;
    if txns > 0 || subs > 0 {
        return Err(TallyError::CategoryInUse(category.name));
    }
    conn.execute("DELETE FROM categories WHERE id = ?1", [category.id])?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Manual transactions
// ---------------------------------------------------------------------------

pub struct NewManualTransaction<'a> {
    pub amount: i64,
    pub category: &'a str,
    pub description: &'a str,
    pub date: Option<NaiveDate>,
}

pub fn add_transaction(conn: &Connection, new: &NewManualTransaction<'_>) -> Result<Transaction> {
    let category = find_category(conn, new.category)?;
    let amount = category.kind.normalize(new.amount);
    let date = new.date.unwrap_or_else(|| Local::now().date_naive());
    let description = new.description.trim();
    conn.execute(
        "INSERT INTO transactions (date, amount, category_id, description) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![date, amount, category.id, description],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(id, amount, category = %category.name, "added manual transaction");
    Ok(Transaction {
        id,
        date,
        amount,
        category_id: category.id,
        description: description.to_string(),
        origin: Origin::Manual,
    })
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Transaction> {
    conn.query_row(
        &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?1"),
        [id],
        transaction_from_row,
    )
    .optional()?
    .ok_or(TallyError::UnknownTransaction(id))
}

/// Transactions ordered by date, optionally limited to one month.
pub fn list_transactions(conn: &Connection, month: Option<MonthKey>) -> Result<Vec<Transaction>> {
    let bounds = month.map(|m| (m.first_day(), m.last_day()));
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions \
         WHERE ?1 IS NULL OR date BETWEEN ?1 AND ?2 ORDER BY date, id"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![bounds.map(|b| b.0), bounds.map(|b| b.1)],
            transaction_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Criteria for [`search_transactions`]. Text matches are substrings,
/// case-insensitive; `amount` matches either sign.
#[derive(Debug, Default)]
pub struct TransactionSearch<'a> {
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub amount: Option<i64>,
    /// Require every given criterion instead of any one of them.
    pub match_all: bool,
}

/// Transactions matching the search, ordered by date. No criteria matches everything.
pub fn search_transactions(conn: &Connection, search: &TransactionSearch<'_>) -> Result<Vec<Transaction>> {
    use rusqlite::types::Value;

    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<Value> = Vec::new();
    if let Some(text) = search.description.map(str::trim).filter(|s| !s.is_empty()) {
        params.push(Value::Text(format!("%{text}%")));
        clauses.push(format!("description LIKE ?{}", params.len()));
    }
    if let Some(text) = search.category.map(str::trim).filter(|s| !s.is_empty()) {
        params.push(Value::Text(format!("%{text}%")));
        clauses.push(format!(
            "category_id IN (SELECT id FROM categories WHERE name LIKE ?{})",
            params.len()
        ));
    }
    if let Some(cents) = search.amount {
        params.push(Value::Integer(cents.abs()));
        clauses.push(format!("abs(amount) = ?{}", params.len()));
    }

    let filter = if clauses.is_empty() {
        String::new()
    } else {
        let joiner = if search.match_all { " AND " } else { " OR " };
        format!("WHERE {}", clauses.join(joiner))
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM transactions {filter} ORDER BY date, id"
    ))?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(params.iter()), transaction_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    tracing::debug!(criteria = clauses.len(), matched = rows.len(), "searched transactions");
    Ok(rows)
}

/// Delete a manual entry. Subscription entries are never removed; a manual
/// offsetting entry corrects them instead.
pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let txn = get_transaction(conn, id)?;
    if let Origin::Subscription { .. } = txn.origin {
        return Err(TallyError::ImmutableTransaction(id));
    }
    conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    Ok(())
}

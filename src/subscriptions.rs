//! The subscription registry: recurring definitions the engine materializes.

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, TallyError};
use crate::ledger::find_category;
use crate::models::{Cadence, Subscription};
use crate::period::MonthKey;
use crate::store::{subscription_from_row, SUBSCRIPTION_COLUMNS};

pub struct NewSubscription<'a> {
    pub name: &'a str,
    pub amount: i64,
    pub category: &'a str,
    pub cadence: Cadence,
    pub start: MonthKey,
    pub end: Option<MonthKey>,
}

/// Fields to change on an existing subscription; `None` leaves a field as is.
#[derive(Default)]
pub struct SubscriptionEdit<'a> {
    pub name: Option<&'a str>,
    pub amount: Option<i64>,
    pub category: Option<&'a str>,
    pub cadence: Option<Cadence>,
    pub end: Option<Option<MonthKey>>,
}

fn check_range(start: MonthKey, end: Option<MonthKey>) -> Result<()> {
    match end {
        Some(end) if end < start => Err(TallyError::InvalidRange {
            start: start.to_string(),
            end: end.to_string(),
        }),
        _ => Ok(()),
    }
}

pub fn add_subscription(conn: &Connection, new: &NewSubscription<'_>) -> Result<Subscription> {
    let name = new.name.trim();
    if name.is_empty() {
        return Err(TallyError::MissingName("Subscription"));
    }
    check_range(new.start, new.end)?;
    let category = find_category(conn, new.category)?;
    let amount = category.kind.normalize(new.amount);

    conn.execute(
        "INSERT INTO subscriptions (name, amount, category_id, cadence, anchor_day, anchor_month, effective_start, effective_end) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            name,
            amount,
            category.id,
            new.cadence.name(),
            new.cadence.day(),
            new.cadence.anchor_month(),
            new.start.to_string(),
            new.end.map(|m| m.to_string()),
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(id, name, cadence = %new.cadence, start = %new.start, "added subscription");
    get_subscription(conn, id)
}

pub fn get_subscription(conn: &Connection, id: i64) -> Result<Subscription> {
    conn.query_row(
        &format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = ?1"),
        [id],
        subscription_from_row,
    )
    .optional()?
    .ok_or(TallyError::UnknownSubscription(id))
}

pub fn list_subscriptions(conn: &Connection) -> Result<Vec<Subscription>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions ORDER BY is_active DESC, name, id"
    ))?;
    let subs = stmt
        .query_map([], subscription_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(subs)
}

/// Stop generating transactions. The marker stays where it is.
pub fn deactivate(conn: &Connection, id: i64) -> Result<()> {
    let updated = conn.execute("UPDATE subscriptions SET is_active = 0 WHERE id = ?1", [id])?;
    if updated == 0 {
        return Err(TallyError::UnknownSubscription(id));
    }
    tracing::info!(id, "deactivated subscription");
    Ok(())
}

/// Resume generating transactions from `resume_from`. Periods that fell due
/// while the subscription was inactive are not created.
pub fn activate(conn: &Connection, id: i64, resume_from: MonthKey) -> Result<Subscription> {
    let sub = get_subscription(conn, id)?;
    let start = sub.effective_start.max(resume_from);
    conn.execute(
        "UPDATE subscriptions SET is_active = 1, effective_start = ?1 WHERE id = ?2",
        rusqlite::params![start.to_string(), id],
    )?;
    tracing::info!(id, resume = %start, "activated subscription");
    get_subscription(conn, id)
}

/// Edit a definition. Transactions already created are left untouched.
pub fn edit_subscription(conn: &Connection, id: i64, edit: &SubscriptionEdit<'_>) -> Result<Subscription> {
    let mut sub = get_subscription(conn, id)?;

    if let Some(name) = edit.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(TallyError::MissingName("Subscription"));
        }
        sub.name = name.to_string();
    }
    if let Some(category) = edit.category {
        sub.category_id = find_category(conn, category)?.id;
    }
    if let Some(amount) = edit.amount {
        sub.amount = amount;
    }
    let kind: String = conn.query_row(
        "SELECT kind FROM categories WHERE id = ?1",
        [sub.category_id],
        |row| row.get(0),
    )?;
    sub.amount = kind.parse::<crate::models::CategoryKind>()?.normalize(sub.amount);
    if let Some(cadence) = edit.cadence {
        sub.cadence = cadence;
    }
    if let Some(end) = edit.end {
        sub.effective_end = end;
    }
    check_range(sub.effective_start, sub.effective_end)?;

    conn.execute(
        "UPDATE subscriptions SET name = ?1, amount = ?2, category_id = ?3, cadence = ?4, \
         anchor_day = ?5, anchor_month = ?6, effective_end = ?7 WHERE id = ?8",
        rusqlite::params![
            sub.name,
            sub.amount,
            sub.category_id,
            sub.cadence.name(),
            sub.cadence.day(),
            sub.cadence.anchor_month(),
            sub.effective_end.map(|m| m.to_string()),
            id,
        ],
    )?;
    Ok(sub)
}

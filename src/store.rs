//! The persistence seam between the materialization engine and SQLite.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use crate::db::get_connection;
use crate::error::{Result, TallyError};
use crate::models::{Cadence, Origin, Posting, Subscription, Transaction};
use crate::period::{MonthKey, PeriodKey};

/// A subscription row loaded for a run.
#[derive(Debug)]
pub enum Candidate {
    Ready(Subscription),
    /// The row exists but its stored definition could not be decoded.
    Unreadable { id: i64, name: String, reason: String },
}

/// What the engine needs from the ledger and subscription registry.
pub trait SubscriptionStore {
    /// Active subscriptions that started on or before `target`. Ended ones are
    /// included so periods up to their end can still be caught up.
    fn due_candidates(&self, target: MonthKey) -> Result<Vec<Candidate>>;

    /// Whether a transaction has already been posted for the period.
    fn transaction_exists(&self, subscription_id: i64, period: &PeriodKey) -> Result<bool>;

    /// Write the posting and advance the subscription's marker as one atomic
    /// unit. Returns `None` when the period had already been posted.
    fn commit_period(&mut self, posting: &Posting) -> Result<Option<Transaction>>;
}

/// A store handle backed by one SQLite connection, dropped with the handle.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = get_connection(db_path)
            .map_err(|e| TallyError::StoreUnavailable(format!("{}: {e}", db_path.display())))?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

pub(crate) const SUBSCRIPTION_COLUMNS: &str = "id, name, amount, category_id, cadence, anchor_day, anchor_month, \
     effective_start, effective_end, last_applied_period, is_active";

pub(crate) fn subscription_from_row(row: &Row<'_>) -> rusqlite::Result<Subscription> {
    let cadence: String = row.get(4)?;
    let day: u32 = row.get(5)?;
    let month: Option<u32> = row.get(6)?;
    let start: String = row.get(7)?;
    let end: Option<String> = row.get(8)?;
    let last: Option<String> = row.get(9)?;
    Ok(Subscription {
        id: row.get(0)?,
        name: row.get(1)?,
        amount: row.get(2)?,
        category_id: row.get(3)?,
        cadence: Cadence::from_parts(&cadence, day, month).map_err(|e| conversion(4, e))?,
        effective_start: start.parse().map_err(|e| conversion(7, e))?,
        effective_end: end
            .map(|s| s.parse::<MonthKey>())
            .transpose()
            .map_err(|e| conversion(8, e))?,
        last_applied_period: last
            .map(|s| s.parse::<PeriodKey>())
            .transpose()
            .map_err(|e| conversion(9, e))?,
        active: row.get(10)?,
    })
}

pub(crate) const TRANSACTION_COLUMNS: &str =
    "id, date, amount, category_id, description, subscription_id, period_key";

pub(crate) fn transaction_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let subscription_id: Option<i64> = row.get(5)?;
    let period: Option<String> = row.get(6)?;
    let origin = match (subscription_id, period) {
        (Some(subscription_id), Some(p)) => Origin::Subscription {
            subscription_id,
            period: p.parse().map_err(|e| conversion(6, e))?,
        },
        _ => Origin::Manual,
    };
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
        category_id: row.get(3)?,
        description: row.get(4)?,
        origin,
    })
}

fn is_decode_error(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::FromSqlConversionFailure(..) | rusqlite::Error::InvalidColumnType(..)
    )
}

fn conversion(column: usize, err: TallyError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

impl SubscriptionStore for SqliteStore {
    fn due_candidates(&self, target: MonthKey) -> Result<Vec<Candidate>> {
        let target = target.to_string();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions \
             WHERE is_active = 1 AND effective_start <= ?1 \
             ORDER BY id"
        ))?;
        let candidates = stmt
            .query_map([&target], |row| {
                let id: i64 = row.get(0)?;
                let name: String = row.get(1)?;
                match subscription_from_row(row) {
                    Ok(sub) => Ok(Candidate::Ready(sub)),
                    Err(e) if is_decode_error(&e) => Ok(Candidate::Unreadable {
                        id,
                        name,
                        reason: e.to_string(),
                    }),
                    Err(e) => Err(e),
                }
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    fn transaction_exists(&self, subscription_id: i64, period: &PeriodKey) -> Result<bool> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT 1 FROM transactions WHERE subscription_id = ?1 AND period_key = ?2")?;
        Ok(stmt.exists(rusqlite::params![subscription_id, period.to_string()])?)
    }

    fn commit_period(&mut self, posting: &Posting) -> Result<Option<Transaction>> {
        let period = posting.period.to_string();
        // IMMEDIATE takes the write lock before the existence check, so a
        // concurrent writer cannot slip in between check and insert.
        let tx = self.conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let marker: Option<String> = tx
            .query_row(
                "SELECT last_applied_period FROM subscriptions WHERE id = ?1",
                [posting.subscription_id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(TallyError::UnknownSubscription(posting.subscription_id))?;
        let marker = marker.map(|m| m.parse::<PeriodKey>()).transpose()?;

        let exists = tx
            .prepare_cached("SELECT 1 FROM transactions WHERE subscription_id = ?1 AND period_key = ?2")?
            .exists(rusqlite::params![posting.subscription_id, period])?;

        let created = if exists {
            tracing::debug!(
                subscription_id = posting.subscription_id,
                period = %posting.period,
                "period already posted"
            );
            None
        } else {
            tx.execute(
                "INSERT INTO transactions (date, amount, category_id, description, subscription_id, period_key) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    posting.date,
                    posting.amount,
                    posting.category_id,
                    posting.description,
                    posting.subscription_id,
                    period,
                ],
            )?;
            Some(Transaction {
                id: tx.last_insert_rowid(),
                date: posting.date,
                amount: posting.amount,
                category_id: posting.category_id,
                description: posting.description.clone(),
                origin: Origin::Subscription {
                    subscription_id: posting.subscription_id,
                    period: posting.period,
                },
            })
        };

        if marker.map_or(true, |m| m < posting.period) {
            tx.execute(
                "UPDATE subscriptions SET last_applied_period = ?1 WHERE id = ?2",
                rusqlite::params![period, posting.subscription_id],
            )?;
        }

        tx.commit()?;
        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;
    use chrono::NaiveDate;

    fn test_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("test.db")).unwrap();
        init_db(store.conn()).unwrap();
        (dir, store)
    }

    fn insert_sub(conn: &Connection, start: &str, end: Option<&str>, active: bool) -> i64 {
        conn.execute(
            "INSERT INTO subscriptions (name, amount, category_id, cadence, anchor_day, effective_start, effective_end, is_active) \
             VALUES ('Gym', -3000, 1, 'monthly', 5, ?1, ?2, ?3)",
            rusqlite::params![start, end, active],
        )
        .unwrap();
        conn.last_insert_rowid()
    }

    fn posting(subscription_id: i64, period: &str) -> Posting {
        let period: PeriodKey = period.parse().unwrap();
        Posting {
            subscription_id,
            period,
            date: period.covered_through().day(5),
            amount: -3000,
            category_id: 1,
            description: "SUB: Gym".into(),
        }
    }

    fn marker(store: &SqliteStore, id: i64) -> Option<String> {
        store
            .conn()
            .query_row("SELECT last_applied_period FROM subscriptions WHERE id = ?1", [id], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_due_candidates_filters_by_start_and_active() {
        let (_dir, store) = test_store();
        let open = insert_sub(store.conn(), "2024-01", None, true);
        insert_sub(store.conn(), "2024-09", None, true);
        let ended = insert_sub(store.conn(), "2023-01", Some("2023-12"), true);
        insert_sub(store.conn(), "2024-01", None, false);
        let bounded = insert_sub(store.conn(), "2024-01", Some("2024-06"), true);

        let ids: Vec<i64> = store
            .due_candidates("2024-06".parse().unwrap())
            .unwrap()
            .iter()
            .map(|c| match c {
                Candidate::Ready(sub) => sub.id,
                Candidate::Unreadable { id, .. } => *id,
            })
            .collect();
        assert_eq!(ids, vec![open, ended, bounded]);
    }

    #[test]
    fn test_undecodable_row_is_reported_not_fatal() {
        let (_dir, store) = test_store();
        let good = insert_sub(store.conn(), "2024-01", None, true);
        let bad = insert_sub(store.conn(), "2024-01", None, true);
        store
            .conn()
            .execute("UPDATE subscriptions SET last_applied_period = 'garbage' WHERE id = ?1", [bad])
            .unwrap();

        let candidates = store.due_candidates("2024-03".parse().unwrap()).unwrap();
        assert_eq!(candidates.len(), 2);
        assert!(matches!(&candidates[0], Candidate::Ready(sub) if sub.id == good));
        assert!(matches!(&candidates[1], Candidate::Unreadable { id, name, .. } if *id == bad && name == "Gym"));
    }

    #[test]
    fn test_commit_period_writes_transaction_and_marker() {
        let (_dir, mut store) = test_store();
        let id = insert_sub(store.conn(), "2024-01", None, true);

        let txn = store.commit_period(&posting(id, "2024-01")).unwrap().unwrap();
        assert_eq!(txn.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(
            txn.origin,
            Origin::Subscription { subscription_id: id, period: "2024-01".parse().unwrap() }
        );
        assert!(store.transaction_exists(id, &"2024-01".parse().unwrap()).unwrap());
        assert_eq!(marker(&store, id).as_deref(), Some("2024-01"));
    }

    #[test]
    fn test_commit_period_is_idempotent() {
        let (_dir, mut store) = test_store();
        let id = insert_sub(store.conn(), "2024-01", None, true);
        assert!(store.commit_period(&posting(id, "2024-01")).unwrap().is_some());
        assert!(store.commit_period(&posting(id, "2024-01")).unwrap().is_none());
        let count: i64 = store
            .conn()
            .query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_marker_never_moves_backwards() {
        let (_dir, mut store) = test_store();
        let id = insert_sub(store.conn(), "2024-01", None, true);
        store.commit_period(&posting(id, "2024-03")).unwrap();
        store.commit_period(&posting(id, "2024-02")).unwrap();
        assert_eq!(marker(&store, id).as_deref(), Some("2024-03"));
    }

    #[test]
    fn test_commit_for_unknown_subscription_fails() {
        let (_dir, mut store) = test_store();
        let err = store.commit_period(&posting(99, "2024-01")).unwrap_err();
        assert!(matches!(err, TallyError::UnknownSubscription(99)));
        let count: i64 = store
            .conn()
            .query_row("SELECT count(*) FROM transactions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_rejects_non_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.db");
        std::fs::write(&path, b"this is definitely not a sqlite database file at all").unwrap();
        match SqliteStore::open(&path) {
            Err(e) => assert!(e.is_store_unavailable()),
            Ok(store) => {
                let err = store.due_candidates("2024-01".parse().unwrap()).unwrap_err();
                assert!(err.is_store_unavailable(), "unexpected error: {err}");
            }
        }
    }
}

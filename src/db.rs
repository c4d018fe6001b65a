use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::Result;

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE,
    kind TEXT NOT NULL CHECK (kind IN ('income', 'expense')),
    budget_group TEXT CHECK (budget_group IN ('needs', 'wants', 'savings')),
    created_at TEXT DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS subscriptions (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    amount INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    cadence TEXT NOT NULL CHECK (cadence IN ('monthly', 'yearly')),
    anchor_day INTEGER NOT NULL CHECK (anchor_day BETWEEN 1 AND 31),
    anchor_month INTEGER CHECK (anchor_month BETWEEN 1 AND 12),
    effective_start TEXT NOT NULL,
    effective_end TEXT,
    last_applied_period TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE RESTRICT
);

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY,
    date TEXT NOT NULL,
    amount INTEGER NOT NULL,
    category_id INTEGER NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    subscription_id INTEGER,
    period_key TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    FOREIGN KEY (category_id) REFERENCES categories(id) ON DELETE RESTRICT,
    FOREIGN KEY (subscription_id) REFERENCES subscriptions(id)
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_transactions_subscription_period
    ON transactions (subscription_id, period_key)
    WHERE subscription_id IS NOT NULL;

CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions (date);

CREATE TABLE IF NOT EXISTS monthly_income (
    month TEXT PRIMARY KEY,
    amount INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS budget_targets (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    needs REAL NOT NULL,
    wants REAL NOT NULL,
    savings REAL NOT NULL
);
";

// (name, kind, budget_group)
const DEFAULT_CATEGORIES: &[(&str, &str, Option<&str>)] = &[
    ("Salary", "income", None),
    ("Other Income", "income", None),
    ("Housing", "expense", Some("needs")),
    ("Utilities", "expense", Some("needs")),
    ("Groceries", "expense", Some("needs")),
    ("Insurance", "expense", Some("needs")),
    ("Transport", "expense", Some("needs")),
    ("Dining Out", "expense", Some("wants")),
    ("Entertainment", "expense", Some("wants")),
    ("Subscriptions", "expense", Some("wants")),
    ("Savings", "expense", Some("savings")),
    ("Uncategorized", "expense", None),
];

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;

    let count: i64 = conn.query_row("SELECT count(*) FROM categories", [], |row| row.get(0))?;
    if count == 0 {
        for cat in DEFAULT_CATEGORIES {
            conn.execute(
                "INSERT INTO categories (name, kind, budget_group) VALUES (?1, ?2, ?3)",
                rusqlite::params![cat.0, cat.1, cat.2],
            )?;
        }
        tracing::debug!(count = DEFAULT_CATEGORIES.len(), "seeded default categories");
    }

    conn.execute(
        "INSERT OR IGNORE INTO budget_targets (id, needs, wants, savings) VALUES (1, 50, 30, 20)",
        [],
    )?;
    Ok(())
}

use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Failed to apply subscription {subscription_id} for {period}: {reason}")]
    SubscriptionCommitFailed {
        subscription_id: i64,
        period: String,
        reason: String,
    },

    #[error("Invalid month: {0:?} (expected YYYY-MM)")]
    InvalidMonthKey(String),

    #[error("Invalid amount: {0:?}")]
    InvalidAmount(String),

    #[error("Invalid date: {0:?} (expected YYYY-MM-DD)")]
    InvalidDate(String),

    #[error("Invalid cadence: {0}")]
    InvalidCadence(String),

    #[error("Invalid budget targets: {0}")]
    InvalidTargets(String),

    #[error("Invalid category kind: {0:?} (must be 'income' or 'expense')")]
    InvalidCategoryKind(String),

    #[error("Invalid group: {0:?} (must be needs, wants or savings)")]
    InvalidGroup(String),

    #[error("Invalid month range: end {end} is before start {start}")]
    InvalidRange { start: String, end: String },

    #[error("{0} name is required")]
    MissingName(&'static str),

    #[error("Category name already exists: {0}")]
    DuplicateCategory(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown subscription: {0}")]
    UnknownSubscription(i64),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(i64),

    #[error("Category {0:?} is still referenced by transactions or subscriptions")]
    CategoryInUse(String),

    #[error("Transaction {0} was created by a subscription; add an offsetting entry instead")]
    ImmutableTransaction(i64),

    #[error("{0} subscription(s) could not be applied; they will be retried on the next run")]
    ApplyIncomplete(usize),

    #[error("Settings error: {0}")]
    Settings(String),
}

impl TallyError {
    /// True when the database itself cannot be reached or read, as opposed to a
    /// single write being rejected.
    pub fn is_store_unavailable(&self) -> bool {
        match self {
            Self::StoreUnavailable(_) => true,
            Self::Db(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
            ),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TallyError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> TallyError {
        TallyError::Db(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(code),
            None,
        ))
    }

    #[test]
    fn test_connection_failures_are_unavailable() {
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_CANTOPEN).is_store_unavailable());
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_NOTADB).is_store_unavailable());
        assert!(sqlite_failure(rusqlite::ffi::SQLITE_IOERR).is_store_unavailable());
        assert!(TallyError::StoreUnavailable("gone".into()).is_store_unavailable());
    }

    #[test]
    fn test_write_failures_are_not_unavailable() {
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_CONSTRAINT).is_store_unavailable());
        assert!(!sqlite_failure(rusqlite::ffi::SQLITE_BUSY).is_store_unavailable());
        assert!(!TallyError::InvalidMonthKey("x".into()).is_store_unavailable());
    }
}

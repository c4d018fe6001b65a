pub mod apply;
pub mod backup;
pub mod budget;
pub mod categories;
pub mod init;
pub mod load;
pub mod status;
pub mod subs;
pub mod transactions;

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use rusqlite::Connection;

use crate::db::{get_connection, init_db};
use crate::error::{Result, TallyError};
use crate::settings::default_db_path;

/// Database path from `--db`, or the one under the configured data dir.
pub(crate) fn resolve_db(db: Option<&Path>) -> PathBuf {
    db.map(Path::to_path_buf).unwrap_or_else(default_db_path)
}

pub(crate) fn open_db(db: Option<&Path>) -> Result<Connection> {
    let path = resolve_db(db);
    if !path.exists() {
        return Err(TallyError::Settings(format!(
            "No database found at {}\nRun `tally init` to create one.",
            path.display()
        )));
    }
    let conn = get_connection(&path)?;
    init_db(&conn)?;
    Ok(conn)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| TallyError::InvalidDate(raw.to_string()))
}

#[derive(Parser)]
#[command(name = "tally", version, about = "Personal budget ledger with recurring subscriptions.")]
pub struct Cli {
    /// Use this database file instead of the configured one
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Set up tally: choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Switch to an existing tally data directory.
    Load {
        /// Path to data directory containing tally.db
        path: String,
    },
    /// Show current database and summary statistics.
    Status,
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/tally-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Manage categories.
    Categories {
        #[command(subcommand)]
        command: CategoriesCommands,
    },
    /// Record a manual transaction.
    Add {
        /// Amount, e.g. 12.50 (sign follows the category kind)
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Category name
        #[arg(long)]
        category: String,
        #[arg(long, default_value = "")]
        description: String,
        /// Date: YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },
    /// List transactions.
    List {
        /// Month filter: YYYY-MM
        #[arg(long)]
        month: Option<String>,
    },
    /// Find transactions by description, category or amount.
    Search {
        /// Text the description contains
        #[arg(long)]
        description: Option<String>,
        /// Text the category name contains
        #[arg(long)]
        category: Option<String>,
        /// Exact amount, either sign
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<String>,
        /// Require every criterion to match (default: any)
        #[arg(long)]
        all: bool,
    },
    /// Delete a manual transaction by ID.
    Delete {
        id: i64,
    },
    /// Manage recurring subscriptions.
    Subs {
        #[command(subcommand)]
        command: SubsCommands,
    },
    /// Create any subscription transactions due up to a month.
    Apply {
        /// Target month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Set monthly income and budget targets.
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
    /// Planned vs. actual spending for a month.
    Summary {
        /// Month: YYYY-MM (default: current month)
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesCommands {
    /// Add a category.
    Add {
        name: String,
        /// income or expense
        #[arg(long, default_value = "expense")]
        kind: String,
        /// needs, wants or savings
        #[arg(long)]
        group: Option<String>,
    },
    /// List all categories.
    List,
    /// Map a category to a budget group; omit the group to clear it.
    Group {
        name: String,
        group: Option<String>,
    },
    /// Delete an unused category.
    Delete {
        name: String,
    },
}

#[derive(Subcommand)]
pub enum SubsCommands {
    /// Add a subscription.
    Add {
        name: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
        #[arg(long)]
        category: String,
        /// monthly or yearly
        #[arg(long, default_value = "monthly")]
        cadence: String,
        /// Day of month to post on (clamped to the month's length)
        #[arg(long, default_value = "1")]
        day: u32,
        /// Month of year for yearly subscriptions
        #[arg(long = "month-of-year")]
        month_of_year: Option<u32>,
        /// First month: YYYY-MM (default: current month)
        #[arg(long)]
        start: Option<String>,
        /// Last month: YYYY-MM
        #[arg(long)]
        end: Option<String>,
    },
    /// List subscriptions.
    List,
    /// Stop creating transactions for a subscription.
    Deactivate {
        id: i64,
    },
    /// Resume a subscription.
    Activate {
        id: i64,
        /// First month to post again: YYYY-MM (default: current month)
        #[arg(long)]
        resume: Option<String>,
    },
    /// Change a subscription. Past transactions are left alone.
    Edit {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_hyphen_values = true)]
        amount: Option<String>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        cadence: Option<String>,
        #[arg(long)]
        day: Option<u32>,
        #[arg(long = "month-of-year")]
        month_of_year: Option<u32>,
        #[arg(long, conflicts_with = "no_end")]
        end: Option<String>,
        /// Remove the end month
        #[arg(long = "no-end")]
        no_end: bool,
    },
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Record income for a month.
    Income {
        /// Month: YYYY-MM
        month: String,
        amount: String,
    },
    /// Set the needs/wants/savings split (must sum to 100).
    Targets {
        #[arg(long)]
        needs: f64,
        #[arg(long)]
        wants: f64,
        #[arg(long)]
        savings: f64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tally", "apply", "--month", "2024-03", "--db", "/tmp/x.db", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.db.as_deref(), Some(Path::new("/tmp/x.db")));
        assert!(matches!(cli.command, Commands::Apply { month: Some(ref m) } if m == "2024-03"));
    }

    #[test]
    fn test_search_flags() {
        let cli = Cli::try_parse_from(["tally", "search", "--amount", "-4.50", "--category", "dining", "--all"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Search { description: None, category: Some(ref c), amount: Some(ref a), all: true }
                if c == "dining" && a == "-4.50"
        ));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2024-02-29").unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
        assert!(matches!(parse_date("2023-02-29"), Err(TallyError::InvalidDate(_))));
    }
}

use std::path::Path;

use crate::cli::{open_db, resolve_db};
use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::load_settings;

pub fn run(db: Option<&Path>) -> Result<()> {
    let settings = load_settings();
    let db_path = resolve_db(db);

    println!("Data dir:       {}", settings.data_dir);
    println!("Database:       {}", db_path.display());

    if !db_path.exists() {
        println!();
        println!("Database not found. Run `tally init` to set up.");
        return Ok(());
    }

    let size = std::fs::metadata(&db_path)?.len();
    println!("DB size:        {}", format_bytes(size));

    let conn = open_db(db)?;
    let count = |sql: &str| conn.query_row(sql, [], |r| r.get::<_, i64>(0));
    let categories = count("SELECT count(*) FROM categories")?;
    let transactions = count("SELECT count(*) FROM transactions")?;
    let generated = count("SELECT count(*) FROM transactions WHERE subscription_id IS NOT NULL")?;
    let active = count("SELECT count(*) FROM subscriptions WHERE is_active = 1")?;
    let inactive = count("SELECT count(*) FROM subscriptions WHERE is_active = 0")?;

    println!();
    println!("Categories:     {categories}");
    println!("Transactions:   {transactions} ({generated} from subscriptions)");
    println!("Subscriptions:  {active} active, {inactive} inactive");
    Ok(())
}

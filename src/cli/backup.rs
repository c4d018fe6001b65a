use std::path::{Path, PathBuf};

use rusqlite::backup::Backup;

use crate::cli::{open_db, resolve_db};
use crate::error::Result;
use crate::fmt::format_bytes;

pub fn run(output: Option<String>, db: Option<&Path>) -> Result<()> {
    let conn = open_db(db)?;

    let dest_path = match output {
        Some(p) => PathBuf::from(p),
        None => {
            let db_path = resolve_db(db);
            let backups_dir = db_path
                .parent()
                .map(|p| p.join("backups"))
                .unwrap_or_else(|| PathBuf::from("backups"));
            std::fs::create_dir_all(&backups_dir)?;
            let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
            backups_dir.join(format!("tally-{stamp}.db"))
        }
    };

    let mut dest_conn = rusqlite::Connection::open(&dest_path)?;
    let backup = Backup::new(&conn, &mut dest_conn)?;
    backup.run_to_completion(100, std::time::Duration::from_millis(10), None)?;

    let size = std::fs::metadata(&dest_path)?.len();
    println!("Backup saved to {}", dest_path.display());
    println!("Size: {}", format_bytes(size));
    Ok(())
}

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_file_exists, shellexpand_path, DB_FILE};

pub fn run(data_dir: Option<String>, db: Option<&Path>) -> Result<()> {
    if let Some(path) = db {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = get_connection(path)?;
        init_db(&conn)?;
        println!("Initialized database at {}", path.display());
        return Ok(());
    }

    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    } else if !settings_file_exists() && std::io::stdin().is_terminal() {
        println!("Data directory [{}]: ", settings.data_dir);
        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;
        let chosen = input.trim();
        if !chosen.is_empty() {
            settings.data_dir = shellexpand_path(chosen);
        }
    }

    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(resolved.join("backups"))?;

    let conn = get_connection(&resolved.join(DB_FILE))?;
    init_db(&conn)?;
    tracing::info!(data_dir = %resolved.display(), "initialized");

    println!("Initialized tally at {}", resolved.display());
    Ok(())
}

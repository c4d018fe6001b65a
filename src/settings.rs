use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TallyError};

pub const DB_FILE: &str = "tally.db";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tally")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("tally")
}

/// Settings from disk, or the defaults when the file is missing or unreadable.
pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed settings");
            Settings::default()
        })
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| TallyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn settings_file_exists() -> bool {
    settings_path().exists()
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn default_db_path() -> PathBuf {
    get_data_dir().join(DB_FILE)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_json_shape() {
        let settings = Settings { data_dir: "/tmp/tally".to_string() };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        assert!(json.contains("\"data_dir\": \"/tmp/tally\""));
        let loaded: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.data_dir, "/tmp/tally");
    }

    #[test]
    fn test_default_data_dir() {
        let s = Settings::default();
        assert!(s.data_dir.ends_with("tally"));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let json = r#"{"data_dir": "/srv/books", "theme": "dark"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.data_dir, "/srv/books");
    }

    #[test]
    fn test_shellexpand_tilde() {
        if let Some(home) = dirs::home_dir() {
            let expanded = shellexpand_path("~/ledger");
            assert_eq!(expanded, format!("{}/ledger", home.to_string_lossy()));
        }
    }

    #[test]
    fn test_shellexpand_canonicalizes_existing_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let canonical = std::fs::canonicalize(dir.path()).unwrap();
        assert_eq!(shellexpand_path(&dir.path().to_string_lossy()), canonical.to_string_lossy());
    }
}

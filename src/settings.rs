use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::db::DB_FILE;
use crate::error::{Result, TallyError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_dir_string")]
    pub data_dir: String,
    #[serde(default)]
    pub user_name: String,
}

fn default_data_dir_string() -> String {
    default_data_dir().to_string_lossy().to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir_string(),
            user_name: String::new(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("tally")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("tally")
}

/// Load settings, falling back to defaults when the file is missing or unreadable.
pub fn load_settings() -> Settings {
    let path = settings_path();
    if !path.exists() {
        return Settings::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => parse_settings(&content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read settings; using defaults");
            Settings::default()
        }
    }
}

fn parse_settings(content: &str) -> Settings {
    serde_json::from_str(content).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "invalid settings file; using defaults");
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| TallyError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    tracing::debug!(path = %settings_path().display(), "settings saved");
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn get_db_path() -> PathBuf {
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
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            user_name: "Alice".to_string(),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded = parse_settings(&content);
        assert_eq!(loaded.user_name, "Alice");
        assert_eq!(loaded.data_dir, "/tmp/test");
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert!(s.user_name.is_empty());
        assert!(s.data_dir.ends_with("tally"));
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let s = parse_settings(r#"{"user_name": "Bob"}"#);
        assert_eq!(s.user_name, "Bob");
        assert_eq!(s.data_dir, Settings::default().data_dir);
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let s = parse_settings("{not json");
        assert_eq!(s.data_dir, Settings::default().data_dir);
    }

    #[test]
    fn test_shellexpand_tilde() {
        if let Some(home) = dirs::home_dir() {
            let expanded = shellexpand_path("~/books");
            assert_eq!(expanded, format!("{}/books", home.to_string_lossy()));
        }
    }
}

use std::path::{Path, PathBuf};

use crate::db::{get_connection, DB_FILE};
use crate::error::{Result, TallyError};
use crate::settings::{load_settings, save_settings, shellexpand_path};

const REQUIRED_TABLES: [&str; 3] = ["transactions", "clients", "invoices"];

/// Open `db_path` and check that it holds the tally schema.
fn verify_database(db_path: &Path) -> Result<()> {
    let rejected = |reason: String| {
        TallyError::Settings(format!("{} is not a tally database ({reason})", db_path.display()))
    };

    let conn = get_connection(db_path).map_err(|e| rejected(e.to_string()))?;
    let found: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN (?1, ?2, ?3)",
            REQUIRED_TABLES,
            |r| r.get(0),
        )
        .map_err(|e| rejected(e.to_string()))?;
    if found < REQUIRED_TABLES.len() as i64 {
        return Err(rejected(format!(
            "expected tables: {}",
            REQUIRED_TABLES.join(", ")
        )));
    }
    Ok(())
}

pub fn run(path: &str) -> Result<()> {
    let data_dir = PathBuf::from(shellexpand_path(path));
    let db_path = data_dir.join(DB_FILE);
    if !db_path.is_file() {
        return Err(TallyError::Settings(format!(
            "No database found at {}\nRun `tally init --data-dir {}` to create one.",
            db_path.display(),
            data_dir.display()
        )));
    }
    verify_database(&db_path)?;

    let mut settings = load_settings();
    settings.data_dir = data_dir.to_string_lossy().into_owned();
    save_settings(&settings)?;

    tracing::info!(data_dir = %data_dir.display(), "switched data directory");
    println!("Switched to {}", data_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_db;

    #[test]
    fn test_accepts_initialized_database() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(DB_FILE);
        init_db(&get_connection(&db_path).unwrap()).unwrap();
        assert!(verify_database(&db_path).is_ok());
    }

    #[test]
    fn test_rejects_file_that_is_not_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(DB_FILE);
        std::fs::write(&db_path, "date,amount\n2024-01-01,5\n".repeat(50)).unwrap();
        let err = verify_database(&db_path).unwrap_err();
        assert!(matches!(err, TallyError::Settings(_)));
        assert!(err.to_string().contains("is not a tally database"));
    }

    #[test]
    fn test_rejects_sqlite_without_tally_tables() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(DB_FILE);
        let conn = get_connection(&db_path).unwrap();
        conn.execute_batch("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT);")
            .unwrap();
        drop(conn);
        let err = verify_database(&db_path).unwrap_err();
        assert!(err.to_string().contains("expected tables: transactions, clients, invoices"));
    }
}

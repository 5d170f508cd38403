use std::path::{Path, PathBuf};

use rusqlite::backup::Backup;
use rusqlite::Connection;

use crate::error::Result;
use crate::fmt::format_bytes;
use crate::settings::get_data_dir;

/// Default destination: `<data_dir>/backups/tally-YYYYMMDD-HHMMSS.db`.
fn default_destination(data_dir: &Path) -> Result<PathBuf> {
    let backups_dir = data_dir.join("backups");
    std::fs::create_dir_all(&backups_dir)?;
    let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S");
    Ok(backups_dir.join(format!("tally-{stamp}.db")))
}

/// Copy the live database page by page into `dest`.
pub fn backup_to(conn: &Connection, dest: &Path) -> Result<u64> {
    let mut dest_conn = Connection::open(dest)?;
    let backup = Backup::new(conn, &mut dest_conn)?;
    backup.run_to_completion(100, std::time::Duration::from_millis(10), None)?;
    drop(backup);
    Ok(std::fs::metadata(dest)?.len())
}

pub fn run(output: Option<String>) -> Result<()> {
    let conn = super::open_db()?;
    let dest_path = match output {
        Some(p) => PathBuf::from(p),
        None => default_destination(&get_data_dir())?,
    };

    let size = backup_to(&conn, &dest_path)?;
    tracing::info!(dest = %dest_path.display(), size, "backup written");
    println!("Backup saved to {}", dest_path.display());
    println!("Size: {}", format_bytes(size));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};
    use crate::ledger::{insert_transaction, list_transactions};
    use crate::models::{NewTransaction, TransactionKind};

    #[test]
    fn test_backup_copies_rows() {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("live.db")).unwrap();
        init_db(&conn).unwrap();
        insert_transaction(
            &conn,
            &NewTransaction {
                date: "2024-01-05".into(),
                description: "Rent".into(),
                kind: TransactionKind::Expense,
                category: Some("Rent".into()),
                amount: 950.0,
            },
        )
        .unwrap();

        let dest = dir.path().join("copy.db");
        let size = backup_to(&conn, &dest).unwrap();
        assert!(size > 0);

        let copy = get_connection(&dest).unwrap();
        let rows = list_transactions(&copy).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "Rent");
    }

    #[test]
    fn test_default_destination_name() {
        let dir = tempfile::tempdir().unwrap();
        let dest = default_destination(dir.path()).unwrap();
        assert!(dest.parent().unwrap().ends_with("backups"));
        let name = dest.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("tally-") && name.ends_with(".db"), "{name}");
    }
}

use rusqlite::Connection;

use crate::error::{Result, TallyError};
use crate::models::non_empty;

/// A client with the sum of its pending invoices.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClientRow {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub outstanding: f64,
}

pub fn add_client(
    conn: &Connection,
    name: &str,
    email: Option<&str>,
    phone: Option<&str>,
    address: Option<&str>,
) -> Result<i64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(TallyError::Invalid("Name is required".into()));
    }
    conn.execute(
        "INSERT INTO clients (name, email, phone, address) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![name, non_empty(email), non_empty(phone), non_empty(address)],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(id, "inserted client");
    Ok(id)
}

pub fn list_clients(conn: &Connection) -> Result<Vec<ClientRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.name, c.email, c.phone, c.address, \
         COALESCE(SUM(CASE WHEN i.status = 'pending' THEN i.amount ELSE 0 END), 0.0) as outstanding \
         FROM clients c LEFT JOIN invoices i ON i.client_id = c.id \
         GROUP BY c.id ORDER BY c.name COLLATE NOCASE, c.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(ClientRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                phone: row.get(3)?,
                address: row.get(4)?,
                outstanding: row.get(5)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn client_count(conn: &Connection) -> Result<i64> {
    Ok(conn.query_row("SELECT COUNT(*) FROM clients", [], |row| row.get(0))?)
}

pub fn client_exists(conn: &Connection, id: i64) -> Result<bool> {
    Ok(conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM clients WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?)
}

/// Why a client cannot be deleted, or None if deletion is safe.
pub fn blocking_reason(conn: &Connection, id: i64) -> Result<Option<String>> {
    let invoices: i64 = conn.query_row(
        "SELECT COUNT(*) FROM invoices WHERE client_id = ?1",
        [id],
        |row| row.get(0),
    )?;
    if invoices > 0 {
        let noun = if invoices == 1 { "invoice" } else { "invoices" };
        return Ok(Some(format!("Cannot delete: client has {invoices} {noun}")));
    }
    Ok(None)
}

pub fn delete_client(conn: &Connection, id: i64) -> Result<()> {
    if let Some(reason) = blocking_reason(conn, id)? {
        return Err(TallyError::Invalid(reason));
    }
    let removed = conn.execute("DELETE FROM clients WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(TallyError::NotFound(format!("Client not found: id {id}")));
    }
    tracing::debug!(id, "deleted client");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{get_connection, init_db};

    fn test_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_add_and_list_clients() {
        let (_dir, conn) = test_conn();
        add_client(&conn, "Zeta LLC", None, None, None).unwrap();
        let id = add_client(&conn, "acme corp", Some("ap@acme.test"), Some(" "), Some("1 Main St")).unwrap();

        let clients = list_clients(&conn).unwrap();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].id, id, "ordering ignores case");
        assert_eq!(clients[0].email.as_deref(), Some("ap@acme.test"));
        assert!(clients[0].phone.is_none(), "blank phone stored as NULL");
        assert_eq!(clients[0].outstanding, 0.0);
        assert_eq!(client_count(&conn).unwrap(), 2);
    }

    #[test]
    fn test_add_empty_name_rejected() {
        let (_dir, conn) = test_conn();
        let err = add_client(&conn, "   ", None, None, None).unwrap_err();
        assert!(err.to_string().contains("Name is required"));
    }

    #[test]
    fn test_outstanding_counts_pending_only() {
        let (_dir, conn) = test_conn();
        let id = add_client(&conn, "Acme", None, None, None).unwrap();
        conn.execute(
            "INSERT INTO invoices (number, client_id, amount, status) VALUES ('A-1', ?1, 100.0, 'pending')",
            [id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO invoices (number, client_id, amount, status) VALUES ('A-2', ?1, 250.5, 'pending')",
            [id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO invoices (number, client_id, amount, status) VALUES ('A-3', ?1, 999.0, 'paid')",
            [id],
        )
        .unwrap();
        let clients = list_clients(&conn).unwrap();
        assert_eq!(clients[0].outstanding, 350.5);
    }

    #[test]
    fn test_delete_client() {
        let (_dir, conn) = test_conn();
        let id = add_client(&conn, "Temp", None, None, None).unwrap();
        assert!(client_exists(&conn, id).unwrap());
        delete_client(&conn, id).unwrap();
        assert!(!client_exists(&conn, id).unwrap());
    }

    #[test]
    fn test_delete_client_with_invoices_blocked() {
        let (_dir, conn) = test_conn();
        let id = add_client(&conn, "Busy", None, None, None).unwrap();
        conn.execute(
            "INSERT INTO invoices (number, client_id, amount) VALUES ('B-1', ?1, 10.0)",
            [id],
        )
        .unwrap();
        let err = delete_client(&conn, id).unwrap_err();
        assert!(err.to_string().contains("Cannot delete"));
        assert!(err.to_string().contains("1 invoice"));
        assert!(client_exists(&conn, id).unwrap());
    }

    #[test]
    fn test_delete_nonexistent_client() {
        let (_dir, conn) = test_conn();
        let err = delete_client(&conn, 404).unwrap_err();
        assert!(err.to_string().contains("Client not found"));
    }
}

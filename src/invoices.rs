use rusqlite::Connection;

use crate::clients::client_exists;
use crate::error::{Result, TallyError};
use crate::models::{check_amount, parse_date, Invoice, InvoiceStatus};

pub fn add_invoice(
    conn: &Connection,
    number: &str,
    client_id: Option<i64>,
    amount: f64,
    issue_date: Option<&str>,
    due_date: Option<&str>,
) -> Result<i64> {
    let number = number.trim();
    if number.is_empty() {
        return Err(TallyError::Invalid("Invoice number is required".into()));
    }
    check_amount(amount)?;

    let issue = match issue_date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => parse_date(d)?,
        None => chrono::Local::now().date_naive(),
    };
    let due = match due_date.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => Some(parse_date(d)?),
        None => None,
    };
    if let Some(due) = due {
        if due < issue {
            return Err(TallyError::Invalid(format!(
                "Due date {due} is before issue date {issue}"
            )));
        }
    }

    if let Some(id) = client_id {
        if !client_exists(conn, id)? {
            return Err(TallyError::NotFound(format!("Unknown client: id {id}")));
        }
    }

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM invoices WHERE number = ?1)",
        [number],
        |row| row.get(0),
    )?;
    if exists {
        return Err(TallyError::Invalid(format!(
            "Invoice number already exists: {number}"
        )));
    }

    conn.execute(
        "INSERT INTO invoices (number, client_id, amount, status, issue_date, due_date) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            number,
            client_id,
            amount,
            InvoiceStatus::Pending,
            issue.to_string(),
            due.map(|d| d.to_string())
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(id, number, "inserted invoice");
    Ok(id)
}

pub fn list_invoices(conn: &Connection) -> Result<Vec<Invoice>> {
    let mut stmt = conn.prepare(
        "SELECT i.id, i.number, i.client_id, c.name, i.amount, COALESCE(i.status, 'pending'), \
         i.issue_date, i.due_date \
         FROM invoices i LEFT JOIN clients c ON i.client_id = c.id \
         ORDER BY i.issue_date DESC, i.id DESC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(Invoice {
                id: row.get(0)?,
                number: row.get(1)?,
                client_id: row.get(2)?,
                client_name: row.get(3)?,
                amount: row.get(4)?,
                status: row.get(5)?,
                issue_date: row.get(6)?,
                due_date: row.get(7)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn set_invoice_status(conn: &Connection, id: i64, status: InvoiceStatus) -> Result<()> {
    let updated = conn.execute(
        "UPDATE invoices SET status = ?1 WHERE id = ?2",
        rusqlite::params![status, id],
    )?;
    if updated == 0 {
        return Err(TallyError::NotFound(format!("Invoice not found: id {id}")));
    }
    tracing::debug!(id, status = %status, "invoice status changed");
    Ok(())
}

/// Remove an invoice. Returns `false` when no such invoice existed.
pub fn delete_invoice(conn: &Connection, id: i64) -> Result<bool> {
    let removed = conn.execute("DELETE FROM invoices WHERE id = ?1", [id])?;
    tracing::debug!(id, removed, "delete invoice");
    Ok(removed > 0)
}

pub fn outstanding_total(conn: &Connection) -> Result<f64> {
    Ok(conn.query_row(
        "SELECT COALESCE(SUM(amount), 0.0) FROM invoices WHERE status = 'pending'",
        [],
        |row| row.get(0),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::add_client;
    use crate::db::{get_connection, init_db};

    fn test_conn() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    #[test]
    fn test_add_and_list_invoice() {
        let (_dir, conn) = test_conn();
        let client = add_client(&conn, "Acme", None, None, None).unwrap();
        let id = add_invoice(&conn, "INV-001", Some(client), 1500.5, Some("2025-01-10"), Some("2025-02-10")).unwrap();

        let invoices = list_invoices(&conn).unwrap();
        assert_eq!(invoices.len(), 1);
        let inv = &invoices[0];
        assert_eq!(inv.id, id);
        assert_eq!(inv.client_name.as_deref(), Some("Acme"));
        assert_eq!(inv.amount, 1500.5);
        assert_eq!(inv.status, InvoiceStatus::Pending);
        assert_eq!(inv.issue_date.as_deref(), Some("2025-01-10"));
        assert_eq!(inv.due_date.as_deref(), Some("2025-02-10"));
    }

    #[test]
    fn test_issue_date_defaults_to_today() {
        let (_dir, conn) = test_conn();
        add_invoice(&conn, "INV-T", None, 1.0, None, None).unwrap();
        let today = chrono::Local::now().date_naive().to_string();
        assert_eq!(list_invoices(&conn).unwrap()[0].issue_date.as_deref(), Some(today.as_str()));
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let (_dir, conn) = test_conn();
        add_invoice(&conn, "INV-1", None, 10.0, Some("2025-01-01"), None).unwrap();
        let err = add_invoice(&conn, " INV-1 ", None, 20.0, Some("2025-01-02"), None).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_unknown_client_rejected() {
        let (_dir, conn) = test_conn();
        let err = add_invoice(&conn, "INV-9", Some(77), 10.0, None, None).unwrap_err();
        assert!(err.to_string().contains("Unknown client"));
    }

    #[test]
    fn test_due_before_issue_rejected() {
        let (_dir, conn) = test_conn();
        let err = add_invoice(&conn, "INV-2", None, 10.0, Some("2025-03-01"), Some("2025-02-01")).unwrap_err();
        assert!(err.to_string().contains("before issue date"));
    }

    #[test]
    fn test_invalid_amount_and_number() {
        let (_dir, conn) = test_conn();
        assert!(add_invoice(&conn, "INV-3", None, -1.0, None, None).is_err());
        let err = add_invoice(&conn, "  ", None, 1.0, None, None).unwrap_err();
        assert!(err.to_string().contains("number is required"));
    }

    #[test]
    fn test_status_and_outstanding() {
        let (_dir, conn) = test_conn();
        let a = add_invoice(&conn, "INV-A", None, 100.0, Some("2025-01-01"), None).unwrap();
        add_invoice(&conn, "INV-B", None, 50.0, Some("2025-01-02"), None).unwrap();
        assert_eq!(outstanding_total(&conn).unwrap(), 150.0);

        set_invoice_status(&conn, a, InvoiceStatus::Paid).unwrap();
        assert_eq!(outstanding_total(&conn).unwrap(), 50.0);
        let inv = list_invoices(&conn).unwrap().into_iter().find(|i| i.id == a).unwrap();
        assert_eq!(inv.status, InvoiceStatus::Paid);

        let err = set_invoice_status(&conn, 999, InvoiceStatus::Paid).unwrap_err();
        assert!(err.to_string().contains("Invoice not found"));
    }

    #[test]
    fn test_delete_invoice() {
        let (_dir, conn) = test_conn();
        let id = add_invoice(&conn, "INV-D", None, 10.0, None, None).unwrap();
        assert!(delete_invoice(&conn, id).unwrap());
        assert!(!delete_invoice(&conn, id).unwrap());
        assert!(list_invoices(&conn).unwrap().is_empty());
    }

    #[test]
    fn test_list_orders_newest_issue_first() {
        let (_dir, conn) = test_conn();
        add_invoice(&conn, "OLD", None, 1.0, Some("2024-12-01"), None).unwrap();
        add_invoice(&conn, "NEW", None, 1.0, Some("2025-01-01"), None).unwrap();
        let numbers: Vec<String> = list_invoices(&conn).unwrap().into_iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec!["NEW", "OLD"]);
    }
}

use std::io::Write;

use rusqlite::{Connection, OptionalExtension};

use crate::error::{Result, TallyError};
use crate::models::{check_amount, non_empty, parse_date, NewTransaction, Transaction, TransactionKind};

const SELECT_COLUMNS: &str =
    "SELECT id, date, description, type, category, amount, created_at FROM transactions";

const ORDER: &str = "ORDER BY date DESC, id DESC";

// ---------------------------------------------------------------------------
// Filter
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    /// Inclusive bounds, `YYYY-MM-DD`.
    pub from: Option<String>,
    pub to: Option<String>,
}

impl TransactionFilter {
    pub fn is_empty(&self) -> bool {
        self.kind.is_none() && self.category.is_none() && self.from.is_none() && self.to.is_none()
    }

    /// Short label like `type: income, from: 2025-01-01, to: 2025-01-31`.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(kind) = self.kind {
            parts.push(format!("type: {kind}"));
        }
        if let Some(ref cat) = self.category {
            parts.push(format!("category: {cat}"));
        }
        if let Some(ref from) = self.from {
            parts.push(format!("from: {from}"));
        }
        if let Some(ref to) = self.to {
            parts.push(format!("to: {to}"));
        }
        if parts.is_empty() {
            "all transactions".to_string()
        } else {
            parts.join(", ")
        }
    }

    fn where_clause(&self) -> Result<(String, Vec<String>)> {
        let mut clauses = Vec::new();
        let mut params: Vec<String> = Vec::new();

        if let Some(kind) = self.kind {
            params.push(kind.as_str().to_string());
            clauses.push(format!("type = ?{}", params.len()));
        }
        if let Some(cat) = non_empty(self.category.as_deref()) {
            params.push(cat);
            clauses.push(format!("category = ?{}", params.len()));
        }
        match (self.from.as_deref(), self.to.as_deref()) {
            (Some(from), Some(to)) => {
                let from = parse_date(from)?;
                let to = parse_date(to)?;
                if from > to {
                    return Err(TallyError::Invalid(format!(
                        "--from ({from}) must not be after --to ({to})"
                    )));
                }
                params.push(from.to_string());
                params.push(to.to_string());
                clauses.push(format!(
                    "date BETWEEN ?{} AND ?{}",
                    params.len() - 1,
                    params.len()
                ));
            }
            (Some(_), None) => {
                return Err(TallyError::Invalid(
                    "--from requires --to (both date boundaries must be specified)".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(TallyError::Invalid(
                    "--to requires --from (both date boundaries must be specified)".to_string(),
                ));
            }
            (None, None) => {}
        }

        if clauses.is_empty() {
            Ok((String::new(), params))
        } else {
            Ok((format!("WHERE {}", clauses.join(" AND ")), params))
        }
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn row_to_transaction(row: &rusqlite::Row) -> rusqlite::Result<Transaction> {
    let description: Option<String> = row.get(2)?;
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        description: description.unwrap_or_default(),
        kind: row.get(3)?,
        category: row.get(4)?,
        amount: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn query_transactions(conn: &Connection, clause: &str, params: &[String]) -> Result<Vec<Transaction>> {
    let sql = format!("{SELECT_COLUMNS} {clause} {ORDER}");
    let mut stmt = conn.prepare(&sql)?;
    let param_values: Vec<&dyn rusqlite::types::ToSql> = params
        .iter()
        .map(|p| p as &dyn rusqlite::types::ToSql)
        .collect();
    let rows = stmt
        .query_map(param_values.as_slice(), row_to_transaction)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every transaction, newest date first.
pub fn list_transactions(conn: &Connection) -> Result<Vec<Transaction>> {
    query_transactions(conn, "", &[])
}

pub fn filter_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
    let (clause, params) = filter.where_clause()?;
    query_transactions(conn, &clause, &params)
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let sql = format!("{SELECT_COLUMNS} WHERE id = ?1");
    let txn = conn.query_row(&sql, [id], row_to_transaction).optional()?;
    Ok(txn)
}

// ---------------------------------------------------------------------------
// Mutations
// ---------------------------------------------------------------------------

/// Validate a row and return its canonical date.
fn validate(txn: &NewTransaction) -> Result<String> {
    let date = parse_date(&txn.date)?;
    check_amount(txn.amount)?;
    Ok(date.to_string())
}

pub fn insert_transaction(conn: &Connection, txn: &NewTransaction) -> Result<i64> {
    let date = validate(txn)?;
    conn.execute(
        "INSERT INTO transactions (date, description, type, category, amount) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            date,
            txn.description.trim(),
            txn.kind,
            non_empty(txn.category.as_deref()),
            txn.amount
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(id, kind = %txn.kind, amount = txn.amount, "inserted transaction");
    Ok(id)
}

pub fn update_transaction(conn: &Connection, id: i64, txn: &NewTransaction) -> Result<()> {
    let date = validate(txn)?;
    let updated = conn.execute(
        "UPDATE transactions SET date = ?1, description = ?2, type = ?3, category = ?4, amount = ?5 WHERE id = ?6",
        rusqlite::params![
            date,
            txn.description.trim(),
            txn.kind,
            non_empty(txn.category.as_deref()),
            txn.amount,
            id
        ],
    )?;
    if updated == 0 {
        return Err(TallyError::NotFound(format!("Transaction not found: id {id}")));
    }
    tracing::debug!(id, "updated transaction");
    Ok(())
}

/// Remove a row by id. Returns `false` when no such row existed.
pub fn delete_transaction(conn: &Connection, id: i64) -> Result<bool> {
    let removed = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    tracing::debug!(id, removed, "delete transaction");
    Ok(removed > 0)
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LedgerSummary {
    pub total_income: f64,
    pub total_expenses: f64,
    pub net: f64,
    pub count: i64,
}

pub fn summary(conn: &Connection) -> Result<LedgerSummary> {
    let (total_income, total_expenses, count): (f64, f64, i64) = conn.query_row(
        "SELECT \
         COALESCE(SUM(CASE WHEN type = 'income' THEN amount ELSE 0 END), 0.0), \
         COALESCE(SUM(CASE WHEN type = 'expense' THEN amount ELSE 0 END), 0.0), \
         COUNT(*) \
         FROM transactions",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;
    Ok(LedgerSummary {
        total_income,
        total_expenses,
        net: total_income - total_expenses,
        count,
    })
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Write rows as CSV with a header line.
pub fn export_csv<W: Write>(rows: &[Transaction], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        wtr.write_record(["id", "date", "description", "type", "category", "amount", "created_at"])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

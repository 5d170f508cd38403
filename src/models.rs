use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::Serialize;

use crate::error::{Result, TallyError};

/// Upper bound of the amount input, shared by transactions and invoices.
pub const MAX_AMOUNT: f64 = 100_000_000.0;

/// Categories offered by the dashboard forms. The column itself is free text.
pub const DEFAULT_CATEGORIES: &[&str] = &["Salary", "Rent", "Services", "Goods", "Other"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    pub const ALL: [TransactionKind; 2] = [TransactionKind::Income, TransactionKind::Expense];

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionKind::Income),
            "expense" => Ok(TransactionKind::Expense),
            other => Err(TallyError::Invalid(format!(
                "Invalid transaction type: {other} (must be 'income' or 'expense')"
            ))),
        }
    }
}

impl ToSql for TransactionKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: TallyError| FromSqlError::Other(e.to_string().into()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Cancelled,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }

    /// Next status in the pending -> paid -> cancelled cycle.
    pub fn next(self) -> Self {
        match self {
            InvoiceStatus::Pending => InvoiceStatus::Paid,
            InvoiceStatus::Paid => InvoiceStatus::Cancelled,
            InvoiceStatus::Cancelled => InvoiceStatus::Pending,
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InvoiceStatus {
    type Err = TallyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(InvoiceStatus::Pending),
            "paid" => Ok(InvoiceStatus::Paid),
            "cancelled" => Ok(InvoiceStatus::Cancelled),
            other => Err(TallyError::Invalid(format!(
                "Invalid invoice status: {other} (must be 'pending', 'paid' or 'cancelled')"
            ))),
        }
    }
}

impl ToSql for InvoiceStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for InvoiceStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: TallyError| FromSqlError::Other(e.to_string().into()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: i64,
    pub date: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub amount: f64,
    pub created_at: Option<String>,
}

/// Editable fields of a ledger row, used for both insert and update.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub date: String,
    pub description: String,
    pub kind: TransactionKind,
    pub category: Option<String>,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Invoice {
    pub id: i64,
    pub number: String,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub amount: f64,
    pub status: InvoiceStatus,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
}

/// Parse a `YYYY-MM-DD` date, returning it in canonical form.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| TallyError::Invalid(format!("Invalid date: {s} (expected YYYY-MM-DD)")))
}

pub fn check_amount(amount: f64) -> Result<()> {
    if !amount.is_finite() || !(0.0..=MAX_AMOUNT).contains(&amount) {
        return Err(TallyError::Invalid(
            "Amount must be between 0 and 100,000,000".to_string(),
        ));
    }
    Ok(())
}

/// Trim an optional text field; blank becomes `None`.
pub fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

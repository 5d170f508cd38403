use std::io::Write;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{Result, TallyError};
use crate::fmt::{money, signed_money};
use crate::ledger::{self, TransactionFilter};
use crate::models::{NewTransaction, Transaction, TransactionKind};

/// Fields given on the command line for `tx edit`.
#[derive(Debug, Default)]
pub struct TxArgs {
    pub date: Option<String>,
    pub kind: Option<String>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub category: Option<String>,
}

#[derive(Debug, Default)]
pub struct ListArgs {
    pub kind: Option<String>,
    pub category: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub json: bool,
    pub csv: Option<String>,
}

fn parse_kind(kind: Option<&str>) -> Result<Option<TransactionKind>> {
    kind.map(str::parse).transpose()
}

pub fn add(
    date: String,
    kind: &str,
    amount: f64,
    description: Option<String>,
    category: Option<String>,
) -> Result<()> {
    let txn = NewTransaction {
        date,
        description: description.unwrap_or_default(),
        kind: kind.parse()?,
        category,
        amount,
    };
    let conn = super::open_db()?;
    let id = ledger::insert_transaction(&conn, &txn)?;
    println!("Added transaction {id}: {} {}", txn.date, signed_money(txn.kind, txn.amount));
    Ok(())
}

/// Overlay the given fields onto an existing row.
fn merge(existing: &Transaction, args: TxArgs) -> Result<NewTransaction> {
    Ok(NewTransaction {
        date: args.date.unwrap_or_else(|| existing.date.clone()),
        description: args.description.unwrap_or_else(|| existing.description.clone()),
        kind: parse_kind(args.kind.as_deref())?.unwrap_or(existing.kind),
        category: args.category.or_else(|| existing.category.clone()),
        amount: args.amount.unwrap_or(existing.amount),
    })
}

pub fn edit(id: i64, args: TxArgs) -> Result<()> {
    let conn = super::open_db()?;
    let existing = ledger::get_transaction(&conn, id)?
        .ok_or_else(|| TallyError::NotFound(format!("Transaction not found: id {id}")))?;
    let txn = merge(&existing, args)?;
    ledger::update_transaction(&conn, id, &txn)?;
    println!("Updated transaction {id}");
    Ok(())
}

pub fn list(args: ListArgs) -> Result<()> {
    let conn = super::open_db()?;
    let filter = TransactionFilter {
        kind: parse_kind(args.kind.as_deref())?,
        category: args.category,
        from: args.from,
        to: args.to,
    };
    let rows = ledger::filter_transactions(&conn, &filter)?;

    if let Some(path) = args.csv {
        let file = std::fs::File::create(&path)?;
        ledger::export_csv(&rows, file)?;
        println!("Exported {} transaction(s) to {path}", rows.len());
        return Ok(());
    }
    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    print_table(&rows, &filter);
    Ok(())
}

fn print_table(rows: &[Transaction], filter: &TransactionFilter) {
    if rows.is_empty() {
        println!("No transactions ({}).", filter.describe());
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Date", "Description", "Type", "Category", "Amount"]);
    let (mut income, mut expenses) = (0.0, 0.0);
    for t in rows {
        let amount = match t.kind {
            TransactionKind::Income => {
                income += t.amount;
                signed_money(t.kind, t.amount).green().to_string()
            }
            TransactionKind::Expense => {
                expenses += t.amount;
                signed_money(t.kind, t.amount).red().to_string()
            }
        };
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.date),
            Cell::new(&t.description),
            Cell::new(t.kind),
            Cell::new(t.category.as_deref().unwrap_or("")),
            Cell::new(amount),
        ]);
    }
    println!("Transactions ({})\n{table}", filter.describe());

    let net = income - expenses;
    let net_str = if net < 0.0 { money(net).red() } else { money(net).green() };
    println!(
        "{} rows  income {}  expenses {}  net {}",
        rows.len(),
        money(income),
        money(expenses),
        net_str.bold()
    );
}

fn confirm(question: &str) -> bool {
    print!("{question} [y/N] ");
    let _ = std::io::stdout().flush();
    let mut input = String::new();
    if std::io::stdin().read_line(&mut input).is_err() {
        return false;
    }
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}

pub fn delete(id: i64, yes: bool) -> Result<()> {
    let conn = super::open_db()?;
    let Some(txn) = ledger::get_transaction(&conn, id)? else {
        println!("No transaction with id {id}");
        return Ok(());
    };
    if !yes {
        let question = format!(
            "Delete transaction {id} ({} {} {})?",
            txn.date,
            txn.description,
            signed_money(txn.kind, txn.amount)
        );
        if !confirm(&question) {
            println!("Cancelled.");
            return Ok(());
        }
    }
    if ledger::delete_transaction(&conn, id)? {
        println!("Deleted transaction {id}");
    } else {
        println!("No transaction with id {id}");
    }
    Ok(())
}

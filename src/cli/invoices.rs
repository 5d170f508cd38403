use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::Result;
use crate::fmt::money;
use crate::invoices;
use crate::models::InvoiceStatus;

pub fn add(
    number: &str,
    amount: f64,
    client: Option<i64>,
    issue_date: Option<&str>,
    due_date: Option<&str>,
) -> Result<()> {
    let conn = super::open_db()?;
    let id = invoices::add_invoice(&conn, number, client, amount, issue_date, due_date)?;
    println!("Created invoice {} (id {id}) for {}", number.trim(), money(amount));
    Ok(())
}

fn status_label(status: InvoiceStatus) -> String {
    match status {
        InvoiceStatus::Pending => status.as_str().yellow().to_string(),
        InvoiceStatus::Paid => status.as_str().green().to_string(),
        InvoiceStatus::Cancelled => status.as_str().dimmed().to_string(),
    }
}

pub fn list() -> Result<()> {
    let conn = super::open_db()?;
    let rows = invoices::list_invoices(&conn)?;
    if rows.is_empty() {
        println!("No invoices yet. Create one with `tally invoices add NUMBER --amount A`.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["ID", "Number", "Client", "Amount", "Status", "Issued", "Due"]);
    for inv in &rows {
        table.add_row(vec![
            Cell::new(inv.id),
            Cell::new(&inv.number),
            Cell::new(inv.client_name.as_deref().unwrap_or("")),
            Cell::new(money(inv.amount)),
            Cell::new(status_label(inv.status)),
            Cell::new(inv.issue_date.as_deref().unwrap_or("")),
            Cell::new(inv.due_date.as_deref().unwrap_or("")),
        ]);
    }
    println!("Invoices\n{table}");
    println!("Outstanding: {}", money(invoices::outstanding_total(&conn)?).bold());
    Ok(())
}

pub fn set_status(id: i64, status: &str) -> Result<()> {
    let status: InvoiceStatus = status.parse()?;
    let conn = super::open_db()?;
    invoices::set_invoice_status(&conn, id, status)?;
    println!("Invoice {id} marked {status}");
    Ok(())
}

pub fn delete(id: i64) -> Result<()> {
    let conn = super::open_db()?;
    if invoices::delete_invoice(&conn, id)? {
        println!("Deleted invoice {id}");
    } else {
        println!("No invoice with id {id}");
    }
    Ok(())
}

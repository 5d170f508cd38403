use crate::clients::client_count;
use crate::db::{get_connection, DB_FILE};
use crate::error::Result;
use crate::fmt::{format_bytes, money};
use crate::invoices::outstanding_total;
use crate::ledger::summary;
use crate::settings::{load_settings, settings_path};

pub fn run() -> Result<()> {
    let settings = load_settings();
    let data_dir = std::path::PathBuf::from(&settings.data_dir);
    let db_path = data_dir.join(DB_FILE);

    println!("User:       {}", if settings.user_name.is_empty() { "(not set)" } else { &settings.user_name });
    println!("Config:     {}", settings_path().display());
    println!("Data dir:   {}", data_dir.display());
    println!("Database:   {}", db_path.display());

    if db_path.exists() {
        let size = std::fs::metadata(&db_path)?.len();
        println!("DB size:    {}", format_bytes(size));

        let conn = get_connection(&db_path)?;
        let totals = summary(&conn)?;
        let invoices: i64 = conn.query_row("SELECT count(*) FROM invoices", [], |r| r.get(0))?;

        println!();
        println!("Transactions:  {}", totals.count);
        println!("Income:        {}", money(totals.total_income));
        println!("Expenses:      {}", money(totals.total_expenses));
        println!("Net:           {}", money(totals.net));
        println!("Clients:       {}", client_count(&conn)?);
        println!("Invoices:      {invoices}");
        println!("Outstanding:   {}", money(outstanding_total(&conn)?));
    } else {
        println!();
        println!("Database not found. Run `tally init` to set up.");
    }

    Ok(())
}

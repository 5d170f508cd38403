use chrono::{Datelike, Local, NaiveDate};
use rusqlite::Connection;

use crate::clients;
use crate::error::Result;
use crate::invoices;
use crate::ledger;
use crate::models::{InvoiceStatus, NewTransaction, TransactionKind};

/// Marks a database that already holds the demo clients.
const GUARD_CLIENT: &str = "Northwind Traders";

struct DemoClient {
    name: &'static str,
    email: &'static str,
    phone: &'static str,
}

const CLIENTS: &[DemoClient] = &[
    DemoClient { name: GUARD_CLIENT, email: "billing@northwind.example", phone: "555-0142" },
    DemoClient { name: "Blue Fern Studio", email: "hello@bluefern.example", phone: "555-0178" },
    DemoClient { name: "Harbor Bakery", email: "owner@harborbakery.example", phone: "555-0199" },
];

/// Monthly entries, repeated for every demo month.
struct MonthlyTxn {
    day: u32,
    description: &'static str,
    kind: TransactionKind,
    category: &'static str,
    amount: f64,
}

const MONTHLY: &[MonthlyTxn] = &[
    MonthlyTxn { day: 1, description: "Monthly salary", kind: TransactionKind::Income, category: "Salary", amount: 4200.00 },
    MonthlyTxn { day: 3, description: "Office rent", kind: TransactionKind::Expense, category: "Rent", amount: 950.00 },
    MonthlyTxn { day: 9, description: "Internet and phone", kind: TransactionKind::Expense, category: "Services", amount: 79.90 },
    MonthlyTxn { day: 21, description: "Bookkeeping software", kind: TransactionKind::Expense, category: "Services", amount: 24.00 },
];

/// One-off entries; each month picks two from the pool by index.
const ROTATING: &[MonthlyTxn] = &[
    MonthlyTxn { day: 12, description: "Consulting engagement", kind: TransactionKind::Income, category: "Services", amount: 1850.00 },
    MonthlyTxn { day: 14, description: "Printer paper and toner", kind: TransactionKind::Expense, category: "Goods", amount: 63.45 },
    MonthlyTxn { day: 17, description: "Workshop fee", kind: TransactionKind::Income, category: "Services", amount: 600.00 },
    MonthlyTxn { day: 19, description: "New monitor", kind: TransactionKind::Expense, category: "Goods", amount: 289.99 },
    MonthlyTxn { day: 24, description: "Parking permit", kind: TransactionKind::Expense, category: "Other", amount: 45.00 },
    MonthlyTxn { day: 27, description: "Sold old laptop", kind: TransactionKind::Income, category: "Other", amount: 320.00 },
];

const DEMO_MONTHS: u32 = 12;

/// Last valid day of the month when `day` overflows it.
fn make_date(year: i32, month: u32, day: u32) -> String {
    let mut d = day;
    while d > 28 && NaiveDate::from_ymd_opt(year, month, d).is_none() {
        d -= 1;
    }
    format!("{year:04}-{month:02}-{d:02}")
}

/// Twelve months of transactions ending at the current month, skipping future days.
fn generate_transactions(today: NaiveDate) -> Vec<NewTransaction> {
    let mut txns = Vec::new();
    for i in 0..DEMO_MONTHS {
        let months_ago = DEMO_MONTHS - 1 - i;
        let target = today - chrono::Months::new(months_ago);
        let (year, month) = (target.year(), target.month());
        let idx = i as usize;

        let picks = [&ROTATING[(idx * 2) % ROTATING.len()], &ROTATING[(idx * 2 + 1) % ROTATING.len()]];
        for t in MONTHLY.iter().chain(picks) {
            let date = make_date(year, month, t.day);
            if date > today.to_string() {
                continue;
            }
            txns.push(NewTransaction {
                date,
                description: t.description.to_string(),
                kind: t.kind,
                category: Some(t.category.to_string()),
                amount: t.amount,
            });
        }
    }
    txns
}

#[derive(Debug)]
pub struct DemoCounts {
    pub transactions: usize,
    pub clients: usize,
    pub invoices: usize,
}

/// Seed sample data in one transaction. Returns `None` when the demo data is
/// already present; on error nothing is written.
pub fn seed(conn: &Connection) -> Result<Option<DemoCounts>> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM clients WHERE name = ?1)",
        [GUARD_CLIENT],
        |r| r.get(0),
    )?;
    if exists {
        return Ok(None);
    }

    let tx = conn.unchecked_transaction()?;
    let today = Local::now().date_naive();
    let txns = generate_transactions(today);
    for txn in &txns {
        ledger::insert_transaction(&tx, txn)?;
    }

    let mut client_ids = Vec::new();
    for c in CLIENTS {
        client_ids.push(clients::add_client(&tx, c.name, Some(c.email), Some(c.phone), None)?);
    }

    let stamp = today.format("%Y%m");
    let issue = |days_ago: u64| (today - chrono::Days::new(days_ago)).to_string();
    let due = |days_ago: u64| (today - chrono::Days::new(days_ago) + chrono::Days::new(30)).to_string();
    let demo_invoices = [
        (format!("INV-{stamp}-01"), client_ids[0], 3200.00, 45, InvoiceStatus::Paid),
        (format!("INV-{stamp}-02"), client_ids[1], 1250.00, 20, InvoiceStatus::Pending),
        (format!("INV-{stamp}-03"), client_ids[0], 880.00, 5, InvoiceStatus::Pending),
        (format!("INV-{stamp}-04"), client_ids[2], 410.00, 60, InvoiceStatus::Cancelled),
    ];
    for (number, client_id, amount, days_ago, status) in &demo_invoices {
        let id = invoices::add_invoice(
            &tx,
            number,
            Some(*client_id),
            *amount,
            Some(issue(*days_ago).as_str()),
            Some(due(*days_ago).as_str()),
        )?;
        if *status != InvoiceStatus::Pending {
            invoices::set_invoice_status(&tx, id, *status)?;
        }
    }
    tx.commit()?;

    tracing::info!(transactions = txns.len(), "demo data seeded");
    Ok(Some(DemoCounts {
        transactions: txns.len(),
        clients: CLIENTS.len(),
        invoices: demo_invoices.len(),
    }))
}

pub fn run() -> Result<()> {
    let conn = super::open_db()?;
    match seed(&conn)? {
        None => println!("Demo data already loaded (client '{GUARD_CLIENT}' exists)."),
        Some(counts) => {
            println!("Demo data loaded!");
            println!("  Transactions: {}", counts.transactions);
            println!("  Clients:      {}", counts.clients);
            println!("  Invoices:     {}", counts.invoices);
            println!();
            println!("Try these next:");
            println!("  tally tx list");
            println!("  tally invoices list");
            println!("  tally");
        }
    }
    Ok(())
}

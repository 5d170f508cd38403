pub mod backup;
pub mod client_manager;
pub mod clients;
pub mod dashboard;
pub mod demo;
pub mod init;
pub mod invoice_manager;
pub mod invoices;
pub mod ledger_manager;
pub mod load;
pub mod status;
pub mod transactions;

use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::filter::LevelFilter;

use crate::db::{get_connection, init_db};
use crate::error::{Result, TallyError};
use crate::settings::get_db_path;

/// Open the configured database, failing when `tally init` has not been run.
pub(crate) fn open_db() -> Result<Connection> {
    let db_path = get_db_path();
    if !db_path.exists() {
        return Err(TallyError::Settings(format!(
            "No database found at {}\nRun `tally init` first.",
            db_path.display()
        )));
    }
    let conn = get_connection(&db_path)?;
    init_db(&conn)?;
    Ok(conn)
}

#[derive(Parser)]
#[command(name = "tally", version, about = "Income and expense ledger with clients and invoices.")]
pub struct Cli {
    /// Log level used when RUST_LOG is not set
    #[arg(long, global = true, default_value_t = LevelFilter::WARN)]
    pub log_level: LevelFilter,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Choose a data directory and initialize the database.
    Init {
        /// Path for tally data (default: ~/Documents/tally)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Switch to an existing tally data directory.
    Load {
        /// Path to data directory containing tally.db
        path: String,
    },
    /// Show current database and summary statistics.
    Status,
    /// Back up the database.
    Backup {
        /// Output path (default: <data_dir>/backups/tally-YYYYMMDD-HHMMSS.db)
        #[arg(long)]
        output: Option<String>,
    },
    /// Load sample transactions, clients and invoices.
    Demo,
    /// Add, list, edit and delete ledger transactions.
    #[command(name = "tx")]
    Tx {
        #[command(subcommand)]
        command: TxCommands,
    },
    /// Manage clients.
    Clients {
        #[command(subcommand)]
        command: ClientsCommands,
    },
    /// Manage invoices.
    Invoices {
        #[command(subcommand)]
        command: InvoicesCommands,
    },
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Record a transaction.
    Add {
        /// Date: YYYY-MM-DD
        #[arg(long)]
        date: String,
        /// income or expense
        #[arg(long = "type")]
        kind: String,
        /// Amount, 0 to 100,000,000
        #[arg(long)]
        amount: f64,
        #[arg(long)]
        description: Option<String>,
        /// Category, e.g. Salary, Rent, Services, Goods, Other
        #[arg(long)]
        category: Option<String>,
    },
    /// List transactions, newest first.
    List {
        /// Only income or only expense
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        category: Option<String>,
        /// Start date: YYYY-MM-DD (requires --to)
        #[arg(long)]
        from: Option<String>,
        /// End date: YYYY-MM-DD (requires --from)
        #[arg(long)]
        to: Option<String>,
        /// Print JSON instead of a table
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Write the rows to a CSV file
        #[arg(long)]
        csv: Option<String>,
    },
    /// Change fields of an existing transaction.
    Edit {
        /// Transaction ID (shown in `tally tx list`)
        id: i64,
        #[arg(long)]
        date: Option<String>,
        #[arg(long = "type")]
        kind: Option<String>,
        #[arg(long)]
        amount: Option<f64>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete a transaction.
    Delete {
        /// Transaction ID (shown in `tally tx list`)
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand)]
pub enum ClientsCommands {
    /// Add a client.
    Add {
        name: String,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    /// List clients with their outstanding balance.
    List,
    /// Delete a client with no invoices.
    Delete {
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum InvoicesCommands {
    /// Create an invoice.
    Add {
        /// Invoice number, unique
        number: String,
        #[arg(long)]
        amount: f64,
        /// Client ID (shown in `tally clients list`)
        #[arg(long)]
        client: Option<i64>,
        /// Issue date: YYYY-MM-DD (default: today)
        #[arg(long = "issue-date")]
        issue_date: Option<String>,
        /// Due date: YYYY-MM-DD
        #[arg(long = "due-date")]
        due_date: Option<String>,
    },
    /// List invoices.
    List,
    /// Set an invoice's status.
    Status {
        id: i64,
        /// pending, paid or cancelled
        status: String,
    },
    /// Delete an invoice.
    Delete {
        id: i64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand_opens_dashboard() {
        let cli = Cli::try_parse_from(["tally"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.log_level, LevelFilter::WARN);
    }

    #[test]
    fn test_parse_tx_list_filters() {
        let cli = Cli::try_parse_from([
            "tally", "tx", "list", "--type", "income", "--from", "2024-01-01", "--to", "2024-01-31",
            "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LevelFilter::DEBUG);
        match cli.command {
            Some(Commands::Tx {
                command: TxCommands::List { kind, from, to, json, .. },
            }) => {
                assert_eq!(kind.as_deref(), Some("income"));
                assert_eq!(from.as_deref(), Some("2024-01-01"));
                assert_eq!(to.as_deref(), Some("2024-01-31"));
                assert!(!json);
            }
            _ => panic!("expected tx list"),
        }
    }

    #[test]
    fn test_tx_add_requires_amount() {
        let result = Cli::try_parse_from(["tally", "tx", "add", "--date", "2024-01-01", "--type", "income"]);
        assert!(result.is_err());
    }
}

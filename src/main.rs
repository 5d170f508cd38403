mod cli;
mod clients;
mod db;
mod error;
mod fmt;
mod invoices;
mod ledger;
mod models;
mod settings;
mod tui;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use cli::{ClientsCommands, Cli, Commands, InvoicesCommands, TxCommands};

fn main() {
    let cli = Cli::parse();
    init_logger(cli.log_level);

    let result = match cli.command {
        None => cli::dashboard::run(),
        Some(Commands::Init { data_dir }) => cli::init::run(data_dir),
        Some(Commands::Load { path }) => cli::load::run(&path),
        Some(Commands::Status) => cli::status::run(),
        Some(Commands::Backup { output }) => cli::backup::run(output),
        Some(Commands::Demo) => cli::demo::run(),
        Some(Commands::Tx { command }) => match command {
            TxCommands::Add {
                date,
                kind,
                amount,
                description,
                category,
            } => cli::transactions::add(date, &kind, amount, description, category),
            TxCommands::List {
                kind,
                category,
                from,
                to,
                json,
                csv,
            } => cli::transactions::list(cli::transactions::ListArgs {
                kind,
                category,
                from,
                to,
                json,
                csv,
            }),
            TxCommands::Edit {
                id,
                date,
                kind,
                amount,
                description,
                category,
            } => cli::transactions::edit(
                id,
                cli::transactions::TxArgs {
                    date,
                    kind,
                    amount,
                    description,
                    category,
                },
            ),
            TxCommands::Delete { id, yes } => cli::transactions::delete(id, yes),
        },
        Some(Commands::Clients { command }) => match command {
            ClientsCommands::Add {
                name,
                email,
                phone,
                address,
            } => cli::clients::add(&name, email.as_deref(), phone.as_deref(), address.as_deref()),
            ClientsCommands::List => cli::clients::list(),
            ClientsCommands::Delete { id } => cli::clients::delete(id),
        },
        Some(Commands::Invoices { command }) => match command {
            InvoicesCommands::Add {
                number,
                amount,
                client,
                issue_date,
                due_date,
            } => cli::invoices::add(&number, amount, client, issue_date.as_deref(), due_date.as_deref()),
            InvoicesCommands::List => cli::invoices::list(),
            InvoicesCommands::Status { id, status } => cli::invoices::set_status(id, &status),
            InvoicesCommands::Delete { id } => cli::invoices::delete(id),
        },
    };

    if let Err(e) = result {
        tracing::debug!(error = ?e, "command failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

/// Initializes the tracing subscriber on stderr.
fn init_logger(level: LevelFilter) {
    let filter = match std::env::var("RUST_LOG").ok() {
        Some(_) => EnvFilter::from_default_env(),
        // Default level applies to this crate only
        None => EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), level)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

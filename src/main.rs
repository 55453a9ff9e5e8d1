use clap::{Parser, Subcommand};
use loan_ledger::config::LedgerConfig;
use loan_ledger::domain::loan::LoanStatusFilter;
use loan_ledger::domain::ports::{LoanRepository, LoanRepositoryBox};
use loan_ledger::infrastructure::sqlite::{Database, SqliteLoanRepository, provision};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file. Defaults to a single `ledger.db` in the working directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the ledger tables if they do not exist yet
    Provision,
    /// List the loans of a customer
    Loans {
        #[arg(long)]
        customer: i64,
        /// all, pending, active, closed or defaulted
        #[arg(long, default_value = "all")]
        status: LoanStatusFilter,
    },
    /// Show a single loan
    Loan { id: i64 },
    /// List the installments of a loan
    Installments { loan_id: i64 },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config {
        Some(path) => LedgerConfig::load(path).into_diagnostic()?,
        None => LedgerConfig::default(),
    };
    let db = Database::connect(&config).await.into_diagnostic()?;

    match cli.command {
        Command::Provision => {
            provision(&db).await.into_diagnostic()?;
            for database in &config.databases {
                println!("provisioned {} ({})", database.name, database.url);
            }
        }
        Command::Loans { customer, status } => {
            let repo: LoanRepositoryBox =
                Box::new(SqliteLoanRepository::from_database(&db).into_diagnostic()?);
            let loans = repo
                .get_loan_by_customer_id(customer, status)
                .await
                .into_diagnostic()?;
            print_json(&loans)?;
        }
        Command::Loan { id } => {
            let repo = SqliteLoanRepository::from_database(&db).into_diagnostic()?;
            let loan = repo.get_loan_by_id(id).await.into_diagnostic()?;
            print_json(&loan)?;
        }
        Command::Installments { loan_id } => {
            let repo = SqliteLoanRepository::from_database(&db).into_diagnostic()?;
            let installments = repo
                .get_loan_details_by_loan_id(loan_id)
                .await
                .into_diagnostic()?;
            print_json(&installments)?;
        }
    }

    db.close().await;
    Ok(())
}

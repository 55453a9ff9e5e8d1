use super::database::Database;
use crate::config::DatabaseName;
use crate::error::{LedgerError, Result};
use tracing::info;

pub const CUSTOMER_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS customer (
    customer_id INTEGER PRIMARY KEY,
    full_name TEXT NOT NULL,
    status INTEGER,
    credit_status INTEGER
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_customer ON customer (customer_id);
"#;

pub const LOAN_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS loan (
    ID INTEGER PRIMARY KEY,
    customer_id INTEGER NOT NULL,
    name TEXT,
    amount REAL,
    amount_interest REAL,
    annual_rate_percentage REAL,
    start_date TEXT,
    end_date TEXT,
    status INTEGER,
    FOREIGN KEY (customer_id) REFERENCES customer(customer_id)
);

CREATE INDEX IF NOT EXISTS idx_customer_loan ON loan (customer_id, status);
CREATE INDEX IF NOT EXISTS idx_customer_startdate_loan ON loan (customer_id, start_date, status);

CREATE TABLE IF NOT EXISTS loan_details (
    ID INTEGER PRIMARY KEY,
    loan_id INTEGER NOT NULL,
    name TEXT,
    amount REAL,
    status INTEGER,
    start_date TEXT,
    end_date TEXT,
    payment_id INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (loan_id) REFERENCES loan(ID)
);

CREATE INDEX IF NOT EXISTS idx_loanid_details_status ON loan_details (loan_id, status);
CREATE INDEX IF NOT EXISTS idx_loanid_details ON loan_details (loan_id, start_date);
"#;

pub const PAYMENT_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS payment_history (
    payment_id INTEGER PRIMARY KEY,
    name TEXT,
    amount REAL,
    status TEXT
);
"#;

pub fn ddl(name: DatabaseName) -> &'static str {
    match name {
        DatabaseName::Customer => CUSTOMER_TABLE,
        DatabaseName::Loan => LOAN_TABLES,
        DatabaseName::Payment => PAYMENT_TABLE,
    }
}

/// Creates every table and index the ledger needs. Safe to run repeatedly.
pub async fn provision(db: &Database) -> Result<()> {
    for name in DatabaseName::ALL {
        sqlx::raw_sql(ddl(name))
            .execute(db.pool(name)?)
            .await
            .map_err(|e| LedgerError::store(format!("provision {name} schema"), e))?;
        info!(database = %name, "schema provisioned");
    }
    Ok(())
}

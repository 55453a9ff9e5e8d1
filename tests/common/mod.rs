#![allow(dead_code)]

use chrono::{Months, NaiveDate, NaiveDateTime};
use loan_ledger::config::{DatabaseName, LedgerConfig};
use loan_ledger::domain::loan::{Loan, LoanDetails, LoanStatus};
use loan_ledger::infrastructure::sqlite::{Database, SqliteLoanRepository, provision};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// A provisioned ledger in a temporary directory. Keep it alive for the test.
pub struct Ledger {
    pub dir: TempDir,
    pub db: Database,
    pub repo: SqliteLoanRepository,
}

impl Ledger {
    pub fn pool(&self) -> &SqlitePool {
        self.repo.pool()
    }

    pub async fn loan_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM loan")
            .fetch_one(self.pool())
            .await
            .unwrap()
    }

    pub async fn loan_details_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM loan_details")
            .fetch_one(self.pool())
            .await
            .unwrap()
    }
}

pub fn config_for(dir: &TempDir) -> LedgerConfig {
    let mut config =
        LedgerConfig::single_file(format!("sqlite://{}", dir.path().join("ledger.db").display()));
    config.busy_timeout_ms = 1_000;
    config
}

pub async fn seed_customers(db: &Database, ids: &[i64]) {
    let pool = db.pool(DatabaseName::Customer).unwrap();
    for id in ids {
        sqlx::query("INSERT INTO customer (customer_id, full_name, status, credit_status) VALUES (?, ?, 1, 1)")
            .bind(*id)
            .bind(format!("customer {id}"))
            .execute(pool)
            .await
            .unwrap();
    }
}

/// Provisioned ledger with customers 1 and 2.
pub async fn ledger() -> Ledger {
    let dir = tempfile::tempdir().unwrap();
    let db = Database::connect(&config_for(&dir)).await.unwrap();
    provision(&db).await.unwrap();
    seed_customers(&db, &[1, 2]).await;
    let repo = SqliteLoanRepository::from_database(&db).unwrap();
    Ledger { dir, db, repo }
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .unwrap()
        .and_hms_opt(10, 15, 30)
        .unwrap()
}

pub fn loan(customer_id: i64, name: &str, amount: Decimal, status: LoanStatus) -> Loan {
    Loan {
        id: 0,
        customer_id,
        name: name.to_string(),
        amount,
        amount_interest: dec!(1200.5),
        annual_rate_percentage: dec!(12),
        start_date: date(2026, 1, 1),
        end_date: date(2027, 1, 1),
        status,
    }
}

/// `count` consecutive monthly installments of `amount`.
pub fn installments(count: u32, amount: Decimal) -> Vec<LoanDetails> {
    let first = date(2026, 1, 1);
    (0..count)
        .map(|i| {
            let start = first + Months::new(i);
            let end = first + Months::new(i + 1);
            LoanDetails::installment(format!("installment {}", i + 1), amount, start, end)
        })
        .collect()
}

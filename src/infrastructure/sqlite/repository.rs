use super::conversions::{decimal_to_real, format_date};
use super::database::Database;
use super::installments::{ParentLoan, build_inserts, installment_rows};
use crate::config::DatabaseName;
use crate::domain::loan::{Loan, LoanDetailStatus, LoanDetails, LoanStatus, LoanStatusFilter};
use crate::domain::ports::LoanRepository;
use crate::error::{CreateStage, LedgerError, Result};
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

const LOAN_COLUMNS: &str = "ID AS id, customer_id, name, amount, amount_interest, \
     annual_rate_percentage, start_date, end_date, status";

const LOAN_DETAILS_COLUMNS: &str =
    "ID AS id, loan_id, name, amount, status, start_date, end_date, payment_id";

const INSERT_LOAN: &str = "INSERT INTO loan (customer_id, name, amount, amount_interest, \
     annual_rate_percentage, start_date, end_date, status) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING ID";

const UPDATE_LOAN_STATUS: &str = "UPDATE loan SET status = ? WHERE ID = ?";

const UPDATE_LOAN_DETAILS_STATUS: &str =
    "UPDATE loan_details SET status = ?, payment_id = ? WHERE ID = ?";

/// Loan repository over the `loan` logical database.
///
/// Holds a shared pool handle only; all concurrency control is left to SQLite.
#[derive(Clone)]
pub struct SqliteLoanRepository {
    pool: SqlitePool,
}

impl SqliteLoanRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn from_database(db: &Database) -> Result<Self> {
        Ok(Self::new(db.pool(DatabaseName::Loan)?.clone()))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Inserts the loan header on `conn` and returns the generated id.
async fn insert_loan(
    conn: &mut SqliteConnection,
    loan: &Loan,
) -> std::result::Result<i64, sqlx::Error> {
    sqlx::query_scalar(INSERT_LOAN)
        .bind(loan.customer_id)
        .bind(loan.name.as_str())
        .bind(decimal_to_real(loan.amount)?)
        .bind(decimal_to_real(loan.amount_interest)?)
        .bind(decimal_to_real(loan.annual_rate_percentage)?)
        .bind(format_date(&loan.start_date))
        .bind(format_date(&loan.end_date))
        .bind(loan.status.code())
        .fetch_one(conn)
        .await
}

async fn insert_loan_details(
    conn: &mut SqliteConnection,
    parent: ParentLoan,
    installments: &[LoanDetails],
) -> std::result::Result<(), sqlx::Error> {
    let rows = installment_rows(parent, installments)?;
    for mut statement in build_inserts(&rows) {
        statement.build().execute(&mut *conn).await?;
    }
    Ok(())
}

#[async_trait]
impl LoanRepository for SqliteLoanRepository {
    async fn get_loan_by_customer_id(
        &self,
        customer_id: i64,
        status: LoanStatusFilter,
    ) -> Result<Vec<Loan>> {
        let loans = match status {
            LoanStatusFilter::All => {
                sqlx::query_as::<_, Loan>(&format!(
                    "SELECT {LOAN_COLUMNS} FROM loan WHERE customer_id = ? ORDER BY ID"
                ))
                .bind(customer_id)
                .fetch_all(&self.pool)
                .await
            }
            LoanStatusFilter::Only(status) => {
                sqlx::query_as::<_, Loan>(&format!(
                    "SELECT {LOAN_COLUMNS} FROM loan WHERE customer_id = ? AND status = ? ORDER BY ID"
                ))
                .bind(customer_id)
                .bind(status.code())
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| LedgerError::store(format!("get loans of customer {customer_id}"), e))?;

        debug!(customer_id, ?status, count = loans.len(), "loans fetched");
        Ok(loans)
    }

    async fn get_loan_by_id(&self, loan_id: i64) -> Result<Loan> {
        sqlx::query_as::<_, Loan>(&format!("SELECT {LOAN_COLUMNS} FROM loan WHERE ID = ?"))
            .bind(loan_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| LedgerError::store(format!("get loan {loan_id}"), e))?
            .ok_or(LedgerError::NotFound {
                entity: "loan",
                id: loan_id,
            })
    }

    async fn get_loan_details_by_id(&self, loan_details_id: i64) -> Result<LoanDetails> {
        sqlx::query_as::<_, LoanDetails>(&format!(
            "SELECT {LOAN_DETAILS_COLUMNS} FROM loan_details WHERE ID = ?"
        ))
        .bind(loan_details_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| LedgerError::store(format!("get loan details {loan_details_id}"), e))?
        .ok_or(LedgerError::NotFound {
            entity: "loan details",
            id: loan_details_id,
        })
    }

    async fn get_loan_details_by_loan_id(&self, loan_id: i64) -> Result<Vec<LoanDetails>> {
        sqlx::query_as::<_, LoanDetails>(&format!(
            "SELECT {LOAN_DETAILS_COLUMNS} FROM loan_details WHERE loan_id = ? ORDER BY ID"
        ))
        .bind(loan_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| LedgerError::store(format!("get loan details of loan {loan_id}"), e))
    }

    async fn create_loan_with_tx(
        &self,
        loan: &Loan,
        installments: &[LoanDetails],
    ) -> Result<i64> {
        let customer_id = loan.customer_id;
        let failed = move |stage: CreateStage| {
            move |source: sqlx::Error| {
                warn!(customer_id, %stage, error = %source, "loan creation rolled back");
                LedgerError::Create {
                    customer_id,
                    stage,
                    source,
                }
            }
        };

        // Dropping `tx` before commit rolls everything back, including on cancellation.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(failed(CreateStage::Begin))?;

        let loan_id = insert_loan(&mut tx, loan)
            .await
            .map_err(failed(CreateStage::InsertLoan))?;

        if !installments.is_empty() {
            insert_loan_details(&mut tx, ParentLoan::Shared(loan_id), installments)
                .await
                .map_err(failed(CreateStage::InsertLoanDetails))?;
        }

        tx.commit().await.map_err(failed(CreateStage::Commit))?;

        info!(
            loan_id,
            customer_id,
            installments = installments.len(),
            "loan created"
        );
        Ok(loan_id)
    }

    async fn create_loan(&self, loan: &Loan) -> Result<i64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| LedgerError::store("acquire connection", e))?;
        let loan_id = insert_loan(&mut conn, loan).await.map_err(|e| {
            LedgerError::store(format!("insert loan for customer {}", loan.customer_id), e)
        })?;
        debug!(loan_id, customer_id = loan.customer_id, "loan header inserted");
        Ok(loan_id)
    }

    async fn create_loan_details(&self, installments: &[LoanDetails]) -> Result<()> {
        if installments.is_empty() {
            return Ok(());
        }
        let context = format!("backfill {} loan details", installments.len());
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| LedgerError::store(context.as_str(), e))?;
        insert_loan_details(&mut tx, ParentLoan::PerRow, installments)
            .await
            .map_err(|e| LedgerError::store(context.as_str(), e))?;
        tx.commit()
            .await
            .map_err(|e| LedgerError::store(context.as_str(), e))?;
        debug!(count = installments.len(), "loan details backfilled");
        Ok(())
    }

    async fn update_loan_status(&self, loan_id: i64, status: LoanStatus) -> Result<()> {
        let result = sqlx::query(UPDATE_LOAN_STATUS)
            .bind(status.code())
            .bind(loan_id)
            .execute(&self.pool)
            .await
            .map_err(|e| LedgerError::store(format!("update status of loan {loan_id}"), e))?;
        if result.rows_affected() == 0 {
            debug!(loan_id, %status, "no loan updated");
        }
        Ok(())
    }

    async fn update_loan_details_status(
        &self,
        loan_details_id: i64,
        payment_id: i64,
        status: LoanDetailStatus,
    ) -> Result<()> {
        let result = sqlx::query(UPDATE_LOAN_DETAILS_STATUS)
            .bind(status.code())
            .bind(payment_id)
            .bind(loan_details_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                LedgerError::store(format!("update status of loan details {loan_details_id}"), e)
            })?;
        if result.rows_affected() == 0 {
            debug!(loan_details_id, payment_id, ?status, "no loan details updated");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::infrastructure::sqlite::schema::provision;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::{TempDir, tempdir};

    async fn repository() -> (TempDir, SqliteLoanRepository) {
        let dir = tempdir().unwrap();
        let config =
            LedgerConfig::single_file(format!("sqlite://{}", dir.path().join("l.db").display()));
        let db = Database::connect(&config).await.unwrap();
        provision(&db).await.unwrap();
        sqlx::query("INSERT INTO customer (customer_id, full_name) VALUES (1, 'Ada')")
            .execute(db.pool(DatabaseName::Customer).unwrap())
            .await
            .unwrap();
        (dir, SqliteLoanRepository::from_database(&db).unwrap())
    }

    fn loan() -> Loan {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        Loan {
            id: 0,
            customer_id: 1,
            name: "car".to_string(),
            amount: dec!(10000),
            amount_interest: dec!(250.5),
            annual_rate_percentage: dec!(12.5),
            start_date: start,
            end_date: start + chrono::Duration::days(365),
            status: LoanStatus::Pending,
        }
    }

    #[tokio::test]
    async fn test_dropped_transaction_leaves_no_header() {
        let (_dir, repo) = repository().await;

        let mut tx = repo.pool().begin().await.unwrap();
        let loan_id = insert_loan(&mut tx, &loan()).await.unwrap();
        drop(tx);

        let err = repo.get_loan_by_id(loan_id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_standalone_insert_is_not_the_creation_path() {
        let (_dir, repo) = repository().await;

        let loan_id = repo.create_loan(&loan()).await.unwrap();
        let stored = repo.get_loan_by_id(loan_id).await.unwrap();
        assert_eq!(stored.name, "car");
        assert!(repo.get_loan_details_by_loan_id(loan_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_status_code_is_a_scan_error() {
        let (_dir, repo) = repository().await;
        let loan_id = repo.create_loan(&loan()).await.unwrap();
        sqlx::query("UPDATE loan SET status = 99 WHERE ID = ?")
            .bind(loan_id)
            .execute(repo.pool())
            .await
            .unwrap();

        assert!(matches!(
            repo.get_loan_by_id(loan_id).await,
            Err(LedgerError::Scan { .. })
        ));
        assert!(matches!(
            repo.get_loan_by_customer_id(1, LoanStatusFilter::All).await,
            Err(LedgerError::Scan { .. })
        ));
    }
}

use crate::domain::loan::{Loan, LoanDetailStatus, LoanDetails, LoanStatus, LoanStatusFilter};
use crate::domain::ports::LoanRepository;
use crate::error::{LedgerError, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Tables {
    loans: BTreeMap<i64, Loan>,
    details: BTreeMap<i64, LoanDetails>,
    last_loan_id: i64,
    last_details_id: i64,
}

impl Tables {
    fn insert_loan(&mut self, loan: &Loan) -> i64 {
        self.last_loan_id += 1;
        let id = self.last_loan_id;
        self.loans.insert(id, Loan { id, ..loan.clone() });
        id
    }

    fn insert_details(
        &mut self,
        loan_id: i64,
        payment_id: Option<i64>,
        installment: &LoanDetails,
    ) {
        self.last_details_id += 1;
        let id = self.last_details_id;
        self.details.insert(
            id,
            LoanDetails {
                id,
                loan_id,
                payment_id,
                ..installment.clone()
            },
        );
    }
}

/// A thread-safe in-memory loan repository.
///
/// Mirrors the SQLite repository's loan contract (generated ids, insertion
/// order, not-found errors, all-or-nothing creation) without a database.
/// There is no customer table, so loans are accepted for any `customer_id`;
/// only installment backfills check their parent loan. Meant for tests of the
/// layers calling the repository.
#[derive(Default, Clone)]
pub struct InMemoryLoanRepository {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryLoanRepository {
    /// Creates a new, empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn get_loan_by_customer_id(
        &self,
        customer_id: i64,
        status: LoanStatusFilter,
    ) -> Result<Vec<Loan>> {
        let tables = self.tables.read().await;
        Ok(tables
            .loans
            .values()
            .filter(|loan| loan.customer_id == customer_id && status.matches(loan.status))
            .cloned()
            .collect())
    }

    async fn get_loan_by_id(&self, loan_id: i64) -> Result<Loan> {
        let tables = self.tables.read().await;
        tables.loans.get(&loan_id).cloned().ok_or(LedgerError::NotFound {
            entity: "loan",
            id: loan_id,
        })
    }

    async fn get_loan_details_by_id(&self, loan_details_id: i64) -> Result<LoanDetails> {
        let tables = self.tables.read().await;
        tables
            .details
            .get(&loan_details_id)
            .cloned()
            .ok_or(LedgerError::NotFound {
                entity: "loan details",
                id: loan_details_id,
            })
    }

    async fn get_loan_details_by_loan_id(&self, loan_id: i64) -> Result<Vec<LoanDetails>> {
        let tables = self.tables.read().await;
        Ok(tables
            .details
            .values()
            .filter(|details| details.loan_id == loan_id)
            .cloned()
            .collect())
    }

    async fn create_loan_with_tx(
        &self,
        loan: &Loan,
        installments: &[LoanDetails],
    ) -> Result<i64> {
        // One write guard covers the whole creation.
        let mut tables = self.tables.write().await;
        let loan_id = tables.insert_loan(loan);
        for installment in installments {
            tables.insert_details(loan_id, None, installment);
        }
        Ok(loan_id)
    }

    async fn create_loan(&self, loan: &Loan) -> Result<i64> {
        let mut tables = self.tables.write().await;
        Ok(tables.insert_loan(loan))
    }

    async fn create_loan_details(&self, installments: &[LoanDetails]) -> Result<()> {
        let mut tables = self.tables.write().await;
        // Checked up front so a bad row leaves nothing behind.
        if let Some(orphan) = installments
            .iter()
            .find(|installment| !tables.loans.contains_key(&installment.loan_id))
        {
            return Err(LedgerError::NotFound {
                entity: "loan",
                id: orphan.loan_id,
            });
        }
        for installment in installments {
            tables.insert_details(
                installment.loan_id,
                installment.payment_id,
                installment,
            );
        }
        Ok(())
    }

    async fn update_loan_status(&self, loan_id: i64, status: LoanStatus) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(loan) = tables.loans.get_mut(&loan_id) {
            loan.status = status;
        }
        Ok(())
    }

    async fn update_loan_details_status(
        &self,
        loan_details_id: i64,
        payment_id: i64,
        status: LoanDetailStatus,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(details) = tables.details.get_mut(&loan_details_id) {
            details.status = status;
            details.payment_id = Some(payment_id).filter(|id| *id != 0);
        }
        Ok(())
    }
}

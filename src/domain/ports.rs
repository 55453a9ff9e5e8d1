use super::loan::{Loan, LoanDetailStatus, LoanDetails, LoanStatus, LoanStatusFilter};
use crate::error::Result;
use async_trait::async_trait;

/// Persistence port for loans and their installment schedules.
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Loans of a customer in insertion order, optionally narrowed to one status.
    async fn get_loan_by_customer_id(
        &self,
        customer_id: i64,
        status: LoanStatusFilter,
    ) -> Result<Vec<Loan>>;

    async fn get_loan_by_id(&self, loan_id: i64) -> Result<Loan>;

    async fn get_loan_details_by_id(&self, loan_details_id: i64) -> Result<LoanDetails>;

    /// Installments of a loan in insertion order. Empty when the loan has none.
    async fn get_loan_details_by_loan_id(&self, loan_id: i64) -> Result<Vec<LoanDetails>>;

    /// Atomically writes the loan header and all of its installments.
    ///
    /// Every installment is linked to the newly generated loan id, whatever its
    /// own `loan_id` holds. Returns that id.
    async fn create_loan_with_tx(&self, loan: &Loan, installments: &[LoanDetails])
    -> Result<i64>;

    /// Inserts a loan header on its own, outside any multi-row creation.
    async fn create_loan(&self, loan: &Loan) -> Result<i64>;

    /// Inserts installments that already carry their parent `loan_id`.
    async fn create_loan_details(&self, installments: &[LoanDetails]) -> Result<()>;

    async fn update_loan_status(&self, loan_id: i64, status: LoanStatus) -> Result<()>;

    /// Sets the installment status and stamps the settling payment.
    async fn update_loan_details_status(
        &self,
        loan_details_id: i64,
        payment_id: i64,
        status: LoanDetailStatus,
    ) -> Result<()>;
}

pub type LoanRepositoryBox = Box<dyn LoanRepository>;
pub type LoanRepositoryFactory = Box<dyn Fn() -> LoanRepositoryBox + Send + Sync>;

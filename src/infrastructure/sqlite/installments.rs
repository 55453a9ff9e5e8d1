//! Bulk insert statements for installment rows.
//!
//! All values are bound as parameters. One statement carries as many rows as
//! SQLite's bound-parameter limit allows; larger batches are split into
//! consecutive statements that the caller runs inside one transaction.

use super::conversions::{format_date, money_to_real};
use crate::domain::loan::LoanDetails;
use sqlx::{QueryBuilder, Sqlite};

const INSERT_LOAN_DETAILS: &str =
    "INSERT INTO loan_details (loan_id, name, amount, status, start_date, end_date, payment_id) ";

/// Bound values per installment row.
pub const COLUMNS_PER_ROW: usize = 7;

/// SQLITE_MAX_VARIABLE_NUMBER of the bundled SQLite.
const MAX_BIND_PARAMETERS: usize = 32_766;

pub const MAX_ROWS_PER_STATEMENT: usize = MAX_BIND_PARAMETERS / COLUMNS_PER_ROW;

/// Which loan id each inserted installment is linked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentLoan {
    /// Every row is linked to this loan.
    Shared(i64),
    /// Each row keeps its own `loan_id`, as in a backfill.
    PerRow,
}

impl ParentLoan {
    /// Zero is the unset id and selects `PerRow`.
    pub fn from_id(loan_id: i64) -> Self {
        if loan_id == 0 {
            ParentLoan::PerRow
        } else {
            ParentLoan::Shared(loan_id)
        }
    }

    fn resolve(self, installment: &LoanDetails) -> i64 {
        match self {
            ParentLoan::Shared(loan_id) => loan_id,
            ParentLoan::PerRow => installment.loan_id,
        }
    }

    /// New installments start unpaid; only a backfill carries payment ids over.
    fn payment_id(self, installment: &LoanDetails) -> i64 {
        match self {
            ParentLoan::Shared(_) => 0,
            ParentLoan::PerRow => installment.payment_id.unwrap_or(0),
        }
    }
}

/// Storage representation of one installment, in column order.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentRow {
    pub loan_id: i64,
    pub name: String,
    pub amount: f64,
    pub status: i64,
    pub start_date: String,
    pub end_date: String,
    pub payment_id: i64,
}

impl InstallmentRow {
    pub fn new(parent: ParentLoan, installment: &LoanDetails) -> Result<Self, sqlx::Error> {
        Ok(Self {
            loan_id: parent.resolve(installment),
            name: installment.name.clone(),
            amount: money_to_real(installment.amount)?,
            status: installment.status.code(),
            start_date: format_date(&installment.start_date),
            end_date: format_date(&installment.end_date),
            payment_id: parent.payment_id(installment),
        })
    }
}

pub fn installment_rows(
    parent: ParentLoan,
    installments: &[LoanDetails],
) -> Result<Vec<InstallmentRow>, sqlx::Error> {
    installments
        .iter()
        .map(|installment| InstallmentRow::new(parent, installment))
        .collect()
}

/// Builds a single multi-row insert for `rows`.
///
/// `rows` must be non-empty and at most [`MAX_ROWS_PER_STATEMENT`] long.
pub fn build_insert(rows: &[InstallmentRow]) -> QueryBuilder<'static, Sqlite> {
    let mut builder = QueryBuilder::new(INSERT_LOAN_DETAILS);
    builder.push_values(rows, |mut values, row| {
        values
            .push_bind(row.loan_id)
            .push_bind(row.name.clone())
            .push_bind(row.amount)
            .push_bind(row.status)
            .push_bind(row.start_date.clone())
            .push_bind(row.end_date.clone())
            .push_bind(row.payment_id);
    });
    builder
}

/// One statement per chunk of at most [`MAX_ROWS_PER_STATEMENT`] rows.
pub fn build_inserts(rows: &[InstallmentRow]) -> Vec<QueryBuilder<'static, Sqlite>> {
    rows.chunks(MAX_ROWS_PER_STATEMENT)
        .map(build_insert)
        .collect()
}

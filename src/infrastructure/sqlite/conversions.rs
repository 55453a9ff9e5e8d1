//! Conversions between domain values and SQLite column values.

use crate::domain::loan::{DATE_FORMAT, Loan, LoanDetailStatus, LoanDetails, LoanStatus};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

pub fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn decimal_to_real(value: Decimal) -> Result<f64, sqlx::Error> {
    value
        .to_f64()
        .ok_or_else(|| sqlx::Error::Encode(format!("{value} does not fit in a REAL").into()))
}

/// Installment amounts are stored with two decimal places.
pub fn money_to_real(value: Decimal) -> Result<f64, sqlx::Error> {
    decimal_to_real(value.round_dp(2))
}

fn column_error(
    column: &str,
    source: impl Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
) -> sqlx::Error {
    sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: source.into(),
    }
}

fn get_decimal(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let value: f64 = row.try_get(column)?;
    Decimal::from_f64(value)
        .ok_or_else(|| column_error(column, format!("{value} is not a valid decimal")))
}

fn get_date(row: &SqliteRow, column: &str) -> Result<NaiveDateTime, sqlx::Error> {
    let value: String = row.try_get(column)?;
    NaiveDateTime::parse_from_str(&value, DATE_FORMAT).map_err(|e| column_error(column, e))
}

fn get_loan_status(row: &SqliteRow) -> Result<LoanStatus, sqlx::Error> {
    let code: i64 = row.try_get("status")?;
    LoanStatus::try_from(code).map_err(|e| column_error("status", e))
}

fn get_detail_status(row: &SqliteRow) -> Result<LoanDetailStatus, sqlx::Error> {
    let code: i64 = row.try_get("status")?;
    LoanDetailStatus::try_from(code).map_err(|e| column_error("status", e))
}

impl<'r> FromRow<'r, SqliteRow> for Loan {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Loan {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            name: row.try_get("name")?,
            amount: get_decimal(row, "amount")?,
            amount_interest: get_decimal(row, "amount_interest")?,
            annual_rate_percentage: get_decimal(row, "annual_rate_percentage")?,
            start_date: get_date(row, "start_date")?,
            end_date: get_date(row, "end_date")?,
            status: get_loan_status(row)?,
        })
    }
}

impl<'r> FromRow<'r, SqliteRow> for LoanDetails {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let payment_id: Option<i64> = row.try_get("payment_id")?;
        Ok(LoanDetails {
            id: row.try_get("id")?,
            loan_id: row.try_get("loan_id")?,
            name: row.try_get("name")?,
            amount: get_decimal(row, "amount")?,
            status: get_detail_status(row)?,
            start_date: get_date(row, "start_date")?,
            end_date: get_date(row, "end_date")?,
            payment_id: payment_id.filter(|id| *id != 0),
        })
    }
}

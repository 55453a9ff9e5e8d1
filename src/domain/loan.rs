use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Text format of every date crossing the storage boundary.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Raised when an integer code or name does not map to a known status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {entity} status {value}")]
pub struct UnknownStatus {
    pub entity: &'static str,
    pub value: String,
}

/// Lifecycle of a loan header.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    Pending,
    Active,
    Closed,
    Defaulted,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Pending,
        LoanStatus::Active,
        LoanStatus::Closed,
        LoanStatus::Defaulted,
    ];

    pub fn code(self) -> i64 {
        match self {
            LoanStatus::Pending => 1,
            LoanStatus::Active => 2,
            LoanStatus::Closed => 3,
            LoanStatus::Defaulted => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Active => "active",
            LoanStatus::Closed => "closed",
            LoanStatus::Defaulted => "defaulted",
        }
    }
}

impl TryFrom<i64> for LoanStatus {
    type Error = UnknownStatus;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(LoanStatus::Pending),
            2 => Ok(LoanStatus::Active),
            3 => Ok(LoanStatus::Closed),
            4 => Ok(LoanStatus::Defaulted),
            _ => Err(UnknownStatus {
                entity: "loan",
                value: code.to_string(),
            }),
        }
    }
}

impl FromStr for LoanStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LoanStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownStatus {
                entity: "loan",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status selector for customer loan listings.
///
/// `All` is the "no status filter" sentinel. It has no stored representation.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub enum LoanStatusFilter {
    #[default]
    All,
    Only(LoanStatus),
}

impl LoanStatusFilter {
    pub fn matches(self, status: LoanStatus) -> bool {
        match self {
            LoanStatusFilter::All => true,
            LoanStatusFilter::Only(wanted) => wanted == status,
        }
    }
}

impl From<LoanStatus> for LoanStatusFilter {
    fn from(status: LoanStatus) -> Self {
        LoanStatusFilter::Only(status)
    }
}

impl FromStr for LoanStatusFilter {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(LoanStatusFilter::All)
        } else {
            s.parse().map(LoanStatusFilter::Only)
        }
    }
}

/// Lifecycle of a single installment.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoanDetailStatus {
    #[default]
    Unpaid,
    Paid,
    Overdue,
}

impl LoanDetailStatus {
    pub fn code(self) -> i64 {
        match self {
            LoanDetailStatus::Unpaid => 1,
            LoanDetailStatus::Paid => 2,
            LoanDetailStatus::Overdue => 3,
        }
    }
}

impl TryFrom<i64> for LoanDetailStatus {
    type Error = UnknownStatus;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(LoanDetailStatus::Unpaid),
            2 => Ok(LoanDetailStatus::Paid),
            3 => Ok(LoanDetailStatus::Overdue),
            _ => Err(UnknownStatus {
                entity: "loan details",
                value: code.to_string(),
            }),
        }
    }
}

/// A lending agreement header.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Loan {
    /// Store-generated identifier. Zero until the loan is persisted.
    pub id: i64,
    pub customer_id: i64,
    pub name: String,
    /// Principal.
    pub amount: Decimal,
    pub amount_interest: Decimal,
    pub annual_rate_percentage: Decimal,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub status: LoanStatus,
}

/// One scheduled repayment unit of a loan.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct LoanDetails {
    pub id: i64,
    pub loan_id: i64,
    pub name: String,
    pub amount: Decimal,
    pub status: LoanDetailStatus,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    /// Settling payment, stamped when the installment is paid.
    pub payment_id: Option<i64>,
}

impl LoanDetails {
    /// An unpaid installment not yet attached to a loan.
    pub fn installment(
        name: impl Into<String>,
        amount: Decimal,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Self {
        Self {
            id: 0,
            loan_id: 0,
            name: name.into(),
            amount,
            status: LoanDetailStatus::Unpaid,
            start_date,
            end_date,
            payment_id: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.payment_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn test_loan_status_codes_round_trip() {
        for status in LoanStatus::ALL {
            assert_eq!(LoanStatus::try_from(status.code()), Ok(status));
        }
    }

    #[test]
    fn test_unknown_codes_are_rejected() {
        assert!(LoanStatus::try_from(0).is_err());
        assert!(LoanStatus::try_from(5).is_err());
        assert!(LoanDetailStatus::try_from(0).is_err());
        assert!(LoanDetailStatus::try_from(-1).is_err());

        let err = LoanDetailStatus::try_from(9).unwrap_err();
        assert_eq!(err.to_string(), "unknown loan details status 9");
    }

    #[test]
    fn test_status_filter_parsing() {
        assert_eq!("all".parse(), Ok(LoanStatusFilter::All));
        assert_eq!(
            "Defaulted".parse(),
            Ok(LoanStatusFilter::Only(LoanStatus::Defaulted))
        );
        assert!("settled".parse::<LoanStatusFilter>().is_err());
    }

    #[test]
    fn test_status_filter_matches() {
        assert!(LoanStatusFilter::All.matches(LoanStatus::Closed));
        assert!(LoanStatusFilter::from(LoanStatus::Active).matches(LoanStatus::Active));
        assert!(!LoanStatusFilter::from(LoanStatus::Active).matches(LoanStatus::Pending));
    }

    #[test]
    fn test_new_installment_is_unpaid_and_unlinked() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 1, 31)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let installment = LoanDetails::installment("january", dec!(500), start, end);

        assert_eq!(installment.status, LoanDetailStatus::Unpaid);
        assert_eq!(installment.loan_id, 0);
        assert!(!installment.is_settled());
        assert_eq!(
            installment.end_date.format(DATE_FORMAT).to_string(),
            "2026-01-31 23:59:59"
        );
    }
}

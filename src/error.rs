use std::fmt;
use thiserror::Error;

/// Step of the loan creation protocol that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateStage {
    Begin,
    InsertLoan,
    InsertLoanDetails,
    Commit,
}

impl fmt::Display for CreateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            CreateStage::Begin => "begin transaction",
            CreateStage::InsertLoan => "insert loan",
            CreateStage::InsertLoanDetails => "insert loan details",
            CreateStage::Commit => "commit",
        };
        f.write_str(stage)
    }
}

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{context}: database unavailable: {source}")]
    Connectivity {
        context: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("{context}: statement failed: {source}")]
    Statement {
        context: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("{context}: cannot decode row: {source}")]
    Scan {
        context: String,
        #[source]
        source: sqlx::Error,
    },
    #[error("create loan for customer {customer_id}: {stage} failed: {source}")]
    Create {
        customer_id: i64,
        stage: CreateStage,
        #[source]
        source: sqlx::Error,
    },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LedgerError {
    /// Classifies a store error raised while running `context`.
    pub fn store(context: impl Into<String>, source: sqlx::Error) -> Self {
        let context = context.into();
        if is_connectivity(&source) {
            LedgerError::Connectivity { context, source }
        } else if is_decode(&source) {
            LedgerError::Scan { context, source }
        } else {
            LedgerError::Statement { context, source }
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LedgerError::NotFound { .. })
    }

    /// True for begin/commit failures of the creation protocol.
    pub fn is_transaction(&self) -> bool {
        matches!(
            self,
            LedgerError::Create {
                stage: CreateStage::Begin | CreateStage::Commit,
                ..
            }
        )
    }
}

fn is_connectivity(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Configuration(_)
    )
}

fn is_decode(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_)
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnIndexOutOfBounds { .. }
            | sqlx::Error::TypeNotFound { .. }
    )
}

pub type Result<T> = std::result::Result<T, LedgerError>;

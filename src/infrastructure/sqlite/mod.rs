//! SQLite storage backend.
//!
//! - `database`: pools for the logical `loan`, `customer` and `payment` databases
//! - `schema`: idempotent DDL for every ledger table
//! - `installments`: parameterized bulk insert of installment rows
//! - `repository`: [`SqliteLoanRepository`], the `LoanRepository` implementation
//!
//! Statuses are stored as integer codes and dates as `YYYY-MM-DD HH:MM:SS`
//! text; the helpers in `conversions` own both directions.

mod conversions;
pub mod database;
pub mod installments;
pub mod repository;
pub mod schema;

pub use database::Database;
pub use repository::SqliteLoanRepository;
pub use schema::provision;

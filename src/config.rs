use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Logical databases the ledger talks to.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseName {
    Customer,
    Loan,
    Payment,
}

impl DatabaseName {
    /// Provisioning order. Customer comes first so the loan foreign key has a parent.
    pub const ALL: [DatabaseName; 3] = [
        DatabaseName::Customer,
        DatabaseName::Loan,
        DatabaseName::Payment,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DatabaseName::Customer => "customer",
            DatabaseName::Loan => "loan",
            DatabaseName::Payment => "payment",
        }
    }
}

impl fmt::Display for DatabaseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct DatabaseConfig {
    pub name: DatabaseName,
    /// SQLite URL, e.g. `sqlite://ledger.db`.
    pub url: String,
}

/// Runtime configuration for the ledger store.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
#[serde(default)]
pub struct LedgerConfig {
    pub databases: Vec<DatabaseConfig>,
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    /// Enforce foreign keys. Loan and customer must then share one store.
    pub foreign_keys: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self::single_file("sqlite://ledger.db")
    }
}

impl LedgerConfig {
    /// All logical databases backed by the same SQLite URL.
    pub fn single_file(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            databases: DatabaseName::ALL
                .into_iter()
                .map(|name| DatabaseConfig {
                    name,
                    url: url.clone(),
                })
                .collect(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
            foreign_keys: true,
        }
    }

    /// Reads and validates a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: LedgerConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(LedgerError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        for name in DatabaseName::ALL {
            let count = self.databases.iter().filter(|db| db.name == name).count();
            if count != 1 {
                return Err(LedgerError::Config(format!(
                    "database '{name}' must be configured exactly once, found {count}"
                )));
            }
        }
        Ok(())
    }

    pub fn url(&self, name: DatabaseName) -> Result<&str> {
        self.databases
            .iter()
            .find(|db| db.name == name)
            .map(|db| db.url.as_str())
            .ok_or_else(|| LedgerError::Config(format!("database '{name}' is not configured")))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

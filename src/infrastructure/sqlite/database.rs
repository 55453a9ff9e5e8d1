use crate::config::{DatabaseName, LedgerConfig};
use crate::error::{LedgerError, Result};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use std::collections::HashMap;
use std::str::FromStr;
use tracing::debug;

/// Connection pools for the logical ledger databases.
///
/// Logical names configured with the same URL share one pool, so they see
/// the same SQLite file. Cloning is cheap: pools are reference counted.
#[derive(Clone)]
pub struct Database {
    pools: HashMap<DatabaseName, SqlitePool>,
}

impl Database {
    /// Opens (creating files where missing) every configured database.
    pub async fn connect(config: &LedgerConfig) -> Result<Self> {
        config.validate()?;

        let mut by_url: HashMap<&str, SqlitePool> = HashMap::new();
        let mut pools = HashMap::new();

        for name in DatabaseName::ALL {
            let url = config.url(name)?;
            let pool = match by_url.get(url) {
                Some(pool) => pool.clone(),
                None => {
                    let pool = open_pool(config, url).await?;
                    by_url.insert(url, pool.clone());
                    pool
                }
            };
            debug!(database = %name, url, "database pool ready");
            pools.insert(name, pool);
        }

        Ok(Self { pools })
    }

    pub fn pool(&self, name: DatabaseName) -> Result<&SqlitePool> {
        self.pools
            .get(&name)
            .ok_or_else(|| LedgerError::Config(format!("database '{name}' is not connected")))
    }

    pub async fn close(&self) {
        for pool in self.pools.values() {
            pool.close().await;
        }
    }
}

async fn open_pool(config: &LedgerConfig, url: &str) -> Result<SqlitePool> {
    if !url.starts_with("sqlite:") {
        return Err(LedgerError::Config(format!(
            "invalid database url '{url}': expected a sqlite: url"
        )));
    }
    let options = SqliteConnectOptions::from_str(url)
        .map_err(|e| LedgerError::Config(format!("invalid database url '{url}': {e}")))?
        .create_if_missing(true)
        .foreign_keys(config.foreign_keys)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(config.busy_timeout());

    SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| LedgerError::store(format!("connect {url}"), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_connect_creates_missing_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.db");
        let config = LedgerConfig::single_file(format!("sqlite://{}", path.display()));

        let db = Database::connect(&config).await.unwrap();
        assert!(path.exists());
        for name in DatabaseName::ALL {
            assert!(db.pool(name).is_ok());
        }
        db.close().await;
    }

    #[tokio::test]
    async fn test_shared_url_shares_the_file() {
        let dir = tempdir().unwrap();
        let shared = format!("sqlite://{}", dir.path().join("shared.db").display());
        let payment = format!("sqlite://{}", dir.path().join("payment.db").display());
        let mut config = LedgerConfig::single_file(shared);
        config.databases.retain(|db| db.name != DatabaseName::Payment);
        config.databases.push(DatabaseConfig {
            name: DatabaseName::Payment,
            url: payment,
        });

        let db = Database::connect(&config).await.unwrap();
        sqlx::query("CREATE TABLE marker (id INTEGER)")
            .execute(db.pool(DatabaseName::Loan).unwrap())
            .await
            .unwrap();

        let on_customer: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'marker'")
                .fetch_one(db.pool(DatabaseName::Customer).unwrap())
                .await
                .unwrap();
        let on_payment: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'marker'")
                .fetch_one(db.pool(DatabaseName::Payment).unwrap())
                .await
                .unwrap();
        assert_eq!(on_customer, 1);
        assert_eq!(on_payment, 0);
    }

    #[tokio::test]
    async fn test_invalid_url_is_a_config_error() {
        let config = LedgerConfig::single_file("postgres://nope");
        assert!(matches!(
            Database::connect(&config).await,
            Err(LedgerError::Config(_))
        ));
    }
}

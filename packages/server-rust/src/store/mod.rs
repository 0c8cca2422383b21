//! Row stores backing the list-query service.
//!
//! [`RowStore`] executes validated [`ListPlan`]s and key lookups. Two
//! implementations exist:
//!
//! - [`MemoryRowStore`]: in-process rows seeded from a JSON fixture
//! - `MySqlRowStore` (feature `mysql`): the dashboard's MySQL schema via `sqlx`

pub mod memory;
#[cfg(feature = "mysql")]
pub mod mysql;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use lcadash_core::Row;
use tracing::info;

use crate::query::{Condition, ListPlan};

pub use memory::MemoryRowStore;
#[cfg(feature = "mysql")]
pub use mysql::MySqlRowStore;

/// Pluggable row storage for the list-query service.
///
/// Every identifier reaching a store has been validated against the
/// resource catalog. Errors mean the store is unreachable or faulted and
/// surface as upstream failures.
///
/// Used as `Arc<dyn RowStore>`.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Rows matching the plan's predicate, ordered, within its window.
    async fn list(&self, plan: &ListPlan) -> anyhow::Result<Vec<Row>>;

    /// Number of rows matching the plan's predicate, ignoring the window.
    async fn count(&self, plan: &ListPlan) -> anyhow::Result<u64>;

    /// Rows satisfying every condition, ordered by `order_by` ascending.
    async fn fetch_where(
        &self,
        resource: &'static str,
        conditions: &[Condition],
        order_by: &'static str,
    ) -> anyhow::Result<Vec<Row>>;

    /// One-time initialization (e.g., verify connectivity).
    async fn initialize(&self) -> anyhow::Result<()>;

    /// Release resources and close connections.
    async fn close(&self) -> anyhow::Result<()>;
}

/// Connection parameters of the MySQL row store.
#[derive(Debug, Clone)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_connections: u32,
}

/// Which row store to open at startup.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    /// In-memory store, optionally seeded from a JSON fixture file.
    Memory { seed_file: Option<PathBuf> },
    /// MySQL store (requires the `mysql` feature).
    MySql(MySqlConfig),
}

/// Opens the configured row store.
///
/// # Errors
///
/// Returns an error if the seed file cannot be read or parsed, if the
/// database is unreachable, or if MySQL is requested in a build without
/// the `mysql` feature.
pub async fn open_store(config: &StoreConfig) -> anyhow::Result<Arc<dyn RowStore>> {
    match config {
        StoreConfig::Memory { seed_file } => {
            let store = match seed_file {
                Some(path) => MemoryRowStore::from_json_file(path)?,
                None => MemoryRowStore::new(),
            };
            info!(rows = store.row_count(), "opened in-memory row store");
            Ok(Arc::new(store))
        }
        #[cfg(feature = "mysql")]
        StoreConfig::MySql(mysql) => {
            let store = MySqlRowStore::connect(mysql).await?;
            info!(host = %mysql.host, database = %mysql.database, "opened MySQL row store");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "mysql"))]
        StoreConfig::MySql(_) => Err(anyhow::anyhow!(
            "MySQL connection configured but this build lacks the `mysql` feature"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn open_store_defaults_to_empty_memory() {
        let store = open_store(&StoreConfig::Memory { seed_file: None })
            .await
            .unwrap();
        store.initialize().await.unwrap();
        let rows = store
            .fetch_where("buildings", &[], "idbuildings")
            .await
            .unwrap();
        assert!(rows.is_empty());
    }

    #[cfg(not(feature = "mysql"))]
    #[tokio::test]
    async fn open_store_rejects_mysql_without_feature() {
        let config = StoreConfig::MySql(MySqlConfig {
            host: "localhost".to_string(),
            port: 3306,
            user: "lca".to_string(),
            password: String::new(),
            database: "lca".to_string(),
            max_connections: 1,
        });
        assert!(open_store(&config).await.is_err());
    }
}

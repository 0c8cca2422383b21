//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback so the server runs unchanged
//! under a process manager or in a container.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser};

use crate::network::NetworkConfig;
use crate::service::ServiceConfig;
use crate::store::{MySqlConfig, StoreConfig};
use crate::telemetry::LogFormat;

/// Dashboard API server.
#[derive(Debug, Clone, Parser)]
#[command(name = "lcadash-server", version, about)]
pub struct ServerArgs {
    #[arg(long, env = "LCADASH_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "LCADASH_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Comma-separated allowed origins, or `*`.
    #[arg(
        long = "cors-origins",
        env = "LCADASH_CORS_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    pub cors_origins: Vec<String>,

    #[arg(long, env = "LCADASH_REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,

    /// `take` used when a list request omits it.
    #[arg(long, env = "LCADASH_DEFAULT_PAGE_SIZE", default_value_t = 100)]
    pub default_page_size: u64,

    /// Upper bound on `take`.
    #[arg(long, env = "LCADASH_MAX_PAGE_SIZE", default_value_t = 1000)]
    pub max_page_size: u64,

    /// JSON fixture for the in-memory store. Ignored when MySQL is configured.
    #[arg(long, env = "LCADASH_SEED_FILE")]
    pub seed_file: Option<PathBuf>,

    #[arg(long, env = "LCADASH_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub mysql: MySqlArgs,
}

/// MySQL connection. Setting the host selects the MySQL store.
#[derive(Debug, Clone, Args)]
pub struct MySqlArgs {
    #[arg(id = "mysql_host", long = "mysql-host", env = "MYSQL_HOST")]
    pub host: Option<String>,

    #[arg(id = "mysql_port", long = "mysql-port", env = "MYSQL_PORT", default_value_t = 3306)]
    pub port: u16,

    #[arg(long = "mysql-user", env = "MYSQL_USER", default_value = "root")]
    pub user: String,

    #[arg(
        long = "mysql-password",
        env = "MYSQL_PWD",
        default_value = "",
        hide_env_values = true
    )]
    pub password: String,

    #[arg(long = "mysql-db", env = "MYSQL_DB", default_value = "lca")]
    pub database: String,

    #[arg(long = "mysql-max-connections", default_value_t = 10)]
    pub max_connections: u32,
}

impl ServerArgs {
    /// Rejects settings no request could be served under.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_page_size` is zero.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(self.max_page_size > 0, "max page size must be positive");
        Ok(())
    }

    #[must_use]
    pub fn network_config(&self) -> NetworkConfig {
        NetworkConfig {
            host: self.host.clone(),
            port: self.port,
            cors_origins: self.cors_origins.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            ..NetworkConfig::default()
        }
    }

    /// Paging limits; a default page size above the maximum is lowered to it.
    #[must_use]
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            default_page_size: self.default_page_size.min(self.max_page_size),
            max_page_size: self.max_page_size,
        }
    }

    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        match &self.mysql.host {
            Some(host) => StoreConfig::MySql(MySqlConfig {
                host: host.clone(),
                port: self.mysql.port,
                user: self.mysql.user.clone(),
                password: self.mysql.password.clone(),
                database: self.mysql.database.clone(),
                max_connections: self.mysql.max_connections,
            }),
            None => StoreConfig::Memory {
                seed_file: self.seed_file.clone(),
            },
        }
    }
}

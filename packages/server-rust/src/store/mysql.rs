//! MySQL [`RowStore`] over the dashboard schema, using `sqlx`.
//!
//! Statements are rendered by [`crate::query::sql`]; every user-supplied
//! value is bound as a parameter. Columns are decoded dynamically into
//! [`Value`] since row shapes are resource-defined.

use async_trait::async_trait;
use lcadash_core::{Row, Value};
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, Row as _, TypeInfo, ValueRef};
use tracing::debug;

use crate::query::sql::{self, SqlStatement};
use crate::query::{Condition, ListPlan};
use crate::store::{MySqlConfig, RowStore};

/// Row store backed by a MySQL connection pool.
pub struct MySqlRowStore {
    pool: MySqlPool,
}

impl MySqlRowStore {
    /// Opens a connection pool with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be reached.
    pub async fn connect(config: &MySqlConfig) -> anyhow::Result<Self> {
        let options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.database);
        let pool = MySqlPoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?;
        Ok(Self { pool })
    }

    async fn fetch(&self, stmt: &SqlStatement) -> anyhow::Result<Vec<MySqlRow>> {
        debug!(sql = %stmt.sql, params = stmt.params.len(), "executing statement");
        let mut query = sqlx::query(&stmt.sql);
        for param in &stmt.params {
            query = bind_value(query, param);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }
}

fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: &Value,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        Value::Null => query.bind(None::<i64>),
        Value::Bool(b) => query.bind(*b),
        Value::Int(i) => query.bind(*i),
        Value::Float(f) => query.bind(*f),
        Value::String(s) => query.bind(s.clone()),
    }
}

fn decode_column(row: &MySqlRow, index: usize) -> anyhow::Result<Value> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }
    let type_name = raw.type_info().name().to_ascii_uppercase();

    let value = match type_name.as_str() {
        "BOOLEAN" => Value::Bool(row.try_get::<bool, _>(index)?),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            Value::Int(row.try_get_unchecked::<i64, _>(index)?)
        }
        t if t.ends_with("UNSIGNED") => {
            let n = row.try_get_unchecked::<u64, _>(index)?;
            i64::try_from(n).map_or_else(|_| Value::String(n.to_string()), Value::Int)
        }
        "FLOAT" => Value::Float(f64::from(row.try_get::<f32, _>(index)?)),
        "DOUBLE" => Value::Float(row.try_get::<f64, _>(index)?),
        "DECIMAL" => {
            let text = row.try_get_unchecked::<String, _>(index)?;
            text.parse::<f64>()
                .map_or(Value::String(text), Value::Float)
        }
        _ => match row.try_get::<String, _>(index) {
            Ok(text) => Value::String(text),
            Err(_) => {
                debug!(column = index, type_name = %type_name, "undecodable column rendered as null");
                Value::Null
            }
        },
    };
    Ok(value)
}

fn decode_row(row: &MySqlRow) -> anyhow::Result<Row> {
    row.columns()
        .iter()
        .map(|col| Ok((col.name().to_string(), decode_column(row, col.ordinal())?)))
        .collect()
}

#[async_trait]
impl RowStore for MySqlRowStore {
    async fn list(&self, plan: &ListPlan) -> anyhow::Result<Vec<Row>> {
        let rows = self.fetch(&sql::list_statement(plan)).await?;
        rows.iter().map(decode_row).collect()
    }

    async fn count(&self, plan: &ListPlan) -> anyhow::Result<u64> {
        let rows = self.fetch(&sql::count_statement(plan)).await?;
        let total: i64 = match rows.first() {
            Some(row) => row.try_get("total")?,
            None => 0,
        };
        Ok(u64::try_from(total).unwrap_or(0))
    }

    async fn fetch_where(
        &self,
        resource: &'static str,
        conditions: &[Condition],
        order_by: &'static str,
    ) -> anyhow::Result<Vec<Row>> {
        let rows = self
            .fetch(&sql::select_where(resource, conditions, order_by))
            .await?;
        rows.iter().map(decode_row).collect()
    }

    async fn initialize(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        self.pool.close().await;
        Ok(())
    }
}

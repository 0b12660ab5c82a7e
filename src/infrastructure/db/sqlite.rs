use super::DataStore;
use crate::domain::analysis::ResultRow;
use crate::domain::error::{AppError, Result};
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Pool, Row, Sqlite};
use std::str::FromStr;
use std::time::Duration;

/// SQLite copy of the dataset, for local analysis and tests.
pub struct SqliteDataStore {
    pool: Pool<Sqlite>,
    query_timeout: Duration,
}

impl SqliteDataStore {
    pub async fn connect(database_url: &str, max_connections: u32, query_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| {
                AppError::DatabaseError(format!("Failed to parse connection string: {}", e))
            })?
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to connect: {}", e)))?;

        Ok(Self::from_pool(pool, query_timeout))
    }

    pub fn from_pool(pool: Pool<Sqlite>, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    fn row_to_map(row: &SqliteRow) -> ResultRow {
        let mut map = ResultRow::new();
        for (i, column) in row.columns().iter().enumerate() {
            map.insert(column.name().to_string(), Self::column_value(row, i));
        }
        map
    }

    fn column_value(row: &SqliteRow, index: usize) -> serde_json::Value {
        use serde_json::Value;

        if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            return v.map(Value::String).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            return v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            return v
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
            return v.map(Value::Bool).unwrap_or(Value::Null);
        }

        Value::Null
    }
}

#[async_trait]
impl DataStore for SqliteDataStore {
    async fn query(&self, sql: &str) -> Result<Vec<ResultRow>> {
        let rows = tokio::time::timeout(self.query_timeout, sqlx::query(sql).fetch_all(&self.pool))
            .await
            .map_err(|_| {
                AppError::DatabaseError(format!(
                    "Query timed out after {} seconds",
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(|e| AppError::DatabaseError(format!("Query execution failed: {}", e)))?;

        Ok(rows.iter().map(Self::row_to_map).collect())
    }
}

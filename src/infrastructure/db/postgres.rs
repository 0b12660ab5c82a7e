//! PostgreSQL store for the production dataset.
//!
//! One pool per process, shared by every request. Statement text is sent
//! as-is; read-only enforcement happens in the query executor.

use super::{decimal_to_json, DataStore};
use crate::domain::analysis::ResultRow;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::config::DatabaseSettings;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow, PgSslMode};
use sqlx::{Column, Pool, Postgres, Row};
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info};

pub struct PgDataStore {
    pool: Pool<Postgres>,
    query_timeout: Duration,
}

impl PgDataStore {
    pub async fn connect(settings: &DatabaseSettings, password: Option<&str>) -> Result<Self> {
        let options = Self::build_options(settings, password)?;

        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.connect_timeout())
            .idle_timeout(settings.idle_timeout())
            .connect_with(options)
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e))
            })?;

        info!(
            host = settings.host.as_deref().unwrap_or("url"),
            max_connections = settings.max_connections,
            "Created PostgreSQL connection pool"
        );

        Ok(Self {
            pool,
            query_timeout: settings.query_timeout(),
        })
    }

    fn parse_ssl_mode(ssl_mode: &str) -> PgSslMode {
        match ssl_mode.to_lowercase().as_str() {
            "disable" => PgSslMode::Disable,
            "allow" => PgSslMode::Allow,
            "prefer" => PgSslMode::Prefer,
            "require" => PgSslMode::Require,
            "verify-ca" => PgSslMode::VerifyCa,
            "verify-full" => PgSslMode::VerifyFull,
            _ => PgSslMode::Prefer,
        }
    }

    fn build_options(settings: &DatabaseSettings, password: Option<&str>) -> Result<PgConnectOptions> {
        let mut options = match settings.url.as_deref() {
            Some(url) => PgConnectOptions::from_str(url).map_err(|e| {
                AppError::ConfigError(format!("Invalid PostgreSQL URL: {}", e))
            })?,
            None => {
                let host = settings.host.as_deref().ok_or_else(|| {
                    AppError::ConfigError("PostgreSQL host is required".to_string())
                })?;
                let mut options = PgConnectOptions::new().host(host).port(settings.port);
                if let Some(database) = settings.database.as_deref() {
                    options = options.database(database);
                }
                if let Some(username) = settings.username.as_deref() {
                    options = options.username(username);
                }
                options
            }
        };

        if let Some(password) = password {
            options = options.password(password);
        }

        Ok(options.ssl_mode(Self::parse_ssl_mode(&settings.ssl_mode)))
    }

    fn row_to_map(row: &PgRow) -> ResultRow {
        let mut map = ResultRow::new();
        for (i, column) in row.columns().iter().enumerate() {
            map.insert(column.name().to_string(), Self::column_value(row, i));
        }
        map
    }

    /// Decodes a column into JSON by trying the types the dataset uses.
    fn column_value(row: &PgRow, index: usize) -> serde_json::Value {
        use serde_json::Value;

        if let Ok(v) = row.try_get::<Option<String>, _>(index) {
            return v.map(Value::String).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
            return v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
            return v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
            return v.map(|n| Value::Number(n.into())).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<BigDecimal>, _>(index) {
            return v.map(decimal_to_json).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
            return v
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
            return v
                .and_then(|n| serde_json::Number::from_f64(n as f64))
                .map(Value::Number)
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
            return v.map(Value::Bool).unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
            return v
                .map(|d| Value::String(d.to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index) {
            return v
                .map(|dt| Value::String(dt.to_rfc3339()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
            return v
                .map(|dt| Value::String(dt.to_string()))
                .unwrap_or(Value::Null);
        }
        if let Ok(v) = row.try_get::<Option<serde_json::Value>, _>(index) {
            return v.unwrap_or(Value::Null);
        }

        Value::Null
    }
}

#[async_trait]
impl DataStore for PgDataStore {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::DatabaseBackend;

    #[test]
    fn test_parse_ssl_mode() {
        assert!(matches!(
            PgDataStore::parse_ssl_mode("disable"),
            PgSslMode::Disable
        ));
        assert!(matches!(
            PgDataStore::parse_ssl_mode("REQUIRE"),
            PgSslMode::Require
        ));
        assert!(matches!(
            PgDataStore::parse_ssl_mode("unknown"),
            PgSslMode::Prefer
        ));
    }

    #[test]
    fn test_build_options_from_parts() {
        let settings = DatabaseSettings {
            backend: DatabaseBackend::Postgres,
            host: Some("db.internal".to_string()),
            database: Some("funding".to_string()),
            username: Some("analyst".to_string()),
            ..DatabaseSettings::default()
        };
        let options = PgDataStore::build_options(&settings, Some("secret")).unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 17233);
        assert_eq!(options.get_database(), Some("funding"));
        assert_eq!(options.get_username(), "analyst");
    }

    #[test]
    fn test_build_options_rejects_bad_url() {
        let settings = DatabaseSettings {
            url: Some("not a url".to_string()),
            ..DatabaseSettings::default()
        };
        let err = PgDataStore::build_options(&settings, None).unwrap_err();
        assert_eq!(err.kind(), "config_error");
    }
}

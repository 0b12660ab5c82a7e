pub mod postgres;
pub mod sqlite;

use crate::domain::analysis::ResultRow;
use crate::domain::error::Result;
use async_trait::async_trait;
use bigdecimal::{BigDecimal, ToPrimitive};

/// Read access to the funding dataset. Implementations are pooled and safe
/// to share between concurrent requests.
#[async_trait]
pub trait DataStore {
    /// Runs `sql` and returns rows in store order, columns in select order.
    async fn query(&self, sql: &str) -> Result<Vec<ResultRow>>;
}

pub(crate) fn decimal_to_json(value: BigDecimal) -> serde_json::Value {
    if value.is_integer() {
        if let Some(n) = value.to_i64() {
            return serde_json::Value::Number(n.into());
        }
    }
    value
        .to_f64()
        .and_then(serde_json::Number::from_f64)
        .map(serde_json::Value::Number)
        .unwrap_or_else(|| serde_json::Value::String(value.to_string()))
}

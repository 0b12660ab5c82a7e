use crate::domain::analysis::{starts_with_select, ResultRow};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::DataStore;
use std::sync::Arc;
use tracing::debug;

/// Runs a candidate statement against the dataset, refusing anything that is
/// not a SELECT. The statement text is passed through untouched.
pub struct QueryExecutor {
    store: Arc<dyn DataStore + Send + Sync>,
}

impl QueryExecutor {
    pub fn new(store: Arc<dyn DataStore + Send + Sync>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, statement: &str) -> Result<Vec<ResultRow>> {
        if !starts_with_select(statement) {
            return Err(AppError::ExecutionRejected(
                "Only SELECT queries are allowed".to_string(),
            ));
        }

        let rows = self
            .store
            .query(statement)
            .await
            .map_err(|e| AppError::ExecutionError(e.detail()))?;

        debug!(rows = rows.len(), "Statement executed");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::ScriptedStore;
    use crate::infrastructure::db::sqlite::tests::seeded_store;

    #[tokio::test]
    async fn test_non_select_is_rejected_without_store_call() {
        let store = Arc::new(ScriptedStore::new(vec![]));
        let executor = QueryExecutor::new(store.clone());

        for statement in ["DELETE FROM deals;", "  update companies set year = 1;", "WITH x AS (SELECT 1) SELECT * FROM x;"] {
            let err = executor.execute(statement).await.unwrap_err();
            assert_eq!(err.kind(), "execution_rejected");
        }
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_select_prefix_is_case_insensitive() {
        let store = seeded_store().await;
        let executor = QueryExecutor::new(Arc::new(store));

        let rows = executor
            .execute("  select c.title from companies c where c.canton = 'ZG';")
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], serde_json::json!("Ledgerly"));
    }

    #[tokio::test]
    async fn test_store_failure_becomes_execution_error() {
        let store = seeded_store().await;
        let executor = QueryExecutor::new(Arc::new(store));

        let err = executor
            .execute("SELECT c.missing_column FROM companies c;")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "execution_error");
        assert!(!err.detail().starts_with("Database error"));
    }
}

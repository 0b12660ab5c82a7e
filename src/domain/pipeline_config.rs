//! Immutable configuration shared by every stage of the analysis pipeline.

use crate::domain::llm_config::ModelProfiles;
use crate::domain::schema::SchemaDescriptor;
use std::collections::BTreeSet;

/// Column names that never leave the pipeline, whichever table they come
/// from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestrictedColumns(BTreeSet<String>);

impl RestrictedColumns {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(columns.into_iter().map(Into::into).collect())
    }

    pub fn from_schema(schema: &SchemaDescriptor) -> Self {
        Self(schema.restricted_columns())
    }

    pub fn contains(&self, column: &str) -> bool {
        self.0.contains(column)
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|c| c.as_str())
    }
}

/// Retry behaviour of the orchestrator. Retries are count-bounded with no
/// backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Spend another attempt when the candidate is not a SELECT.
    pub retry_rejected: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_rejected: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub schema: SchemaDescriptor,
    /// Cached `schema.render()`.
    pub schema_text: String,
    pub models: ModelProfiles,
    pub restricted: RestrictedColumns,
    pub retry: RetryPolicy,
}

impl PipelineConfig {
    pub fn new(schema: SchemaDescriptor, models: ModelProfiles, retry: RetryPolicy) -> Self {
        let schema_text = schema.render();
        let restricted = RestrictedColumns::from_schema(&schema);
        Self {
            schema,
            schema_text,
            models,
            restricted,
            retry,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(
            SchemaDescriptor::funding_dataset(),
            ModelProfiles::default(),
            RetryPolicy::default(),
        )
    }
}

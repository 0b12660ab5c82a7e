//! Scripted fakes shared by the pipeline tests.

use crate::application::use_cases::analysis_events::{AnalysisEvent, AnalysisObserver, RequestContext};
use crate::domain::analysis::ResultRow;
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::db::DataStore;
use crate::infrastructure::llm_clients::LLMClient;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone)]
pub struct LlmCall {
    pub system: String,
    pub user: String,
    pub temperature: Option<f32>,
}

/// Replays canned model responses in order and records every call.
pub struct ScriptedLlmClient {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<LlmCall>>,
}

impl ScriptedLlmClient {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<LlmCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMClient for ScriptedLlmClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        self.calls.lock().unwrap().push(LlmCall {
            system: system.to_string(),
            user: user.to_string(),
            temperature: config.temperature,
        });
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::LLMError("script exhausted".to_string())))
    }
}

/// Replays canned query results in order and records every statement.
pub struct ScriptedStore {
    results: Mutex<VecDeque<Result<Vec<ResultRow>>>>,
    statements: Mutex<Vec<String>>,
}

impl ScriptedStore {
    pub fn new(results: Vec<Result<Vec<ResultRow>>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            statements: Mutex::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.statements.lock().unwrap().len()
    }
}

#[async_trait]
impl DataStore for ScriptedStore {
    async fn query(&self, sql: &str) -> Result<Vec<ResultRow>> {
        self.statements.lock().unwrap().push(sql.to_string());
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(AppError::DatabaseError("script exhausted".to_string())))
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<(RequestContext, AnalysisEvent)>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<AnalysisEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn contexts(&self) -> Vec<RequestContext> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(context, _)| context.clone())
            .collect()
    }
}

impl AnalysisObserver for RecordingObserver {
    fn on_event(&self, context: &RequestContext, event: &AnalysisEvent) {
        self.events
            .lock()
            .unwrap()
            .push((context.clone(), event.clone()));
    }
}

/// Builds a row from a JSON object literal.
pub fn row(value: serde_json::Value) -> ResultRow {
    value.as_object().cloned().unwrap_or_default()
}

pub fn sql_block(sql: &str) -> String {
    format!("```sql\n{}\n```", sql)
}

//! Entry points callers use: analysis alone, analysis with a custom budget,
//! and analysis followed by narrative synthesis.

use crate::application::use_cases::analysis_events::{
    AnalysisEvent, AnalysisObserver, NarrativePart, RequestContext, TracingObserver,
};
use crate::application::use_cases::narrative_synthesizer::{
    answer_fallback, explanation_fallback, NarrativeSynthesizer,
};
use crate::application::use_cases::retry_orchestrator::RetryOrchestrator;
use crate::domain::analysis::{
    AnalysisOutcome, AnalysisRequest, AttemptBudget, DEFAULT_MAX_WORDS, NO_DATA_ANSWER,
    NO_DATA_EXPLANATION,
};
use crate::domain::error::Result;
use crate::domain::pipeline_config::PipelineConfig;
use crate::infrastructure::db::DataStore;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use validator::Validate;

/// Shared by concurrent requests; every call is an independent chain.
pub struct AnalysisPipeline {
    orchestrator: RetryOrchestrator,
    synthesizer: NarrativeSynthesizer,
    observer: Arc<dyn AnalysisObserver>,
    default_budget: AttemptBudget,
    default_max_words: u32,
}

impl AnalysisPipeline {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        store: Arc<dyn DataStore + Send + Sync>,
        config: Arc<PipelineConfig>,
    ) -> Self {
        Self::with_observer(llm_client, store, config, Arc::new(TracingObserver))
    }

    pub fn with_observer(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        store: Arc<dyn DataStore + Send + Sync>,
        config: Arc<PipelineConfig>,
        observer: Arc<dyn AnalysisObserver>,
    ) -> Self {
        Self {
            orchestrator: RetryOrchestrator::new(
                llm_client.clone(),
                store,
                config.clone(),
                observer.clone(),
            ),
            synthesizer: NarrativeSynthesizer::new(llm_client, config),
            observer,
            default_budget: AttemptBudget::default(),
            default_max_words: DEFAULT_MAX_WORDS,
        }
    }

    /// Overrides the values `handle` falls back to when a request omits them.
    pub fn with_defaults(mut self, budget: AttemptBudget, max_words: u32) -> Self {
        self.default_budget = budget;
        self.default_max_words = max_words;
        self
    }

    /// Single attempt, no retries.
    pub async fn analyze(&self, question: &str) -> Result<AnalysisOutcome> {
        self.analyze_with_retries(question, AttemptBudget::new(1)?).await
    }

    pub async fn analyze_with_retries(
        &self,
        question: &str,
        budget: AttemptBudget,
    ) -> Result<AnalysisOutcome> {
        let context = RequestContext::new(question);
        self.orchestrator.run(question, budget, &context).await
    }

    pub async fn analyze_and_explain(
        &self,
        question: &str,
        budget: AttemptBudget,
        max_words: u32,
    ) -> Result<AnalysisOutcome> {
        let context = RequestContext::new(question);
        let outcome = self.orchestrator.run(question, budget, &context).await?;

        if !outcome.has_rows() {
            return Ok(outcome.with_narrative(
                NO_DATA_EXPLANATION.to_string(),
                NO_DATA_ANSWER.to_string(),
            ));
        }

        let statement = outcome.query.clone().unwrap_or_default();

        let started = Instant::now();
        let explanation = self
            .synthesizer
            .explain(&statement, &outcome.result, max_words)
            .await;
        self.narrative_finished(&context, NarrativePart::Explanation, explanation.is_ok(), started);
        let explanation = explanation.unwrap_or_else(|e| explanation_fallback(&e));

        let started = Instant::now();
        let answer = self.synthesizer.answer(question, &outcome.result).await;
        self.narrative_finished(&context, NarrativePart::Answer, answer.is_ok(), started);
        let answer = answer.unwrap_or_else(|e| answer_fallback(&e));

        Ok(outcome.with_narrative(explanation, answer))
    }

    /// Validates a transport-level request and runs the full analysis.
    pub async fn handle(&self, request: AnalysisRequest) -> Result<AnalysisOutcome> {
        request.validate()?;
        let budget = request.budget_or(self.default_budget)?;
        let max_words = request.max_words_or(self.default_max_words);

        info!(
            budget = budget.get(),
            max_words,
            "Handling analysis request"
        );
        self.analyze_and_explain(&request.query, budget, max_words).await
    }

    fn narrative_finished(&self, context: &RequestContext, part: NarrativePart, ok: bool, started: Instant) {
        self.observer.on_event(
            context,
            &AnalysisEvent::NarrativeFinished {
                part,
                ok,
                latency_ms: started.elapsed().as_millis() as u64,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::test_support::{row, sql_block, RecordingObserver, ScriptedLlmClient, ScriptedStore};
    use crate::domain::analysis::SAMPLE_QUESTIONS;
    use crate::domain::error::AppError;
    use crate::domain::llm_config::LLMConfig;
    use crate::infrastructure::db::sqlite::tests::seeded_store;
    use async_trait::async_trait;
    use serde_json::json;

    const BIOTECH_SQL: &str = "SELECT c.title, c.industry, c.canton FROM companies c WHERE c.industry = 'biotech' AND c.year > 2020;";

    fn pipeline(llm: Arc<ScriptedLlmClient>, store: Arc<dyn DataStore + Send + Sync>) -> AnalysisPipeline {
        AnalysisPipeline::new(llm, store, Arc::new(PipelineConfig::default()))
    }

    #[tokio::test]
    async fn test_biotech_question_against_sqlite() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok("true".to_string()),
            Ok(format!("Here is the query:\n{}", sql_block(BIOTECH_SQL))),
        ]));
        let store = Arc::new(seeded_store().await);
        let pipeline = pipeline(llm.clone(), store);

        let outcome = pipeline.analyze(SAMPLE_QUESTIONS[0]).await.unwrap();

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.query.as_deref(), Some(BIOTECH_SQL));
        assert_eq!(outcome.result.len(), 3);
        for r in &outcome.result {
            let keys: Vec<&str> = r.keys().map(|k| k.as_str()).collect();
            assert_eq!(keys, vec!["title", "industry", "canton"]);
        }
        assert_eq!(llm.call_count(), 2);
    }

    #[tokio::test]
    async fn test_restricted_columns_removed_end_to_end() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok("true".to_string()),
            Ok(sql_block("SELECT c.code, c.title, c.vertical FROM companies c ORDER BY c.code;")),
        ]));
        let store = Arc::new(seeded_store().await);
        let pipeline = pipeline(llm, store);

        let outcome = pipeline.analyze(SAMPLE_QUESTIONS[0]).await.unwrap();
        assert_eq!(outcome.result.len(), 4);
        assert!(outcome
            .result
            .iter()
            .all(|r| r.keys().all(|k| k == "title")));
    }

    #[tokio::test]
    async fn test_weather_question_is_rejected_with_one_model_call() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![Ok("false".to_string())]));
        let store = Arc::new(ScriptedStore::new(vec![]));
        let pipeline = pipeline(llm.clone(), store.clone());

        let err = pipeline
            .analyze_and_explain("What's the weather today?", AttemptBudget::default(), 100)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "context_rejected");
        assert_eq!(llm.call_count(), 1);
        assert_eq!(store.call_count(), 0);
    }

    #[tokio::test]
    async fn test_analyze_makes_exactly_one_attempt() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok("true".to_string()),
            Ok(sql_block("SELECT c.title FROM companies c WHERE c.year > 2030;")),
        ]));
        let store = Arc::new(ScriptedStore::new(vec![Ok(vec![])]));
        let pipeline = pipeline(llm, store);

        let outcome = pipeline.analyze("future").await.unwrap();
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.message.as_deref(), Some("No results found after 1 attempts"));
    }

    #[tokio::test]
    async fn test_explain_adds_both_narratives() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok("true".to_string()),
            Ok(sql_block(BIOTECH_SQL)),
            Ok("Biotech activity is spread across three cantons.".to_string()),
            Ok("Three biotech companies were founded after 2020.".to_string()),
        ]));
        let store = Arc::new(seeded_store().await);
        let pipeline = pipeline(llm.clone(), store);

        let outcome = pipeline
            .analyze_and_explain(SAMPLE_QUESTIONS[0], AttemptBudget::default(), 60)
            .await
            .unwrap();

        assert_eq!(
            outcome.explanation.as_deref(),
            Some("Biotech activity is spread across three cantons.")
        );
        assert_eq!(
            outcome.specific_answer.as_deref(),
            Some("Three biotech companies were founded after 2020.")
        );
        let calls = llm.calls();
        assert!(calls[2].system.contains("Write no more than 60 words"));
        assert!(calls[3].user.starts_with("Original user question:"));
    }

    #[tokio::test]
    async fn test_explanation_failure_keeps_answer() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok("true".to_string()),
            Ok(sql_block(BIOTECH_SQL)),
            Err(AppError::LLMError("upstream 503".to_string())),
            Ok("Three companies.".to_string()),
        ]));
        let store = Arc::new(seeded_store().await);
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = AnalysisPipeline::with_observer(
            llm,
            store,
            Arc::new(PipelineConfig::default()),
            observer.clone(),
        );

        let outcome = pipeline
            .analyze_and_explain(SAMPLE_QUESTIONS[0], AttemptBudget::default(), 100)
            .await
            .unwrap();

        assert_eq!(
            outcome.explanation.as_deref(),
            Some("Could not generate explanation: upstream 503")
        );
        assert_eq!(outcome.specific_answer.as_deref(), Some("Three companies."));
        assert_eq!(outcome.result.len(), 3);

        let narrative: Vec<(NarrativePart, bool)> = observer
            .events()
            .into_iter()
            .filter_map(|e| match e {
                AnalysisEvent::NarrativeFinished { part, ok, .. } => Some((part, ok)),
                _ => None,
            })
            .collect();
        assert_eq!(
            narrative,
            vec![(NarrativePart::Explanation, false), (NarrativePart::Answer, true)]
        );
    }

    #[tokio::test]
    async fn test_empty_result_uses_placeholders_without_model_calls() {
        let sql = sql_block("SELECT c.title FROM companies c WHERE c.year > 2030;");
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok("true".to_string()),
            Ok(sql.clone()),
            Ok(sql),
        ]));
        let store = Arc::new(seeded_store().await);
        let pipeline = pipeline(llm.clone(), store);

        let outcome = pipeline
            .analyze_and_explain("future founders", AttemptBudget::new(2).unwrap(), 100)
            .await
            .unwrap();

        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.explanation.as_deref(), Some(NO_DATA_EXPLANATION));
        assert_eq!(outcome.specific_answer.as_deref(), Some(NO_DATA_ANSWER));
        assert_eq!(llm.call_count(), 3);
    }

    #[tokio::test]
    async fn test_handle_rejects_invalid_request_before_any_call() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        let pipeline = pipeline(llm.clone(), Arc::new(ScriptedStore::new(vec![])));

        let mut request = AnalysisRequest::new("Top cantons?");
        request.max_retries = Some(11);
        let err = pipeline.handle(request).await.unwrap_err();

        assert_eq!(err.kind(), "validation_error");
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_applies_configured_defaults() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok("true".to_string()),
            Ok("no statement".to_string()),
            Ok("still none".to_string()),
        ]));
        let pipeline = pipeline(llm.clone(), Arc::new(ScriptedStore::new(vec![])))
            .with_defaults(AttemptBudget::new(2).unwrap(), 50);

        let err = pipeline.handle(AnalysisRequest::new("Top cantons?")).await.unwrap_err();
        assert!(matches!(err, AppError::RetriesExhausted { attempts: 2, .. }));
        assert_eq!(llm.call_count(), 3);
    }

    /// Answers by prompt type so concurrent requests need no shared script.
    struct PromptRoutedClient;

    #[async_trait]
    impl LLMClient for PromptRoutedClient {
        async fn generate(&self, _config: &LLMConfig, system: &str, user: &str) -> Result<String> {
            if system.contains("context validator") {
                return Ok(if user.contains("weather") { "false" } else { "true" }.to_string());
            }
            if user.starts_with("Question:") {
                return Ok(sql_block("SELECT c.title, c.canton FROM companies c WHERE c.industry = 'biotech';"));
            }
            Ok("Narrative.".to_string())
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_are_independent() {
        let store = Arc::new(seeded_store().await);
        let pipeline = Arc::new(AnalysisPipeline::new(
            Arc::new(PromptRoutedClient),
            store,
            Arc::new(PipelineConfig::default()),
        ));

        let mut handles = Vec::new();
        for i in 0..8 {
            let pipeline = pipeline.clone();
            let question = if i % 4 == 0 {
                "What is the weather in Bern?".to_string()
            } else {
                SAMPLE_QUESTIONS[i % SAMPLE_QUESTIONS.len()].to_string()
            };
            handles.push(tokio::spawn(async move {
                pipeline
                    .analyze_and_explain(&question, AttemptBudget::default(), 100)
                    .await
            }));
        }

        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(outcome) => {
                    assert_eq!(outcome.result.len(), 3);
                    assert_eq!(outcome.explanation.as_deref(), Some("Narrative."));
                }
                Err(e) => {
                    assert_eq!(e.kind(), "context_rejected");
                    rejected += 1;
                }
            }
        }
        assert_eq!(rejected, 2);
    }

    #[tokio::test]
    async fn test_scripted_store_result_is_redacted() {
        let llm = Arc::new(ScriptedLlmClient::new(vec![
            Ok("true".to_string()),
            Ok(sql_block("SELECT d.id, d.amount FROM deals d WHERE d.amount IS NOT NULL;")),
        ]));
        let store = Arc::new(ScriptedStore::new(vec![Ok(vec![row(json!({"id": 1, "amount": 250000}))])]));
        let pipeline = pipeline(llm, store);

        let outcome = pipeline.analyze("largest deal").await.unwrap();
        assert_eq!(outcome.result, vec![row(json!({"amount": 250000}))]);
    }
}

//! Runs the gate once, then generate → extract → execute cycles until a
//! cycle returns rows or the attempt budget is spent.

use crate::application::use_cases::analysis_events::{AnalysisEvent, AnalysisObserver, RequestContext};
use crate::application::use_cases::context_gate::{ContextGate, GateVerdict};
use crate::application::use_cases::field_redactor::FieldRedactor;
use crate::application::use_cases::query_executor::QueryExecutor;
use crate::application::use_cases::statement_extractor::{try_extract, ExtractionFailure};
use crate::application::use_cases::statement_generator::StatementGenerator;
use crate::domain::analysis::{AnalysisOutcome, AttemptBudget, CandidateStatement, ExtractionRule, ResultRow};
use crate::domain::error::{AppError, Result};
use crate::domain::pipeline_config::{PipelineConfig, RetryPolicy};
use crate::infrastructure::db::DataStore;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;
use std::time::Instant;

const OFF_TOPIC_MESSAGE: &str = "Query is not relevant to Swiss startup funding context. Please ask questions related to startup investments, funding rounds, or company analysis in Switzerland.";

/// Why one attempt produced no rows.
#[derive(Debug)]
struct AttemptFailure {
    error: AppError,
    rule: Option<ExtractionRule>,
    /// The candidate was refused as a non-SELECT, at extraction or execution.
    rejected: bool,
}

impl AttemptFailure {
    fn plain(error: AppError) -> Self {
        Self {
            error,
            rule: None,
            rejected: false,
        }
    }
}

impl From<ExtractionFailure> for AttemptFailure {
    fn from(failure: ExtractionFailure) -> Self {
        let rule = failure.rule();
        Self {
            rejected: rule.is_some(),
            rule,
            error: failure.into(),
        }
    }
}

pub struct RetryOrchestrator {
    gate: ContextGate,
    generator: StatementGenerator,
    executor: QueryExecutor,
    redactor: FieldRedactor,
    retry: RetryPolicy,
    observer: Arc<dyn AnalysisObserver>,
}

impl RetryOrchestrator {
    pub fn new(
        llm_client: Arc<dyn LLMClient + Send + Sync>,
        store: Arc<dyn DataStore + Send + Sync>,
        config: Arc<PipelineConfig>,
        observer: Arc<dyn AnalysisObserver>,
    ) -> Self {
        Self {
            gate: ContextGate::new(llm_client.clone(), config.models.sql.clone()),
            generator: StatementGenerator::new(llm_client, config.clone()),
            executor: QueryExecutor::new(store),
            redactor: FieldRedactor::new(config.restricted.clone()),
            retry: config.retry,
            observer,
        }
    }

    /// Ends with rows, with an empty outcome when every attempt came back
    /// empty, or with `RetriesExhausted` when the last failing attempt left
    /// an error behind. A question the gate does not accept ends before any
    /// attempt.
    pub async fn run(
        &self,
        question: &str,
        budget: AttemptBudget,
        context: &RequestContext,
    ) -> Result<AnalysisOutcome> {
        let started = Instant::now();
        let verdict = self.gate.classify(question).await;
        self.emit(
            context,
            AnalysisEvent::GateChecked {
                in_domain: verdict.is_in_domain(),
                latency_ms: elapsed_ms(started),
            },
        );
        match verdict {
            GateVerdict::InDomain => {}
            GateVerdict::OffTopic => {
                return Err(AppError::ContextRejected(OFF_TOPIC_MESSAGE.to_string()));
            }
            GateVerdict::Unavailable(reason) => {
                return Err(AppError::ContextRejected(format!(
                    "Context classification unavailable: {}",
                    reason
                )));
            }
        }

        let mut last_error: Option<AppError> = None;
        let mut attempts = 0;

        for attempt in 1..=budget.get() {
            attempts = attempt;
            let started = Instant::now();
            let result = self.attempt(question).await;
            let latency_ms = elapsed_ms(started);

            match result {
                Ok((statement, rows)) if !rows.is_empty() => {
                    let row_count = rows.len();
                    self.emit(
                        context,
                        AnalysisEvent::AttemptFinished {
                            attempt,
                            outcome: "rows".to_string(),
                            rule: Some(statement.rule()),
                            latency_ms,
                            rows: row_count,
                        },
                    );
                    self.emit(
                        context,
                        AnalysisEvent::Succeeded {
                            attempts: attempt,
                            rows: row_count,
                        },
                    );
                    return Ok(AnalysisOutcome::found(
                        &statement,
                        self.redactor.redact(rows),
                        attempt,
                    ));
                }
                Ok((statement, _)) => {
                    self.emit(
                        context,
                        AnalysisEvent::AttemptFinished {
                            attempt,
                            outcome: "empty".to_string(),
                            rule: Some(statement.rule()),
                            latency_ms,
                            rows: 0,
                        },
                    );
                }
                Err(failure) => {
                    self.emit(
                        context,
                        AnalysisEvent::AttemptFinished {
                            attempt,
                            outcome: failure.error.kind().to_string(),
                            rule: failure.rule,
                            latency_ms,
                            rows: 0,
                        },
                    );
                    let stop = ends_attempts(&failure, self.retry);
                    last_error = Some(failure.error);
                    if stop {
                        break;
                    }
                }
            }
        }

        self.emit(
            context,
            AnalysisEvent::Exhausted {
                attempts,
                last_error: last_error.as_ref().map(|e| e.to_string()),
            },
        );

        match last_error {
            Some(e) => Err(AppError::RetriesExhausted {
                attempts,
                last_error: e.to_string(),
            }),
            None => Ok(AnalysisOutcome::empty(attempts)),
        }
    }

    async fn attempt(
        &self,
        question: &str,
    ) -> std::result::Result<(CandidateStatement, Vec<ResultRow>), AttemptFailure> {
        let raw = self
            .generator
            .generate(question)
            .await
            .map_err(AttemptFailure::plain)?;
        let statement = try_extract(&raw)?;
        match self.executor.execute(statement.sql()).await {
            Ok(rows) => Ok((statement, rows)),
            Err(error) => Err(AttemptFailure {
                rejected: matches!(error, AppError::ExecutionRejected(_)),
                rule: Some(statement.rule()),
                error,
            }),
        }
    }

    fn emit(&self, context: &RequestContext, event: AnalysisEvent) {
        self.observer.on_event(context, &event);
    }
}

/// Whether a failed attempt stops the loop before the budget is spent.
fn ends_attempts(failure: &AttemptFailure, policy: RetryPolicy) -> bool {
    failure.rejected && !policy.retry_rejected
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

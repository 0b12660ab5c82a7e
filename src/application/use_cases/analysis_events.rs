//! Structured progress events emitted while a question moves through the
//! pipeline, and the observers that consume them.

use crate::domain::analysis::ExtractionRule;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};
use uuid::Uuid;

const FINGERPRINT_LEN: usize = 12;

/// Identifies one pipeline invocation in every event it emits. The question
/// itself is only carried as a fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub request_id: Uuid,
    pub fingerprint: String,
}

impl RequestContext {
    pub fn new(question: &str) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            fingerprint: fingerprint(question),
        }
    }
}

/// Short SHA-256 hex digest of the trimmed question.
pub fn fingerprint(question: &str) -> String {
    let digest = Sha256::digest(question.trim().as_bytes());
    let mut encoded = hex::encode(digest);
    encoded.truncate(FINGERPRINT_LEN);
    encoded
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativePart {
    Explanation,
    Answer,
}

impl NarrativePart {
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativePart::Explanation => "explanation",
            NarrativePart::Answer => "answer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalysisEvent {
    GateChecked {
        in_domain: bool,
        latency_ms: u64,
    },
    /// `outcome` is `rows`, `empty`, or the error kind of a failed attempt.
    /// `rule` is set whenever an extraction rule matched.
    AttemptFinished {
        attempt: u32,
        outcome: String,
        rule: Option<ExtractionRule>,
        latency_ms: u64,
        rows: usize,
    },
    Succeeded {
        attempts: u32,
        rows: usize,
    },
    Exhausted {
        attempts: u32,
        last_error: Option<String>,
    },
    NarrativeFinished {
        part: NarrativePart,
        ok: bool,
        latency_ms: u64,
    },
}

pub trait AnalysisObserver: Send + Sync {
    fn on_event(&self, context: &RequestContext, event: &AnalysisEvent);
}

/// Forwards pipeline events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AnalysisObserver for TracingObserver {
    fn on_event(&self, context: &RequestContext, event: &AnalysisEvent) {
        let request_id = context.request_id.to_string();
        let question = context.fingerprint.as_str();

        match event {
            AnalysisEvent::GateChecked {
                in_domain,
                latency_ms,
            } => {
                info!(%request_id, question, in_domain, latency_ms, "Context gate checked");
            }
            AnalysisEvent::AttemptFinished {
                attempt,
                outcome,
                rule,
                latency_ms,
                rows,
            } => {
                let rule = rule.map(|r| r.as_str()).unwrap_or("none");
                debug!(%request_id, question, attempt, outcome = outcome.as_str(), rule, latency_ms, rows, "Attempt finished");
            }
            AnalysisEvent::Succeeded { attempts, rows } => {
                info!(%request_id, question, attempts, rows, "Analysis succeeded");
            }
            AnalysisEvent::Exhausted {
                attempts,
                last_error: Some(error),
            } => {
                warn!(%request_id, question, attempts, error = error.as_str(), "Attempt budget exhausted");
            }
            AnalysisEvent::Exhausted {
                attempts,
                last_error: None,
            } => {
                info!(%request_id, question, attempts, "No results within attempt budget");
            }
            AnalysisEvent::NarrativeFinished {
                part,
                ok,
                latency_ms,
            } => {
                if *ok {
                    debug!(%request_id, question, part = part.as_str(), latency_ms, "Narrative generated");
                } else {
                    warn!(%request_id, question, part = part.as_str(), latency_ms, "Narrative fell back");
                }
            }
        }
    }
}

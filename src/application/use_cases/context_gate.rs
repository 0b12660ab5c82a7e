use crate::application::use_cases::analysis_prompts::{build_gate_system_prompt, build_gate_user_prompt};
use crate::domain::llm_config::LLMConfig;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_llm_response;
use std::sync::Arc;
use tracing::warn;

/// Result of classifying one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    InDomain,
    OffTopic,
    /// The classification call failed; treated as a rejection.
    Unavailable(String),
}

impl GateVerdict {
    pub fn is_in_domain(&self) -> bool {
        matches!(self, GateVerdict::InDomain)
    }
}

/// Decides whether a question belongs to the funding domain before any SQL
/// is generated. Fails closed.
pub struct ContextGate {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: LLMConfig,
}

impl ContextGate {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, config: LLMConfig) -> Self {
        Self { llm_client, config }
    }

    pub async fn classify(&self, question: &str) -> GateVerdict {
        let system_prompt = build_gate_system_prompt();
        let user_prompt = build_gate_user_prompt(question);

        match self
            .llm_client
            .generate(&self.config, &system_prompt, &user_prompt)
            .await
        {
            Ok(response) if is_affirmative(&response) => GateVerdict::InDomain,
            Ok(_) => GateVerdict::OffTopic,
            Err(e) => {
                warn!(error = %e, "Context classification failed, rejecting question");
                GateVerdict::Unavailable(e.detail())
            }
        }
    }
}

/// Any occurrence of "true" outside reasoning tags, in any case, counts as a yes.
fn is_affirmative(response: &str) -> bool {
    clean_llm_response(response).to_lowercase().contains("true")
}

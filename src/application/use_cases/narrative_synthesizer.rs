use crate::application::use_cases::analysis_prompts::{
    build_answer_system_prompt, build_answer_user_prompt, build_explain_system_prompt,
    build_explain_user_prompt,
};
use crate::domain::analysis::ResultRow;
use crate::domain::error::{AppError, Result};
use crate::domain::pipeline_config::PipelineConfig;
use crate::infrastructure::llm_clients::LLMClient;
use crate::infrastructure::response::clean_llm_response;
use std::sync::Arc;

/// Turns a result set into prose with the prose model profile. Output is
/// cleaned of reasoning tags but never truncated.
pub struct NarrativeSynthesizer {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: Arc<PipelineConfig>,
}

impl NarrativeSynthesizer {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, config: Arc<PipelineConfig>) -> Self {
        Self { llm_client, config }
    }

    pub async fn explain(&self, statement: &str, rows: &[ResultRow], max_words: u32) -> Result<String> {
        let system_prompt = build_explain_system_prompt(&self.config.schema_text, max_words);
        let user_prompt = build_explain_user_prompt(statement, rows);
        self.complete(&system_prompt, &user_prompt).await
    }

    pub async fn answer(&self, question: &str, rows: &[ResultRow]) -> Result<String> {
        let system_prompt = build_answer_system_prompt();
        let user_prompt = build_answer_user_prompt(question, rows);
        self.complete(&system_prompt, &user_prompt).await
    }

    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let response = self
            .llm_client
            .generate(&self.config.models.prose, system_prompt, user_prompt)
            .await
            .map_err(|e| AppError::SynthesisFailed(e.detail()))?;

        let cleaned = clean_llm_response(&response);
        if cleaned.is_empty() {
            return Err(AppError::SynthesisFailed(
                "Model returned an empty response".to_string(),
            ));
        }
        Ok(cleaned)
    }
}

pub fn explanation_fallback(error: &AppError) -> String {
    format!("Could not generate explanation: {}", error.detail())
}

pub fn answer_fallback(error: &AppError) -> String {
    format!("Could not generate specific answer: {}", error.detail())
}

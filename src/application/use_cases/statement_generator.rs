use crate::application::use_cases::analysis_prompts::{build_sql_system_prompt, build_sql_user_prompt};
use crate::domain::error::Result;
use crate::domain::pipeline_config::PipelineConfig;
use crate::infrastructure::llm_clients::LLMClient;
use std::sync::Arc;

/// Asks the model for a SQL statement answering the question. Returns the
/// raw response; isolating the statement is the extractor's job.
pub struct StatementGenerator {
    llm_client: Arc<dyn LLMClient + Send + Sync>,
    config: Arc<PipelineConfig>,
    system_prompt: String,
}

impl StatementGenerator {
    pub fn new(llm_client: Arc<dyn LLMClient + Send + Sync>, config: Arc<PipelineConfig>) -> Self {
        let system_prompt =
            build_sql_system_prompt(&config.schema, &config.schema_text, &config.restricted);
        Self {
            llm_client,
            config,
            system_prompt,
        }
    }

    pub async fn generate(&self, question: &str) -> Result<String> {
        self.llm_client
            .generate(
                &self.config.models.sql,
                &self.system_prompt,
                &build_sql_user_prompt(question),
            )
            .await
    }
}

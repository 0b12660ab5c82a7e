use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum LLMProvider {
    Local,
    #[serde(rename = "openai")]
    OpenAI,
    #[serde(rename = "openrouter")]
    OpenRouter,
    Google,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LLMConfig {
    pub provider: LLMProvider,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl LLMConfig {
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: LLMProvider::OpenAI,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key: None,
            max_tokens: Some(1024),
            temperature: Some(0.7),
        }
    }
}

/// Sampling profiles used by the pipeline. SQL generation and gating run
/// cold; narrative prose keeps the provider default.
#[derive(Debug, Clone)]
pub struct ModelProfiles {
    pub sql: LLMConfig,
    pub prose: LLMConfig,
}

impl ModelProfiles {
    pub fn from_base(base: LLMConfig, sql_temperature: f32, prose_temperature: f32) -> Self {
        Self {
            sql: base.clone().with_temperature(sql_temperature),
            prose: base.with_temperature(prose_temperature),
        }
    }
}

impl Default for ModelProfiles {
    fn default() -> Self {
        Self::from_base(LLMConfig::default(), 0.3, 0.7)
    }
}

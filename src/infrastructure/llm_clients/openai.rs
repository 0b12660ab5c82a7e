use super::{build_http_client, LLMClient};
use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Client for OpenAI-style `/chat/completions` endpoints (OpenAI,
/// OpenRouter, local servers such as LM Studio or vLLM).
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
}

impl OpenAICompatibleClient {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            client: build_http_client(request_timeout),
        }
    }

    fn endpoint(base_url: &str) -> String {
        if base_url.ends_with('/') {
            format!("{}chat/completions", base_url)
        } else {
            format!("{}/chat/completions", base_url)
        }
    }

    fn request_body(config: &LLMConfig, system: &str, user: &str) -> serde_json::Value {
        json!({
            "model": config.model,
            "messages": [
                {
                    "role": "system",
                    "content": system
                },
                {
                    "role": "user",
                    "content": user
                }
            ],
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
        })
    }

    fn message_content(json: &serde_json::Value) -> Result<String> {
        json["choices"][0]["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::LLMError("Invalid response format".to_string()))
    }
}

#[async_trait]
impl LLMClient for OpenAICompatibleClient {
    async fn generate(&self, config: &LLMConfig, system: &str, user: &str) -> Result<String> {
        let url = Self::endpoint(&config.base_url);
        let mut request = self.client.post(&url);

        match (&config.api_key, &config.provider) {
            (Some(api_key), _) => request = request.bearer_auth(api_key),
            (None, LLMProvider::Local) => {}
            (None, provider) => {
                return Err(AppError::LLMError(format!(
                    "Missing API key for {:?}",
                    provider
                )))
            }
        }

        let response = request
            .json(&Self::request_body(config, system, user))
            .send()
            .await
            .map_err(|e| AppError::LLMError(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::LLMError(format!(
                "API error ({}): {}",
                status, text
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AppError::LLMError(format!("Failed to parse JSON: {}", e)))?;

        Self::message_content(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_trailing_slash() {
        assert_eq!(
            OpenAICompatibleClient::endpoint("https://api.openai.com/v1"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            OpenAICompatibleClient::endpoint("http://localhost:1234/v1/"),
            "http://localhost:1234/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_carries_profile_temperature() {
        let config = LLMConfig::default().with_temperature(0.3);
        let body = OpenAICompatibleClient::request_body(&config, "sys", "usr");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "usr");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_message_content() {
        let json = serde_json::json!({
            "choices": [{ "message": { "role": "assistant", "content": "true" } }]
        });
        assert_eq!(OpenAICompatibleClient::message_content(&json).unwrap(), "true");

        let json = serde_json::json!({ "error": { "message": "rate limited" } });
        assert!(OpenAICompatibleClient::message_content(&json).is_err());
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_before_request() {
        let client = OpenAICompatibleClient::new(Duration::from_secs(1));
        let config = LLMConfig::default();
        let err = client.generate(&config, "sys", "usr").await.unwrap_err();
        assert_eq!(err, AppError::LLMError("Missing API key for OpenAI".to_string()));
    }
}

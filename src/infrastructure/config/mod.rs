//! Layered application configuration.
//!
//! Sources, lowest precedence first: built-in defaults, an optional TOML
//! file, then `FUNDSCOPE_`-prefixed environment variables where `__`
//! separates nesting levels (`FUNDSCOPE_LLM__MODEL=gpt-4o-mini`).

use crate::domain::error::{AppError, Result};
use crate::domain::llm_config::{LLMConfig, LLMProvider, ModelProfiles};
use crate::infrastructure::security::keyring::{KeyringManager, SecretRef};
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::warn;
use validator::{Validate, ValidationError};

pub const ENV_PREFIX: &str = "FUNDSCOPE_";
pub const DEFAULT_CONFIG_FILE: &str = "fundscope.toml";
const KEYRING_SERVICE: &str = "fundscope";

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LlmSettings {
    pub provider: LLMProvider,
    #[validate(url)]
    pub base_url: String,
    #[validate(length(min = 1))]
    pub model: String,
    pub api_key_ref: Option<String>,
    pub max_tokens: Option<u32>,
    #[validate(range(min = 0.0, max = 2.0))]
    pub sql_temperature: f32,
    #[validate(range(min = 0.0, max = 2.0))]
    pub prose_temperature: f32,
    #[validate(range(min = 1, max = 600))]
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        let base = LLMConfig::default();
        Self {
            provider: base.provider,
            base_url: base.base_url,
            model: base.model,
            api_key_ref: Some("env:OPENAI_API_KEY".to_string()),
            max_tokens: base.max_tokens,
            sql_temperature: 0.3,
            prose_temperature: 0.7,
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_database_target"))]
pub struct DatabaseSettings {
    pub backend: DatabaseBackend,
    /// Full connection URL. For SQLite this is the only target setting.
    pub url: Option<String>,
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub database: Option<String>,
    pub password_ref: Option<String>,
    pub ssl_mode: String,
    #[validate(range(min = 1, max = 100))]
    pub max_connections: u32,
    #[validate(range(min = 1))]
    pub connect_timeout_secs: u64,
    #[validate(range(min = 1))]
    pub query_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Postgres,
            url: None,
            host: None,
            port: 17233,
            username: None,
            database: None,
            password_ref: Some("env:DB_PASSWORD".to_string()),
            ssl_mode: "require".to_string(),
            max_connections: 5,
            connect_timeout_secs: 10,
            query_timeout_secs: 30,
            idle_timeout_secs: 300,
        }
    }
}

impl DatabaseSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

fn validate_database_target(settings: &DatabaseSettings) -> std::result::Result<(), ValidationError> {
    let has_url = settings.url.as_deref().map_or(false, |u| !u.trim().is_empty());
    let has_host = settings.host.as_deref().map_or(false, |h| !h.trim().is_empty());
    match settings.backend {
        DatabaseBackend::Sqlite if !has_url => Err(ValidationError::new("sqlite_requires_url")),
        DatabaseBackend::Postgres if !has_url && !has_host => {
            Err(ValidationError::new("postgres_requires_url_or_host"))
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineSettings {
    #[validate(range(min = 1, max = 10))]
    pub default_budget: u32,
    #[validate(range(min = 10, max = 1000))]
    pub default_max_words: u32,
    /// Whether a non-SELECT candidate consumes another attempt.
    pub retry_rejected: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            default_budget: 3,
            default_max_words: 100,
            retry_rejected: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[validate(nested)]
    pub llm: LlmSettings,
    #[validate(nested)]
    pub database: DatabaseSettings,
    #[validate(nested)]
    pub pipeline: PipelineSettings,
}

impl AppConfig {
    pub fn figment(path: impl AsRef<Path>) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Loads and validates the configuration. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config: AppConfig = Self::figment(path)
            .extract()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        config
            .validate()
            .map_err(|e| AppError::ConfigError(e.to_string()))?;
        Ok(config)
    }

    pub fn load() -> Result<Self> {
        let path = std::env::var("FUNDSCOPE_CONFIG_FILE")
            .unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        Self::load_from(path)
    }

    /// Resolves the API key and builds the two sampling profiles.
    pub fn model_profiles(&self, keyring: &KeyringManager) -> Result<ModelProfiles> {
        let llm = &self.llm;
        let api_key = match llm.api_key_ref.as_deref() {
            Some(reference) => match SecretRef::parse(reference).resolve(keyring) {
                Ok(key) => Some(key),
                Err(e) if llm.provider == LLMProvider::Local => {
                    warn!(error = %e, "No API key resolved for local model server");
                    None
                }
                Err(e) => return Err(e),
            },
            None => None,
        };

        let base = LLMConfig {
            provider: llm.provider.clone(),
            base_url: llm.base_url.clone(),
            model: llm.model.clone(),
            api_key,
            max_tokens: llm.max_tokens,
            temperature: None,
        };
        Ok(ModelProfiles::from_base(
            base,
            llm.sql_temperature,
            llm.prose_temperature,
        ))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.request_timeout_secs)
    }

    pub fn keyring() -> KeyringManager {
        KeyringManager::new(KEYRING_SERVICE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_defaults_need_a_database_target() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("postgres_requires_url_or_host"));
    }

    #[test]
    fn test_file_and_env_layers() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "fundscope.toml",
                r#"
                [database]
                backend = "sqlite"
                url = "sqlite://funding.db"

                [pipeline]
                default_budget = 5
                "#,
            )?;
            jail.set_env("FUNDSCOPE_LLM__MODEL", "gpt-4o-mini");
            jail.set_env("FUNDSCOPE_PIPELINE__RETRY_REJECTED", "false");

            let config = AppConfig::load_from("fundscope.toml").unwrap();
            assert_eq!(config.database.backend, DatabaseBackend::Sqlite);
            assert_eq!(config.pipeline.default_budget, 5);
            assert!(!config.pipeline.retry_rejected);
            assert_eq!(config.llm.model, "gpt-4o-mini");
            assert_eq!(config.llm.provider, LLMProvider::OpenAI);
            Ok(())
        });
    }

    #[test]
    fn test_invalid_budget_is_config_error() {
        Jail::expect_with(|jail| {
            jail.set_env("FUNDSCOPE_DATABASE__HOST", "db.internal");
            jail.set_env("FUNDSCOPE_PIPELINE__DEFAULT_BUDGET", "0");

            let err = AppConfig::load_from("missing.toml").unwrap_err();
            assert_eq!(err.kind(), "config_error");
            Ok(())
        });
    }

    #[test]
    fn test_model_profiles_split_temperatures() {
        let mut config = AppConfig::default();
        config.llm.api_key_ref = Some("plain:sk-test".to_string());

        let profiles = config.model_profiles(&AppConfig::keyring()).unwrap();
        assert_eq!(profiles.sql.temperature, Some(0.3));
        assert_eq!(profiles.prose.temperature, Some(0.7));
        assert_eq!(profiles.sql.api_key.as_deref(), Some("sk-test"));
    }

    #[test]
    fn test_local_provider_tolerates_missing_key() {
        let mut config = AppConfig::default();
        config.llm.provider = LLMProvider::Local;
        config.llm.api_key_ref = Some("env:FUNDSCOPE_TEST_UNSET_KEY".to_string());

        let profiles = config.model_profiles(&AppConfig::keyring()).unwrap();
        assert!(profiles.sql.api_key.is_none());
    }
}

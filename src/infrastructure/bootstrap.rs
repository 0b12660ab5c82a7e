//! Wires configuration into a ready pipeline.

use std::sync::Arc;

use tracing::{error, info};
use url::Url;

use crate::application::AnalysisPipeline;
use crate::domain::analysis::AttemptBudget;
use crate::domain::error::Result;
use crate::domain::pipeline_config::{PipelineConfig, RetryPolicy};
use crate::domain::schema::SchemaDescriptor;
use crate::infrastructure::config::{AppConfig, DatabaseBackend, DatabaseSettings};
use crate::infrastructure::db::postgres::PgDataStore;
use crate::infrastructure::db::sqlite::SqliteDataStore;
use crate::infrastructure::db::DataStore;
use crate::infrastructure::llm_clients::{LLMClient, RouterClient};
use crate::infrastructure::security::keyring::{KeyringManager, SecretRef};

pub async fn build_pipeline(config: &AppConfig) -> Result<AnalysisPipeline> {
    let keyring = AppConfig::keyring();

    let models = config.model_profiles(&keyring)?;
    let retry = RetryPolicy {
        retry_rejected: config.pipeline.retry_rejected,
    };
    let pipeline_config = Arc::new(PipelineConfig::new(
        SchemaDescriptor::funding_dataset(),
        models,
        retry,
    ));

    let llm_client: Arc<dyn LLMClient + Send + Sync> =
        Arc::new(RouterClient::new(config.request_timeout()));

    let store = connect_store(&config.database, &keyring).await.map_err(|err| {
        error!(
            error = %err,
            target = %describe_target(&config.database),
            "Failed to open data store"
        );
        err
    })?;

    info!(
        provider = ?config.llm.provider,
        model = %config.llm.model,
        target = %describe_target(&config.database),
        "Analysis pipeline ready"
    );

    Ok(
        AnalysisPipeline::new(llm_client, store, pipeline_config).with_defaults(
            AttemptBudget::new(config.pipeline.default_budget)?,
            config.pipeline.default_max_words,
        ),
    )
}

async fn connect_store(
    settings: &DatabaseSettings,
    keyring: &KeyringManager,
) -> Result<Arc<dyn DataStore + Send + Sync>> {
    match settings.backend {
        DatabaseBackend::Postgres => {
            let password = match settings.password_ref.as_deref() {
                Some(reference) => Some(SecretRef::parse(reference).resolve(keyring)?),
                None => None,
            };
            let store = PgDataStore::connect(settings, password.as_deref()).await?;
            Ok(Arc::new(store))
        }
        DatabaseBackend::Sqlite => {
            let url = settings.url.as_deref().unwrap_or_default();
            let store = SqliteDataStore::connect(
                url,
                settings.max_connections,
                settings.query_timeout(),
            )
            .await?;
            Ok(Arc::new(store))
        }
    }
}

/// Printable store location with credentials removed.
fn describe_target(settings: &DatabaseSettings) -> String {
    if let Some(raw) = settings.url.as_deref() {
        return match Url::parse(raw) {
            Ok(mut url) => {
                let _ = url.set_password(None);
                let _ = url.set_username("");
                url.to_string()
            }
            Err(_) => "<unparseable url>".to_string(),
        };
    }
    format!(
        "{}:{}/{}",
        settings.host.as_deref().unwrap_or("localhost"),
        settings.port,
        settings.database.as_deref().unwrap_or("")
    )
}

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::domain::analysis::{AnalysisRequest, SAMPLE_QUESTIONS};
use crate::domain::error::{AppError, Result};
use crate::infrastructure::bootstrap::build_pipeline;
use crate::infrastructure::config::AppConfig;

const DEFAULT_LOG_FILTER: &str = "fundscope=info";

/// Answers the question given on the command line and prints the outcome as
/// JSON. Returns the process exit code.
pub async fn run() -> i32 {
    let _ = dotenvy::dotenv();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match answer(std::env::args().skip(1).collect()).await {
        Ok(()) => 0,
        Err(err) => {
            error!(kind = err.kind(), error = %err, "Analysis failed");
            eprintln!("{}", err);
            1
        }
    }
}

async fn answer(args: Vec<String>) -> Result<()> {
    let question = args.join(" ");
    if question.trim().is_empty() {
        eprintln!("Usage: fundscope <question>\n\nExample questions:");
        for sample in SAMPLE_QUESTIONS {
            eprintln!("  - {}", sample);
        }
        return Err(AppError::ValidationError("No question given".to_string()));
    }

    let config = AppConfig::load()?;
    let pipeline = build_pipeline(&config).await?;

    let outcome = pipeline.handle(AnalysisRequest::new(question)).await?;
    info!(
        attempts = outcome.attempts,
        rows = outcome.result.len(),
        "Analysis complete"
    );

    let rendered = serde_json::to_string_pretty(&outcome)
        .map_err(|e| AppError::Internal(format!("Failed to render outcome: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum AppError {
    Internal(String),
    ValidationError(String),
    ConfigError(String),
    LLMError(String),
    SecurityError(String),
    DatabaseError(String),
    IoError(String),

    /// Question is outside the funding domain. Terminal, never retried.
    ContextRejected(String),
    /// Model output contained no recognizable statement.
    ExtractionFailed(String),
    /// Candidate statement is not a read-only SELECT.
    ExecutionRejected(String),
    /// Store-level failure while running a statement.
    ExecutionError(String),
    /// Attempt budget consumed with a trailing error.
    RetriesExhausted { attempts: u32, last_error: String },
    /// Narrative or answer generation failed. Recovered with fallback text.
    SynthesisFailed(String),
}

impl AppError {
    /// Stable tag used in structured events and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Internal(_) => "internal",
            AppError::ValidationError(_) => "validation_error",
            AppError::ConfigError(_) => "config_error",
            AppError::LLMError(_) => "llm_error",
            AppError::SecurityError(_) => "security_error",
            AppError::DatabaseError(_) => "database_error",
            AppError::IoError(_) => "io_error",
            AppError::ContextRejected(_) => "context_rejected",
            AppError::ExtractionFailed(_) => "extraction_failed",
            AppError::ExecutionRejected(_) => "execution_rejected",
            AppError::ExecutionError(_) => "execution_error",
            AppError::RetriesExhausted { .. } => "retries_exhausted",
            AppError::SynthesisFailed(_) => "synthesis_failed",
        }
    }

    /// The message without the category prefix, used when an error is
    /// embedded into another error or a fallback text.
    pub fn detail(&self) -> String {
        match self {
            AppError::Internal(msg)
            | AppError::ValidationError(msg)
            | AppError::ConfigError(msg)
            | AppError::LLMError(msg)
            | AppError::SecurityError(msg)
            | AppError::DatabaseError(msg)
            | AppError::IoError(msg)
            | AppError::ContextRejected(msg)
            | AppError::ExtractionFailed(msg)
            | AppError::ExecutionRejected(msg)
            | AppError::ExecutionError(msg)
            | AppError::SynthesisFailed(msg) => msg.clone(),
            AppError::RetriesExhausted {
                attempts,
                last_error,
            } => format!("failed after {} attempts: {}", attempts, last_error),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Config error: {}", msg),
            AppError::LLMError(msg) => write!(f, "LLM error: {}", msg),
            AppError::SecurityError(msg) => write!(f, "Security error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
            AppError::ContextRejected(msg) => write!(f, "Context rejected: {}", msg),
            AppError::ExtractionFailed(msg) => write!(f, "Extraction failed: {}", msg),
            AppError::ExecutionRejected(msg) => write!(f, "Execution rejected: {}", msg),
            AppError::ExecutionError(msg) => write!(f, "Execution error: {}", msg),
            AppError::RetriesExhausted {
                attempts,
                last_error,
            } => write!(f, "Failed after {} attempts: {}", attempts, last_error),
            AppError::SynthesisFailed(msg) => write!(f, "Synthesis failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

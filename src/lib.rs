pub mod app;
pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{AnalysisEvent, AnalysisObserver, AnalysisPipeline, RequestContext, TracingObserver};
pub use domain::analysis::{AnalysisOutcome, AnalysisRequest, AttemptBudget, SAMPLE_QUESTIONS};
pub use domain::error::{AppError, Result};
pub use infrastructure::bootstrap::build_pipeline;
pub use infrastructure::config::AppConfig;

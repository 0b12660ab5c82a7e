pub mod use_cases;

pub use use_cases::analysis_events::{AnalysisEvent, AnalysisObserver, RequestContext, TracingObserver};
pub use use_cases::analysis_pipeline::AnalysisPipeline;

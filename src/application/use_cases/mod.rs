pub mod analysis_events;
pub mod analysis_pipeline;
pub mod analysis_prompts;
pub mod context_gate;
pub mod field_redactor;
pub mod narrative_synthesizer;
pub mod query_executor;
pub mod retry_orchestrator;
pub mod statement_extractor;
pub mod statement_generator;

#[cfg(test)]
pub(crate) mod test_support;

pub mod analysis;
pub mod error;
pub mod llm_config;
pub mod pipeline_config;
pub mod schema;

// Resume analysis: prompt assembly, LLM orchestration, schema validation, reporting.
// All model calls go through llm_client.

pub mod analyzer;
pub mod handlers;
pub mod models;
pub mod prompts;
pub mod report;

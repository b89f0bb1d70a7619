// Public API - what other modules can use
pub use handlers::{get_analysis, get_analysis_by_replay, list_user_analyses, process_replay};
pub use pipeline::AnalysisPipeline;

// Internal modules
mod handlers;
pub mod models;
mod pipeline;
pub mod repository;
pub mod scoring;
pub mod types;

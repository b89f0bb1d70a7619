// Public API - what other modules can use
pub use aggregator::RankingAggregator;
pub use handlers::{get_user_ranking, global_ranking, refresh_user_ranking, regional_ranking};
pub use service::RankingService;

// Internal modules
pub mod aggregator;
mod handlers;
pub mod models;
pub mod repository;
mod service;
pub mod types;

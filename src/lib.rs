// Library crate for the ward score service
// This file exposes the public API for the binary and integration tests

pub mod analysis;
pub mod cache;
pub mod config;
pub mod rank;
pub mod ranking;
pub mod replay;
pub mod shared;
pub mod user;

use axum::{
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

// Re-export commonly used types for easier access in tests
pub use analysis::{models::AnalysisModel, repository::AnalysisRepository, AnalysisPipeline};
pub use cache::{CacheStore, InMemoryCacheStore};
pub use config::Config;
pub use rank::{letter_rank, tier_division, Division, LetterRank, Tier};
pub use ranking::{models::RankingModel, repository::RankingRepository, RankingAggregator};
pub use replay::{models::ReplayModel, models::ReplayStatus, repository::ReplayRepository};
pub use shared::{AppError, AppState};
pub use user::{models::UserModel, repository::UserRepository, CachedUserRepository};

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "wardscore" }))
}

/// Builds every route of the HTTP API over the given state
pub fn router(state: AppState) -> Router {
    let users = Router::new()
        .route("/", post(user::create_user).get(user::list_users))
        .route(
            "/:id",
            get(user::get_user)
                .put(user::update_user)
                .delete(user::delete_user),
        )
        .route("/:id/replays", get(user::get_user_with_replays))
        .route("/riot/:riot_id", get(user::get_user_by_riot_id));

    let replays = Router::new()
        .route("/", post(replay::upload_replay).get(replay::list_replays))
        .route("/pending", get(replay::list_pending_replays))
        .route(
            "/:id",
            get(replay::get_replay)
                .put(replay::update_replay)
                .delete(replay::delete_replay),
        );

    let analyses = Router::new()
        .route("/process/:replay_id", post(analysis::process_replay))
        .route("/replay/:replay_id", get(analysis::get_analysis_by_replay))
        .route("/user/:user_id", get(analysis::list_user_analyses))
        .route("/:id", get(analysis::get_analysis));

    let rankings = Router::new()
        .route("/refresh/:user_id", post(ranking::refresh_user_ranking))
        .route("/user/:user_id", get(ranking::get_user_ranking))
        .route("/global", get(ranking::global_ranking))
        .route("/region/:region", get(ranking::regional_ranking));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/users", users)
        .nest("/api/v1/replays", replays)
        .nest("/api/v1/analysis", analyses)
        .nest("/api/v1/ranking", rankings)
        .with_state(state)
}

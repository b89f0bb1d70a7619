use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    aggregator::RankingAggregator,
    models::RankingModel,
    service::RankingService,
    types::{LeaderboardQuery, SeasonQuery},
};
use crate::shared::{AppError, AppState};

fn ranking_service(state: &AppState) -> RankingService {
    RankingService::new(
        Arc::clone(&state.ranking_repository),
        Arc::clone(&state.analysis_repository),
        Arc::clone(&state.user_repository),
        RankingAggregator::new(state.config.default_season.clone()),
    )
}

/// POST /api/v1/ranking/refresh/:user_id?season=
#[instrument(name = "refresh_user_ranking", skip(state))]
pub async fn refresh_user_ranking(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<RankingModel>, AppError> {
    let ranking = ranking_service(&state)
        .refresh_user_ranking(user_id, query.season)
        .await?;
    info!(user_id, ranking_id = ranking.id, "Ranking refreshed via API");
    Ok(Json(ranking))
}

/// GET /api/v1/ranking/user/:user_id?season=
#[instrument(name = "get_user_ranking", skip(state))]
pub async fn get_user_ranking(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(query): Query<SeasonQuery>,
) -> Result<Json<RankingModel>, AppError> {
    Ok(Json(
        ranking_service(&state)
            .get_user_ranking(user_id, query.season)
            .await?,
    ))
}

/// GET /api/v1/ranking/global?season=&limit=
#[instrument(name = "global_ranking", skip(state))]
pub async fn global_ranking(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<RankingModel>>, AppError> {
    let limit = query.limit();
    Ok(Json(
        ranking_service(&state)
            .leaderboard(None, query.season, limit)
            .await?,
    ))
}

/// GET /api/v1/ranking/region/:region?season=&limit=
#[instrument(name = "regional_ranking", skip(state))]
pub async fn regional_ranking(
    State(state): State<AppState>,
    Path(region): Path<String>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<RankingModel>>, AppError> {
    let limit = query.limit();
    Ok(Json(
        ranking_service(&state)
            .leaderboard(Some(region.to_uppercase()), query.season, limit)
            .await?,
    ))
}

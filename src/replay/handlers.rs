use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::ReplayModel,
    service::ReplayService,
    types::{ListReplaysQuery, ReplayDetail, UpdateReplayRequest, UploadReplayRequest},
};
use crate::shared::{AppError, AppState, Paginated};

pub const USER_ID_HEADER: &str = "x-user-id";

fn replay_service(state: &AppState) -> ReplayService {
    ReplayService::new(
        Arc::clone(&state.replay_repository),
        Arc::clone(&state.user_repository),
        Arc::clone(&state.analysis_repository),
    )
}

/// Reads the uploading user's id from the `X-User-ID` header
fn user_id_from_headers(headers: &HeaderMap) -> Result<i64, AppError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::Validation("X-User-ID header is required".to_string()))?;

    raw.to_str()
        .ok()
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| AppError::Validation("X-User-ID header must be a numeric id".to_string()))
}

/// POST /api/v1/replays
#[instrument(name = "upload_replay", skip(state, headers, request))]
pub async fn upload_replay(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UploadReplayRequest>,
) -> Result<(StatusCode, Json<ReplayModel>), AppError> {
    let user_id = user_id_from_headers(&headers)?;
    let replay = replay_service(&state)
        .upload_replay(user_id, request)
        .await?;

    info!(replay_id = replay.id, user_id, "Replay registered via API");
    Ok((StatusCode::CREATED, Json(replay)))
}

/// GET /api/v1/replays?user_id=&page=&limit=
#[instrument(name = "list_replays", skip(state))]
pub async fn list_replays(
    State(state): State<AppState>,
    Query(query): Query<ListReplaysQuery>,
) -> Result<Json<Paginated<ReplayModel>>, AppError> {
    let page = replay_service(&state)
        .list_user_replays(query.user_id, query.page_request())
        .await?;
    Ok(Json(page))
}

/// GET /api/v1/replays/pending
#[instrument(name = "list_pending_replays", skip(state))]
pub async fn list_pending_replays(
    State(state): State<AppState>,
) -> Result<Json<Vec<ReplayModel>>, AppError> {
    Ok(Json(replay_service(&state).list_pending_replays().await?))
}

/// GET /api/v1/replays/:id
#[instrument(name = "get_replay", skip(state))]
pub async fn get_replay(
    State(state): State<AppState>,
    Path(replay_id): Path<i64>,
) -> Result<Json<ReplayDetail>, AppError> {
    Ok(Json(replay_service(&state).get_replay_detail(replay_id).await?))
}

/// PUT /api/v1/replays/:id
#[instrument(name = "update_replay", skip(state, request))]
pub async fn update_replay(
    State(state): State<AppState>,
    Path(replay_id): Path<i64>,
    Json(request): Json<UpdateReplayRequest>,
) -> Result<Json<ReplayModel>, AppError> {
    Ok(Json(
        replay_service(&state)
            .update_replay(replay_id, request)
            .await?,
    ))
}

/// DELETE /api/v1/replays/:id
#[instrument(name = "delete_replay", skip(state))]
pub async fn delete_replay(
    State(state): State<AppState>,
    Path(replay_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    replay_service(&state).delete_replay(replay_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{
    models::UserModel,
    service::UserService,
    types::{CreateUserRequest, UpdateUserRequest, UserWithReplays},
};
use crate::shared::{AppError, AppState, PageRequest, Paginated};

fn user_service(state: &AppState) -> UserService {
    UserService::new(
        Arc::clone(&state.user_repository),
        Arc::clone(&state.replay_repository),
        state.config.default_region.clone(),
    )
}

/// POST /api/v1/users
#[instrument(name = "create_user", skip(state, request))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserModel>), AppError> {
    let user = user_service(&state).create_user(request).await?;
    info!(user_id = user.id, "User registered via API");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/v1/users?page=&limit=
#[instrument(name = "list_users", skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Paginated<UserModel>>, AppError> {
    Ok(Json(user_service(&state).list_users(page).await?))
}

/// GET /api/v1/users/:id
#[instrument(name = "get_user", skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserModel>, AppError> {
    Ok(Json(user_service(&state).get_user(user_id).await?))
}

/// GET /api/v1/users/riot/:riot_id (`#` sent as `%23`)
#[instrument(name = "get_user_by_riot_id", skip(state))]
pub async fn get_user_by_riot_id(
    State(state): State<AppState>,
    Path(riot_id): Path<String>,
) -> Result<Json<UserModel>, AppError> {
    Ok(Json(user_service(&state).get_user_by_riot_id(&riot_id).await?))
}

/// GET /api/v1/users/:id/replays
#[instrument(name = "get_user_with_replays", skip(state))]
pub async fn get_user_with_replays(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<UserWithReplays>, AppError> {
    Ok(Json(user_service(&state).get_user_with_replays(user_id).await?))
}

/// PUT /api/v1/users/:id
#[instrument(name = "update_user", skip(state, request))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserModel>, AppError> {
    Ok(Json(user_service(&state).update_user(user_id, request).await?))
}

/// DELETE /api/v1/users/:id
#[instrument(name = "delete_user", skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    user_service(&state).delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::{models::AnalysisModel, pipeline::AnalysisPipeline, types::AnalysisDetail};
use crate::shared::{AppError, AppState, PageRequest, Paginated};

fn analysis_pipeline(state: &AppState) -> AnalysisPipeline {
    AnalysisPipeline::new(
        Arc::clone(&state.replay_repository),
        Arc::clone(&state.analysis_repository),
        Arc::clone(&state.scorer),
    )
}

/// POST /api/v1/analysis/process/:replay_id
#[instrument(name = "process_replay", skip(state))]
pub async fn process_replay(
    State(state): State<AppState>,
    Path(replay_id): Path<i64>,
) -> Result<(StatusCode, Json<AnalysisModel>), AppError> {
    let analysis = analysis_pipeline(&state).process_replay(replay_id).await?;
    info!(replay_id, analysis_id = analysis.id, "Replay processed via API");
    Ok((StatusCode::CREATED, Json(analysis)))
}

/// GET /api/v1/analysis/:id
#[instrument(name = "get_analysis", skip(state))]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<i64>,
) -> Result<Json<AnalysisDetail>, AppError> {
    Ok(Json(
        analysis_pipeline(&state)
            .get_analysis_detail(analysis_id)
            .await?,
    ))
}

/// GET /api/v1/analysis/replay/:replay_id
#[instrument(name = "get_analysis_by_replay", skip(state))]
pub async fn get_analysis_by_replay(
    State(state): State<AppState>,
    Path(replay_id): Path<i64>,
) -> Result<Json<AnalysisModel>, AppError> {
    Ok(Json(
        analysis_pipeline(&state)
            .get_analysis_by_replay(replay_id)
            .await?,
    ))
}

/// GET /api/v1/analysis/user/:user_id?page=&limit=
#[instrument(name = "list_user_analyses", skip(state))]
pub async fn list_user_analyses(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Paginated<AnalysisModel>>, AppError> {
    Ok(Json(
        analysis_pipeline(&state)
            .list_user_analyses(user_id, page)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::scoring::{ReplayScore, StaticReplayScorer};
    use crate::replay::models::NewReplay;
    use crate::replay::repository::{InMemoryReplayRepository, ReplayRepository};
    use crate::shared::test_utils::AppStateBuilder;
    use axum::{
        body::Body,
        http::Request,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt; // for `oneshot`

    async fn app() -> Router {
        let replays = Arc::new(InMemoryReplayRepository::new());
        replays
            .create_replay(&NewReplay {
                user_id: 1,
                file_name: "a.rofl".to_string(),
                original_name: "a.rofl".to_string(),
                file_path: "/replays/a.rofl".to_string(),
                file_size: 10,
                match_id: "BR1_9".to_string(),
                game_mode: None,
                game_version: None,
                duration: 1500,
                champion: None,
                role: None,
                queue: None,
            })
            .await
            .unwrap();

        let scorer = StaticReplayScorer::new(ReplayScore {
            ward_score: 82.0,
            wards_placed: 20,
            wards_destroyed: 5,
            ..ReplayScore::default()
        });

        Router::new()
            .route("/api/v1/analysis/process/:replay_id", post(process_replay))
            .route("/api/v1/analysis/:id", get(get_analysis))
            .with_state(
                AppStateBuilder::new()
                    .with_replay_repository(replays)
                    .with_scorer(Arc::new(scorer))
                    .build(),
            )
    }

    fn process(replay_id: i64) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/v1/analysis/process/{}", replay_id))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_process_then_repeat_conflicts() {
        let app = app().await;

        let response = app.clone().oneshot(process(1)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let analysis: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(analysis["rank"], "A");
        assert_eq!(analysis["wards_per_minute"], 0.8);

        let response = app.oneshot(process(1)).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(error["code"], "ALREADY_PROCESSED");
    }

    #[tokio::test]
    async fn test_process_unknown_replay_is_not_found() {
        let response = app().await.oneshot(process(77)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_analysis_includes_replay() {
        let app = app().await;
        app.clone().oneshot(process(1)).await.unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/analysis/1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let detail: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(detail["replay_id"], 1);
        assert_eq!(detail["replay"]["status"], "completed");
    }
}

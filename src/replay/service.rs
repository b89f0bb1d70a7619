use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{NewReplay, ReplayMetadata, ReplayModel, ReplayStatus},
    repository::ReplayRepository,
    types::{ReplayDetail, UpdateReplayRequest, UploadReplayRequest},
};
use crate::analysis::repository::AnalysisRepository;
use crate::shared::{AppError, PageMeta, PageRequest, Paginated};
use crate::user::repository::UserRepository;

const REPLAY_STORAGE_ROOT: &str = "/replays";
const REPLAY_EXTENSION: &str = "rofl";

/// Service for replay records. Status changes happen only in the analysis pipeline.
pub struct ReplayService {
    replays: Arc<dyn ReplayRepository>,
    users: Arc<dyn UserRepository>,
    analyses: Arc<dyn AnalysisRepository>,
}

impl ReplayService {
    pub fn new(
        replays: Arc<dyn ReplayRepository>,
        users: Arc<dyn UserRepository>,
        analyses: Arc<dyn AnalysisRepository>,
    ) -> Self {
        Self {
            replays,
            users,
            analyses,
        }
    }

    /// Records an uploaded replay for its owner in the `uploaded` state
    #[instrument(skip(self, request))]
    pub async fn upload_replay(
        &self,
        user_id: i64,
        request: UploadReplayRequest,
    ) -> Result<ReplayModel, AppError> {
        if request.file_name.trim().is_empty() {
            return Err(AppError::Validation("file_name is required".to_string()));
        }
        if request.match_id.trim().is_empty() {
            return Err(AppError::Validation("match_id is required".to_string()));
        }
        if request.duration < 0 {
            return Err(AppError::Validation(
                "duration cannot be negative".to_string(),
            ));
        }

        if self.users.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }

        if self
            .replays
            .get_replay_by_match_id(&request.match_id)
            .await?
            .is_some()
        {
            warn!(match_id = %request.match_id, "Rejecting duplicate replay upload");
            return Err(AppError::Duplicate(
                "Replay with this match_id already exists".to_string(),
            ));
        }

        let stored_name = format!("{}.{}", Uuid::new_v4(), REPLAY_EXTENSION);
        debug!(stored_name = %stored_name, "Generated replay storage name");

        let new_replay = NewReplay {
            user_id,
            file_path: format!("{}/{}", REPLAY_STORAGE_ROOT, stored_name),
            file_name: stored_name,
            original_name: request.file_name,
            file_size: request.file_size.unwrap_or_default(),
            match_id: request.match_id,
            game_mode: request.game_mode,
            game_version: request.game_version,
            duration: request.duration,
            champion: request.champion,
            role: request.role,
            queue: request.queue,
        };
        let replay = self.replays.create_replay(&new_replay).await?;

        info!(
            replay_id = replay.id,
            user_id,
            match_id = %replay.match_id,
            "Replay uploaded"
        );
        Ok(replay)
    }

    #[instrument(skip(self))]
    pub async fn get_replay(&self, replay_id: i64) -> Result<ReplayModel, AppError> {
        self.replays
            .get_replay(replay_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Replay {} not found", replay_id)))
    }

    /// Replay with owner and analysis loaded
    #[instrument(skip(self))]
    pub async fn get_replay_detail(&self, replay_id: i64) -> Result<ReplayDetail, AppError> {
        let replay = self.get_replay(replay_id).await?;
        let user = self.users.get_user(replay.user_id).await?;
        let analysis = self.analyses.get_analysis_by_replay(replay_id).await?;

        Ok(ReplayDetail {
            replay,
            user,
            analysis,
        })
    }

    #[instrument(skip(self))]
    pub async fn list_user_replays(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Paginated<ReplayModel>, AppError> {
        let (_, limit) = page.normalized();
        let total = self.replays.count_user_replays(user_id).await?;
        let data = self
            .replays
            .list_user_replays(user_id, page.offset(), limit)
            .await?;

        Ok(Paginated {
            data,
            meta: PageMeta::new(page, total),
        })
    }

    /// Replays waiting for their first processing attempt
    #[instrument(skip(self))]
    pub async fn list_pending_replays(&self) -> Result<Vec<ReplayModel>, AppError> {
        self.replays
            .list_replays_by_status(ReplayStatus::Uploaded)
            .await
    }

    #[instrument(skip(self, request))]
    pub async fn update_replay(
        &self,
        replay_id: i64,
        request: UpdateReplayRequest,
    ) -> Result<ReplayModel, AppError> {
        if request.duration.is_some_and(|duration| duration < 0) {
            return Err(AppError::Validation(
                "duration cannot be negative".to_string(),
            ));
        }

        let replay = self
            .replays
            .update_replay_metadata(replay_id, &ReplayMetadata::from(request))
            .await?;
        info!(replay_id, "Replay metadata updated");
        Ok(replay)
    }

    #[instrument(skip(self))]
    pub async fn delete_replay(&self, replay_id: i64) -> Result<(), AppError> {
        self.replays.delete_replay(replay_id).await?;
        info!(replay_id, "Replay deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::repository::InMemoryAnalysisRepository;
    use crate::replay::repository::InMemoryReplayRepository;
    use crate::user::repository::{tests::new_user, InMemoryUserRepository};

    struct Fixture {
        service: ReplayService,
        users: Arc<InMemoryUserRepository>,
    }

    fn fixture() -> Fixture {
        let users = Arc::new(InMemoryUserRepository::new());
        let service = ReplayService::new(
            Arc::new(InMemoryReplayRepository::new()),
            users.clone(),
            Arc::new(InMemoryAnalysisRepository::new()),
        );
        Fixture { service, users }
    }

    fn upload(match_id: &str) -> UploadReplayRequest {
        UploadReplayRequest {
            file_name: "my-game.rofl".to_string(),
            match_id: match_id.to_string(),
            file_size: Some(1_024_000),
            duration: 1500,
            champion: Some("Thresh".to_string()),
            role: Some("SUPPORT".to_string()),
            queue: Some("RANKED_SOLO_5x5".to_string()),
            game_mode: None,
            game_version: None,
        }
    }

    #[tokio::test]
    async fn test_upload_records_uploaded_replay() {
        let fx = fixture();
        let user = fx.users.create_user(&new_user("Alpha")).await.unwrap();

        let replay = fx
            .service
            .upload_replay(user.id, upload("BR1_1"))
            .await
            .unwrap();

        assert_eq!(replay.status, ReplayStatus::Uploaded);
        assert_eq!(replay.original_name, "my-game.rofl");
        assert!(replay.file_name.ends_with(".rofl"));
        assert_ne!(replay.file_name, replay.original_name);
        assert_eq!(replay.file_path, format!("/replays/{}", replay.file_name));
        assert!(replay.processed_at.is_none());
    }

    #[tokio::test]
    async fn test_upload_for_unknown_user_is_not_found() {
        let fx = fixture();
        let result = fx.service.upload_replay(404, upload("BR1_1")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_duplicate_match_id_is_rejected() {
        let fx = fixture();
        let user = fx.users.create_user(&new_user("Alpha")).await.unwrap();
        fx.service
            .upload_replay(user.id, upload("BR1_1"))
            .await
            .unwrap();

        let result = fx.service.upload_replay(user.id, upload("BR1_1")).await;
        assert!(matches!(result, Err(AppError::Duplicate(_))));
    }

    #[tokio::test]
    async fn test_update_changes_metadata_only() {
        let fx = fixture();
        let user = fx.users.create_user(&new_user("Alpha")).await.unwrap();
        let replay = fx
            .service
            .upload_replay(user.id, upload("BR1_1"))
            .await
            .unwrap();

        let updated = fx
            .service
            .update_replay(
                replay.id,
                UpdateReplayRequest {
                    champion: Some("Nautilus".into()),
                    duration: Some(1800),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.champion.as_deref(), Some("Nautilus"));
        assert_eq!(updated.duration, 1800);
        assert_eq!(updated.status, ReplayStatus::Uploaded);
    }

    #[tokio::test]
    async fn test_detail_loads_owner() {
        let fx = fixture();
        let user = fx.users.create_user(&new_user("Alpha")).await.unwrap();
        let replay = fx
            .service
            .upload_replay(user.id, upload("BR1_1"))
            .await
            .unwrap();

        let detail = fx.service.get_replay_detail(replay.id).await.unwrap();
        assert_eq!(detail.user.unwrap().id, user.id);
        assert!(detail.analysis.is_none());
    }

    #[tokio::test]
    async fn test_deleted_replay_is_gone_from_lists() {
        let fx = fixture();
        let user = fx.users.create_user(&new_user("Alpha")).await.unwrap();
        let replay = fx
            .service
            .upload_replay(user.id, upload("BR1_1"))
            .await
            .unwrap();
        fx.service
            .upload_replay(user.id, upload("BR1_2"))
            .await
            .unwrap();

        fx.service.delete_replay(replay.id).await.unwrap();

        let page = fx
            .service
            .list_user_replays(user.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.data[0].match_id, "BR1_2");
        assert_eq!(fx.service.list_pending_replays().await.unwrap().len(), 1);
    }
}

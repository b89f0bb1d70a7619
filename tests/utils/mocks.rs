use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Barrier;

use wardscore::{
    analysis::{
        models::NewAnalysis,
        repository::InMemoryAnalysisRepository,
        scoring::{ReplayScore, ReplayScorer},
    },
    replay::models::ReplayMetadata,
    user::models::NewUser,
    AnalysisModel, AnalysisRepository, AppError, ReplayModel, ReplayRepository, UserModel,
    UserRepository,
};

// ============================================================================
// Store doubles
// ============================================================================

/// Delegates to another user repository and counts id lookups that reach it
pub struct CountingUserRepository {
    inner: Arc<dyn UserRepository>,
    get_user_calls: AtomicUsize,
}

impl CountingUserRepository {
    pub fn new(inner: Arc<dyn UserRepository>) -> Self {
        Self {
            inner,
            get_user_calls: AtomicUsize::new(0),
        }
    }

    pub fn get_user_calls(&self) -> usize {
        self.get_user_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UserRepository for CountingUserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, user_id: i64) -> Result<Option<UserModel>, AppError> {
        self.get_user_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_user(user_id).await
    }

    async fn get_user_by_riot_id(&self, riot_id: &str) -> Result<Option<UserModel>, AppError> {
        self.inner.get_user_by_riot_id(riot_id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        self.inner.get_user_by_email(email).await
    }

    async fn get_user_by_puuid(&self, puuid: &str) -> Result<Option<UserModel>, AppError> {
        self.inner.get_user_by_puuid(puuid).await
    }

    async fn update_user(&self, user: &UserModel) -> Result<(), AppError> {
        self.inner.update_user(user).await
    }

    async fn delete_user(&self, user_id: i64) -> Result<(), AppError> {
        self.inner.delete_user(user_id).await
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<UserModel>, AppError> {
        self.inner.list_users(offset, limit).await
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        self.inner.count_users().await
    }
}

/// In-memory analysis store whose "already processed" lookup waits until
/// `parties` callers have made it, so they all see the same empty answer.
pub struct GatedAnalysisRepository {
    inner: InMemoryAnalysisRepository,
    gate: Barrier,
}

impl GatedAnalysisRepository {
    pub fn new(parties: usize) -> Self {
        Self {
            inner: InMemoryAnalysisRepository::new(),
            gate: Barrier::new(parties),
        }
    }
}

#[async_trait]
impl AnalysisRepository for GatedAnalysisRepository {
    async fn create_analysis(&self, analysis: &NewAnalysis) -> Result<AnalysisModel, AppError> {
        self.inner.create_analysis(analysis).await
    }

    async fn get_analysis(&self, analysis_id: i64) -> Result<Option<AnalysisModel>, AppError> {
        self.inner.get_analysis(analysis_id).await
    }

    async fn get_analysis_by_replay(
        &self,
        replay_id: i64,
    ) -> Result<Option<AnalysisModel>, AppError> {
        let found = self.inner.get_analysis_by_replay(replay_id).await;
        self.gate.wait().await;
        found
    }

    async fn list_user_analyses(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<AnalysisModel>, AppError> {
        self.inner.list_user_analyses(user_id, offset, limit).await
    }

    async fn count_user_analyses(&self, user_id: i64) -> Result<i64, AppError> {
        self.inner.count_user_analyses(user_id).await
    }

    async fn all_user_analyses(&self, user_id: i64) -> Result<Vec<AnalysisModel>, AppError> {
        self.inner.all_user_analyses(user_id).await
    }
}

// ============================================================================
// Scorer doubles
// ============================================================================

/// Applies a metadata edit to the replay while it is being scored, the way a
/// PUT arriving mid-processing would, then defers to `inner`.
pub struct EditingScorer {
    replays: Arc<dyn ReplayRepository>,
    metadata: ReplayMetadata,
    inner: Arc<dyn ReplayScorer>,
}

impl EditingScorer {
    pub fn new(
        replays: Arc<dyn ReplayRepository>,
        metadata: ReplayMetadata,
        inner: Arc<dyn ReplayScorer>,
    ) -> Self {
        Self {
            replays,
            metadata,
            inner,
        }
    }
}

#[async_trait]
impl ReplayScorer for EditingScorer {
    async fn score(&self, replay: &ReplayModel) -> Result<ReplayScore, AppError> {
        self.replays
            .update_replay_metadata(replay.id, &self.metadata)
            .await?;
        self.inner.score(replay).await
    }

    fn scorer_name(&self) -> &'static str {
        "EditingScorer"
    }
}

use axum::Router;
use std::sync::Arc;
use std::time::Duration;

use wardscore::{
    analysis::{
        repository::InMemoryAnalysisRepository,
        scoring::{ReplayScore, ReplayScorer, StaticReplayScorer},
    },
    ranking::repository::InMemoryRankingRepository,
    replay::repository::InMemoryReplayRepository,
    user::repository::InMemoryUserRepository,
    AnalysisRepository, AppState, CachedUserRepository, Config, InMemoryCacheStore,
};

use super::mocks::CountingUserRepository;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

/// Fully wired application over in-memory stores
pub struct TestSetup {
    pub app: Router,
    pub store: Arc<CountingUserRepository>,
    pub users: Arc<CachedUserRepository>,
    pub cache: Arc<InMemoryCacheStore>,
    pub replays: Arc<InMemoryReplayRepository>,
    pub analyses: Arc<dyn AnalysisRepository>,
}

pub struct TestSetupBuilder {
    scorer: Arc<dyn ReplayScorer>,
    analyses: Arc<dyn AnalysisRepository>,
    cache_ttl: Duration,
}

/// Scorer with fixed counters: 20 wards placed, 5 destroyed
pub fn fixed_scorer(ward_score: f64) -> Arc<dyn ReplayScorer> {
    Arc::new(StaticReplayScorer::new(ReplayScore {
        ward_score,
        wards_placed: 20,
        wards_destroyed: 5,
        vision_score: 52,
        control_wards_placed: 7,
        ..ReplayScore::default()
    }))
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            scorer: fixed_scorer(82.0),
            analyses: Arc::new(InMemoryAnalysisRepository::new()),
            cache_ttl: Duration::from_secs(300),
        }
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn ReplayScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_analysis_repository(mut self, analyses: Arc<dyn AnalysisRepository>) -> Self {
        self.analyses = analyses;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn build(self) -> TestSetup {
        let store = Arc::new(CountingUserRepository::new(Arc::new(
            InMemoryUserRepository::new(),
        )));
        let cache = Arc::new(InMemoryCacheStore::new());
        let users = Arc::new(CachedUserRepository::new(
            store.clone(),
            cache.clone(),
            self.cache_ttl,
        ));
        let replays = Arc::new(InMemoryReplayRepository::new());

        let state = AppState::new(
            users.clone(),
            replays.clone(),
            self.analyses.clone(),
            Arc::new(InMemoryRankingRepository::new()),
            self.scorer,
            Arc::new(Config::default()),
        );

        TestSetup {
            app: wardscore::router(state),
            store,
            users,
            cache,
            replays,
            analyses: self.analyses,
        }
    }
}

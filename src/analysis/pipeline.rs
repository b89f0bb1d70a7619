use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::{
    models::{AnalysisModel, NewAnalysis},
    repository::AnalysisRepository,
    scoring::ReplayScorer,
    types::AnalysisDetail,
};
use crate::replay::{
    models::{ReplayModel, ReplayStatus},
    repository::ReplayRepository,
};
use crate::shared::{AppError, PageMeta, PageRequest, Paginated};

/// Turns uploaded replays into analyses and owns every replay status change.
pub struct AnalysisPipeline {
    replays: Arc<dyn ReplayRepository>,
    analyses: Arc<dyn AnalysisRepository>,
    scorer: Arc<dyn ReplayScorer>,
}

impl AnalysisPipeline {
    pub fn new(
        replays: Arc<dyn ReplayRepository>,
        analyses: Arc<dyn AnalysisRepository>,
        scorer: Arc<dyn ReplayScorer>,
    ) -> Self {
        Self {
            replays,
            analyses,
            scorer,
        }
    }

    /// Scores a replay and stores its single analysis.
    ///
    /// Ends with the replay `completed` and the analysis returned, or with the
    /// replay `failed` and the scoring/storage error returned. Replays that already
    /// have an analysis are rejected with `AlreadyProcessed`; replays outside
    /// `uploaded`/`failed` with `InvalidState`.
    #[instrument(skip(self))]
    pub async fn process_replay(&self, replay_id: i64) -> Result<AnalysisModel, AppError> {
        let mut replay = self
            .replays
            .get_replay(replay_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Replay {} not found", replay_id)))?;

        if self
            .analyses
            .get_analysis_by_replay(replay_id)
            .await?
            .is_some()
        {
            warn!(replay_id, "Replay already has an analysis");
            return Err(AppError::AlreadyProcessed(format!(
                "Replay {} has already been processed",
                replay_id
            )));
        }

        if !replay.can_be_processed() {
            warn!(replay_id, status = %replay.status, "Replay cannot be processed");
            return Err(AppError::InvalidState(format!(
                "Replay {} is {} and cannot be processed",
                replay_id, replay.status
            )));
        }

        replay.mark_as_processing()?;
        self.persist_status(&replay).await?;
        info!(replay_id, scorer = self.scorer.scorer_name(), "Replay processing started");

        let score = match self.scorer.score(&replay).await {
            Ok(score) => score,
            Err(e) => {
                error!(replay_id, error = %e, "Scoring failed");
                self.fail_replay(&mut replay).await;
                return Err(e);
            }
        };

        let new_analysis = NewAnalysis::from_score(&replay, score);
        debug!(
            replay_id,
            ward_score = new_analysis.ward_score,
            rank = %new_analysis.rank,
            "Replay scored"
        );

        let analysis = match self.analyses.create_analysis(&new_analysis).await {
            Ok(analysis) => analysis,
            Err(AppError::Duplicate(_)) => {
                warn!(replay_id, "Lost analysis race for replay");
                self.settle_lost_race(replay_id).await;
                return Err(AppError::AlreadyProcessed(format!(
                    "Replay {} has already been processed",
                    replay_id
                )));
            }
            Err(e) => {
                error!(replay_id, error = %e, "Failed to store analysis");
                self.fail_replay(&mut replay).await;
                return Err(e);
            }
        };

        replay.mark_as_completed()?;
        self.persist_status(&replay).await?;

        info!(
            replay_id,
            analysis_id = analysis.id,
            ward_score = analysis.ward_score,
            rank = %analysis.rank,
            "Replay processed"
        );
        Ok(analysis)
    }

    async fn persist_status(&self, replay: &ReplayModel) -> Result<(), AppError> {
        self.replays
            .update_replay_status(replay.id, replay.status, replay.processed_at)
            .await
    }

    /// Compensating transition after a failed attempt. The caller's error wins,
    /// so a failure here is only logged.
    async fn fail_replay(&self, replay: &mut ReplayModel) {
        if let Err(e) = replay.mark_as_failed() {
            warn!(replay_id = replay.id, error = %e, "Could not mark replay failed");
            return;
        }
        if let Err(e) = self.persist_status(replay).await {
            warn!(replay_id = replay.id, error = %e, "Could not persist failed replay");
        }
    }

    /// The winning call stored an analysis; make sure our `processing` write did
    /// not land after its `completed` one.
    async fn settle_lost_race(&self, replay_id: i64) {
        let mut current = match self.replays.get_replay(replay_id).await {
            Ok(Some(replay)) => replay,
            Ok(None) => return,
            Err(e) => {
                warn!(replay_id, error = %e, "Could not reload replay after lost race");
                return;
            }
        };

        if current.status == ReplayStatus::Processing && current.mark_as_completed().is_ok() {
            if let Err(e) = self.persist_status(&current).await {
                warn!(replay_id, error = %e, "Could not restore completed replay");
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn get_analysis(&self, analysis_id: i64) -> Result<AnalysisModel, AppError> {
        self.analyses
            .get_analysis(analysis_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Analysis {} not found", analysis_id)))
    }

    /// Analysis with its source replay loaded
    #[instrument(skip(self))]
    pub async fn get_analysis_detail(&self, analysis_id: i64) -> Result<AnalysisDetail, AppError> {
        let analysis = self.get_analysis(analysis_id).await?;
        let replay = self.replays.get_replay(analysis.replay_id).await?;
        Ok(AnalysisDetail { analysis, replay })
    }

    #[instrument(skip(self))]
    pub async fn get_analysis_by_replay(&self, replay_id: i64) -> Result<AnalysisModel, AppError> {
        self.analyses
            .get_analysis_by_replay(replay_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Analysis for replay {} not found", replay_id))
            })
    }

    #[instrument(skip(self))]
    pub async fn list_user_analyses(
        &self,
        user_id: i64,
        page: PageRequest,
    ) -> Result<Paginated<AnalysisModel>, AppError> {
        let (_, limit) = page.normalized();
        let total = self.analyses.count_user_analyses(user_id).await?;
        let data = self
            .analyses
            .list_user_analyses(user_id, page.offset(), limit)
            .await?;

        Ok(Paginated {
            data,
            meta: PageMeta::new(page, total),
        })
    }
}

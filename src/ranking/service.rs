use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{aggregator::RankingAggregator, models::RankingModel, repository::RankingRepository};
use crate::analysis::repository::AnalysisRepository;
use crate::shared::AppError;
use crate::user::repository::UserRepository;

/// Service for per-season rankings built from a user's analyses
pub struct RankingService {
    rankings: Arc<dyn RankingRepository>,
    analyses: Arc<dyn AnalysisRepository>,
    users: Arc<dyn UserRepository>,
    aggregator: RankingAggregator,
}

impl RankingService {
    pub fn new(
        rankings: Arc<dyn RankingRepository>,
        analyses: Arc<dyn AnalysisRepository>,
        users: Arc<dyn UserRepository>,
        aggregator: RankingAggregator,
    ) -> Self {
        Self {
            rankings,
            analyses,
            users,
            aggregator,
        }
    }

    fn season_or_default(&self, season: Option<String>) -> String {
        season
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.aggregator.default_season().to_string())
    }

    /// Recomputes a user's ranking for a season from every analysis they own,
    /// then renumbers positions in the user's region.
    #[instrument(skip(self))]
    pub async fn refresh_user_ranking(
        &self,
        user_id: i64,
        season: Option<String>,
    ) -> Result<RankingModel, AppError> {
        let season = self.season_or_default(season);
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let analyses = self.analyses.all_user_analyses(user_id).await?;
        let draft = self
            .aggregator
            .summarize(user_id, &user.region, Some(season.clone()), &analyses)
            .ok_or_else(|| {
                warn!(user_id, "No analyses to rank");
                AppError::NotFound(format!("User {} has no analyses to rank", user_id))
            })?;
        debug!(user_id, games = draft.games_played, ward_score = draft.ward_score, "Aggregated analyses");

        let previous_region = match self.rankings.get_user_ranking(user_id, &season).await? {
            Some(mut existing) => {
                let previous_region = existing.region.clone();
                self.aggregator.prepare_update(&mut existing, draft);
                self.rankings.update_ranking(&existing).await?;
                Some(previous_region)
            }
            None => {
                let new_ranking = self.aggregator.prepare_insert(draft);
                self.rankings.create_ranking(&new_ranking).await?;
                None
            }
        };

        self.rankings.assign_positions(&user.region, &season).await?;
        if let Some(previous_region) = previous_region.filter(|r| *r != user.region) {
            self.rankings
                .assign_positions(&previous_region, &season)
                .await?;
        }

        let ranking = self
            .rankings
            .get_user_ranking(user_id, &season)
            .await?
            .ok_or_else(|| AppError::Internal("Ranking vanished after refresh".to_string()))?;

        info!(
            user_id,
            season = %ranking.season,
            tier = %ranking.tier,
            division = %ranking.division,
            position = ranking.position,
            "Ranking refreshed"
        );
        Ok(ranking)
    }

    #[instrument(skip(self))]
    pub async fn get_user_ranking(
        &self,
        user_id: i64,
        season: Option<String>,
    ) -> Result<RankingModel, AppError> {
        let season = self.season_or_default(season);
        self.rankings
            .get_user_ranking(user_id, &season)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Ranking for user {} in season {} not found",
                    user_id, season
                ))
            })
    }

    /// Rankings ordered by ward score; `None` region is the global board
    #[instrument(skip(self))]
    pub async fn leaderboard(
        &self,
        region: Option<String>,
        season: Option<String>,
        limit: i64,
    ) -> Result<Vec<RankingModel>, AppError> {
        let season = self.season_or_default(season);
        self.rankings
            .list_rankings(region.as_deref(), &season, limit)
            .await
    }
}

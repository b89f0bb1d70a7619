use chrono::Utc;

use super::models::{NewRanking, RankingDraft, RankingModel};
use crate::analysis::models::AnalysisModel;
use crate::rank::tier_division;

/// Normalizes ranking rows before they reach a store.
///
/// Every create and update goes through here so `tier`/`division` always match
/// the current `ward_score` and `last_updated` moves with each write.
#[derive(Debug, Clone)]
pub struct RankingAggregator {
    default_season: String,
}

impl RankingAggregator {
    pub fn new(default_season: impl Into<String>) -> Self {
        Self {
            default_season: default_season.into(),
        }
    }

    pub fn default_season(&self) -> &str {
        &self.default_season
    }

    /// Folds a user's analyses into aggregate figures. `None` when there is nothing to rank.
    pub fn summarize(
        &self,
        user_id: i64,
        region: &str,
        season: Option<String>,
        analyses: &[AnalysisModel],
    ) -> Option<RankingDraft> {
        if analyses.is_empty() {
            return None;
        }

        let games_played = analyses.len() as i32;
        let total_score: f64 = analyses.iter().map(|a| a.ward_score).sum();
        let average_score = total_score / games_played as f64;
        let best_score = analyses
            .iter()
            .map(|a| a.ward_score)
            .fold(f64::MIN, f64::max);
        let worst_score = analyses
            .iter()
            .map(|a| a.ward_score)
            .fold(f64::MAX, f64::min);

        Some(RankingDraft {
            user_id,
            region: region.to_string(),
            season,
            ward_score: average_score,
            games_played,
            average_score,
            best_score,
            worst_score,
            total_wards: analyses.iter().map(|a| a.wards_placed).sum(),
            total_vision: analyses.iter().map(|a| a.vision_score).sum(),
        })
    }

    /// Classification and defaults for a new row
    pub fn prepare_insert(&self, draft: RankingDraft) -> NewRanking {
        let (tier, division) = tier_division(draft.ward_score);
        let season = draft
            .season
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| self.default_season.clone());

        NewRanking {
            user_id: draft.user_id,
            region: draft.region,
            season,
            ward_score: draft.ward_score,
            tier,
            division,
            games_played: draft.games_played,
            average_score: draft.average_score,
            best_score: draft.best_score,
            worst_score: draft.worst_score,
            total_wards: draft.total_wards,
            total_vision: draft.total_vision,
            last_updated: Utc::now(),
        }
    }

    /// Applies fresh figures to a stored row, keeping its id, season and position
    pub fn prepare_update(&self, existing: &mut RankingModel, draft: RankingDraft) {
        existing.region = draft.region;
        existing.ward_score = draft.ward_score;
        existing.games_played = draft.games_played;
        existing.average_score = draft.average_score;
        existing.best_score = draft.best_score;
        existing.worst_score = draft.worst_score;
        existing.total_wards = draft.total_wards;
        existing.total_vision = draft.total_vision;
        self.reclassify(existing);
    }

    /// Recomputes tier/division from the row's current score
    pub fn reclassify(&self, ranking: &mut RankingModel) {
        let (tier, division) = tier_division(ranking.ward_score);
        ranking.tier = tier;
        ranking.division = division;
        ranking.last_updated = Utc::now();
    }
}

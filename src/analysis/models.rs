use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::scoring::{DerivedMetrics, ReplayScore};
use crate::rank::{letter_rank, LetterRank};
use crate::replay::models::ReplayModel;

/// Database model for analyses table. At most one row per replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisModel {
    pub id: i64,
    pub user_id: i64,
    pub replay_id: i64,

    pub ward_score: f64,
    pub rank: LetterRank,

    pub wards_placed: i32,
    pub wards_destroyed: i32,
    pub vision_score: i32,
    pub control_wards_placed: i32,
    pub wards_per_minute: f64,
    pub vision_control_ratio: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game_stats: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heatmap_data: Option<Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Fully normalized insert payload: rank and ratios are resolved before it reaches a store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAnalysis {
    pub user_id: i64,
    pub replay_id: i64,
    pub ward_score: f64,
    pub rank: LetterRank,
    pub wards_placed: i32,
    pub wards_destroyed: i32,
    pub vision_score: i32,
    pub control_wards_placed: i32,
    pub wards_per_minute: f64,
    pub vision_control_ratio: f64,
    pub game_stats: Option<Value>,
    pub insights: Option<Value>,
    pub suggestions: Option<Value>,
    pub heatmap_data: Option<Value>,
}

impl NewAnalysis {
    /// Builds the row for a scored replay, deriving ratios from the replay's duration
    /// and falling back to the classifier when the scorer left the rank open.
    pub fn from_score(replay: &ReplayModel, score: ReplayScore) -> Self {
        let metrics =
            DerivedMetrics::compute(score.wards_placed, score.wards_destroyed, replay.duration);
        let rank = score.rank.unwrap_or_else(|| letter_rank(score.ward_score));

        Self {
            user_id: replay.user_id,
            replay_id: replay.id,
            ward_score: score.ward_score,
            rank,
            wards_placed: score.wards_placed,
            wards_destroyed: score.wards_destroyed,
            vision_score: score.vision_score,
            control_wards_placed: score.control_wards_placed,
            wards_per_minute: metrics.wards_per_minute,
            vision_control_ratio: metrics.vision_control_ratio,
            game_stats: score.game_stats,
            insights: score.insights,
            suggestions: score.suggestions,
            heatmap_data: score.heatmap_data,
        }
    }

    pub fn into_model(self, id: i64) -> AnalysisModel {
        let now = Utc::now();
        AnalysisModel {
            id,
            user_id: self.user_id,
            replay_id: self.replay_id,
            ward_score: self.ward_score,
            rank: self.rank,
            wards_placed: self.wards_placed,
            wards_destroyed: self.wards_destroyed,
            vision_score: self.vision_score,
            control_wards_placed: self.control_wards_placed,
            wards_per_minute: self.wards_per_minute,
            vision_control_ratio: self.vision_control_ratio,
            game_stats: self.game_stats,
            insights: self.insights,
            suggestions: self.suggestions,
            heatmap_data: self.heatmap_data,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

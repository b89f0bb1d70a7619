use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::rank::{Division, Tier};

/// Database model for rankings table. One live row per (user, season).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingModel {
    pub id: i64,
    pub user_id: i64,

    /// Aggregate score, not a single-game score
    pub ward_score: f64,
    /// 1-based place within region and season; 0 until first assigned
    pub position: i32,
    pub region: String,
    pub tier: Tier,
    pub division: Division,

    pub games_played: i32,
    pub average_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
    pub total_wards: i32,
    pub total_vision: i32,

    pub season: String,
    pub last_updated: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Aggregated figures for one user before classification
#[derive(Debug, Clone, PartialEq)]
pub struct RankingDraft {
    pub user_id: i64,
    pub region: String,
    pub season: Option<String>,
    pub ward_score: f64,
    pub games_played: i32,
    pub average_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
    pub total_wards: i32,
    pub total_vision: i32,
}

/// Insert payload produced by the aggregator; tier, season and timestamp are settled
#[derive(Debug, Clone, PartialEq)]
pub struct NewRanking {
    pub user_id: i64,
    pub region: String,
    pub season: String,
    pub ward_score: f64,
    pub tier: Tier,
    pub division: Division,
    pub games_played: i32,
    pub average_score: f64,
    pub best_score: f64,
    pub worst_score: f64,
    pub total_wards: i32,
    pub total_vision: i32,
    pub last_updated: DateTime<Utc>,
}

impl NewRanking {
    pub fn into_model(self, id: i64) -> RankingModel {
        let now = Utc::now();
        RankingModel {
            id,
            user_id: self.user_id,
            ward_score: self.ward_score,
            position: 0,
            region: self.region,
            tier: self.tier,
            division: self.division,
            games_played: self.games_played,
            average_score: self.average_score,
            best_score: self.best_score,
            worst_score: self.worst_score,
            total_wards: self.total_wards,
            total_vision: self.total_vision,
            season: self.season,
            last_updated: self.last_updated,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

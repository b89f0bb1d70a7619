use serde::Deserialize;

pub const DEFAULT_LEADERBOARD_LIMIT: i64 = 50;
pub const MAX_LEADERBOARD_LIMIT: i64 = 100;

/// Query parameters for leaderboard endpoints
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub season: Option<String>,
    pub limit: Option<i64>,
}

impl LeaderboardQuery {
    /// Limits outside 1..=100 fall back to the default
    pub fn limit(&self) -> i64 {
        self.limit
            .filter(|l| (1..=MAX_LEADERBOARD_LIMIT).contains(l))
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeasonQuery {
    pub season: Option<String>,
}

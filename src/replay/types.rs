use serde::{Deserialize, Serialize};

use super::models::{ReplayMetadata, ReplayModel};
use crate::analysis::models::AnalysisModel;
use crate::shared::PageRequest;
use crate::user::models::UserModel;

/// Request payload for registering an uploaded replay
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReplayRequest {
    pub file_name: String,
    #[serde(alias = "game_id")]
    pub match_id: String,
    pub file_size: Option<i64>,
    #[serde(default)]
    pub duration: i32,
    pub champion: Option<String>,
    pub role: Option<String>,
    pub queue: Option<String>,
    pub game_mode: Option<String>,
    pub game_version: Option<String>,
}

/// Metadata corrections; status is owned by the analysis pipeline
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateReplayRequest {
    pub duration: Option<i32>,
    pub champion: Option<String>,
    pub role: Option<String>,
    pub queue: Option<String>,
    pub game_mode: Option<String>,
    pub game_version: Option<String>,
}

impl From<UpdateReplayRequest> for ReplayMetadata {
    fn from(request: UpdateReplayRequest) -> Self {
        Self {
            duration: request.duration,
            champion: request.champion,
            role: request.role,
            queue: request.queue,
            game_mode: request.game_mode,
            game_version: request.game_version,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListReplaysQuery {
    pub user_id: i64,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListReplaysQuery {
    pub fn page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page,
            limit: self.limit,
        }
    }
}

/// A replay with its owner and analysis eagerly loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayDetail {
    #[serde(flatten)]
    pub replay: ReplayModel,
    pub user: Option<UserModel>,
    pub analysis: Option<AnalysisModel>,
}

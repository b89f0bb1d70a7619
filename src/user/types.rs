use serde::{Deserialize, Serialize};

use super::models::UserModel;
use crate::replay::models::ReplayModel;

/// Request payload for registering a user
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    /// Defaults to "<game_name>#<tag_line>"
    pub riot_id: Option<String>,
    pub game_name: String,
    pub tag_line: String,
    pub puuid: Option<String>,
    pub email: String,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_pro: bool,
    pub region: Option<String>,
}

/// Partial profile update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub game_name: Option<String>,
    pub tag_line: Option<String>,
    pub puuid: Option<String>,
    pub avatar_url: Option<String>,
    pub is_pro: Option<bool>,
    pub region: Option<String>,
}

/// A user with their replays eagerly loaded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithReplays {
    #[serde(flatten)]
    pub user: UserModel,
    pub replays: Vec<ReplayModel>,
}

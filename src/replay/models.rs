use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};

use crate::shared::AppError;

/// Lifecycle of an uploaded replay.
///
/// `uploaded` is initial, `completed` is terminal and `failed` may be retried.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReplayStatus {
    #[default]
    Uploaded,
    Processing,
    Completed,
    Failed,
}

impl ReplayStatus {
    pub fn can_transition_to(self, next: ReplayStatus) -> bool {
        use ReplayStatus::*;
        matches!(
            (self, next),
            (Uploaded, Processing) | (Failed, Processing) | (Processing, Completed) | (Processing, Failed)
        )
    }
}

/// Database model for replays table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayModel {
    pub id: i64,
    pub user_id: i64,

    pub file_name: String,     // Stored name
    pub original_name: String, // Name as uploaded
    pub file_path: String,
    pub file_size: i64,

    pub match_id: String, // Natural key, unique
    pub game_mode: Option<String>,
    pub game_version: Option<String>,
    pub duration: i32, // Seconds
    pub champion: Option<String>,
    pub role: Option<String>,
    pub queue: Option<String>,

    pub status: ReplayStatus,
    pub uploaded_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>, // Set iff status is completed

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ReplayModel {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_processed(&self) -> bool {
        self.status == ReplayStatus::Completed
    }

    pub fn can_be_processed(&self) -> bool {
        matches!(self.status, ReplayStatus::Uploaded | ReplayStatus::Failed)
    }

    pub fn mark_as_processing(&mut self) -> Result<(), AppError> {
        self.transition(ReplayStatus::Processing)
    }

    pub fn mark_as_completed(&mut self) -> Result<(), AppError> {
        self.transition(ReplayStatus::Completed)
    }

    pub fn mark_as_failed(&mut self) -> Result<(), AppError> {
        self.transition(ReplayStatus::Failed)
    }

    fn transition(&mut self, next: ReplayStatus) -> Result<(), AppError> {
        if !self.status.can_transition_to(next) {
            return Err(AppError::InvalidState(format!(
                "Replay {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }

        self.status = next;
        self.processed_at = (next == ReplayStatus::Completed).then(Utc::now);
        Ok(())
    }
}

/// Insert payload; the store assigns id and timestamps
#[derive(Debug, Clone)]
pub struct NewReplay {
    pub user_id: i64,
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub match_id: String,
    pub game_mode: Option<String>,
    pub game_version: Option<String>,
    pub duration: i32,
    pub champion: Option<String>,
    pub role: Option<String>,
    pub queue: Option<String>,
}

impl NewReplay {
    pub fn into_model(self, id: i64) -> ReplayModel {
        let now = Utc::now();
        ReplayModel {
            id,
            user_id: self.user_id,
            file_name: self.file_name,
            original_name: self.original_name,
            file_path: self.file_path,
            file_size: self.file_size,
            match_id: self.match_id,
            game_mode: self.game_mode,
            game_version: self.game_version,
            duration: self.duration,
            champion: self.champion,
            role: self.role,
            queue: self.queue,
            status: ReplayStatus::Uploaded,
            uploaded_at: now,
            processed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }
}

/// Metadata corrections. Status and `processed_at` are not part of it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplayMetadata {
    pub duration: Option<i32>,
    pub champion: Option<String>,
    pub role: Option<String>,
    pub queue: Option<String>,
    pub game_mode: Option<String>,
    pub game_version: Option<String>,
}

impl ReplayMetadata {
    /// Overwrites only the fields that are present
    pub fn apply_to(&self, replay: &mut ReplayModel) {
        if let Some(duration) = self.duration {
            replay.duration = duration;
        }
        if let Some(champion) = &self.champion {
            replay.champion = Some(champion.clone());
        }
        if let Some(role) = &self.role {
            replay.role = Some(role.clone());
        }
        if let Some(queue) = &self.queue {
            replay.queue = Some(queue.clone());
        }
        if let Some(game_mode) = &self.game_mode {
            replay.game_mode = Some(game_mode.clone());
        }
        if let Some(game_version) = &self.game_version {
            replay.game_version = Some(game_version.clone());
        }
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{NewReplay, ReplayMetadata, ReplayModel, ReplayStatus};
use crate::shared::AppError;

/// Trait for replay repository operations.
///
/// Lookups never return soft-deleted rows; `match_id` stays unique across all rows.
#[async_trait]
pub trait ReplayRepository: Send + Sync {
    async fn create_replay(&self, replay: &NewReplay) -> Result<ReplayModel, AppError>;
    async fn get_replay(&self, replay_id: i64) -> Result<Option<ReplayModel>, AppError>;
    async fn get_replay_by_match_id(&self, match_id: &str)
        -> Result<Option<ReplayModel>, AppError>;

    /// Merges metadata onto the stored row. Status and `processed_at` are left untouched.
    async fn update_replay_metadata(
        &self,
        replay_id: i64,
        metadata: &ReplayMetadata,
    ) -> Result<ReplayModel, AppError>;

    /// Writes only status and `processed_at`; reserved for the analysis pipeline
    async fn update_replay_status(
        &self,
        replay_id: i64,
        status: ReplayStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError>;
    async fn delete_replay(&self, replay_id: i64) -> Result<(), AppError>;

    /// Newest first
    async fn list_user_replays(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ReplayModel>, AppError>;
    async fn count_user_replays(&self, user_id: i64) -> Result<i64, AppError>;
    async fn list_replays_by_status(
        &self,
        status: ReplayStatus,
    ) -> Result<Vec<ReplayModel>, AppError>;
}

#[derive(Default)]
struct ReplayTable {
    rows: BTreeMap<i64, ReplayModel>,
    next_id: i64,
}

impl ReplayTable {
    fn live(&self) -> impl Iterator<Item = &ReplayModel> {
        self.rows.values().filter(|replay| !replay.is_deleted())
    }
}

/// In-memory implementation of ReplayRepository for development and testing
#[derive(Default)]
pub struct InMemoryReplayRepository {
    table: RwLock<ReplayTable>,
}

impl InMemoryReplayRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReplayRepository for InMemoryReplayRepository {
    #[instrument(skip(self, replay))]
    async fn create_replay(&self, replay: &NewReplay) -> Result<ReplayModel, AppError> {
        debug!(match_id = %replay.match_id, user_id = replay.user_id, "Creating replay in memory");

        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|existing| existing.match_id == replay.match_id)
        {
            warn!(match_id = %replay.match_id, "Replay already exists in memory");
            return Err(AppError::Duplicate(
                "Replay with this match_id already exists".to_string(),
            ));
        }

        let id = table.next_id.max(1);
        table.next_id = id + 1;
        let model = replay.clone().into_model(id);
        table.rows.insert(id, model.clone());

        debug!(replay_id = id, "Replay created successfully in memory");
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_replay(&self, replay_id: i64) -> Result<Option<ReplayModel>, AppError> {
        debug!(replay_id, "Fetching replay from memory");
        let table = self.table.read().await;
        let replay = table.live().find(|r| r.id == replay_id).cloned();
        Ok(replay)
    }

    #[instrument(skip(self))]
    async fn get_replay_by_match_id(
        &self,
        match_id: &str,
    ) -> Result<Option<ReplayModel>, AppError> {
        let table = self.table.read().await;
        let replay = table.live().find(|r| r.match_id == match_id).cloned();
        Ok(replay)
    }

    #[instrument(skip(self, metadata))]
    async fn update_replay_metadata(
        &self,
        replay_id: i64,
        metadata: &ReplayMetadata,
    ) -> Result<ReplayModel, AppError> {
        debug!(replay_id, "Updating replay metadata in memory");

        let mut table = self.table.write().await;
        let replay = table
            .rows
            .get_mut(&replay_id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| {
                warn!(replay_id, "Replay not found for update in memory");
                AppError::NotFound("Replay not found".to_string())
            })?;

        metadata.apply_to(replay);
        replay.updated_at = Utc::now();
        Ok(replay.clone())
    }

    #[instrument(skip(self))]
    async fn update_replay_status(
        &self,
        replay_id: i64,
        status: ReplayStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        debug!(replay_id, status = %status, "Updating replay status in memory");

        let mut table = self.table.write().await;
        let replay = table
            .rows
            .get_mut(&replay_id)
            .filter(|r| !r.is_deleted())
            .ok_or_else(|| {
                warn!(replay_id, "Replay not found for status update in memory");
                AppError::NotFound("Replay not found".to_string())
            })?;

        replay.status = status;
        replay.processed_at = processed_at;
        replay.updated_at = Utc::now();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_replay(&self, replay_id: i64) -> Result<(), AppError> {
        debug!(replay_id, "Soft deleting replay in memory");

        let mut table = self.table.write().await;
        match table.rows.get_mut(&replay_id) {
            Some(replay) if !replay.is_deleted() => {
                replay.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => {
                warn!(replay_id, "Replay not found for deletion in memory");
                Err(AppError::NotFound("Replay not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_user_replays(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ReplayModel>, AppError> {
        let table = self.table.read().await;
        let mut replays: Vec<ReplayModel> = table
            .live()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        replays.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        Ok(replays
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    #[instrument(skip(self))]
    async fn count_user_replays(&self, user_id: i64) -> Result<i64, AppError> {
        let table = self.table.read().await;
        Ok(table.live().filter(|r| r.user_id == user_id).count() as i64)
    }

    #[instrument(skip(self))]
    async fn list_replays_by_status(
        &self,
        status: ReplayStatus,
    ) -> Result<Vec<ReplayModel>, AppError> {
        let table = self.table.read().await;
        Ok(table.live().filter(|r| r.status == status).cloned().collect())
    }
}

const REPLAY_COLUMNS: &str = "id, user_id, file_name, original_name, file_path, file_size, match_id, \
    game_mode, game_version, duration, champion, role, queue, status, uploaded_at, processed_at, \
    created_at, updated_at, deleted_at";

fn replay_from_row(row: &PgRow) -> Result<ReplayModel, sqlx::Error> {
    let status: String = row.try_get("status")?;
    let status = status.parse::<ReplayStatus>().map_err(|e| sqlx::Error::ColumnDecode {
        index: "status".to_string(),
        source: Box::new(e),
    })?;

    Ok(ReplayModel {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        file_name: row.try_get("file_name")?,
        original_name: row.try_get("original_name")?,
        file_path: row.try_get("file_path")?,
        file_size: row.try_get("file_size")?,
        match_id: row.try_get("match_id")?,
        game_mode: row.try_get("game_mode")?,
        game_version: row.try_get("game_version")?,
        duration: row.try_get("duration")?,
        champion: row.try_get("champion")?,
        role: row.try_get("role")?,
        queue: row.try_get("queue")?,
        status,
        uploaded_at: row.try_get("uploaded_at")?,
        processed_at: row.try_get("processed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// PostgreSQL implementation of replay repository
pub struct PostgresReplayRepository {
    pool: PgPool,
}

impl PostgresReplayRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReplayRepository for PostgresReplayRepository {
    #[instrument(skip(self, replay))]
    async fn create_replay(&self, replay: &NewReplay) -> Result<ReplayModel, AppError> {
        debug!(match_id = %replay.match_id, "Creating replay in database");

        let sql = format!(
            "INSERT INTO replays (user_id, file_name, original_name, file_path, file_size, match_id, \
             game_mode, game_version, duration, champion, role, queue, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) RETURNING {REPLAY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(replay.user_id)
            .bind(&replay.file_name)
            .bind(&replay.original_name)
            .bind(&replay.file_path)
            .bind(replay.file_size)
            .bind(&replay.match_id)
            .bind(&replay.game_mode)
            .bind(&replay.game_version)
            .bind(replay.duration)
            .bind(&replay.champion)
            .bind(&replay.role)
            .bind(&replay.queue)
            .bind(ReplayStatus::Uploaded.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create replay in database");
                AppError::from(e)
            })?;

        Ok(replay_from_row(&row)?)
    }

    #[instrument(skip(self))]
    async fn get_replay(&self, replay_id: i64) -> Result<Option<ReplayModel>, AppError> {
        debug!(replay_id, "Fetching replay from database");

        let sql =
            format!("SELECT {REPLAY_COLUMNS} FROM replays WHERE id = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql)
            .bind(replay_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(replay_from_row).transpose()?)
    }

    #[instrument(skip(self))]
    async fn get_replay_by_match_id(
        &self,
        match_id: &str,
    ) -> Result<Option<ReplayModel>, AppError> {
        let sql = format!(
            "SELECT {REPLAY_COLUMNS} FROM replays WHERE match_id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(replay_from_row).transpose()?)
    }

    #[instrument(skip(self, metadata))]
    async fn update_replay_metadata(
        &self,
        replay_id: i64,
        metadata: &ReplayMetadata,
    ) -> Result<ReplayModel, AppError> {
        debug!(replay_id, "Updating replay metadata in database");

        let sql = format!(
            "UPDATE replays SET duration = COALESCE($2, duration), champion = COALESCE($3, champion), \
             role = COALESCE($4, role), queue = COALESCE($5, queue), \
             game_mode = COALESCE($6, game_mode), game_version = COALESCE($7, game_version), \
             updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL RETURNING {REPLAY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(replay_id)
            .bind(metadata.duration)
            .bind(&metadata.champion)
            .bind(&metadata.role)
            .bind(&metadata.queue)
            .bind(&metadata.game_mode)
            .bind(&metadata.game_version)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, replay_id, "Failed to update replay metadata in database");
                AppError::from(e)
            })?;

        match row {
            Some(row) => Ok(replay_from_row(&row)?),
            None => {
                warn!(replay_id, "Replay not found for update");
                Err(AppError::NotFound("Replay not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn update_replay_status(
        &self,
        replay_id: i64,
        status: ReplayStatus,
        processed_at: Option<DateTime<Utc>>,
    ) -> Result<(), AppError> {
        debug!(replay_id, status = %status, "Updating replay status in database");

        let result = sqlx::query(
            "UPDATE replays SET status = $2, processed_at = $3, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(replay_id)
        .bind(status.to_string())
        .bind(processed_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, replay_id, "Failed to update replay status in database");
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            warn!(replay_id, "Replay not found for status update");
            return Err(AppError::NotFound("Replay not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_replay(&self, replay_id: i64) -> Result<(), AppError> {
        debug!(replay_id, "Soft deleting replay in database");

        let result = sqlx::query(
            "UPDATE replays SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(replay_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(replay_id, "Replay not found for deletion");
            return Err(AppError::NotFound("Replay not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_user_replays(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<ReplayModel>, AppError> {
        let sql = format!(
            "SELECT {REPLAY_COLUMNS} FROM replays WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC OFFSET $2 LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(replay_from_row).collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self))]
    async fn count_user_replays(&self, user_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM replays WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn list_replays_by_status(
        &self,
        status: ReplayStatus,
    ) -> Result<Vec<ReplayModel>, AppError> {
        let sql = format!(
            "SELECT {REPLAY_COLUMNS} FROM replays WHERE status = $1 AND deleted_at IS NULL ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(status.to_string())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(replay_from_row).collect::<Result<_, _>>()?)
    }
}

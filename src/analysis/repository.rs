use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{AnalysisModel, NewAnalysis};
use crate::rank::LetterRank;
use crate::shared::AppError;

/// Trait for analysis repository operations.
///
/// `replay_id` is unique across every stored row; a second insert for the same
/// replay fails with `AppError::Duplicate`.
#[async_trait]
pub trait AnalysisRepository: Send + Sync {
    async fn create_analysis(&self, analysis: &NewAnalysis) -> Result<AnalysisModel, AppError>;
    async fn get_analysis(&self, analysis_id: i64) -> Result<Option<AnalysisModel>, AppError>;
    async fn get_analysis_by_replay(
        &self,
        replay_id: i64,
    ) -> Result<Option<AnalysisModel>, AppError>;

    /// Newest first
    async fn list_user_analyses(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<AnalysisModel>, AppError>;
    async fn count_user_analyses(&self, user_id: i64) -> Result<i64, AppError>;

    /// Every live analysis of a user, used for ranking aggregation
    async fn all_user_analyses(&self, user_id: i64) -> Result<Vec<AnalysisModel>, AppError>;
}

#[derive(Default)]
struct AnalysisTable {
    rows: BTreeMap<i64, AnalysisModel>,
    next_id: i64,
}

impl AnalysisTable {
    fn live(&self) -> impl Iterator<Item = &AnalysisModel> {
        self.rows.values().filter(|a| a.deleted_at.is_none())
    }

    fn for_user(&self, user_id: i64) -> Vec<AnalysisModel> {
        let mut analyses: Vec<AnalysisModel> = self
            .live()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        analyses.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        analyses
    }
}

/// In-memory implementation of AnalysisRepository for development and testing
#[derive(Default)]
pub struct InMemoryAnalysisRepository {
    table: RwLock<AnalysisTable>,
}

impl InMemoryAnalysisRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisRepository for InMemoryAnalysisRepository {
    #[instrument(skip(self, analysis))]
    async fn create_analysis(&self, analysis: &NewAnalysis) -> Result<AnalysisModel, AppError> {
        debug!(replay_id = analysis.replay_id, "Creating analysis in memory");

        // Check and insert under one write lock so concurrent pipelines cannot both win
        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|existing| existing.replay_id == analysis.replay_id)
        {
            warn!(
                replay_id = analysis.replay_id,
                "Analysis already exists for replay"
            );
            return Err(AppError::Duplicate(
                "Analysis for this replay already exists".to_string(),
            ));
        }

        let id = table.next_id.max(1);
        table.next_id = id + 1;
        let model = analysis.clone().into_model(id);
        table.rows.insert(id, model.clone());

        debug!(analysis_id = id, "Analysis created successfully in memory");
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_analysis(&self, analysis_id: i64) -> Result<Option<AnalysisModel>, AppError> {
        let table = self.table.read().await;
        let analysis = table.live().find(|a| a.id == analysis_id).cloned();
        Ok(analysis)
    }

    #[instrument(skip(self))]
    async fn get_analysis_by_replay(
        &self,
        replay_id: i64,
    ) -> Result<Option<AnalysisModel>, AppError> {
        let table = self.table.read().await;
        let analysis = table.live().find(|a| a.replay_id == replay_id).cloned();
        Ok(analysis)
    }

    #[instrument(skip(self))]
    async fn list_user_analyses(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<AnalysisModel>, AppError> {
        let table = self.table.read().await;
        Ok(table
            .for_user(user_id)
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    #[instrument(skip(self))]
    async fn count_user_analyses(&self, user_id: i64) -> Result<i64, AppError> {
        let table = self.table.read().await;
        Ok(table.live().filter(|a| a.user_id == user_id).count() as i64)
    }

    #[instrument(skip(self))]
    async fn all_user_analyses(&self, user_id: i64) -> Result<Vec<AnalysisModel>, AppError> {
        let table = self.table.read().await;
        Ok(table.for_user(user_id))
    }
}

const ANALYSIS_COLUMNS: &str = "id, user_id, replay_id, ward_score, rank, wards_placed, \
    wards_destroyed, vision_score, control_wards_placed, wards_per_minute, vision_control_ratio, \
    game_stats, insights, suggestions, heatmap_data, created_at, updated_at, deleted_at";

fn analysis_from_row(row: &PgRow) -> Result<AnalysisModel, sqlx::Error> {
    let rank: String = row.try_get("rank")?;
    let rank = rank
        .parse::<LetterRank>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "rank".to_string(),
            source: Box::new(e),
        })?;

    Ok(AnalysisModel {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        replay_id: row.try_get("replay_id")?,
        ward_score: row.try_get("ward_score")?,
        rank,
        wards_placed: row.try_get("wards_placed")?,
        wards_destroyed: row.try_get("wards_destroyed")?,
        vision_score: row.try_get("vision_score")?,
        control_wards_placed: row.try_get("control_wards_placed")?,
        wards_per_minute: row.try_get("wards_per_minute")?,
        vision_control_ratio: row.try_get("vision_control_ratio")?,
        game_stats: row.try_get("game_stats")?,
        insights: row.try_get("insights")?,
        suggestions: row.try_get("suggestions")?,
        heatmap_data: row.try_get("heatmap_data")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// PostgreSQL implementation of analysis repository
pub struct PostgresAnalysisRepository {
    pool: PgPool,
}

impl PostgresAnalysisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AnalysisRepository for PostgresAnalysisRepository {
    #[instrument(skip(self, analysis))]
    async fn create_analysis(&self, analysis: &NewAnalysis) -> Result<AnalysisModel, AppError> {
        debug!(replay_id = analysis.replay_id, "Creating analysis in database");

        let sql = format!(
            "INSERT INTO analyses (user_id, replay_id, ward_score, rank, wards_placed, \
             wards_destroyed, vision_score, control_wards_placed, wards_per_minute, \
             vision_control_ratio, game_stats, insights, suggestions, heatmap_data) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14) \
             RETURNING {ANALYSIS_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(analysis.user_id)
            .bind(analysis.replay_id)
            .bind(analysis.ward_score)
            .bind(analysis.rank.to_string())
            .bind(analysis.wards_placed)
            .bind(analysis.wards_destroyed)
            .bind(analysis.vision_score)
            .bind(analysis.control_wards_placed)
            .bind(analysis.wards_per_minute)
            .bind(analysis.vision_control_ratio)
            .bind(&analysis.game_stats)
            .bind(&analysis.insights)
            .bind(&analysis.suggestions)
            .bind(&analysis.heatmap_data)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, replay_id = analysis.replay_id, "Failed to create analysis");
                AppError::from(e)
            })?;

        Ok(analysis_from_row(&row)?)
    }

    #[instrument(skip(self))]
    async fn get_analysis(&self, analysis_id: i64) -> Result<Option<AnalysisModel>, AppError> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(analysis_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(analysis_from_row).transpose()?)
    }

    #[instrument(skip(self))]
    async fn get_analysis_by_replay(
        &self,
        replay_id: i64,
    ) -> Result<Option<AnalysisModel>, AppError> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE replay_id = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(replay_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(analysis_from_row).transpose()?)
    }

    #[instrument(skip(self))]
    async fn list_user_analyses(
        &self,
        user_id: i64,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<AnalysisModel>, AppError> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC OFFSET $2 LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(analysis_from_row).collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self))]
    async fn count_user_analyses(&self, user_id: i64) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM analyses WHERE user_id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    #[instrument(skip(self))]
    async fn all_user_analyses(&self, user_id: i64) -> Result<Vec<AnalysisModel>, AppError> {
        let sql = format!(
            "SELECT {ANALYSIS_COLUMNS} FROM analyses WHERE user_id = $1 AND deleted_at IS NULL \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(analysis_from_row).collect::<Result<_, _>>()?)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    pub fn new_analysis(user_id: i64, replay_id: i64, ward_score: f64) -> NewAnalysis {
        NewAnalysis {
            user_id,
            replay_id,
            ward_score,
            rank: crate::rank::letter_rank(ward_score),
            wards_placed: 20,
            wards_destroyed: 5,
            vision_score: 45,
            control_wards_placed: 6,
            wards_per_minute: 0.8,
            vision_control_ratio: 0.25,
            game_stats: None,
            insights: None,
            suggestions: None,
            heatmap_data: None,
        }
    }

    #[tokio::test]
    async fn test_second_analysis_for_replay_is_duplicate() {
        let repo = InMemoryAnalysisRepository::new();
        repo.create_analysis(&new_analysis(1, 7, 80.0)).await.unwrap();

        let result = repo.create_analysis(&new_analysis(1, 7, 90.0)).await;
        assert!(matches!(result, Err(AppError::Duplicate(_))));
        assert_eq!(repo.count_user_analyses(1).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_replay() {
        let repo = InMemoryAnalysisRepository::new();
        let created = repo.create_analysis(&new_analysis(1, 7, 80.0)).await.unwrap();

        let found = repo.get_analysis_by_replay(7).await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert!(repo.get_analysis_by_replay(8).await.unwrap().is_none());
        assert_eq!(repo.get_analysis(created.id).await.unwrap(), Some(created));
    }

    #[tokio::test]
    async fn test_user_listing_is_scoped_and_paged() {
        let repo = InMemoryAnalysisRepository::new();
        for replay_id in 1..=3 {
            repo.create_analysis(&new_analysis(1, replay_id, 70.0))
                .await
                .unwrap();
        }
        repo.create_analysis(&new_analysis(2, 4, 70.0)).await.unwrap();

        let all = repo.all_user_analyses(1).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|a| a.user_id == 1));

        let page = repo.list_user_analyses(1, 2, 10).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].replay_id, 1);
    }
}

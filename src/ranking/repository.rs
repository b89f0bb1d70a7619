use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::BTreeMap;
use std::str::FromStr;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{NewRanking, RankingModel};
use crate::rank::{Division, Tier};
use crate::shared::AppError;

/// Trait for ranking repository operations.
///
/// (user_id, season) is unique across every stored row.
#[async_trait]
pub trait RankingRepository: Send + Sync {
    async fn create_ranking(&self, ranking: &NewRanking) -> Result<RankingModel, AppError>;
    async fn get_user_ranking(
        &self,
        user_id: i64,
        season: &str,
    ) -> Result<Option<RankingModel>, AppError>;

    /// Full-row update
    async fn update_ranking(&self, ranking: &RankingModel) -> Result<(), AppError>;

    /// Best first; `None` region means every region
    async fn list_rankings(
        &self,
        region: Option<&str>,
        season: &str,
        limit: i64,
    ) -> Result<Vec<RankingModel>, AppError>;

    /// Renumbers positions 1..n by ward score within one region and season
    async fn assign_positions(&self, region: &str, season: &str) -> Result<(), AppError>;
}

fn by_score_desc(a: &RankingModel, b: &RankingModel) -> std::cmp::Ordering {
    b.ward_score
        .total_cmp(&a.ward_score)
        .then(a.id.cmp(&b.id))
}

#[derive(Default)]
struct RankingTable {
    rows: BTreeMap<i64, RankingModel>,
    next_id: i64,
}

impl RankingTable {
    fn live(&self) -> impl Iterator<Item = &RankingModel> {
        self.rows.values().filter(|r| r.deleted_at.is_none())
    }
}

/// In-memory implementation of RankingRepository for development and testing
#[derive(Default)]
pub struct InMemoryRankingRepository {
    table: RwLock<RankingTable>,
}

impl InMemoryRankingRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RankingRepository for InMemoryRankingRepository {
    #[instrument(skip(self, ranking))]
    async fn create_ranking(&self, ranking: &NewRanking) -> Result<RankingModel, AppError> {
        debug!(user_id = ranking.user_id, season = %ranking.season, "Creating ranking in memory");

        let mut table = self.table.write().await;
        if table
            .rows
            .values()
            .any(|r| r.user_id == ranking.user_id && r.season == ranking.season)
        {
            warn!(user_id = ranking.user_id, "Ranking already exists for season");
            return Err(AppError::Duplicate(
                "Ranking for this user and season already exists".to_string(),
            ));
        }

        let id = table.next_id.max(1);
        table.next_id = id + 1;
        let model = ranking.clone().into_model(id);
        table.rows.insert(id, model.clone());
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_user_ranking(
        &self,
        user_id: i64,
        season: &str,
    ) -> Result<Option<RankingModel>, AppError> {
        let table = self.table.read().await;
        let ranking = table
            .live()
            .find(|r| r.user_id == user_id && r.season == season)
            .cloned();
        Ok(ranking)
    }

    #[instrument(skip(self, ranking))]
    async fn update_ranking(&self, ranking: &RankingModel) -> Result<(), AppError> {
        let mut table = self.table.write().await;
        if !table.live().any(|r| r.id == ranking.id) {
            warn!(ranking_id = ranking.id, "Ranking not found for update in memory");
            return Err(AppError::NotFound("Ranking not found".to_string()));
        }

        let mut updated = ranking.clone();
        updated.updated_at = Utc::now();
        table.rows.insert(ranking.id, updated);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_rankings(
        &self,
        region: Option<&str>,
        season: &str,
        limit: i64,
    ) -> Result<Vec<RankingModel>, AppError> {
        let table = self.table.read().await;
        let mut rankings: Vec<RankingModel> = table
            .live()
            .filter(|r| r.season == season && region.map_or(true, |region| r.region == region))
            .cloned()
            .collect();
        rankings.sort_by(by_score_desc);
        rankings.truncate(limit.max(0) as usize);
        Ok(rankings)
    }

    #[instrument(skip(self))]
    async fn assign_positions(&self, region: &str, season: &str) -> Result<(), AppError> {
        let mut table = self.table.write().await;
        let mut ordered: Vec<(i64, f64)> = table
            .live()
            .filter(|r| r.region == region && r.season == season)
            .map(|r| (r.id, r.ward_score))
            .collect();
        ordered.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        for (index, (id, _)) in ordered.into_iter().enumerate() {
            if let Some(row) = table.rows.get_mut(&id) {
                row.position = index as i32 + 1;
            }
        }
        Ok(())
    }
}

const RANKING_COLUMNS: &str = "id, user_id, ward_score, position, region, tier, division, \
    games_played, average_score, best_score, worst_score, total_wards, total_vision, season, \
    last_updated, created_at, updated_at, deleted_at";

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T, sqlx::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn ranking_from_row(row: &PgRow) -> Result<RankingModel, sqlx::Error> {
    Ok(RankingModel {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        ward_score: row.try_get("ward_score")?,
        position: row.try_get("position")?,
        region: row.try_get("region")?,
        tier: parse_column::<Tier>(row, "tier")?,
        division: parse_column::<Division>(row, "division")?,
        games_played: row.try_get("games_played")?,
        average_score: row.try_get("average_score")?,
        best_score: row.try_get("best_score")?,
        worst_score: row.try_get("worst_score")?,
        total_wards: row.try_get("total_wards")?,
        total_vision: row.try_get("total_vision")?,
        season: row.try_get("season")?,
        last_updated: row.try_get("last_updated")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// PostgreSQL implementation of ranking repository
pub struct PostgresRankingRepository {
    pool: PgPool,
}

impl PostgresRankingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RankingRepository for PostgresRankingRepository {
    #[instrument(skip(self, ranking))]
    async fn create_ranking(&self, ranking: &NewRanking) -> Result<RankingModel, AppError> {
        debug!(user_id = ranking.user_id, season = %ranking.season, "Creating ranking in database");

        let sql = format!(
            "INSERT INTO rankings (user_id, ward_score, position, region, tier, division, \
             games_played, average_score, best_score, worst_score, total_wards, total_vision, \
             season, last_updated) \
             VALUES ($1, $2, 0, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13) \
             RETURNING {RANKING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(ranking.user_id)
            .bind(ranking.ward_score)
            .bind(&ranking.region)
            .bind(ranking.tier.to_string())
            .bind(ranking.division.to_string())
            .bind(ranking.games_played)
            .bind(ranking.average_score)
            .bind(ranking.best_score)
            .bind(ranking.worst_score)
            .bind(ranking.total_wards)
            .bind(ranking.total_vision)
            .bind(&ranking.season)
            .bind(ranking.last_updated)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, user_id = ranking.user_id, "Failed to create ranking");
                AppError::from(e)
            })?;

        Ok(ranking_from_row(&row)?)
    }

    #[instrument(skip(self))]
    async fn get_user_ranking(
        &self,
        user_id: i64,
        season: &str,
    ) -> Result<Option<RankingModel>, AppError> {
        let sql = format!(
            "SELECT {RANKING_COLUMNS} FROM rankings \
             WHERE user_id = $1 AND season = $2 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(season)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(ranking_from_row).transpose()?)
    }

    #[instrument(skip(self, ranking))]
    async fn update_ranking(&self, ranking: &RankingModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE rankings SET ward_score = $2, position = $3, region = $4, tier = $5, \
             division = $6, games_played = $7, average_score = $8, best_score = $9, \
             worst_score = $10, total_wards = $11, total_vision = $12, last_updated = $13, \
             updated_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(ranking.id)
        .bind(ranking.ward_score)
        .bind(ranking.position)
        .bind(&ranking.region)
        .bind(ranking.tier.to_string())
        .bind(ranking.division.to_string())
        .bind(ranking.games_played)
        .bind(ranking.average_score)
        .bind(ranking.best_score)
        .bind(ranking.worst_score)
        .bind(ranking.total_wards)
        .bind(ranking.total_vision)
        .bind(ranking.last_updated)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(ranking_id = ranking.id, "Ranking not found for update");
            return Err(AppError::NotFound("Ranking not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_rankings(
        &self,
        region: Option<&str>,
        season: &str,
        limit: i64,
    ) -> Result<Vec<RankingModel>, AppError> {
        let sql = format!(
            "SELECT {RANKING_COLUMNS} FROM rankings \
             WHERE season = $1 AND ($2::TEXT IS NULL OR region = $2) AND deleted_at IS NULL \
             ORDER BY ward_score DESC, id LIMIT $3"
        );
        let rows = sqlx::query(&sql)
            .bind(season)
            .bind(region)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(ranking_from_row).collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self))]
    async fn assign_positions(&self, region: &str, season: &str) -> Result<(), AppError> {
        debug!(region, season, "Reassigning ranking positions");

        sqlx::query(
            "UPDATE rankings r SET position = ranked.pos \
             FROM (SELECT id, ROW_NUMBER() OVER (ORDER BY ward_score DESC, id) AS pos \
                   FROM rankings WHERE region = $1 AND season = $2 AND deleted_at IS NULL) ranked \
             WHERE r.id = ranked.id",
        )
        .bind(region)
        .bind(season)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

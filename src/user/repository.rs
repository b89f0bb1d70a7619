use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::models::{NewUser, UserModel};
use crate::shared::AppError;

/// Trait for user repository operations.
///
/// Lookups never return soft-deleted rows.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError>;
    async fn get_user(&self, user_id: i64) -> Result<Option<UserModel>, AppError>;
    async fn get_user_by_riot_id(&self, riot_id: &str) -> Result<Option<UserModel>, AppError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError>;
    async fn get_user_by_puuid(&self, puuid: &str) -> Result<Option<UserModel>, AppError>;
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError>;
    async fn delete_user(&self, user_id: i64) -> Result<(), AppError>;
    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<UserModel>, AppError>;
    async fn count_users(&self) -> Result<i64, AppError>;
}

#[derive(Default)]
struct UserTable {
    rows: BTreeMap<i64, UserModel>,
    next_id: i64,
}

impl UserTable {
    /// Unique keys are enforced across every row, tombstones included.
    fn conflict(&self, candidate: &UserModel) -> Option<&'static str> {
        self.rows
            .values()
            .filter(|existing| existing.id != candidate.id)
            .find_map(|existing| {
                if existing.riot_id == candidate.riot_id {
                    Some("riot_id")
                } else if existing.email == candidate.email {
                    Some("email")
                } else if candidate.puuid.is_some() && existing.puuid == candidate.puuid {
                    Some("puuid")
                } else {
                    None
                }
            })
    }

    fn live(&self) -> impl Iterator<Item = &UserModel> {
        self.rows.values().filter(|user| !user.is_deleted())
    }
}

/// In-memory implementation of UserRepository for development and testing
#[derive(Default)]
pub struct InMemoryUserRepository {
    table: RwLock<UserTable>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(UserTable {
                rows: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        debug!(riot_id = %user.riot_id, "Creating user in memory");

        let mut table = self.table.write().await;
        let id = table.next_id.max(1);
        let model = user.clone().into_model(id);

        if let Some(field) = table.conflict(&model) {
            warn!(riot_id = %user.riot_id, field, "User uniqueness violated in memory");
            return Err(AppError::Duplicate(format!("User with this {} already exists", field)));
        }

        table.next_id = id + 1;
        table.rows.insert(id, model.clone());

        debug!(user_id = id, "User created successfully in memory");
        Ok(model)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: i64) -> Result<Option<UserModel>, AppError> {
        debug!(user_id, "Fetching user from memory");
        let table = self.table.read().await;
        let user = table.live().find(|user| user.id == user_id).cloned();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user_by_riot_id(&self, riot_id: &str) -> Result<Option<UserModel>, AppError> {
        let table = self.table.read().await;
        let user = table.live().find(|user| user.riot_id == riot_id).cloned();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        let table = self.table.read().await;
        let user = table.live().find(|user| user.email == email).cloned();
        Ok(user)
    }

    #[instrument(skip(self))]
    async fn get_user_by_puuid(&self, puuid: &str) -> Result<Option<UserModel>, AppError> {
        let table = self.table.read().await;
        let user = table
            .live()
            .find(|user| user.puuid.as_deref() == Some(puuid))
            .cloned();
        Ok(user)
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = user.id, "Updating user in memory");

        let mut table = self.table.write().await;
        if !table.live().any(|existing| existing.id == user.id) {
            warn!(user_id = user.id, "User not found for update in memory");
            return Err(AppError::NotFound("User not found".to_string()));
        }
        if let Some(field) = table.conflict(user) {
            return Err(AppError::Duplicate(format!("User with this {} already exists", field)));
        }

        let mut updated = user.clone();
        updated.updated_at = Utc::now();
        table.rows.insert(user.id, updated);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: i64) -> Result<(), AppError> {
        debug!(user_id, "Soft deleting user in memory");

        let mut table = self.table.write().await;
        match table.rows.get_mut(&user_id) {
            Some(user) if !user.is_deleted() => {
                user.deleted_at = Some(Utc::now());
                Ok(())
            }
            _ => {
                warn!(user_id, "User not found for deletion in memory");
                Err(AppError::NotFound("User not found".to_string()))
            }
        }
    }

    #[instrument(skip(self))]
    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<UserModel>, AppError> {
        let table = self.table.read().await;
        Ok(table
            .live()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    #[instrument(skip(self))]
    async fn count_users(&self) -> Result<i64, AppError> {
        let table = self.table.read().await;
        Ok(table.live().count() as i64)
    }
}

const USER_COLUMNS: &str = "id, riot_id, game_name, tag_line, puuid, email, avatar_url, is_pro, region, created_at, updated_at, deleted_at";

fn user_from_row(row: &PgRow) -> Result<UserModel, sqlx::Error> {
    Ok(UserModel {
        id: row.try_get("id")?,
        riot_id: row.try_get("riot_id")?,
        game_name: row.try_get("game_name")?,
        tag_line: row.try_get("tag_line")?,
        puuid: row.try_get("puuid")?,
        email: row.try_get("email")?,
        avatar_url: row.try_get("avatar_url")?,
        is_pro: row.try_get("is_pro")?,
        region: row.try_get("region")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

/// PostgreSQL implementation of user repository
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_one_where(
        &self,
        column: &str,
        value: &str,
    ) -> Result<Option<UserModel>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1 AND deleted_at IS NULL"
        );
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, column, "Failed to fetch user from database");
                AppError::from(e)
            })?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    #[instrument(skip(self, user))]
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        debug!(riot_id = %user.riot_id, "Creating user in database");

        let sql = format!(
            "INSERT INTO users (riot_id, game_name, tag_line, puuid, email, avatar_url, is_pro, region) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(&user.riot_id)
            .bind(&user.game_name)
            .bind(&user.tag_line)
            .bind(&user.puuid)
            .bind(&user.email)
            .bind(&user.avatar_url)
            .bind(user.is_pro)
            .bind(&user.region)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to create user in database");
                AppError::from(e)
            })?;

        Ok(user_from_row(&row)?)
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: i64) -> Result<Option<UserModel>, AppError> {
        debug!(user_id, "Fetching user from database");

        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        let row = sqlx::query(&sql)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row).transpose()?)
    }

    async fn get_user_by_riot_id(&self, riot_id: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_where("riot_id", riot_id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_where("email", email).await
    }

    async fn get_user_by_puuid(&self, puuid: &str) -> Result<Option<UserModel>, AppError> {
        self.fetch_one_where("puuid", puuid).await
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError> {
        debug!(user_id = user.id, "Updating user in database");

        let result = sqlx::query(
            "UPDATE users SET riot_id = $2, game_name = $3, tag_line = $4, puuid = $5, email = $6, \
             avatar_url = $7, is_pro = $8, region = $9, updated_at = NOW() \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user.id)
        .bind(&user.riot_id)
        .bind(&user.game_name)
        .bind(&user.tag_line)
        .bind(&user.puuid)
        .bind(&user.email)
        .bind(&user.avatar_url)
        .bind(user.is_pro)
        .bind(&user.region)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, user_id = user.id, "Failed to update user in database");
            AppError::from(e)
        })?;

        if result.rows_affected() == 0 {
            warn!(user_id = user.id, "User not found for update");
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: i64) -> Result<(), AppError> {
        debug!(user_id, "Soft deleting user in database");

        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            warn!(user_id, "User not found for deletion");
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<UserModel>, AppError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY id OFFSET $1 LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(offset)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(user_from_row).collect::<Result<_, _>>()?)
    }

    #[instrument(skip(self))]
    async fn count_users(&self) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

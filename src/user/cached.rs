use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::{
    models::{NewUser, UserModel},
    repository::UserRepository,
};
use crate::cache::{CacheError, CacheStore};
use crate::shared::AppError;

pub fn user_cache_key(user_id: i64) -> String {
    format!("user:{}", user_id)
}

/// Read-through cache in front of a user repository.
///
/// Only single-user lookups by id are cached. Every write goes to the inner
/// repository first and then evicts the cached entry; entries are never
/// refreshed in place. Cache failures are logged and otherwise ignored.
pub struct CachedUserRepository {
    inner: Arc<dyn UserRepository>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl CachedUserRepository {
    pub fn new(inner: Arc<dyn UserRepository>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { inner, cache, ttl }
    }

    async fn read_cached(&self, key: &str) -> Option<UserModel> {
        let bytes = match self.cache.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, key = %key, "Cache read failed, falling back to store");
                return None;
            }
        };

        match serde_json::from_slice::<UserModel>(&bytes) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, key = %key, "Discarding undecodable cache entry");
                None
            }
        }
    }

    async fn populate(&self, key: &str, user: &UserModel) -> Result<(), CacheError> {
        let bytes = serde_json::to_vec(user)?;
        self.cache.set(key, bytes, self.ttl).await
    }

    async fn invalidate(&self, user_id: i64) {
        let key = user_cache_key(user_id);
        if let Err(e) = self.cache.delete(&key).await {
            warn!(error = %e, key = %key, "Failed to evict cached user");
        }
    }
}

#[async_trait]
impl UserRepository for CachedUserRepository {
    async fn create_user(&self, user: &NewUser) -> Result<UserModel, AppError> {
        self.inner.create_user(user).await
    }

    #[instrument(skip(self))]
    async fn get_user(&self, user_id: i64) -> Result<Option<UserModel>, AppError> {
        let key = user_cache_key(user_id);

        if let Some(user) = self.read_cached(&key).await {
            debug!(user_id, "User served from cache");
            return Ok(Some(user));
        }

        let user = self.inner.get_user(user_id).await?;
        if let Some(user) = &user {
            if let Err(e) = self.populate(&key, user).await {
                warn!(error = %e, user_id, "Failed to cache user");
            }
        }
        Ok(user)
    }

    async fn get_user_by_riot_id(&self, riot_id: &str) -> Result<Option<UserModel>, AppError> {
        self.inner.get_user_by_riot_id(riot_id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserModel>, AppError> {
        self.inner.get_user_by_email(email).await
    }

    async fn get_user_by_puuid(&self, puuid: &str) -> Result<Option<UserModel>, AppError> {
        self.inner.get_user_by_puuid(puuid).await
    }

    #[instrument(skip(self, user))]
    async fn update_user(&self, user: &UserModel) -> Result<(), AppError> {
        self.inner.update_user(user).await?;
        self.invalidate(user.id).await;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_user(&self, user_id: i64) -> Result<(), AppError> {
        self.inner.delete_user(user_id).await?;
        self.invalidate(user_id).await;
        Ok(())
    }

    async fn list_users(&self, offset: i64, limit: i64) -> Result<Vec<UserModel>, AppError> {
        self.inner.list_users(offset, limit).await
    }

    async fn count_users(&self) -> Result<i64, AppError> {
        self.inner.count_users().await
    }
}

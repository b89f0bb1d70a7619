use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    models::{riot_id_for, NewUser, UserModel},
    repository::UserRepository,
    types::{CreateUserRequest, UpdateUserRequest, UserWithReplays},
};
use crate::replay::repository::ReplayRepository;
use crate::shared::{AppError, PageMeta, PageRequest, Paginated};

/// Service for handling user business logic
pub struct UserService {
    repository: Arc<dyn UserRepository>,
    replays: Arc<dyn ReplayRepository>,
    default_region: String,
}

fn require(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    Ok(())
}

impl UserService {
    pub fn new(
        repository: Arc<dyn UserRepository>,
        replays: Arc<dyn ReplayRepository>,
        default_region: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            replays,
            default_region: default_region.into(),
        }
    }

    /// Registers a user after checking every unique key
    #[instrument(skip(self, request))]
    pub async fn create_user(&self, request: CreateUserRequest) -> Result<UserModel, AppError> {
        require("game_name", &request.game_name)?;
        require("tag_line", &request.tag_line)?;
        require("email", &request.email)?;

        let riot_id = request
            .riot_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| riot_id_for(&request.game_name, &request.tag_line));
        let puuid = request.puuid.filter(|p| !p.trim().is_empty());
        let region = request
            .region
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| self.default_region.clone());

        if self.repository.get_user_by_riot_id(&riot_id).await?.is_some() {
            warn!(riot_id = %riot_id, "Rejecting user with duplicate riot id");
            return Err(AppError::Duplicate(
                "User with this riot_id already exists".to_string(),
            ));
        }
        if self
            .repository
            .get_user_by_email(&request.email)
            .await?
            .is_some()
        {
            warn!(riot_id = %riot_id, "Rejecting user with duplicate email");
            return Err(AppError::Duplicate(
                "User with this email already exists".to_string(),
            ));
        }
        if let Some(puuid) = &puuid {
            if self.repository.get_user_by_puuid(puuid).await?.is_some() {
                return Err(AppError::Duplicate(
                    "User with this puuid already exists".to_string(),
                ));
            }
        }

        let new_user = NewUser {
            riot_id,
            game_name: request.game_name,
            tag_line: request.tag_line,
            puuid,
            email: request.email,
            avatar_url: request.avatar_url,
            is_pro: request.is_pro,
            region,
        };
        let user = self.repository.create_user(&new_user).await?;

        info!(user_id = user.id, riot_id = %user.riot_id, "User created");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, user_id: i64) -> Result<UserModel, AppError> {
        self.repository
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    #[instrument(skip(self))]
    pub async fn get_user_by_riot_id(&self, riot_id: &str) -> Result<UserModel, AppError> {
        self.repository
            .get_user_by_riot_id(riot_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", riot_id)))
    }

    #[instrument(skip(self))]
    pub async fn list_users(&self, page: PageRequest) -> Result<Paginated<UserModel>, AppError> {
        let (_, limit) = page.normalized();
        let total = self.repository.count_users().await?;
        let data = self.repository.list_users(page.offset(), limit).await?;

        Ok(Paginated {
            data,
            meta: PageMeta::new(page, total),
        })
    }

    #[instrument(skip(self))]
    pub async fn get_user_with_replays(&self, user_id: i64) -> Result<UserWithReplays, AppError> {
        let user = self.get_user(user_id).await?;
        let total = self.replays.count_user_replays(user_id).await?;
        let replays = self.replays.list_user_replays(user_id, 0, total).await?;
        Ok(UserWithReplays { user, replays })
    }

    /// Applies a partial profile update; the cache entry is evicted by the repository
    #[instrument(skip(self, request))]
    pub async fn update_user(
        &self,
        user_id: i64,
        request: UpdateUserRequest,
    ) -> Result<UserModel, AppError> {
        let mut user = self.get_user(user_id).await?;
        let renamed = request.game_name.is_some() || request.tag_line.is_some();

        if let Some(game_name) = request.game_name {
            require("game_name", &game_name)?;
            user.game_name = game_name;
        }
        if let Some(tag_line) = request.tag_line {
            require("tag_line", &tag_line)?;
            user.tag_line = tag_line;
        }
        // An explicit riot_id given at registration survives unrelated edits
        if renamed {
            user.riot_id = riot_id_for(&user.game_name, &user.tag_line);
        }

        if let Some(puuid) = request.puuid {
            user.puuid = Some(puuid).filter(|p| !p.trim().is_empty());
        }
        if let Some(avatar_url) = request.avatar_url {
            user.avatar_url = Some(avatar_url);
        }
        if let Some(is_pro) = request.is_pro {
            user.is_pro = is_pro;
        }
        if let Some(region) = request.region.filter(|r| !r.trim().is_empty()) {
            user.region = region;
        }

        self.repository.update_user(&user).await?;

        info!(user_id, "User updated");
        self.get_user(user_id).await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: i64) -> Result<(), AppError> {
        self.repository.delete_user(user_id).await?;
        info!(user_id, "User deleted");
        Ok(())
    }
}

use std::sync::Arc;

use openmusic_db::entities::user;
use openmusic_db::new_id;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;

use crate::auth::password::{hash_password, verify_password};
use crate::error::{ApiError, ApiResult};
use crate::validator::{Credentials, NewUser};

const USERNAME_TAKEN: &str = "Username already taken";
const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub fullname: String,
}

#[derive(Debug, Clone)]
pub struct UsersService {
    db: Arc<DatabaseConnection>,
}

impl UsersService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn add_user(&self, new_user: NewUser) -> ApiResult<String> {
        self.verify_new_username(&new_user.username).await?;

        let hash = hash_password(&new_user.password)
            .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;
        let id = new_id("user");

        let model = user::ActiveModel {
            id: Set(id.clone()),
            username: Set(new_user.username),
            password: Set(hash),
            fullname: Set(new_user.fullname),
        };

        let inserted = user::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| ApiError::on_unique_violation(e, USERNAME_TAKEN))?;
        if inserted == 0 {
            return Err(ApiError::Invariant("User could not be added".to_string()));
        }

        tracing::info!(user_id = %id, "user registered");
        Ok(id)
    }

    async fn verify_new_username(&self, username: &str) -> ApiResult<()> {
        let existing = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .count(self.db.as_ref())
            .await?;
        if existing > 0 {
            return Err(ApiError::Invariant(USERNAME_TAKEN.to_string()));
        }
        Ok(())
    }

    pub async fn get_user_by_id(&self, id: &str) -> ApiResult<UserProfile> {
        user::Entity::find_by_id(id)
            .select_only()
            .column(user::Column::Id)
            .column(user::Column::Username)
            .column(user::Column::Fullname)
            .into_model::<UserProfile>()
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".to_string()))
    }

    /// Users whose username starts with `prefix`, ordered by username.
    pub async fn get_users_by_username(&self, prefix: &str) -> ApiResult<Vec<UserProfile>> {
        let users = user::Entity::find()
            .select_only()
            .column(user::Column::Id)
            .column(user::Column::Username)
            .column(user::Column::Fullname)
            .filter(user::Column::Username.starts_with(prefix))
            .order_by_asc(user::Column::Username)
            .into_model::<UserProfile>()
            .all(self.db.as_ref())
            .await?;
        Ok(users)
    }

    pub async fn verify_user_exists(&self, id: &str) -> ApiResult<()> {
        let count = user::Entity::find_by_id(id).count(self.db.as_ref()).await?;
        if count == 0 {
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        Ok(())
    }

    /// Check a username/password pair and return the user id.
    pub async fn verify_user_credential(&self, credentials: &Credentials) -> ApiResult<String> {
        let found = user::Entity::find()
            .filter(user::Column::Username.eq(credentials.username.as_str()))
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ApiError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        let matches = verify_password(&credentials.password, &found.password)
            .map_err(|e| ApiError::Internal(format!("stored password hash unreadable: {e}")))?;
        if !matches {
            tracing::debug!(username = %credentials.username, "password mismatch");
            return Err(ApiError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        Ok(found.id)
    }
}

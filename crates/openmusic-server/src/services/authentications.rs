use std::sync::Arc;

use openmusic_db::entities::authentication;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};

use crate::error::{ApiError, ApiResult};

/// Whitelist of refresh tokens that may still be exchanged for access tokens.
#[derive(Debug, Clone)]
pub struct AuthenticationsService {
    db: Arc<DatabaseConnection>,
}

impl AuthenticationsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn add_refresh_token(&self, token: &str) -> ApiResult<()> {
        let model = authentication::ActiveModel {
            token: Set(token.to_string()),
        };
        authentication::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await?;
        Ok(())
    }

    pub async fn verify_refresh_token(&self, token: &str) -> ApiResult<()> {
        let count = authentication::Entity::find_by_id(token)
            .count(self.db.as_ref())
            .await?;
        if count == 0 {
            return Err(ApiError::Invariant("invalid refresh token".to_string()));
        }
        Ok(())
    }

    pub async fn delete_refresh_token(&self, token: &str) -> ApiResult<()> {
        authentication::Entity::delete_by_id(token)
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}

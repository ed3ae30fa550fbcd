use std::sync::Arc;

use openmusic_db::entities::collaboration;
use openmusic_db::new_id;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Set};

use crate::error::{ApiError, ApiResult};

#[derive(Debug, Clone)]
pub struct CollaborationsService {
    db: Arc<DatabaseConnection>,
}

impl CollaborationsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn add_collaboration(&self, playlist_id: &str, user_id: &str) -> ApiResult<String> {
        let id = new_id("collab");
        let model = collaboration::ActiveModel {
            id: Set(id.clone()),
            playlist_id: Set(playlist_id.to_string()),
            user_id: Set(user_id.to_string()),
        };

        let inserted = collaboration::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    collaboration::Column::PlaylistId,
                    collaboration::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;
        if inserted == 0 {
            return Err(ApiError::Invariant(
                "Collaboration could not be added".to_string(),
            ));
        }
        Ok(id)
    }

    pub async fn delete_collaboration(&self, playlist_id: &str, user_id: &str) -> ApiResult<()> {
        let result = collaboration::Entity::delete_many()
            .filter(collaboration::Column::PlaylistId.eq(playlist_id))
            .filter(collaboration::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await?;
        if result.rows_affected == 0 {
            return Err(ApiError::Invariant(
                "Collaboration could not be deleted".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn verify_collaborator(&self, playlist_id: &str, user_id: &str) -> ApiResult<()> {
        let count = collaboration::Entity::find()
            .filter(collaboration::Column::PlaylistId.eq(playlist_id))
            .filter(collaboration::Column::UserId.eq(user_id))
            .count(self.db.as_ref())
            .await?;
        if count == 0 {
            return Err(ApiError::Invariant(
                "Collaboration not verified".to_string(),
            ));
        }
        Ok(())
    }
}

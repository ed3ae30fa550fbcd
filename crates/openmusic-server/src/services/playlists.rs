use std::sync::Arc;

use openmusic_db::entities::playlist_song_activity::{self, ActivityAction};
use openmusic_db::entities::{collaboration, playlist, playlist_song, song, user};
use openmusic_db::new_id;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
    TransactionTrait,
};
use serde::Serialize;

use super::collaborations::CollaborationsService;
use super::songs::SongSummary;
use crate::error::{ApiError, ApiResult};

const PLAYLIST_NOT_FOUND: &str = "Playlist not found";

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct PlaylistSummary {
    pub id: String,
    pub name: String,
    /// Owner's username
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaylistSongs {
    pub id: String,
    pub name: String,
    pub username: String,
    pub songs: Vec<SongSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct ActivityEntry {
    pub username: String,
    pub title: String,
    pub action: ActivityAction,
    pub time: DateTimeWithTimeZone,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistActivities {
    pub playlist_id: String,
    pub activities: Vec<ActivityEntry>,
}

#[derive(Clone)]
pub struct PlaylistsService {
    db: Arc<DatabaseConnection>,
    collaborations: CollaborationsService,
}

impl PlaylistsService {
    pub fn new(db: Arc<DatabaseConnection>, collaborations: CollaborationsService) -> Self {
        Self { db, collaborations }
    }

    pub async fn add_playlist(&self, name: &str, owner: &str) -> ApiResult<String> {
        let id = new_id("playlist");
        let model = playlist::ActiveModel {
            id: Set(id.clone()),
            name: Set(name.to_string()),
            owner: Set(owner.to_string()),
        };

        let inserted = playlist::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await?;
        if inserted == 0 {
            return Err(ApiError::Invariant("Playlist could not be added".to_string()));
        }
        Ok(id)
    }

    /// Playlists the user owns or collaborates on, each listed once.
    pub async fn get_playlists(&self, user_id: &str) -> ApiResult<Vec<PlaylistSummary>> {
        let playlists = playlist::Entity::find()
            .select_only()
            .column(playlist::Column::Id)
            .column(playlist::Column::Name)
            .column_as(user::Column::Username, "username")
            .join(JoinType::InnerJoin, playlist::Relation::Owner.def())
            .join(JoinType::LeftJoin, playlist::Relation::Collaboration.def())
            .filter(
                Condition::any()
                    .add(playlist::Column::Owner.eq(user_id))
                    .add(collaboration::Column::UserId.eq(user_id)),
            )
            .distinct()
            .order_by_asc(playlist::Column::Name)
            .into_model::<PlaylistSummary>()
            .all(self.db.as_ref())
            .await?;
        Ok(playlists)
    }

    pub async fn verify_playlist_owner(&self, id: &str, user_id: &str) -> ApiResult<()> {
        let found = playlist::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ApiError::NotFound(PLAYLIST_NOT_FOUND.to_string()))?;

        if found.owner != user_id {
            return Err(ApiError::Authorization(
                "You are not allowed to access this resource".to_string(),
            ));
        }
        Ok(())
    }

    /// Owner or listed collaborator. A missing playlist stays NotFound; a
    /// non-collaborator gets the owner check's Authorization error.
    pub async fn verify_playlist_access(&self, id: &str, user_id: &str) -> ApiResult<()> {
        match self.verify_playlist_owner(id, user_id).await {
            Ok(()) => Ok(()),
            Err(ApiError::Authorization(message)) => {
                match self.collaborations.verify_collaborator(id, user_id).await {
                    Ok(()) => Ok(()),
                    Err(ApiError::Invariant(_)) => Err(ApiError::Authorization(message)),
                    Err(other) => Err(other),
                }
            }
            Err(other) => Err(other),
        }
    }

    pub async fn delete_playlist_by_id(&self, id: &str) -> ApiResult<()> {
        let result = playlist::Entity::delete_by_id(id).exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound(PLAYLIST_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    /// Add a song and record the `add` activity in one transaction.
    pub async fn add_song_with_activity(
        &self,
        playlist_id: &str,
        song_id: &str,
        user_id: &str,
    ) -> ApiResult<String> {
        let txn = self.db.begin().await?;
        let id = add_song_to_playlist(&txn, song_id, playlist_id).await?;
        add_activity(&txn, playlist_id, song_id, user_id, ActivityAction::Add).await?;
        txn.commit().await?;
        Ok(id)
    }

    /// Remove a song and record the `delete` activity in one transaction.
    pub async fn delete_song_with_activity(
        &self,
        playlist_id: &str,
        song_id: &str,
        user_id: &str,
    ) -> ApiResult<()> {
        let txn = self.db.begin().await?;
        delete_song_from_playlist(&txn, playlist_id, song_id).await?;
        add_activity(&txn, playlist_id, song_id, user_id, ActivityAction::Delete).await?;
        txn.commit().await?;
        Ok(())
    }

    pub async fn get_playlist_songs(&self, id: &str) -> ApiResult<PlaylistSongs> {
        let header = playlist::Entity::find_by_id(id)
            .select_only()
            .column(playlist::Column::Id)
            .column(playlist::Column::Name)
            .column_as(user::Column::Username, "username")
            .join(JoinType::InnerJoin, playlist::Relation::Owner.def())
            .into_model::<PlaylistSummary>()
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ApiError::NotFound(PLAYLIST_NOT_FOUND.to_string()))?;

        let songs = song::Entity::find()
            .select_only()
            .column(song::Column::Id)
            .column(song::Column::Title)
            .column(song::Column::Performer)
            .join(JoinType::InnerJoin, song::Relation::PlaylistSong.def())
            .filter(playlist_song::Column::PlaylistId.eq(id))
            .into_model::<SongSummary>()
            .all(self.db.as_ref())
            .await?;

        Ok(PlaylistSongs {
            id: header.id,
            name: header.name,
            username: header.username,
            songs,
        })
    }

    /// Activity log of a playlist, oldest first.
    pub async fn get_activities(&self, id: &str) -> ApiResult<PlaylistActivities> {
        let activities = playlist_song_activity::Entity::find()
            .select_only()
            .column_as(user::Column::Username, "username")
            .column_as(song::Column::Title, "title")
            .column(playlist_song_activity::Column::Action)
            .column(playlist_song_activity::Column::Time)
            .join(
                JoinType::InnerJoin,
                playlist_song_activity::Relation::User.def(),
            )
            .join(
                JoinType::InnerJoin,
                playlist_song_activity::Relation::Song.def(),
            )
            .filter(playlist_song_activity::Column::PlaylistId.eq(id))
            .order_by_asc(playlist_song_activity::Column::Time)
            .into_model::<ActivityEntry>()
            .all(self.db.as_ref())
            .await?;

        Ok(PlaylistActivities {
            playlist_id: id.to_string(),
            activities,
        })
    }
}

async fn add_song_to_playlist<C: ConnectionTrait>(
    conn: &C,
    song_id: &str,
    playlist_id: &str,
) -> ApiResult<String> {
    if song::Entity::find_by_id(song_id).count(conn).await? == 0 {
        return Err(ApiError::NotFound("Song not found".to_string()));
    }

    let id = new_id("ps");
    let model = playlist_song::ActiveModel {
        id: Set(id.clone()),
        playlist_id: Set(playlist_id.to_string()),
        song_id: Set(song_id.to_string()),
    };

    let inserted = playlist_song::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([
                playlist_song::Column::PlaylistId,
                playlist_song::Column::SongId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    if inserted == 0 {
        return Err(ApiError::Invariant(
            "Song could not be added to playlist".to_string(),
        ));
    }
    Ok(id)
}

async fn delete_song_from_playlist<C: ConnectionTrait>(
    conn: &C,
    playlist_id: &str,
    song_id: &str,
) -> ApiResult<()> {
    let result = playlist_song::Entity::delete_many()
        .filter(playlist_song::Column::PlaylistId.eq(playlist_id))
        .filter(playlist_song::Column::SongId.eq(song_id))
        .exec(conn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::NotFound("Song is not in this playlist".to_string()));
    }
    Ok(())
}

async fn add_activity<C: ConnectionTrait>(
    conn: &C,
    playlist_id: &str,
    song_id: &str,
    user_id: &str,
    action: ActivityAction,
) -> ApiResult<String> {
    let id = new_id("activity");
    let model = playlist_song_activity::ActiveModel {
        id: Set(id.clone()),
        playlist_id: Set(playlist_id.to_string()),
        song_id: Set(song_id.to_string()),
        user_id: Set(user_id.to_string()),
        action: Set(action.clone()),
        time: Set(chrono::Utc::now().fixed_offset()),
    };

    let inserted = playlist_song_activity::Entity::insert(model)
        .exec_without_returning(conn)
        .await?;
    if inserted == 0 {
        return Err(ApiError::Invariant(
            "Activity could not be recorded".to_string(),
        ));
    }
    tracing::debug!(%playlist_id, %song_id, %user_id, %action, "playlist activity recorded");
    Ok(id)
}

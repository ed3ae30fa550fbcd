use std::sync::Arc;
use std::time::Duration;

use openmusic_db::cache::CacheStore;
use openmusic_db::entities::{album, song, user_album_like};
use openmusic_db::new_id;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde::Serialize;

use super::songs::SongSummary;
use crate::error::{ApiError, ApiResult};
use crate::validator::NewAlbum;

const ALBUM_NOT_FOUND: &str = "Album not found";

/// Upper bound on how long a cached like count can outlive a missed
/// invalidation.
pub const LIKES_CACHE_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct AlbumSummary {
    pub id: String,
    pub name: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumDetail {
    pub id: String,
    pub name: String,
    pub year: i32,
    pub cover_url: Option<String>,
    pub songs: Vec<SongSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlbumLikes {
    pub likes: u64,
    /// Whether the count was served from the cache.
    pub cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeToggle {
    Liked,
    Unliked,
}

pub fn likes_cache_key(album_id: &str) -> String {
    format!("album-likes:{album_id}")
}

#[derive(Clone)]
pub struct AlbumsService {
    db: Arc<DatabaseConnection>,
    cache: Arc<dyn CacheStore>,
}

impl AlbumsService {
    pub fn new(db: Arc<DatabaseConnection>, cache: Arc<dyn CacheStore>) -> Self {
        Self { db, cache }
    }

    pub async fn add_album(&self, new_album: NewAlbum) -> ApiResult<String> {
        let now = chrono::Utc::now().fixed_offset();
        let id = new_id("album");

        let model = album::ActiveModel {
            id: Set(id.clone()),
            name: Set(new_album.name),
            year: Set(new_album.year),
            cover: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = album::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await?;
        if inserted == 0 {
            return Err(ApiError::Invariant("Album could not be added".to_string()));
        }
        Ok(id)
    }

    pub async fn get_albums(&self) -> ApiResult<Vec<AlbumSummary>> {
        let albums = album::Entity::find()
            .select_only()
            .column(album::Column::Id)
            .column(album::Column::Name)
            .column(album::Column::Year)
            .order_by_asc(album::Column::CreatedAt)
            .into_model::<AlbumSummary>()
            .all(self.db.as_ref())
            .await?;
        Ok(albums)
    }

    pub async fn get_album_by_id(&self, id: &str) -> ApiResult<AlbumDetail> {
        let found = album::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .ok_or_else(|| ApiError::NotFound(ALBUM_NOT_FOUND.to_string()))?;

        let songs = song::Entity::find()
            .select_only()
            .column(song::Column::Id)
            .column(song::Column::Title)
            .column(song::Column::Performer)
            .filter(song::Column::AlbumId.eq(id))
            .into_model::<SongSummary>()
            .all(self.db.as_ref())
            .await?;

        Ok(AlbumDetail {
            id: found.id,
            name: found.name,
            year: found.year,
            cover_url: found.cover,
            songs,
        })
    }

    pub async fn verify_album_exists(&self, id: &str) -> ApiResult<()> {
        if album::Entity::find_by_id(id).count(self.db.as_ref()).await? == 0 {
            return Err(ApiError::NotFound(ALBUM_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    pub async fn edit_album_by_id(&self, id: &str, album: NewAlbum) -> ApiResult<()> {
        let result = album::Entity::update_many()
            .col_expr(album::Column::Name, Expr::value(album.name))
            .col_expr(album::Column::Year, Expr::value(album.year))
            .col_expr(
                album::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().fixed_offset()),
            )
            .filter(album::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(ApiError::NotFound(ALBUM_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    pub async fn delete_album_by_id(&self, id: &str) -> ApiResult<()> {
        let result = album::Entity::delete_by_id(id).exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound(ALBUM_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    pub async fn edit_album_cover_by_id(&self, id: &str, url: &str) -> ApiResult<()> {
        let result = album::Entity::update_many()
            .col_expr(album::Column::Cover, Expr::value(url))
            .col_expr(
                album::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().fixed_offset()),
            )
            .filter(album::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await?;

        if result.rows_affected == 0 {
            return Err(ApiError::NotFound(ALBUM_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    /// Flip the like state of `(user_id, album_id)`.
    ///
    /// The existing row is deleted first; only when nothing was deleted is a
    /// new row inserted. The unique `(user_id, album_id)` index turns a racing
    /// duplicate insert into a no-op, so the pair never holds two likes.
    pub async fn toggle_album_like(&self, album_id: &str, user_id: &str) -> ApiResult<LikeToggle> {
        let deleted = user_album_like::Entity::delete_many()
            .filter(user_album_like::Column::UserId.eq(user_id))
            .filter(user_album_like::Column::AlbumId.eq(album_id))
            .exec(self.db.as_ref())
            .await?
            .rows_affected;

        let outcome = if deleted > 0 {
            LikeToggle::Unliked
        } else {
            let like = user_album_like::ActiveModel {
                id: Set(new_id("like")),
                user_id: Set(user_id.to_string()),
                album_id: Set(album_id.to_string()),
            };
            let inserted = user_album_like::Entity::insert(like)
                .on_conflict(
                    OnConflict::columns([
                        user_album_like::Column::UserId,
                        user_album_like::Column::AlbumId,
                    ])
                    .do_nothing()
                    .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await?;
            if inserted == 0 {
                tracing::debug!(%album_id, %user_id, "concurrent like already recorded");
            }
            LikeToggle::Liked
        };

        self.invalidate_likes(album_id).await;
        Ok(outcome)
    }

    async fn invalidate_likes(&self, album_id: &str) {
        if let Err(e) = self.cache.delete(&likes_cache_key(album_id)).await {
            tracing::warn!(%album_id, error = %e, "failed to invalidate cached like count");
        }
    }

    /// Like count for an album, read through the cache.
    pub async fn get_album_likes(&self, album_id: &str) -> ApiResult<AlbumLikes> {
        let key = likes_cache_key(album_id);

        match self.cache.get(&key).await {
            Ok(Some(value)) => match value.parse::<u64>() {
                Ok(likes) => return Ok(AlbumLikes { likes, cache: true }),
                Err(_) => tracing::warn!(%key, %value, "ignoring unparsable cached like count"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(%key, error = %e, "cache lookup failed, counting likes"),
        }

        let likes = user_album_like::Entity::find()
            .filter(user_album_like::Column::AlbumId.eq(album_id))
            .count(self.db.as_ref())
            .await?;

        if let Err(e) = self.cache.set(&key, &likes.to_string(), LIKES_CACHE_TTL).await {
            tracing::warn!(%key, error = %e, "failed to cache like count");
        }

        Ok(AlbumLikes {
            likes,
            cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use openmusic_db::cache::{CacheError, MemoryCache};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn album_model(id: &str) -> album::Model {
        let now = chrono::Utc::now().fixed_offset();
        album::Model {
            id: id.into(),
            name: "A".into(),
            year: 2000,
            cover: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Cache whose every call fails.
    struct BrokenCache;

    #[async_trait]
    impl CacheStore for BrokenCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".into()))
        }
    }

    /// Cache that records the expiry of every write.
    #[derive(Default)]
    struct RecordingCache {
        writes: std::sync::Mutex<Vec<(String, String, Duration)>>,
    }

    #[async_trait]
    impl CacheStore for RecordingCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Ok(None)
        }
        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
            self.writes
                .lock()
                .unwrap()
                .push((key.to_string(), value.to_string(), ttl));
            Ok(())
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_cached_like_count_expires() {
        let cache = Arc::new(RecordingCache::default());
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(4)]])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), cache.clone());

        albums.get_album_likes("album-1").await.unwrap();
        let writes = cache.writes.lock().unwrap();
        assert_eq!(
            *writes,
            vec![(likes_cache_key("album-1"), "4".to_string(), LIKES_CACHE_TTL)]
        );
        assert!(LIKES_CACHE_TTL > Duration::ZERO);
    }

    #[test]
    fn test_likes_cache_key() {
        assert_eq!(likes_cache_key("album-1"), "album-likes:album-1");
    }

    #[tokio::test]
    async fn test_add_album_returns_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1)])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), Arc::new(MemoryCache::new()));
        let id = albums
            .add_album(NewAlbum {
                name: "A".into(),
                year: 2000,
            })
            .await
            .unwrap();
        assert!(id.starts_with("album-"));
    }

    #[tokio::test]
    async fn test_get_album_by_id_with_songs() {
        let song_row = BTreeMap::from([
            ("id", Value::from("song-1")),
            ("title", Value::from("S")),
            ("performer", Value::from("P")),
        ]);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![album_model("album-1")]])
            .append_query_results([vec![song_row]])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), Arc::new(MemoryCache::new()));

        let detail = albums.get_album_by_id("album-1").await.unwrap();
        assert_eq!(detail.id, "album-1");
        assert_eq!(detail.year, 2000);
        assert_eq!(detail.cover_url, None);
        assert_eq!(detail.songs.len(), 1);
        assert_eq!(detail.songs[0].title, "S");

        let json = serde_json::to_value(&detail).unwrap();
        assert!(json["coverUrl"].is_null());
    }

    #[tokio::test]
    async fn test_get_album_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<album::Model>::new()])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), Arc::new(MemoryCache::new()));
        let err = albums.get_album_by_id("album-x").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == ALBUM_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_edit_delete_cover_on_missing_album() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0), exec(0), exec(0)])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), Arc::new(MemoryCache::new()));
        let payload = NewAlbum {
            name: "A".into(),
            year: 2000,
        };

        assert!(matches!(
            albums.edit_album_by_id("album-x", payload).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            albums.delete_album_by_id("album-x").await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            albums
                .edit_album_cover_by_id("album-x", "http://localhost:5000/albums/images/1.png")
                .await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_toggle_like_then_unlike() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // first toggle: nothing deleted, one row inserted
            .append_exec_results([exec(0), exec(1)])
            // second toggle: the row is deleted
            .append_exec_results([exec(1)])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), Arc::new(MemoryCache::new()));

        assert_eq!(
            albums.toggle_album_like("album-1", "user-1").await.unwrap(),
            LikeToggle::Liked
        );
        assert_eq!(
            albums.toggle_album_like("album-1", "user-1").await.unwrap(),
            LikeToggle::Unliked
        );
    }

    #[tokio::test]
    async fn test_like_count_served_from_cache_until_toggle() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(1)]])
            .append_exec_results([exec(1)])
            .append_query_results([vec![count_row(0)]])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), Arc::new(MemoryCache::new()));

        let first = albums.get_album_likes("album-1").await.unwrap();
        assert_eq!(first, AlbumLikes { likes: 1, cache: false });

        let second = albums.get_album_likes("album-1").await.unwrap();
        assert_eq!(second, AlbumLikes { likes: 1, cache: true });

        albums.toggle_album_like("album-1", "user-1").await.unwrap();

        let third = albums.get_album_likes("album-1").await.unwrap();
        assert_eq!(third, AlbumLikes { likes: 0, cache: false });
    }

    #[tokio::test]
    async fn test_cache_failure_falls_back_to_count() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(4)]])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), Arc::new(BrokenCache));

        let likes = albums.get_album_likes("album-1").await.unwrap();
        assert_eq!(likes, AlbumLikes { likes: 4, cache: false });
    }

    #[tokio::test]
    async fn test_toggle_survives_cache_failure() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0), exec(1)])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), Arc::new(BrokenCache));
        assert_eq!(
            albums.toggle_album_like("album-1", "user-1").await.unwrap(),
            LikeToggle::Liked
        );
    }

    #[tokio::test]
    async fn test_unparsable_cached_value_is_a_miss() {
        let cache = Arc::new(MemoryCache::new());
        cache.set(&likes_cache_key("album-1"), "NaN", LIKES_CACHE_TTL).await.unwrap();
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![count_row(2)]])
            .into_connection();
        let albums = AlbumsService::new(Arc::new(db), cache.clone());

        let likes = albums.get_album_likes("album-1").await.unwrap();
        assert_eq!(likes, AlbumLikes { likes: 2, cache: false });
        assert_eq!(
            cache.get(&likes_cache_key("album-1")).await.unwrap().as_deref(),
            Some("2")
        );
    }
}

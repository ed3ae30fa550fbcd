use std::sync::Arc;

use openmusic_db::entities::song;
use openmusic_db::new_id;
use sea_orm::sea_query::{Expr, Func, LikeExpr};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::validator::NewSong;

const SONG_NOT_FOUND: &str = "Song not found";
const ALBUM_NOT_FOUND: &str = "Album not found";

/// Short form used in listings, album details and playlists.
#[derive(Debug, Clone, PartialEq, Serialize, FromQueryResult)]
pub struct SongSummary {
    pub id: String,
    pub title: String,
    pub performer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongDetail {
    pub id: String,
    pub title: String,
    pub year: i32,
    pub genre: String,
    pub performer: String,
    pub duration: Option<i32>,
    pub album_id: Option<String>,
}

impl From<song::Model> for SongDetail {
    fn from(s: song::Model) -> Self {
        Self {
            id: s.id,
            title: s.title,
            year: s.year,
            genre: s.genre,
            performer: s.performer,
            duration: s.duration,
            album_id: s.album_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SongFilter {
    pub title: Option<String>,
    pub performer: Option<String>,
}

/// Case-insensitive substring match on `column`. Wildcards in `needle` match
/// literally.
fn contains_ignore_case(column: song::Column, needle: &str) -> sea_orm::sea_query::SimpleExpr {
    let pattern = format!("%{}%", escape_like(&needle.to_lowercase()));
    Expr::expr(Func::lower(Expr::col(column))).like(LikeExpr::new(pattern).escape('\\'))
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone)]
pub struct SongsService {
    db: Arc<DatabaseConnection>,
}

impl SongsService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn add_song(&self, new_song: NewSong) -> ApiResult<String> {
        let now = chrono::Utc::now().fixed_offset();
        let id = new_id("song");

        let model = song::ActiveModel {
            id: Set(id.clone()),
            title: Set(new_song.title),
            year: Set(new_song.year),
            genre: Set(new_song.genre),
            performer: Set(new_song.performer),
            duration: Set(new_song.duration),
            album_id: Set(new_song.album_id),
            created_at: Set(now),
            updated_at: Set(now),
        };

        let inserted = song::Entity::insert(model)
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| ApiError::on_foreign_key_violation(e, ALBUM_NOT_FOUND))?;
        if inserted == 0 {
            return Err(ApiError::Invariant("Song could not be added".to_string()));
        }
        Ok(id)
    }

    pub async fn get_songs(&self, filter: &SongFilter) -> ApiResult<Vec<SongSummary>> {
        let mut query = song::Entity::find()
            .select_only()
            .column(song::Column::Id)
            .column(song::Column::Title)
            .column(song::Column::Performer);

        if let Some(title) = filter.title.as_deref().filter(|t| !t.is_empty()) {
            query = query.filter(contains_ignore_case(song::Column::Title, title));
        }
        if let Some(performer) = filter.performer.as_deref().filter(|p| !p.is_empty()) {
            query = query.filter(contains_ignore_case(song::Column::Performer, performer));
        }

        Ok(query.into_model::<SongSummary>().all(self.db.as_ref()).await?)
    }

    pub async fn get_song_by_id(&self, id: &str) -> ApiResult<SongDetail> {
        song::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(SongDetail::from)
            .ok_or_else(|| ApiError::NotFound(SONG_NOT_FOUND.to_string()))
    }

    pub async fn edit_song_by_id(&self, id: &str, song: NewSong) -> ApiResult<()> {
        let result = song::Entity::update_many()
            .col_expr(song::Column::Title, Expr::value(song.title))
            .col_expr(song::Column::Year, Expr::value(song.year))
            .col_expr(song::Column::Genre, Expr::value(song.genre))
            .col_expr(song::Column::Performer, Expr::value(song.performer))
            .col_expr(song::Column::Duration, Expr::value(song.duration))
            .col_expr(song::Column::AlbumId, Expr::value(song.album_id))
            .col_expr(
                song::Column::UpdatedAt,
                Expr::value(chrono::Utc::now().fixed_offset()),
            )
            .filter(song::Column::Id.eq(id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| ApiError::on_foreign_key_violation(e, ALBUM_NOT_FOUND))?;

        if result.rows_affected == 0 {
            return Err(ApiError::NotFound(SONG_NOT_FOUND.to_string()));
        }
        Ok(())
    }

    pub async fn delete_song_by_id(&self, id: &str) -> ApiResult<()> {
        let result = song::Entity::delete_by_id(id).exec(self.db.as_ref()).await?;
        if result.rows_affected == 0 {
            return Err(ApiError::NotFound(SONG_NOT_FOUND.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::transaction_log;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Value};
    use std::collections::BTreeMap;

    fn summary_row(id: &str, title: &str, performer: &str) -> BTreeMap<&'static str, Value> {
        BTreeMap::from([
            ("id", Value::from(id)),
            ("title", Value::from(title)),
            ("performer", Value::from(performer)),
        ])
    }

    fn exec(rows: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected: rows,
        }
    }

    fn new_song() -> NewSong {
        NewSong {
            title: "Life in Technicolor".into(),
            year: 2008,
            genre: "Indie".into(),
            performer: "Coldplay".into(),
            duration: Some(120),
            album_id: None,
        }
    }

    #[tokio::test]
    async fn test_add_song() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(1)])
            .into_connection();
        let id = SongsService::new(Arc::new(db)).add_song(new_song()).await.unwrap();
        assert!(id.starts_with("song-"));
    }

    #[tokio::test]
    async fn test_get_songs_filter_is_case_insensitive() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![summary_row("song-1", "Fix You", "Coldplay")]])
            .into_connection();
        let db = Arc::new(db);
        let songs = SongsService::new(db.clone())
            .get_songs(&SongFilter {
                title: Some("FIX".into()),
                performer: None,
            })
            .await
            .unwrap();
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Fix You");

        let log = transaction_log(db);
        let sql = format!("{:?}", log[0]);
        assert!(sql.contains("LOWER"));
        assert!(sql.contains("%fix%"));
        assert!(sql.contains("ESCAPE"));
    }

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        assert_eq!(escape_like("c:\\d"), "c:\\\\d");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_percent_filter_is_literal() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();
        let db = Arc::new(db);
        let songs = SongsService::new(db.clone())
            .get_songs(&SongFilter {
                title: Some("%".into()),
                performer: None,
            })
            .await
            .unwrap();
        assert!(songs.is_empty());

        let log = transaction_log(db);
        let sql = format!("{:?}", log[0]);
        assert!(!sql.contains("\"%%%\""));
        assert!(sql.contains("ESCAPE"));
    }

    #[tokio::test]
    async fn test_get_song_by_id_not_found() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<song::Model>::new()])
            .into_connection();
        let err = SongsService::new(Arc::new(db)).get_song_by_id("song-x").await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == SONG_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_edit_and_delete_missing_song() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([exec(0), exec(0)])
            .into_connection();
        let songs = SongsService::new(Arc::new(db));
        assert!(matches!(
            songs.edit_song_by_id("song-x", new_song()).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            songs.delete_song_by_id("song-x").await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[test]
    fn test_song_detail_serializes_camel_case() {
        let now = chrono::Utc::now().fixed_offset();
        let detail = SongDetail::from(song::Model {
            id: "song-1".into(),
            title: "S".into(),
            year: 2001,
            genre: "Pop".into(),
            performer: "P".into(),
            duration: None,
            album_id: Some("album-1".into()),
            created_at: now,
            updated_at: now,
        });
        let json = serde_json::to_value(detail).unwrap();
        assert_eq!(json["albumId"], "album-1");
        assert!(json.get("createdAt").is_none());
    }
}

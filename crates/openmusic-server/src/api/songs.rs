use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;

use super::extract::Payload;
use super::response::{created, message, success, Empty};
use crate::error::ApiResult;
use crate::services::songs::SongFilter;
use crate::state::AppState;
use crate::validator::SongPayload;

/// POST /songs
pub async fn post_song(
    State(state): State<Arc<AppState>>,
    Payload(payload): Payload<SongPayload>,
) -> ApiResult<impl IntoResponse> {
    let song = payload.validate()?;
    let song_id = state.songs.add_song(song).await?;
    Ok(created("Song added", json!({ "songId": song_id })))
}

/// GET /songs?title=&performer=
pub async fn list_songs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<SongFilter>,
) -> ApiResult<impl IntoResponse> {
    let songs = state.songs.get_songs(&filter).await?;
    Ok(success(json!({ "songs": songs })))
}

/// GET /songs/{id}
pub async fn get_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let song = state.songs.get_song_by_id(&id).await?;
    Ok(success(json!({ "song": song })))
}

/// PUT /songs/{id}
pub async fn put_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Payload(payload): Payload<SongPayload>,
) -> ApiResult<Json<Empty>> {
    let song = payload.validate()?;
    state.songs.edit_song_by_id(&id, song).await?;
    Ok(message("Song updated"))
}

/// DELETE /songs/{id}
pub async fn delete_song(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Empty>> {
    state.songs.delete_song_by_id(&id).await?;
    Ok(message("Song deleted"))
}

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;

use super::extract::Payload;
use super::response::{created, created_message, message, success, Empty};
use crate::auth::middleware::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::validator::{PlaylistPayload, PlaylistSongPayload};

/// POST /playlists
pub async fn post_playlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Payload(payload): Payload<PlaylistPayload>,
) -> ApiResult<impl IntoResponse> {
    let name = payload.validate()?;
    let playlist_id = state.playlists.add_playlist(&name, user.user_id()).await?;
    Ok(created(
        "Playlist added",
        json!({ "playlistId": playlist_id }),
    ))
}

/// GET /playlists (owned or shared with the caller)
pub async fn list_playlists(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<impl IntoResponse> {
    let playlists = state.playlists.get_playlists(user.user_id()).await?;
    Ok(success(json!({ "playlists": playlists })))
}

/// DELETE /playlists/{id} (owner only)
pub async fn delete_playlist(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<Empty>> {
    state
        .playlists
        .verify_playlist_owner(&id, user.user_id())
        .await?;
    state.playlists.delete_playlist_by_id(&id).await?;
    tracing::info!(playlist_id = %id, "playlist deleted");
    Ok(message("Playlist deleted"))
}

/// POST /playlists/{id}/songs
pub async fn post_playlist_song(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Payload(payload): Payload<PlaylistSongPayload>,
) -> ApiResult<(StatusCode, Json<Empty>)> {
    let song_id = payload.validate()?;
    state
        .playlists
        .verify_playlist_access(&id, user.user_id())
        .await?;
    state
        .playlists
        .add_song_with_activity(&id, &song_id, user.user_id())
        .await?;
    Ok(created_message("Song added to playlist"))
}

/// GET /playlists/{id}/songs
pub async fn get_playlist_songs(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state
        .playlists
        .verify_playlist_access(&id, user.user_id())
        .await?;
    let playlist = state.playlists.get_playlist_songs(&id).await?;
    Ok(success(json!({ "playlist": playlist })))
}

/// DELETE /playlists/{id}/songs
pub async fn delete_playlist_song(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Payload(payload): Payload<PlaylistSongPayload>,
) -> ApiResult<Json<Empty>> {
    let song_id = payload.validate()?;
    state
        .playlists
        .verify_playlist_access(&id, user.user_id())
        .await?;
    state
        .playlists
        .delete_song_with_activity(&id, &song_id, user.user_id())
        .await?;
    Ok(message("Song removed from playlist"))
}

/// GET /playlists/{id}/activities
pub async fn get_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    state
        .playlists
        .verify_playlist_access(&id, user.user_id())
        .await?;
    let activities = state.playlists.get_activities(&id).await?;
    Ok(success(activities))
}

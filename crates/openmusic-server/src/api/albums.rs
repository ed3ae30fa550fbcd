use axum::{
    extract::{multipart::MultipartError, multipart::MultipartRejection, Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use openmusic_storage::StorageError;
use serde_json::json;
use std::sync::Arc;

use super::extract::Payload;
use super::response::{created, created_message, message, success, Empty};
use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::services::albums::LikeToggle;
use crate::state::AppState;
use crate::validator::{validate_image_headers, AlbumPayload};

/// Multipart field carrying the cover image
pub const COVER_FIELD: &str = "cover";
/// Maximum accepted cover upload size in bytes
pub const MAX_COVER_BYTES: usize = 512_000;

/// POST /albums
pub async fn post_album(
    State(state): State<Arc<AppState>>,
    Payload(payload): Payload<AlbumPayload>,
) -> ApiResult<impl IntoResponse> {
    let album = payload.validate()?;
    let album_id = state.albums.add_album(album).await?;
    Ok(created("Album added", json!({ "albumId": album_id })))
}

/// GET /albums
pub async fn list_albums(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let albums = state.albums.get_albums().await?;
    Ok(success(json!({ "albums": albums })))
}

/// GET /albums/{id}
pub async fn get_album(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let album = state.albums.get_album_by_id(&id).await?;
    Ok(success(json!({ "album": album })))
}

/// PUT /albums/{id}
pub async fn put_album(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Payload(payload): Payload<AlbumPayload>,
) -> ApiResult<Json<Empty>> {
    let album = payload.validate()?;
    state.albums.edit_album_by_id(&id, album).await?;
    Ok(message("Album updated"))
}

/// DELETE /albums/{id}
pub async fn delete_album(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Empty>> {
    state.albums.delete_album_by_id(&id).await?;
    tracing::info!(album_id = %id, "album deleted");
    Ok(message("Album deleted"))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(format!("cover must not exceed {MAX_COVER_BYTES} bytes"))
    } else {
        ApiError::Validation(err.body_text())
    }
}

/// POST /albums/{id}/covers
///
/// The content type is checked before the album lookup and before any bytes
/// reach storage.
pub async fn upload_cover(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Empty>)> {
    let mut multipart = multipart.map_err(|e| ApiError::Validation(e.body_text()))?;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(COVER_FIELD) {
            continue;
        }

        validate_image_headers(field.content_type())?;
        state.albums.verify_album_exists(&id).await?;

        let filename = field.file_name().unwrap_or(COVER_FIELD).to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await.map_err(multipart_error)?;
        if data.len() > MAX_COVER_BYTES {
            return Err(ApiError::PayloadTooLarge(format!(
                "cover must not exceed {MAX_COVER_BYTES} bytes"
            )));
        }

        let name = state
            .storage
            .write_file(&filename, &content_type, &data)
            .await?;
        let url = state.cover_url(&name);

        if let Err(e) = state.albums.edit_album_cover_by_id(&id, &url).await {
            // Album vanished between the lookup and the update
            if let Err(cleanup) = state.storage.delete_file(&name).await {
                tracing::warn!(%name, error = %cleanup, "failed to remove orphaned cover");
            }
            return Err(e);
        }

        tracing::info!(album_id = %id, %url, bytes = data.len(), "album cover uploaded");
        return Ok(created_message("Cover uploaded"));
    }

    Err(ApiError::Validation(format!("\"{COVER_FIELD}\" is required")))
}

/// GET /albums/images/{file}
pub async fn serve_cover(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    let data = state.storage.read_file(&file).await.map_err(|e| match e {
        StorageError::NotFound(_) => ApiError::NotFound("Cover not found".to_string()),
        other => ApiError::Storage(other),
    })?;

    let content_type = match file
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("apng") => "image/apng",
        Some("avif") => "image/avif",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );

    Ok((headers, data).into_response())
}

/// POST /albums/{id}/likes (auth required)
pub async fn post_like(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Empty>)> {
    state.albums.verify_album_exists(&id).await?;
    let outcome = state.albums.toggle_album_like(&id, user.user_id()).await?;

    let text = match outcome {
        LikeToggle::Liked => "Album liked",
        LikeToggle::Unliked => "Album unliked",
    };
    Ok(created_message(text))
}

/// GET /albums/{id}/likes
pub async fn get_likes(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Response> {
    let likes = state.albums.get_album_likes(&id).await?;

    let mut response = success(json!({ "likes": likes.likes })).into_response();
    if likes.cache {
        response
            .headers_mut()
            .insert("X-Data-Source", HeaderValue::from_static("cache"));
    }
    Ok(response)
}

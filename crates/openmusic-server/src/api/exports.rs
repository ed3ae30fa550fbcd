use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use super::extract::Payload;
use super::response::{created_message, Empty};
use crate::auth::middleware::AuthUser;
use crate::error::ApiResult;
use crate::export::ExportJob;
use crate::state::AppState;
use crate::validator::ExportPayload;

/// POST /export/playlists/{id} (owner only)
///
/// Queues the export; the document is produced by the export worker.
pub async fn post_playlist_export(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    Payload(payload): Payload<ExportPayload>,
) -> ApiResult<(StatusCode, Json<Empty>)> {
    let target_email = payload.validate()?;
    state
        .playlists
        .verify_playlist_owner(&id, user.user_id())
        .await?;

    state
        .exports
        .enqueue(ExportJob {
            playlist_id: id.clone(),
            target_email,
        })
        .await?;
    tracing::info!(playlist_id = %id, "playlist export queued");
    Ok(created_message("Your request is in queue"))
}

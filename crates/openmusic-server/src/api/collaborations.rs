use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde_json::json;
use std::sync::Arc;

use super::extract::Payload;
use super::response::{created, message, Empty};
use crate::auth::middleware::AuthUser;
use crate::error::ApiResult;
use crate::state::AppState;
use crate::validator::CollaborationPayload;

/// POST /collaborations (playlist owner only)
pub async fn post_collaboration(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Payload(payload): Payload<CollaborationPayload>,
) -> ApiResult<impl IntoResponse> {
    let collab = payload.validate()?;
    state
        .playlists
        .verify_playlist_owner(&collab.playlist_id, user.user_id())
        .await?;
    state.users.verify_user_exists(&collab.user_id).await?;

    let collaboration_id = state
        .collaborations
        .add_collaboration(&collab.playlist_id, &collab.user_id)
        .await?;
    Ok(created(
        "Collaboration added",
        json!({ "collaborationId": collaboration_id }),
    ))
}

/// DELETE /collaborations (playlist owner only)
pub async fn delete_collaboration(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Payload(payload): Payload<CollaborationPayload>,
) -> ApiResult<Json<Empty>> {
    let collab = payload.validate()?;
    state
        .playlists
        .verify_playlist_owner(&collab.playlist_id, user.user_id())
        .await?;
    state
        .collaborations
        .delete_collaboration(&collab.playlist_id, &collab.user_id)
        .await?;
    Ok(message("Collaboration deleted"))
}

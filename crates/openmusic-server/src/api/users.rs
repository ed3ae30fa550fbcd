use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

use super::extract::Payload;
use super::response::{created, success};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::validator::UserPayload;

#[derive(Debug, Deserialize)]
pub struct UserSearch {
    pub username: Option<String>,
}

/// POST /users
pub async fn post_user(
    State(state): State<Arc<AppState>>,
    Payload(payload): Payload<UserPayload>,
) -> ApiResult<impl IntoResponse> {
    let user = payload.validate()?;
    let user_id = state.users.add_user(user).await?;
    Ok(created("User added", json!({ "userId": user_id })))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let user = state.users.get_user_by_id(&id).await?;
    Ok(success(json!({ "user": user })))
}

/// GET /users?username=
pub async fn search_users(
    State(state): State<Arc<AppState>>,
    Query(search): Query<UserSearch>,
) -> ApiResult<impl IntoResponse> {
    let username = search
        .username
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("\"username\" is required".to_string()))?;
    let users = state.users.get_users_by_username(&username).await?;
    Ok(success(json!({ "users": users })))
}

use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;
use std::sync::Arc;

use super::extract::Payload;
use super::response::{created, message, success_message, Empty};
use crate::error::ApiResult;
use crate::state::AppState;
use crate::validator::{LoginPayload, RefreshTokenPayload};

/// POST /authentications
pub async fn login(
    State(state): State<Arc<AppState>>,
    Payload(payload): Payload<LoginPayload>,
) -> ApiResult<impl IntoResponse> {
    let credentials = payload.validate()?;
    let user_id = state.users.verify_user_credential(&credentials).await?;

    let access_token = state.tokens.generate_access_token(&user_id)?;
    let refresh_token = state.tokens.generate_refresh_token(&user_id)?;
    state
        .authentications
        .add_refresh_token(&refresh_token)
        .await?;

    tracing::info!(%user_id, "user logged in");
    Ok(created(
        "Authentication added",
        json!({ "accessToken": access_token, "refreshToken": refresh_token }),
    ))
}

/// PUT /authentications
pub async fn refresh(
    State(state): State<Arc<AppState>>,
    Payload(payload): Payload<RefreshTokenPayload>,
) -> ApiResult<impl IntoResponse> {
    let refresh_token = payload.validate()?;
    state
        .authentications
        .verify_refresh_token(&refresh_token)
        .await?;
    let claims = state.tokens.verify_refresh_token(&refresh_token)?;

    let access_token = state.tokens.generate_access_token(&claims.sub)?;
    Ok(success_message(
        "Access token refreshed",
        json!({ "accessToken": access_token }),
    ))
}

/// DELETE /authentications
pub async fn logout(
    State(state): State<Arc<AppState>>,
    Payload(payload): Payload<RefreshTokenPayload>,
) -> ApiResult<Json<Empty>> {
    let refresh_token = payload.validate()?;
    state
        .authentications
        .verify_refresh_token(&refresh_token)
        .await?;
    state
        .authentications
        .delete_refresh_token(&refresh_token)
        .await?;
    Ok(message("Refresh token deleted"))
}

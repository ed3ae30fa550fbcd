use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::api;
use crate::auth::middleware::require_auth;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ApiStatus {
    status: &'static str,
    version: &'static str,
}

async fn healthz() -> Json<ApiStatus> {
    Json(ApiStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found".to_string())
}

/// Build the HTTP router.
///
/// `rate_limit` enables the per-IP limiter on `/authentications`; it needs
/// the peer address, so the server must be started with connect info.
pub fn router(state: Arc<AppState>, rate_limit: bool) -> Router {
    let albums = Router::new()
        .route(
            "/albums",
            post(api::albums::post_album).get(api::albums::list_albums),
        )
        .route(
            "/albums/{id}",
            get(api::albums::get_album)
                .put(api::albums::put_album)
                .delete(api::albums::delete_album),
        )
        .route("/albums/{id}/likes", get(api::albums::get_likes))
        .route("/albums/images/{file}", get(api::albums::serve_cover))
        .merge(
            Router::new()
                .route("/albums/{id}/covers", post(api::albums::upload_cover))
                .layer(DefaultBodyLimit::max(api::albums::MAX_COVER_BYTES)),
        );

    let songs = Router::new()
        .route(
            "/songs",
            post(api::songs::post_song).get(api::songs::list_songs),
        )
        .route(
            "/songs/{id}",
            get(api::songs::get_song)
                .put(api::songs::put_song)
                .delete(api::songs::delete_song),
        );

    let users = Router::new()
        .route(
            "/users",
            post(api::users::post_user).get(api::users::search_users),
        )
        .route("/users/{id}", get(api::users::get_user));

    let mut authentications = Router::new().route(
        "/authentications",
        post(api::authentications::login)
            .put(api::authentications::refresh)
            .delete(api::authentications::logout),
    );
    if rate_limit {
        // 10 requests burst, refilled one every 6 seconds per IP
        let governor_conf = Arc::new(
            GovernorConfigBuilder::default()
                .per_second(6)
                .burst_size(10)
                .finish()
                .expect("failed to build rate limiter config"),
        );
        authentications = authentications.layer(GovernorLayer::new(governor_conf));
    }

    // Protected routes (auth required)
    let protected = Router::new()
        .route("/albums/{id}/likes", post(api::albums::post_like))
        .route(
            "/playlists",
            post(api::playlists::post_playlist).get(api::playlists::list_playlists),
        )
        .route(
            "/playlists/{id}",
            axum::routing::delete(api::playlists::delete_playlist),
        )
        .route(
            "/playlists/{id}/songs",
            post(api::playlists::post_playlist_song)
                .get(api::playlists::get_playlist_songs)
                .delete(api::playlists::delete_playlist_song),
        )
        .route(
            "/playlists/{id}/activities",
            get(api::playlists::get_activities),
        )
        .route(
            "/export/playlists/{id}",
            post(api::exports::post_playlist_export),
        )
        .route(
            "/collaborations",
            post(api::collaborations::post_collaboration)
                .delete(api::collaborations::delete_collaboration),
        )
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .merge(albums)
        .merge(songs)
        .merge(users)
        .merge(authentications)
        .merge(protected)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .with_state(state)
}

/// CORS policy from a comma-separated origin list. An empty list only allows
/// the server's own origin.
pub fn cors_layer(allowed_origins: &str, own_origin: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| HeaderValue::from_str(s).ok())
        .collect();

    let allow_origin = if origins.is_empty() {
        tracing::warn!("CORS_ORIGINS not set, only {own_origin} may call the API from a browser");
        AllowOrigin::exact(
            HeaderValue::from_str(own_origin)
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:5000")),
        )
    } else {
        tracing::info!("CORS allowed origins: {:?}", origins);
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(tower_http::cors::Any)
        .expose_headers(tower_http::cors::Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use openmusic_db::cache::MemoryCache;
    use crate::export::ExportQueue;
    use openmusic_storage::LocalStorage;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = Arc::new(AppState::new(
            sea_orm::DatabaseConnection::Disconnected,
            Arc::new(MemoryCache::new()),
            Arc::new(LocalStorage::new("/tmp/openmusic-test-app")),
            ExportQueue::channel(1).0,
            AppConfig::default(),
        ));
        router(state, false)
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_healthz() {
        let resp = app()
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        let json = body_json(resp).await;
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_route_uses_fail_envelope() {
        let resp = app()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "fail");
    }

    #[tokio::test]
    async fn test_like_requires_auth() {
        let resp = app()
            .oneshot(
                Request::post("/albums/album-1/likes")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_protected_routes_reject_anonymous() {
        for (method, uri) in [
            ("GET", "/playlists"),
            ("POST", "/playlists"),
            ("DELETE", "/playlists/playlist-1"),
            ("GET", "/playlists/playlist-1/songs"),
            ("GET", "/playlists/playlist-1/activities"),
            ("POST", "/collaborations"),
            ("POST", "/export/playlists/playlist-1"),
        ] {
            let resp = app()
                .oneshot(
                    Request::builder()
                        .method(method)
                        .uri(uri)
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
        }
    }

    #[tokio::test]
    async fn test_invalid_album_payload_is_fail() {
        let resp = app()
            .oneshot(
                Request::post("/albums")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"name":"A","year":1800}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let json = body_json(resp).await;
        assert_eq!(json["status"], "fail");
    }

    #[test]
    fn test_cors_layer_builds() {
        let _ = cors_layer("", "http://localhost:5000");
        let _ = cors_layer("http://a.test, http://b.test", "http://localhost:5000");
    }
}

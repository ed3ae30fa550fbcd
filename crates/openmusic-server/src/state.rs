use std::sync::Arc;

use openmusic_db::cache::CacheStore;
use openmusic_storage::StorageBackend;
use sea_orm::DatabaseConnection;

use crate::auth::tokens::TokenManager;
use crate::config::AppConfig;
use crate::export::ExportQueue;
use crate::services::{
    AlbumsService, AuthenticationsService, CollaborationsService, PlaylistsService, SongsService,
    UsersService,
};

/// Shared application state handed to every handler.
pub struct AppState {
    pub albums: AlbumsService,
    pub songs: SongsService,
    pub users: UsersService,
    pub playlists: PlaylistsService,
    pub collaborations: CollaborationsService,
    pub authentications: AuthenticationsService,
    pub tokens: TokenManager,
    pub storage: Arc<dyn StorageBackend>,
    pub exports: ExportQueue,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        db: impl Into<Arc<DatabaseConnection>>,
        cache: Arc<dyn CacheStore>,
        storage: Arc<dyn StorageBackend>,
        exports: ExportQueue,
        config: AppConfig,
    ) -> Self {
        let db = db.into();
        let collaborations = CollaborationsService::new(db.clone());
        let tokens = TokenManager::new(
            config.access_token_key.clone(),
            config.refresh_token_key.clone(),
            config.access_token_age,
        );

        Self {
            albums: AlbumsService::new(db.clone(), cache),
            songs: SongsService::new(db.clone()),
            users: UsersService::new(db.clone()),
            playlists: PlaylistsService::new(db.clone(), collaborations.clone()),
            authentications: AuthenticationsService::new(db),
            collaborations,
            tokens,
            storage,
            exports,
            config,
        }
    }

    /// Public URL for a stored cover: the backend's own URL when it has one,
    /// otherwise this server's image route.
    pub fn cover_url(&self, name: &str) -> String {
        self.storage
            .public_url(name)
            .unwrap_or_else(|| self.config.cover_url(name))
    }
}

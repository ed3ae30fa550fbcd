//! Data-access services. Each one holds a shared handle to the connection pool and
//! maps rows into typed records.

pub mod albums;
pub mod authentications;
pub mod collaborations;
pub mod playlists;
pub mod songs;
pub mod users;

pub use albums::AlbumsService;
pub use authentications::AuthenticationsService;
pub use collaborations::CollaborationsService;
pub use playlists::PlaylistsService;
pub use songs::SongsService;
pub use users::UsersService;

/// Transaction log of a mock connection once every service holding it is gone.
#[cfg(test)]
pub(crate) fn transaction_log(
    db: std::sync::Arc<sea_orm::DatabaseConnection>,
) -> Vec<sea_orm::Transaction> {
    match std::sync::Arc::try_unwrap(db) {
        Ok(db) => db.into_transaction_log(),
        Err(_) => panic!("connection is still shared"),
    }
}

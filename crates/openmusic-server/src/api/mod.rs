pub mod albums;
pub mod authentications;
pub mod collaborations;
pub mod exports;
pub mod extract;
pub mod playlists;
pub mod response;
pub mod songs;
pub mod users;

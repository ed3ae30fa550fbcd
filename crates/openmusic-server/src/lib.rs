pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod services;
pub mod state;
pub mod validator;

pub use app::router;
pub use error::{ApiError, ApiResult};
pub use state::AppState;

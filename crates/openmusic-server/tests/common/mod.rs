#![allow(dead_code)]

use axum::{body::Body, http::Request, response::Response, Router};
use openmusic_db::cache::MemoryCache;
use openmusic_server::config::AppConfig;
use openmusic_server::export::{ExportJob, ExportQueue};
use openmusic_server::{router, AppState};
use openmusic_storage::LocalStorage;
use sea_orm::{DatabaseConnection, MockExecResult, Transaction, Value};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;

pub const BOUNDARY: &str = "openmusic-test-boundary";

pub fn test_state(db: impl Into<Arc<DatabaseConnection>>, covers_dir: &Path) -> Arc<AppState> {
    test_state_with_exports(db, covers_dir).0
}

/// Like [`test_state`], keeping the receiving end of the export queue.
pub fn test_state_with_exports(
    db: impl Into<Arc<DatabaseConnection>>,
    covers_dir: &Path,
) -> (Arc<AppState>, mpsc::Receiver<ExportJob>) {
    let (exports, rx) = ExportQueue::channel(8);
    let state = Arc::new(AppState::new(
        db,
        Arc::new(MemoryCache::new()),
        Arc::new(LocalStorage::new(covers_dir)),
        exports,
        AppConfig::default(),
    ));
    (state, rx)
}

pub fn test_app(state: Arc<AppState>) -> Router {
    router(state, false)
}

pub async fn body_json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn json_request(method: &str, uri: &str, body: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn authed_get(uri: &str, token: &str) -> Request<Body> {
    Request::get(uri)
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Single-field multipart request body.
pub fn multipart_request(
    uri: &str,
    field: &str,
    filename: &str,
    content_type: &str,
    data: &[u8],
) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::post(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

pub fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
}

pub fn exec(rows: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: rows,
    }
}

pub fn dir_is_empty(dir: &Path) -> bool {
    match std::fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => true,
    }
}

/// Statements run on a mock connection. Every router built on it must be gone.
pub fn transaction_log(db: Arc<DatabaseConnection>) -> Vec<Transaction> {
    match Arc::try_unwrap(db) {
        Ok(db) => db.into_transaction_log(),
        Err(_) => panic!("connection is still shared"),
    }
}

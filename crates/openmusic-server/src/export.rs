//! Playlist export worker.
//!
//! Export requests are queued on a bounded channel and handled by one
//! background task. Each job serializes the playlist with its songs into a
//! JSON document addressed to the requester's email and writes it to the
//! export outbox.

use std::sync::Arc;

use openmusic_storage::StorageBackend;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ApiError, ApiResult};
use crate::services::playlists::PlaylistSongs;
use crate::services::PlaylistsService;

/// Pending jobs before `enqueue` starts waiting.
pub const EXPORT_QUEUE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub playlist_id: String,
    pub target_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportDocument<'a> {
    target_email: &'a str,
    playlist: PlaylistSongs,
}

/// Sending half of the export queue.
#[derive(Debug, Clone)]
pub struct ExportQueue {
    tx: mpsc::Sender<ExportJob>,
}

impl ExportQueue {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<ExportJob>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    pub async fn enqueue(&self, job: ExportJob) -> ApiResult<()> {
        self.tx
            .send(job)
            .await
            .map_err(|_| ApiError::Internal("export queue is closed".to_string()))
    }
}

/// Run export jobs until every `ExportQueue` handle is dropped.
pub fn spawn(
    mut jobs: mpsc::Receiver<ExportJob>,
    playlists: PlaylistsService,
    outbox: Arc<dyn StorageBackend>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("export worker started");
        while let Some(job) = jobs.recv().await {
            match run_export(&playlists, outbox.as_ref(), &job).await {
                Ok(name) => tracing::info!(
                    playlist_id = %job.playlist_id,
                    target_email = %job.target_email,
                    %name,
                    "playlist export written"
                ),
                Err(e) => tracing::error!(
                    playlist_id = %job.playlist_id,
                    "playlist export failed: {e}"
                ),
            }
        }
        tracing::info!("export queue closed, worker stopping");
    })
}

async fn run_export(
    playlists: &PlaylistsService,
    outbox: &dyn StorageBackend,
    job: &ExportJob,
) -> ApiResult<String> {
    let playlist = playlists.get_playlist_songs(&job.playlist_id).await?;
    let document = ExportDocument {
        target_email: &job.target_email,
        playlist,
    };
    let body =
        serde_json::to_vec_pretty(&document).map_err(|e| ApiError::Internal(e.to_string()))?;

    let filename = format!("{}.json", job.playlist_id);
    Ok(outbox
        .write_file(&filename, "application/json", &body)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::CollaborationsService;
    use openmusic_storage::LocalStorage;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, Value};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn playlists(db: DatabaseConnection) -> PlaylistsService {
        let db = Arc::new(db);
        PlaylistsService::new(db.clone(), CollaborationsService::new(db))
    }

    fn job(playlist_id: &str) -> ExportJob {
        ExportJob {
            playlist_id: playlist_id.into(),
            target_email: "dicoding@example.com".into(),
        }
    }

    #[tokio::test]
    async fn test_worker_writes_export_document() {
        let header = BTreeMap::from([
            ("id", Value::from("playlist-1")),
            ("name", Value::from("P1")),
            ("username", Value::from("dicoding")),
        ]);
        let song_row = BTreeMap::from([
            ("id", Value::from("song-1")),
            ("title", Value::from("Fix You")),
            ("performer", Value::from("Coldplay")),
        ]);
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![header]])
            .append_query_results([vec![song_row]])
            .into_connection();
        let tmp = TempDir::new().unwrap();

        let (queue, rx) = ExportQueue::channel(4);
        let worker = spawn(rx, playlists(db), Arc::new(LocalStorage::new(tmp.path())));
        queue.enqueue(job("playlist-1")).await.unwrap();
        drop(queue);
        worker.await.unwrap();

        let files: Vec<_> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        assert!(files[0].to_string_lossy().ends_with("playlist-1.json"));

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&files[0]).unwrap()).unwrap();
        assert_eq!(json["targetEmail"], "dicoding@example.com");
        assert_eq!(json["playlist"]["id"], "playlist-1");
        assert_eq!(json["playlist"]["name"], "P1");
        assert_eq!(json["playlist"]["songs"][0]["title"], "Fix You");
    }

    #[tokio::test]
    async fn test_failed_job_does_not_stop_worker() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<BTreeMap<&str, Value>>::new()])
            .into_connection();
        let tmp = TempDir::new().unwrap();

        let (queue, rx) = ExportQueue::channel(4);
        let worker = spawn(rx, playlists(db), Arc::new(LocalStorage::new(tmp.path())));
        queue.enqueue(job("playlist-x")).await.unwrap();
        drop(queue);
        worker.await.unwrap();

        assert!(std::fs::read_dir(tmp.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(true));
    }

    #[tokio::test]
    async fn test_enqueue_on_closed_queue_is_internal_error() {
        let (queue, rx) = ExportQueue::channel(1);
        drop(rx);
        let err = queue.enqueue(job("playlist-1")).await.unwrap_err();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}

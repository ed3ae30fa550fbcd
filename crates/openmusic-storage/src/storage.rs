use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Operations every cover-image storage backend provides.
///
/// Files are addressed by the flat name returned from [`StorageBackend::write_file`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Store `data` under a fresh name derived from `filename` and return that name.
    async fn write_file(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, StorageError>;

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, StorageError>;

    async fn file_exists(&self, name: &str) -> bool;

    async fn delete_file(&self, name: &str) -> Result<(), StorageError>;

    /// Absolute URL of a stored file when the backend serves files itself.
    /// `None` means the API server is responsible for serving it.
    fn public_url(&self, name: &str) -> Option<String>;
}

/// Build the stored name: upload time in milliseconds followed by the sanitized
/// client file name.
pub fn stored_name(filename: &str) -> String {
    let sanitized = sanitize_filename(filename);
    let sanitized = if sanitized.is_empty() {
        "cover".to_string()
    } else {
        sanitized
    };
    format!("{}{}", chrono::Utc::now().timestamp_millis(), sanitized)
}

fn with_unique_suffix(name: &str) -> String {
    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("cover");
    match Path::new(name).extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, Uuid::new_v4().simple(), ext),
        None => format!("{}_{}", stem, Uuid::new_v4().simple()),
    }
}

// ─── Local Filesystem Backend ──────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn from_env() -> Self {
        let base =
            std::env::var("COVER_STORAGE_PATH").unwrap_or_else(|_| "./data/covers".to_string());
        Self::new(base)
    }

    pub fn base(&self) -> &Path {
        &self.base_path
    }

    pub fn full_path(&self, name: &str) -> PathBuf {
        self.base_path.join(sanitize_filename(name))
    }
}

#[async_trait]
impl StorageBackend for LocalStorage {
    async fn write_file(
        &self,
        filename: &str,
        _content_type: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        fs::create_dir_all(&self.base_path).await?;

        let mut name = stored_name(filename);
        if self.file_exists(&name).await {
            name = with_unique_suffix(&name);
        }

        fs::write(self.base_path.join(&name), data).await?;
        tracing::debug!(%name, bytes = data.len(), "stored file on local disk");

        Ok(name)
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        fs::read(self.full_path(name))
            .await
            .map_err(|_| StorageError::NotFound(name.to_string()))
    }

    async fn file_exists(&self, name: &str) -> bool {
        fs::metadata(self.full_path(name)).await.is_ok()
    }

    async fn delete_file(&self, name: &str) -> Result<(), StorageError> {
        if self.file_exists(name).await {
            fs::remove_file(self.full_path(name)).await?;
        }
        Ok(())
    }

    fn public_url(&self, _name: &str) -> Option<String> {
        None
    }
}

// ─── S3 Backend ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct S3Storage {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
    region: String,
    endpoint: Option<String>,
}

impl S3Storage {
    pub fn from_config(
        endpoint: Option<&str>,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
        prefix: &str,
    ) -> Result<Self, StorageError> {
        if bucket.is_empty() {
            return Err(StorageError::Config("S3 bucket name is empty".to_string()));
        }

        let creds =
            aws_sdk_s3::config::Credentials::new(access_key, secret_key, None, None, "openmusic");

        let mut config_builder = aws_sdk_s3::Config::builder()
            .region(aws_sdk_s3::config::Region::new(region.to_string()))
            .credentials_provider(creds)
            .behavior_version_latest();

        if let Some(ep) = endpoint {
            config_builder = config_builder.endpoint_url(ep).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(config_builder.build());

        Ok(Self {
            client,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            region: region.to_string(),
            endpoint: endpoint.map(|e| e.trim_end_matches('/').to_string()),
        })
    }

    fn s3_key(&self, name: &str) -> String {
        s3_key(&self.prefix, name)
    }
}

fn s3_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", prefix.trim_end_matches('/'), name)
    }
}

fn s3_object_url(endpoint: Option<&str>, bucket: &str, region: &str, key: &str) -> String {
    match endpoint {
        Some(ep) => format!("{ep}/{bucket}/{key}"),
        None => format!("https://{bucket}.s3.{region}.amazonaws.com/{key}"),
    }
}

#[async_trait]
impl StorageBackend for S3Storage {
    async fn write_file(
        &self,
        filename: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, StorageError> {
        let mut name = stored_name(filename);
        if self.file_exists(&name).await {
            name = with_unique_suffix(&name);
        }
        let key = self.s3_key(&name);

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(data.to_vec().into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("PutObject failed: {e}")))?;

        tracing::debug!(%key, bytes = data.len(), "stored object in S3");
        Ok(name)
    }

    async fn read_file(&self, name: &str) -> Result<Vec<u8>, StorageError> {
        let key = self.s3_key(name);
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(|_| StorageError::NotFound(name.to_string()))?;

        let data = resp
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(format!("Read body: {e}")))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }

    async fn file_exists(&self, name: &str) -> bool {
        self.client
            .head_object()
            .bucket(&self.bucket)
            .key(self.s3_key(name))
            .send()
            .await
            .is_ok()
    }

    async fn delete_file(&self, name: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(self.s3_key(name))
            .send()
            .await
            .map_err(|e| StorageError::S3(format!("DeleteObject failed: {e}")))?;
        Ok(())
    }

    fn public_url(&self, name: &str) -> Option<String> {
        Some(s3_object_url(
            self.endpoint.as_deref(),
            &self.bucket,
            &self.region,
            &self.s3_key(name),
        ))
    }
}

// ─── Helpers ───────────────────────────────────────────────────────

pub fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | ' ' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string();
    // SECURITY: reject path traversal sequences
    if sanitized.contains("..") {
        return sanitized.replace("..", "__");
    }
    sanitized
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_filename_clean() {
        assert_eq!(sanitize_filename("cover.jpg"), "cover.jpg");
    }

    #[test]
    fn test_sanitize_filename_slashes() {
        assert_eq!(sanitize_filename("path/to/file"), "path_to_file");
        assert_eq!(sanitize_filename("a\\b"), "a_b");
    }

    #[test]
    fn test_sanitize_filename_traversal() {
        assert_eq!(sanitize_filename("../etc/passwd"), "___etc_passwd");
        assert!(!sanitize_filename("..").contains(".."));
    }

    #[test]
    fn test_sanitize_filename_spaces() {
        assert_eq!(sanitize_filename("my cover.png"), "my_cover.png");
    }

    #[test]
    fn test_stored_name_prefixes_timestamp() {
        let name = stored_name("front.png");
        assert!(name.ends_with("front.png"));
        let prefix = name.trim_end_matches("front.png");
        assert!(!prefix.is_empty());
        assert!(prefix.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_stored_name_empty_filename() {
        assert!(stored_name("").ends_with("cover"));
    }

    #[test]
    fn test_unique_suffix_keeps_extension() {
        let name = with_unique_suffix("1666400000000front.png");
        assert!(name.starts_with("1666400000000front_"));
        assert!(name.ends_with(".png"));
        assert_ne!(with_unique_suffix("cover"), "cover");
    }

    #[test]
    fn test_s3_key_with_and_without_prefix() {
        assert_eq!(s3_key("", "1.png"), "1.png");
        assert_eq!(s3_key("covers/", "1.png"), "covers/1.png");
    }

    #[test]
    fn test_s3_object_url() {
        assert_eq!(
            s3_object_url(None, "bucket", "ap-southeast-1", "1.png"),
            "https://bucket.s3.ap-southeast-1.amazonaws.com/1.png"
        );
        assert_eq!(
            s3_object_url(Some("http://minio:9000"), "bucket", "us-east-1", "c/1.png"),
            "http://minio:9000/bucket/c/1.png"
        );
    }

    #[tokio::test]
    async fn test_write_and_read_file() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let name = storage
            .write_file("cover.png", "image/png", b"png bytes")
            .await
            .unwrap();

        assert!(name.ends_with("cover.png"));
        assert!(storage.file_exists(&name).await);
        assert_eq!(storage.read_file(&name).await.unwrap(), b"png bytes");
        assert!(storage.public_url(&name).is_none());
    }

    #[tokio::test]
    async fn test_write_creates_base_dir() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path().join("nested").join("covers"));

        let name = storage
            .write_file("a.jpg", "image/jpeg", b"jpeg")
            .await
            .unwrap();

        assert!(storage.base().join(&name).exists());
    }

    #[tokio::test]
    async fn test_delete_file() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let name = storage
            .write_file("gone.gif", "image/gif", b"gif")
            .await
            .unwrap();
        storage.delete_file(&name).await.unwrap();

        assert!(!storage.file_exists(&name).await);
    }

    #[tokio::test]
    async fn test_delete_nonexistent_file_ok() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        assert!(storage.delete_file("nope.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_read_nonexistent_file() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        let result = storage.read_file("nope.png").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_full_path_is_sanitized() {
        let storage = LocalStorage::new("/data/covers");
        assert_eq!(
            storage.full_path("../secret"),
            PathBuf::from("/data/covers/___secret")
        );
    }
}

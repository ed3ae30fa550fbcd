pub mod storage;

pub use storage::{
    sanitize_filename, stored_name, LocalStorage, S3Storage, StorageBackend, StorageError,
};

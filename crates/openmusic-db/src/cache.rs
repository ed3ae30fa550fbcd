//! Key/value cache used in front of aggregate queries.
//!
//! Lookups distinguish a hit (`Ok(Some(_))`), a miss (`Ok(None)`) and a
//! backend failure (`Err(_)`); callers decide whether a failure is fatal.

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
    #[error("cache command failed: {0}")]
    Command(String),
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store a value that expires after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// In-process cache. Used when no Redis instance is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        Ok(self
            .entries
            .read()
            .await
            .get(key)
            .filter(|(_, expires_at)| now < *expires_at)
            .map(|(value, _)| value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, (_, expires_at)| now < *expires_at);
        entries.insert(key.to_string(), (value.to_string(), now + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(feature = "redis")]
pub use self::redis_cache::RedisCache;

#[cfg(feature = "redis")]
mod redis_cache {
    use super::{CacheError, CacheStore};
    use async_trait::async_trait;
    use deadpool_redis::redis::AsyncCommands;
    use std::time::Duration;
    use deadpool_redis::{Config, Pool, Runtime};

    /// Redis-backed cache on a deadpool connection pool.
    #[derive(Clone)]
    pub struct RedisCache {
        pool: Pool,
    }

    impl RedisCache {
        pub fn from_url(url: &str) -> Result<Self, CacheError> {
            let pool = Config::from_url(url)
                .create_pool(Some(Runtime::Tokio1))
                .map_err(|e| CacheError::Unavailable(e.to_string()))?;
            Ok(Self { pool })
        }

        async fn conn(&self) -> Result<deadpool_redis::Connection, CacheError> {
            self.pool
                .get()
                .await
                .map_err(|e| CacheError::Unavailable(e.to_string()))
        }
    }

    #[async_trait]
    impl CacheStore for RedisCache {
        async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            let mut conn = self.conn().await?;
            conn.get::<_, Option<String>>(key)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        }

        async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
            let mut conn = self.conn().await?;
            conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        }

        async fn delete(&self, key: &str) -> Result<(), CacheError> {
            let mut conn = self.conn().await?;
            conn.del::<_, ()>(key)
                .await
                .map_err(|e| CacheError::Command(e.to_string()))
        }
    }
}

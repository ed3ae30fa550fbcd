use openmusic_db::cache::{CacheStore, MemoryCache};
use openmusic_server::config::AppConfig;
use openmusic_server::export::{self, ExportQueue, EXPORT_QUEUE_CAPACITY};
use openmusic_server::{app, AppState};
use openmusic_storage::{LocalStorage, S3Storage, StorageBackend};
use sea_orm_migration::MigratorTrait;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Database connection
    let db_config = openmusic_db::DatabaseConfig::from_env();
    tracing::info!("connecting to database...");
    let db = openmusic_db::connect(&db_config)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("running database migrations...");
    openmusic_migration::Migrator::up(&db, None)
        .await
        .expect("failed to run migrations");
    tracing::info!("migrations complete");

    let config = AppConfig::from_env();

    // SECURITY: refuse the built-in signing keys in production
    if config.uses_default_secrets() {
        tracing::error!(
            "ACCESS_TOKEN_KEY or REFRESH_TOKEN_KEY is set to a known default value. \
             Set both to strong random strings in production."
        );
        if std::env::var("OPENMUSIC_ENV").unwrap_or_default() == "production" {
            panic!("Refusing to start: token signing keys must be set in production.");
        }
    }

    let cache = init_cache();
    let storage = init_storage();

    let own_origin = format!("http://{}:{}", config.host, config.port);
    let cors = app::cors_layer(
        &std::env::var("CORS_ORIGINS").unwrap_or_default(),
        &own_origin,
    );

    let (exports, export_jobs) = ExportQueue::channel(EXPORT_QUEUE_CAPACITY);

    let bind = (config.host.clone(), config.port);
    let state = Arc::new(AppState::new(db, cache, storage, exports, config));

    // Background workers
    export::spawn(export_jobs, state.playlists.clone(), init_export_outbox());

    let router = app::router(state, true).layer(cors);

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .expect("failed to bind listener");
    tracing::info!(addr = ?listener.local_addr().ok(), "server started");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("server error");
}

fn init_cache() -> Arc<dyn CacheStore> {
    #[cfg(feature = "redis")]
    if let Ok(url) = std::env::var("REDIS_URL") {
        match openmusic_db::cache::RedisCache::from_url(&url) {
            Ok(cache) => {
                tracing::info!("using Redis cache");
                return Arc::new(cache);
            }
            Err(e) => {
                tracing::error!("failed to create Redis pool: {e}");
                tracing::warn!("continuing with in-memory cache");
            }
        }
    }

    tracing::info!("using in-memory cache");
    Arc::new(MemoryCache::new())
}

fn init_storage() -> Arc<dyn StorageBackend> {
    match std::env::var("STORAGE_BACKEND")
        .unwrap_or_default()
        .as_str()
    {
        "s3" => {
            tracing::info!("initializing S3 storage backend");
            let endpoint = std::env::var("S3_ENDPOINT").ok();
            let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".to_string());
            let access_key = std::env::var("S3_ACCESS_KEY")
                .expect("S3_ACCESS_KEY is required when STORAGE_BACKEND=s3");
            let secret_key = std::env::var("S3_SECRET_KEY")
                .expect("S3_SECRET_KEY is required when STORAGE_BACKEND=s3");
            let bucket =
                std::env::var("S3_BUCKET").expect("S3_BUCKET is required when STORAGE_BACKEND=s3");
            let prefix = std::env::var("S3_PREFIX").unwrap_or_default();

            Arc::new(
                S3Storage::from_config(
                    endpoint.as_deref(),
                    &region,
                    &access_key,
                    &secret_key,
                    &bucket,
                    &prefix,
                )
                .expect("failed to initialize S3 storage"),
            )
        }
        _ => {
            tracing::info!("using local filesystem storage backend");
            Arc::new(LocalStorage::from_env())
        }
    }
}

fn init_export_outbox() -> Arc<dyn StorageBackend> {
    let path =
        std::env::var("EXPORT_STORAGE_PATH").unwrap_or_else(|_| "./data/exports".to_string());
    tracing::info!(%path, "playlist exports are written to local storage");
    Arc::new(LocalStorage::new(path))
}

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use ott_wishlist::{
    api::{create_router, AppState},
    config::{Config, StorageBackend},
    db::{
        create_redis_client, file::FileLocalStore, memory::MemoryLocalStore, LocalStore,
        RedisLocalStore,
    },
    services::{
        AuthHandle, HttpCatalogClient, HttpWishlistClient, PlatformDirectory, ProgramCatalog,
    },
    sync::SyncEngine,
};

fn build_store(config: &Config) -> anyhow::Result<Arc<dyn LocalStore>> {
    let store: Arc<dyn LocalStore> = match config.storage_backend {
        StorageBackend::File => match &config.storage_dir {
            Some(dir) => Arc::new(FileLocalStore::new(dir, &config.storage_namespace)),
            None => Arc::new(FileLocalStore::in_data_dir(&config.storage_namespace)?),
        },
        StorageBackend::Redis => {
            let client = create_redis_client(&config.redis_url)?;
            Arc::new(RedisLocalStore::new(client, &config.storage_namespace))
        }
        StorageBackend::Memory => Arc::new(MemoryLocalStore::new()),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let store = build_store(&config)?;

    let http_client = reqwest::Client::builder()
        .timeout(config.remote_timeout())
        .build()
        .context("Failed to build HTTP client")?;

    let auth = match &config.auth_token {
        Some(token) => AuthHandle::authenticated(token.clone()),
        None => AuthHandle::anonymous(),
    };

    let remote = Arc::new(HttpWishlistClient::new(
        http_client.clone(),
        config.api_base_url.clone(),
        auth.clone(),
    ));
    let catalog: Arc<dyn ProgramCatalog> =
        Arc::new(HttpCatalogClient::new(http_client, config.api_base_url.clone()));
    let platforms = PlatformDirectory::load(catalog.as_ref(), config.remote_timeout()).await;

    let engine = SyncEngine::builder(store, remote, catalog, auth.clone())
        .platforms(Arc::new(platforms))
        .remote_timeout(config.remote_timeout())
        .start();

    let app = create_router(AppState::new(engine.clone(), auth));

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(
        address = %address,
        backend = ?config.storage_backend,
        "Wishlist service listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    engine.shutdown();
    Ok(())
}

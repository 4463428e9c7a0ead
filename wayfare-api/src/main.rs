use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wayfare_api::{app, AppState, Backends};
use wayfare_store::app_config::{Config, StorageBackend};
use wayfare_store::memory::InMemoryStore;
use wayfare_store::{DbClient, RedisClient};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "wayfare_api=debug,wayfare_booking=debug,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    let run_mode = Config::run_mode();
    tracing::info!("Starting Wayfare API on port {} ({})", config.server.port, run_mode);

    let redis = match &config.redis {
        Some(redis_config) => {
            let client = RedisClient::new(&redis_config.url).context("Invalid Redis URL")?;
            if let Err(e) = client.ping().await {
                tracing::warn!(error = %e, "Redis not reachable yet, cache and rate limiting will fail open");
            }
            Some(client)
        }
        None => None,
    };

    let backends = match config.database.storage {
        StorageBackend::Memory => {
            let store = Arc::new(InMemoryStore::new());
            store.seed_demo().await;
            tracing::info!("Using in-memory storage with demo data");
            let mut backends = Backends::memory(store);
            backends.redis = redis.map(Arc::new);
            backends
        }
        StorageBackend::Postgres => {
            let db = DbClient::new(&config.database)
                .await
                .context("Failed to connect to Postgres")?;
            if config.database.run_migrations {
                db.migrate().await.context("Failed to run migrations")?;
                tracing::info!("Migrations applied");
            }
            Backends::postgres(db, redis, config.search.availability_cache_seconds)
        }
    };

    let (state, worker) = AppState::build(&config, &run_mode, backends);
    worker.spawn();

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

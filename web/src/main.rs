//! Booking HTTP server.
//!
//! Ephemeral state lives in Redis when `REDIS_URL` is set and in process
//! memory otherwise. Every store call is bounded by `STORE_TIMEOUT_MS`.

use booking_coordinator::EphemeralStore;
use booking_coordinator::clock::SystemClock;
use booking_coordinator::stores::{BoundedStore, InMemoryLifecycleRepository, MemoryStore, RedisStore};
use booking_web::{AppState, Config, build_router};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// How often the in-memory store drops expired entries.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside development.
    let _ = dotenvy::dotenv();
    let config = Arc::new(Config::from_env()?);

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.server.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        brands = ?config.brands,
        rate_limit = config.rate_limit.limit,
        rate_window_ms = config.rate_limit.window_ms,
        failure_policy = %config.rate_limit.failure_policy,
        "Configuration loaded"
    );

    let store = build_store(&config).await?;
    let state = AppState::new(
        config.clone(),
        store,
        Arc::new(InMemoryLifecycleRepository::new()),
        Arc::new(SystemClock),
    )?;

    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(address = %addr, "Server listening");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn EphemeralStore>> {
    let timeout = Duration::from_millis(config.store.timeout_ms);

    if let Some(url) = &config.store.redis_url {
        info!(key_prefix = %config.store.key_prefix, "Connecting to Redis");
        let redis = RedisStore::new(url, &config.store.key_prefix).await?;
        info!("Redis connected");
        return Ok(Arc::new(BoundedStore::new(redis, timeout)));
    }

    warn!("REDIS_URL not set, keeping ephemeral state in process memory");
    let memory = MemoryStore::new();
    spawn_purge_task(memory.clone());
    Ok(Arc::new(BoundedStore::new(memory, timeout)))
}

fn spawn_purge_task(store: MemoryStore) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            match store.purge_expired() {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "Purged expired entries"),
                Err(e) => error!(error = %e, "Failed to purge expired entries"),
            }
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received Ctrl+C signal, shutting down gracefully...");
        },
        () = terminate => {
            info!("Received SIGTERM signal, shutting down gracefully...");
        },
    }
}

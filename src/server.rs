//! HTTP server initialization and runtime setup.
//!
//! Handles store selection, cache setup, the optional expiry sweeper, and
//! the Axum server lifecycle.

use crate::application::services::{AuthService, LinkService};
use crate::config::Config;
use crate::domain::repositories::LinkRepository;
use crate::infrastructure::cache::{
    LinkCache, MemoryLinkCache, MemoryPopularityIndex, NullCache, PopularityIndex, RedisCache,
};
use crate::infrastructure::persistence::{MemoryLinkRepository, PgLinkRepository};
use crate::routes::app_router;
use crate::state::{AppState, SharedLinkService};

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Opens a PostgreSQL pool with the configured limits and applies migrations.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn connect_database(config: &Config, database_url: &str) -> Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to apply migrations")?;

    Ok(pool)
}

/// Selects the link store: PostgreSQL when configured, process memory otherwise.
pub async fn build_repository(config: &Config) -> Result<Arc<dyn LinkRepository>> {
    match config.database_url {
        Some(ref url) => {
            let pool = connect_database(config, url).await?;
            Ok(Arc::new(PgLinkRepository::new(Arc::new(pool))))
        }
        None => {
            tracing::warn!("No database configured, links are kept in memory");
            Ok(Arc::new(MemoryLinkRepository::new()))
        }
    }
}

/// Selects both cache capabilities.
///
/// Redis serves both when configured; if it cannot be reached the service
/// runs without a cache rather than failing to start.
pub async fn build_caches(config: &Config) -> (Arc<dyn LinkCache>, Arc<dyn PopularityIndex>) {
    if let Some(redis_url) = &config.redis_url {
        match RedisCache::connect(redis_url).await {
            Ok(redis) => {
                tracing::info!("Cache enabled (Redis)");
                let redis = Arc::new(redis);
                return (redis.clone(), redis);
            }
            Err(e) => {
                tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                let null = Arc::new(NullCache::new());
                return (null.clone(), null);
            }
        }
    }

    tracing::info!(
        capacity = config.cache_max_capacity,
        "Cache enabled (in-process)"
    );
    (
        Arc::new(MemoryLinkCache::new(config.cache_max_capacity)),
        Arc::new(MemoryPopularityIndex::new()),
    )
}

/// Periodically deletes dead links.
///
/// Lazy purging on access stays in force; the sweep only reclaims links that
/// are never looked at again.
pub fn spawn_purge_sweeper(service: SharedLinkService, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match service.purge_expired().await {
                Ok(0) => tracing::debug!("Expiry sweep found nothing to purge"),
                Ok(count) => tracing::info!(count, "Expiry sweep completed"),
                Err(e) => tracing::warn!(error = %e, "Expiry sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for Ctrl+C: {}", e),
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Link store (PostgreSQL with migrations, or in-memory)
/// - Snapshot cache and popularity ranking (Redis, or in-process)
/// - Optional background expiry sweep
/// - Axum HTTP server with graceful shutdown on Ctrl+C
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let repository = build_repository(&config).await?;
    let (cache, popularity) = build_caches(&config).await;

    let link_service: SharedLinkService = Arc::new(LinkService::new(
        repository,
        cache,
        popularity,
        config.link_settings(),
    ));
    let auth_service = Arc::new(
        AuthService::new(&config.api_tokens, config.token_signing_secret.clone())
            .context("Failed to initialise token authentication")?,
    );
    tracing::info!(tokens = auth_service.token_count(), "Token authentication ready");

    let sweeper = (config.purge_interval_seconds > 0).then(|| {
        tracing::info!(
            every_seconds = config.purge_interval_seconds,
            "Expiry sweeper started"
        );
        spawn_purge_sweeper(
            link_service.clone(),
            Duration::from_secs(config.purge_interval_seconds),
        )
    });

    let state = AppState::new(link_service, auth_service, config.base_url.clone());
    let app = app_router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(sweeper) = sweeper {
        sweeper.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

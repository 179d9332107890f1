//! catalog-cache server entry point.
//!
//! Wires the store, the protected upstream client and the event sync
//! pipeline together, then serves the REST API until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use catalog_cache::api;
use catalog_cache::app_state::AppState;
use catalog_cache::config::{CatalogConfig, LogFormat};
use catalog_cache::metrics::CatalogMetrics;
use catalog_cache::persistence::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore};
use catalog_cache::resilience::CircuitBreaker;
use catalog_cache::service::CatalogReadPath;
use catalog_cache::sync::{EventStream, EventSyncPipeline, InMemoryEventStream, SyncStats};
use catalog_cache::upstream::{HttpSubmissionSource, ProtectedRemoteClient, UpstreamSource};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn build_store(
    config: &CatalogConfig,
) -> anyhow::Result<(Arc<dyn CatalogStore>, Option<sqlx::PgPool>)> {
    if !config.persistence_enabled {
        tracing::warn!("persistence disabled, using in-memory catalog store");
        return Ok((Arc::new(InMemoryCatalogStore::new()), None));
    }

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
        .connect(&config.database_url)
        .await
        .context("connecting to catalog database")?;
    let store = PostgresCatalogStore::new(pool.clone());
    store
        .init_schema()
        .await
        .context("initializing catalog schema")?;
    tracing::info!("catalog database ready");
    Ok((Arc::new(store), Some(pool)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CatalogConfig::from_env()?;
    init_tracing(config.log_format);
    tracing::info!(addr = %config.listen_addr, "starting catalog-cache");

    let (store, pool) = build_store(&config).await?;

    // Upstream behind the breaker
    let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker()));
    let source = HttpSubmissionSource::new(
        &config.submission_service_url,
        config.upstream_http_timeout(),
    )
    .context("building submission service client")?;
    let remote = Arc::new(ProtectedRemoteClient::new(
        Arc::new(source) as Arc<dyn UpstreamSource>,
        Arc::clone(&breaker),
    ));
    let read_path = Arc::new(CatalogReadPath::new(Arc::clone(&store), remote));

    // Metrics
    let metrics = CatalogMetrics::new().context("building metrics registry")?;
    let sync_stats = SyncStats::new().context("building sync metrics")?;
    sync_stats
        .register(metrics.registry())
        .context("registering sync metrics")?;
    let sync_stats = Arc::new(sync_stats);

    // Event sync
    let events = InMemoryEventStream::new(config.event_bus_capacity);
    let shutdown = CancellationToken::new();
    let pipeline = EventSyncPipeline::new(
        Arc::new(events.clone()) as Arc<dyn EventStream>,
        Arc::clone(&store),
        config.event_topic.clone(),
        Arc::clone(&sync_stats),
    )
    .with_retry_interval(config.event_retry_interval());
    let consumer = tokio::spawn(pipeline.run(shutdown.child_token()));

    let app_state = AppState {
        read_path,
        breaker,
        events: events.clone(),
        event_topic: config.event_topic.clone(),
        event_publish_timeout: config.event_publish_timeout(),
        sync_stats,
        metrics: Arc::new(metrics),
    };

    let app = api::build_router(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "failed to listen for ctrl-c");
                    }
                    tracing::info!("shutdown signal received");
                }
                () = server_shutdown.cancelled() => {}
            }
        })
        .await?;

    shutdown.cancel();
    events.shutdown();
    if let Err(e) = consumer.await {
        tracing::error!(error = %e, "event sync task panicked");
    }
    if let Some(pool) = pool {
        pool.close().await;
    }
    tracing::info!("catalog-cache stopped");

    Ok(())
}

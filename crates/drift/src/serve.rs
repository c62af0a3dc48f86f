//! Serve - wire the stores, sources and engines behind the HTTP facade

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use drift_analytics::{AttributionAggregator, DivergenceEngine, EngineConfig};
use drift_api::{AppState, build_router};
use drift_config::{Config, DivergenceConfig, RedisConfig, WarehouseConfig};
use drift_query::{MemoryBackend, MySqlBackend, MySqlBackendConfig, QueryExecutor};
use drift_sources::DataSources;
use drift_store::{
    CacheLayer, Clock, DefaultTags, KvStore, MemoryStore, RedisStore, RedisStoreConfig,
    SystemClock, TagStore,
};

pub async fn run(config: Config, memory_store: bool) -> Result<()> {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let store: Arc<dyn KvStore> = if memory_store {
        warn!("using in-memory store, cache and tags are lost on exit");
        Arc::new(MemoryStore::with_clock(clock.clone()))
    } else {
        let store = RedisStore::connect(&redis_config(&config.redis))
            .await
            .context("failed to connect to redis")?;
        Arc::new(store)
    };

    let executor = warehouse(&config.warehouse, memory_store)?;
    check_warehouse(executor.clone());

    let cache = Arc::new(CacheLayer::new(store.clone(), clock.clone()));
    let tags = TagStore::new(store, clock.clone(), DefaultTags::builtin());
    let sources = DataSources::new(executor, cache.clone());
    let engine_config = engine_config(&config.divergence);

    let engine = DivergenceEngine::new(
        sources.clone(),
        tags.clone(),
        cache.clone(),
        clock.clone(),
        engine_config.clone(),
    );
    let aggregator = AttributionAggregator::new(sources, tags.clone(), clock, engine_config);

    let mut state = AppState::new(engine, aggregator, tags, cache);
    let static_dir = &config.server.static_dir;
    if static_dir.is_dir() {
        state = state.with_static_dir(static_dir.clone());
    } else {
        warn!(static_dir = %static_dir.display(), "dashboard bundle not found, serving API only");
    }

    let addr = config.server.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(address = %addr, "divergence service listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    Ok(())
}

fn redis_config(config: &RedisConfig) -> RedisStoreConfig {
    RedisStoreConfig {
        host: config.host.clone(),
        port: config.port,
        password: config.password.clone(),
        db: config.db,
    }
}

fn engine_config(config: &DivergenceConfig) -> EngineConfig {
    EngineConfig {
        new_customer_days: config.new_customer_days,
        recent_zero_window: config.recent_zero_window,
        recent_zero_threshold: config.recent_zero_threshold,
        ..EngineConfig::default()
    }
}

/// Pooled MySQL executor; without a DSN only offline mode can start
fn warehouse(config: &WarehouseConfig, offline: bool) -> Result<QueryExecutor> {
    match &config.dsn {
        Some(dsn) => {
            let mut backend_config = MySqlBackendConfig::new(dsn.as_str()).with_pool(
                config.max_open,
                config.max_idle,
                config.max_lifetime(),
            );
            backend_config.acquire_timeout = config.acquire_timeout();
            let backend = MySqlBackend::connect_lazy(&backend_config)
                .context("failed to configure warehouse pool")?;
            Ok(QueryExecutor::new(backend))
        }
        None if offline => {
            warn!("no warehouse DSN, every query returns no rows");
            Ok(QueryExecutor::new(MemoryBackend::new()))
        }
        None => anyhow::bail!("warehouse DSN is required: set [warehouse].dsn or WAREHOUSE_DSN"),
    }
}

/// The pool connects lazily; report reachability without blocking startup
fn check_warehouse(executor: QueryExecutor) {
    tokio::spawn(async move {
        match executor.health_check().await {
            Ok(()) => info!(backend = executor.name(), "warehouse reachable"),
            Err(e) => warn!(backend = executor.name(), error = %e, "warehouse not reachable yet"),
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}

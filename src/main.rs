use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use linkpulse::analytics::{AnalyticsSink, BufferedSink, GeoIpService, LoggingSink};
use linkpulse::config::{AnalyticsSinkKind, Config};
use linkpulse::health::{HealthScheduler, HealthWorker, LinkHealthProber};
use linkpulse::redirect::{create_redirect_router, RedirectState};
use linkpulse::storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    info!("Loaded configuration");

    let storage = storage::connect(&config.database).await?;

    info!("Initializing database...");
    storage.init().await?;
    info!("Database initialized successfully");

    let geoip = match config.analytics.geoip_city_db_path.as_deref() {
        Some(path) => match GeoIpService::new(path) {
            Ok(service) => {
                info!("GeoIP fallback enabled: {}", path);
                Some(Arc::new(service))
            }
            Err(e) => {
                warn!("Failed to load GeoIP database '{}': {}", path, e);
                None
            }
        },
        None => None,
    };

    let buffered_sink = match config.analytics.sink {
        AnalyticsSinkKind::Storage => Some(Arc::new(BufferedSink::new(
            Arc::clone(&storage),
            config.analytics.buffer_size,
            config.analytics.flush_interval_ms,
        ))),
        AnalyticsSinkKind::Log => {
            info!("Analytics sink: log only, click events are not persisted");
            None
        }
    };
    let sink: Arc<dyn AnalyticsSink> = match &buffered_sink {
        Some(buffered) => Arc::clone(buffered) as Arc<dyn AnalyticsSink>,
        None => Arc::new(LoggingSink),
    };

    let health_worker = if config.health.enabled {
        let prober = LinkHealthProber::new(config.health.timeout(), config.health.slow_threshold())?;
        let scheduler = HealthScheduler::new(
            Arc::clone(&storage),
            prober,
            config.health.batch_size,
            config.health.concurrency,
        );
        info!(
            "Health checks every {}s (batch {}, concurrency {})",
            config.health.interval_secs, config.health.batch_size, config.health.concurrency
        );
        Some(HealthWorker::spawn(
            scheduler,
            Duration::from_secs(config.health.interval_secs.max(1)),
        ))
    } else {
        info!("Health checks disabled");
        None
    };

    let state = Arc::new(RedirectState::new(
        Arc::clone(&storage),
        sink,
        &config.analytics,
        geoip,
    ));
    let redirect_router = create_redirect_router(state);

    let redirect_addr = format!(
        "{}:{}",
        config.redirect_server.host, config.redirect_server.port
    );
    let redirect_listener = tokio::net::TcpListener::bind(&redirect_addr).await?;
    info!("Redirect server listening on http://{}", redirect_addr);

    axum::serve(
        redirect_listener,
        redirect_router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Shutting down background workers...");
    if let Some(worker) = health_worker {
        worker.shutdown().await;
    }
    if let Some(buffered) = buffered_sink {
        buffered.shutdown().await;
    }
    info!("Shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

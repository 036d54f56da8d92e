use std::sync::Arc;
use std::time::Duration;

use cab_admin::api;
use cab_admin::config::{Config, LogFormat};
use cab_admin::engine::alerts::AlertDispatcher;
use cab_admin::engine::clock::SystemClock;
use cab_admin::engine::notifier::BookingWatcher;
use cab_admin::error::AppError;
use cab_admin::observability::metrics::Metrics;
use cab_admin::state::AppState;
use cab_admin::store::RestBackend;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = Config::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false);
    match config.log_format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Compact => subscriber.compact().init(),
    }

    let metrics = Metrics::new();
    let backend = Arc::new(RestBackend::new(
        config.backend_url.clone(),
        config.backend_anon_key.clone(),
        config.backend_service_key.clone(),
        metrics.clone(),
    ));
    if config.backend_service_key.is_none() {
        tracing::warn!("no service key configured; background polling runs with the anon key");
    }

    let shared_state = Arc::new(AppState::new(
        config.clone(),
        backend.clone(),
        backend,
        Arc::new(SystemClock),
        metrics.clone(),
    ));

    let watcher = if config.notify_enabled {
        let dispatcher = AlertDispatcher::new(
            shared_state.alerts_tx.clone(),
            shared_state.store.clone(),
            config.push_function.clone(),
            metrics.clone(),
        );
        let watcher = BookingWatcher::new(
            Arc::new(shared_state.bookings.clone()),
            Arc::new(dispatcher),
            config.notify_window,
            Duration::from_secs(config.notify_poll_secs.max(1)),
            metrics,
        );
        Some(watcher.start())
    } else {
        tracing::info!("booking watcher disabled");
        None
    };

    let app = api::rest::router(shared_state);

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(
        http_port = config.http_port,
        pricing_schema = config.pricing_schema.table(),
        "http server started"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::Internal(format!("server error: {err}")))?;

    if let Some(handle) = watcher {
        handle.stop();
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}

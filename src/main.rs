use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use escola::escola_config::{NotificationConfig, PushConfig, ServerConfig};
use escola::escola_db::{init_db_pool, run_migrations};
use escola::logging::{init_tracing, shutdown_tracer};
use escola::metrics::init_metrics;
use escola::modules::notifications::push::{FcmPushProvider, LogPushProvider, PushProvider};
use escola::modules::notifications::{NotificationDispatcher, NotificationWorker};
use escola::router::init_router;
use escola::state::AppState;
use tracing::{info, warn};

fn push_provider() -> Arc<dyn PushProvider> {
    match PushConfig::from_env() {
        Some(config) => match FcmPushProvider::new(config) {
            Ok(provider) => Arc::new(provider),
            Err(e) => {
                warn!(error = %e, "FCM unavailable, notifications will be stored only");
                Arc::new(LogPushProvider)
            }
        },
        None => Arc::new(LogPushProvider),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();
    let metrics_handle = init_metrics();

    let server_config = ServerConfig::from_env();
    let db = init_db_pool(server_config.database_max_connections)
        .await
        .context("failed to connect to the database")?;
    run_migrations(&db)
        .await
        .context("failed to apply migrations")?;

    let notification_config = NotificationConfig::from_env();
    let (notifier, receiver) = NotificationDispatcher::new(notification_config.queue_capacity);
    let worker = NotificationWorker::new(db.clone(), receiver, push_provider());
    let worker_handle = tokio::spawn(worker.run());

    let state = AppState::new(db, notifier);
    let app = init_router(state, metrics_handle);

    let address = server_config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {}", address))?;

    info!("Server running on http://{}", address);
    info!("Swagger UI available at http://{}/swagger-ui", address);
    info!("Scalar UI available at http://{}/scalar", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    // The router owned the last dispatcher clones; the worker drains what is queued.
    if let Err(e) = worker_handle.await {
        warn!(error = %e, "notification worker ended abnormally");
    }

    shutdown_tracer().await;
    Ok(())
}

//! Fanvault Platform API binary
//!
//! Serves gated feeds and billing webhooks over HTTP. Runs against
//! PostgreSQL when `DATABASE_URL` is set, otherwise against a process-local
//! in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use fanvault_billing_core::BillingEventProcessor;
use fanvault_db::{MemoryStore, Repositories};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use tokio::signal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use platform_api::{build_router, AppState, Config};

/// How often old processed-event records are purged
const PURGE_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("platform_api=debug".parse()?))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Fanvault Platform API");

    let config = Config::from_env()?;
    tracing::info!(
        http_port = config.http_port,
        persistent = config.database_url.is_some(),
        "Configuration loaded"
    );

    let metrics_handle = if config.metrics_enabled {
        Some(setup_metrics()?)
    } else {
        None
    };

    let (repos, pool) = match &config.database_url {
        Some(url) => {
            let pool = fanvault_db::create_pool(url).await?;
            fanvault_db::run_migrations(&pool).await?;
            tracing::info!("Database pool created, migrations applied");
            (Repositories::new(pool.clone()), Some(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            (Arc::new(MemoryStore::new()).repositories(), None)
        }
    };

    let http_port = config.http_port;
    let state = AppState::new(config, &repos, pool)?;

    let purge = tokio::spawn(purge_processed_events(Arc::clone(&state.billing)));

    let app = build_router(state, metrics_handle);
    let addr = SocketAddr::from(([0, 0, 0, 0], http_port));
    let result = run_http_server(app, addr).await;

    purge.abort();
    tracing::info!("Shutdown complete");
    result
}

async fn run_http_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    tracing::info!("HTTP server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn purge_processed_events(billing: Arc<BillingEventProcessor>) {
    let mut interval = tokio::time::interval(PURGE_INTERVAL);
    loop {
        interval.tick().await;
        if let Err(e) = billing.purge_expired().await {
            tracing::warn!(error = %e, "Processed-event purge failed");
        }
    }
}

fn setup_metrics() -> anyhow::Result<PrometheusHandle> {
    // Most requests are one store round-trip
    let latency_buckets = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.2, 0.5, 1.0, 2.5];

    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("fanvault_operation_duration_seconds".to_string()),
            latency_buckets,
        )?
        .install_recorder()?;

    metrics::describe_counter!(
        "fanvault_entitlement_decisions_total",
        "Entitlement decisions by reason"
    );
    metrics::describe_counter!(
        "fanvault_webhooks_processed_total",
        "Billing webhooks processed by event and outcome"
    );
    metrics::describe_histogram!(
        "fanvault_operation_duration_seconds",
        "Operation latency in seconds by operation"
    );

    Ok(handle)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = ?e, "Failed to install Ctrl+C handler");
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
                tracing::error!(error = ?e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}

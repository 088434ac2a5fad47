//! # revas-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the reviewer assignment service.

use std::sync::Arc;

use anyhow::Context;
use axum::http::StatusCode;
use clap::Parser;
use tower_http::timeout::TimeoutLayer;
use tracing_subscriber::EnvFilter;

use revas_api::config::{LogFormat, ServerArgs};
use revas_api::db::{self, PgStore};
use revas_api::state::{AppState, SharedStore};
use revas_engine::{InMemoryStore, ReviewerSelector};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.log_format);
    tracing::debug!(?args, "configuration loaded");

    let options = args.db_connect_options()?;
    let db_pool = db::init_pool(options, args.db_max_connections)
        .await
        .map_err(|e| {
            tracing::error!("Database initialization failed: {e}");
            e
        })?;

    let selector = match args.reviewer_seed {
        Some(seed) => {
            tracing::info!(seed, "reviewer selection seeded");
            ReviewerSelector::from_seed(seed)
        }
        None => ReviewerSelector::from_entropy(),
    };
    let store: SharedStore = match &db_pool {
        Some(pool) => Arc::new(PgStore::new(pool.clone())),
        None => Arc::new(InMemoryStore::new()),
    };
    let state = AppState::with_store(store, selector, db_pool);

    let app = revas_api::app(state).layer(TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        args.request_timeout(),
    ));

    let listener = tokio::net::TcpListener::bind(args.http_address)
        .await
        .with_context(|| format!("failed to bind {}", args.http_address))?;
    tracing::info!("revas API listening on {}", args.http_address);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stop_rx.await;
            })
            .await
    });

    tokio::select! {
        joined = &mut server => {
            joined??;
            return Ok(());
        }
        () = shutdown_signal() => {}
    }

    tracing::info!("shutdown signal received, draining in-flight requests");
    let _ = stop_tx.send(());
    match tokio::time::timeout(args.shutdown_grace(), server).await {
        Ok(joined) => joined??,
        Err(_) => tracing::warn!(
            grace_secs = args.shutdown_grace().as_secs(),
            "grace period elapsed, dropping remaining connections"
        ),
    }
    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

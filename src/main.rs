//! shopfront-gateway server entry point.
//!
//! Selects the storage backend, then serves the REST API until Ctrl+C or
//! SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use shopfront_gateway::api;
use shopfront_gateway::app_state::AppState;
use shopfront_gateway::config::ServiceConfig;
use shopfront_gateway::persistence::{PgCartStore, PgProductCatalog, postgres};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(addr = %config.listen_addr, base_path = %config.base_path, "starting shopfront-gateway");

    // Build storage and service layers
    let (app_state, pool) = if config.persistence_enabled {
        let pool = postgres::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        if config.run_migrations {
            postgres::run_migrations(&pool)
                .await
                .context("running migrations")?;
            tracing::info!("migrations applied");
        }
        let state = AppState::new(
            Arc::new(PgCartStore::new(pool.clone())),
            Arc::new(PgProductCatalog::new(pool.clone())),
            config.cart_mutation_max_attempts,
            "postgres",
        );
        (state, Some(pool))
    } else {
        tracing::warn!("persistence disabled, carts live in memory only");
        (AppState::in_memory(config.cart_mutation_max_attempts), None)
    };

    let app = api::build_app(app_state, &config.base_path);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    if let Some(pool) = pool {
        pool.close().await;
    }
    tracing::info!("shutdown complete");

    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("ctrl_c signal received"),
        () = terminate => tracing::info!("terminate signal received"),
    }
}

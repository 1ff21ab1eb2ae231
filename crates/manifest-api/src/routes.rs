//! Router setup and server lifecycle.

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use manifest_core::config::ServerConfig;
use manifest_core::{ManifestError, Result};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::handlers;
use crate::state::AppState;

/// Create the router: exactly one route, `POST /query/`.
pub fn create_router(state: AppState, body_limit: usize) -> Router {
    Router::new()
        .route("/query/", post(handlers::query))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind `host:port` and serve until Ctrl+C or SIGTERM.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr = config.addr();
    let router = create_router(state, config.body_limit_bytes);

    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|e| {
        error!(addr = %addr, error = %e, "Failed to bind, is another instance running?");
        ManifestError::Api(format!("failed to bind {addr}: {e}"))
    })?;

    info!(addr = %addr, "Query service listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Query service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to install SIGTERM handler"),
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

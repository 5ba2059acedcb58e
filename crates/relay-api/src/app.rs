//! Application builder. Wires router, middleware and state into an Axum app.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use relay_auth::JwtVerifier;
use relay_core::config::AppConfig;
use relay_core::error::AppError;

use crate::middleware::cors::build_cors_layer;
use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.server.cors);
    build_router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Runs the relay with the given configuration until ctrl-c.
pub async fn run_server(config: AppConfig) -> Result<(), AppError> {
    info!("Starting presence relay...");

    let verifier = Arc::new(JwtVerifier::new(&config.auth));
    info!(
        credential_source = %config.auth.credential_source,
        "Credential verifier initialized"
    );

    let addr = config.server.bind_address();
    let state = AppState::new(config, verifier);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {}: {}", addr, e)))?;

    info!("Presence relay listening on {}", addr);

    serve(listener, state, shutdown_signal()).await
}

/// Serves `state` on `listener` until `shutdown` resolves, then closes every
/// live connection.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let engine = state.realtime.clone();
    let grace = Duration::from_secs(state.config.server.shutdown_grace_seconds);
    let app = build_app(state);
    let closer = engine.clone();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutdown signal received, closing connections");
            closer.shutdown();
        })
        .await
        .map_err(|e| AppError::internal(format!("Server error: {}", e)))?;

    // Upgraded sockets outlive the HTTP server; give them time to terminate.
    let deadline = Instant::now().checked_add(grace);
    while engine.connections.connection_count() > 0 {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            warn!(
                remaining = engine.connections.connection_count(),
                "Shutdown grace period elapsed with connections still open"
            );
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    info!("Presence relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

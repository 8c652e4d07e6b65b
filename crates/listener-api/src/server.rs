//! HTTP server configuration and request routing.
//!
//! Requests flow through middleware in order:
//! 1. CORS header stamping (outermost, covers every response)
//! 2. Invocation id assignment and panic safety net
//! 3. Request/response tracing
//! 4. Timeout enforcement (30s default)
//! 5. Body size limit
//! 6. Handler execution
//!
//! # Graceful Shutdown
//!
//! The server stops accepting connections on SIGINT or SIGTERM and lets
//! in-flight invocations finish their single store write.

use std::{net::SocketAddr, time::Duration};

use axum::{extract::DefaultBodyLimit, http::StatusCode, middleware, routing::any, Router};
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::{cors::stamp_cors_headers, handlers, invocation::assign_invocation_id, AppState};

/// Route the webhook endpoint is mounted on.
pub const WEBHOOK_PATH: &str = "/webhook";

/// Limits applied by the HTTP layer around the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpSettings {
    /// Overall time allowed per request.
    pub request_timeout: Duration,
    /// Largest accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { request_timeout: Duration::from_secs(30), max_body_bytes: 10 * 1024 * 1024 }
    }
}

/// Creates the Axum router with the webhook route and middleware.
///
/// The route accepts any method; only `OPTIONS` is treated specially.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
///
/// use listener_api::{create_router, AppState, HttpSettings};
/// use listener_core::storage::mock::MockRecordStore;
///
/// let state = AppState::with_store(Arc::new(MockRecordStore::new()));
/// let app = create_router(state, HttpSettings::default());
/// ```
pub fn create_router(state: AppState, settings: HttpSettings) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, any(handlers::receive_webhook))
        .layer(DefaultBodyLimit::max(settings.max_body_bytes))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            settings.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn_with_state(state.clone(), assign_invocation_id))
        .layer(middleware::from_fn(stamp_cors_headers))
        .with_state(state)
}

/// Starts the HTTP server with graceful shutdown support.
///
/// # Errors
///
/// Returns `std::io::Error` if the address cannot be bound or the server
/// fails while running.
pub async fn start_server(
    state: AppState,
    settings: HttpSettings,
    addr: SocketAddr,
) -> Result<(), std::io::Error> {
    let app = create_router(state, settings);

    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!(addr = %actual_addr, path = WEBHOOK_PATH, "Webhook listener ready");

    axum::serve(listener, app).with_graceful_shutdown(shutdown_signal()).await?;

    info!("HTTP server stopped gracefully");
    Ok(())
}

/// Waits for shutdown signal (CTRL+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("Received CTRL+C, starting graceful shutdown");
        },
        () = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }

    warn!("Draining in-flight webhook invocations");
}

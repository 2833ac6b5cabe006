//! # Sentinel Web Server
//!
//! A read-only JSON view of the running engine: its activation state, the latest
//! signal and the persisted signal history.

use axum::{Router, routing::get};
use engine::EngineHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;

pub use error::AppError;

/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub engine: EngineHandle,
}

/// Builds the application routes on top of an engine handle.
pub fn router(engine: EngineHandle) -> Router {
    let app_state = Arc::new(AppState { engine });
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods(Any)
        .allow_headers(AllowHeaders::any());

    Router::new()
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/status", get(handlers::get_status))
        .route("/api/signals", get(handlers::get_signals))
        .route("/api/signals/last", get(handlers::get_last_signals))
        .fallback(handlers::not_found)
        .with_state(app_state)
        .layer(cors)
        // Logs every incoming request.
        .layer(TraceLayer::new_for_http())
}

/// Serves the API on `addr` until `shutdown` flips to `true`.
pub async fn run_server(
    addr: SocketAddr,
    engine: EngineHandle,
    mut shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let app = router(engine);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    break;
                }
            }
        })
        .await?;

    Ok(())
}

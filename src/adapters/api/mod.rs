//! HTTP control API and WebSocket stream (axum)
//!
//! - `POST /api/initialize`, `/api/start`, `/api/stop`
//! - `GET /api/status`, `/api/historical?window=N`, `/health`
//! - `GET /ws`: `strategy_update` events

mod handlers;
mod websocket;

pub use handlers::{ActionResponse, ApiError, HistoricalQuery, DEFAULT_HISTORY_WINDOW};
pub use websocket::{BroadcastObserver, StreamEvent, BROADCAST_CAPACITY};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::application::runner::StrategyRunner;

#[derive(Clone)]
pub struct AppState {
    pub runner: StrategyRunner,
    /// Same observer the runner publishes into
    pub updates: BroadcastObserver,
    pub start_time: Arc<Instant>,
}

impl AppState {
    pub fn new(runner: StrategyRunner, updates: BroadcastObserver) -> Self {
        Self {
            runner,
            updates,
            start_time: Arc::new(Instant::now()),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/initialize", post(handlers::initialize))
        .route("/api/start", post(handlers::start))
        .route("/api/stop", post(handlers::stop))
        .route("/api/status", get(handlers::status))
        .route("/api/historical", get(handlers::historical))
        .route("/ws", get(websocket::ws_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "HTTP server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

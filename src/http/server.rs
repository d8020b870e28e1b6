//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all handlers
//! - Wire up middleware (tracing, timeouts, body limits)
//! - Serve until the shutdown signal fires

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::broadcast::{BroadcastError, Broadcaster};
use crate::config::RelayConfig;
use crate::http::websocket::ws_handler;
use crate::ingest::{IngestError, IngestPipeline, IngestRequest};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub broadcaster: Broadcaster,
    pub ingest: IngestPipeline,
    pub config: Arc<RelayConfig>,
}

/// HTTP and WebSocket front end of the relay.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: RelayConfig, broadcaster: Broadcaster) -> Self {
        let ingest = IngestPipeline::new(broadcaster.clone(), config.risk.clone());
        let state = AppState {
            broadcaster,
            ingest,
            config: Arc::new(config),
        };
        let router = Self::build_router(&state);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: &AppState) -> Router {
        let config = &state.config;
        let mut router = Router::new()
            .route("/ws", get(ws_handler))
            .route("/events", post(ingest_handler))
            .route("/health", get(health_handler))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state.clone()));
        }

        router.layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(config.server.max_body_size))
                // Innermost: Timeout needs the route's own response body.
                .layer(TimeoutLayer::new(Duration::from_secs(
                    config.server.request_timeout_secs,
                ))),
        )
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The configured router, for serving on a custom listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    clients: usize,
    queue_size: usize,
    processing: bool,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        clients: state.broadcaster.registry().client_count(),
        queue_size: state.broadcaster.queue_size(),
        processing: state.broadcaster.is_running(),
    })
}

async fn ingest_handler(State(state): State<AppState>, Json(request): Json<IngestRequest>) -> Response {
    match state.ingest.process(&request.signature, &request.transaction) {
        Ok(receipt) => (StatusCode::ACCEPTED, Json(receipt)).into_response(),
        Err(IngestError::Broadcast(BroadcastError::QueueFull { id, message_type })) => {
            tracing::warn!(
                signature = %request.signature,
                broadcast_id = %id,
                "Ingest rejected, broadcast queue full"
            );
            let body = serde_json::json!({
                "error": "broadcast queue full",
                "broadcast_id": id,
                "message_type": message_type,
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
        }
    }
}

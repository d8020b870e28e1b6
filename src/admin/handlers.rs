use axum::{extract::State, Json};
use serde::Serialize;

use crate::broadcast::{ClientStats, QueueStats};
use crate::config::RetryMode;
use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub processing: bool,
    pub clients: usize,
    pub queue_size: usize,
    pub max_queue_size: usize,
    pub retry_mode: RetryMode,
    pub risk_enabled: bool,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let broadcaster = &state.broadcaster;
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        processing: broadcaster.is_running(),
        clients: broadcaster.registry().client_count(),
        queue_size: broadcaster.queue_size(),
        max_queue_size: broadcaster.config().max_queue_size,
        retry_mode: broadcaster.config().retry_mode,
        risk_enabled: state.config.risk.enabled,
    })
}

pub async fn get_queue(State(state): State<AppState>) -> Json<QueueStats> {
    Json(state.broadcaster.queue_stats())
}

pub async fn get_clients(State(state): State<AppState>) -> Json<ClientStats> {
    Json(state.broadcaster.client_stats())
}

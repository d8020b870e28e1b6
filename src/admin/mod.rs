//! Admin API.
//!
//! Read-only introspection of the relay, guarded by a bearer token
//! (`admin.api_key`). Only mounted when `admin.enabled` is set.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::{get_clients, get_queue, get_status};
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/queue", get(get_queue))
        .route("/admin/clients", get(get_clients))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}

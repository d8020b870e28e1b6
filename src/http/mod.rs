//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → GET /ws        → websocket.rs (subscribe, protocol.rs messages)
//!     → POST /events   → ingest pipeline → broadcaster
//!     → GET /health
//!     → /admin/*       → admin router (bearer token)
//! ```

pub mod protocol;
pub mod server;
pub mod websocket;

pub use protocol::{ClientMessage, ProtocolError};
pub use server::{AppState, HttpServer};

//! Chain event relay library.
//!
//! Normalizes raw chain transactions into one canonical event shape, scores
//! them for risk, and fans them out to WebSocket subscribers through a bounded
//! broadcast queue with retry.

pub mod admin;
pub mod broadcast;
pub mod config;
pub mod http;
pub mod ingest;
pub mod lifecycle;
pub mod normalizer;
pub mod notify;
pub mod observability;
pub mod risk;
pub mod time;

pub use broadcast::{Broadcaster, ClientRegistry, Target};
pub use config::schema::RelayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use normalizer::{normalize, NormalizedEvent};

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct RelayConfig {
    /// HTTP / WebSocket listener settings.
    pub server: ServerConfig,

    /// Broadcast queue and delivery loop settings.
    pub broadcast: BroadcastConfig,

    /// Risk annotation settings.
    pub risk: RiskConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Outbound frames buffered per client before sends count as failures.
    pub client_buffer_size: usize,

    /// Upper bound for a single WebSocket write, in seconds.
    pub send_timeout_secs: u64,

    /// Request timeout for plain HTTP endpoints, in seconds.
    pub request_timeout_secs: u64,

    /// Maximum ingest body size in bytes.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            client_buffer_size: 256,
            send_timeout_secs: 5,
            request_timeout_secs: 30,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// How a broadcast with failed targets is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RetryMode {
    /// Every sweep re-sends to all original targets, including ones that
    /// already received the broadcast.
    #[default]
    Coarse,
    /// Only targets that have not yet received the broadcast are retried.
    PendingOnly,
}

/// Broadcast queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Maximum number of pending broadcasts (backpressure).
    pub max_queue_size: usize,

    /// Sweeps with failures tolerated before a broadcast is dropped.
    pub max_retries: u32,

    /// Delivery loop interval in milliseconds.
    pub interval_ms: u64,

    pub retry_mode: RetryMode,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 1000,
            max_retries: 3,
            interval_ms: 100,
            retry_mode: RetryMode::Coarse,
        }
    }
}

/// Risk annotation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RiskConfig {
    /// Attach risk scores to ingested events.
    pub enabled: bool,

    /// Program ids that always score as maximally risky.
    pub known_bad_programs: Vec<String>,

    /// Scores at or above this value also go out as alerts to the
    /// `risk-alerts` tag.
    pub alert_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            known_bad_programs: Vec::new(),
            alert_threshold: 0.8,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin endpoints.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

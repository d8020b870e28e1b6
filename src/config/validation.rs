//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! All errors are collected, not just the first.

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::RelayConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration, returning every problem found.
pub fn validate_config(config: &RelayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.client_buffer_size == 0 {
        errors.push(ValidationError::new("server.client_buffer_size", "must be > 0"));
    }
    if config.server.send_timeout_secs == 0 {
        errors.push(ValidationError::new("server.send_timeout_secs", "must be > 0"));
    }
    if config.broadcast.max_queue_size == 0 {
        errors.push(ValidationError::new("broadcast.max_queue_size", "must be > 0"));
    }
    if config.broadcast.max_retries == 0 {
        errors.push(ValidationError::new("broadcast.max_retries", "must be > 0"));
    }
    if config.broadcast.interval_ms == 0 {
        errors.push(ValidationError::new("broadcast.interval_ms", "must be > 0"));
    }
    if !(0.0..=1.0).contains(&config.risk.alert_threshold) {
        errors.push(ValidationError::new("risk.alert_threshold", "must be within [0.0, 1.0]"));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }
    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must be set when admin is enabled"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Structured logging of engine notifications.

use crate::notify::{Listener, Notification};

/// Writes every notification to `tracing` with structured fields.
#[derive(Debug, Default)]
pub struct LogListener;

impl LogListener {
    pub fn new() -> Self {
        Self
    }
}

impl Listener for LogListener {
    fn on_notification(&self, n: &Notification) {
        match n {
            Notification::ClientConnected { client_id, tags } => {
                tracing::info!(client_id = %client_id, tags = ?tags, "Client connected");
            }
            Notification::ClientDisconnected { client_id } => {
                tracing::info!(client_id = %client_id, "Client disconnected");
            }
            Notification::MessageSent { client_id, message_type } => {
                tracing::trace!(client_id = %client_id, message_type = %message_type, "Message sent");
            }
            Notification::SendError { client_id, message_type, reason } => {
                tracing::warn!(
                    client_id = %client_id,
                    message_type = %message_type,
                    reason = %reason,
                    "Send failed"
                );
            }
            Notification::BroadcastQueued { broadcast_id, message_type, target_count } => {
                tracing::debug!(
                    broadcast_id = %broadcast_id,
                    message_type = %message_type,
                    targets = target_count,
                    "Broadcast queued"
                );
            }
            Notification::BroadcastCompleted { broadcast_id, message_type, success_count, retry_count } => {
                tracing::debug!(
                    broadcast_id = %broadcast_id,
                    message_type = %message_type,
                    delivered = success_count,
                    retries = retry_count,
                    "Broadcast completed"
                );
            }
            Notification::QueueFull { broadcast_id, message_type, max_size } => {
                tracing::warn!(
                    broadcast_id = %broadcast_id,
                    message_type = %message_type,
                    max_size = max_size,
                    "Broadcast queue full, rejecting"
                );
            }
            Notification::NoTargets { broadcast_id, message_type } => {
                tracing::debug!(
                    broadcast_id = %broadcast_id,
                    message_type = %message_type,
                    "Broadcast has no targets"
                );
            }
            Notification::MaxRetriesExceeded { broadcast_id, message_type, failed_count, retry_count } => {
                tracing::warn!(
                    broadcast_id = %broadcast_id,
                    message_type = %message_type,
                    failed = failed_count,
                    retries = retry_count,
                    "Broadcast dropped after max retries"
                );
            }
            Notification::ProcessingStarted { interval_ms } => {
                tracing::info!(interval_ms = interval_ms, "Queue processing started");
            }
            Notification::ProcessingStopped => {
                tracing::info!("Queue processing stopped");
            }
            Notification::BroadcasterClosed { code, reason } => {
                tracing::info!(code = code, reason = %reason, "Broadcaster closed");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

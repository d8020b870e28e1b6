//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_clients_connected` (gauge): registered clients
//! - `relay_messages_sent_total` (counter): frames accepted by a sink, by type
//! - `relay_send_errors_total` (counter): failed sends, by reason
//! - `relay_broadcasts_total` (counter): broadcasts by outcome
//!   (queued, completed, dropped, rejected, no_targets)
//! - `relay_queue_size` (gauge): pending broadcasts
//! - `relay_events_ingested_total` (counter): normalized events, by type
//! - `relay_risk_score` (histogram): risk score distribution

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};

use crate::broadcast::ClientRegistry;
use crate::notify::{Listener, Notification, SendFailure};

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to start metrics exporter"),
    }
}

pub fn record_client_count(count: usize) {
    gauge!("relay_clients_connected").set(count as f64);
}

pub fn record_message_sent(message_type: &str) {
    counter!("relay_messages_sent_total", "type" => message_type.to_string()).increment(1);
}

pub fn record_send_error(reason: &SendFailure) {
    let reason = match reason {
        SendFailure::UnknownClient => "unknown_client",
        SendFailure::SinkClosed => "closed",
        SendFailure::Backpressure => "backpressure",
        SendFailure::Serialization(_) => "serialization",
    };
    counter!("relay_send_errors_total", "reason" => reason).increment(1);
}

pub fn record_broadcast(outcome: &'static str) {
    counter!("relay_broadcasts_total", "outcome" => outcome).increment(1);
}

pub fn record_queue_size(size: usize) {
    gauge!("relay_queue_size").set(size as f64);
}

pub fn record_event_ingested(event_type: &str) {
    counter!("relay_events_ingested_total", "type" => event_type.to_string()).increment(1);
}

pub fn record_risk_score(score: f64) {
    histogram!("relay_risk_score").record(score);
}

/// Turns engine notifications into metric updates.
pub struct MetricsListener {
    registry: Weak<ClientRegistry>,
}

impl MetricsListener {
    pub fn new(registry: &Arc<ClientRegistry>) -> Self {
        Self {
            registry: Arc::downgrade(registry),
        }
    }

    fn refresh_client_count(&self) {
        if let Some(registry) = self.registry.upgrade() {
            record_client_count(registry.client_count());
        }
    }
}

impl Listener for MetricsListener {
    fn on_notification(&self, notification: &Notification) {
        match notification {
            Notification::ClientConnected { .. } | Notification::ClientDisconnected { .. } => {
                self.refresh_client_count();
            }
            Notification::MessageSent { message_type, .. } => record_message_sent(message_type),
            Notification::SendError { reason, .. } => record_send_error(reason),
            Notification::BroadcastQueued { .. } => record_broadcast("queued"),
            Notification::BroadcastCompleted { .. } => record_broadcast("completed"),
            Notification::MaxRetriesExceeded { .. } => record_broadcast("dropped"),
            Notification::QueueFull { .. } => record_broadcast("rejected"),
            Notification::NoTargets { .. } => record_broadcast("no_targets"),
            Notification::ProcessingStarted { .. }
            | Notification::ProcessingStopped
            | Notification::BroadcasterClosed { .. } => {}
        }
    }

    fn name(&self) -> &'static str {
        "metrics"
    }
}

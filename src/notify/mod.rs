//! Lifecycle notifications and the listener interface.
//!
//! The registry and broadcaster report everything observable through
//! [`Notification`] values handed to registered [`Listener`]s. The set of
//! notifications is closed, so the engine's side effects can be enumerated.
//!
//! ## Rules
//! - Listeners run inline on the caller's task and must not block.
//! - A panicking listener is isolated: the panic is logged and the remaining
//!   listeners still run.
//! - Listeners can be added at any time; they see notifications emitted after
//!   registration only.

pub mod log;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use uuid::Uuid;

pub use self::log::LogListener;

/// Why a send to a client did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendFailure {
    #[error("client is not registered")]
    UnknownClient,
    #[error("sink is closed")]
    SinkClosed,
    #[error("sink buffer is full")]
    Backpressure,
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Everything the distribution engine reports.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    ClientConnected {
        client_id: String,
        tags: Vec<String>,
    },
    ClientDisconnected {
        client_id: String,
    },
    MessageSent {
        client_id: String,
        message_type: String,
    },
    SendError {
        client_id: String,
        message_type: String,
        reason: SendFailure,
    },
    BroadcastQueued {
        broadcast_id: Uuid,
        message_type: String,
        target_count: usize,
    },
    BroadcastCompleted {
        broadcast_id: Uuid,
        message_type: String,
        success_count: usize,
        retry_count: u32,
    },
    /// The queue was at capacity; the broadcast was not registered.
    QueueFull {
        broadcast_id: Uuid,
        message_type: String,
        max_size: usize,
    },
    /// The target set resolved to no registered clients.
    NoTargets {
        broadcast_id: Uuid,
        message_type: String,
    },
    MaxRetriesExceeded {
        broadcast_id: Uuid,
        message_type: String,
        failed_count: usize,
        retry_count: u32,
    },
    ProcessingStarted {
        interval_ms: u64,
    },
    ProcessingStopped,
    BroadcasterClosed {
        code: u16,
        reason: String,
    },
}

impl Notification {
    /// Short stable name, used as a log tag and metric label.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::ClientConnected { .. } => "client_connected",
            Notification::ClientDisconnected { .. } => "client_disconnected",
            Notification::MessageSent { .. } => "message_sent",
            Notification::SendError { .. } => "send_error",
            Notification::BroadcastQueued { .. } => "broadcast_queued",
            Notification::BroadcastCompleted { .. } => "broadcast_completed",
            Notification::QueueFull { .. } => "queue_full",
            Notification::NoTargets { .. } => "no_targets",
            Notification::MaxRetriesExceeded { .. } => "max_retries_exceeded",
            Notification::ProcessingStarted { .. } => "processing_started",
            Notification::ProcessingStopped => "processing_stopped",
            Notification::BroadcasterClosed { .. } => "broadcaster_closed",
        }
    }
}

/// Observer of engine notifications.
pub trait Listener: Send + Sync + 'static {
    fn on_notification(&self, notification: &Notification);

    /// Name used when reporting a panic from this listener.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Shared, growable set of listeners.
///
/// Cloning is cheap; clones share the same underlying set.
#[derive(Clone, Default)]
pub struct Listeners {
    inner: Arc<RwLock<Vec<Arc<dyn Listener>>>>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn add(&self, listener: Arc<dyn Listener>) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver a notification to every listener.
    pub fn emit(&self, notification: Notification) {
        let listeners = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for listener in listeners {
            let result = catch_unwind(AssertUnwindSafe(|| listener.on_notification(&notification)));
            if result.is_err() {
                tracing::error!(
                    listener = listener.name(),
                    notification = notification.name(),
                    "Listener panicked"
                );
            }
        }
    }
}

/// Listener that keeps every notification, for tests and diagnostics.
#[derive(Default)]
pub struct RecordingListener {
    seen: std::sync::Mutex<Vec<Notification>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything received so far.
    pub fn notifications(&self) -> Vec<Notification> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Count of received notifications with the given name.
    pub fn count(&self, name: &str) -> usize {
        self.notifications().iter().filter(|n| n.name() == name).count()
    }
}

impl Listener for RecordingListener {
    fn on_notification(&self, notification: &Notification) {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Panicky;

    impl Listener for Panicky {
        fn on_notification(&self, _: &Notification) {
            panic!("boom");
        }
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let listeners = Listeners::new();
        let recorder = Arc::new(RecordingListener::new());
        listeners.add(Arc::new(Panicky));
        listeners.add(recorder.clone());

        listeners.emit(Notification::ProcessingStopped);

        assert_eq!(recorder.count("processing_stopped"), 1);
    }

    #[test]
    fn test_clones_share_listeners() {
        let listeners = Listeners::new();
        let clone = listeners.clone();
        clone.add(Arc::new(RecordingListener::new()));
        assert_eq!(listeners.len(), 1);
    }
}

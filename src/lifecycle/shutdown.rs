//! Shutdown coordination.

use tokio::sync::broadcast;

/// Close code sent to clients when the relay stops.
pub const GOING_AWAY: u16 = 1001;

pub const SHUTDOWN_REASON: &str = "server shutting down";

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe and exit once the signal fires. A trigger with
/// no subscribers is dropped.
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Number of tasks still listening.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

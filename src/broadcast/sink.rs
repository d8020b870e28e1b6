//! Per-client send capability.
//!
//! The engine never touches sockets. Each client is an opaque [`ClientSink`]
//! that accepts serialized frames without blocking.

use thiserror::Error;
use tokio::sync::mpsc;

use crate::notify::SendFailure;

/// Why a sink refused a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SinkError {
    #[error("sink is closed")]
    Closed,
    /// The client is not draining its buffer fast enough.
    #[error("sink buffer is full")]
    Backpressure,
}

impl From<SinkError> for SendFailure {
    fn from(err: SinkError) -> Self {
        match err {
            SinkError::Closed => SendFailure::SinkClosed,
            SinkError::Backpressure => SendFailure::Backpressure,
        }
    }
}

/// Opaque transport for one client.
///
/// Implementations must return promptly; a send that cannot complete
/// immediately should fail rather than wait.
pub trait ClientSink: Send + Sync + 'static {
    fn send(&self, frame: &str) -> Result<(), SinkError>;

    /// Ask the transport to close with a WebSocket-style close code.
    fn close(&self, code: u16, reason: &str) -> Result<(), SinkError>;

    fn is_open(&self) -> bool;
}

/// A frame queued for a connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    Text(String),
    Close { code: u16, reason: String },
}

/// Sink backed by a bounded channel drained by the connection's writer task.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<OutboundFrame>,
}

impl ChannelSink {
    /// Create a sink and the receiver its writer task should drain.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    fn push(&self, frame: OutboundFrame) -> Result<(), SinkError> {
        self.tx.try_send(frame).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SinkError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => SinkError::Closed,
        })
    }
}

impl ClientSink for ChannelSink {
    fn send(&self, frame: &str) -> Result<(), SinkError> {
        self.push(OutboundFrame::Text(frame.to_string()))
    }

    fn close(&self, code: u16, reason: &str) -> Result<(), SinkError> {
        self.push(OutboundFrame::Close {
            code,
            reason: reason.to_string(),
        })
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

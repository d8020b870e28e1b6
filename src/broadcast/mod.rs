//! Broadcast subsystem.
//!
//! # Data Flow
//! ```text
//! producer (ingest, admin, application code)
//!     → Broadcaster::enqueue(payload, Target)
//!         → resolve targets against registry (empty set: NoTargets, not queued)
//!         → BroadcastQueue (bounded; full: QueueFull error)
//!     → delivery loop tick (every interval_ms)
//!         → process_queue(): snapshot, send via ClientSink, apply outcomes
//!         → complete | retry | drop after max_retries
//!
//! WebSocket connection
//!     → ClientRegistry::register(id, ChannelSink, tags)
//!     → writer task drains ChannelSink into the socket
//! ```
//!
//! # Design Decisions
//! - Registry is a `DashMap`; queue is a single mutex never held across sends
//! - Sinks never block; a full client buffer counts as a failed send
//! - Coarse retry by default: a retry re-sends to every target
//! - Side effects are reported as `Notification`s, not logged inline

pub mod broadcaster;
pub mod message;
pub mod queue;
pub mod registry;
pub mod sink;

use uuid::Uuid;

pub use broadcaster::{BroadcastError, Broadcaster, SweepReport, Target};
pub use message::{Envelope, Payload};
pub use queue::{BroadcastInfo, QueueStats};
pub use registry::{ClientInfo, ClientRegistry, ClientStats, ConnectionState};
pub use sink::{ChannelSink, ClientSink, OutboundFrame, SinkError};

/// Caller-chosen client identifier.
pub type ClientId = String;

/// Identifier of one broadcast; also the `id` of the envelopes it produces.
pub type BroadcastId = Uuid;

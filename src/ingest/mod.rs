//! Event ingestion.
//!
//! # Data Flow
//! ```text
//! POST /events {signature, transaction}
//!     → normalizer::normalize_value (never fails, degrades to unknown)
//!     → risk::annotate (when risk.enabled)
//!     → Broadcaster::broadcast (all clients, message type "event")
//!     → score ≥ alert_threshold: broadcast_to_tag("risk-alerts", risk_alert)
//! ```
//!
//! # Design Decisions
//! - Only a full queue fails an ingest; the event broadcast is what counts
//! - A rejected risk alert is logged, not surfaced to the producer

pub mod pipeline;

pub use pipeline::{IngestError, IngestPipeline, IngestReceipt, IngestRequest, RISK_ALERT_TAG};

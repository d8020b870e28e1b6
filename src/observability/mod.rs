//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / broadcaster notifications
//!     → notify::LogListener     (structured tracing events)
//!     → MetricsListener         (counters, gauges)
//! ingest pipeline, queue mutations
//!     → metrics.rs record_* helpers
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Metrics are cheap (atomic increments) and safe to record when no
//!   exporter is installed

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::{init_metrics, MetricsListener};

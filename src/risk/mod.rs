//! Risk annotation subsystem.
//!
//! # Data Flow
//! ```text
//! NormalizedEvent
//!     → RiskInput (amount, program id, category)
//!     → scorer.rs (amount / program / category factors, weighted mean)
//!     → RiskScore attached to event metadata
//! ```
//!
//! # Design Decisions
//! - Stateless: scoring is a pure function of the input and config
//! - A missing amount drops its factor from both sides of the mean
//! - Scores never fail; every input produces a level

pub mod scorer;
pub mod types;

pub use scorer::{annotate, score, score_with};
pub use types::{RiskFactor, RiskInput, RiskLevel, RiskScore};

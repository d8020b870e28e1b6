//! Risk scoring types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Five-level partition of the score range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Minimal,
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket a score: <0.2 minimal, <0.4 low, <0.6 medium, <0.8 high, else critical.
    pub fn from_score(score: f64) -> Self {
        if score < 0.2 {
            RiskLevel::Minimal
        } else if score < 0.4 {
            RiskLevel::Low
        } else if score < 0.6 {
            RiskLevel::Medium
        } else if score < 0.8 {
            RiskLevel::High
        } else {
            RiskLevel::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Minimal => "MINIMAL",
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One weighted contributor to a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub name: String,
    pub weight: f64,
    /// Factor value in [0.0, 1.0].
    pub value: f64,
    pub description: String,
}

/// Result of scoring one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// Weighted mean of the factors, clamped to [0.0, 1.0].
    pub score: f64,
    pub level: RiskLevel,
    pub factors: Vec<RiskFactor>,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
}

/// The event attributes the scorer looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskInput {
    /// Base-unit amount; `None` excludes the amount factor.
    pub amount: Option<u128>,
    /// Program id, or the `"unknown"` sentinel.
    pub program_id: String,
    /// Snake-case category such as `transfer` or `flash_loan`.
    pub category: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_thresholds() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Minimal);
        assert_eq!(RiskLevel::from_score(0.2), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.59), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(0.6), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::Critical);
    }

    #[test]
    fn test_level_serde() {
        assert_eq!(serde_json::to_string(&RiskLevel::Critical).unwrap(), "\"CRITICAL\"");
        assert!(RiskLevel::High > RiskLevel::Medium);
    }
}

//! Weighted-factor risk scoring.

use crate::config::RiskConfig;
use crate::normalizer::{NormalizedEvent, EventType};
use crate::risk::types::{RiskFactor, RiskInput, RiskLevel, RiskScore};
use crate::time::now_millis;

pub const AMOUNT_WEIGHT: f64 = 0.30;
pub const PROGRAM_WEIGHT: f64 = 0.35;
pub const CATEGORY_WEIGHT: f64 = 0.35;

/// Program id used when the event's program could not be determined.
pub const UNKNOWN_PROGRAM: &str = "unknown";

const LARGE_AMOUNT: u128 = 1_000_000_000;
const VERY_LARGE_AMOUNT: u128 = 1_000_000_000_000;

impl From<&NormalizedEvent> for RiskInput {
    fn from(event: &NormalizedEvent) -> Self {
        let program_id = if event.program_id.is_empty() || event.event_type == EventType::Unknown {
            UNKNOWN_PROGRAM.to_string()
        } else {
            event.program_id.clone()
        };
        // Provider annotations may name a finer category, e.g. "flash_loan".
        let category = event
            .metadata
            .extra
            .get("category")
            .and_then(|c| c.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| event.event_type.category().to_string());

        Self {
            amount: event.amount_value(),
            program_id,
            category,
        }
    }
}

/// Score with no known-bad programs configured.
pub fn score(input: &RiskInput) -> RiskScore {
    score_with(input, &RiskConfig::default())
}

/// Score using the configured program reputation list.
pub fn score_with(input: &RiskInput, config: &RiskConfig) -> RiskScore {
    let mut factors = Vec::with_capacity(3);

    if let Some(amount) = input.amount {
        factors.push(amount_factor(amount));
    }
    factors.push(program_factor(&input.program_id, config));
    factors.push(category_factor(&input.category));

    let total_weight: f64 = factors.iter().map(|f| f.weight).sum();
    let weighted: f64 = factors.iter().map(|f| f.weight * f.value).sum();
    let score = if total_weight > 0.0 {
        (weighted / total_weight).clamp(0.0, 1.0)
    } else {
        0.0
    };

    RiskScore {
        score,
        level: RiskLevel::from_score(score),
        factors,
        timestamp: now_millis(),
    }
}

/// Return a copy of `event` with its risk score attached to the metadata.
pub fn annotate(event: &NormalizedEvent, config: &RiskConfig) -> NormalizedEvent {
    let mut annotated = event.clone();
    annotated.metadata.risk = Some(score_with(&RiskInput::from(event), config));
    annotated
}

fn amount_factor(amount: u128) -> RiskFactor {
    let (value, description) = if amount == 0 {
        (0.7, "zero-value transaction")
    } else if amount >= VERY_LARGE_AMOUNT {
        (0.9, "very large amount")
    } else if amount >= LARGE_AMOUNT {
        (0.5, "large amount")
    } else {
        (0.1, "ordinary amount")
    };
    RiskFactor {
        name: "amount".to_string(),
        weight: AMOUNT_WEIGHT,
        value,
        description: description.to_string(),
    }
}

fn program_factor(program_id: &str, config: &RiskConfig) -> RiskFactor {
    let (value, description) = if config.known_bad_programs.iter().any(|p| p == program_id) {
        (1.0, "program is on the known-bad list")
    } else if program_id == UNKNOWN_PROGRAM {
        (0.8, "program could not be identified")
    } else {
        (0.2, "program has no adverse reputation")
    };
    RiskFactor {
        name: "program".to_string(),
        weight: PROGRAM_WEIGHT,
        value,
        description: description.to_string(),
    }
}

fn category_factor(category: &str) -> RiskFactor {
    let value = match category {
        "flash_loan" => 0.9,
        "liquidation" => 0.8,
        "unknown" => 0.6,
        "token_swap" | "swap" => 0.5,
        "program_interaction" => 0.4,
        "nft_mint" | "token_mint" | "token_burn" | "nft_burn" => 0.3,
        _ => 0.1,
    };
    RiskFactor {
        name: "event_type".to_string(),
        weight: CATEGORY_WEIGHT,
        value,
        description: format!("event category '{}'", category),
    }
}

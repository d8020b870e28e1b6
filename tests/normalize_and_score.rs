//! Normalization and risk scoring through the public API.

use chain_relay::config::RiskConfig;
use chain_relay::normalizer::{enrich_event, normalize_value, EventStatus, EventType};
use chain_relay::risk::{annotate, score, RiskInput, RiskLevel};
use serde_json::{json, Map};

mod common;
use common::{system_transfer, unknown_program_tx};

#[test]
fn test_system_transfer_event() {
    let event = normalize_value(&system_transfer(5_000_000), "sig1");

    assert_eq!(event.event_type, EventType::Transfer);
    assert_eq!(event.amount.as_deref(), Some("5000000"));
    assert_eq!(event.from.as_deref(), Some("Payer111"));
    assert_eq!(event.to.as_deref(), Some("Dest222"));
    assert_eq!(event.status, EventStatus::Success);
    assert_eq!(event.id, "sig1:250000000");
    assert_eq!(event.timestamp_millis, 1_700_000_000_000);

    let wire = serde_json::to_value(&event).unwrap();
    assert_eq!(wire["type"], "transfer");
    assert_eq!(wire["feePayer"], "Payer111");
}

#[test]
fn test_only_first_instruction_classifies() {
    // The system transfer in second position is not considered.
    let event = normalize_value(&unknown_program_tx(), "sig2");

    assert_eq!(event.event_type, EventType::Unknown);
    assert_eq!(event.from.as_deref(), Some("Payer111"));
    assert!(event.amount.is_none());
    assert_eq!(event.instructions.len(), 2);
}

#[test]
fn test_flash_loan_at_unknown_program_scores_high() {
    let risk = score(&RiskInput {
        amount: Some(0),
        program_id: "unknown".into(),
        category: "flash_loan".into(),
    });

    assert!(risk.score >= 0.7);
    assert!(matches!(risk.level, RiskLevel::High | RiskLevel::Critical));
    assert_eq!(risk.factors.len(), 3);
}

#[test]
fn test_annotated_category_from_enrichment() {
    let event = normalize_value(&unknown_program_tx(), "sig3");
    let mut extra = Map::new();
    extra.insert("category".into(), json!("flash_loan"));
    let enriched = enrich_event(&event, extra);

    let plain = annotate(&event, &RiskConfig::default());
    let flagged = annotate(&enriched, &RiskConfig::default());

    let plain_score = plain.metadata.risk.unwrap().score;
    let flagged_score = flagged.metadata.risk.unwrap().score;
    assert!(flagged_score > plain_score);
    assert!(event.metadata.risk.is_none());
}

#[test]
fn test_known_bad_program_from_config() {
    let event = normalize_value(&system_transfer(1), "sig4");
    let config = RiskConfig {
        known_bad_programs: vec![event.program_id.clone()],
        ..RiskConfig::default()
    };

    let base = annotate(&event, &RiskConfig::default()).metadata.risk.unwrap();
    let bad = annotate(&event, &config).metadata.risk.unwrap();
    assert!(bad.score > base.score);
}

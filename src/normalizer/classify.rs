//! Event type classification.
//!
//! Rules are evaluated in a fixed order against the **first** instruction of
//! the transaction only. Later instructions never influence the result.

use serde_json::Value;

use crate::normalizer::programs::{self, ProgramKind};
use crate::normalizer::types::{EventType, RawInstruction};

/// Outcome of classifying a transaction.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Classification {
    pub event_type: EventType,
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
    pub mint: Option<String>,
    pub sub_type: Option<String>,
}

impl Classification {
    fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            from: None,
            to: None,
            amount: None,
            mint: None,
            sub_type: None,
        }
    }

    fn unknown(fee_payer: &str) -> Self {
        Self {
            from: Some(fee_payer.to_string()),
            ..Self::new(EventType::Unknown)
        }
    }
}

/// Classify a transaction from its first instruction.
pub(crate) fn classify(first: Option<&RawInstruction>, fee_payer: &str) -> Classification {
    let Some(ix) = first else {
        return Classification::unknown(fee_payer);
    };
    let Some(program) = programs::resolve(ix.program_id.as_deref(), ix.program.as_deref()) else {
        return Classification::unknown(fee_payer);
    };
    let name = ix.parsed_type().unwrap_or_default();

    let matched = match (program.kind, name) {
        (ProgramKind::System, "transfer" | "transferWithSeed") => Some(Classification {
            from: ix.info_str("source"),
            to: ix.info_str("destination"),
            amount: ix.info().and_then(|info| amount_string(info.get("lamports"))),
            ..Classification::new(EventType::Transfer)
        }),
        (ProgramKind::Token, "transfer" | "transferChecked") => Some(Classification {
            from: ix.info_str("source"),
            to: ix.info_str("destination"),
            amount: token_amount(ix),
            mint: ix.info_str("mint"),
            ..Classification::new(EventType::TokenTransfer)
        }),
        (ProgramKind::Token, "mintTo" | "mintToChecked") => Some(Classification {
            to: ix.info_str("account"),
            amount: token_amount(ix),
            mint: ix.info_str("mint"),
            ..Classification::new(EventType::TokenMint)
        }),
        (ProgramKind::Token, "burn" | "burnChecked") => Some(Classification {
            from: ix.info_str("account"),
            amount: token_amount(ix),
            mint: ix.info_str("mint"),
            ..Classification::new(EventType::TokenBurn)
        }),
        (ProgramKind::Metadata, n) if is_metadata_write(n) => Some(Classification {
            from: Some(fee_payer.to_string()),
            mint: ix.info_str("mint"),
            ..Classification::new(EventType::NftMint)
        }),
        (ProgramKind::Stake, "delegate") => Some(Classification {
            from: ix.info_str("stakeAccount"),
            to: ix.info_str("voteAccount"),
            ..Classification::new(EventType::Stake)
        }),
        (ProgramKind::Stake, "deactivate") => Some(Classification {
            from: ix.info_str("stakeAccount"),
            ..Classification::new(EventType::Unstake)
        }),
        (ProgramKind::Vote, _) => Some(Classification {
            from: ix.info_str("voteAccount"),
            ..Classification::new(EventType::Vote)
        }),
        _ => None,
    };

    matched.unwrap_or_else(|| Classification {
        from: Some(fee_payer.to_string()),
        sub_type: Some(program.name.to_string()),
        ..Classification::new(EventType::ProgramInteraction)
    })
}

fn is_metadata_write(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("create") || lower.starts_with("update")
}

/// Token amount from `info.amount` or `info.tokenAmount.amount`.
fn token_amount(ix: &RawInstruction) -> Option<String> {
    let info = ix.info()?;
    amount_string(info.get("amount"))
        .or_else(|| amount_string(info.get("tokenAmount").and_then(|t| t.get("amount"))))
}

/// Providers send amounts as JSON numbers or decimal strings.
fn amount_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalizer::programs::{
        COMPUTE_BUDGET_PROGRAM, METADATA_PROGRAM, STAKE_PROGRAM, SYSTEM_PROGRAM, TOKEN_PROGRAM,
    };
    use serde_json::json;

    fn parsed(program_id: &str, parsed: Value) -> RawInstruction {
        RawInstruction {
            program_id: Some(program_id.to_string()),
            parsed: Some(parsed),
            ..Default::default()
        }
    }

    #[test]
    fn test_token_transfer_checked_uses_token_amount() {
        let ix = parsed(
            TOKEN_PROGRAM,
            json!({"type": "transferChecked", "info": {
                "source": "S", "destination": "D", "mint": "M",
                "tokenAmount": {"amount": "42", "decimals": 6}
            }}),
        );
        let c = classify(Some(&ix), "payer");
        assert_eq!(c.event_type, EventType::TokenTransfer);
        assert_eq!(c.amount.as_deref(), Some("42"));
        assert_eq!(c.mint.as_deref(), Some("M"));
    }

    #[test]
    fn test_mint_and_burn() {
        let mint = parsed(TOKEN_PROGRAM, json!({"type": "mintTo", "info": {"mint": "M", "account": "A", "amount": "7"}}));
        let c = classify(Some(&mint), "payer");
        assert_eq!(c.event_type, EventType::TokenMint);
        assert_eq!(c.to.as_deref(), Some("A"));

        let burn = parsed(TOKEN_PROGRAM, json!({"type": "burn", "info": {"mint": "M", "account": "A", "amount": "3"}}));
        let c = classify(Some(&burn), "payer");
        assert_eq!(c.event_type, EventType::TokenBurn);
        assert_eq!(c.from.as_deref(), Some("A"));
        assert_eq!(c.amount.as_deref(), Some("3"));
    }

    #[test]
    fn test_stake_delegate_and_deactivate() {
        let delegate = parsed(STAKE_PROGRAM, json!({"type": "delegate", "info": {"stakeAccount": "S", "voteAccount": "V"}}));
        let c = classify(Some(&delegate), "payer");
        assert_eq!(c.event_type, EventType::Stake);
        assert_eq!(c.to.as_deref(), Some("V"));

        let deactivate = parsed(STAKE_PROGRAM, json!({"type": "deactivate", "info": {"stakeAccount": "S"}}));
        assert_eq!(classify(Some(&deactivate), "payer").event_type, EventType::Unstake);
    }

    #[test]
    fn test_metadata_create_is_nft_mint() {
        let ix = parsed(METADATA_PROGRAM, json!({"type": "createMetadataAccountV3", "info": {"mint": "M"}}));
        let c = classify(Some(&ix), "payer");
        assert_eq!(c.event_type, EventType::NftMint);
        assert_eq!(c.mint.as_deref(), Some("M"));
    }

    #[test]
    fn test_recognized_program_without_rule_is_interaction() {
        let ix = RawInstruction {
            program_id: Some(COMPUTE_BUDGET_PROGRAM.to_string()),
            data: Some("3DTZbgwsozUF".to_string()),
            ..Default::default()
        };
        let c = classify(Some(&ix), "payer");
        assert_eq!(c.event_type, EventType::ProgramInteraction);
        assert_eq!(c.sub_type.as_deref(), Some("compute_budget"));
        assert_eq!(c.from.as_deref(), Some("payer"));
    }

    #[test]
    fn test_system_instruction_other_than_transfer() {
        let ix = parsed(SYSTEM_PROGRAM, json!({"type": "createAccount", "info": {}}));
        let c = classify(Some(&ix), "payer");
        assert_eq!(c.event_type, EventType::ProgramInteraction);
        assert_eq!(c.sub_type.as_deref(), Some("system"));
    }

    #[test]
    fn test_no_instructions_is_unknown() {
        let c = classify(None, "payer");
        assert_eq!(c.event_type, EventType::Unknown);
        assert_eq!(c.from.as_deref(), Some("payer"));
    }

    #[test]
    fn test_numeric_token_amount() {
        let ix = parsed(TOKEN_PROGRAM, json!({"type": "transfer", "info": {"source": "S", "destination": "D", "amount": 99}}));
        assert_eq!(classify(Some(&ix), "p").amount.as_deref(), Some("99"));
    }
}

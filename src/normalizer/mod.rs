//! Event normalization subsystem.
//!
//! # Data Flow
//! ```text
//! provider payload (serde_json::Value)
//!     → types.rs (RawTransaction, lenient deserialization)
//!     → mod.rs (fee payer, fee, status, instruction flattening)
//!     → classify.rs (event type from the first instruction)
//!     → NormalizedEvent
//! ```
//!
//! # Design Decisions
//! - Normalization is total: malformed or unrecognized input degrades to an
//!   `unknown` event, it never returns an error
//! - Only the first instruction drives classification
//! - All helpers are pure and return new values; inputs are never mutated

pub mod classify;
pub mod programs;
pub mod types;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::time::now_millis;
use self::classify::classify;

pub use types::{
    AccountKey, EventMetadata, EventStatus, EventType, InstructionEvent, NormalizedEvent,
    RawInstruction, RawTransaction,
};

/// `parsed.info` keys that carry account addresses.
const ACCOUNT_FIELDS: &[&str] = &[
    "source",
    "destination",
    "authority",
    "account",
    "mint",
    "mintAuthority",
    "owner",
    "newAccount",
    "stakeAccount",
    "stakeAuthority",
    "voteAccount",
    "voteAuthority",
    "wallet",
];

/// Sort direction for [`sort_by_timestamp`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Normalize a provider transaction into the canonical event shape.
pub fn normalize(raw: &RawTransaction, signature: &str) -> NormalizedEvent {
    let message = &raw.transaction.message;
    let fee_payer = message
        .account_keys
        .first()
        .map(|k| k.pubkey().to_string())
        .unwrap_or_default();

    let (status, fee) = match &raw.meta {
        Some(meta) if meta.err.is_some() => (EventStatus::Failed, meta.fee),
        Some(meta) => (EventStatus::Success, meta.fee),
        None => (EventStatus::Pending, 0),
    };

    let instructions: Vec<InstructionEvent> = message
        .instructions
        .iter()
        .enumerate()
        .map(|(index, ix)| flatten_instruction(index, ix))
        .collect();

    let classification = classify(message.instructions.first(), &fee_payer);

    let timestamp_millis = raw
        .block_time
        .and_then(|secs| u64::try_from(secs).ok())
        .and_then(|secs| secs.checked_mul(1000))
        .unwrap_or_else(now_millis);

    NormalizedEvent {
        id: event_id(signature, raw.slot),
        event_type: classification.event_type,
        timestamp_millis,
        slot: raw.slot,
        signature: signature.to_string(),
        status,
        from: classification.from,
        to: classification.to,
        amount: classification.amount,
        mint: classification.mint,
        program_id: instructions
            .first()
            .map(|ix| ix.program_id.clone())
            .unwrap_or_default(),
        instructions,
        fee,
        fee_payer,
        metadata: EventMetadata {
            sub_type: classification.sub_type,
            ..Default::default()
        },
    }
}

/// Normalize an opaque provider payload.
///
/// A payload that does not have the transaction shape yields an `unknown`
/// event with `pending` status.
pub fn normalize_value(raw: &Value, signature: &str) -> NormalizedEvent {
    match RawTransaction::deserialize_lenient(raw) {
        Ok(tx) => normalize(&tx, signature),
        Err(e) => {
            tracing::warn!(signature = %signature, error = %e, "Unrecognized transaction payload");
            normalize(&RawTransaction::default(), signature)
        }
    }
}

/// Normalize a sequence of `(transaction, signature)` pairs, preserving order.
pub fn normalize_batch<'a, I>(items: I) -> Vec<NormalizedEvent>
where
    I: IntoIterator<Item = (&'a RawTransaction, &'a str)>,
{
    items
        .into_iter()
        .map(|(raw, signature)| normalize(raw, signature))
        .collect()
}

/// Return a copy of `event` with `extra` merged into its metadata.
///
/// Typed keys (`subType`, `risk`) are routed to their fields when they
/// deserialize; everything else lands in the extension map.
pub fn enrich_event(event: &NormalizedEvent, extra: Map<String, Value>) -> NormalizedEvent {
    let mut enriched = event.clone();
    for (key, value) in extra {
        match key.as_str() {
            "subType" => {
                if let Some(s) = value.as_str() {
                    enriched.metadata.sub_type = Some(s.to_string());
                    continue;
                }
            }
            "risk" => {
                if let Ok(risk) = serde_json::from_value(value.clone()) {
                    enriched.metadata.risk = Some(risk);
                    continue;
                }
            }
            _ => {}
        }
        enriched.metadata.extra.insert(key, value);
    }
    enriched
}

/// Events of the given type, in input order.
pub fn filter_by_type(events: &[NormalizedEvent], event_type: EventType) -> Vec<NormalizedEvent> {
    events
        .iter()
        .filter(|e| e.event_type == event_type)
        .cloned()
        .collect()
}

/// Events in which `address` participates, in input order.
pub fn filter_by_address(events: &[NormalizedEvent], address: &str) -> Vec<NormalizedEvent> {
    events
        .iter()
        .filter(|e| e.involves(address))
        .cloned()
        .collect()
}

/// A stably sorted copy of `events`.
pub fn sort_by_timestamp(events: &[NormalizedEvent], order: SortOrder) -> Vec<NormalizedEvent> {
    let mut sorted = events.to_vec();
    match order {
        SortOrder::Ascending => sorted.sort_by_key(|e| e.timestamp_millis),
        SortOrder::Descending => sorted.sort_by(|a, b| b.timestamp_millis.cmp(&a.timestamp_millis)),
    }
    sorted
}

fn event_id(signature: &str, slot: u64) -> String {
    format!("{}:{}", signature, slot)
}

fn flatten_instruction(index: usize, ix: &RawInstruction) -> InstructionEvent {
    let program_id = ix
        .program_id
        .clone()
        .or_else(|| {
            programs::resolve(None, ix.program.as_deref()).map(|p| p.id.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string());

    let mut accounts = ix.accounts.clone();
    if let Some(info) = ix.info() {
        for field in ACCOUNT_FIELDS {
            if let Some(address) = info.get(*field).and_then(Value::as_str) {
                if !accounts.iter().any(|a| a == address) {
                    accounts.push(address.to_string());
                }
            }
        }
    }

    InstructionEvent {
        index,
        program_id,
        instruction_type: ix.parsed_type().unwrap_or("unknown").to_string(),
        parsed: ix.parsed.clone(),
        data: ix.data.clone(),
        accounts,
    }
}

impl RawTransaction {
    /// Deserialize from a JSON value, accepting `getTransaction` results with
    /// or without the JSON-RPC `result` wrapper.
    pub fn deserialize_lenient(value: &Value) -> Result<Self, serde_json::Error> {
        let inner = value.get("result").filter(|r| r.is_object()).unwrap_or(value);
        if !inner.is_object() {
            return Err(serde::de::Error::custom("transaction payload is not an object"));
        }
        RawTransaction::deserialize(inner)
    }
}

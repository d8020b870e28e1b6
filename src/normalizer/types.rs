//! Canonical event schema and the raw provider shapes it is built from.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::risk::RiskScore;

/// Closed set of event categories produced by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Transfer,
    TokenTransfer,
    TokenMint,
    TokenBurn,
    TokenSwap,
    NftTransfer,
    NftMint,
    NftBurn,
    Stake,
    Unstake,
    Vote,
    ProgramInteraction,
    Unknown,
}

impl EventType {
    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Transfer => "transfer",
            EventType::TokenTransfer => "tokenTransfer",
            EventType::TokenMint => "tokenMint",
            EventType::TokenBurn => "tokenBurn",
            EventType::TokenSwap => "tokenSwap",
            EventType::NftTransfer => "nftTransfer",
            EventType::NftMint => "nftMint",
            EventType::NftBurn => "nftBurn",
            EventType::Stake => "stake",
            EventType::Unstake => "unstake",
            EventType::Vote => "vote",
            EventType::ProgramInteraction => "programInteraction",
            EventType::Unknown => "unknown",
        }
    }

    /// Snake-case category label used by risk scoring and metrics.
    pub fn category(&self) -> &'static str {
        match self {
            EventType::Transfer => "transfer",
            EventType::TokenTransfer => "token_transfer",
            EventType::TokenMint => "token_mint",
            EventType::TokenBurn => "token_burn",
            EventType::TokenSwap => "token_swap",
            EventType::NftTransfer => "nft_transfer",
            EventType::NftMint => "nft_mint",
            EventType::NftBurn => "nft_burn",
            EventType::Stake => "stake",
            EventType::Unstake => "unstake",
            EventType::Vote => "vote",
            EventType::ProgramInteraction => "program_interaction",
            EventType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution outcome of the source transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    Success,
    Failed,
    /// The provider supplied no execution metadata yet.
    Pending,
}

/// One flattened instruction of a transaction, in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstructionEvent {
    pub index: usize,
    pub program_id: String,
    /// Parsed instruction name, or `"unknown"` for opaque instructions.
    #[serde(rename = "type")]
    pub instruction_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed: Option<Value>,
    /// Raw instruction data as delivered by the provider (base58).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default)]
    pub accounts: Vec<String>,
}

/// Enrichment attached to an event after normalization.
///
/// Known fields are typed; provider annotations land in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetadata {
    /// Program name for `programInteraction` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk: Option<RiskScore>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Canonical representation of one chain occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedEvent {
    /// `"{signature}:{slot}"`, stable across re-normalization.
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub timestamp_millis: u64,
    pub slot: u64,
    pub signature: String,
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    /// Base-unit amount as a decimal string (lamports or raw token units).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
    pub program_id: String,
    pub instructions: Vec<InstructionEvent>,
    pub fee: u64,
    pub fee_payer: String,
    #[serde(default)]
    pub metadata: EventMetadata,
}

impl NormalizedEvent {
    /// Amount parsed as an integer, if present and numeric.
    pub fn amount_value(&self) -> Option<u128> {
        self.amount.as_deref().and_then(|a| a.parse::<u128>().ok())
    }

    /// Returns true if `address` takes part in this event.
    pub fn involves(&self, address: &str) -> bool {
        self.from.as_deref() == Some(address)
            || self.to.as_deref() == Some(address)
            || self.fee_payer == address
            || self
                .instructions
                .iter()
                .any(|ix| ix.accounts.iter().any(|a| a == address))
    }
}

// ---------------------------------------------------------------------------
// Raw provider payloads (JSON-RPC `getTransaction` with `jsonParsed` encoding)
// ---------------------------------------------------------------------------

/// Field deserializer that falls back to the default on a type mismatch, so
/// one bad field does not discard the rest of the payload.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// A transaction as returned by the chain-data provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTransaction {
    #[serde(deserialize_with = "lenient")]
    pub slot: u64,
    /// Block time in seconds since the epoch.
    #[serde(deserialize_with = "lenient")]
    pub block_time: Option<i64>,
    #[serde(deserialize_with = "lenient")]
    pub meta: Option<RawMeta>,
    #[serde(deserialize_with = "lenient")]
    pub transaction: RawTransactionBody,
}

/// Execution metadata reported by the provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMeta {
    /// Non-null when execution failed.
    pub err: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    pub fee: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTransactionBody {
    #[serde(deserialize_with = "lenient")]
    pub signatures: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub message: RawMessage,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMessage {
    #[serde(deserialize_with = "lenient")]
    pub account_keys: Vec<AccountKey>,
    #[serde(deserialize_with = "lenient")]
    pub instructions: Vec<RawInstruction>,
}

/// Account keys arrive either as bare strings or as parsed objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccountKey {
    Plain(String),
    Parsed {
        pubkey: String,
        #[serde(default)]
        signer: bool,
        #[serde(default)]
        writable: bool,
    },
}

impl AccountKey {
    pub fn pubkey(&self) -> &str {
        match self {
            AccountKey::Plain(key) => key,
            AccountKey::Parsed { pubkey, .. } => pubkey,
        }
    }
}

/// One instruction, parsed or opaque.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawInstruction {
    #[serde(deserialize_with = "lenient")]
    pub program_id: Option<String>,
    /// Provider label for parsed instructions (e.g. "system", "spl-token").
    #[serde(deserialize_with = "lenient")]
    pub program: Option<String>,
    pub parsed: Option<Value>,
    #[serde(deserialize_with = "lenient")]
    pub data: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub accounts: Vec<String>,
}

impl RawInstruction {
    /// Instruction name from `parsed.type`.
    pub fn parsed_type(&self) -> Option<&str> {
        self.parsed.as_ref()?.get("type")?.as_str()
    }

    /// The `parsed.info` object.
    pub fn info(&self) -> Option<&Map<String, Value>> {
        self.parsed.as_ref()?.get("info")?.as_object()
    }

    /// A string field of `parsed.info`.
    pub fn info_str(&self, key: &str) -> Option<String> {
        self.info()?.get(key)?.as_str().map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_key_forms() {
        let keys: Vec<AccountKey> =
            serde_json::from_value(json!(["A", {"pubkey": "B", "signer": true}])).unwrap();
        assert_eq!(keys[0].pubkey(), "A");
        assert_eq!(keys[1].pubkey(), "B");
    }

    #[test]
    fn test_event_type_wire_names() {
        let json = serde_json::to_string(&EventType::ProgramInteraction).unwrap();
        assert_eq!(json, "\"programInteraction\"");
        assert_eq!(EventType::TokenSwap.category(), "token_swap");
    }

    #[test]
    fn test_metadata_extra_is_flattened() {
        let mut metadata = EventMetadata::default();
        metadata.extra.insert("provider".into(), json!("helius"));
        let value = serde_json::to_value(&metadata).unwrap();
        assert_eq!(value, json!({"provider": "helius"}));
    }
}

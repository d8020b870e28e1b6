//! Shared utilities for integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chain_relay::broadcast::{ClientSink, SinkError};
use chain_relay::normalizer::programs::SYSTEM_PROGRAM;

/// Sink that keeps every frame it accepts.
#[derive(Default)]
pub struct RecordingSink {
    frames: Mutex<Vec<String>>,
    closed: Mutex<Option<(u16, String)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn frames(&self) -> Vec<Value> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .map(|f| serde_json::from_str(f).unwrap())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn closed_with(&self) -> Option<(u16, String)> {
        self.closed.lock().unwrap().clone()
    }
}

impl ClientSink for RecordingSink {
    fn send(&self, frame: &str) -> Result<(), SinkError> {
        self.frames.lock().unwrap().push(frame.to_string());
        Ok(())
    }

    fn close(&self, code: u16, reason: &str) -> Result<(), SinkError> {
        *self.closed.lock().unwrap() = Some((code, reason.to_string()));
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.closed.lock().unwrap().is_none()
    }
}

/// Sink whose sends always fail, counting attempts.
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

impl FailingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl ClientSink for FailingSink {
    fn send(&self, _frame: &str) -> Result<(), SinkError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(SinkError::Backpressure)
    }

    fn close(&self, _code: u16, _reason: &str) -> Result<(), SinkError> {
        Err(SinkError::Closed)
    }

    fn is_open(&self) -> bool {
        true
    }
}

/// `getTransaction` payload for a system transfer of `lamports`.
pub fn system_transfer(lamports: u64) -> Value {
    json!({
        "slot": 250_000_000u64,
        "blockTime": 1_700_000_000i64,
        "meta": {"err": null, "fee": 5000},
        "transaction": {
            "signatures": ["sig1"],
            "message": {
                "accountKeys": [
                    {"pubkey": "Payer111", "signer": true, "writable": true},
                    "Dest222",
                    SYSTEM_PROGRAM
                ],
                "instructions": [{
                    "program": "system",
                    "programId": SYSTEM_PROGRAM,
                    "parsed": {"type": "transfer", "info": {
                        "source": "Payer111", "destination": "Dest222", "lamports": lamports
                    }}
                }]
            }
        }
    })
}

/// Payload whose first instruction targets an unrecognized program.
pub fn unknown_program_tx() -> Value {
    json!({
        "slot": 42,
        "meta": {"err": null, "fee": 5000},
        "transaction": {"message": {
            "accountKeys": ["Payer111", "Prog999"],
            "instructions": [
                {"programId": "Prog999", "accounts": ["Payer111"], "data": "3Bxs4h24hBtQy9rw"},
                {
                    "program": "system",
                    "programId": SYSTEM_PROGRAM,
                    "parsed": {"type": "transfer", "info": {
                        "source": "Payer111", "destination": "Dest222", "lamports": 10
                    }}
                }
            ]
        }}
    })
}

//! Normalize, score and publish incoming transactions.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::broadcast::message::RiskAlert;
use crate::broadcast::{BroadcastError, BroadcastId, Broadcaster, Payload};
use crate::config::RiskConfig;
use crate::normalizer::{normalize_value, EventType, NormalizedEvent};
use crate::observability::metrics;
use crate::risk::annotate;

/// Tag that receives `risk_alert` messages.
pub const RISK_ALERT_TAG: &str = "risk-alerts";

/// Body of `POST /events`.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub signature: String,
    /// Provider transaction payload, optionally wrapped in a JSON-RPC envelope.
    pub transaction: Value,
}

/// What happened to one ingested transaction.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    pub event_id: String,
    pub event_type: EventType,
    pub broadcast_id: BroadcastId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_id: Option<BroadcastId>,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Broadcast(#[from] BroadcastError),
}

/// Turns raw provider payloads into broadcasts.
#[derive(Clone)]
pub struct IngestPipeline {
    broadcaster: Broadcaster,
    risk: RiskConfig,
}

impl IngestPipeline {
    pub fn new(broadcaster: Broadcaster, risk: RiskConfig) -> Self {
        Self { broadcaster, risk }
    }

    /// Normalize a raw transaction and publish it.
    pub fn process(&self, signature: &str, raw: &Value) -> Result<IngestReceipt, IngestError> {
        let event = normalize_value(raw, signature);
        metrics::record_event_ingested(event.event_type.as_str());
        tracing::debug!(
            event_id = %event.id,
            event_type = %event.event_type,
            "Event normalized"
        );
        self.publish(event)
    }

    /// Score (if enabled) and broadcast an already normalized event.
    pub fn publish(&self, event: NormalizedEvent) -> Result<IngestReceipt, IngestError> {
        let event = if self.risk.enabled {
            annotate(&event, &self.risk)
        } else {
            event
        };

        let risk = event.metadata.risk.clone();
        let event_id = event.id.clone();
        let event_type = event.event_type;
        let signature = event.signature.clone();

        let broadcast_id = self.broadcaster.broadcast(Payload::event(event))?;

        let mut alert_id = None;
        if let Some(risk) = &risk {
            metrics::record_risk_score(risk.score);
            if risk.score >= self.risk.alert_threshold {
                let alert = Payload::RiskAlert(RiskAlert {
                    event_id: event_id.clone(),
                    signature,
                    event_type,
                    risk: risk.clone(),
                });
                match self.broadcaster.broadcast_to_tag(RISK_ALERT_TAG, alert) {
                    Ok(id) => {
                        tracing::info!(
                            event_id = %event_id,
                            score = risk.score,
                            level = risk.level.as_str(),
                            "Risk alert raised"
                        );
                        alert_id = Some(id);
                    }
                    Err(e) => {
                        tracing::warn!(event_id = %event_id, error = %e, "Risk alert rejected");
                    }
                }
            }
        }

        Ok(IngestReceipt {
            event_id,
            event_type,
            broadcast_id,
            risk_score: risk.map(|r| r.score),
            alert_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ChannelSink;
    use crate::config::BroadcastConfig;
    use crate::notify::{Listeners, RecordingListener};
    use serde_json::json;
    use std::sync::Arc;

    fn unknown_tx() -> Value {
        json!({
            "slot": 10,
            "meta": {"err": null, "fee": 5000},
            "transaction": {"message": {
                "accountKeys": ["Payer111", "Prog999"],
                "instructions": [{"programId": "Prog999", "accounts": ["Payer111"], "data": "3Bxs"}]
            }}
        })
    }

    fn pipeline(risk: RiskConfig, max_queue_size: usize) -> (IngestPipeline, Broadcaster, Arc<RecordingListener>) {
        let listeners = Listeners::new();
        let recorder = Arc::new(RecordingListener::new());
        listeners.add(recorder.clone());
        let broadcaster = Broadcaster::new(
            BroadcastConfig {
                max_queue_size,
                ..BroadcastConfig::default()
            },
            listeners,
        );
        (IngestPipeline::new(broadcaster.clone(), risk), broadcaster, recorder)
    }

    #[test]
    fn test_event_is_scored_and_queued() {
        let (pipeline, broadcaster, _) = pipeline(RiskConfig::default(), 10);
        let (sink, _rx) = ChannelSink::new(8);
        broadcaster.registry().register("c1", Arc::new(sink), Vec::<String>::new());

        let receipt = pipeline.process("sig", &unknown_tx()).unwrap();

        assert_eq!(receipt.event_id, "sig:10");
        assert_eq!(receipt.event_type, EventType::Unknown);
        assert!(receipt.risk_score.is_some());
        assert!(receipt.alert_id.is_none());
        assert_eq!(broadcaster.queue_size(), 1);
    }

    #[test]
    fn test_high_score_raises_alert_for_tag() {
        let risk = RiskConfig {
            alert_threshold: 0.5,
            ..RiskConfig::default()
        };
        let (pipeline, broadcaster, _) = pipeline(risk, 10);
        let (watcher, _rx) = ChannelSink::new(8);
        broadcaster.registry().register("w", Arc::new(watcher), [RISK_ALERT_TAG]);

        let receipt = pipeline.process("sig", &unknown_tx()).unwrap();

        assert!(receipt.alert_id.is_some());
        let types: Vec<String> = broadcaster
            .queue_stats()
            .broadcasts
            .into_iter()
            .map(|b| b.message_type)
            .collect();
        assert_eq!(types, vec!["event".to_string(), "risk_alert".to_string()]);
    }

    #[test]
    fn test_disabled_risk_skips_scoring() {
        let risk = RiskConfig {
            enabled: false,
            ..RiskConfig::default()
        };
        let (pipeline, _, recorder) = pipeline(risk, 10);

        let receipt = pipeline.process("sig", &unknown_tx()).unwrap();

        assert!(receipt.risk_score.is_none());
        assert_eq!(recorder.count("no_targets"), 1);
    }

    #[test]
    fn test_full_queue_fails_ingest() {
        let (pipeline, broadcaster, _) = pipeline(RiskConfig::default(), 1);
        let (sink, _rx) = ChannelSink::new(8);
        broadcaster.registry().register("c1", Arc::new(sink), Vec::<String>::new());

        pipeline.process("a", &unknown_tx()).unwrap();
        let err = pipeline.process("b", &unknown_tx()).unwrap_err();
        assert!(matches!(err, IngestError::Broadcast(BroadcastError::QueueFull { .. })));
    }
}

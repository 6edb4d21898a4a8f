use crate::domain::command::{Priority, TransactionType, VerificationType};
use crate::domain::transaction::ProcessingStage;
use crate::security::{event_signature, SigningKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const AGGREGATE_TYPE: &str = "bond_transaction";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Fraud,
    Compliance,
    Operational,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    Created {
        bond_id: Uuid,
        payment_reference: Option<String>,
        transaction_type: TransactionType,
        amount_minor: i64,
        priority: Priority,
        metadata: BTreeMap<String, serde_json::Value>,
    },
    ProcessingStarted {
        stage: ProcessingStage,
    },
    Verified {
        verification_type: VerificationType,
        confidence: f64,
        verified_by: String,
    },
    Completed {
        settlement_reference: Option<String>,
    },
    Failed {
        reason: String,
        kind: FailureKind,
    },
    Retried {
        attempt: u32,
    },
    Cancelled {
        reason: String,
        cancelled_by: String,
    },
    Reserved {
        amount_minor: i64,
    },
    Released {
        amount_minor: i64,
    },
    #[serde(other)]
    Unknown,
}

impl EventPayload {
    pub fn event_type(&self) -> &'static str {
        match self {
            EventPayload::Created { .. } => "transaction.created",
            EventPayload::ProcessingStarted { .. } => "transaction.processing_started",
            EventPayload::Verified { .. } => "transaction.verified",
            EventPayload::Completed { .. } => "transaction.completed",
            EventPayload::Failed { .. } => "transaction.failed",
            EventPayload::Retried { .. } => "transaction.retried",
            EventPayload::Cancelled { .. } => "transaction.cancelled",
            EventPayload::Reserved { .. } => "transaction.reserved",
            EventPayload::Released { .. } => "transaction.released",
            EventPayload::Unknown => "transaction.unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
    pub version: u64,
    pub signature: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub aggregate_type: String,
    pub payload: EventPayload,
    pub metadata: EventMetadata,
}

impl EventRecord {
    pub fn new(
        aggregate_id: Uuid,
        version: u64,
        payload: EventPayload,
        correlation_id: Uuid,
        causation_id: Option<Uuid>,
        key: &SigningKey,
    ) -> Self {
        let event_id = Uuid::new_v4();
        let event_type = payload.event_type().to_string();
        let payload_json = serde_json::to_string(&payload).unwrap_or_default();
        let signature = event_signature(key, event_id, aggregate_id, &event_type, version, &payload_json);

        Self {
            event_id,
            event_type,
            aggregate_id,
            aggregate_type: AGGREGATE_TYPE.to_string(),
            payload,
            metadata: EventMetadata {
                correlation_id,
                causation_id,
                timestamp: Utc::now(),
                version,
                signature,
            },
        }
    }

    pub fn verify_signature(&self, key: &SigningKey) -> bool {
        let payload_json = serde_json::to_string(&self.payload).unwrap_or_default();
        let expected = event_signature(
            key,
            self.event_id,
            self.aggregate_id,
            &self.event_type,
            self.metadata.version,
            &payload_json,
        );
        expected == self.metadata.signature
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_event_types_deserialize_to_unknown() {
        let raw = serde_json::json!({ "type": "transaction.snapshot_taken", "extra": 1 });
        let payload: EventPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(payload, EventPayload::Unknown);
    }

    #[test]
    fn event_signature_detects_tampering() {
        let key = SigningKey::from_secret("test-secret");
        let event = EventRecord::new(
            Uuid::new_v4(),
            1,
            EventPayload::Reserved { amount_minor: 500 },
            Uuid::new_v4(),
            None,
            &key,
        );
        assert!(event.verify_signature(&key));

        let mut tampered = event.clone();
        tampered.payload = EventPayload::Reserved { amount_minor: 50_000 };
        assert!(!tampered.verify_signature(&key));
    }
}

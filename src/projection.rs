use crate::domain::command::TransactionType;
use crate::domain::error::StoreError;
use crate::domain::transaction::{ProcessingStage, TransactionStatus};
use crate::event::{EventPayload, EventRecord};
use crate::risk::types::TransactionHistory;
use crate::store::EventStore;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionProjection {
    pub transaction_id: Uuid,
    pub bond_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount_minor: i64,
    pub status: TransactionStatus,
    pub processing_stage: ProcessingStage,
    pub risk_score: Option<f64>,
    pub verification_confidence: Option<f64>,
    pub retry_count: u32,
    pub last_event_version: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub last_updated_at: DateTime<Utc>,
}

impl TransactionProjection {
    pub fn empty(transaction_id: Uuid) -> Self {
        Self {
            transaction_id,
            bond_id: Uuid::nil(),
            transaction_type: TransactionType::Payment,
            amount_minor: 0,
            status: TransactionStatus::Pending,
            processing_stage: ProcessingStage::Initialized,
            risk_score: None,
            verification_confidence: None,
            retry_count: 0,
            last_event_version: 0,
            created_at: None,
            last_updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Dropped,
}

pub fn apply_event(row: &mut TransactionProjection, event: &EventRecord) -> ApplyOutcome {
    let expected = row.last_event_version + 1;
    if event.metadata.version != expected {
        tracing::warn!(
            aggregate_id = %event.aggregate_id,
            incoming_version = event.metadata.version,
            expected_version = expected,
            "dropping duplicate or out-of-order projection event"
        );
        return ApplyOutcome::Dropped;
    }

    match &event.payload {
        EventPayload::Created {
            bond_id,
            transaction_type,
            amount_minor,
            ..
        } => {
            row.bond_id = *bond_id;
            row.transaction_type = *transaction_type;
            row.amount_minor = *amount_minor;
            row.status = TransactionStatus::Pending;
            row.processing_stage = ProcessingStage::Initialized;
            row.created_at = Some(event.metadata.timestamp);
        }
        EventPayload::ProcessingStarted { stage } => {
            row.status = TransactionStatus::Processing;
            row.processing_stage = *stage;
        }
        EventPayload::Verified { confidence, .. } => {
            row.status = TransactionStatus::Verified;
            row.processing_stage = ProcessingStage::Verified;
            row.verification_confidence = Some(*confidence);
        }
        EventPayload::Completed { .. } => {
            row.status = TransactionStatus::Completed;
            row.processing_stage = ProcessingStage::Completed;
        }
        EventPayload::Failed { .. } => {
            row.status = TransactionStatus::Failed;
            row.processing_stage = ProcessingStage::Failed;
            row.retry_count += 1;
        }
        EventPayload::Retried { .. } => {
            row.status = TransactionStatus::Pending;
            row.processing_stage = ProcessingStage::Initialized;
        }
        EventPayload::Cancelled { .. } => {
            row.status = TransactionStatus::Cancelled;
        }
        EventPayload::Reserved { .. } | EventPayload::Released { .. } | EventPayload::Unknown => {}
    }

    row.last_event_version = event.metadata.version;
    row.last_updated_at = Utc::now();
    ApplyOutcome::Applied
}

#[derive(Clone, Default)]
pub struct ProjectionStore {
    rows: Arc<Mutex<HashMap<Uuid, TransactionProjection>>>,
}

impl ProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&self, event: &EventRecord) -> ApplyOutcome {
        let mut rows = self.rows.lock();
        let row = rows
            .entry(event.aggregate_id)
            .or_insert_with(|| TransactionProjection::empty(event.aggregate_id));
        apply_event(row, event)
    }

    pub fn set_risk_score(&self, transaction_id: Uuid, score: f64) {
        let mut rows = self.rows.lock();
        if let Some(row) = rows.get_mut(&transaction_id) {
            row.risk_score = Some(score);
            row.last_updated_at = Utc::now();
        }
    }

    pub fn get(&self, transaction_id: Uuid) -> Option<TransactionProjection> {
        self.rows.lock().get(&transaction_id).cloned()
    }

    pub fn history(
        &self,
        bond_id: Uuid,
        transaction_type: TransactionType,
        since: DateTime<Utc>,
    ) -> TransactionHistory {
        let rows = self.rows.lock();
        let mut history = TransactionHistory::default();
        for row in rows.values() {
            if row.bond_id != bond_id || row.transaction_type != transaction_type {
                continue;
            }
            if !row.created_at.is_some_and(|at| at >= since) {
                continue;
            }
            history.attempts += 1;
            if row.status == TransactionStatus::Failed || row.retry_count > 0 {
                history.failures += 1;
            }
        }
        history
    }

    pub async fn rebuild(&self, store: &EventStore) -> Result<usize, StoreError> {
        let mut by_aggregate: HashMap<Uuid, Vec<EventRecord>> = HashMap::new();
        for event in store.load_since(DateTime::<Utc>::MIN_UTC, None).await? {
            by_aggregate.entry(event.aggregate_id).or_default().push(event);
        }

        let mut rebuilt = HashMap::new();
        for (aggregate_id, mut events) in by_aggregate {
            events.sort_by_key(|e| e.metadata.version);
            let mut row = TransactionProjection::empty(aggregate_id);
            for event in &events {
                apply_event(&mut row, event);
            }
            rebuilt.insert(aggregate_id, row);
        }

        let count = rebuilt.len();
        *self.rows.lock() = rebuilt;
        Ok(count)
    }
}

use crate::domain::command::{Priority, TransactionCommand, TransactionType};
use crate::domain::transaction::{FinancialImpact, ProcessingStage, TransactionStatus};
use crate::event::{EventPayload, EventRecord};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionState {
    pub transaction_id: Uuid,
    pub bond_id: Uuid,
    pub payment_reference: Option<String>,
    pub transaction_type: TransactionType,
    pub amount_minor: i64,
    pub priority: Priority,
    pub status: TransactionStatus,
    pub processing_stage: ProcessingStage,
    pub financial_impact: FinancialImpact,
    pub created_at: Option<DateTime<Utc>>,
    pub processing_at: Option<DateTime<Utc>>,
    pub verified_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub failed_at: Option<DateTime<Utc>>,
    pub held_minor: i64,
    pub retry_count: u32,
    pub verification_confidence: Option<f64>,
    pub last_failure_reason: Option<String>,
    pub version: u64,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl TransactionState {
    pub fn empty(transaction_id: Uuid) -> Self {
        Self {
            transaction_id,
            bond_id: Uuid::nil(),
            payment_reference: None,
            transaction_type: TransactionType::Payment,
            amount_minor: 0,
            priority: Priority::Normal,
            status: TransactionStatus::Pending,
            processing_stage: ProcessingStage::Initialized,
            financial_impact: FinancialImpact::assess(0, TransactionType::Payment),
            created_at: None,
            processing_at: None,
            verified_at: None,
            completed_at: None,
            failed_at: None,
            held_minor: 0,
            retry_count: 0,
            verification_confidence: None,
            last_failure_reason: None,
            version: 0,
            metadata: BTreeMap::new(),
        }
    }

    pub fn draft(command: &TransactionCommand) -> Self {
        Self {
            bond_id: command.bond_id,
            payment_reference: command.payment_reference.clone(),
            transaction_type: command.transaction_type,
            amount_minor: command.amount_minor,
            priority: command.priority,
            financial_impact: FinancialImpact::assess(command.amount_minor, command.transaction_type),
            created_at: Some(command.timestamp),
            metadata: command.metadata.clone(),
            ..Self::empty(command.transaction_id.unwrap_or_else(Uuid::new_v4))
        }
    }

    pub fn from_events(transaction_id: Uuid, events: &[EventRecord]) -> Self {
        let mut state = Self::empty(transaction_id);
        for event in events {
            state = state.apply(event);
        }
        state
    }

    pub fn exists(&self) -> bool {
        self.version > 0
    }

    pub fn apply(self, event: &EventRecord) -> Self {
        let at = event.metadata.timestamp;
        let version = self.version + 1;
        match &event.payload {
            EventPayload::Created {
                bond_id,
                payment_reference,
                transaction_type,
                amount_minor,
                priority,
                metadata,
            } => Self {
                bond_id: *bond_id,
                payment_reference: payment_reference.clone(),
                transaction_type: *transaction_type,
                amount_minor: *amount_minor,
                priority: *priority,
                status: TransactionStatus::Pending,
                processing_stage: ProcessingStage::Initialized,
                financial_impact: FinancialImpact::assess(*amount_minor, *transaction_type),
                created_at: Some(at),
                metadata: metadata.clone(),
                version,
                ..self
            },
            EventPayload::ProcessingStarted { stage } => Self {
                status: TransactionStatus::Processing,
                processing_stage: *stage,
                processing_at: Some(at),
                version,
                ..self
            },
            EventPayload::Verified { confidence, .. } => Self {
                status: TransactionStatus::Verified,
                processing_stage: ProcessingStage::Verified,
                verification_confidence: Some(*confidence),
                verified_at: Some(at),
                version,
                ..self
            },
            EventPayload::Completed { .. } => Self {
                status: TransactionStatus::Completed,
                processing_stage: ProcessingStage::Completed,
                completed_at: Some(at),
                version,
                ..self
            },
            EventPayload::Failed { reason, .. } => Self {
                status: TransactionStatus::Failed,
                processing_stage: ProcessingStage::Failed,
                retry_count: self.retry_count + 1,
                last_failure_reason: Some(reason.clone()),
                failed_at: Some(at),
                version,
                ..self
            },
            EventPayload::Retried { .. } => Self {
                status: TransactionStatus::Pending,
                processing_stage: ProcessingStage::Initialized,
                version,
                ..self
            },
            EventPayload::Cancelled { .. } => Self {
                status: TransactionStatus::Cancelled,
                version,
                ..self
            },
            EventPayload::Reserved { amount_minor } => Self {
                held_minor: self.held_minor + amount_minor,
                version,
                ..self
            },
            EventPayload::Released { amount_minor } => Self {
                held_minor: (self.held_minor - amount_minor).max(0),
                version,
                ..self
            },
            EventPayload::Unknown => Self { version, ..self },
        }
    }
}

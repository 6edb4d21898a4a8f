use crate::domain::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Payment,
    Refund,
    Forfeiture,
    Adjustment,
    Reversal,
    Correction,
}

impl TransactionType {
    pub fn max_amount_minor(&self) -> i64 {
        match self {
            TransactionType::Payment | TransactionType::Forfeiture => 1_000_000,
            TransactionType::Refund | TransactionType::Reversal => 500_000,
            TransactionType::Adjustment | TransactionType::Correction => 100_000,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TransactionType::Payment => "payment",
            TransactionType::Refund => "refund",
            TransactionType::Forfeiture => "forfeiture",
            TransactionType::Adjustment => "adjustment",
            TransactionType::Reversal => "reversal",
            TransactionType::Correction => "correction",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    FraudDetection,
    ComplianceCheck,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCommand {
    pub bond_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub payment_reference: Option<String>,
    pub transaction_type: TransactionType,
    pub amount_minor: i64,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub priority: Priority,
    pub timestamp: DateTime<Utc>,
    pub request_id: Uuid,
    pub correlation_id: Uuid,
    pub causation_id: Option<Uuid>,
    pub verification_type: Option<VerificationType>,
}

impl TransactionCommand {
    pub fn derive(&self, transaction_type: TransactionType, amount_minor: i64) -> CommandDraft {
        CommandDraft::new(self.bond_id, transaction_type, amount_minor)
            .correlation_id(self.correlation_id)
            .causation_id(self.request_id)
            .priority(self.priority)
    }

    pub fn with_metadata(&self, key: &str, value: serde_json::Value) -> TransactionCommand {
        let mut next = self.clone();
        next.metadata.insert(key.to_string(), value);
        next
    }
}

#[derive(Debug, Clone)]
pub struct CommandDraft {
    bond_id: Option<Uuid>,
    transaction_id: Option<Uuid>,
    payment_reference: Option<String>,
    transaction_type: Option<TransactionType>,
    amount_minor: i64,
    metadata: BTreeMap<String, serde_json::Value>,
    priority: Priority,
    timestamp: Option<DateTime<Utc>>,
    correlation_id: Option<Uuid>,
    causation_id: Option<Uuid>,
    verification_type: Option<VerificationType>,
}

impl CommandDraft {
    pub fn new(bond_id: Uuid, transaction_type: TransactionType, amount_minor: i64) -> Self {
        Self {
            bond_id: Some(bond_id),
            transaction_id: None,
            payment_reference: None,
            transaction_type: Some(transaction_type),
            amount_minor,
            metadata: BTreeMap::new(),
            priority: Priority::Normal,
            timestamp: None,
            correlation_id: None,
            causation_id: None,
            verification_type: None,
        }
    }

    pub fn transaction_id(mut self, transaction_id: Uuid) -> Self {
        self.transaction_id = Some(transaction_id);
        self
    }

    pub fn payment_reference(mut self, reference: impl Into<String>) -> Self {
        self.payment_reference = Some(reference.into());
        self
    }

    pub fn metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn causation_id(mut self, causation_id: Uuid) -> Self {
        self.causation_id = Some(causation_id);
        self
    }

    pub fn verification_type(mut self, verification_type: VerificationType) -> Self {
        self.verification_type = Some(verification_type);
        self
    }

    pub fn build(self) -> Result<TransactionCommand, ValidationError> {
        let bond_id = self.bond_id.ok_or(ValidationError::MissingField("bond_id"))?;
        if bond_id.is_nil() {
            return Err(ValidationError::MissingField("bond_id"));
        }
        let transaction_type = self
            .transaction_type
            .ok_or(ValidationError::MissingField("transaction_type"))?;
        if self.amount_minor <= 0 {
            return Err(ValidationError::NonPositiveAmount);
        }
        let correlation_id = self.correlation_id.unwrap_or_else(Uuid::new_v4);
        if correlation_id.is_nil() {
            return Err(ValidationError::MissingCorrelation);
        }

        Ok(TransactionCommand {
            bond_id,
            transaction_id: self.transaction_id,
            payment_reference: self.payment_reference,
            transaction_type,
            amount_minor: self.amount_minor,
            metadata: self.metadata,
            priority: self.priority,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
            request_id: Uuid::new_v4(),
            correlation_id,
            causation_id: self.causation_id,
            verification_type: self.verification_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_rejects_non_positive_amount() {
        let draft = CommandDraft::new(Uuid::new_v4(), TransactionType::Payment, 0);
        assert_eq!(draft.build().unwrap_err(), ValidationError::NonPositiveAmount);
    }

    #[test]
    fn build_rejects_nil_bond() {
        let draft = CommandDraft::new(Uuid::nil(), TransactionType::Payment, 100);
        assert_eq!(
            draft.build().unwrap_err(),
            ValidationError::MissingField("bond_id")
        );
    }

    #[test]
    fn derived_command_carries_correlation_chain() {
        let parent = CommandDraft::new(Uuid::new_v4(), TransactionType::Payment, 5_000)
            .build()
            .unwrap();
        let child = parent
            .derive(TransactionType::Refund, 2_500)
            .build()
            .unwrap();

        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.causation_id, Some(parent.request_id));
        assert_ne!(child.request_id, parent.request_id);
    }

    #[test]
    fn ceilings_by_type() {
        assert_eq!(TransactionType::Payment.max_amount_minor(), 1_000_000);
        assert_eq!(TransactionType::Refund.max_amount_minor(), 500_000);
        assert_eq!(TransactionType::Correction.max_amount_minor(), 100_000);
    }
}

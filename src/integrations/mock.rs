use crate::domain::command::TransactionType;
use crate::integrations::{
    BondDirectory, BondStatus, BondSummary, ComplianceEngine, ComplianceOutcome, EventPublisher,
    FraudAnalyzer, FraudVerdict, PaymentLookup, PaymentSummary, PredictiveModel, VerificationData,
};
use crate::risk::types::RiskFeatures;
use crate::state::TransactionState;
use anyhow::Result;
use std::collections::BTreeMap;
use tokio::sync::mpsc;
use uuid::Uuid;

pub struct MockBondDirectory {
    pub behavior: String,
}

#[async_trait::async_trait]
impl BondDirectory for MockBondDirectory {
    async fn find_active_or_pending(&self, bond_id: Uuid) -> Result<Option<BondSummary>> {
        let summary = match self.behavior.as_str() {
            "MISSING" => None,
            "PENDING" => Some(BondSummary {
                bond_id,
                status: BondStatus::Pending,
                principal_minor: 2_500_000,
            }),
            _ => Some(BondSummary {
                bond_id,
                status: BondStatus::Active,
                principal_minor: 2_500_000,
            }),
        };
        Ok(summary)
    }
}

pub struct MockPaymentLookup {
    pub amount_minor: i64,
    pub behavior: String,
}

#[async_trait::async_trait]
impl PaymentLookup for MockPaymentLookup {
    async fn find_completed(&self, reference: &str) -> Result<Option<PaymentSummary>> {
        let summary = match self.behavior.as_str() {
            "MISSING" => None,
            "INCOMPLETE" => Some(PaymentSummary {
                reference: reference.to_string(),
                amount_minor: self.amount_minor,
                completed: false,
            }),
            _ => Some(PaymentSummary {
                reference: reference.to_string(),
                amount_minor: self.amount_minor,
                completed: true,
            }),
        };
        Ok(summary)
    }
}

pub struct MockPredictiveModel {
    pub score: f64,
}

#[async_trait::async_trait]
impl PredictiveModel for MockPredictiveModel {
    async fn predict(&self, _features: &RiskFeatures) -> Result<f64> {
        Ok(self.score)
    }
}

pub struct MockComplianceEngine {
    pub behavior: String,
}

#[async_trait::async_trait]
impl ComplianceEngine for MockComplianceEngine {
    async fn validate(
        &self,
        _amount_minor: i64,
        _transaction_type: TransactionType,
        _metadata: &BTreeMap<String, serde_json::Value>,
    ) -> Result<ComplianceOutcome> {
        let outcome = match self.behavior.as_str() {
            "NON_COMPLIANT" => ComplianceOutcome {
                compliant: false,
                errors: vec!["sanctions screening unresolved".to_string()],
            },
            _ => ComplianceOutcome {
                compliant: true,
                errors: Vec::new(),
            },
        };
        Ok(outcome)
    }
}

pub struct MockFraudAnalyzer {
    pub behavior: String,
    pub confidence: f64,
}

#[async_trait::async_trait]
impl FraudAnalyzer for MockFraudAnalyzer {
    async fn analyze(&self, _state: &TransactionState, _data: &VerificationData) -> Result<FraudVerdict> {
        let verdict = match self.behavior.as_str() {
            "FLAG_FRAUD" => FraudVerdict {
                success: false,
                confidence: self.confidence,
                reason: Some("velocity pattern flagged by fraud engine".to_string()),
            },
            _ => FraudVerdict {
                success: true,
                confidence: self.confidence,
                reason: None,
            },
        };
        Ok(verdict)
    }
}

#[derive(Debug, Clone)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: serde_json::Value,
}

pub struct ChannelPublisher {
    tx: mpsc::UnboundedSender<PublishedMessage>,
}

impl ChannelPublisher {
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<PublishedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait::async_trait]
impl EventPublisher for ChannelPublisher {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()> {
        self.tx
            .send(PublishedMessage {
                topic: topic.to_string(),
                payload,
            })
            .map_err(|_| anyhow::anyhow!("publish channel closed"))?;
        Ok(())
    }
}

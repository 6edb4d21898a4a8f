use crate::domain::command::{TransactionType, VerificationType};
use crate::risk::types::RiskFeatures;
use crate::state::TransactionState;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub mod mock;
pub mod redis_publisher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BondStatus {
    Active,
    Pending,
}

#[derive(Debug, Clone)]
pub struct BondSummary {
    pub bond_id: Uuid,
    pub status: BondStatus,
    pub principal_minor: i64,
}

#[derive(Debug, Clone)]
pub struct PaymentSummary {
    pub reference: String,
    pub amount_minor: i64,
    pub completed: bool,
}

#[derive(Debug, Clone)]
pub struct ComplianceOutcome {
    pub compliant: bool,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct VerificationData {
    pub verification_type: VerificationType,
    pub notes: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct FraudVerdict {
    pub success: bool,
    pub confidence: f64,
    pub reason: Option<String>,
}

#[async_trait::async_trait]
pub trait BondDirectory: Send + Sync {
    async fn find_active_or_pending(&self, bond_id: Uuid) -> Result<Option<BondSummary>>;
}

#[async_trait::async_trait]
pub trait PaymentLookup: Send + Sync {
    async fn find_completed(&self, reference: &str) -> Result<Option<PaymentSummary>>;
}

#[async_trait::async_trait]
pub trait PredictiveModel: Send + Sync {
    async fn predict(&self, features: &RiskFeatures) -> Result<f64>;
}

#[async_trait::async_trait]
pub trait ComplianceEngine: Send + Sync {
    async fn validate(
        &self,
        amount_minor: i64,
        transaction_type: TransactionType,
        metadata: &BTreeMap<String, serde_json::Value>,
    ) -> Result<ComplianceOutcome>;
}

#[async_trait::async_trait]
pub trait FraudAnalyzer: Send + Sync {
    async fn analyze(&self, state: &TransactionState, data: &VerificationData) -> Result<FraudVerdict>;
}

#[async_trait::async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<()>;
}

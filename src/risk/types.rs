use crate::domain::command::{Priority, TransactionType};
use crate::domain::transaction::ProcessingStage;
use crate::risk::engine::clamp01;
use crate::state::TransactionState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct RiskWeights {
    pub amount_weight: f64,
    pub type_weight: f64,
    pub stage_weight: f64,
    pub history_weight: f64,
    pub temporal_weight: f64,
    pub metadata_weight: f64,
    pub behavioral_weight: f64,
    pub predictive_share: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            amount_weight: 0.20,
            type_weight: 0.15,
            stage_weight: 0.10,
            history_weight: 0.20,
            temporal_weight: 0.10,
            metadata_weight: 0.10,
            behavioral_weight: 0.15,
            predictive_share: 0.30,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionHistory {
    pub attempts: u64,
    pub failures: u64,
}

impl TransactionHistory {
    pub fn failure_rate(&self) -> Option<f64> {
        if self.attempts == 0 {
            None
        } else {
            Some(clamp01(self.failures as f64 / self.attempts as f64))
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskBreakdown {
    pub amount_risk: f64,
    pub type_risk: f64,
    pub stage_risk: f64,
    pub history_risk: f64,
    pub temporal_risk: f64,
    pub metadata_risk: f64,
    pub behavioral_risk: f64,
    pub traditional_score: f64,
    pub predictive_score: f64,
    pub final_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: f64,
    pub breakdown: RiskBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct RiskFeatures {
    pub amount_minor: i64,
    pub transaction_type: TransactionType,
    pub stage: ProcessingStage,
    pub priority: Priority,
    pub retry_count: u32,
    pub historical_failure_rate: f64,
}

impl RiskFeatures {
    pub fn from_state(state: &TransactionState, history: &TransactionHistory) -> Self {
        Self {
            amount_minor: state.amount_minor,
            transaction_type: state.transaction_type,
            stage: state.processing_stage,
            priority: state.priority,
            retry_count: state.retry_count,
            historical_failure_rate: history.failure_rate().unwrap_or(0.5),
        }
    }
}

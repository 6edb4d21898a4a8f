use crate::domain::command::TransactionType;
use crate::domain::transaction::ProcessingStage;
use crate::risk::types::{RiskAssessment, RiskBreakdown, RiskWeights, TransactionHistory};
use crate::state::TransactionState;
use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

pub fn clamp01(v: f64) -> f64 {
    if v < 0.0 {
        0.0
    } else if v > 1.0 {
        1.0
    } else {
        v
    }
}

pub fn amount_risk(amount_minor: i64) -> f64 {
    if amount_minor < 5_000 {
        0.1
    } else if amount_minor < 50_000 {
        0.3
    } else if amount_minor < 250_000 {
        0.5
    } else if amount_minor < 750_000 {
        0.7
    } else {
        0.9
    }
}

pub fn type_risk(transaction_type: TransactionType) -> f64 {
    match transaction_type {
        TransactionType::Payment => 0.2,
        TransactionType::Refund => 0.4,
        TransactionType::Adjustment | TransactionType::Correction => 0.5,
        TransactionType::Reversal => 0.6,
        TransactionType::Forfeiture => 0.7,
    }
}

pub fn stage_risk(stage: ProcessingStage) -> f64 {
    match stage {
        ProcessingStage::Initialized => 0.3,
        ProcessingStage::Processing => 0.5,
        ProcessingStage::Verified => 0.2,
        ProcessingStage::Completed => 0.1,
        ProcessingStage::Failed => 0.9,
    }
}

pub fn history_risk(history: &TransactionHistory) -> f64 {
    history.failure_rate().unwrap_or(0.5)
}

pub fn temporal_risk(occurred_at: Option<DateTime<Utc>>) -> f64 {
    let Some(at) = occurred_at else {
        return 0.1;
    };

    let mut score = 0.1;
    let hour = at.hour();
    if !(6..22).contains(&hour) {
        score += 0.4;
    }
    if matches!(at.weekday(), Weekday::Sat | Weekday::Sun) {
        score += 0.3;
    }
    clamp01(score)
}

pub fn metadata_risk(state: &TransactionState) -> f64 {
    let mut score = 0.0;
    if flag_set(state, "automated") {
        score += 0.3;
    }
    if state.retry_count > 2 {
        score += 0.3;
    }
    if state.metadata.contains_key("client_ip") || state.metadata.contains_key("ip_address") {
        score += 0.2;
    }
    clamp01(score)
}

pub fn behavioral_risk(state: &TransactionState) -> f64 {
    let mut score = 0.0;
    for flag in ["unusual_timing", "unusual_amount", "high_frequency", "context_flags"] {
        if flag_set(state, flag) {
            score += 0.25;
        }
    }
    clamp01(score)
}

fn flag_set(state: &TransactionState, key: &str) -> bool {
    match state.metadata.get(key) {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Array(items)) => !items.is_empty(),
        Some(serde_json::Value::String(s)) => !s.is_empty(),
        Some(serde_json::Value::Number(n)) => n.as_f64().unwrap_or(0.0) != 0.0,
        _ => false,
    }
}

pub fn calculate_financial_risk(
    state: &TransactionState,
    history: &TransactionHistory,
    predictive_score: f64,
    weights: &RiskWeights,
) -> RiskAssessment {
    let amount = amount_risk(state.amount_minor);
    let transaction_type = type_risk(state.transaction_type);
    let stage = stage_risk(state.processing_stage);
    let historical = history_risk(history);
    let temporal = temporal_risk(state.created_at);
    let metadata = metadata_risk(state);
    let behavioral = behavioral_risk(state);

    let traditional = clamp01(
        weights.amount_weight * amount
            + weights.type_weight * transaction_type
            + weights.stage_weight * stage
            + weights.history_weight * historical
            + weights.temporal_weight * temporal
            + weights.metadata_weight * metadata
            + weights.behavioral_weight * behavioral,
    );

    let predictive = clamp01(predictive_score);
    let final_score = clamp01(
        (1.0 - weights.predictive_share) * traditional + weights.predictive_share * predictive,
    );

    RiskAssessment {
        score: final_score,
        breakdown: RiskBreakdown {
            amount_risk: amount,
            type_risk: transaction_type,
            stage_risk: stage,
            history_risk: historical,
            temporal_risk: temporal,
            metadata_risk: metadata,
            behavioral_risk: behavioral,
            traditional_score: traditional,
            predictive_score: predictive,
            final_score,
        },
    }
}

use crate::domain::command::TransactionType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Verified,
    Completed,
    Failed,
    Cancelled,
}

impl TransactionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStage {
    Initialized,
    Processing,
    Verified,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactCategory {
    Minor,
    Standard,
    Material,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClass {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityImpact {
    Negligible,
    Moderate,
    Severe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceRequirement {
    Kyc,
    Aml,
    SanctionsScreening,
    ManualReview,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialImpact {
    pub category: ImpactCategory,
    pub risk_class: RiskClass,
    pub liquidity_impact: LiquidityImpact,
    pub compliance: Vec<ComplianceRequirement>,
}

impl FinancialImpact {
    pub fn assess(amount_minor: i64, transaction_type: TransactionType) -> Self {
        let category = if amount_minor < 5_000 {
            ImpactCategory::Minor
        } else if amount_minor < 100_000 {
            ImpactCategory::Standard
        } else if amount_minor < 500_000 {
            ImpactCategory::Material
        } else {
            ImpactCategory::Critical
        };

        let risk_class = match (category, transaction_type) {
            (_, TransactionType::Forfeiture) | (ImpactCategory::Critical, _) => RiskClass::High,
            (ImpactCategory::Material, _) | (_, TransactionType::Reversal) => RiskClass::Medium,
            _ => RiskClass::Low,
        };

        let liquidity_impact = match category {
            ImpactCategory::Minor => LiquidityImpact::Negligible,
            ImpactCategory::Standard | ImpactCategory::Material => LiquidityImpact::Moderate,
            ImpactCategory::Critical => LiquidityImpact::Severe,
        };

        let mut compliance = Vec::new();
        if amount_minor >= 250_000 {
            compliance.push(ComplianceRequirement::Kyc);
        }
        if amount_minor >= 500_000 {
            compliance.push(ComplianceRequirement::Aml);
        }
        if matches!(transaction_type, TransactionType::Forfeiture | TransactionType::Reversal) {
            compliance.push(ComplianceRequirement::SanctionsScreening);
        }
        if category == ImpactCategory::Critical || transaction_type == TransactionType::Forfeiture {
            compliance.push(ComplianceRequirement::ManualReview);
        }

        Self {
            category,
            risk_class,
            liquidity_impact,
            compliance,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    pub transaction_id: Uuid,
    pub bond_id: Uuid,
    pub transaction_type: TransactionType,
    pub amount_minor: i64,
    pub status: TransactionStatus,
    pub processing_stage: ProcessingStage,
    pub risk_score: Option<f64>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn impact_categories_by_amount() {
        assert_eq!(
            FinancialImpact::assess(4_999, TransactionType::Payment).category,
            ImpactCategory::Minor
        );
        assert_eq!(
            FinancialImpact::assess(5_000, TransactionType::Payment).category,
            ImpactCategory::Standard
        );
        assert_eq!(
            FinancialImpact::assess(250_000, TransactionType::Payment).category,
            ImpactCategory::Material
        );
        assert_eq!(
            FinancialImpact::assess(750_000, TransactionType::Payment).category,
            ImpactCategory::Critical
        );
    }

    #[test]
    fn forfeiture_requires_screening_and_review() {
        let impact = FinancialImpact::assess(10_000, TransactionType::Forfeiture);
        assert_eq!(impact.risk_class, RiskClass::High);
        assert!(impact.compliance.contains(&ComplianceRequirement::SanctionsScreening));
        assert!(impact.compliance.contains(&ComplianceRequirement::ManualReview));
    }

    #[test]
    fn aml_kicks_in_at_half_million_minor() {
        let impact = FinancialImpact::assess(500_000, TransactionType::Payment);
        assert!(impact.compliance.contains(&ComplianceRequirement::Kyc));
        assert!(impact.compliance.contains(&ComplianceRequirement::Aml));
    }
}

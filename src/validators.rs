use crate::domain::command::TransactionCommand;
use crate::domain::context::ProcessingContext;
use crate::domain::error::{RuleViolation, ValidationFailure};
use crate::integrations::{BondDirectory, ComplianceEngine, PaymentLookup, PredictiveModel};
use crate::risk::engine::calculate_financial_risk;
use crate::risk::types::{RiskAssessment, RiskFeatures, RiskWeights, TransactionHistory};
use crate::security::{self, SigningKey};
use crate::state::TransactionState;
use anyhow::Result;
use chrono::{Duration, Utc};

pub struct ValidatorDeps<'a> {
    pub bonds: &'a dyn BondDirectory,
    pub payments: &'a dyn PaymentLookup,
    pub model: &'a dyn PredictiveModel,
    pub compliance: &'a dyn ComplianceEngine,
    pub signing_key: &'a SigningKey,
    pub weights: RiskWeights,
    pub risk_ceiling: f64,
    pub freshness_window: Duration,
}

pub enum PipelineOutcome {
    Approved(RiskAssessment),
    Rejected(ValidationFailure),
}

pub async fn run_pipeline(
    command: &TransactionCommand,
    context: &ProcessingContext,
    history: &TransactionHistory,
    deps: &ValidatorDeps<'_>,
) -> Result<PipelineOutcome> {
    let (bond, amount, risk, compliance, payment, perimeter) = tokio::join!(
        bond_eligibility(deps.bonds, command),
        async { amount_ceiling(command) },
        financial_risk(command, history, deps),
        compliance_check(deps.compliance, command),
        payment_consistency(deps.payments, command),
        async {
            security::perimeter_check(
                command,
                context,
                deps.signing_key,
                deps.freshness_window,
                Utc::now(),
            )
            .err()
        },
    );

    let (assessment, risk_violation) = risk?;

    let mut violations = Vec::new();
    if let Some(v) = bond? {
        violations.push(v);
    }
    if let Some(v) = amount {
        violations.push(v);
    }
    if let Some(v) = risk_violation {
        violations.push(v);
    }
    if let Some(v) = compliance? {
        violations.push(v);
    }
    if let Some(v) = payment? {
        violations.push(v);
    }
    if let Some(v) = perimeter {
        violations.push(v);
    }

    if violations.is_empty() {
        Ok(PipelineOutcome::Approved(assessment))
    } else {
        Ok(PipelineOutcome::Rejected(ValidationFailure { violations }))
    }
}

async fn bond_eligibility(
    bonds: &dyn BondDirectory,
    command: &TransactionCommand,
) -> Result<Option<RuleViolation>> {
    match bonds.find_active_or_pending(command.bond_id).await? {
        Some(_) => Ok(None),
        None => Ok(Some(RuleViolation::new(
            "bond_eligibility",
            format!("bond {} is not active or pending", command.bond_id),
        ))),
    }
}

fn amount_ceiling(command: &TransactionCommand) -> Option<RuleViolation> {
    let ceiling = command.transaction_type.max_amount_minor();
    if command.amount_minor > ceiling {
        return Some(RuleViolation::new(
            "amount_limit",
            format!(
                "amount exceeds maximum allowed for {} ({} > {})",
                command.transaction_type.label(),
                command.amount_minor,
                ceiling
            ),
        ));
    }
    None
}

async fn financial_risk(
    command: &TransactionCommand,
    history: &TransactionHistory,
    deps: &ValidatorDeps<'_>,
) -> Result<(RiskAssessment, Option<RuleViolation>)> {
    let draft = TransactionState::draft(command);
    let features = RiskFeatures::from_state(&draft, history);
    let predictive = deps.model.predict(&features).await?;
    let assessment = calculate_financial_risk(&draft, history, predictive, &deps.weights);

    let violation = if assessment.score > deps.risk_ceiling {
        Some(RuleViolation::new(
            "financial_risk",
            format!(
                "blended risk score {:.2} exceeds ceiling {:.2}",
                assessment.score, deps.risk_ceiling
            ),
        ))
    } else {
        None
    };

    Ok((assessment, violation))
}

async fn compliance_check(
    compliance: &dyn ComplianceEngine,
    command: &TransactionCommand,
) -> Result<Option<RuleViolation>> {
    let outcome = compliance
        .validate(command.amount_minor, command.transaction_type, &command.metadata)
        .await?;

    if outcome.compliant {
        Ok(None)
    } else {
        Ok(Some(RuleViolation::new(
            "compliance",
            outcome.errors.join("; "),
        )))
    }
}

async fn payment_consistency(
    payments: &dyn PaymentLookup,
    command: &TransactionCommand,
) -> Result<Option<RuleViolation>> {
    let Some(reference) = &command.payment_reference else {
        return Ok(None);
    };

    match payments.find_completed(reference).await? {
        None => Ok(Some(RuleViolation::new(
            "payment_method",
            format!("payment reference {reference} not found"),
        ))),
        Some(summary) if !summary.completed => Ok(Some(RuleViolation::new(
            "payment_method",
            format!("payment reference {reference} is not completed"),
        ))),
        Some(summary) if summary.amount_minor != command.amount_minor => Ok(Some(RuleViolation::new(
            "payment_method",
            format!(
                "payment reference {reference} amount {} does not match command amount {}",
                summary.amount_minor, command.amount_minor
            ),
        ))),
        Some(_) => Ok(None),
    }
}

use crate::circuit::evaluator::pre_call_decision;
use crate::circuit::state::{CircuitDecision, CircuitThresholds};
use crate::circuit::store::CircuitStore;
use crate::circuit::transitions::apply_transition;
use crate::config::AppConfig;
use crate::domain::command::{TransactionCommand, TransactionType, VerificationType};
use crate::domain::context::ProcessingContext;
use crate::domain::error::{
    ProcessingError, RuleViolation, ValidationError, ValidationFailure,
};
use crate::domain::transaction::{ProcessingStage, TransactionRecord, TransactionStatus};
use crate::event::{EventPayload, EventRecord, FailureKind};
use crate::integrations::{
    BondDirectory, ComplianceEngine, EventPublisher, FraudAnalyzer, FraudVerdict, PaymentLookup,
    PredictiveModel, VerificationData,
};
use crate::projection::{ProjectionStore, TransactionProjection};
use crate::risk::cache::RiskCache;
use crate::risk::engine::calculate_financial_risk;
use crate::risk::types::{RiskAssessment, RiskFeatures, RiskWeights, TransactionHistory};
use crate::security::SigningKey;
use crate::state::TransactionState;
use crate::store::EventStore;
use crate::validators::{run_pipeline, PipelineOutcome, ValidatorDeps};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

const SUBMIT_SCOPE: &str = "transaction.submit";
const VERIFY_SCOPE: &str = "transaction.verify";

#[derive(Clone)]
pub struct ProcessorConfig {
    pub max_verification_retries: u32,
    pub risk_ceiling: f64,
    pub freshness_window: Duration,
    pub history_window_days: i64,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_verification_retries: 3,
            risk_ceiling: 0.8,
            freshness_window: Duration::seconds(300),
            history_window_days: 30,
        }
    }
}

impl ProcessorConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            max_verification_retries: cfg.max_verification_retries,
            risk_ceiling: cfg.risk_ceiling,
            freshness_window: Duration::seconds(cfg.freshness_window_secs),
            history_window_days: 30,
        }
    }
}

#[derive(Clone)]
pub struct TransactionProcessor {
    pub store: Arc<EventStore>,
    pub projections: ProjectionStore,
    pub circuit: CircuitStore,
    pub circuit_thresholds: CircuitThresholds,
    pub bonds: Arc<dyn BondDirectory>,
    pub payments: Arc<dyn PaymentLookup>,
    pub model: Arc<dyn PredictiveModel>,
    pub compliance: Arc<dyn ComplianceEngine>,
    pub fraud: Arc<dyn FraudAnalyzer>,
    pub publisher: Arc<dyn EventPublisher>,
    pub risk_cache: RiskCache,
    pub signing_key: SigningKey,
    pub config: ProcessorConfig,
}

impl TransactionProcessor {
    pub async fn submit_transaction(
        &self,
        command: TransactionCommand,
        context: &ProcessingContext,
    ) -> Result<TransactionRecord, ProcessingError> {
        validate_command(&command)?;
        let was_probe = self.gate(SUBMIT_SCOPE)?;

        let result = self.submit_inner(&command, context).await;
        self.record_circuit(SUBMIT_SCOPE, &result, was_probe);
        result
    }

    async fn submit_inner(
        &self,
        command: &TransactionCommand,
        context: &ProcessingContext,
    ) -> Result<TransactionRecord, ProcessingError> {
        let since = Utc::now() - Duration::days(self.config.history_window_days);
        let history = self
            .projections
            .history(command.bond_id, command.transaction_type, since);

        let deps = ValidatorDeps {
            bonds: self.bonds.as_ref(),
            payments: self.payments.as_ref(),
            model: self.model.as_ref(),
            compliance: self.compliance.as_ref(),
            signing_key: &self.signing_key,
            weights: RiskWeights::default(),
            risk_ceiling: self.config.risk_ceiling,
            freshness_window: self.config.freshness_window,
        };

        let assessment = match run_pipeline(command, context, &history, &deps).await? {
            PipelineOutcome::Approved(assessment) => assessment,
            PipelineOutcome::Rejected(failure) => return Err(ProcessingError::Rejected(failure)),
        };

        let transaction_id = command.transaction_id.unwrap_or_else(Uuid::new_v4);
        let event = EventRecord::new(
            transaction_id,
            1,
            EventPayload::Created {
                bond_id: command.bond_id,
                payment_reference: command.payment_reference.clone(),
                transaction_type: command.transaction_type,
                amount_minor: command.amount_minor,
                priority: command.priority,
                metadata: command.metadata.clone(),
            },
            command.correlation_id,
            Some(command.request_id),
            &self.signing_key,
        );

        self.store.append(transaction_id, vec![event.clone()]).await?;
        self.projections.apply(&event);
        self.projections.set_risk_score(transaction_id, assessment.score);
        self.risk_cache.put(transaction_id, assessment.clone()).await;
        self.publish("transaction.created", &event).await;

        Ok(TransactionRecord {
            transaction_id,
            bond_id: command.bond_id,
            transaction_type: command.transaction_type,
            amount_minor: command.amount_minor,
            status: TransactionStatus::Pending,
            processing_stage: ProcessingStage::Initialized,
            risk_score: Some(assessment.score),
            version: 1,
            created_at: event.metadata.timestamp,
        })
    }

    pub async fn submit_verification(
        &self,
        command: TransactionCommand,
        context: &ProcessingContext,
    ) -> Result<TransactionRecord, ProcessingError> {
        validate_command(&command)?;
        let transaction_id = command
            .transaction_id
            .ok_or(ValidationError::MissingField("transaction_id"))?;
        let verification_type = command
            .verification_type
            .ok_or(ValidationError::MissingField("verification_type"))?;
        let was_probe = self.gate(VERIFY_SCOPE)?;

        let result = self
            .verify_inner(transaction_id, verification_type, &command, context)
            .await;
        self.record_circuit(VERIFY_SCOPE, &result, was_probe);
        result
    }

    async fn verify_inner(
        &self,
        transaction_id: Uuid,
        verification_type: VerificationType,
        command: &TransactionCommand,
        context: &ProcessingContext,
    ) -> Result<TransactionRecord, ProcessingError> {
        let state = self.load_state(transaction_id).await?;

        if state.status.is_terminal() {
            return Err(rejected(
                "verification",
                format!("transaction is already terminal ({:?})", state.status),
            ));
        }
        if state.retry_count >= self.config.max_verification_retries {
            return Err(rejected(
                "verification",
                format!(
                    "verification retry limit of {} reached",
                    self.config.max_verification_retries
                ),
            ));
        }

        let verdict = match verification_type {
            VerificationType::FraudDetection => {
                let data = VerificationData {
                    verification_type,
                    notes: command.metadata.clone(),
                };
                self.fraud.analyze(&state, &data).await?
            }
            VerificationType::ComplianceCheck => {
                let outcome = self
                    .compliance
                    .validate(state.amount_minor, state.transaction_type, &state.metadata)
                    .await?;
                FraudVerdict {
                    success: outcome.compliant,
                    confidence: if outcome.compliant { 0.9 } else { 0.0 },
                    reason: (!outcome.errors.is_empty()).then(|| outcome.errors.join("; ")),
                }
            }
        };

        let next_version = state.version + 1;
        if verdict.success {
            let event = EventRecord::new(
                transaction_id,
                next_version,
                EventPayload::Verified {
                    verification_type,
                    confidence: verdict.confidence,
                    verified_by: context.actor_id.clone(),
                },
                command.correlation_id,
                Some(command.request_id),
                &self.signing_key,
            );
            let next = state.apply(&event);
            self.commit_event(event, "transaction.verified").await?;

            let risk_score = self.projections.get(transaction_id).and_then(|r| r.risk_score);
            Ok(record_from(&next, risk_score))
        } else {
            let reason = verdict
                .reason
                .unwrap_or_else(|| "verification strategy reported failure".to_string());
            let kind = match verification_type {
                VerificationType::FraudDetection => FailureKind::Fraud,
                VerificationType::ComplianceCheck => FailureKind::Compliance,
            };
            let event = EventRecord::new(
                transaction_id,
                next_version,
                EventPayload::Failed {
                    reason: reason.clone(),
                    kind,
                },
                command.correlation_id,
                Some(command.request_id),
                &self.signing_key,
            );
            let retry_count = state.retry_count + 1;
            self.commit_event(event, "transaction.failed").await?;

            Err(ProcessingError::VerificationFailed { reason, retry_count })
        }
    }

    pub async fn begin_processing(
        &self,
        transaction_id: Uuid,
        context: &ProcessingContext,
    ) -> Result<TransactionRecord, ProcessingError> {
        let state = self.load_state(transaction_id).await?;
        if state.status != TransactionStatus::Pending {
            return Err(rejected(
                "lifecycle",
                format!("cannot start processing from {:?}", state.status),
            ));
        }

        let event = self.lifecycle_event(
            &state,
            EventPayload::ProcessingStarted {
                stage: ProcessingStage::Processing,
            },
            context,
        );
        let next = state.apply(&event);
        self.commit_event(event, "transaction.processing_started").await?;
        Ok(record_from(&next, None))
    }

    pub async fn complete_transaction(
        &self,
        transaction_id: Uuid,
        settlement_reference: Option<String>,
        context: &ProcessingContext,
    ) -> Result<TransactionRecord, ProcessingError> {
        let state = self.load_state(transaction_id).await?;
        if state.status != TransactionStatus::Verified {
            return Err(rejected(
                "lifecycle",
                format!("only verified transactions can complete, found {:?}", state.status),
            ));
        }

        let event = self.lifecycle_event(
            &state,
            EventPayload::Completed {
                settlement_reference,
            },
            context,
        );
        let next = state.apply(&event);
        self.commit_event(event, "transaction.completed").await?;
        Ok(record_from(&next, None))
    }

    pub async fn cancel_transaction(
        &self,
        transaction_id: Uuid,
        reason: String,
        context: &ProcessingContext,
    ) -> Result<TransactionRecord, ProcessingError> {
        let state = self.load_state(transaction_id).await?;
        if state.status.is_terminal() {
            return Err(rejected(
                "lifecycle",
                format!("transaction is already terminal ({:?})", state.status),
            ));
        }

        let event = self.lifecycle_event(
            &state,
            EventPayload::Cancelled {
                reason,
                cancelled_by: context.actor_id.clone(),
            },
            context,
        );
        let next = state.apply(&event);
        self.commit_event(event, "transaction.cancelled").await?;
        Ok(record_from(&next, None))
    }

    pub async fn retry_transaction(
        &self,
        transaction_id: Uuid,
        context: &ProcessingContext,
    ) -> Result<TransactionRecord, ProcessingError> {
        let state = self.load_state(transaction_id).await?;
        if state.status != TransactionStatus::Failed {
            return Err(rejected(
                "lifecycle",
                format!("only failed transactions can retry, found {:?}", state.status),
            ));
        }
        if state.retry_count >= self.config.max_verification_retries {
            return Err(rejected(
                "lifecycle",
                format!(
                    "retry limit of {} reached",
                    self.config.max_verification_retries
                ),
            ));
        }

        let event = self.lifecycle_event(
            &state,
            EventPayload::Retried {
                attempt: state.retry_count,
            },
            context,
        );
        let next = state.apply(&event);
        self.commit_event(event, "transaction.retried").await?;
        Ok(record_from(&next, None))
    }

    pub fn find_transaction(&self, transaction_id: Uuid) -> Option<TransactionProjection> {
        self.projections.get(transaction_id)
    }

    pub fn transaction_history(
        &self,
        bond_id: Uuid,
        transaction_type: TransactionType,
    ) -> TransactionHistory {
        let since = Utc::now() - Duration::days(self.config.history_window_days);
        self.projections.history(bond_id, transaction_type, since)
    }

    pub async fn risk_for(&self, transaction_id: Uuid) -> Result<RiskAssessment, ProcessingError> {
        if let Some(cached) = self.risk_cache.get(transaction_id).await {
            return Ok(cached);
        }

        let state = self.load_state(transaction_id).await?;
        let history = self.transaction_history(state.bond_id, state.transaction_type);
        let features = RiskFeatures::from_state(&state, &history);
        let predictive = self.model.predict(&features).await?;
        let assessment =
            calculate_financial_risk(&state, &history, predictive, &RiskWeights::default());
        self.risk_cache.put(transaction_id, assessment.clone()).await;
        Ok(assessment)
    }

    async fn load_state(&self, transaction_id: Uuid) -> Result<TransactionState, ProcessingError> {
        let events = self.store.load(transaction_id).await?;
        if events.is_empty() {
            return Err(ProcessingError::NotFound(transaction_id));
        }
        Ok(TransactionState::from_events(transaction_id, &events))
    }

    fn lifecycle_event(
        &self,
        state: &TransactionState,
        payload: EventPayload,
        context: &ProcessingContext,
    ) -> EventRecord {
        EventRecord::new(
            state.transaction_id,
            state.version + 1,
            payload,
            Uuid::new_v4(),
            Some(context.request_id),
            &self.signing_key,
        )
    }

    async fn commit_event(&self, event: EventRecord, topic: &str) -> Result<(), ProcessingError> {
        self.store
            .append(event.aggregate_id, vec![event.clone()])
            .await?;
        self.projections.apply(&event);
        self.publish(topic, &event).await;
        Ok(())
    }

    async fn publish(&self, topic: &str, event: &EventRecord) {
        let payload = serde_json::to_value(event).unwrap_or_default();
        if let Err(err) = self.publisher.publish(topic, payload).await {
            tracing::warn!("event publication failed for {topic}: {err}");
        }
    }

    fn gate(&self, scope: &str) -> Result<bool, ProcessingError> {
        let snapshot = self.circuit.snapshot(scope);
        match pre_call_decision(&snapshot, &self.circuit_thresholds, Utc::now()) {
            CircuitDecision::Allow => Ok(false),
            CircuitDecision::Probe => Ok(true),
            CircuitDecision::Reject(_) => Err(ProcessingError::TemporarilyUnavailable),
        }
    }

    fn record_circuit(
        &self,
        scope: &str,
        result: &Result<TransactionRecord, ProcessingError>,
        was_probe: bool,
    ) {
        let success = !matches!(
            result,
            Err(ProcessingError::Conflict(_)) | Err(ProcessingError::Internal(_))
        );
        let now = Utc::now();
        self.circuit.record_result(scope, success, now);
        let rate = self
            .circuit
            .failure_rate(scope, self.circuit_thresholds.window_minutes, now);
        let snapshot = self.circuit.snapshot(scope);
        let updated = apply_transition(
            snapshot,
            &self.circuit_thresholds,
            rate,
            success,
            was_probe,
            now,
        );
        self.circuit.save_snapshot(updated);
    }
}

fn validate_command(command: &TransactionCommand) -> Result<(), ValidationError> {
    if command.bond_id.is_nil() {
        return Err(ValidationError::MissingField("bond_id"));
    }
    if command.amount_minor <= 0 {
        return Err(ValidationError::NonPositiveAmount);
    }
    if command.correlation_id.is_nil() {
        return Err(ValidationError::MissingCorrelation);
    }
    Ok(())
}

fn rejected(rule: &'static str, reason: String) -> ProcessingError {
    ProcessingError::Rejected(ValidationFailure {
        violations: vec![RuleViolation::new(rule, reason)],
    })
}

fn record_from(state: &TransactionState, risk_score: Option<f64>) -> TransactionRecord {
    TransactionRecord {
        transaction_id: state.transaction_id,
        bond_id: state.bond_id,
        transaction_type: state.transaction_type,
        amount_minor: state.amount_minor,
        status: state.status,
        processing_stage: state.processing_stage,
        risk_score,
        version: state.version,
        created_at: state.created_at.unwrap_or_else(Utc::now),
    }
}

use bond_transactions::circuit::state::{CircuitSnapshot, CircuitState, CircuitThresholds};
use bond_transactions::circuit::store::CircuitStore;
use bond_transactions::domain::command::{
    CommandDraft, TransactionCommand, TransactionType, VerificationType,
};
use bond_transactions::domain::context::ProcessingContext;
use bond_transactions::domain::error::ProcessingError;
use bond_transactions::domain::transaction::{ProcessingStage, TransactionStatus};
use bond_transactions::integrations::mock::{
    ChannelPublisher, MockBondDirectory, MockComplianceEngine, MockFraudAnalyzer,
    MockPaymentLookup, MockPredictiveModel, PublishedMessage,
};
use bond_transactions::projection::ProjectionStore;
use bond_transactions::risk::cache::RiskCache;
use bond_transactions::security::{attach_signature, SigningKey};
use bond_transactions::service::processor::{ProcessorConfig, TransactionProcessor};
use bond_transactions::store::EventStore;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

#[tokio::test]
async fn payment_happy_path_appends_created_event() {
    let (processor, mut published) = processor_with("ACTIVE", "CLEAR", "PASS", 0.1);
    let ctx = ProcessingContext::system();
    let command = signed_payment(5_000);

    let record = processor.submit_transaction(command, &ctx).await.unwrap();

    assert_eq!(record.status, TransactionStatus::Pending);
    assert_eq!(record.processing_stage, ProcessingStage::Initialized);
    assert_eq!(record.version, 1);
    assert!(record.risk_score.unwrap() < 0.8);

    let events = processor.store.load(record.transaction_id).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, "transaction.created");
    assert_eq!(events[0].metadata.version, 1);

    let row = processor.find_transaction(record.transaction_id).unwrap();
    assert_eq!(row.status, TransactionStatus::Pending);
    assert_eq!(row.last_event_version, 1);
    assert!(row.risk_score.is_some());

    let message = published.try_recv().unwrap();
    assert_eq!(message.topic, "transaction.created");
}

#[tokio::test]
async fn amount_over_ceiling_is_rejected_without_side_effects() {
    let (processor, mut published) = processor_with("ACTIVE", "CLEAR", "PASS", 0.1);
    let ctx = ProcessingContext::system();
    let transaction_id = Uuid::new_v4();
    let command = signed(
        CommandDraft::new(Uuid::new_v4(), TransactionType::Payment, 1_000_001)
            .transaction_id(transaction_id)
            .build()
            .unwrap(),
    );

    let err = processor.submit_transaction(command, &ctx).await.unwrap_err();
    match err {
        ProcessingError::Rejected(failure) => {
            assert!(failure.to_string().contains("amount exceeds maximum allowed"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    assert!(processor.store.load(transaction_id).await.unwrap().is_empty());
    assert!(processor.store.aggregate_ids().await.unwrap().is_empty());
    assert!(published.try_recv().is_err());
}

#[tokio::test]
async fn composite_failure_lists_every_violated_rule() {
    let (processor, _published) = processor_with("MISSING", "NON_COMPLIANT", "PASS", 0.1);
    let ctx = ProcessingContext::system();
    let command = signed(
        CommandDraft::new(Uuid::new_v4(), TransactionType::Payment, 1_000_001)
            .build()
            .unwrap(),
    );

    let err = processor.submit_transaction(command, &ctx).await.unwrap_err();
    match err {
        ProcessingError::Rejected(failure) => {
            let rules: Vec<&str> = failure.violations.iter().map(|v| v.rule).collect();
            assert!(rules.contains(&"bond_eligibility"));
            assert!(rules.contains(&"amount_limit"));
            assert!(rules.contains(&"compliance"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn duplicate_transaction_id_yields_concurrency_conflict() {
    let (processor, _published) = processor_with("ACTIVE", "CLEAR", "PASS", 0.1);
    let ctx = ProcessingContext::system();
    let transaction_id = Uuid::new_v4();
    let bond_id = Uuid::new_v4();

    let first = signed(
        CommandDraft::new(bond_id, TransactionType::Payment, 5_000)
            .transaction_id(transaction_id)
            .build()
            .unwrap(),
    );
    let second = signed(
        CommandDraft::new(bond_id, TransactionType::Payment, 5_000)
            .transaction_id(transaction_id)
            .build()
            .unwrap(),
    );

    processor.submit_transaction(first, &ctx).await.unwrap();
    let err = processor.submit_transaction(second, &ctx).await.unwrap_err();
    assert!(matches!(err, ProcessingError::Conflict(_)));
    assert_eq!(processor.store.current_version(transaction_id).await.unwrap(), 1);
}

#[tokio::test]
async fn fraud_verification_failure_records_failed_event() {
    let (processor, _published) = processor_with("ACTIVE", "CLEAR", "FLAG_FRAUD", 0.1);
    let ctx = ProcessingContext::system();

    let record = processor
        .submit_transaction(signed_payment(5_000), &ctx)
        .await
        .unwrap();

    let verify = signed(
        CommandDraft::new(record.bond_id, TransactionType::Payment, 5_000)
            .transaction_id(record.transaction_id)
            .verification_type(VerificationType::FraudDetection)
            .build()
            .unwrap(),
    );

    let err = processor.submit_verification(verify, &ctx).await.unwrap_err();
    match err {
        ProcessingError::VerificationFailed { retry_count, reason } => {
            assert_eq!(retry_count, 1);
            assert!(reason.contains("fraud"));
        }
        other => panic!("expected verification failure, got {other:?}"),
    }

    let events = processor.store.load(record.transaction_id).await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].event_type, "transaction.failed");

    let row = processor.find_transaction(record.transaction_id).unwrap();
    assert_eq!(row.status, TransactionStatus::Failed);
    assert_eq!(row.retry_count, 1);
}

#[tokio::test]
async fn verification_success_then_completion() {
    let (processor, _published) = processor_with("ACTIVE", "CLEAR", "PASS", 0.1);
    let ctx = ProcessingContext::system();

    let record = processor
        .submit_transaction(signed_payment(5_000), &ctx)
        .await
        .unwrap();

    let verify = signed(
        CommandDraft::new(record.bond_id, TransactionType::Payment, 5_000)
            .transaction_id(record.transaction_id)
            .verification_type(VerificationType::FraudDetection)
            .build()
            .unwrap(),
    );
    let verified = processor.submit_verification(verify, &ctx).await.unwrap();
    assert_eq!(verified.status, TransactionStatus::Verified);
    assert_eq!(verified.version, 2);

    let completed = processor
        .complete_transaction(record.transaction_id, Some("settle-42".to_string()), &ctx)
        .await
        .unwrap();
    assert_eq!(completed.status, TransactionStatus::Completed);
    assert_eq!(completed.version, 3);

    let verify_again = signed(
        CommandDraft::new(record.bond_id, TransactionType::Payment, 5_000)
            .transaction_id(record.transaction_id)
            .verification_type(VerificationType::FraudDetection)
            .build()
            .unwrap(),
    );
    let err = processor.submit_verification(verify_again, &ctx).await.unwrap_err();
    assert!(matches!(err, ProcessingError::Rejected(_)));
}

#[tokio::test]
async fn open_circuit_short_circuits_before_the_store() {
    let (processor, mut published) = processor_with("ACTIVE", "CLEAR", "PASS", 0.1);
    let ctx = ProcessingContext::system();

    let mut snapshot = CircuitSnapshot::new("transaction.submit");
    snapshot.state = CircuitState::Open;
    snapshot.cooldown_until = Some(chrono::Utc::now() + chrono::Duration::seconds(60));
    processor.circuit.save_snapshot(snapshot);

    let err = processor
        .submit_transaction(signed_payment(5_000), &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ProcessingError::TemporarilyUnavailable));
    assert!(processor.store.aggregate_ids().await.unwrap().is_empty());
    assert!(published.try_recv().is_err());
}

#[tokio::test]
async fn verification_retries_are_bounded() {
    let (processor, _published) = processor_with("ACTIVE", "CLEAR", "FLAG_FRAUD", 0.1);
    let ctx = ProcessingContext::system();

    let record = processor
        .submit_transaction(signed_payment(5_000), &ctx)
        .await
        .unwrap();

    for attempt in 1..=3u32 {
        let verify = signed(
            CommandDraft::new(record.bond_id, TransactionType::Payment, 5_000)
                .transaction_id(record.transaction_id)
                .verification_type(VerificationType::FraudDetection)
                .build()
                .unwrap(),
        );
        let err = processor.submit_verification(verify, &ctx).await.unwrap_err();
        match err {
            ProcessingError::VerificationFailed { retry_count, .. } => {
                assert_eq!(retry_count, attempt);
            }
            other => panic!("expected verification failure, got {other:?}"),
        }
    }

    let verify = signed(
        CommandDraft::new(record.bond_id, TransactionType::Payment, 5_000)
            .transaction_id(record.transaction_id)
            .verification_type(VerificationType::FraudDetection)
            .build()
            .unwrap(),
    );
    let err = processor.submit_verification(verify, &ctx).await.unwrap_err();
    match err {
        ProcessingError::Rejected(failure) => {
            assert!(failure.to_string().contains("retry limit"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }

    assert_eq!(processor.store.current_version(record.transaction_id).await.unwrap(), 4);
}

#[tokio::test]
async fn payment_reference_amount_mismatch_is_rejected() {
    let (processor, _published) = processor_with("ACTIVE", "CLEAR", "PASS", 0.1);
    let ctx = ProcessingContext::system();

    let command = signed(
        CommandDraft::new(Uuid::new_v4(), TransactionType::Payment, 6_000)
            .payment_reference("pay-201")
            .build()
            .unwrap(),
    );

    let err = processor.submit_transaction(command, &ctx).await.unwrap_err();
    match err {
        ProcessingError::Rejected(failure) => {
            assert_eq!(failure.violations.len(), 1);
            assert_eq!(failure.violations[0].rule, "payment_method");
            assert!(failure.violations[0].reason.contains("does not match"));
        }
        other => panic!("expected rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn risk_is_cached_and_queryable_after_submission() {
    let (processor, _published) = processor_with("ACTIVE", "CLEAR", "PASS", 0.1);
    let ctx = ProcessingContext::system();

    let record = processor
        .submit_transaction(signed_payment(5_000), &ctx)
        .await
        .unwrap();

    let assessment = processor.risk_for(record.transaction_id).await.unwrap();
    assert_eq!(Some(assessment.score), record.risk_score);
}

#[tokio::test]
async fn structurally_invalid_command_never_reaches_validators() {
    let (processor, _published) = processor_with("MISSING", "NON_COMPLIANT", "PASS", 0.1);
    let ctx = ProcessingContext::system();

    let mut command = signed_payment(5_000);
    command.amount_minor = 0;

    let err = processor.submit_transaction(command, &ctx).await.unwrap_err();
    assert!(matches!(err, ProcessingError::Invalid(_)));
    assert_eq!(err.kind(), "invalid_command");
}

fn processor_with(
    bond_behavior: &str,
    compliance_behavior: &str,
    fraud_behavior: &str,
    model_score: f64,
) -> (TransactionProcessor, UnboundedReceiver<PublishedMessage>) {
    let (publisher, published) = ChannelPublisher::unbounded();
    let processor = TransactionProcessor {
        store: Arc::new(EventStore::in_memory()),
        projections: ProjectionStore::new(),
        circuit: CircuitStore::new(),
        circuit_thresholds: CircuitThresholds::default(),
        bonds: Arc::new(MockBondDirectory {
            behavior: bond_behavior.to_string(),
        }),
        payments: Arc::new(MockPaymentLookup {
            amount_minor: 5_000,
            behavior: "COMPLETED".to_string(),
        }),
        model: Arc::new(MockPredictiveModel { score: model_score }),
        compliance: Arc::new(MockComplianceEngine {
            behavior: compliance_behavior.to_string(),
        }),
        fraud: Arc::new(MockFraudAnalyzer {
            behavior: fraud_behavior.to_string(),
            confidence: 0.92,
        }),
        publisher: Arc::new(publisher),
        risk_cache: RiskCache::new(std::time::Duration::from_secs(60)),
        signing_key: SigningKey::from_secret("test-secret"),
        config: ProcessorConfig::default(),
    };
    (processor, published)
}

fn signed(command: TransactionCommand) -> TransactionCommand {
    attach_signature(command, &SigningKey::from_secret("test-secret"))
}

fn signed_payment(amount_minor: i64) -> TransactionCommand {
    signed(
        CommandDraft::new(Uuid::new_v4(), TransactionType::Payment, amount_minor)
            .build()
            .unwrap(),
    )
}

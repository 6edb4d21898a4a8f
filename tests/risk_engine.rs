use bond_transactions::domain::command::{CommandDraft, TransactionType};
use bond_transactions::risk::engine::{
    amount_risk, calculate_financial_risk, temporal_risk, type_risk,
};
use bond_transactions::risk::types::{RiskWeights, TransactionHistory};
use bond_transactions::state::TransactionState;
use chrono::TimeZone;
use uuid::Uuid;

#[test]
fn score_is_bounded_for_any_input_combination() {
    let weights = RiskWeights::default();
    let histories = [
        TransactionHistory::default(),
        TransactionHistory { attempts: 1, failures: 0 },
        TransactionHistory { attempts: 50, failures: 50 },
    ];
    let amounts = [1, 4_999, 50_000, 750_000, i64::MAX];
    let predictions = [-10.0, 0.0, 0.5, 1.0, 10.0];

    for amount in amounts {
        for history in &histories {
            for prediction in predictions {
                let state = draft_state(amount, TransactionType::Forfeiture);
                let assessment = calculate_financial_risk(&state, history, prediction, &weights);
                assert!(
                    (0.0..=1.0).contains(&assessment.score),
                    "score {} out of bounds for amount {amount}",
                    assessment.score
                );
            }
        }
    }
}

#[test]
fn amount_buckets_are_ordered() {
    assert_eq!(amount_risk(4_999), 0.1);
    assert_eq!(amount_risk(5_000), 0.3);
    assert_eq!(amount_risk(249_999), 0.5);
    assert_eq!(amount_risk(250_000), 0.7);
    assert_eq!(amount_risk(750_000), 0.9);
}

#[test]
fn forfeitures_score_higher_than_payments() {
    assert!(type_risk(TransactionType::Forfeiture) > type_risk(TransactionType::Payment));

    let weights = RiskWeights::default();
    let history = TransactionHistory { attempts: 10, failures: 1 };
    let payment = calculate_financial_risk(
        &draft_state(5_000, TransactionType::Payment),
        &history,
        0.2,
        &weights,
    );
    let forfeiture = calculate_financial_risk(
        &draft_state(5_000, TransactionType::Forfeiture),
        &history,
        0.2,
        &weights,
    );
    assert!(forfeiture.score > payment.score);
}

#[test]
fn off_hours_and_weekends_are_penalized() {
    let weekday_noon = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap();
    let weekday_night = chrono::Utc.with_ymd_and_hms(2025, 6, 4, 23, 0, 0).unwrap();
    let saturday_night = chrono::Utc.with_ymd_and_hms(2025, 6, 7, 23, 0, 0).unwrap();

    assert_eq!(temporal_risk(Some(weekday_noon)), 0.1);
    assert_eq!(temporal_risk(Some(weekday_night)), 0.5);
    assert_eq!(temporal_risk(Some(saturday_night)), 0.8);
    assert_eq!(temporal_risk(None), 0.1);
}

#[test]
fn metadata_signals_raise_the_score() {
    let weights = RiskWeights::default();
    let history = TransactionHistory { attempts: 10, failures: 0 };

    let plain = draft_state(5_000, TransactionType::Payment);
    let mut flagged = plain.clone();
    flagged
        .metadata
        .insert("automated".to_string(), serde_json::Value::Bool(true));
    flagged.metadata.insert(
        "ip_address".to_string(),
        serde_json::Value::String("10.0.0.9".to_string()),
    );

    let base = calculate_financial_risk(&plain, &history, 0.2, &weights);
    let raised = calculate_financial_risk(&flagged, &history, 0.2, &weights);
    assert!(raised.score > base.score);
    assert_eq!(raised.breakdown.metadata_risk, 0.5);
}

#[test]
fn breakdown_factors_are_reported() {
    let weights = RiskWeights::default();
    let history = TransactionHistory { attempts: 4, failures: 2 };
    let assessment =
        calculate_financial_risk(&draft_state(5_000, TransactionType::Refund), &history, 0.4, &weights);

    assert_eq!(assessment.breakdown.history_risk, 0.5);
    assert_eq!(assessment.breakdown.type_risk, 0.4);
    assert_eq!(assessment.breakdown.predictive_score, 0.4);
    assert_eq!(assessment.breakdown.final_score, assessment.score);
}

fn draft_state(amount_minor: i64, transaction_type: TransactionType) -> TransactionState {
    let command = CommandDraft::new(Uuid::new_v4(), transaction_type, amount_minor)
        .timestamp(chrono::Utc.with_ymd_and_hms(2025, 6, 4, 12, 0, 0).unwrap())
        .build()
        .unwrap();
    TransactionState::draft(&command)
}

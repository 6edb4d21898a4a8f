use bond_transactions::domain::error::StoreError;
use bond_transactions::event::{EventPayload, EventRecord};
use bond_transactions::security::SigningKey;
use bond_transactions::store::EventStore;
use std::sync::Arc;
use uuid::Uuid;

#[tokio::test]
async fn versions_are_monotonic_and_gapless() {
    let store = EventStore::in_memory();
    let aggregate_id = Uuid::new_v4();

    store
        .append(aggregate_id, vec![event(aggregate_id, 1), event(aggregate_id, 2)])
        .await
        .unwrap();
    store.append(aggregate_id, vec![event(aggregate_id, 3)]).await.unwrap();

    assert_eq!(store.current_version(aggregate_id).await.unwrap(), 3);

    let versions: Vec<u64> = store
        .load(aggregate_id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.metadata.version)
        .collect();
    assert_eq!(versions, vec![1, 2, 3]);
}

#[tokio::test]
async fn version_gap_rejects_the_whole_batch() {
    let store = EventStore::in_memory();
    let aggregate_id = Uuid::new_v4();

    store.append(aggregate_id, vec![event(aggregate_id, 1)]).await.unwrap();

    let err = store
        .append(aggregate_id, vec![event(aggregate_id, 2), event(aggregate_id, 4)])
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ConcurrencyConflict { version: 4, .. }));
    assert_eq!(store.current_version(aggregate_id).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_appends_produce_exactly_one_winner() {
    let store = Arc::new(EventStore::in_memory());
    let aggregate_id = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.append(aggregate_id, vec![event(aggregate_id, 1)]).await
        }));
    }

    let mut ok = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => ok += 1,
            Err(StoreError::ConcurrencyConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected store error: {other}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(conflicts, 1);
    assert_eq!(store.current_version(aggregate_id).await.unwrap(), 1);
}

#[tokio::test]
async fn load_since_filters_by_time_and_type() {
    let store = EventStore::in_memory();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let start = chrono::Utc::now();

    store.append(a, vec![event(a, 1)]).await.unwrap();
    store
        .append(
            b,
            vec![EventRecord::new(
                b,
                1,
                EventPayload::Released { amount_minor: 100 },
                Uuid::new_v4(),
                None,
                &key(),
            )],
        )
        .await
        .unwrap();

    let all = store.load_since(start, None).await.unwrap();
    assert_eq!(all.len(), 2);

    let reserved_only = store
        .load_since(start, Some(&["transaction.reserved"]))
        .await
        .unwrap();
    assert_eq!(reserved_only.len(), 1);
    assert_eq!(reserved_only[0].aggregate_id, a);

    let future = store
        .load_since(chrono::Utc::now() + chrono::Duration::minutes(1), None)
        .await
        .unwrap();
    assert!(future.is_empty());
}

#[tokio::test]
async fn streams_are_isolated_per_aggregate() {
    let store = EventStore::in_memory();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    store.append(a, vec![event(a, 1)]).await.unwrap();
    store.append(b, vec![event(b, 1)]).await.unwrap();

    assert_eq!(store.current_version(a).await.unwrap(), 1);
    assert_eq!(store.current_version(b).await.unwrap(), 1);
    assert_eq!(store.load(a).await.unwrap().len(), 1);

    let mut ids = store.aggregate_ids().await.unwrap();
    ids.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(ids, expected);
}

fn key() -> SigningKey {
    SigningKey::from_secret("test-secret")
}

fn event(aggregate_id: Uuid, version: u64) -> EventRecord {
    EventRecord::new(
        aggregate_id,
        version,
        EventPayload::Reserved { amount_minor: 500 },
        Uuid::new_v4(),
        None,
        &key(),
    )
}

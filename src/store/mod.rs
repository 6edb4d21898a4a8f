use crate::domain::error::StoreError;
use crate::event::EventRecord;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

pub mod postgres;

pub enum EventStore {
    Memory(MemoryEventStore),
    Postgres(postgres::PostgresEventStore),
}

impl EventStore {
    pub fn in_memory() -> Self {
        EventStore::Memory(MemoryEventStore::new())
    }

    pub fn postgres(store: postgres::PostgresEventStore) -> Self {
        EventStore::Postgres(store)
    }

    pub async fn append(&self, aggregate_id: Uuid, events: Vec<EventRecord>) -> Result<(), StoreError> {
        match self {
            EventStore::Memory(store) => store.append(aggregate_id, events),
            EventStore::Postgres(store) => store.append(aggregate_id, events).await,
        }
    }

    pub async fn load(&self, aggregate_id: Uuid) -> Result<Vec<EventRecord>, StoreError> {
        match self {
            EventStore::Memory(store) => Ok(store.load(aggregate_id)),
            EventStore::Postgres(store) => store.load(aggregate_id).await,
        }
    }

    pub async fn load_since(
        &self,
        since: DateTime<Utc>,
        event_types: Option<&[&str]>,
    ) -> Result<Vec<EventRecord>, StoreError> {
        match self {
            EventStore::Memory(store) => Ok(store.load_since(since, event_types)),
            EventStore::Postgres(store) => store.load_since(since, event_types).await,
        }
    }

    pub async fn current_version(&self, aggregate_id: Uuid) -> Result<u64, StoreError> {
        match self {
            EventStore::Memory(store) => Ok(store.current_version(aggregate_id)),
            EventStore::Postgres(store) => store.current_version(aggregate_id).await,
        }
    }

    pub async fn aggregate_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        match self {
            EventStore::Memory(store) => Ok(store.aggregate_ids()),
            EventStore::Postgres(store) => store.aggregate_ids().await,
        }
    }
}

#[derive(Clone, Default)]
pub struct MemoryEventStore {
    streams: Arc<Mutex<HashMap<Uuid, Vec<EventRecord>>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, aggregate_id: Uuid, events: Vec<EventRecord>) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut streams = self.streams.lock();
        let stream = streams.entry(aggregate_id).or_default();
        let current = stream.len() as u64;

        for (index, event) in events.iter().enumerate() {
            let expected = current + 1 + index as u64;
            if event.metadata.version != expected {
                return Err(StoreError::ConcurrencyConflict {
                    aggregate_id,
                    version: event.metadata.version,
                });
            }
        }

        stream.extend(events);
        Ok(())
    }

    pub fn load(&self, aggregate_id: Uuid) -> Vec<EventRecord> {
        self.streams
            .lock()
            .get(&aggregate_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn load_since(&self, since: DateTime<Utc>, event_types: Option<&[&str]>) -> Vec<EventRecord> {
        let streams = self.streams.lock();
        let mut matched: Vec<EventRecord> = streams
            .values()
            .flatten()
            .filter(|event| event.metadata.timestamp >= since)
            .filter(|event| {
                event_types
                    .map(|types| types.contains(&event.event_type.as_str()))
                    .unwrap_or(true)
            })
            .cloned()
            .collect();

        matched.sort_by(|a, b| {
            (a.metadata.timestamp, a.aggregate_id, a.metadata.version)
                .cmp(&(b.metadata.timestamp, b.aggregate_id, b.metadata.version))
        });
        matched
    }

    pub fn current_version(&self, aggregate_id: Uuid) -> u64 {
        self.streams
            .lock()
            .get(&aggregate_id)
            .map(|stream| stream.len() as u64)
            .unwrap_or(0)
    }

    pub fn aggregate_ids(&self) -> Vec<Uuid> {
        self.streams.lock().keys().copied().collect()
    }
}

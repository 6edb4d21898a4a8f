use crate::domain::error::StoreError;
use crate::event::{EventMetadata, EventPayload, EventRecord};
use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct PostgresEventStore {
    pub pool: PgPool,
}

impl PostgresEventStore {
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transaction_events (
                event_id UUID PRIMARY KEY,
                aggregate_id UUID NOT NULL,
                aggregate_type TEXT NOT NULL,
                event_type TEXT NOT NULL,
                version BIGINT NOT NULL,
                payload JSONB NOT NULL,
                correlation_id UUID NOT NULL,
                causation_id UUID,
                signature TEXT NOT NULL,
                recorded_at TIMESTAMPTZ NOT NULL,
                UNIQUE (aggregate_id, version)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transaction_events_archive (
                LIKE transaction_events INCLUDING ALL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn append(&self, aggregate_id: Uuid, events: Vec<EventRecord>) -> Result<(), StoreError> {
        if events.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;

        for event in &events {
            let insert = sqlx::query(
                r#"
                INSERT INTO transaction_events (
                    event_id, aggregate_id, aggregate_type, event_type, version,
                    payload, correlation_id, causation_id, signature, recorded_at
                ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
                "#,
            )
            .bind(event.event_id)
            .bind(aggregate_id)
            .bind(event.aggregate_type.clone())
            .bind(event.event_type.clone())
            .bind(event.metadata.version as i64)
            .bind(serde_json::to_value(&event.payload).map_err(|e| StoreError::Backend(e.into()))?)
            .bind(event.metadata.correlation_id)
            .bind(event.metadata.causation_id)
            .bind(event.metadata.signature.clone())
            .bind(event.metadata.timestamp)
            .execute(tx.as_mut())
            .await;

            if let Err(err) = insert {
                if is_unique_violation(&err) {
                    return Err(StoreError::ConcurrencyConflict {
                        aggregate_id,
                        version: event.metadata.version,
                    });
                }
                return Err(StoreError::Backend(err.into()));
            }
        }

        tx.commit().await.map_err(|e| StoreError::Backend(e.into()))?;
        Ok(())
    }

    pub async fn load(&self, aggregate_id: Uuid) -> Result<Vec<EventRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT event_id, aggregate_id, aggregate_type, event_type, version,
                   payload, correlation_id, causation_id, signature, recorded_at
            FROM transaction_events
            WHERE aggregate_id = $1
            ORDER BY version ASC
            "#,
        )
        .bind(aggregate_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(rows.into_iter().map(row_to_event).collect())
    }

    pub async fn load_since(
        &self,
        since: DateTime<Utc>,
        event_types: Option<&[&str]>,
    ) -> Result<Vec<EventRecord>, StoreError> {
        let rows = match event_types {
            Some(types) => {
                let owned: Vec<String> = types.iter().map(|t| t.to_string()).collect();
                sqlx::query(
                    r#"
                    SELECT event_id, aggregate_id, aggregate_type, event_type, version,
                           payload, correlation_id, causation_id, signature, recorded_at
                    FROM transaction_events
                    WHERE recorded_at >= $1 AND event_type = ANY($2)
                    ORDER BY recorded_at ASC, aggregate_id, version ASC
                    "#,
                )
                .bind(since)
                .bind(owned)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    r#"
                    SELECT event_id, aggregate_id, aggregate_type, event_type, version,
                           payload, correlation_id, causation_id, signature, recorded_at
                    FROM transaction_events
                    WHERE recorded_at >= $1
                    ORDER BY recorded_at ASC, aggregate_id, version ASC
                    "#,
                )
                .bind(since)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(rows.into_iter().map(row_to_event).collect())
    }

    pub async fn current_version(&self, aggregate_id: Uuid) -> Result<u64, StoreError> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(version), 0) AS version FROM transaction_events WHERE aggregate_id = $1",
        )
        .bind(aggregate_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.into()))?;

        let version: i64 = row.get("version");
        Ok(version as u64)
    }

    pub async fn aggregate_ids(&self) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT aggregate_id FROM transaction_events")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.into()))?;

        Ok(rows.into_iter().map(|r| r.get("aggregate_id")).collect())
    }

    pub async fn archive_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO transaction_events_archive
            SELECT * FROM transaction_events WHERE recorded_at < $1
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(cutoff)
        .execute(tx.as_mut())
        .await?;

        let deleted = sqlx::query("DELETE FROM transaction_events WHERE recorded_at < $1")
            .bind(cutoff)
            .execute(tx.as_mut())
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505")
    )
}

fn row_to_event(row: sqlx::postgres::PgRow) -> EventRecord {
    let payload_json: serde_json::Value = row.get("payload");
    let payload = serde_json::from_value::<EventPayload>(payload_json).unwrap_or(EventPayload::Unknown);

    EventRecord {
        event_id: row.get("event_id"),
        event_type: row.get("event_type"),
        aggregate_id: row.get("aggregate_id"),
        aggregate_type: row.get("aggregate_type"),
        payload,
        metadata: EventMetadata {
            correlation_id: row.get("correlation_id"),
            causation_id: row.get("causation_id"),
            timestamp: row.get("recorded_at"),
            version: row.get::<i64, _>("version") as u64,
            signature: row.get("signature"),
        },
    }
}

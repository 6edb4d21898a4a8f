use crate::domain::command::TransactionType;
use crate::domain::transaction::{ProcessingStage, TransactionStatus};
use crate::projection::TransactionProjection;
use anyhow::Result;
use sqlx::{PgPool, Row};
use uuid::Uuid;

#[derive(Clone)]
pub struct ProjectionsRepo {
    pub pool: PgPool,
}

impl ProjectionsRepo {
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS transaction_projections (
                transaction_id UUID PRIMARY KEY,
                bond_id UUID NOT NULL,
                transaction_type TEXT NOT NULL,
                amount_minor BIGINT NOT NULL,
                status TEXT NOT NULL,
                processing_stage TEXT NOT NULL,
                risk_score DOUBLE PRECISION,
                verification_confidence DOUBLE PRECISION,
                retry_count INT NOT NULL,
                last_event_version BIGINT NOT NULL,
                created_at TIMESTAMPTZ,
                last_updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn upsert(&self, row: &TransactionProjection) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transaction_projections (
                transaction_id, bond_id, transaction_type, amount_minor, status,
                processing_stage, risk_score, verification_confidence, retry_count,
                last_event_version, created_at, last_updated_at
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12)
            ON CONFLICT (transaction_id) DO UPDATE SET
                status = EXCLUDED.status,
                processing_stage = EXCLUDED.processing_stage,
                risk_score = EXCLUDED.risk_score,
                verification_confidence = EXCLUDED.verification_confidence,
                retry_count = EXCLUDED.retry_count,
                last_event_version = EXCLUDED.last_event_version,
                last_updated_at = EXCLUDED.last_updated_at
            "#,
        )
        .bind(row.transaction_id)
        .bind(row.bond_id)
        .bind(row.transaction_type.label())
        .bind(row.amount_minor)
        .bind(status_label(row.status))
        .bind(stage_label(row.processing_stage))
        .bind(row.risk_score)
        .bind(row.verification_confidence)
        .bind(row.retry_count as i32)
        .bind(row.last_event_version as i64)
        .bind(row.created_at)
        .bind(row.last_updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, transaction_id: Uuid) -> Result<Option<TransactionProjection>> {
        let row = sqlx::query(
            r#"
            SELECT transaction_id, bond_id, transaction_type, amount_minor, status,
                   processing_stage, risk_score, verification_confidence, retry_count,
                   last_event_version, created_at, last_updated_at
            FROM transaction_projections
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(row_to_projection))
    }

    pub async fn list_by_bond(&self, bond_id: Uuid) -> Result<Vec<TransactionProjection>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, bond_id, transaction_type, amount_minor, status,
                   processing_stage, risk_score, verification_confidence, retry_count,
                   last_event_version, created_at, last_updated_at
            FROM transaction_projections
            WHERE bond_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(bond_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(row_to_projection).collect())
    }
}

fn status_label(status: TransactionStatus) -> &'static str {
    match status {
        TransactionStatus::Pending => "pending",
        TransactionStatus::Processing => "processing",
        TransactionStatus::Verified => "verified",
        TransactionStatus::Completed => "completed",
        TransactionStatus::Failed => "failed",
        TransactionStatus::Cancelled => "cancelled",
    }
}

fn parse_status(s: &str) -> TransactionStatus {
    match s {
        "processing" => TransactionStatus::Processing,
        "verified" => TransactionStatus::Verified,
        "completed" => TransactionStatus::Completed,
        "failed" => TransactionStatus::Failed,
        "cancelled" => TransactionStatus::Cancelled,
        _ => TransactionStatus::Pending,
    }
}

fn stage_label(stage: ProcessingStage) -> &'static str {
    match stage {
        ProcessingStage::Initialized => "initialized",
        ProcessingStage::Processing => "processing",
        ProcessingStage::Verified => "verified",
        ProcessingStage::Completed => "completed",
        ProcessingStage::Failed => "failed",
    }
}

fn parse_stage(s: &str) -> ProcessingStage {
    match s {
        "processing" => ProcessingStage::Processing,
        "verified" => ProcessingStage::Verified,
        "completed" => ProcessingStage::Completed,
        "failed" => ProcessingStage::Failed,
        _ => ProcessingStage::Initialized,
    }
}

fn parse_type(s: &str) -> TransactionType {
    match s {
        "refund" => TransactionType::Refund,
        "forfeiture" => TransactionType::Forfeiture,
        "adjustment" => TransactionType::Adjustment,
        "reversal" => TransactionType::Reversal,
        "correction" => TransactionType::Correction,
        _ => TransactionType::Payment,
    }
}

fn row_to_projection(row: sqlx::postgres::PgRow) -> TransactionProjection {
    TransactionProjection {
        transaction_id: row.get("transaction_id"),
        bond_id: row.get("bond_id"),
        transaction_type: parse_type(row.get("transaction_type")),
        amount_minor: row.get("amount_minor"),
        status: parse_status(row.get("status")),
        processing_stage: parse_stage(row.get("processing_stage")),
        risk_score: row.get("risk_score"),
        verification_confidence: row.get("verification_confidence"),
        retry_count: row.get::<i32, _>("retry_count") as u32,
        last_event_version: row.get::<i64, _>("last_event_version") as u64,
        created_at: row.get("created_at"),
        last_updated_at: row.get("last_updated_at"),
    }
}

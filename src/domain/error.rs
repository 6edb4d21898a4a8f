use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("amount_minor must be > 0")]
    NonPositiveAmount,
    #[error("correlation_id is required")]
    MissingCorrelation,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleViolation {
    pub rule: &'static str,
    pub reason: String,
}

impl RuleViolation {
    pub fn new(rule: &'static str, reason: impl Into<String>) -> Self {
        Self {
            rule,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationFailure {
    pub violations: Vec<RuleViolation>,
}

impl std::fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.rule, v.reason))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{joined}")
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("version conflict on aggregate {aggregate_id} at version {version}")]
    ConcurrencyConflict { aggregate_id: Uuid, version: u64 },
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("invalid command: {0}")]
    Invalid(#[from] ValidationError),
    #[error("command rejected: {0}")]
    Rejected(ValidationFailure),
    #[error("concurrent write detected, reload state and retry: {0}")]
    Conflict(StoreError),
    #[error("verification failed: {reason}")]
    VerificationFailed { reason: String, retry_count: u32 },
    #[error("transaction {0} not found")]
    NotFound(Uuid),
    #[error("transaction processing temporarily unavailable")]
    TemporarilyUnavailable,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ProcessingError {
    pub fn kind(&self) -> &'static str {
        match self {
            ProcessingError::Invalid(_) => "invalid_command",
            ProcessingError::Rejected(_) => "rejected",
            ProcessingError::Conflict(_) => "concurrency_conflict",
            ProcessingError::VerificationFailed { .. } => "verification_failed",
            ProcessingError::NotFound(_) => "not_found",
            ProcessingError::TemporarilyUnavailable => "temporarily_unavailable",
            ProcessingError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for ProcessingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ConcurrencyConflict { .. } => ProcessingError::Conflict(err),
            StoreError::Backend(inner) => ProcessingError::Internal(inner),
        }
    }
}

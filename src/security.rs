use crate::domain::command::TransactionCommand;
use crate::domain::context::{ProcessingContext, SecurityClearance};
use crate::domain::error::RuleViolation;
use crate::domain::transaction::{FinancialImpact, ImpactCategory};
use chrono::{DateTime, Duration, Utc};

pub const SIGNATURE_KEY: &str = "signature";

#[derive(Clone)]
pub struct SigningKey {
    key: [u8; 32],
}

impl SigningKey {
    pub fn from_secret(secret: &str) -> Self {
        Self {
            key: *blake3::hash(secret.as_bytes()).as_bytes(),
        }
    }

    pub fn sign(&self, message: &[u8]) -> String {
        blake3::keyed_hash(&self.key, message).to_hex().to_string()
    }
}

fn command_message(command: &TransactionCommand) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        command.request_id,
        command.correlation_id,
        command.bond_id,
        command.transaction_type.label(),
        command.amount_minor,
        command.timestamp.to_rfc3339()
    )
}

pub fn command_signature(key: &SigningKey, command: &TransactionCommand) -> String {
    key.sign(command_message(command).as_bytes())
}

pub fn attach_signature(command: TransactionCommand, key: &SigningKey) -> TransactionCommand {
    let signature = command_signature(key, &command);
    command.with_metadata(SIGNATURE_KEY, serde_json::Value::String(signature))
}

pub fn verify_command(key: &SigningKey, command: &TransactionCommand) -> bool {
    match command.metadata.get(SIGNATURE_KEY).and_then(|v| v.as_str()) {
        Some(found) => found == command_signature(key, command),
        None => false,
    }
}

pub fn event_signature(
    key: &SigningKey,
    event_id: uuid::Uuid,
    aggregate_id: uuid::Uuid,
    event_type: &str,
    version: u64,
    payload_json: &str,
) -> String {
    let message = format!("{event_id}|{aggregate_id}|{event_type}|{version}|{payload_json}");
    key.sign(message.as_bytes())
}

pub fn perimeter_check(
    command: &TransactionCommand,
    context: &ProcessingContext,
    key: &SigningKey,
    freshness_window: Duration,
    now: DateTime<Utc>,
) -> Result<(), RuleViolation> {
    if command.bond_id.is_nil() || command.amount_minor <= 0 {
        return Err(RuleViolation::new(
            "perimeter",
            "command structure failed zero-trust inspection",
        ));
    }

    if command.correlation_id.is_nil() {
        return Err(RuleViolation::new("perimeter", "correlation chain is broken"));
    }
    if command.causation_id == Some(command.request_id) {
        return Err(RuleViolation::new(
            "perimeter",
            "causation_id must not reference the command itself",
        ));
    }

    let age = now.signed_duration_since(command.timestamp);
    if age > freshness_window || age < -freshness_window {
        return Err(RuleViolation::new(
            "perimeter",
            format!("command timestamp outside freshness window of {}s", freshness_window.num_seconds()),
        ));
    }

    if !verify_command(key, command) {
        return Err(RuleViolation::new(
            "perimeter",
            "command signature missing or invalid",
        ));
    }

    let impact = FinancialImpact::assess(command.amount_minor, command.transaction_type);
    if impact.category == ImpactCategory::Critical && !context.is_cleared_for(SecurityClearance::Elevated) {
        return Err(RuleViolation::new(
            "perimeter",
            "critical-impact commands require elevated clearance",
        ));
    }

    Ok(())
}

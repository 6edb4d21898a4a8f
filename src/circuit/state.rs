use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitThresholds {
    pub failure_rate_threshold: f64,
    pub consecutive_failure_threshold: u32,
    pub window_minutes: i64,
    pub cooldown_seconds: i64,
    pub half_open_probe_ratio: f64,
    pub half_open_min_probe_count: u32,
    pub half_open_success_rate_close: f64,
    pub half_open_consecutive_success_close: u32,
    pub half_open_consecutive_failure_reopen: u32,
}

impl Default for CircuitThresholds {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.50,
            consecutive_failure_threshold: 5,
            window_minutes: 2,
            cooldown_seconds: 30,
            half_open_probe_ratio: 0.20,
            half_open_min_probe_count: 4,
            half_open_success_rate_close: 0.80,
            half_open_consecutive_success_close: 3,
            half_open_consecutive_failure_reopen: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    pub scope: String,
    pub state: CircuitState,
    pub failure_rate: f64,
    pub consecutive_failures: u32,
    pub opened_at: Option<DateTime<Utc>>,
    pub cooldown_until: Option<DateTime<Utc>>,
    pub probe_total: u32,
    pub probe_success: u32,
    pub probe_failure_streak: u32,
    pub success_streak: u32,
    pub updated_at: DateTime<Utc>,
}

impl CircuitSnapshot {
    pub fn new(scope: &str) -> Self {
        Self {
            scope: scope.to_string(),
            state: CircuitState::Closed,
            failure_rate: 0.0,
            consecutive_failures: 0,
            opened_at: None,
            cooldown_until: None,
            probe_total: 0,
            probe_success: 0,
            probe_failure_streak: 0,
            success_streak: 0,
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CircuitDecision {
    Allow,
    Probe,
    Reject(String),
}

use crate::circuit::state::CircuitSnapshot;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

const RESULT_RETENTION_MINUTES: i64 = 10;

#[derive(Default)]
struct CircuitInner {
    snapshots: HashMap<String, CircuitSnapshot>,
    results: HashMap<String, Vec<(DateTime<Utc>, bool)>>,
}

#[derive(Clone, Default)]
pub struct CircuitStore {
    inner: Arc<Mutex<CircuitInner>>,
}

impl CircuitStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self, scope: &str) -> CircuitSnapshot {
        let inner = self.inner.lock();
        inner
            .snapshots
            .get(scope)
            .cloned()
            .unwrap_or_else(|| CircuitSnapshot::new(scope))
    }

    pub fn save_snapshot(&self, snapshot: CircuitSnapshot) {
        let mut inner = self.inner.lock();
        inner.snapshots.insert(snapshot.scope.clone(), snapshot);
    }

    pub fn record_result(&self, scope: &str, success: bool, now: DateTime<Utc>) {
        let mut inner = self.inner.lock();
        let results = inner.results.entry(scope.to_string()).or_default();
        results.push((now, success));

        let horizon = now - Duration::minutes(RESULT_RETENTION_MINUTES);
        results.retain(|(at, _)| *at >= horizon);
    }

    pub fn failure_rate(&self, scope: &str, window_minutes: i64, now: DateTime<Utc>) -> f64 {
        let inner = self.inner.lock();
        let Some(results) = inner.results.get(scope) else {
            return 0.0;
        };

        let since = now - Duration::minutes(window_minutes);
        let mut total = 0u32;
        let mut failed = 0u32;
        for (at, success) in results {
            if *at >= since {
                total += 1;
                if !success {
                    failed += 1;
                }
            }
        }

        if total == 0 {
            0.0
        } else {
            failed as f64 / total as f64
        }
    }
}

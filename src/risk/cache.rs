use crate::risk::types::RiskAssessment;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone)]
pub struct RiskCache {
    inner: Arc<RwLock<HashMap<Uuid, (Instant, RiskAssessment)>>>,
    ttl: Duration,
}

impl RiskCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get(&self, transaction_id: Uuid) -> Option<RiskAssessment> {
        let read = self.inner.read().await;
        match read.get(&transaction_id) {
            Some((cached_at, assessment)) if cached_at.elapsed() <= self.ttl => Some(assessment.clone()),
            _ => None,
        }
    }

    pub async fn put(&self, transaction_id: Uuid, assessment: RiskAssessment) {
        let mut write = self.inner.write().await;
        write.insert(transaction_id, (Instant::now(), assessment));
    }
}

use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SecurityClearance {
    Standard,
    Elevated,
    System,
}

#[derive(Debug, Clone)]
pub struct ProcessingContext {
    pub actor_id: String,
    pub actor_role: String,
    pub clearance: SecurityClearance,
    pub request_id: Uuid,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl ProcessingContext {
    pub fn new(actor_id: impl Into<String>, actor_role: impl Into<String>, clearance: SecurityClearance) -> Self {
        Self {
            actor_id: actor_id.into(),
            actor_role: actor_role.into(),
            clearance,
            request_id: Uuid::new_v4(),
            client_ip: None,
            user_agent: None,
            received_at: Utc::now(),
        }
    }

    pub fn system() -> Self {
        Self::new("system", "system", SecurityClearance::System)
    }

    pub fn with_transport(mut self, client_ip: Option<String>, user_agent: Option<String>) -> Self {
        self.client_ip = client_ip;
        self.user_agent = user_agent;
        self
    }

    pub fn is_cleared_for(&self, required: SecurityClearance) -> bool {
        self.clearance >= required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clearance_ordering() {
        let ctx = ProcessingContext::new("agent-7", "clerk", SecurityClearance::Standard);
        assert!(ctx.is_cleared_for(SecurityClearance::Standard));
        assert!(!ctx.is_cleared_for(SecurityClearance::Elevated));
        assert!(ProcessingContext::system().is_cleared_for(SecurityClearance::Elevated));
    }
}

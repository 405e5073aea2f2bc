//! Alert queue and audit record types

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PendingAlert {
    pub id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub queued_at: Instant,
}

impl PendingAlert {
    pub fn new(message: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message,
            created_at: Utc::now(),
            queued_at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub delivered: bool,
    pub queue_wait_ms: u64,
    pub delivery_ms: u64,
}

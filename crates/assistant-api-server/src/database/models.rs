use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One persisted user/assistant exchange.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ChatRecord {
    pub user_id: i32,
    pub thread_id: String,
    pub message: String,
    pub response: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::database::models::ChatRecord;

// ===== REQUEST MODELS =====

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub thread_id: Option<String>,
    pub model: String,
}

// ===== RESPONSE MODELS =====

#[derive(Debug, Serialize)]
pub struct ModelListResponse {
    pub models: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub thread_id: String,
    pub model: String,
    pub chat_history: Vec<ChatHistoryItem>,
}

/// `/chat/test` response: the completion itself, no persisted history.
#[derive(Debug, Serialize)]
pub struct ChatTestResponse {
    pub response: String,
    pub thread_id: String,
    pub model: String,
    pub chat_history: Vec<ChatHistoryItem>,
}

#[derive(Debug, Serialize)]
pub struct ThreadListResponse {
    pub chats: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub message: String,
}

/// One persisted exchange, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct ChatHistoryItem {
    pub thread_id: String,
    pub message: String,
    pub response: String,
    pub model: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatRecord> for ChatHistoryItem {
    fn from(record: ChatRecord) -> Self {
        Self {
            thread_id: record.thread_id,
            message: record.message,
            response: record.response,
            model: record.model,
            timestamp: record.timestamp,
        }
    }
}

// ===== LLM WIRE MODELS =====

/// Role-tagged prompt segment sent to the completion API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String, // "system" or "user"
    pub content: String,
}

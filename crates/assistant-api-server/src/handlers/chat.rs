use axum::{
    extract::{Extension, Path},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

use crate::auth::AuthUser;
use crate::database::{ChatRecord, Repository};
use crate::models::chat::*;
use crate::services::session::{SessionCache, AVAILABLE_MODELS};
use crate::utils::error::ApiError;

pub async fn list_models() -> Json<ModelListResponse> {
    Json(ModelListResponse {
        models: AVAILABLE_MODELS.iter().map(|m| m.to_string()).collect(),
    })
}

/// Chat endpoint: runs one turn through the thread's pipeline, persists the
/// exchange, returns the full transcript.
pub async fn chat_handler(
    user: AuthUser,
    Extension(cache): Extension<Arc<SessionCache>>,
    Extension(repository): Extension<Arc<Repository>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }

    let thread_id = request
        .thread_id
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    info!(
        "Chat request: user={}, thread={}, model={}, message_len={}",
        user.user_id,
        thread_id,
        request.model,
        request.message.len()
    );

    let pipeline = cache.get_or_create(&thread_id, &request.model)?;
    let response = pipeline.send(&request.message).await?;

    // The resident pipeline's selector is authoritative; it can differ from
    // the request on a cache hit.
    let model = pipeline.model().to_string();

    let record = ChatRecord {
        user_id: user.user_id,
        thread_id: thread_id.clone(),
        message: request.message,
        response,
        model: model.clone(),
        timestamp: Utc::now(),
    };

    repository
        .insert_exchange(&record)
        .await
        .map_err(|e| ApiError::DatabaseError(format!("Failed to store exchange: {}", e)))?;

    let chat_history = repository
        .get_history(user.user_id, &thread_id)
        .await
        .map_err(|e| ApiError::DatabaseError(format!("Failed to fetch history: {}", e)))?
        .into_iter()
        .map(ChatHistoryItem::from)
        .collect();

    Ok(Json(ChatResponse {
        thread_id,
        model,
        chat_history,
    }))
}

/// Testing chat endpoint: no authentication, no persistence. Each call gets a
/// fresh thread id, so the session cache is exercised under real capacity
/// pressure.
pub async fn chat_test_handler(
    Extension(cache): Extension<Arc<SessionCache>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatTestResponse>, ApiError> {
    if request.message.trim().is_empty() {
        return Err(ApiError::BadRequest("Message must not be empty".to_string()));
    }

    let thread_id = uuid::Uuid::new_v4().to_string();

    let pipeline = cache.get_or_create(&thread_id, &request.model)?;
    let response = pipeline.send(&request.message).await?;

    Ok(Json(ChatTestResponse {
        response,
        thread_id,
        model: pipeline.model().to_string(),
        chat_history: Vec::new(),
    }))
}

pub async fn list_chats_handler(
    user: AuthUser,
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<ThreadListResponse>, ApiError> {
    let chats = repository
        .list_threads(user.user_id)
        .await
        .map_err(|e| ApiError::DatabaseError(format!("Failed to fetch chats: {}", e)))?;

    Ok(Json(ThreadListResponse { chats }))
}

pub async fn chat_history_handler(
    user: AuthUser,
    Path(thread_id): Path<String>,
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<Vec<ChatHistoryItem>>, ApiError> {
    let records = repository
        .get_history(user.user_id, &thread_id)
        .await
        .map_err(|e| ApiError::DatabaseError(format!("Failed to fetch history: {}", e)))?;

    if records.is_empty() {
        return Err(ApiError::NotFound(
            "No chat history found for this thread".to_string(),
        ));
    }

    Ok(Json(records.into_iter().map(ChatHistoryItem::from).collect()))
}

/// Delete a chat thread's transcript and drop its resident pipeline.
pub async fn delete_chat_handler(
    user: AuthUser,
    Path(thread_id): Path<String>,
    Extension(cache): Extension<Arc<SessionCache>>,
    Extension(repository): Extension<Arc<Repository>>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = repository
        .delete_thread(user.user_id, &thread_id)
        .await
        .map_err(|e| ApiError::DatabaseError(format!("Failed to delete chat: {}", e)))?;

    if deleted == 0 {
        return Err(ApiError::NotFound(
            "No chat session found to delete".to_string(),
        ));
    }

    cache.remove(&thread_id);
    info!(
        "Deleted thread {} for user {} ({} records)",
        thread_id, user.user_id, deleted
    );

    Ok(Json(DeleteResponse {
        message: "Chat session deleted successfully".to_string(),
    }))
}

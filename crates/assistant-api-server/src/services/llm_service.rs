use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::LlmConfig;
use crate::models::chat::ChatMessage;
use crate::utils::error::ApiError;

/// Narrow capability the chat pipeline needs from a completion provider.
/// Test doubles implement this to simulate latency and failure offline.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ApiError>;
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

/// Client for the OpenAI-compatible chat-completions API hosting the
/// supported models. Embeds a small fixed retry budget; callers see at most
/// one logical invocation per request.
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(config.timeout_seconds))
                .build()
                .expect("Failed to create HTTP client"),
            config,
        }
    }

    pub async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ApiError> {
        debug!(
            "Requesting completion: model={}, segments={}",
            model,
            messages.len()
        );

        let mut attempt = 0;
        loop {
            match self.request_once(model, messages).await {
                Ok(text) => return Ok(text),
                Err(err) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        "Completion attempt {}/{} failed, retrying: {}",
                        attempt, self.config.max_retries, err
                    );
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn request_once(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<String, ApiError> {
        let request = ChatCompletionRequest {
            model,
            messages,
            temperature: 0.0,
            max_tokens: self.config.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ApiError::ModelInvocation(format!("Failed to call completion API: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::ModelInvocation(format!(
                "Completion API error: {} - {}",
                status, body
            )));
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ApiError::ModelInvocation(format!("Failed to parse completion response: {}", e)))?;

        completion
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| ApiError::ModelInvocation("No choices returned from completion API".to_string()))
    }
}

#[async_trait::async_trait]
impl CompletionBackend for LlmService {
    async fn complete(&self, model: &str, messages: &[ChatMessage]) -> Result<String, ApiError> {
        self.chat_completion(model, messages).await
    }
}

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::services::llm_service::CompletionBackend;
use crate::utils::error::ApiError;

use super::prompt;
use super::types::Exchange;

/// Stateful conversational pipeline bound to one thread id and one model
/// selector. Holds the turns used to condition subsequent completions; the
/// async history lock serializes turns within the conversation without
/// touching cache membership.
pub struct ChatPipeline {
    thread_id: String,
    model: String,
    persona: Arc<String>,
    backend: Arc<dyn CompletionBackend>,
    max_history_turns: usize,
    history: Mutex<VecDeque<Exchange>>,
}

impl ChatPipeline {
    pub(crate) fn new(
        thread_id: String,
        model: String,
        persona: Arc<String>,
        backend: Arc<dyn CompletionBackend>,
        max_history_turns: usize,
    ) -> Self {
        Self {
            thread_id,
            model,
            persona,
            backend,
            max_history_turns,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Run one turn: render the prompt from retained history, make exactly one
    /// completion call, and record the exchange. A failed call leaves the
    /// history untouched.
    pub async fn send(&self, message: &str) -> Result<String, ApiError> {
        let mut history = self.history.lock().await;

        let messages = prompt::build_messages(&self.persona, history.make_contiguous(), message);
        let completion = self.backend.complete(&self.model, &messages).await?;

        history.push_back(Exchange {
            user: message.to_string(),
            assistant: completion.clone(),
        });

        // Sliding window: drop oldest turns beyond the retention cap.
        while history.len() > self.max_history_turns {
            let dropped = history.pop_front();
            debug!(
                "Thread {}: dropped oldest turn ({:?} chars) to enforce history window",
                self.thread_id,
                dropped.map(|e| e.user.len() + e.assistant.len())
            );
        }

        Ok(completion)
    }

    pub async fn history_len(&self) -> usize {
        self.history.lock().await.len()
    }
}

impl std::fmt::Debug for ChatPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatPipeline")
            .field("thread_id", &self.thread_id)
            .field("model", &self.model)
            .field("persona", &self.persona)
            .field("max_history_turns", &self.max_history_turns)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_service::MockCompletionBackend;
    use crate::services::session::prompt::NO_HISTORY_MARKER;

    fn pipeline_with(backend: MockCompletionBackend, max_turns: usize) -> ChatPipeline {
        ChatPipeline::new(
            "thread-1".to_string(),
            "gemma2-9b-it".to_string(),
            Arc::new("persona".to_string()),
            Arc::new(backend),
            max_turns,
        )
    }

    #[tokio::test]
    async fn test_first_turn_prompt_has_empty_history_marker() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .withf(|model, messages| {
                model == "gemma2-9b-it"
                    && messages.len() == 2
                    && messages[1].content.contains(NO_HISTORY_MARKER)
                    && messages[1].content.contains("Question: what is rust?")
            })
            .times(1)
            .returning(|_, _| Ok("a systems language".to_string()));

        let pipeline = pipeline_with(backend, 20);
        let response = pipeline.send("what is rust?").await.unwrap();

        assert_eq!(response, "a systems language");
        assert_eq!(pipeline.history_len().await, 1);
    }

    #[tokio::test]
    async fn test_second_turn_prompt_contains_first_exchange() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .withf(|_, messages| messages[1].content.contains(NO_HISTORY_MARKER))
            .times(1)
            .returning(|_, _| Ok("answer one".to_string()));
        backend
            .expect_complete()
            .withf(|_, messages| {
                let content = &messages[1].content;
                let q1 = content.find("User: question one");
                let a1 = content.find("IntelliHelper: answer one");
                let q2 = content.find("Question: question two");
                matches!((q1, a1, q2), (Some(q1), Some(a1), Some(q2)) if q1 < a1 && a1 < q2)
            })
            .times(1)
            .returning(|_, _| Ok("answer two".to_string()));

        let pipeline = pipeline_with(backend, 20);
        pipeline.send("question one").await.unwrap();
        let response = pipeline.send("question two").await.unwrap();

        assert_eq!(response, "answer two");
        assert_eq!(pipeline.history_len().await, 2);
    }

    #[tokio::test]
    async fn test_history_window_drops_oldest_turns() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .times(3)
            .returning(|_, _| Ok("reply".to_string()));
        // Fourth turn: oldest exchange must no longer render into the prompt.
        backend
            .expect_complete()
            .withf(|_, messages| {
                let content = &messages[1].content;
                !content.contains("User: turn 1") && content.contains("User: turn 3")
            })
            .times(1)
            .returning(|_, _| Ok("reply".to_string()));

        let pipeline = pipeline_with(backend, 2);
        pipeline.send("turn 1").await.unwrap();
        pipeline.send("turn 2").await.unwrap();
        pipeline.send("turn 3").await.unwrap();
        assert_eq!(pipeline.history_len().await, 2);
        pipeline.send("turn 4").await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_failure_leaves_history_unchanged() {
        let mut backend = MockCompletionBackend::new();
        backend
            .expect_complete()
            .times(1)
            .returning(|_, _| Err(ApiError::ModelInvocation("provider timeout".to_string())));

        let pipeline = pipeline_with(backend, 20);
        let err = pipeline.send("hello").await.unwrap_err();

        assert!(matches!(err, ApiError::ModelInvocation(_)));
        assert_eq!(pipeline.history_len().await, 0);
    }
}

use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::ChatConfig;
use crate::services::llm_service::CompletionBackend;
use crate::utils::error::ApiError;

use super::pipeline::ChatPipeline;
use super::prompt;
use super::types::is_supported_model;

/// Resident pipelines plus their insertion order. Guarded as one unit so the
/// check-evict-insert sequence is atomic: concurrent inserts at capacity can
/// never overshoot the bound or evict more than one entry each.
struct CacheInner {
    pipelines: HashMap<String, Arc<ChatPipeline>>,
    insertion_order: VecDeque<String>,
}

/// Bounded mapping from thread id to its live conversational pipeline.
///
/// At most `session_capacity` pipelines are resident; inserting past the bound
/// evicts the entry inserted longest ago. Eviction is insertion-ordered, not
/// LRU: a cache hit does not refresh an entry's position. The lock covers only
/// membership, never in-flight completion calls.
pub struct SessionCache {
    backend: Arc<dyn CompletionBackend>,
    persona: Arc<String>,
    capacity: usize,
    max_history_turns: usize,
    inner: Mutex<CacheInner>,
}

impl SessionCache {
    pub fn new(backend: Arc<dyn CompletionBackend>, config: &ChatConfig) -> Self {
        info!(
            "Initializing session cache: capacity={}, max_history_turns={}",
            config.session_capacity, config.max_history_turns
        );
        Self {
            backend,
            persona: Arc::new(prompt::default_persona_instruction()),
            capacity: config.session_capacity.max(1),
            max_history_turns: config.max_history_turns.max(1),
            inner: Mutex::new(CacheInner {
                pipelines: HashMap::new(),
                insertion_order: VecDeque::new(),
            }),
        }
    }

    /// Return the resident pipeline for `thread_id`, creating it if absent.
    ///
    /// The model selector is validated before any cache mutation. On a hit the
    /// resident pipeline's selector is authoritative; a differing selector in
    /// the request is ignored. On a miss at capacity, the oldest-inserted
    /// entry is evicted first, so the resident count never exceeds capacity.
    pub fn get_or_create(
        &self,
        thread_id: &str,
        model: &str,
    ) -> Result<Arc<ChatPipeline>, ApiError> {
        if !is_supported_model(model) {
            return Err(ApiError::UnsupportedModel(format!(
                "Model '{}' is not available",
                model
            )));
        }

        let mut inner = self.inner.lock();

        if let Some(pipeline) = inner.pipelines.get(thread_id) {
            if pipeline.model() != model {
                debug!(
                    "Thread {}: requested model '{}' ignored, resident pipeline uses '{}'",
                    thread_id,
                    model,
                    pipeline.model()
                );
            }
            return Ok(pipeline.clone());
        }

        if inner.pipelines.len() >= self.capacity {
            if let Some(oldest) = inner.insertion_order.pop_front() {
                inner.pipelines.remove(&oldest);
                info!(
                    "Session cache at capacity ({}), evicted oldest thread {}",
                    self.capacity, oldest
                );
            }
        }

        let pipeline = Arc::new(ChatPipeline::new(
            thread_id.to_string(),
            model.to_string(),
            self.persona.clone(),
            self.backend.clone(),
            self.max_history_turns,
        ));

        inner.pipelines.insert(thread_id.to_string(), pipeline.clone());
        inner.insertion_order.push_back(thread_id.to_string());
        debug!(
            "Created pipeline for thread {} ({} resident)",
            thread_id,
            inner.pipelines.len()
        );

        Ok(pipeline)
    }

    /// Drop a resident pipeline, e.g. when its thread is deleted.
    pub fn remove(&self, thread_id: &str) -> bool {
        let mut inner = self.inner.lock();
        if inner.pipelines.remove(thread_id).is_some() {
            inner.insertion_order.retain(|id| id != thread_id);
            debug!("Removed pipeline for thread {}", thread_id);
            true
        } else {
            false
        }
    }

    /// Number of resident pipelines.
    pub fn len(&self) -> usize {
        self.inner.lock().pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().pipelines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_service::MockCompletionBackend;

    const MODEL: &str = "gemma2-9b-it";

    fn cache_with_capacity(capacity: usize) -> SessionCache {
        SessionCache::new(
            Arc::new(MockCompletionBackend::new()),
            &ChatConfig {
                session_capacity: capacity,
                max_history_turns: 20,
            },
        )
    }

    #[test]
    fn test_resident_count_never_exceeds_capacity() {
        let cache = cache_with_capacity(3);
        for i in 0..50 {
            cache.get_or_create(&format!("thread-{}", i), MODEL).unwrap();
            assert!(cache.len() <= 3);
        }
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_eviction_is_insertion_ordered_not_lru() {
        let cache = cache_with_capacity(2);
        cache.get_or_create("a", MODEL).unwrap();
        cache.get_or_create("b", MODEL).unwrap();

        // Third distinct insert evicts "a", the oldest-inserted entry.
        cache.get_or_create("c", MODEL).unwrap();
        assert_eq!(cache.len(), 2);
        let b = cache.get_or_create("b", MODEL).unwrap();
        assert_eq!(b.thread_id(), "b");
        let c = cache.get_or_create("c", MODEL).unwrap();

        // The hit on "b" does not refresh its position: "b" is still the
        // oldest-inserted resident, so inserting "d" evicts "b" even though
        // it was touched after "c".
        cache.get_or_create("d", MODEL).unwrap();
        assert_eq!(cache.len(), 2);
        let c_again = cache.get_or_create("c", MODEL).unwrap();
        assert!(Arc::ptr_eq(&c, &c_again));
        let b_recreated = cache.get_or_create("b", MODEL).unwrap();
        assert!(!Arc::ptr_eq(&b, &b_recreated));
    }

    #[test]
    fn test_hit_returns_same_pipeline() {
        let cache = cache_with_capacity(2);
        let first = cache.get_or_create("a", MODEL).unwrap();
        let second = cache.get_or_create("a", MODEL).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_mismatched_model_on_hit_keeps_resident_pipeline() {
        let cache = cache_with_capacity(2);
        let first = cache.get_or_create("a", "llama-3.3-70b-versatile").unwrap();
        let second = cache.get_or_create("a", MODEL).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.model(), "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_unsupported_model_rejected_without_mutation() {
        let cache = cache_with_capacity(2);
        cache.get_or_create("a", MODEL).unwrap();

        let err = cache.get_or_create("b", "gpt-4o").unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedModel(_)));
        assert_eq!(cache.len(), 1);

        // Unsupported selector on a resident id is rejected too.
        let err = cache.get_or_create("a", "gpt-4o").unwrap_err();
        assert!(matches!(err, ApiError::UnsupportedModel(_)));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_recreated_thread_starts_with_empty_history() {
        let cache = cache_with_capacity(1);
        let original = cache.get_or_create("a", MODEL).unwrap();

        // Evict "a" by inserting another thread, then re-create it.
        cache.get_or_create("b", MODEL).unwrap();
        let recreated = cache.get_or_create("a", MODEL).unwrap();

        assert!(!Arc::ptr_eq(&original, &recreated));
        assert_eq!(recreated.history_len().await, 0);
    }

    #[test]
    fn test_remove_drops_entry() {
        let cache = cache_with_capacity(2);
        cache.get_or_create("a", MODEL).unwrap();
        cache.get_or_create("b", MODEL).unwrap();

        assert!(cache.remove("a"));
        assert!(!cache.remove("a"));
        assert_eq!(cache.len(), 1);

        // Removal also forgets insertion order: inserting two more threads
        // evicts "b" only once capacity is hit again.
        cache.get_or_create("c", MODEL).unwrap();
        assert_eq!(cache.len(), 2);
        cache.get_or_create("d", MODEL).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(!cache.remove("b"));
    }
}

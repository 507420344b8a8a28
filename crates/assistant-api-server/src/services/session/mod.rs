//! Conversation session management
//!
//! Owns the mapping from thread id to live conversational pipeline:
//! - Bounded cache with insertion-order eviction
//! - Per-thread prompt rendering and history retention
//! - Model selector allow-list

mod cache;
mod pipeline;
mod prompt;
mod types;

pub use cache::SessionCache;
pub use pipeline::ChatPipeline;
pub use prompt::ASSISTANT_NAME;
pub use types::{is_supported_model, Exchange, AVAILABLE_MODELS};

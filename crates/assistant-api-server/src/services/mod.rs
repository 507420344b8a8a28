pub mod llm_service;
pub mod session;

pub use llm_service::{CompletionBackend, LlmService};
pub use session::SessionCache;

pub mod settings;

pub use settings::{AuthConfig, ChatConfig, DatabaseConfig, LlmConfig, ServerConfig, Settings};

/// Selectors of the hosted models this deployment supports. Requests naming
/// anything else are rejected before any session state is touched.
pub const AVAILABLE_MODELS: &[&str] = &[
    "llama-3.3-70b-versatile",
    "deepseek-r1-distill-qwen-32b",
    "gemma2-9b-it",
];

pub fn is_supported_model(model: &str) -> bool {
    AVAILABLE_MODELS.contains(&model)
}

/// One completed user/assistant turn held in a pipeline's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_models() {
        assert!(is_supported_model("llama-3.3-70b-versatile"));
        assert!(is_supported_model("gemma2-9b-it"));
        assert!(!is_supported_model("gpt-4o"));
        assert!(!is_supported_model(""));
    }
}

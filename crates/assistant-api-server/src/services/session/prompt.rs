use crate::models::chat::ChatMessage;

use super::types::Exchange;

/// Assistant display name, also used as the speaker tag in rendered history.
pub const ASSISTANT_NAME: &str = "IntelliHelper";

/// Marker rendered in place of history for a fresh conversation.
pub const NO_HISTORY_MARKER: &str = "No previous conversation.";

pub fn default_persona_instruction() -> String {
    r#"You are IntelliHelper, an AI personal assistant developed by IntelliHelper Solutions.

You help users across a broad range of everyday domains:
- Technology and programming: software development, AI/ML, web, cloud, security
- Education: homework help, study tips, exam preparation, research assistance
- Business and finance: budgeting, investing, business strategy
- Health and well-being: fitness, nutrition, stress management (not a substitute for a doctor)
- Career: resume writing, interview preparation, skill development
- Entertainment and lifestyle: recommendations, travel planning, hobbies

Guidelines:
- When asked for coding help, include a short example in a relevant language
- Politely decline requests outside your scope (e.g. illegal activities)
- Keep a professional, helpful tone and stay engaging"#
        .to_string()
}

/// Render accumulated turns as alternating speaker-tagged lines, oldest first.
pub fn render_history(history: &[Exchange]) -> String {
    if history.is_empty() {
        return NO_HISTORY_MARKER.to_string();
    }

    let mut rendered = String::new();
    for exchange in history {
        rendered.push_str(&format!("User: {}\n", exchange.user));
        rendered.push_str(&format!("{}: {}\n", ASSISTANT_NAME, exchange.assistant));
    }
    rendered
}

/// Build the role-tagged prompt for one turn: persona as the system segment,
/// rendered history plus the new question as the user segment.
pub fn build_messages(persona: &str, history: &[Exchange], question: &str) -> Vec<ChatMessage> {
    let user_content = format!(
        "Conversation history:\n{}\nQuestion: {}",
        render_history(history),
        question
    );

    vec![
        ChatMessage {
            role: "system".to_string(),
            content: persona.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: user_content,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_history_renders_marker() {
        assert_eq!(render_history(&[]), NO_HISTORY_MARKER);
    }

    #[test]
    fn test_history_renders_in_order() {
        let history = vec![
            Exchange {
                user: "first question".to_string(),
                assistant: "first answer".to_string(),
            },
            Exchange {
                user: "second question".to_string(),
                assistant: "second answer".to_string(),
            },
        ];

        let rendered = render_history(&history);
        let first = rendered.find("User: first question").unwrap();
        let second = rendered.find("User: second question").unwrap();
        assert!(first < second);
        assert!(rendered.contains("IntelliHelper: first answer"));
    }

    #[test]
    fn test_build_messages_shape() {
        let messages = build_messages("persona text", &[], "hello there");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[0].content, "persona text");
        assert_eq!(messages[1].role, "user");
        assert!(messages[1].content.contains(NO_HISTORY_MARKER));
        assert!(messages[1].content.contains("Question: hello there"));
    }
}

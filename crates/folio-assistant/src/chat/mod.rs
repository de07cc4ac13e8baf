pub mod engine;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use uuid::Uuid;

use crate::intent::ComponentPayload;

pub use engine::{AssistantReply, ChatEngine, ReplyRoute};

// Context markers the composer emits; models sometimes echo them back.
static CONTEXT_MARKER_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\[Context \d+(?: \|[^\]\n]*)?\]\s*").expect("context marker regex is valid")
});
static BLANK_LINES_RE: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"\n{3,}").expect("blank lines regex is valid"));

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One turn of the conversation. Never mutated once appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<ComponentPayload>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::User,
            content: content.into(),
            component: None,
            suggestions: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        component: Option<ComponentPayload>,
        suggestions: Vec<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: ChatRole::Assistant,
            content: content.into(),
            component,
            suggestions,
            timestamp: Utc::now(),
        }
    }
}

/// Append-only conversation history ordered by creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            messages: Vec::new(),
        }
    }

    /// Append a message. A timestamp earlier than the last message's (clock
    /// skew) is raised to it so ordering stays monotonic.
    pub fn push(&mut self, mut message: ChatMessage) -> &ChatMessage {
        if let Some(last) = self.messages.last() {
            if message.timestamp < last.timestamp {
                message.timestamp = last.timestamp;
            }
        }
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip echoed context markers and excess blank lines from generated text.
pub fn clean_generated_text(text: &str) -> String {
    let stripped = CONTEXT_MARKER_RE.replace_all(text, "");
    BLANK_LINES_RE.replace_all(&stripped, "\n\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_keeps_insertion_order() {
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("hi"));
        session.push(ChatMessage::assistant("hello", None, vec![]));
        session.push(ChatMessage::user("projects?"));

        let roles: Vec<ChatRole> = session.messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![ChatRole::User, ChatRole::Assistant, ChatRole::User]);
        assert_eq!(session.recent(2).len(), 2);
        assert_eq!(session.recent(2)[0].content, "hello");
        assert_eq!(session.recent(10).len(), 3);
    }

    #[test]
    fn test_session_timestamps_are_monotonic() {
        let mut session = ChatSession::new();
        let first = session.push(ChatMessage::user("now")).timestamp;

        let mut skewed = ChatMessage::assistant("from the past", None, vec![]);
        skewed.timestamp = first - Duration::seconds(30);
        let stored = session.push(skewed).timestamp;

        assert_eq!(stored, first);
        assert!(session
            .messages()
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[test]
    fn test_default_session_gets_a_fresh_id() {
        let a = ChatSession::default();
        let b = ChatSession::default();
        assert!(!a.id.is_nil());
        assert_ne!(a.id, b.id);
        assert!(a.is_empty());
    }

    #[test]
    fn test_role_alternation_is_not_enforced() {
        let mut session = ChatSession::new();
        session.push(ChatMessage::user("one"));
        session.push(ChatMessage::user("two"));
        assert_eq!(session.len(), 2);
    }

    #[test]
    fn test_message_serialization_skips_empty_fields() {
        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(json["role"], "user");
        assert!(json.get("component").is_none());
        assert!(json.get("suggestions").is_none());
    }

    #[test]
    fn test_clean_generated_text() {
        let raw = "[Context 1 | project | Droply] Droply is my file sharing app.\n\n\n\nIt uses [Context 2] Rust.";
        assert_eq!(
            clean_generated_text(raw),
            "Droply is my file sharing app.\n\nIt uses Rust."
        );
        assert_eq!(clean_generated_text("  plain answer \n"), "plain answer");
    }
}

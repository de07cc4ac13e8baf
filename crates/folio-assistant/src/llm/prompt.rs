//! Turns a query, its retrieved context and recent history into a provider request.

use crate::chat::{ChatMessage, ChatRole};
use crate::config::{AssistantConfig, ProvidersConfig};
use crate::knowledge::PortfolioProfile;
use crate::types::KnowledgeChunk;

use super::{GeminiRequest, OpenRouterRequest, ProviderKind, ProviderMessage, ProviderRequest};

const NO_CONTEXT_BLOCK: &str =
    "No profile context matched this question. Answer from general knowledge, and say so if the question is about the portfolio owner.";

/// Per-provider model parameters, taken from config.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDefaults {
    pub gemini_model: String,
    pub gemini_api_version: String,
    pub gemini_temperature: f32,
    pub gemini_max_tokens: u32,
    pub openrouter_model: String,
    pub openrouter_temperature: f32,
    pub openrouter_max_tokens: u32,
}

impl From<&ProvidersConfig> for RequestDefaults {
    fn from(config: &ProvidersConfig) -> Self {
        Self {
            gemini_model: config.gemini.model.clone(),
            gemini_api_version: config.gemini.api_version.clone(),
            gemini_temperature: config.gemini.temperature,
            gemini_max_tokens: config.gemini.max_tokens,
            openrouter_model: config.openrouter.model.clone(),
            openrouter_temperature: config.openrouter.temperature,
            openrouter_max_tokens: config.openrouter.max_tokens,
        }
    }
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self::from(&AssistantConfig::default().providers)
    }
}

#[derive(Debug, Clone)]
pub struct PromptComposer {
    persona: String,
    history_turns: usize,
}

impl PromptComposer {
    pub fn new(persona: impl Into<String>, history_turns: usize) -> Self {
        Self {
            persona: persona.into(),
            history_turns,
        }
    }

    /// Persona speaking as the portfolio owner in the first person.
    pub fn for_profile(profile: &PortfolioProfile, history_turns: usize) -> Self {
        let persona = format!(
            "You are the AI assistant on {name}'s portfolio website. {name} is a {title} based in {location}. \
             Answer visitors' questions in the first person as {name}, in a friendly and concise way. \
             Use the profile context when it is relevant and never invent jobs, projects or contact details \
             that are not in it.",
            name = profile.name,
            title = profile.title,
            location = profile.location,
        );
        Self::new(persona, history_turns)
    }

    pub fn persona(&self) -> &str {
        &self.persona
    }

    pub fn history_turns(&self) -> usize {
        self.history_turns
    }

    pub fn context_block(&self, context: &[KnowledgeChunk]) -> String {
        if context.is_empty() {
            return NO_CONTEXT_BLOCK.to_string();
        }

        let mut block = String::from("Profile context:\n");
        for (i, chunk) in context.iter().enumerate() {
            block.push_str(&format!(
                "[Context {} | {} | {}]\n{}\n\n",
                i + 1,
                chunk.metadata.chunk_type.as_str(),
                chunk.metadata.title,
                chunk.text
            ));
        }
        block.truncate(block.trim_end().len());
        block
    }

    fn recent<'a>(&self, history: &'a [ChatMessage]) -> &'a [ChatMessage] {
        let start = history.len().saturating_sub(self.history_turns);
        &history[start..]
    }

    /// Single-turn prompt: persona, context, transcript, question.
    pub fn gemini_prompt(&self, query: &str, context: &[KnowledgeChunk], history: &[ChatMessage]) -> String {
        let mut parts = Vec::with_capacity(4);
        parts.push(self.persona.clone());
        parts.push(self.context_block(context));

        let recent = self.recent(history);
        if !recent.is_empty() {
            let transcript = recent
                .iter()
                .map(|m| match m.role {
                    ChatRole::User => format!("Visitor: {}", m.content),
                    ChatRole::Assistant => format!("You: {}", m.content),
                })
                .collect::<Vec<_>>()
                .join("\n");
            parts.push(format!("Conversation so far:\n{}", transcript));
        }

        parts.push(format!("Visitor question: {}", query));
        parts.join("\n\n")
    }

    /// Chat-completion messages: system persona with context, history, then the query.
    pub fn openrouter_messages(
        &self,
        query: &str,
        context: &[KnowledgeChunk],
        history: &[ChatMessage],
    ) -> Vec<ProviderMessage> {
        let mut messages = Vec::with_capacity(self.history_turns + 2);
        messages.push(ProviderMessage::system(format!(
            "{}\n\n{}",
            self.persona,
            self.context_block(context)
        )));

        for message in self.recent(history) {
            if message.content.trim().is_empty() {
                continue;
            }
            messages.push(match message.role {
                ChatRole::User => ProviderMessage::user(message.content.clone()),
                ChatRole::Assistant => ProviderMessage::assistant(message.content.clone()),
            });
        }

        messages.push(ProviderMessage::user(query));
        messages
    }

    pub fn compose(
        &self,
        kind: ProviderKind,
        query: &str,
        context: &[KnowledgeChunk],
        history: &[ChatMessage],
        defaults: &RequestDefaults,
    ) -> ProviderRequest {
        match kind {
            ProviderKind::Gemini => ProviderRequest::Gemini(GeminiRequest {
                prompt: self.gemini_prompt(query, context, history),
                model: defaults.gemini_model.clone(),
                api_version: defaults.gemini_api_version.clone(),
                temperature: defaults.gemini_temperature,
                max_tokens: defaults.gemini_max_tokens,
            }),
            ProviderKind::OpenRouter => ProviderRequest::OpenRouter(OpenRouterRequest {
                messages: self.openrouter_messages(query, context, history),
                model: defaults.openrouter_model.clone(),
                temperature: defaults.openrouter_temperature,
                max_tokens: defaults.openrouter_max_tokens,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MessageRole;
    use crate::types::{ChunkDraft, ChunkType};

    fn chunk(id: &str, text: &str) -> KnowledgeChunk {
        ChunkDraft::new(id, ChunkType::Project, "Droply", text.to_string()).with_embedding(vec![1.0])
    }

    fn composer() -> PromptComposer {
        PromptComposer::for_profile(&PortfolioProfile::sample(), 2)
    }

    #[test]
    fn test_context_blocks_are_numbered() {
        let context = vec![chunk("project-1", "Droply is a file sharing app."), chunk("bio", "I build things.")];
        let block = composer().context_block(&context);
        assert!(block.starts_with("Profile context:"));
        assert!(block.contains("[Context 1 | project | Droply]\nDroply is a file sharing app."));
        assert!(block.contains("[Context 2 | project | Droply]\nI build things."));
        assert!(!block.ends_with('\n'));
    }

    #[test]
    fn test_empty_context_is_explicit() {
        let prompt = composer().gemini_prompt("Explain quantum computing", &[], &[]);
        assert!(prompt.contains(NO_CONTEXT_BLOCK));
        assert!(prompt.ends_with("Visitor question: Explain quantum computing"));
    }

    #[test]
    fn test_gemini_prompt_keeps_only_recent_history() {
        let history = vec![
            ChatMessage::user("first question"),
            ChatMessage::assistant("first answer", None, vec![]),
            ChatMessage::user("second question"),
        ];
        let prompt = composer().gemini_prompt("third", &[], &history);
        assert!(!prompt.contains("first question"));
        assert!(prompt.contains("You: first answer"));
        assert!(prompt.contains("Visitor: second question"));
    }

    #[test]
    fn test_openrouter_messages_layout() {
        let history = vec![
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello!", None, vec![]),
        ];
        let context = vec![chunk("project-1", "Droply is a file sharing app.")];
        let messages = composer().openrouter_messages("what stack?", &context, &history);

        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, MessageRole::System);
        assert!(messages[0].content.contains("Droply is a file sharing app."));
        assert_eq!(messages[1].role, MessageRole::User);
        assert_eq!(messages[2].role, MessageRole::Assistant);
        assert_eq!(messages[3], ProviderMessage::user("what stack?"));
    }

    #[test]
    fn test_compose_uses_defaults() {
        let defaults = RequestDefaults::default();
        let request = composer().compose(ProviderKind::OpenRouter, "hi", &[], &[], &defaults);
        assert_eq!(request.kind(), ProviderKind::OpenRouter);
        assert_eq!(request.model(), defaults.openrouter_model);

        let request = composer().compose(ProviderKind::Gemini, "hi", &[], &[], &defaults);
        match request {
            ProviderRequest::Gemini(r) => {
                assert_eq!(r.api_version, defaults.gemini_api_version);
                assert!(r.prompt.contains("Visitor question: hi"));
            }
            ProviderRequest::OpenRouter(_) => panic!("expected gemini request"),
        }
    }
}

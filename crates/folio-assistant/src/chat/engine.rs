use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::intent::{CannedTopic, IntentCategory, IntentRouter, Route};
use crate::llm::{
    generate_with_retry, Generation, PromptComposer, ProviderError, ProviderErrorKind, ProviderKind,
    RequestDefaults, RetryPolicy, TextProvider,
};
use crate::search::Retriever;
use crate::types::KnowledgeChunk;

use super::{clean_generated_text, ChatMessage, ChatSession};

const GENERATED_FOLLOW_UPS: [IntentCategory; 3] = [
    IntentCategory::Projects,
    IntentCategory::Skills,
    IntentCategory::Contact,
];

/// How a turn was answered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum ReplyRoute {
    /// Rule-matched; no retrieval or provider call.
    Canned { topic: CannedTopic },
    /// No rule matched and AI mode is off.
    Help,
    Generated {
        provider: ProviderKind,
        model: String,
        context_ids: Vec<String>,
        used_fallback: bool,
    },
    Failed {
        provider: ProviderKind,
        kind: ProviderErrorKind,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantReply {
    pub message: ChatMessage,
    pub route: ReplyRoute,
}

/// One conversation: rule router first, provider pipeline for fallthrough
/// queries when AI mode is on.
pub struct ChatEngine {
    router: IntentRouter,
    retriever: Arc<Retriever>,
    primary: Arc<dyn TextProvider>,
    fallback: Option<Arc<dyn TextProvider>>,
    composer: PromptComposer,
    defaults: RequestDefaults,
    retry: RetryPolicy,
    top_k: usize,
    ai_mode: AtomicBool,
    session: RwLock<ChatSession>,
}

impl ChatEngine {
    pub fn new(
        router: IntentRouter,
        retriever: Arc<Retriever>,
        primary: Arc<dyn TextProvider>,
        composer: PromptComposer,
    ) -> Self {
        Self {
            router,
            retriever,
            primary,
            fallback: None,
            composer,
            defaults: RequestDefaults::default(),
            retry: RetryPolicy::default(),
            top_k: 3,
            ai_mode: AtomicBool::new(false),
            session: RwLock::new(ChatSession::new()),
        }
    }

    pub fn with_fallback(mut self, fallback: Arc<dyn TextProvider>) -> Self {
        if fallback.kind() == self.primary.kind() {
            tracing::warn!(provider = %fallback.kind(), "Fallback provider matches primary, ignoring");
            return self;
        }
        self.fallback = Some(fallback);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_ai_mode(self, enabled: bool) -> Self {
        self.set_ai_mode(enabled);
        self
    }

    pub fn set_ai_mode(&self, enabled: bool) {
        self.ai_mode.store(enabled, Ordering::Relaxed);
        tracing::info!(ai_mode = enabled, "AI mode toggled");
    }

    pub fn ai_mode(&self) -> bool {
        self.ai_mode.load(Ordering::Relaxed)
    }

    pub fn router(&self) -> &IntentRouter {
        &self.router
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.session.read().messages().to_vec()
    }

    /// Start a new conversation, dropping the current history.
    pub fn reset(&self) {
        *self.session.write() = ChatSession::new();
    }

    /// Answer one user turn and record both messages in the session.
    pub async fn handle_message(&self, query: &str) -> AssistantReply {
        let query = query.trim();
        let history = {
            let mut session = self.session.write();
            let history = session.recent(self.composer.history_turns()).to_vec();
            session.push(ChatMessage::user(query));
            history
        };

        let reply = match self.router.classify(query) {
            Route::Canned(response) => AssistantReply {
                message: ChatMessage::assistant(response.text, Some(response.component), response.suggestions),
                route: ReplyRoute::Canned { topic: response.topic },
            },
            Route::Fallthrough if !self.ai_mode() || query.is_empty() => {
                let help = self.router.help();
                AssistantReply {
                    message: ChatMessage::assistant(help.text, Some(help.component), help.suggestions),
                    route: ReplyRoute::Help,
                }
            }
            Route::Fallthrough => self.generate_reply(query, &history).await,
        };

        self.session.write().push(reply.message.clone());
        reply
    }

    async fn generate_reply(&self, query: &str, history: &[ChatMessage]) -> AssistantReply {
        let context = self.retriever.retrieve(query, self.top_k).await;
        let context_ids: Vec<String> = context.iter().map(|c| c.id.clone()).collect();
        if context.is_empty() {
            tracing::info!("Generating without profile context");
        }

        let primary = self.primary.as_ref();
        let mut outcome = self.generate_with(primary, query, &context, history).await;
        let mut used_fallback = false;

        if let (Err(error), Some(fallback)) = (&outcome, &self.fallback) {
            if error.kind.is_availability_failure() {
                tracing::warn!(
                    primary = %primary.kind(),
                    fallback = %fallback.kind(),
                    kind = ?error.kind,
                    "Primary provider unavailable, failing over"
                );
                outcome = self.generate_with(fallback.as_ref(), query, &context, history).await;
                used_fallback = true;
            }
        }

        let provider = match (&self.fallback, used_fallback) {
            (Some(fallback), true) => fallback.kind(),
            _ => primary.kind(),
        };

        match outcome {
            Ok(generation) => AssistantReply {
                message: ChatMessage::assistant(
                    generation.text,
                    None,
                    GENERATED_FOLLOW_UPS.iter().map(|c| c.canonical_query().to_string()).collect(),
                ),
                route: ReplyRoute::Generated {
                    provider,
                    model: generation.model,
                    context_ids,
                    used_fallback,
                },
            },
            Err(error) => {
                tracing::error!(provider = %provider, kind = ?error.kind, error = %error, "Generation failed");
                AssistantReply {
                    message: ChatMessage::assistant(error.user_message(), None, Vec::new()),
                    route: ReplyRoute::Failed {
                        provider,
                        kind: error.kind,
                    },
                }
            }
        }
    }

    async fn generate_with(
        &self,
        provider: &dyn TextProvider,
        query: &str,
        context: &[KnowledgeChunk],
        history: &[ChatMessage],
    ) -> Result<Generation, ProviderError> {
        let request = self
            .composer
            .compose(provider.kind(), query, context, history, &self.defaults);
        let mut generation = generate_with_retry(provider, &request, &self.retry).await?;
        generation.text = clean_generated_text(&generation.text);
        if generation.text.is_empty() {
            return Err(ProviderError::invalid_response(
                "Generated text was empty after removing context markers",
            ));
        }
        Ok(generation)
    }
}

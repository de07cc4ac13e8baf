//! Rule router for chat queries.
//!
//! Precedence: a project title anywhere in the query wins outright, then the
//! categories in [`CATEGORY_PRECEDENCE`] order. A query matching nothing is a
//! [`Route::Fallthrough`]; [`IntentRouter::respond`] turns that into the help
//! menu. Matched intents never touch retrieval or an LLM provider. Whether a
//! fallthrough reaches the provider pipeline is decided by the caller's AI-mode
//! toggle, not here.

pub mod keywords;
pub mod responses;

use std::sync::Arc;

use crate::knowledge::PortfolioProfile;
use crate::types::normalize_query;

pub use keywords::{expand_keyword, IntentCategory, TypoRule, CATEGORY_PRECEDENCE, KEYWORD_TABLE};
pub use responses::{CannedResponse, CannedTopic, ComponentPayload, HelpEntry, TraitKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Canned(CannedResponse),
    Fallthrough,
}

struct CompiledCategory {
    category: IntentCategory,
    patterns: Vec<String>,
}

pub struct IntentRouter {
    profile: Arc<PortfolioProfile>,
    categories: Vec<CompiledCategory>,
}

impl IntentRouter {
    pub fn new(profile: Arc<PortfolioProfile>) -> Self {
        let categories = CATEGORY_PRECEDENCE
            .iter()
            .map(|category| {
                let patterns = KEYWORD_TABLE
                    .iter()
                    .filter(|entry| entry.category == *category)
                    .flat_map(|entry| {
                        entry
                            .keywords
                            .iter()
                            .flat_map(move |kw| expand_keyword(kw, entry.typo_rules))
                    })
                    .collect();
                CompiledCategory {
                    category: *category,
                    patterns,
                }
            })
            .collect();

        Self { profile, categories }
    }

    pub fn profile(&self) -> &PortfolioProfile {
        &self.profile
    }

    /// Which content category the query hits first, ignoring project titles.
    pub fn match_category(&self, query: &str) -> Option<IntentCategory> {
        let padded = format!(" {} ", normalize_query(query));
        self.categories
            .iter()
            .find(|c| c.patterns.iter().any(|p| padded.contains(p.as_str())))
            .map(|c| c.category)
    }

    pub fn classify(&self, query: &str) -> Route {
        if let Some(project) = self.profile.project_mentioned_in(query) {
            tracing::debug!(project = %project.title, "Routed to project detail");
            return Route::Canned(responses::project_response(project));
        }

        match self.match_category(query) {
            Some(category) => {
                tracing::debug!(category = ?category, "Routed to canned category");
                Route::Canned(responses::category_response(&self.profile, category))
            }
            None => {
                tracing::debug!("No rule matched");
                Route::Fallthrough
            }
        }
    }

    /// Canned-only routing: unmatched queries get the help menu.
    pub fn respond(&self, query: &str) -> CannedResponse {
        match self.classify(query) {
            Route::Canned(response) => response,
            Route::Fallthrough => responses::help_response(),
        }
    }

    pub fn help(&self) -> CannedResponse {
        responses::help_response()
    }

    /// The candidates that fall through to retrieval. Rule-matched ones never
    /// need a query embedding and are dropped.
    pub fn retrieval_queries<'a>(&self, candidates: &'a [String]) -> Vec<&'a str> {
        candidates
            .iter()
            .map(String::as_str)
            .filter(|q| match self.classify(q) {
                Route::Fallthrough => true,
                Route::Canned(_) => {
                    tracing::warn!(query = %q, "Indexed query is answered by a rule, skipping");
                    false
                }
            })
            .collect()
    }
}

//! Fabrication source adapter.

use super::{ArticleSource, ensure_active};
use crate::llm::{LlmProvider, extract_json_from_response};
use crate::models::{Article, Category};
use crate::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const SOURCE_NAME: &str = "fabrication";

/// Builds the system instruction for a given sentence budget.
#[must_use]
pub fn system_prompt(max_sentences: usize) -> String {
    format!(
        "You are an AI assistant for a trivia game. You will create a plausible-sounding \
         but entirely fictional subject that fits a given category.\n\
         Generate a fake Wikipedia article \"title\" and a one-paragraph \"summary\".\n\
         The summary must be about {max_sentences} sentences long and sound encyclopedic.\n\
         Respond ONLY with a valid JSON object with \"title\" and \"summary\" keys. \
         Respond only in English."
    )
}

/// Produces fabricated articles from a generative text service.
///
/// Makes a single attempt per call. Retries and fallback belong to the caller.
pub struct FabricationSource {
    provider: Arc<dyn LlmProvider>,
    max_sentences: usize,
    cancel: CancellationToken,
}

impl FabricationSource {
    /// Creates a source over the given provider.
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>) -> Self {
        Self {
            provider,
            max_sentences: 6,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the sentence budget requested from the service.
    #[must_use]
    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences.max(1);
        self
    }

    /// Checks `cancel` before the network call.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Requests one fabricated article for `category`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] for a blank category
    /// - [`Error::Config`] when the provider has no credential (no request is made)
    /// - [`Error::MalformedResponse`] when the reply is not a complete `{title, summary}` object
    /// - [`Error::Transport`] / [`Error::Cancelled`] from the call itself
    pub fn generate(&self, category: &str) -> Result<Article> {
        if category.trim().is_empty() {
            return Err(Error::InvalidInput(
                "category must be a non-empty string".to_string(),
            ));
        }
        if !self.provider.is_configured() {
            return Err(Error::Config(format!(
                "{} credential not configured; set OPENAI_API_KEY",
                self.provider.name()
            )));
        }
        ensure_active(&self.cancel)?;

        let response = self.provider.complete_json(
            &system_prompt(self.max_sentences),
            &format!("Category: {category}"),
        )?;
        parse_fabrication(&response, category)
    }

    /// Like [`generate`](Self::generate) but collapses every failure into `None`.
    pub fn fetch_fake(&self, category: &Category) -> Option<Article> {
        match self.generate(category.as_str()) {
            Ok(article) => Some(article),
            Err(e) => {
                tracing::warn!(category = %category, error = %e, "Fabrication failed");
                None
            },
        }
    }
}

impl ArticleSource for FabricationSource {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article> {
        if is_truth {
            return Err(Error::InvalidInput(
                "the generative service only serves fabricated articles".to_string(),
            ));
        }
        self.generate(category.as_str())
    }
}

/// Validates a generative reply and turns it into a fabricated article.
///
/// # Errors
///
/// Returns [`Error::MalformedResponse`] if the reply is empty, not a JSON
/// object, or lacks a non-empty string `title` or `summary`.
pub fn parse_fabrication(response: &str, category: &str) -> Result<Article> {
    let malformed = |reason: &str| Error::MalformedResponse {
        source_name: SOURCE_NAME,
        reason: reason.to_string(),
    };

    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(malformed("empty response"));
    }
    // Fenced or prefixed replies only get unwrapped when the raw text is not JSON.
    let value: serde_json::Value = serde_json::from_str(trimmed)
        .or_else(|_| serde_json::from_str(extract_json_from_response(trimmed)))
        .map_err(|e| malformed(&format!("not JSON: {e}")))?;
    let object = value
        .as_object()
        .ok_or_else(|| malformed("response is not a JSON object"))?;

    let field = |name: &str| {
        object
            .get(name)
            .and_then(serde_json::Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| malformed(&format!("missing or empty '{name}'")))
    };
    let title = field("title")?;
    let summary = field("summary")?;

    Ok(Article::fabricated(title, summary, category))
}

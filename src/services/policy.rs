//! Tiered fallback policy.

use crate::models::{Article, Category};
use crate::sources::{ArticleSource, ensure_active};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Ordered source tiers for one round slot: live source, retries, static store.
///
/// The same policy shape serves the genuine and the fabricated slots; only
/// the sources and retry count differ.
#[derive(Clone)]
pub struct FallbackPolicy {
    primary: Option<Arc<dyn ArticleSource>>,
    secondary: Arc<dyn ArticleSource>,
    max_retries: u32,
}

impl FallbackPolicy {
    /// Creates a policy that tries `primary` `1 + max_retries` times before `secondary`.
    #[must_use]
    pub fn new(
        primary: Arc<dyn ArticleSource>,
        secondary: Arc<dyn ArticleSource>,
        max_retries: u32,
    ) -> Self {
        Self {
            primary: Some(primary),
            secondary,
            max_retries,
        }
    }

    /// Creates a policy that only consults `secondary`.
    #[must_use]
    pub fn secondary_only(secondary: Arc<dyn ArticleSource>) -> Self {
        Self {
            primary: None,
            secondary,
            max_retries: 0,
        }
    }

    /// Extra primary attempts after the first failure.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Whether a live tier is configured.
    #[must_use]
    pub const fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Fetches one article, walking the tiers until one yields a valid article.
    ///
    /// Non-retryable primary errors skip the remaining retries and go
    /// straight to the secondary tier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if the token trips between attempts and
    /// [`Error::RoundBuild`] once every tier has failed.
    pub fn fetch(
        &self,
        category: &Category,
        is_truth: bool,
        cancel: &CancellationToken,
    ) -> Result<Article> {
        let slot = slot_name(is_truth);
        let mut primary_error: Option<Error> = None;

        if let Some(primary) = &self.primary {
            for attempt in 1..=self.max_retries.saturating_add(1) {
                ensure_active(cancel)?;
                match attempt_fetch(primary.as_ref(), category, is_truth) {
                    Ok(article) => return Ok(article),
                    Err(Error::Cancelled) => return Err(Error::Cancelled),
                    Err(e) => {
                        tracing::warn!(
                            source = primary.name(),
                            slot,
                            attempt,
                            error = %e,
                            "Live fetch failed"
                        );
                        let retryable = e.is_retryable();
                        primary_error = Some(e);
                        if !retryable {
                            break;
                        }
                    },
                }
            }

            metrics::counter!("article_fallback_total", "slot" => slot).increment(1);
            tracing::info!(
                from = primary.name(),
                to = self.secondary.name(),
                slot,
                "Falling back"
            );
        }

        ensure_active(cancel)?;
        match attempt_fetch(self.secondary.as_ref(), category, is_truth) {
            Ok(article) => Ok(article),
            Err(Error::Cancelled) => Err(Error::Cancelled),
            Err(e) => {
                let cause = match primary_error {
                    Some(primary) => format!("{primary}; then {e}"),
                    None => e.to_string(),
                };
                Err(Error::RoundBuild {
                    category: category.to_string(),
                    slot,
                    cause,
                })
            },
        }
    }
}

impl std::fmt::Debug for FallbackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackPolicy")
            .field("primary", &self.primary.as_ref().map(|p| p.name()))
            .field("secondary", &self.secondary.name())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Round slot label for logs and errors.
const fn slot_name(is_truth: bool) -> &'static str {
    if is_truth { "genuine" } else { "fabricated" }
}

/// One call against one tier, discarding articles that break the contract.
fn attempt_fetch(source: &dyn ArticleSource, category: &Category, is_truth: bool) -> Result<Article> {
    let started = Instant::now();
    let result = source
        .fetch_article(category, is_truth)
        .and_then(|article| validate(source.name(), article, is_truth));

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    metrics::counter!(
        "article_fetch_total",
        "source" => source.name(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("article_fetch_duration_ms", "source" => source.name())
        .record(started.elapsed().as_secs_f64() * 1000.0);

    result
}

fn validate(source_name: &'static str, article: Article, is_truth: bool) -> Result<Article> {
    if article.is_truth != is_truth {
        return Err(Error::MalformedResponse {
            source_name,
            reason: format!("expected is_truth={is_truth}"),
        });
    }
    if let Some(field) = article.blank_field() {
        return Err(Error::MalformedResponse {
            source_name,
            reason: format!("blank {field}"),
        });
    }
    Ok(article)
}

//! Article sources.
//!
//! Every tier of content (live knowledge base, generative service, bundled
//! dataset) implements [`ArticleSource`], so the fallback policy can compose
//! them without knowing which is which.

mod fabrication;
mod local;
mod wiki;

pub use fabrication::{FabricationSource, parse_fabrication, system_prompt};
pub use local::{BUNDLED_DATASET, LocalArticleStore, parse_articles};
pub use wiki::{
    KnowledgeBase, PageText, WikiSource, WikipediaClient, condense_summary, is_meta_page,
    split_sentences,
};

use crate::models::{Article, Category};
use crate::{Error, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Capability shared by every article tier.
pub trait ArticleSource: Send + Sync {
    /// Short name used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Produces one article for `category` with the requested truth flag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] when the source cannot serve the
    /// requested truth flag, and a source-specific error otherwise.
    fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article>;
}

impl<S: ArticleSource + ?Sized> ArticleSource for Arc<S> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article> {
        (**self).fetch_article(category, is_truth)
    }
}

/// Fails with [`Error::Cancelled`] once the token has tripped.
pub fn ensure_active(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

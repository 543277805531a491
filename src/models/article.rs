//! Article type shown to the player.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One candidate summary in a round, genuine or fabricated.
///
/// Every field is required when deserializing; an entry without
/// `is_truth` is rejected rather than defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Article {
    /// Article title.
    pub title: String,
    /// Condensed article body.
    pub summary: String,
    /// Category the article was produced for.
    pub category: String,
    /// `true` for genuine content, `false` for fabricated content.
    pub is_truth: bool,
}

impl Article {
    /// Creates a genuine article.
    #[must_use]
    pub fn genuine(
        title: impl Into<String>,
        summary: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            category: category.into(),
            is_truth: true,
        }
    }

    /// Creates a fabricated article.
    #[must_use]
    pub fn fabricated(
        title: impl Into<String>,
        summary: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            summary: summary.into(),
            category: category.into(),
            is_truth: false,
        }
    }

    /// Returns the name of the first blank text field, if any.
    #[must_use]
    pub fn blank_field(&self) -> Option<&'static str> {
        if self.title.trim().is_empty() {
            Some("title")
        } else if self.summary.trim().is_empty() {
            Some("summary")
        } else if self.category.trim().is_empty() {
            Some("category")
        } else {
            None
        }
    }

    /// Whether every text field is populated.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.blank_field().is_none()
    }
}

impl fmt::Display for Article {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.summary)
    }
}

/// Returns `true` iff the chosen article is the fabricated one.
#[must_use]
pub const fn check_answer(article: &Article) -> bool {
    !article.is_truth
}

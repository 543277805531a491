//! A single playable round.

use super::{Article, Category};
use crate::{Error, Result};

/// Three candidate articles for one category, exactly one of them fabricated.
///
/// A round is built per question and dropped once the player answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    category: Category,
    articles: Vec<Article>,
}

impl Round {
    /// Number of articles in every round.
    pub const SIZE: usize = 3;

    /// Creates a round, enforcing the size and single-fabrication invariants.
    pub fn new(category: Category, articles: Vec<Article>) -> Result<Self> {
        if articles.len() != Self::SIZE {
            return Err(Error::InvalidInput(format!(
                "a round needs {} articles, got {}",
                Self::SIZE,
                articles.len()
            )));
        }
        let fabricated = articles.iter().filter(|a| !a.is_truth).count();
        if fabricated != 1 {
            return Err(Error::InvalidInput(format!(
                "a round needs exactly one fabricated article, got {fabricated}"
            )));
        }
        if let Some(field) = articles.iter().find_map(Article::blank_field) {
            return Err(Error::InvalidInput(format!(
                "round article has a blank {field}"
            )));
        }
        Ok(Self { category, articles })
    }

    /// The category this round was built for.
    #[must_use]
    pub const fn category(&self) -> &Category {
        &self.category
    }

    /// The articles in presentation order.
    #[must_use]
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    /// Zero-based position of the fabricated article.
    #[must_use]
    pub fn fabricated_index(&self) -> usize {
        self.articles
            .iter()
            .position(|a| !a.is_truth)
            .unwrap_or_default()
    }

    /// Checks a zero-based answer, returning `true` when it names the fabrication.
    pub fn check(&self, index: usize) -> Result<bool> {
        self.articles
            .get(index)
            .map(super::check_answer)
            .ok_or_else(|| {
                Error::InvalidInput(format!(
                    "answer {} is out of range 1..={}",
                    index + 1,
                    self.articles.len()
                ))
            })
    }

    /// Consumes the round, returning its articles.
    #[must_use]
    pub fn into_articles(self) -> Vec<Article> {
        self.articles
    }
}

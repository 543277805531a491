//! Static fallback store backed by a JSON dataset.

use super::ArticleSource;
use crate::models::{Article, Category};
use crate::{Error, Result};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Dataset compiled into the binary.
pub const BUNDLED_DATASET: &str = include_str!("../../data/responses.json");

#[derive(Debug, Clone)]
enum StoreOrigin {
    Bundled,
    File(PathBuf),
    Memory,
}

impl StoreOrigin {
    fn describe(&self) -> String {
        match self {
            Self::Bundled => "bundled dataset".to_string(),
            Self::File(path) => path.display().to_string(),
            Self::Memory => "memory".to_string(),
        }
    }
}

/// Vetted genuine and fabricated articles, loaded once and read-only afterwards.
///
/// Loading is explicit ([`load`](Self::load)) but also happens on the first
/// [`pick_random`](Self::pick_random), so a store can be handed to the round
/// assembler before anything touches the disk.
#[derive(Debug)]
pub struct LocalArticleStore {
    origin: StoreOrigin,
    articles: OnceLock<Vec<Article>>,
}

impl LocalArticleStore {
    /// A store over the bundled dataset.
    #[must_use]
    pub const fn bundled() -> Self {
        Self {
            origin: StoreOrigin::Bundled,
            articles: OnceLock::new(),
        }
    }

    /// A store over a JSON file.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: StoreOrigin::File(path.into()),
            articles: OnceLock::new(),
        }
    }

    /// A store over articles already in memory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if no article survives validation.
    pub fn from_articles(articles: Vec<Article>) -> Result<Self> {
        let articles: Vec<Article> = articles
            .into_iter()
            .filter(|article| match article.blank_field() {
                Some(field) => {
                    tracing::warn!(title = %article.title, "Skipping article with blank {field}");
                    false
                },
                None => true,
            })
            .collect();
        if articles.is_empty() {
            return Err(Error::Load {
                origin: StoreOrigin::Memory.describe(),
                cause: "no valid articles".to_string(),
            });
        }
        Ok(Self {
            origin: StoreOrigin::Memory,
            articles: OnceLock::from(articles),
        })
    }

    /// Loads the dataset if it has not been loaded yet.
    ///
    /// Returns the number of articles held. Repeat calls do not re-read.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the data is missing, unreadable, not a
    /// JSON list, or contains no valid entry.
    pub fn load(&self) -> Result<usize> {
        Ok(self.articles()?.len())
    }

    /// Whether the dataset is in memory.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        self.articles.get().is_some()
    }

    /// Number of loaded articles, zero before loading.
    #[must_use]
    pub fn len(&self) -> usize {
        self.articles.get().map_or(0, Vec::len)
    }

    /// Whether no articles are loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The loaded articles, loading them first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if loading fails.
    pub fn articles(&self) -> Result<&[Article]> {
        if let Some(articles) = self.articles.get() {
            return Ok(articles);
        }

        let origin = self.origin.describe();
        let parsed = match &self.origin {
            StoreOrigin::Bundled => parse_articles(BUNDLED_DATASET, &origin)?,
            StoreOrigin::File(path) => parse_articles(&read_dataset(path)?, &origin)?,
            StoreOrigin::Memory => Vec::new(),
        };
        tracing::debug!(origin = %origin, count = parsed.len(), "Loaded fallback dataset");

        // A concurrent loader may have won; either copy is identical.
        let articles = self.articles.get_or_init(|| parsed);
        Ok(articles)
    }

    /// Picks a uniformly random article matching `category` and `is_truth`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] when nothing matches, or [`Error::Load`]
    /// if the dataset cannot be loaded.
    pub fn pick_random(&self, category: &Category, is_truth: bool) -> Result<Article> {
        self.pick_random_with(&mut rand::rng(), category, is_truth)
    }

    /// [`pick_random`](Self::pick_random) with a caller-supplied RNG.
    ///
    /// # Errors
    ///
    /// Same as [`pick_random`](Self::pick_random).
    pub fn pick_random_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        category: &Category,
        is_truth: bool,
    ) -> Result<Article> {
        let candidates: Vec<&Article> = self
            .articles()?
            .iter()
            .filter(|a| a.category == category.as_str() && a.is_truth == is_truth)
            .collect();

        candidates
            .choose(rng)
            .map(|article| (*article).clone())
            .ok_or_else(|| Error::NotFound {
                category: category.to_string(),
                is_truth,
            })
    }
}

impl ArticleSource for LocalArticleStore {
    fn name(&self) -> &'static str {
        "local"
    }

    fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article> {
        self.pick_random(category, is_truth)
    }
}

fn read_dataset(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::Load {
        origin: path.display().to_string(),
        cause: e.to_string(),
    })
}

/// Parses a dataset, skipping entries that are not complete articles.
///
/// # Errors
///
/// Returns [`Error::Load`] if the text is not a JSON list or no entry is valid.
pub fn parse_articles(json: &str, origin: &str) -> Result<Vec<Article>> {
    let load_error = |cause: String| Error::Load {
        origin: origin.to_string(),
        cause,
    };

    let value: serde_json::Value =
        serde_json::from_str(json).map_err(|e| load_error(format!("invalid JSON: {e}")))?;
    let serde_json::Value::Array(entries) = value else {
        return Err(load_error("top-level value is not a list".to_string()));
    };

    let total = entries.len();
    let mut articles = Vec::with_capacity(total);
    for (index, entry) in entries.into_iter().enumerate() {
        if !entry.is_object() {
            tracing::warn!(index, "Skipping dataset entry that is not an object");
            continue;
        }
        match serde_json::from_value::<Article>(entry) {
            Ok(article) => match article.blank_field() {
                Some(field) => tracing::warn!(index, "Skipping dataset entry with blank {field}"),
                None => articles.push(article),
            },
            Err(e) => tracing::warn!(index, "Skipping invalid dataset entry: {e}"),
        }
    }

    if articles.is_empty() {
        return Err(load_error(format!("none of {total} entries are valid")));
    }
    if articles.len() < total {
        tracing::warn!(
            origin,
            kept = articles.len(),
            skipped = total - articles.len(),
            "Dataset contained invalid entries"
        );
    }
    Ok(articles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CATALOG;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::io::Write;

    const HISTORY: &str = r#"[
        {"title": "A1", "summary": "Real.", "category": "History", "is_truth": true},
        {"title": "F1", "summary": "Fake.", "category": "History", "is_truth": false}
    ]"#;

    fn history() -> Category {
        Category::new("History").unwrap()
    }

    #[test]
    fn test_pick_random_filters_by_flag() {
        let store = LocalArticleStore::from_articles(parse_articles(HISTORY, "test").unwrap())
            .unwrap();

        assert_eq!(store.pick_random(&history(), false).unwrap().title, "F1");
        assert_eq!(store.pick_random(&history(), true).unwrap().title, "A1");
    }

    #[test]
    fn test_pick_random_unknown_category() {
        let store = LocalArticleStore::from_articles(parse_articles(HISTORY, "test").unwrap())
            .unwrap();
        let math = Category::new("Math").unwrap();

        let err = store.pick_random(&math, true).unwrap_err();
        assert!(matches!(
            err,
            Error::NotFound {
                ref category,
                is_truth: true
            } if category == "Math"
        ));
    }

    #[test]
    fn test_pick_random_is_seedable() {
        let articles = (0..10)
            .map(|i| Article::genuine(format!("T{i}"), "Body.", "History"))
            .collect();
        let store = LocalArticleStore::from_articles(articles).unwrap();

        let a = store
            .pick_random_with(&mut StdRng::seed_from_u64(7), &history(), true)
            .unwrap();
        let b = store
            .pick_random_with(&mut StdRng::seed_from_u64(7), &history(), true)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_entries_skipped() {
        let json = r#"[
            "not an object",
            {"title": "A1", "summary": "Real.", "category": "History", "is_truth": true},
            {"title": "A2", "summary": "Real.", "category": "History"},
            {"title": "A3", "summary": 4, "category": "History", "is_truth": true},
            {"title": " ", "summary": "Real.", "category": "History", "is_truth": true}
        ]"#;
        let articles = parse_articles(json, "test").unwrap();
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "A1");
    }

    #[test]
    fn test_not_a_list_is_load_error() {
        let result = parse_articles(r#"{"title": "A1"}"#, "test");
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[test]
    fn test_all_invalid_is_load_error() {
        let result = parse_articles(r#"[{"title": "A1"}, 3]"#, "test");
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[test]
    fn test_empty_memory_store_rejected() {
        let result = LocalArticleStore::from_articles(vec![Article::genuine("", "x", "History")]);
        assert!(matches!(result, Err(Error::Load { .. })));
    }

    #[test]
    fn test_load_from_file_is_idempotent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{HISTORY}").unwrap();

        let store = LocalArticleStore::from_path(file.path());
        assert!(!store.is_loaded());
        assert_eq!(store.load().unwrap(), 2);
        assert!(store.is_loaded());

        // Later edits to the file are not picked up.
        std::fs::write(file.path(), "[]").unwrap();
        assert_eq!(store.load().unwrap(), 2);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let store = LocalArticleStore::from_path("/nonexistent/responses.json");
        assert!(matches!(store.load(), Err(Error::Load { .. })));
        assert!(!store.is_loaded());
        assert!(store.is_empty());
    }

    #[test]
    fn test_bundled_dataset_covers_catalog() {
        let store = LocalArticleStore::bundled();
        store.load().unwrap();
        for name in CATALOG {
            let category = Category::new(name).unwrap();
            assert!(store.pick_random(&category, true).is_ok(), "{name} genuine");
            assert!(store.pick_random(&category, false).is_ok(), "{name} fabricated");
        }
    }

    #[test]
    fn test_fetch_article_delegates() {
        let store = LocalArticleStore::from_articles(parse_articles(HISTORY, "test").unwrap())
            .unwrap();
        let article = store.fetch_article(&history(), false).unwrap();
        assert!(!article.is_truth);
        assert_eq!(store.name(), "local");
    }
}

//! Dataset population from the live sources.
//!
//! Tops up a dataset file to a target number of genuine and fabricated
//! articles per category. Progress is saved after every category, so an
//! interrupted run picks up where it stopped.

use crate::models::{Article, Category};
use crate::sources::{ArticleSource, ensure_active, parse_articles};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const CANCEL_POLL: Duration = Duration::from_millis(100);

/// Population targets and pacing.
#[derive(Debug, Clone)]
pub struct PopulateConfig {
    /// Genuine articles wanted per category.
    pub target_real: usize,
    /// Fabricated articles wanted per category.
    pub target_fake: usize,
    /// Duplicate titles in a row before a category counts as exhausted.
    pub max_consecutive_duplicates: u32,
    /// Failed fetches in a row before giving up on a category.
    pub max_consecutive_failures: u32,
    /// Pause after each genuine article.
    pub real_delay: Duration,
    /// Pause after each fabricated article.
    pub fake_delay: Duration,
    /// Pause after a failed fetch.
    pub retry_delay: Duration,
    /// Pause after a duplicate title.
    pub duplicate_delay: Duration,
}

impl Default for PopulateConfig {
    fn default() -> Self {
        Self {
            target_real: 8,
            target_fake: 4,
            max_consecutive_duplicates: 20,
            max_consecutive_failures: 5,
            real_delay: Duration::from_secs(1),
            fake_delay: Duration::from_secs(2),
            retry_delay: Duration::from_secs(5),
            duplicate_delay: Duration::from_millis(500),
        }
    }
}

impl PopulateConfig {
    /// Sets the per-category targets.
    #[must_use]
    pub const fn with_targets(mut self, target_real: usize, target_fake: usize) -> Self {
        self.target_real = target_real;
        self.target_fake = target_fake;
        self
    }

    /// Removes every pause.
    #[must_use]
    pub const fn without_delays(mut self) -> Self {
        self.real_delay = Duration::ZERO;
        self.fake_delay = Duration::ZERO;
        self.retry_delay = Duration::ZERO;
        self.duplicate_delay = Duration::ZERO;
        self
    }
}

/// Outcome for one category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    /// Category name.
    pub category: String,
    /// Genuine articles present before the run.
    pub real_before: usize,
    /// Fabricated articles present before the run.
    pub fake_before: usize,
    /// Genuine articles added.
    pub real_added: usize,
    /// Fabricated articles added.
    pub fake_added: usize,
    /// Stopped early because only duplicates came back.
    pub exhausted: bool,
    /// Stopped early because fetches kept failing.
    pub failed: bool,
}

impl CategoryReport {
    /// Articles added in total.
    #[must_use]
    pub const fn added(&self) -> usize {
        self.real_added + self.fake_added
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PopulateReport {
    /// Per-category results, in processing order.
    pub categories: Vec<CategoryReport>,
    /// Articles in the file after the run.
    pub total: usize,
}

#[derive(Debug, Default)]
struct KindOutcome {
    added: usize,
    exhausted: bool,
    failed: bool,
}

/// Fills a dataset file from a genuine and a fabricated source.
pub struct DatasetPopulator {
    real: Arc<dyn ArticleSource>,
    fake: Arc<dyn ArticleSource>,
    config: PopulateConfig,
    cancel: CancellationToken,
}

impl DatasetPopulator {
    /// Creates a populator.
    #[must_use]
    pub fn new(
        real: Arc<dyn ArticleSource>,
        fake: Arc<dyn ArticleSource>,
        config: PopulateConfig,
    ) -> Self {
        Self {
            real,
            fake,
            config,
            cancel: CancellationToken::new(),
        }
    }

    /// Stops between fetches once `cancel` trips.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Populates `path` for every category.
    ///
    /// # Errors
    ///
    /// See [`run_with`](Self::run_with).
    pub fn run(&self, path: &Path, categories: &[Category]) -> Result<PopulateReport> {
        self.run_with(path, categories, |_| {})
    }

    /// Populates `path`, calling `on_category` after each category is saved.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if the existing file is unreadable or not a
    /// dataset, [`Error::Cancelled`] when interrupted, or the first
    /// non-retryable source error (for example a missing API key). Articles
    /// gathered before an error are saved first.
    pub fn run_with<F>(
        &self,
        path: &Path,
        categories: &[Category],
        mut on_category: F,
    ) -> Result<PopulateReport>
    where
        F: FnMut(&CategoryReport),
    {
        let mut articles = load_dataset_file(path)?;
        tracing::info!(path = %path.display(), existing = articles.len(), "Populating dataset");

        let mut report = PopulateReport::default();
        for category in categories {
            match self.populate_category(&mut articles, category) {
                Ok(category_report) => {
                    if category_report.added() > 0 {
                        save_dataset_file(path, &articles)?;
                    }
                    on_category(&category_report);
                    report.categories.push(category_report);
                },
                Err(e) => {
                    save_dataset_file(path, &articles)?;
                    return Err(e);
                },
            }
        }

        report.total = articles.len();
        Ok(report)
    }

    /// Tops up one category in `articles`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] or a non-retryable source error.
    pub fn populate_category(
        &self,
        articles: &mut Vec<Article>,
        category: &Category,
    ) -> Result<CategoryReport> {
        let name = category.as_str();
        let mut titles: HashSet<String> = HashSet::new();
        let (mut real_before, mut fake_before) = (0, 0);
        for article in articles.iter().filter(|a| a.category == name) {
            titles.insert(article.title.clone());
            if article.is_truth {
                real_before += 1;
            } else {
                fake_before += 1;
            }
        }

        tracing::info!(
            category = name,
            real_before,
            fake_before,
            "Processing category"
        );

        let real = self.fetch_kind(
            articles,
            &mut titles,
            category,
            true,
            self.config.target_real.saturating_sub(real_before),
        )?;
        let fake = self.fetch_kind(
            articles,
            &mut titles,
            category,
            false,
            self.config.target_fake.saturating_sub(fake_before),
        )?;

        Ok(CategoryReport {
            category: name.to_string(),
            real_before,
            fake_before,
            real_added: real.added,
            fake_added: fake.added,
            exhausted: real.exhausted || fake.exhausted,
            failed: real.failed || fake.failed,
        })
    }

    fn fetch_kind(
        &self,
        articles: &mut Vec<Article>,
        titles: &mut HashSet<String>,
        category: &Category,
        is_truth: bool,
        needed: usize,
    ) -> Result<KindOutcome> {
        let (source, delay) = if is_truth {
            (&self.real, self.config.real_delay)
        } else {
            (&self.fake, self.config.fake_delay)
        };
        let mut outcome = KindOutcome::default();
        let mut duplicates = 0;
        let mut failures = 0;

        while outcome.added < needed {
            ensure_active(&self.cancel)?;
            let fetched = source.fetch_article(category, is_truth).and_then(|article| {
                if article.is_truth == is_truth && article.is_complete() {
                    Ok(article)
                } else {
                    Err(Error::MalformedResponse {
                        source_name: source.name(),
                        reason: "incomplete article".to_string(),
                    })
                }
            });

            match fetched {
                Ok(article) => {
                    failures = 0;
                    if titles.insert(article.title.clone()) {
                        tracing::info!(
                            category = %category,
                            is_truth,
                            title = %article.title,
                            "Added article"
                        );
                        articles.push(article);
                        outcome.added += 1;
                        duplicates = 0;
                        self.pause(delay)?;
                    } else {
                        duplicates += 1;
                        tracing::debug!(title = %article.title, duplicates, "Duplicate title");
                        if duplicates >= self.config.max_consecutive_duplicates {
                            tracing::warn!(category = %category, is_truth, "Category exhausted");
                            outcome.exhausted = true;
                            break;
                        }
                        self.pause(self.config.duplicate_delay)?;
                    }
                },
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    failures += 1;
                    tracing::warn!(category = %category, is_truth, failures, error = %e, "Fetch failed");
                    if failures >= self.config.max_consecutive_failures {
                        outcome.failed = true;
                        break;
                    }
                    self.pause(self.config.retry_delay)?;
                },
            }
        }

        Ok(outcome)
    }

    fn pause(&self, delay: Duration) -> Result<()> {
        let deadline = Instant::now() + delay;
        loop {
            ensure_active(&self.cancel)?;
            let now = Instant::now();
            if now >= deadline {
                return Ok(());
            }
            std::thread::sleep((deadline - now).min(CANCEL_POLL));
        }
    }
}

/// Reads a dataset file, treating a missing file or empty list as no articles.
///
/// # Errors
///
/// Returns [`Error::Load`] if the file exists but is not a dataset.
pub fn load_dataset_file(path: &Path) -> Result<Vec<Article>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No dataset file yet, starting empty");
        return Ok(Vec::new());
    }
    let origin = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| Error::Load {
        origin: origin.clone(),
        cause: e.to_string(),
    })?;
    if matches!(serde_json::from_str::<serde_json::Value>(&text), Ok(serde_json::Value::Array(ref a)) if a.is_empty())
    {
        return Ok(Vec::new());
    }
    parse_articles(&text, &origin)
}

/// Writes a dataset file as pretty JSON, replacing it atomically.
///
/// # Errors
///
/// Returns [`Error::Load`] if the file cannot be written.
pub fn save_dataset_file(path: &Path, articles: &[Article]) -> Result<()> {
    let write_error = |e: std::io::Error| Error::Load {
        origin: path.display().to_string(),
        cause: format!("cannot write: {e}"),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    let json = serde_json::to_string_pretty(articles).map_err(|e| Error::Load {
        origin: path.display().to_string(),
        cause: e.to_string(),
    })?;

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(write_error)?;
    std::fs::rename(&tmp, path).map_err(write_error)?;
    tracing::debug!(path = %path.display(), count = articles.len(), "Saved dataset");
    Ok(())
}

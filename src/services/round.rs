//! Round assembly.

use super::policy::FallbackPolicy;
use crate::models::{Article, Category, Round};
use crate::sources::LocalArticleStore;
use crate::{Error, Result};
use rand::Rng;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

/// Progress of a single round build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Nothing requested yet.
    Idle,
    /// Waiting on the fabricated article.
    FetchingFake,
    /// Waiting on the two genuine articles.
    FetchingReal,
    /// Combining the three articles.
    Assembling,
    /// Articles permuted.
    Shuffled,
    /// Round handed over, or the build failed.
    Done,
}

impl RoundPhase {
    /// Returns the phase as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::FetchingFake => "fetching_fake",
            Self::FetchingReal => "fetching_real",
            Self::Assembling => "assembling",
            Self::Shuffled => "shuffled",
            Self::Done => "done",
        }
    }
}

/// Builds playable rounds from the fabricated and genuine tiers.
#[derive(Debug, Clone)]
pub struct RoundAssembler {
    fake: FallbackPolicy,
    real: FallbackPolicy,
    concurrent: bool,
}

impl RoundAssembler {
    /// Re-fetches of the second genuine slot when it repeats the first title.
    pub const MAX_DUPLICATE_REFETCHES: u32 = 3;

    /// Creates an assembler from the two slot policies.
    #[must_use]
    pub const fn new(fake: FallbackPolicy, real: FallbackPolicy) -> Self {
        Self {
            fake,
            real,
            concurrent: true,
        }
    }

    /// An assembler that serves every slot from the store.
    #[must_use]
    pub fn offline(store: Arc<LocalArticleStore>) -> Self {
        let fake = FallbackPolicy::secondary_only(store.clone());
        let real = FallbackPolicy::secondary_only(store);
        Self::new(fake, real)
    }

    /// Fetches the genuine slots on separate threads when enabled.
    #[must_use]
    pub const fn with_concurrent_fetch(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    /// Builds one round for `category`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::RoundBuild`] when a slot exhausts every tier and
    /// [`Error::Cancelled`] if `cancel` trips first.
    pub fn build_round(&self, category: &Category, cancel: &CancellationToken) -> Result<Round> {
        self.build_round_with(category, cancel, &mut rand::rng())
    }

    /// [`build_round`](Self::build_round) with a caller-supplied RNG for the shuffle.
    ///
    /// # Errors
    ///
    /// Same as [`build_round`](Self::build_round).
    #[instrument(skip_all, fields(category = %category))]
    pub fn build_round_with<R: Rng + ?Sized>(
        &self,
        category: &Category,
        cancel: &CancellationToken,
        rng: &mut R,
    ) -> Result<Round> {
        let mut phase = RoundPhase::Idle;
        let result = self.run(category, cancel, rng, &mut phase);
        if let Err(e) = &result {
            tracing::warn!(failed_in = phase.as_str(), error = %e, "Round build failed");
        }
        trace_phase(&mut phase, RoundPhase::Done);
        result
    }

    fn run<R: Rng + ?Sized>(
        &self,
        category: &Category,
        cancel: &CancellationToken,
        rng: &mut R,
        phase: &mut RoundPhase,
    ) -> Result<Round> {
        trace_phase(phase, RoundPhase::FetchingFake);
        let fake = self.fake.fetch(category, false, cancel)?;

        trace_phase(phase, RoundPhase::FetchingReal);
        let (first, second) = self.fetch_genuine_pair(category, cancel)?;

        trace_phase(phase, RoundPhase::Assembling);
        let articles = vec![fake, first, second];

        let shuffled = shuffle_articles(articles, rng);
        trace_phase(phase, RoundPhase::Shuffled);
        Round::new(category.clone(), shuffled)
    }

    fn fetch_genuine_pair(
        &self,
        category: &Category,
        cancel: &CancellationToken,
    ) -> Result<(Article, Article)> {
        let (first, second) = if self.concurrent {
            std::thread::scope(|scope| {
                let handle = scope.spawn(|| self.real.fetch(category, true, cancel));
                let second = self.real.fetch(category, true, cancel);
                let first = handle.join().unwrap_or_else(|_| {
                    Err(Error::RoundBuild {
                        category: category.to_string(),
                        slot: "genuine",
                        cause: "fetch thread panicked".to_string(),
                    })
                });
                (first, second)
            })
        } else {
            (
                self.real.fetch(category, true, cancel),
                self.real.fetch(category, true, cancel),
            )
        };

        let (first, mut second) = match (first, second) {
            (Err(Error::Cancelled), _) | (_, Err(Error::Cancelled)) => {
                return Err(Error::Cancelled);
            },
            (first, second) => (first?, second?),
        };

        let mut refetches = 0;
        while second.title == first.title && refetches < Self::MAX_DUPLICATE_REFETCHES {
            refetches += 1;
            tracing::debug!(title = %first.title, refetches, "Duplicate genuine article, refetching");
            second = self.real.fetch(category, true, cancel)?;
        }
        if second.title == first.title {
            tracing::warn!(title = %first.title, "Genuine slots share a title");
        }

        Ok((first, second))
    }
}

fn trace_phase(current: &mut RoundPhase, next: RoundPhase) {
    tracing::debug!(from = current.as_str(), to = next.as_str(), "Round phase");
    *current = next;
}

/// Uniform random permutation by repeated random-position removal.
pub fn shuffle_articles<R: Rng + ?Sized>(mut articles: Vec<Article>, rng: &mut R) -> Vec<Article> {
    let mut shuffled = Vec::with_capacity(articles.len());
    while !articles.is_empty() {
        let index = rng.random_range(0..articles.len());
        shuffled.push(articles.remove(index));
    }
    shuffled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ArticleSource;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn dataset() -> Arc<LocalArticleStore> {
        let articles = vec![
            Article::genuine("A1", "First real.", "History"),
            Article::genuine("A2", "Second real.", "History"),
            Article::genuine("A3", "Third real.", "History"),
            Article::fabricated("F1", "Invented.", "History"),
        ];
        Arc::new(LocalArticleStore::from_articles(articles).unwrap())
    }

    fn history() -> Category {
        Category::new("History").unwrap()
    }

    #[test]
    fn test_offline_round_invariants() {
        let assembler = RoundAssembler::offline(dataset());
        let cancel = CancellationToken::new();
        for seed in 0..20 {
            let round = assembler
                .build_round_with(&history(), &cancel, &mut StdRng::seed_from_u64(seed))
                .unwrap();
            assert_eq!(round.articles().len(), 3);
            assert_eq!(round.articles().iter().filter(|a| !a.is_truth).count(), 1);
            assert_eq!(round.articles()[round.fabricated_index()].title, "F1");
        }
    }

    /// Serves genuine titles from a fixed script, then repeats the last one.
    struct ScriptedGenuine {
        titles: Vec<&'static str>,
        next: AtomicUsize,
    }

    impl ArticleSource for ScriptedGenuine {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article> {
            let index = self.next.fetch_add(1, Ordering::SeqCst);
            let title = self.titles[index.min(self.titles.len() - 1)];
            Ok(Article {
                title: title.to_string(),
                summary: "Body.".to_string(),
                category: category.to_string(),
                is_truth,
            })
        }
    }

    #[test]
    fn test_duplicate_guard_refetches_second_slot() {
        let genuine = Arc::new(ScriptedGenuine {
            titles: vec!["A1", "A1", "A1", "A2"],
            next: AtomicUsize::new(0),
        });
        let assembler = RoundAssembler::new(
            FallbackPolicy::secondary_only(dataset()),
            FallbackPolicy::secondary_only(genuine.clone()),
        )
        .with_concurrent_fetch(false);

        let round = assembler
            .build_round(&history(), &CancellationToken::new())
            .unwrap();
        let mut titles: Vec<_> = round
            .articles()
            .iter()
            .filter(|a| a.is_truth)
            .map(|a| a.title.as_str())
            .collect();
        titles.sort_unstable();
        assert_eq!(titles, vec!["A1", "A2"]);
        assert_eq!(genuine.next.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_duplicate_guard_gives_up() {
        let genuine = Arc::new(ScriptedGenuine {
            titles: vec!["A1"],
            next: AtomicUsize::new(0),
        });
        let assembler = RoundAssembler::new(
            FallbackPolicy::secondary_only(dataset()),
            FallbackPolicy::secondary_only(genuine.clone()),
        )
        .with_concurrent_fetch(false);

        let round = assembler
            .build_round(&history(), &CancellationToken::new())
            .unwrap();
        assert_eq!(round.articles().len(), 3);
        let expected = 2 + RoundAssembler::MAX_DUPLICATE_REFETCHES as usize;
        assert_eq!(genuine.next.load(Ordering::SeqCst), expected);
    }

    #[test]
    fn test_missing_fabrication_is_round_build() {
        let store = Arc::new(
            LocalArticleStore::from_articles(vec![Article::genuine("A1", "Real.", "History")])
                .unwrap(),
        );
        let err = RoundAssembler::offline(store)
            .build_round(&history(), &CancellationToken::new())
            .unwrap_err();
        assert!(matches!(err, Error::RoundBuild { slot: "fabricated", .. }));
    }

    #[test]
    fn test_cancelled_round() {
        let token = CancellationToken::new();
        token.cancel();
        let result = RoundAssembler::offline(dataset()).build_round(&history(), &token);
        assert!(matches!(result, Err(Error::Cancelled)));
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let articles = vec![
            Article::genuine("A1", "x", "History"),
            Article::fabricated("F1", "x", "History"),
            Article::genuine("A2", "x", "History"),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let mut shuffled = shuffle_articles(articles.clone(), &mut rng);
        let mut original = articles;
        shuffled.sort_by(|a, b| a.title.cmp(&b.title));
        original.sort_by(|a, b| a.title.cmp(&b.title));
        assert_eq!(shuffled, original);
    }

    #[test]
    fn test_shuffle_moves_fabrication_around() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut positions: HashMap<usize, u32> = HashMap::new();
        for _ in 0..300 {
            let shuffled = shuffle_articles(
                vec![
                    Article::fabricated("F1", "x", "History"),
                    Article::genuine("A1", "x", "History"),
                    Article::genuine("A2", "x", "History"),
                ],
                &mut rng,
            );
            let index = shuffled.iter().position(|a| !a.is_truth).unwrap();
            *positions.entry(index).or_default() += 1;
        }
        assert_eq!(positions.len(), 3);
        assert!(positions.values().all(|&count| count > 50));
    }
}

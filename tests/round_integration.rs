//! Round assembly integration tests.
//!
//! Drives the assembler through the public API with scripted sources:
//! - live tiers, retries, and fallback to the dataset
//! - round failure when every tier is exhausted
//! - cancellation before and between fetches
//! - offline play over the bundled dataset

// Integration tests use expect/unwrap for simplicity - panics are acceptable in tests
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio_util::sync::CancellationToken;
use truthpedia::models::CATALOG;
use truthpedia::services::{FallbackPolicy, GameSession, RoundAssembler};
use truthpedia::sources::{ArticleSource, LocalArticleStore};
use truthpedia::{Article, Category, Error, Result};

/// Fails the first `failures` calls, then returns numbered articles.
struct Scripted {
    name: &'static str,
    failures: u32,
    calls: AtomicU32,
}

impl Scripted {
    fn new(name: &'static str, failures: u32) -> Arc<Self> {
        Arc::new(Self {
            name,
            failures,
            calls: AtomicU32::new(0),
        })
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ArticleSource for Scripted {
    fn name(&self) -> &'static str {
        self.name
    }

    fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            return Err(Error::Transport {
                operation: format!("{}_fetch", self.name),
                cause: "connection reset".to_string(),
            });
        }
        Ok(Article {
            title: format!("{} #{call}", self.name),
            summary: format!("Summary {call}."),
            category: category.to_string(),
            is_truth,
        })
    }
}

/// Cancels the shared token on its first call.
struct Tripwire {
    cancel: CancellationToken,
    calls: AtomicU32,
}

impl ArticleSource for Tripwire {
    fn name(&self) -> &'static str {
        "tripwire"
    }

    fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.cancel.cancel();
        Ok(Article {
            title: "Tripwire".to_string(),
            summary: "Body.".to_string(),
            category: category.to_string(),
            is_truth,
        })
    }
}

fn store() -> Arc<LocalArticleStore> {
    Arc::new(
        LocalArticleStore::from_articles(vec![
            Article::genuine("Stored real A", "Genuine body A.", "Hoaxes"),
            Article::genuine("Stored real B", "Genuine body B.", "Hoaxes"),
            Article::fabricated("Stored fake", "Fabricated body.", "Hoaxes"),
        ])
        .unwrap(),
    )
}

fn hoaxes() -> Category {
    Category::new("Hoaxes").unwrap()
}

#[test]
fn test_live_tiers_fill_every_slot() {
    let fake = Scripted::new("llm", 0);
    let real = Scripted::new("wiki", 0);
    let assembler = RoundAssembler::new(
        FallbackPolicy::new(fake.clone(), store(), 0),
        FallbackPolicy::new(real.clone(), store(), 1),
    )
    .with_concurrent_fetch(false);

    let round = assembler
        .build_round_with(&hoaxes(), &CancellationToken::new(), &mut StdRng::seed_from_u64(7))
        .unwrap();

    assert_eq!(round.articles().len(), 3);
    assert_eq!(round.articles().iter().filter(|a| !a.is_truth).count(), 1);
    assert!(round.articles().iter().all(|a| !a.title.starts_with("Stored")));
    assert_eq!(fake.calls(), 1);
    assert_eq!(real.calls(), 2);
}

#[test]
fn test_failed_live_fabrication_uses_dataset() {
    let fake = Scripted::new("llm", u32::MAX);
    let real = Scripted::new("wiki", 0);
    let assembler = RoundAssembler::new(
        FallbackPolicy::new(fake.clone(), store(), 0),
        FallbackPolicy::new(real, store(), 1),
    );

    let round = assembler.build_round(&hoaxes(), &CancellationToken::new()).unwrap();
    let fabricated = &round.articles()[round.fabricated_index()];

    assert_eq!(fabricated.title, "Stored fake");
    assert_eq!(fake.calls(), 1);
}

#[test]
fn test_genuine_slot_retries_before_falling_back() {
    let real = Scripted::new("wiki", 1);
    let assembler = RoundAssembler::new(
        FallbackPolicy::new(Scripted::new("llm", 0), store(), 0),
        FallbackPolicy::new(real.clone(), store(), 1),
    )
    .with_concurrent_fetch(false);

    let round = assembler.build_round(&hoaxes(), &CancellationToken::new()).unwrap();

    // First genuine slot: one failure, one retry. Second slot: first try.
    assert_eq!(real.calls(), 3);
    assert!(round.articles().iter().all(|a| !a.title.starts_with("Stored")));
}

#[test]
fn test_exhausted_tiers_fail_the_round() {
    let empty = Arc::new(
        LocalArticleStore::from_articles(vec![Article::genuine("Other", "Body.", "Cryptids")])
            .unwrap(),
    );
    let assembler = RoundAssembler::new(
        FallbackPolicy::new(Scripted::new("llm", u32::MAX), empty.clone(), 0),
        FallbackPolicy::new(Scripted::new("wiki", 0), empty, 1),
    );

    let err = assembler
        .build_round(&hoaxes(), &CancellationToken::new())
        .unwrap_err();

    match err {
        Error::RoundBuild { category, slot, cause } => {
            assert_eq!(category, "Hoaxes");
            assert_eq!(slot, "fabricated");
            assert!(cause.contains("connection reset"));
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_cancelled_before_start() {
    let fake = Scripted::new("llm", 0);
    let assembler = RoundAssembler::new(
        FallbackPolicy::new(fake.clone(), store(), 0),
        FallbackPolicy::new(Scripted::new("wiki", 0), store(), 1),
    );
    let cancel = CancellationToken::new();
    cancel.cancel();

    assert!(matches!(
        assembler.build_round(&hoaxes(), &cancel),
        Err(Error::Cancelled)
    ));
    assert_eq!(fake.calls(), 0);
}

#[test]
fn test_cancelled_between_slots() {
    let cancel = CancellationToken::new();
    let fake = Arc::new(Tripwire {
        cancel: cancel.clone(),
        calls: AtomicU32::new(0),
    });
    let real = Scripted::new("wiki", 0);
    let assembler = RoundAssembler::new(
        FallbackPolicy::new(fake.clone(), store(), 0),
        FallbackPolicy::new(real.clone(), store(), 1),
    );

    assert!(matches!(
        assembler.build_round(&hoaxes(), &cancel),
        Err(Error::Cancelled)
    ));
    assert_eq!(fake.calls.load(Ordering::SeqCst), 1);
    assert_eq!(real.calls(), 0);
}

#[test]
fn test_offline_rounds_for_every_category() {
    let store = Arc::new(LocalArticleStore::bundled());
    store.load().unwrap();
    let assembler = RoundAssembler::offline(store);
    let cancel = CancellationToken::new();

    for name in CATALOG {
        let category = Category::new(name).unwrap();
        let round = assembler.build_round(&category, &cancel).unwrap();
        assert_eq!(round.articles().len(), 3, "{name}");
        assert!(round.articles().iter().all(|a| a.category == name));
        assert!(round.check(round.fabricated_index()).unwrap());
    }
}

#[test]
fn test_offline_game_to_victory() {
    let assembler = RoundAssembler::offline(Arc::new(LocalArticleStore::bundled()));
    let cancel = CancellationToken::new();
    let category = Category::new("Prophecy").unwrap();
    let mut session = GameSession::new("Ada", 3);
    session.choose_category(category.clone());

    while !session.is_over() {
        let round = assembler.build_round(&category, &cancel).unwrap();
        session.answer(&round, round.fabricated_index()).unwrap();
    }

    assert_eq!(session.rounds_won(), 3);
}

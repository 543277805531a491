//! Source and assembler factory functions for CLI commands.
//!
//! Provides builders that wire configuration into the article tiers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::Result;
use crate::config::{LlmConfig, TruthpediaConfig};
use crate::llm::{LlmProvider, LlmResilienceConfig, OpenAiClient, ResilientLlmProvider};
use crate::services::{FallbackPolicy, RoundAssembler};
use crate::sources::{FabricationSource, LocalArticleStore, WikiSource, WikipediaClient};

/// Builds the generative provider, wrapped in a circuit breaker.
#[must_use]
pub fn build_llm_provider(llm_config: &LlmConfig) -> Arc<dyn LlmProvider> {
    Arc::new(ResilientLlmProvider::new(
        OpenAiClient::from_config(llm_config),
        &LlmResilienceConfig::from_config(llm_config),
    ))
}

/// Builds the fallback store from the configured dataset, or the bundled one.
#[must_use]
pub fn build_store(config: &TruthpediaConfig) -> Arc<LocalArticleStore> {
    Arc::new(
        config
            .dataset
            .as_ref()
            .map_or_else(LocalArticleStore::bundled, |path| {
                LocalArticleStore::from_path(path.clone())
            }),
    )
}

/// Builds the knowledge source adapter.
#[must_use]
pub fn build_wiki_source(
    config: &TruthpediaConfig,
    cancel: &CancellationToken,
) -> WikiSource<WikipediaClient> {
    WikiSource::new(WikipediaClient::from_config(&config.wiki))
        .with_max_sentences(config.game.max_sentences)
        .with_cancellation(cancel.clone())
}

/// Builds the fabrication source adapter.
#[must_use]
pub fn build_fabrication_source(
    config: &TruthpediaConfig,
    cancel: &CancellationToken,
) -> FabricationSource {
    FabricationSource::new(build_llm_provider(&config.llm))
        .with_max_sentences(config.game.max_sentences)
        .with_cancellation(cancel.clone())
}

/// Builds the round assembler, loading the fallback store up front.
///
/// In offline mode both slots are served by the store alone.
///
/// # Errors
///
/// Returns [`crate::Error::Load`] if the fallback dataset cannot be loaded.
pub fn build_assembler(
    config: &TruthpediaConfig,
    cancel: &CancellationToken,
) -> Result<RoundAssembler> {
    let store = build_store(config);
    let count = store.load()?;
    tracing::debug!(count, "Fallback store ready");

    if config.game.offline {
        tracing::info!("Offline mode: serving every slot from the dataset");
        return Ok(RoundAssembler::offline(store)
            .with_concurrent_fetch(config.game.concurrent_fetch));
    }

    let fabrication = build_fabrication_source(config, cancel);
    if config.llm.api_key.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; fabricated articles come from the dataset");
    }

    let fake = FallbackPolicy::new(
        Arc::new(fabrication),
        store.clone(),
        config.game.fake_retries,
    );
    let real = FallbackPolicy::new(
        Arc::new(build_wiki_source(config, cancel)),
        store,
        config.game.real_retries,
    );

    Ok(RoundAssembler::new(fake, real).with_concurrent_fetch(config.game.concurrent_fetch))
}

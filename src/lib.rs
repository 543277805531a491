//! # TruthPedia
//!
//! A console trivia game: pick a topic, read three short encyclopedia
//! summaries, and spot the one that was made up.
//!
//! Each round is assembled from three tiers of content:
//!
//! - a live knowledge base (`Wikipedia`) for genuine summaries
//! - a generative text service (`OpenAI`-compatible) for the fabricated one
//! - a bundled dataset of vetted articles used whenever a live tier fails
//!
//! ## Example
//!
//! ```rust,ignore
//! use truthpedia::services::RoundAssembler;
//! use truthpedia::sources::LocalArticleStore;
//! use truthpedia::Category;
//!
//! let store = Arc::new(LocalArticleStore::bundled());
//! let assembler = RoundAssembler::offline(store);
//! let round = assembler.build_round(&Category::new("Cryptids")?, &cancel)?;
//! assert_eq!(round.articles().len(), 3);
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod cli;
pub mod config;
pub mod llm;
pub mod models;
pub mod observability;
pub mod services;
pub mod sources;

// Re-exports for convenience
pub use config::TruthpediaConfig;
pub use llm::LlmProvider;
pub use models::{Article, Category, Round, check_answer};
pub use services::{FallbackPolicy, GameSession, RoundAssembler};
pub use sources::{ArticleSource, FabricationSource, LocalArticleStore, WikiSource};

/// Error type for truthpedia operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When | Retryable |
/// |---------|-------------|-----------|
/// | `Config` | Missing API key, unreadable config file | no |
/// | `Load` | Dataset missing, unparseable, or empty after validation | no |
/// | `EmptySource` | Knowledge base has no usable subject or text | yes |
/// | `MalformedResponse` | Generative response empty, not JSON, or missing fields | yes |
/// | `NotFound` | Fallback store has no entry for category/truth flag | no |
/// | `Transport` | Network failure, timeout, non-success HTTP status | yes |
/// | `RoundBuild` | Every tier for a round slot was exhausted | no |
/// | `InvalidInput` | Empty category, source asked for the wrong truth flag | no |
/// | `Cancelled` | The cancellation token tripped at a network boundary | no |
/// | `Io` | Console or dataset file I/O failed | no |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Configuration is missing or invalid.
    ///
    /// Raised when:
    /// - No generative service credential is configured
    /// - The config file cannot be read or parsed
    #[error("configuration error: {0}")]
    Config(String),

    /// The fallback dataset could not be loaded.
    #[error("failed to load articles from {origin}: {cause}")]
    Load {
        /// Where the dataset came from (file path or `bundled`).
        origin: String,
        /// The underlying cause.
        cause: String,
    },

    /// A live source returned nothing usable.
    #[error("{source_name} returned no usable content: {reason}")]
    EmptySource {
        /// The source that came back empty.
        source_name: &'static str,
        /// What was missing.
        reason: String,
    },

    /// The generative service answered with something unusable.
    ///
    /// Raised when:
    /// - The response has no choices or empty content
    /// - The content is not a JSON object
    /// - `title` or `summary` is missing or blank
    #[error("malformed response from {source_name}: {reason}")]
    MalformedResponse {
        /// The source that produced the response.
        source_name: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// No stored article matches the request.
    #[error("no articles found for category '{category}' with is_truth={is_truth}")]
    NotFound {
        /// Requested category.
        category: String,
        /// Requested truth flag.
        is_truth: bool,
    },

    /// A network call failed in transit.
    #[error("operation '{operation}' failed: {cause}")]
    Transport {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },

    /// A round could not be built because every tier failed for a slot.
    #[error("could not build a round for '{category}' ({slot} article): {cause}")]
    RoundBuild {
        /// Category of the round.
        category: String,
        /// Which slot failed (`genuine` or `fabricated`).
        slot: &'static str,
        /// The last error seen.
        cause: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The operation was cancelled before it completed.
    #[error("operation cancelled")]
    Cancelled,

    /// Console or file I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure may go away on another attempt against the same source.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::EmptySource { .. } | Self::MalformedResponse { .. }
        )
    }

    /// Short label used in logs and metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Load { .. } => "load",
            Self::EmptySource { .. } => "empty_source",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::NotFound { .. } => "not_found",
            Self::Transport { .. } => "transport",
            Self::RoundBuild { .. } => "round_build",
            Self::InvalidInput(_) => "invalid_input",
            Self::Cancelled => "cancelled",
            Self::Io(_) => "io",
        }
    }
}

/// Result type alias for truthpedia operations.
pub type Result<T> = std::result::Result<T, Error>;

//! Configuration management.
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! environment variables, then command-line flags (applied by the binary).

use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for truthpedia.
#[derive(Debug, Default)]
pub struct TruthpediaConfig {
    /// Game settings.
    pub game: GameConfig,
    /// Generative service settings.
    pub llm: LlmConfig,
    /// Knowledge base settings.
    pub wiki: WikiConfig,
    /// Dataset file overriding the bundled one.
    pub dataset: Option<PathBuf>,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// Game settings.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Rounds to answer correctly to win.
    pub rounds: u32,
    /// Categories offered to the player.
    pub displayed_categories: usize,
    /// Sentence budget for summaries.
    pub max_sentences: usize,
    /// Fetch the two genuine articles on separate threads.
    pub concurrent_fetch: bool,
    /// Extra live attempts for a genuine slot before falling back.
    pub real_retries: u32,
    /// Extra live attempts for the fabricated slot before falling back.
    pub fake_retries: u32,
    /// Skip live sources and serve every slot from the dataset.
    pub offline: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            rounds: 3,
            displayed_categories: 3,
            max_sentences: 6,
            concurrent_fetch: true,
            real_retries: 1,
            fake_retries: 0,
            offline: false,
        }
    }
}

/// Generative service configuration.
#[derive(Debug)]
pub struct LlmConfig {
    /// API key for the `OpenAI`-compatible endpoint.
    pub api_key: Option<SecretString>,
    /// Model name.
    pub model: String,
    /// Base URL of the API.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
    /// Consecutive failures before the circuit opens.
    pub breaker_failure_threshold: u32,
    /// How long the circuit stays open, in milliseconds.
    pub breaker_reset_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-5-nano".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
            breaker_failure_threshold: 3,
            breaker_reset_ms: 60_000,
        }
    }
}

/// Knowledge base configuration.
#[derive(Debug, Clone)]
pub struct WikiConfig {
    /// `MediaWiki` action API endpoint.
    pub endpoint: String,
    /// User agent sent with every request.
    pub user_agent: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://en.wikipedia.org/w/api.php".to_string(),
            user_agent: "TruthPedia/1.0".to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Logging settings from the config file.
#[derive(Debug, Clone, Default)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `warn` or `truthpedia=debug`.
    pub level: Option<String>,
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Dataset path.
    pub dataset: Option<String>,
    /// Game section.
    pub game: Option<ConfigFileGame>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Wiki section.
    pub wiki: Option<ConfigFileWiki>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Game section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileGame {
    /// Rounds to win.
    pub rounds: Option<u32>,
    /// Categories offered.
    pub displayed_categories: Option<usize>,
    /// Sentence budget.
    pub max_sentences: Option<usize>,
    /// Concurrent genuine fetch.
    pub concurrent_fetch: Option<bool>,
    /// Genuine retries.
    pub real_retries: Option<u32>,
    /// Fabricated retries.
    pub fake_retries: Option<u32>,
    /// Offline mode.
    pub offline: Option<bool>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// API key.
    pub api_key: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
    /// Breaker threshold.
    pub breaker_failure_threshold: Option<u32>,
    /// Breaker reset.
    pub breaker_reset_ms: Option<u64>,
}

/// Wiki section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileWiki {
    /// Endpoint.
    pub endpoint: Option<String>,
    /// User agent.
    pub user_agent: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// Output format.
    pub format: Option<String>,
    /// Log file.
    pub file: Option<String>,
}

impl TruthpediaConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from an explicit path, or the default location when `None`,
    /// then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Parses configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(contents)?;
        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/truthpedia/` on macOS)
    /// 2. XDG config dir (`~/.config/truthpedia/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs
            .config_dir()
            .join("truthpedia")
            .join("config.toml");
        if platform_config.exists() {
            match Self::load_from_file(&platform_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring {}: {e}", platform_config.display()),
            }
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("truthpedia")
            .join("config.toml");
        if xdg_config.exists() {
            match Self::load_from_file(&xdg_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!("Ignoring {}: {e}", xdg_config.display()),
            }
        }

        Self::default()
    }

    /// Converts a `ConfigFile` to `TruthpediaConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        config.dataset = file.dataset.map(PathBuf::from);

        if let Some(game) = file.game {
            let target = &mut config.game;
            if let Some(v) = game.rounds {
                target.rounds = v.max(1);
            }
            if let Some(v) = game.displayed_categories {
                target.displayed_categories = v.max(1);
            }
            if let Some(v) = game.max_sentences {
                target.max_sentences = v.max(1);
            }
            if let Some(v) = game.concurrent_fetch {
                target.concurrent_fetch = v;
            }
            if let Some(v) = game.real_retries {
                target.real_retries = v;
            }
            if let Some(v) = game.fake_retries {
                target.fake_retries = v;
            }
            if let Some(v) = game.offline {
                target.offline = v;
            }
        }
        if let Some(llm) = file.llm {
            let target = &mut config.llm;
            target.api_key = llm.api_key.filter(|k| !k.is_empty()).map(SecretString::from);
            if let Some(v) = llm.model {
                target.model = v;
            }
            if let Some(v) = llm.base_url {
                target.base_url = v;
            }
            if let Some(v) = llm.timeout_ms {
                target.timeout_ms = v;
            }
            if let Some(v) = llm.connect_timeout_ms {
                target.connect_timeout_ms = v;
            }
            if let Some(v) = llm.breaker_failure_threshold {
                target.breaker_failure_threshold = v.max(1);
            }
            if let Some(v) = llm.breaker_reset_ms {
                target.breaker_reset_ms = v;
            }
        }
        if let Some(wiki) = file.wiki {
            let target = &mut config.wiki;
            if let Some(v) = wiki.endpoint {
                target.endpoint = v;
            }
            if let Some(v) = wiki.user_agent {
                target.user_agent = v;
            }
            if let Some(v) = wiki.timeout_ms {
                target.timeout_ms = v;
            }
            if let Some(v) = wiki.connect_timeout_ms {
                target.connect_timeout_ms = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = LoggingSettings {
                level: logging.level,
                format: logging.format,
                file: logging.file.map(PathBuf::from),
            };
        }

        config
    }

    /// Applies environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    ///
    /// | Variable | Setting |
    /// |----------|---------|
    /// | `OPENAI_API_KEY` | `llm.api_key` |
    /// | `TRUTHPEDIA_LLM_MODEL` | `llm.model` |
    /// | `TRUTHPEDIA_LLM_BASE_URL` | `llm.base_url` |
    /// | `TRUTHPEDIA_LLM_TIMEOUT_MS` | `llm.timeout_ms` |
    /// | `TRUTHPEDIA_WIKI_ENDPOINT` | `wiki.endpoint` |
    /// | `TRUTHPEDIA_WIKI_TIMEOUT_MS` | `wiki.timeout_ms` |
    /// | `TRUTHPEDIA_DATASET` | `dataset` |
    /// | `TRUTHPEDIA_ROUNDS` | `game.rounds` |
    /// | `TRUTHPEDIA_LOG_FORMAT` | `logging.format` |
    /// | `TRUTHPEDIA_LOG_FILE` | `logging.file` |
    #[must_use]
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.api_key = Some(SecretString::from(key));
        }
        if let Some(v) = lookup("TRUTHPEDIA_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("TRUTHPEDIA_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("TRUTHPEDIA_LLM_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.llm.timeout_ms = v;
        }
        if let Some(v) = lookup("TRUTHPEDIA_WIKI_ENDPOINT") {
            self.wiki.endpoint = v;
        }
        if let Some(v) = lookup("TRUTHPEDIA_WIKI_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.wiki.timeout_ms = v;
        }
        if let Some(v) = lookup("TRUTHPEDIA_DATASET") {
            self.dataset = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("TRUTHPEDIA_ROUNDS").and_then(|v| v.parse::<u32>().ok()) {
            self.game.rounds = v.max(1);
        }
        if let Some(v) = lookup("TRUTHPEDIA_LOG_FORMAT") {
            self.logging.format = Some(v);
        }
        if let Some(v) = lookup("TRUTHPEDIA_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
        self
    }

    /// Sets the dataset path.
    #[must_use]
    pub fn with_dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset = Some(path.into());
        self
    }
}

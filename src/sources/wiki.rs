//! Knowledge source adapter backed by the `MediaWiki` action API.

use super::{ArticleSource, ensure_active};
use crate::config::WikiConfig;
use crate::models::{Article, Category};
use crate::{Error, Result};
use rand::seq::IndexedRandom;
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SOURCE_NAME: &str = "wikipedia";

/// Listing pages followed per category before giving up on `cmcontinue`.
const MAX_MEMBER_PAGES: usize = 4;

/// Title prefixes of organizational pages rather than content pages.
const META_PREFIXES: [&str; 11] = [
    "Category:",
    "Template:",
    "Portal:",
    "File:",
    "Wikipedia:",
    "Help:",
    "Draft:",
    "Module:",
    "User:",
    "List of ",
    "Lists of ",
];

/// Plain text of one knowledge-base page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// Canonical title after redirects.
    pub title: String,
    /// Lead section as plain text.
    pub text: String,
}

/// The two lookups the knowledge source depends on.
pub trait KnowledgeBase: Send + Sync {
    /// Titles of every page listed in `Category:{category}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] on network failure and
    /// [`Error::MalformedResponse`] if the reply cannot be decoded.
    fn category_members(&self, category: &str) -> Result<Vec<String>>;

    /// Lead-section text of a page, `None` if the page does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`category_members`](Self::category_members).
    fn page_extract(&self, title: &str) -> Result<Option<PageText>>;
}

/// Blocking `MediaWiki` API client.
pub struct WikipediaClient {
    endpoint: String,
    client: reqwest::blocking::Client,
}

impl WikipediaClient {
    /// Creates a client with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&WikiConfig::default())
    }

    /// Creates a client from configuration.
    #[must_use]
    pub fn from_config(config: &WikiConfig) -> Self {
        let mut builder = reqwest::blocking::Client::builder().user_agent(config.user_agent.clone());
        if config.timeout_ms > 0 {
            builder = builder.timeout(Duration::from_millis(config.timeout_ms));
        }
        if config.connect_timeout_ms > 0 {
            builder = builder.connect_timeout(Duration::from_millis(config.connect_timeout_ms));
        }
        let client = builder.build().unwrap_or_else(|err| {
            tracing::warn!("Failed to build wiki HTTP client: {err}");
            reqwest::blocking::Client::new()
        });

        Self {
            endpoint: config.endpoint.clone(),
            client,
        }
    }

    /// Sets the API endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    fn query<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        params: &[(&str, &str)],
    ) -> Result<T> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("action", "query"), ("format", "json"), ("formatversion", "2")])
            .query(params)
            .send()
            .map_err(|e| Error::Transport {
                operation: operation.to_string(),
                cause: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Transport {
                operation: operation.to_string(),
                cause: format!("API returned status: {status}"),
            });
        }

        let body: serde_json::Value = response.json().map_err(|e| Error::MalformedResponse {
            source_name: SOURCE_NAME,
            reason: e.to_string(),
        })?;
        if let Some(error) = body.get("error") {
            let code = error.get("code").and_then(|c| c.as_str()).unwrap_or("unknown");
            let info = error.get("info").and_then(|i| i.as_str()).unwrap_or_default();
            return Err(Error::EmptySource {
                source_name: SOURCE_NAME,
                reason: format!("API error {code}: {info}"),
            });
        }

        serde_json::from_value(body).map_err(|e| Error::MalformedResponse {
            source_name: SOURCE_NAME,
            reason: e.to_string(),
        })
    }
}

impl Default for WikipediaClient {
    fn default() -> Self {
        Self::new()
    }
}

impl KnowledgeBase for WikipediaClient {
    fn category_members(&self, category: &str) -> Result<Vec<String>> {
        let cmtitle = format!("Category:{category}");
        let mut titles = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_MEMBER_PAGES {
            let mut params = vec![
                ("list", "categorymembers"),
                ("cmtitle", cmtitle.as_str()),
                ("cmlimit", "500"),
            ];
            if let Some(token) = cursor.as_deref() {
                params.push(("cmcontinue", token));
            }

            let page: MembersResponse = self.query("wiki_category_members", &params)?;
            titles.extend(
                page.query
                    .map(|q| q.categorymembers)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|m| m.title),
            );

            cursor = page.continuation.and_then(|c| c.cmcontinue);
            if cursor.is_none() {
                break;
            }
        }

        tracing::debug!(category, count = titles.len(), "Fetched category members");
        Ok(titles)
    }

    fn page_extract(&self, title: &str) -> Result<Option<PageText>> {
        let response: ExtractsResponse = self.query(
            "wiki_page_extract",
            &[
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
            ],
        )?;

        Ok(response
            .query
            .and_then(|q| q.pages.into_iter().next())
            .filter(|page| !page.missing)
            .map(|page| PageText {
                title: page.title,
                text: page.extract.unwrap_or_default(),
            }))
    }
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    query: Option<MembersQuery>,
    #[serde(rename = "continue")]
    continuation: Option<MembersContinue>,
}

#[derive(Debug, Deserialize)]
struct MembersQuery {
    #[serde(default)]
    categorymembers: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Member {
    title: String,
}

#[derive(Debug, Deserialize)]
struct MembersContinue {
    cmcontinue: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExtractsResponse {
    query: Option<ExtractsQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractsQuery {
    #[serde(default)]
    pages: Vec<ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    title: String,
    #[serde(default)]
    missing: bool,
    extract: Option<String>,
}

/// Produces genuine articles from a [`KnowledgeBase`].
pub struct WikiSource<K> {
    kb: K,
    max_sentences: usize,
    cancel: CancellationToken,
}

impl<K: KnowledgeBase> WikiSource<K> {
    /// Default sentence budget.
    pub const DEFAULT_MAX_SENTENCES: usize = 6;

    /// Creates a source over the given knowledge base.
    #[must_use]
    pub fn new(kb: K) -> Self {
        Self {
            kb,
            max_sentences: Self::DEFAULT_MAX_SENTENCES,
            cancel: CancellationToken::new(),
        }
    }

    /// Sets the sentence budget.
    #[must_use]
    pub fn with_max_sentences(mut self, max_sentences: usize) -> Self {
        self.max_sentences = max_sentences.max(1);
        self
    }

    /// Checks `cancel` before each network call.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Fetches one random genuine article for `category`.
    ///
    /// # Errors
    ///
    /// - [`Error::EmptySource`] when the category lists no content pages or
    ///   the chosen page has no text
    /// - [`Error::Transport`] / [`Error::MalformedResponse`] from the client
    /// - [`Error::Cancelled`] if the token tripped
    pub fn fetch_real(&self, category: &Category) -> Result<Article> {
        ensure_active(&self.cancel)?;
        let members = self.kb.category_members(category.as_str())?;
        let candidates: Vec<&String> = members.iter().filter(|t| !is_meta_page(t)).collect();

        let Some(subject) = candidates.choose(&mut rand::rng()) else {
            return Err(Error::EmptySource {
                source_name: SOURCE_NAME,
                reason: format!("no article pages in Category:{category}"),
            });
        };

        ensure_active(&self.cancel)?;
        let page = self
            .kb
            .page_extract(subject)?
            .ok_or_else(|| Error::EmptySource {
                source_name: SOURCE_NAME,
                reason: format!("page '{subject}' does not exist"),
            })?;
        if page.text.trim().is_empty() {
            return Err(Error::EmptySource {
                source_name: SOURCE_NAME,
                reason: format!("page '{}' has no text", page.title),
            });
        }

        let summary = condense_summary(&page.text, self.max_sentences);
        tracing::debug!(category = %category, title = %page.title, "Fetched genuine article");
        Ok(Article::genuine(page.title, summary, category.as_str()))
    }
}

impl<K: KnowledgeBase> ArticleSource for WikiSource<K> {
    fn name(&self) -> &'static str {
        SOURCE_NAME
    }

    fn fetch_article(&self, category: &Category, is_truth: bool) -> Result<Article> {
        if !is_truth {
            return Err(Error::InvalidInput(
                "the knowledge base only serves genuine articles".to_string(),
            ));
        }
        self.fetch_real(category)
    }
}

/// Whether a listed title is an organizational page rather than an article.
#[must_use]
pub fn is_meta_page(title: &str) -> bool {
    META_PREFIXES.iter().any(|prefix| title.starts_with(prefix))
}

/// Splits text on `.` into trimmed, non-empty sentence units.
#[must_use]
pub fn split_sentences(text: &str) -> Vec<&str> {
    text.split('.')
        .map(|s| s.trim_matches(|c: char| c.is_whitespace() || c == '\\'))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Condenses text to the sentence budget.
///
/// Text with more than `max_sentences` sentences is cut to sentences
/// `2..=max_sentences + 1` (the lead sentence usually restates the title).
/// Anything shorter is returned unchanged apart from outer whitespace.
///
/// Only non-empty sentences count toward the budget, so a closing `.` does
/// not add a phantom sentence: six terminated sentences stay verbatim. A
/// condensed result always ends with `.`.
#[must_use]
pub fn condense_summary(text: &str, max_sentences: usize) -> String {
    let sentences = split_sentences(text);
    if max_sentences == 0 || sentences.len() <= max_sentences {
        return text.trim().to_string();
    }

    let mut condensed = sentences
        .into_iter()
        .skip(1)
        .take(max_sentences)
        .collect::<Vec<_>>()
        .join(". ");
    condensed.push('.');
    condensed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use test_case::test_case;

    struct StaticKb {
        members: Vec<String>,
        page: Option<PageText>,
        lookups: Mutex<Vec<String>>,
    }

    impl StaticKb {
        fn new(members: &[&str], page: Option<(&str, &str)>) -> Self {
            Self {
                members: members.iter().map(ToString::to_string).collect(),
                page: page.map(|(title, text)| PageText {
                    title: title.to_string(),
                    text: text.to_string(),
                }),
                lookups: Mutex::new(Vec::new()),
            }
        }
    }

    impl KnowledgeBase for StaticKb {
        fn category_members(&self, _category: &str) -> Result<Vec<String>> {
            Ok(self.members.clone())
        }

        fn page_extract(&self, title: &str) -> Result<Option<PageText>> {
            self.lookups.lock().unwrap().push(title.to_string());
            Ok(self.page.clone())
        }
    }

    fn numbered(count: usize) -> String {
        (1..=count).map(|i| format!("S{i}. ")).collect()
    }

    fn cryptids() -> Category {
        Category::new("Cryptids").unwrap()
    }

    #[test_case("Category:Lake monsters", true ; "subcategory")]
    #[test_case("List of cryptids", true ; "list page")]
    #[test_case("Template:Cryptozoology", true ; "template")]
    #[test_case("Bigfoot", false ; "article")]
    #[test_case("Listeria", false ; "list prefix without space")]
    fn test_is_meta_page(title: &str, expected: bool) {
        assert_eq!(is_meta_page(title), expected);
    }

    #[test]
    fn test_condense_long_text() {
        let condensed = condense_summary(&numbered(10), 6);
        assert_eq!(condensed, "S2. S3. S4. S5. S6. S7.");
    }

    #[test]
    fn test_short_text_verbatim() {
        let text = "S1. S2. S3. S4. S5.";
        assert_eq!(condense_summary(text, 6), text);
    }

    #[test]
    fn test_exactly_threshold_is_verbatim() {
        let text = numbered(6);
        assert_eq!(condense_summary(&text, 6), text.trim());
    }

    #[test]
    fn test_closing_period_is_not_a_sentence() {
        let terminated = "S1. S2. S3. S4. S5. S6.";
        let unterminated = "S1. S2. S3. S4. S5. S6";
        assert_eq!(condense_summary(terminated, 6), terminated);
        assert_eq!(condense_summary(unterminated, 6), unterminated);
        assert_eq!(split_sentences(terminated).len(), 6);
    }

    #[test]
    fn test_condensed_text_ends_with_period() {
        let condensed = condense_summary("S1. S2. S3", 1);
        assert_eq!(condensed, "S2.");
    }

    #[test]
    fn test_seven_sentences_drops_only_lead() {
        let condensed = condense_summary(&numbered(7), 6);
        assert_eq!(condensed, "S2. S3. S4. S5. S6. S7.");
    }

    #[test]
    fn test_split_strips_newlines_and_backslashes() {
        let parts = split_sentences("One.\nTwo\\. Three.");
        assert_eq!(parts, vec!["One", "Two", "Three"]);
    }

    #[test]
    fn test_fetch_real_skips_meta_pages() {
        let kb = StaticKb::new(
            &["Category:Lake monsters", "List of cryptids", "Bigfoot"],
            Some(("Bigfoot", "Bigfoot is an ape. It lives in forests.")),
        );
        let source = WikiSource::new(kb);

        let article = source.fetch_real(&cryptids()).unwrap();
        assert_eq!(article.title, "Bigfoot");
        assert_eq!(article.category, "Cryptids");
        assert!(article.is_truth);
        assert_eq!(*source.kb.lookups.lock().unwrap(), vec!["Bigfoot".to_string()]);
    }

    #[test]
    fn test_only_meta_pages_is_empty_source() {
        let kb = StaticKb::new(&["Category:Lake monsters", "List of cryptids"], None);
        let result = WikiSource::new(kb).fetch_real(&cryptids());
        assert!(matches!(result, Err(Error::EmptySource { .. })));
    }

    #[test]
    fn test_blank_text_is_empty_source() {
        let kb = StaticKb::new(&["Bigfoot"], Some(("Bigfoot", "  ")));
        let result = WikiSource::new(kb).fetch_real(&cryptids());
        assert!(matches!(result, Err(Error::EmptySource { .. })));
    }

    #[test]
    fn test_missing_page_is_empty_source() {
        let kb = StaticKb::new(&["Bigfoot"], None);
        let result = WikiSource::new(kb).fetch_real(&cryptids());
        assert!(matches!(result, Err(Error::EmptySource { .. })));
    }

    #[test]
    fn test_fabricated_request_rejected() {
        let kb = StaticKb::new(&["Bigfoot"], Some(("Bigfoot", "Text.")));
        let result = WikiSource::new(kb).fetch_article(&cryptids(), false);
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_cancelled_before_lookup() {
        let token = CancellationToken::new();
        token.cancel();
        let kb = StaticKb::new(&["Bigfoot"], Some(("Bigfoot", "Text.")));
        let source = WikiSource::new(kb).with_cancellation(token);

        assert!(matches!(source.fetch_real(&cryptids()), Err(Error::Cancelled)));
        assert!(source.kb.lookups.lock().unwrap().is_empty());
    }
}

//! Parser pipeline for responses
//!
//! A [`Parser`] pairs:
//! - predicate rules deciding whether a response qualifies (OR-combined; no
//!   rules means every response qualifies)
//! - an optional [`ItemSpec`] built and saved for qualifying responses
//! - a [`UrlRule`] extracting outbound links, which are then resolved against
//!   the response URL

use crate::crawler::{Response, Session};
use crate::item::{Item, ItemKind, ItemSpec};
use crate::url::resolve_url;
use crate::ItemError;
use futures::FutureExt;
use regex::Regex;
use scraper::Html;
use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, OnceLock};

/// Default link pattern: the value of every `href` attribute
pub const DEFAULT_URL_PATTERN: &str = r#"(?i)href=["']([^\s"'<>]+)"#;

type PredicateFn = dyn Fn(&Response) -> bool + Send + Sync;
type ExtractFn = dyn Fn(&str, &str) -> Vec<String> + Send + Sync;

/// A predicate deciding whether a response qualifies for item extraction
#[derive(Clone)]
pub enum Rule {
    /// The response text contains the substring
    Contains(String),

    /// The response text matches the pattern
    Matches(Regex),

    /// Arbitrary check
    Custom(Arc<PredicateFn>),
}

impl Rule {
    pub fn check(&self, response: &Response) -> bool {
        match self {
            Self::Contains(needle) => response.text().contains(needle.as_str()),
            Self::Matches(pattern) => pattern.is_match(response.text()),
            Self::Custom(f) => f(response),
        }
    }
}

/// How outbound links are pulled out of a response body
#[derive(Clone)]
pub enum UrlRule {
    /// Regex whose first capture group (or whole match) is a link
    Pattern(Regex),

    /// CSS query plus the attribute holding the link
    Structural {
        selector: scraper::Selector,
        attr: String,
    },

    /// Caller-supplied extraction from `(body, base_url)`
    Extract(Arc<ExtractFn>),
}

impl UrlRule {
    pub fn pattern(pattern: &str) -> Result<Self, ItemError> {
        Ok(Self::Pattern(Regex::new(pattern)?))
    }

    pub fn structural(query: &str, attr: &str) -> Result<Self, ItemError> {
        let selector =
            scraper::Selector::parse(query).map_err(|e| ItemError::InvalidSelector {
                query: query.to_string(),
                message: format!("{:?}", e),
            })?;
        Ok(Self::Structural {
            selector,
            attr: attr.to_string(),
        })
    }

    pub fn extract<F>(f: F) -> Self
    where
        F: Fn(&str, &str) -> Vec<String> + Send + Sync + 'static,
    {
        Self::Extract(Arc::new(f))
    }

    /// Raw, unresolved links found in the body
    fn raw_links(&self, body: &str, base_url: &str) -> Vec<String> {
        match self {
            Self::Pattern(pattern) => {
                let group = usize::from(pattern.captures_len() > 1);
                pattern
                    .captures_iter(body)
                    .filter_map(|caps| caps.get(group))
                    .map(|m| m.as_str().to_string())
                    .collect()
            }
            Self::Structural { selector, attr } => Html::parse_document(body)
                .select(selector)
                .filter_map(|element| element.value().attr(attr))
                .map(str::to_string)
                .collect(),
            Self::Extract(f) => f(body, base_url),
        }
    }
}

impl Default for UrlRule {
    fn default() -> Self {
        static DEFAULT: OnceLock<Regex> = OnceLock::new();
        let pattern = DEFAULT
            .get_or_init(|| Regex::new(DEFAULT_URL_PATTERN).expect("default URL pattern compiles"));
        Self::Pattern(pattern.clone())
    }
}

/// One stage of the parsing pipeline
///
/// # Example
///
/// ```
/// use seen::crawler::Parser;
/// use seen::item::{ItemSpec, SaveStep, Selector};
///
/// let post = ItemSpec::new("post", SaveStep::blocking(|_, _| Ok(())))
///     .field("title", Selector::css("title").unwrap());
///
/// let parser = Parser::with_item(post).contains("topic");
/// let urls = parser.get_urls(r#"<a href="/t/1">x</a>"#, "https://www.v2ex.com/");
/// assert!(urls.contains("https://www.v2ex.com/t/1"));
/// ```
#[derive(Clone, Default)]
pub struct Parser {
    rules: Vec<Rule>,
    item: Option<Arc<ItemSpec>>,
    url_rule: UrlRule,
    is_json: bool,
}

impl Parser {
    /// A parser that matches everything, has no item and uses the default link pattern
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_item(item: ItemSpec) -> Self {
        Self::new().item(item)
    }

    /// Adds a substring rule
    pub fn contains(mut self, needle: impl Into<String>) -> Self {
        self.rules.push(Rule::Contains(needle.into()));
        self
    }

    /// Adds a regex rule
    pub fn matches(mut self, pattern: &str) -> Result<Self, ItemError> {
        self.rules.push(Rule::Matches(Regex::new(pattern)?));
        Ok(self)
    }

    /// Adds an arbitrary predicate
    pub fn rule<F>(mut self, f: F) -> Self
    where
        F: Fn(&Response) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule::Custom(Arc::new(f)));
        self
    }

    pub fn item(mut self, item: ItemSpec) -> Self {
        self.item = Some(Arc::new(item));
        self
    }

    pub fn url_rule(mut self, rule: UrlRule) -> Self {
        self.url_rule = rule;
        self
    }

    /// Decode bodies as JSON; no selector or link extraction happens
    pub fn json(mut self) -> Self {
        self.is_json = true;
        self
    }

    pub fn item_spec(&self) -> Option<&ItemSpec> {
        self.item.as_deref()
    }

    pub fn is_json(&self) -> bool {
        self.is_json
    }

    /// Returns true when any rule accepts the response (or there are no rules)
    pub fn is_match(&self, response: &Response) -> bool {
        self.rules.is_empty() || self.rules.iter().any(|rule| rule.check(response))
    }

    /// Builds this parser's item from a response, if it has an item
    pub fn parse_item(&self, response: &Arc<Response>) -> Option<Result<Item, ItemError>> {
        self.item
            .as_ref()
            .map(|spec| spec.build(response, self.is_json))
    }

    /// Extracts and resolves outbound links
    ///
    /// Links that cannot be resolved to an absolute URL are dropped.
    pub fn get_urls(&self, body: &str, base_url: &str) -> HashSet<String> {
        self.url_rule
            .raw_links(body, base_url)
            .iter()
            .filter_map(|link| resolve_url(link, base_url))
            .collect()
    }

    /// Runs the pipeline on a response
    ///
    /// When the response qualifies and an item is configured, the item is built
    /// and saved; a failing save is logged and does not stop the pipeline.
    /// Link discovery runs regardless of the predicates, except for JSON
    /// parsers and binary items, which never yield links.
    ///
    /// # Returns
    ///
    /// * `Ok(HashSet<String>)` - Resolved outbound URLs
    /// * `Err(ItemError::MalformedJson)` - JSON mode and the body does not decode
    pub async fn analyze(
        &self,
        response: &Arc<Response>,
        session: &Session,
    ) -> Result<HashSet<String>, ItemError> {
        if self.is_match(response) {
            if let Some(spec) = &self.item {
                let item = spec.build(response, self.is_json)?;
                let saved = AssertUnwindSafe(spec.save_step().run(item, session))
                    .catch_unwind()
                    .await;
                match saved {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(
                        "Failed to save item '{}' from {}: {:#}",
                        spec.name(),
                        response.url,
                        e
                    ),
                    Err(panic) => tracing::error!(
                        "Save step for item '{}' from {} panicked: {}",
                        spec.name(),
                        response.url,
                        panic_message(panic.as_ref())
                    ),
                }
            }
        }

        let binary = self
            .item
            .as_ref()
            .is_some_and(|spec| spec.kind() == ItemKind::Binary);
        if self.is_json || binary {
            return Ok(HashSet::new());
        }

        Ok(self.get_urls(response.text(), &response.url))
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for Parser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parser")
            .field("rules", &self.rules.len())
            .field("item", &self.item.as_ref().map(|spec| spec.name()))
            .field("is_json", &self.is_json)
            .finish()
    }
}

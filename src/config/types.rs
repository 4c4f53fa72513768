use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Main configuration structure for Seen
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    pub spider: SpiderConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default, rename = "parser")]
    pub parsers: Vec<ParserEntry>,
}

/// Session configuration for one crawl
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SpiderConfig {
    /// URLs seeded into the frontier at session start
    #[serde(deserialize_with = "one_or_many")]
    pub roots: Vec<String>,

    /// Hosts allowed to be fetched; empty means no restriction
    pub url_limit: HashSet<String>,

    /// Number of concurrent workers
    pub concurrency: usize,

    /// Fetch attempts per URL
    pub max_tries: u32,

    /// Per-attempt timeout (seconds)
    pub timeout: f64,

    /// Delay each worker takes after processing a URL (milliseconds)
    pub interval: u64,

    /// Headers sent with every direct fetch
    pub headers: BTreeMap<String, String>,

    /// Cookies sent with every direct fetch
    pub cookies: BTreeMap<String, String>,

    /// Render pages in a headless browser instead of fetching directly
    pub use_browser: bool,

    /// Request method for direct fetches
    pub method: HttpMethod,

    /// Request body for POST fetches
    pub body: Option<String>,
}

impl SpiderConfig {
    /// Creates a configuration with default settings for the given roots
    pub fn with_roots<I, S>(roots: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            roots: roots.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs_f64(self.timeout)
    }

    pub fn interval_duration(&self) -> Duration {
        Duration::from_millis(self.interval)
    }
}

impl Default for SpiderConfig {
    fn default() -> Self {
        Self {
            roots: Vec::new(),
            url_limit: HashSet::new(),
            concurrency: 3,
            max_tries: 4,
            timeout: 3.05,
            interval: 0,
            headers: default_headers(),
            cookies: BTreeMap::new(),
            use_browser: false,
            method: HttpMethod::Get,
            body: None,
        }
    }
}

/// Browser-like headers used when none are configured
fn default_headers() -> BTreeMap<String, String> {
    [
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "zh-CN,zh;q=0.8"),
        ("Cache-Control", "no-cache"),
        ("Pragma", "no-cache"),
        (
            "User-Agent",
            "Mozilla/5.0 (Windows NT 6.1; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/45.0.2454.101 Safari/537.36",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Request method for direct fetches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON-lines file items are appended to (stdout when absent)
    pub items_path: Option<String>,
}

/// Declarative parser entry
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParserEntry {
    /// Match responses whose text contains this substring
    pub contains: Option<String>,

    /// Match responses whose text matches this regex
    pub pattern: Option<String>,

    /// Regex whose first group yields outbound links
    pub url_pattern: Option<String>,

    /// Decode bodies as JSON
    #[serde(default)]
    pub json: bool,

    pub item: Option<ItemEntry>,
}

/// Declarative item entry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemEntry {
    pub name: String,

    /// Keep raw bytes instead of extracting fields
    #[serde(default)]
    pub binary: bool,

    #[serde(default)]
    pub fields: BTreeMap<String, FieldEntry>,
}

/// Declarative selector; exactly one of `css` or `regex` must be set
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldEntry {
    pub css: Option<String>,
    pub attr: Option<String>,
    pub regex: Option<String>,
}

/// Accepts either a single string or an array of strings
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(root) => vec![root],
        OneOrMany::Many(roots) => roots,
    })
}

//! Seen: a small concurrent crawling engine
//!
//! Starting from a set of root URLs, a pool of workers repeatedly fetches pages,
//! hands them to parsers that extract records and outbound links, and feeds the
//! discovered links back into a shared frontier until no work is left.

pub mod config;
pub mod crawler;
pub mod item;
pub mod output;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for Seen operations
#[derive(Debug, Error)]
pub enum SeenError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Session setup failed: {0}")]
    SessionSetup(String),

    #[error("Item error: {0}")]
    Item(#[from] ItemError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(#[from] ItemError),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL: {0}")]
    MissingHost(String),
}

/// Errors raised while declaring or building items
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("Invalid CSS query '{query}': {message}")]
    InvalidSelector { query: String, message: String },

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Malformed JSON body from {url}: {source}")]
    MalformedJson {
        url: String,
        source: serde_json::Error,
    },
}

/// Result type alias for Seen operations
pub type Result<T> = std::result::Result<T, SeenError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, SpiderConfig};
pub use crawler::{FetchFailure, Parser, Response, Spider, UrlRule};
pub use item::{FieldValue, Item, ItemKind, ItemSpec, SaveStep, Selector};
pub use output::CrawlSummary;
pub use state::{CrawlState, SpiderState};
pub use url::{extract_host, resolve_url};

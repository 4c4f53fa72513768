//! Crawler module for fetching and processing pages
//!
//! This module contains the core crawling logic, including:
//! - The shared frontier and per-session state
//! - Fetch strategies (direct HTTP, headless browser)
//! - Parsers that extract items and outbound links
//! - Worker loops with retry and cancellation
//! - Overall crawl coordination

#[cfg(feature = "browser")]
mod browser;
mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod response;
mod scheduler;
mod session;

pub use coordinator::Spider;
pub use fetcher::{build_http_client, DirectFetcher, FetchFailure, FetchResult, Fetcher};
pub use frontier::Frontier;
pub use parser::{Parser, Rule, UrlRule, DEFAULT_URL_PATTERN};
pub use response::{Response, EMPTY_PAGE_HTML};
pub use scheduler::{FailedUrl, UrlFailedHandler};
pub use session::Session;

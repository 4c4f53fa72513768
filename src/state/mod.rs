//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: the dedup set (URLs processed successfully) and the error
//!   set (URLs that exhausted their fetch attempts)
//! - `SpiderState`: free-form key/value state scoped to one session

mod crawl_state;
mod spider_state;

// Re-export main types
pub use crawl_state::CrawlState;
pub use spider_state::SpiderState;

//! Output module for crawl summaries and extracted items
//!
//! This module handles:
//! - Summarizing a finished crawl session
//! - Writing saved items as JSON lines

mod jsonl;
pub mod stats;

pub use jsonl::JsonLinesSink;
pub use stats::{print_summary, CrawlSummary};

//! Crawl summary
//!
//! This module describes the outcome of one crawl session and prints it for
//! the command line.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Outcome of one crawl session
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    /// URLs successfully processed (the dedup set)
    pub processed: usize,

    /// URLs that exhausted their retries (the error set)
    pub failed: usize,

    /// Sorted contents of the error set
    pub failed_urls: Vec<String>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Hash of the configuration the session ran with, when known
    pub config_hash: Option<String>,

    /// True when the crawl was stopped by a user interrupt
    pub interrupted: bool,
}

impl CrawlSummary {
    /// Wall-clock time of the session
    pub fn duration(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }

    /// Share of attempted URLs that succeeded, as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.processed + self.failed;
        if total > 0 {
            (self.processed as f64 / total as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Run Information:");
    println!("  Started: {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!(
        "  Duration: {:.2} seconds",
        summary.duration().num_milliseconds() as f64 / 1000.0
    );
    if let Some(hash) = &summary.config_hash {
        println!("  Config hash: {}", hash);
    }
    if summary.interrupted {
        println!("  Status: interrupted");
    } else {
        println!("  Status: completed");
    }
    println!();

    println!("Pages:");
    println!("  Processed: {}", summary.processed);
    println!("  Failed: {}", summary.failed);
    println!();

    if !summary.failed_urls.is_empty() {
        println!("Error URLs ({}):", summary.failed_urls.len());
        for url in &summary.failed_urls {
            println!("  - {}", url);
        }
        println!();
    }

    println!(
        "Success Rate: {:.1}% ({} / {} URLs successfully processed)",
        summary.success_rate(),
        summary.processed,
        summary.processed + summary.failed
    );
}

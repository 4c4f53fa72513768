use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Tracks which URLs have been processed and which have failed
///
/// A URL is in at most one of the two sets. Both live behind a single lock so
/// checking one set and updating the other is atomic.
#[derive(Debug, Clone, Default)]
pub struct CrawlState {
    inner: Arc<Mutex<Sets>>,
}

#[derive(Debug, Default)]
struct Sets {
    seen: HashSet<String>,
    failed: HashSet<String>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    fn sets(&self) -> MutexGuard<'_, Sets> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if the URL has been processed successfully
    pub fn is_seen(&self, url: &str) -> bool {
        self.sets().seen.contains(url)
    }

    /// Returns true if the URL exhausted its fetch attempts
    pub fn is_failed(&self, url: &str) -> bool {
        self.sets().failed.contains(url)
    }

    /// Records a successful processing
    ///
    /// A URL that failed earlier (through a duplicate frontier entry) moves
    /// out of the error set.
    pub fn mark_seen(&self, url: &str) {
        let mut sets = self.sets();
        sets.failed.remove(url);
        sets.seen.insert(url.to_string());
    }

    /// Records that a URL exhausted its fetch attempts
    ///
    /// Returns false, leaving the sets untouched, when the URL has already
    /// been processed successfully.
    pub fn mark_failed(&self, url: &str) -> bool {
        let mut sets = self.sets();
        if sets.seen.contains(url) {
            return false;
        }
        sets.failed.insert(url.to_string());
        true
    }

    pub fn seen_count(&self) -> usize {
        self.sets().seen.len()
    }

    pub fn failed_count(&self) -> usize {
        self.sets().failed.len()
    }

    /// Processed URLs, sorted
    pub fn seen_urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.sets().seen.iter().cloned().collect();
        urls.sort();
        urls
    }

    /// Failed URLs, sorted
    pub fn failed_urls(&self) -> Vec<String> {
        let mut urls: Vec<_> = self.sets().failed.iter().cloned().collect();
        urls.sort();
        urls
    }
}

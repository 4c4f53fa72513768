//! Per-crawl session state
//!
//! Everything mutable that a crawl shares between workers lives here and is
//! created fresh for every session: the frontier, the dedup and error sets,
//! and the free-form spider state. Nothing is shared between sessions.

use crate::config::SpiderConfig;
use crate::crawler::Frontier;
use crate::state::{CrawlState, SpiderState};
use std::sync::Arc;

/// Handle to one crawl session, cheap to clone
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    config: SpiderConfig,
    frontier: Frontier,
    crawl_state: CrawlState,
    spider_state: SpiderState,
}

impl Session {
    /// Creates a session with an empty frontier and empty state
    pub fn new(config: SpiderConfig) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                config,
                frontier: Frontier::new(),
                crawl_state: CrawlState::new(),
                spider_state: SpiderState::new(),
            }),
        }
    }

    pub fn config(&self) -> &SpiderConfig {
        &self.inner.config
    }

    pub fn frontier(&self) -> &Frontier {
        &self.inner.frontier
    }

    /// Dedup and error sets
    pub fn crawl_state(&self) -> &CrawlState {
        &self.inner.crawl_state
    }

    /// Free-form key/value state scoped to this session
    pub fn state(&self) -> &SpiderState {
        &self.inner.spider_state
    }

    /// Seeds the configured roots into the frontier
    pub fn seed_roots(&self) {
        for root in &self.inner.config.roots {
            tracing::info!("get root url: {}", root);
            self.inner.frontier.enqueue(root.clone());
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("roots", &self.inner.config.roots)
            .field("outstanding", &self.inner.frontier.outstanding())
            .finish()
    }
}
